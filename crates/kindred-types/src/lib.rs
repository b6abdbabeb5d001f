//! Shared domain types for Kindred.
//!
//! This crate contains the core domain types of the companion memory
//! subsystem: memories and their connections, shared memories, persona
//! relationships, derived clusters and insights, configuration, and the
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod extraction;
pub mod memory;
pub mod network;
