//! Infrastructure layer for Kindred.
//!
//! Contains implementations of the ports defined in `kindred-core`:
//! SQLite storage for memories, shared memories and persona relationships,
//! an OpenAI-compatible HTTP embedder, and TOML config loading.

pub mod config;
pub mod embedding;
pub mod sqlite;
