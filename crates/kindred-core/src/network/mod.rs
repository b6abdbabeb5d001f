//! Cross-persona memory sharing.
//!
//! `SharedMemoryNetwork` gates sharing on persona relationships held in a
//! `PersonaGraph`, exposes shared copies to recipients, and derives
//! clusters, insights and the export tree on demand.

pub mod clustering;
pub mod export;
pub mod graph;
pub mod insights;
pub mod service;
pub mod store;
