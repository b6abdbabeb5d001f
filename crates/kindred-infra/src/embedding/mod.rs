//! Embedding provider adapters.

pub mod http;
