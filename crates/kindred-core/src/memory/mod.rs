//! Memory persistence, extraction and retrieval.
//!
//! This module defines the `MemoryRepository` trait that the infrastructure
//! layer implements, the `Embedder` port for the external embedding function,
//! the rule-based `FactExtractor`, and the `EmbeddingRetriever` that embeds,
//! stores and searches memories.

pub mod box_embedder;
pub mod embedder;
pub mod extractor;
pub mod retriever;
pub mod store;
pub mod vector;
