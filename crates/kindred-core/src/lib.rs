//! Business logic and repository trait definitions for Kindred.
//!
//! This crate defines the "ports" (repository and embedder traits) that the
//! infrastructure layer implements, plus the four memory components:
//! the fact extractor, the embedding retriever, the aging engine and the
//! shared memory network. It depends only on `kindred-types` -- never on
//! `kindred-infra` or any database/IO crate.

pub mod aging;
pub mod memory;
pub mod network;

#[cfg(test)]
pub(crate) mod test_support;
