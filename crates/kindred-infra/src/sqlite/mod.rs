//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

mod codec;
pub mod memory;
pub mod pool;
pub mod relationship;
pub mod shared;
