//! # Vector Store
//!
//! The persistent store for row and schema documents. It is backed by a local
//! SQLite file through Turso and uses Turso's native vector functions for
//! cosine-distance search.

pub mod sqlite;

pub use sqlite::{StoreError, VectorStore};
