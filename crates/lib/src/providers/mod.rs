//! # Providers
//!
//! External collaborators sit behind traits so the pipeline can run against
//! real services in production and in-process mocks in tests:
//! - [`ai`]: the chat model and the embedding model.
//! - [`warehouse`]: the cloud SQL warehouse tables are extracted from.
//! - [`db`]: the persistent vector store.

pub mod ai;
pub mod db;
pub mod warehouse;
