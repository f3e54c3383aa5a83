//! # tablerag
//!
//! Ask questions about warehouse tables in plain language.
//!
//! The pipeline has three stages, each usable on its own:
//! 1.  [`extract`]: pull whole tables out of a cloud warehouse into CSV or
//!     Parquet files.
//! 2.  [`index`]: turn every row (and a schema summary per table) into a
//!     document, embed it, and store it in a persistent vector store.
//! 3.  [`retrieve`]: answer a question from the most similar documents with a
//!     locally hosted language model.

pub mod cache;
pub mod constants;
pub mod errors;
pub mod extract;
pub mod files;
pub mod index;
pub mod prompts;
pub mod providers;
pub mod retrieve;
pub mod types;

pub use errors::PromptError;
pub use extract::{extract_tables, ExtractError, ExtractReport};
pub use index::{build_index, teardown, IndexError, IndexOptions, IndexOutcome};
pub use providers::db::VectorStore;
pub use retrieve::{Answer, AnswerSource, RetrieveError, RetrieveOptions, Retriever};
pub use types::{Document, DocumentKind, ExtractedTable, FlatFileFormat, SearchResult};
