pub mod embedding;
pub mod local;

use crate::errors::PromptError;
use async_trait::async_trait;
use dyn_clone::DynClone;
pub use embedding::{Embedder, OpenAiEmbedder};
pub use local::LocalAiProvider;
use std::fmt::Debug;

/// A trait for interacting with a language model.
///
/// The retriever renders its prompt template and hands the result to this
/// trait; the provider returns the model's raw text.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Generates a response from a given system and user prompt.
    ///
    /// An empty `system_prompt` means the user prompt carries all instructions.
    async fn generate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, PromptError>;
}

dyn_clone::clone_trait_object!(AiProvider);
