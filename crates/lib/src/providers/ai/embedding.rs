//! # Embeddings Provider
//!
//! Vector embeddings come from an external, OpenAI-compatible embeddings API
//! (Ollama exposes one at `/v1/embeddings`). The [`Embedder`] trait lets the
//! indexer and retriever run against a deterministic mock in tests.

use crate::errors::PromptError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

/// Turns text into vectors.
#[async_trait]
pub trait Embedder: Send + Sync + Debug + DynClone {
    /// The model name. It is folded into the index marker so switching models
    /// forces a rebuild.
    fn model(&self) -> &str;

    /// Embeds a batch of inputs, returning one vector per input in order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, PromptError>;
}

dyn_clone::clone_trait_object!(Embedder);

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize, Debug)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize, Debug)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct OpenAIEmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiEmbedder {
    client: ReqwestClient,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiEmbedder {
    pub fn new(api_url: String, model: String, api_key: Option<String>) -> Result<Self, PromptError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            model,
            api_key,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, PromptError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request_body = OpenAIEmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        debug!(
            model = %self.model,
            inputs = inputs.len(),
            "--> Sending request to OpenAI-compatible Embeddings API"
        );

        let mut request_builder = self.client.post(&self.api_url).json(&request_body);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key);
        }

        let response = request_builder
            .send()
            .await
            .map_err(PromptError::AiRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PromptError::AiApi(error_text));
        }

        let mut openai_response: OpenAIEmbeddingResponse = response
            .json()
            .await
            .map_err(PromptError::AiDeserialization)?;

        if openai_response.data.len() != inputs.len() {
            return Err(PromptError::EmbeddingCountMismatch {
                expected: inputs.len(),
                got: openai_response.data.len(),
            });
        }

        // Servers may return entries out of order; `index` is authoritative when present.
        openai_response
            .data
            .sort_by_key(|d| d.index.unwrap_or(usize::MAX));

        Ok(openai_response
            .data
            .into_iter()
            .map(|d| d.embedding)
            .collect())
    }
}
