//! OpenAI-backed embedding provider, feature-gated behind `openai` so the
//! default build never pulls in `reqwest`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::provider::EmbeddingProvider;
use crate::constants::SEMANTIC_DIM;
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, RetryPolicy};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Calls the OpenAI embeddings API, requesting vectors truncated to
/// `D_s = 384` dimensions via the API's native `dimensions` parameter so
/// the output is directly comparable with [`super::HashingEmbeddingProvider`]
/// vectors. Requests run through the shared [`RetryPolicy`] since network
/// calls are exactly the transient failure class it exists for.
pub struct OpenAiEmbeddingProvider {
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl OpenAiEmbeddingProvider {
    /// Build a provider against the default OpenAI endpoint.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Build a provider against a custom endpoint (e.g. an Azure OpenAI
    /// deployment or a local proxy).
    #[must_use]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            dimension: SEMANTIC_DIM,
            base_url,
            client,
            retry: RetryPolicy::with_config(RetryConfig::default()),
        }
    }

    /// Override the model name (must support the `dimensions` request
    /// parameter, i.e. one of the `text-embedding-3-*` family).
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn request_embeddings(&self, input: EmbeddingInput) -> Result<EmbeddingResponse> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            input,
            model: self.model.clone(),
            dimensions: Some(self.dimension),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("openai request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return if status.is_server_error() || status.as_u16() == 429 {
                Err(Error::Transient(format!("openai {status}: {text}")))
            } else {
                Err(Error::Fatal(format!("openai {status}: {text}")))
            };
        }

        response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| Error::Transient(format!("openai response decode failed: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = EmbeddingInput::Single(text.to_string());
        let response = self
            .retry
            .execute(|| self.request_embeddings(input.clone()))
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Fatal("openai returned no embeddings".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let input = EmbeddingInput::Batch(texts.to_vec());
        let response = self
            .retry
            .execute(|| self.request_embeddings(input.clone()))
            .await?;

        if response.data.len() != texts.len() {
            return Err(Error::Fatal(format!(
                "openai returned {} embeddings for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }
        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest {
    input: EmbeddingInput,
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
