use reqwest::Client;

use crate::config::EmbedConfig;
use crate::embed::Embedder;
use crate::error::EmbedError;

/// Sentence-transformers model the duplicate detector is tuned for.
pub const MODEL_MINILM_L6_V2: &str = "all-MiniLM-L6-v2";

const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";
const MAX_BATCH: usize = 64;

/// Embedder for any server exposing the OpenAI `/embeddings` API
/// (text-embeddings-inference, infinity, vLLM, OpenAI itself, ...).
pub struct OpenAI {
    client: Client,
    api_key: String,
    model: String,
    dim: usize,
    base_url: String,
    request_dimensions: bool,
}

impl OpenAI {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: MODEL_MINILM_L6_V2.to_string(),
            dim: crate::DEFAULT_DIMENSION,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_dimensions: false,
        }
    }

    pub fn with_config(api_key: &str, cfg: EmbedConfig) -> Result<Self, EmbedError> {
        let mut builder = Client::builder();
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| EmbedError::Api(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: if cfg.model.is_empty() {
                MODEL_MINILM_L6_V2.to_string()
            } else {
                cfg.model
            },
            dim: if cfg.dimension == 0 {
                crate::DEFAULT_DIMENSION
            } else {
                cfg.dimension
            },
            base_url: if cfg.base_url.is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                cfg.base_url.trim_end_matches('/').to_string()
            },
            request_dimensions: cfg.request_dimensions,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn call_api(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        crate::openai_compat::call_embedding_api(
            &self.client,
            &self.api_key,
            &self.base_url,
            &self.model,
            self.request_dimensions.then_some(self.dim),
            texts,
        )
        .await
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAI {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let vecs = self.embed_batch(&[text]).await?;
        vecs.into_iter().next().ok_or(EmbedError::MissingIndex(0))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let mut result = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            let vecs = self.call_api(chunk).await?;
            result.extend(vecs);
        }
        Ok(result)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}
