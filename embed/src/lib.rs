pub mod config;
pub mod embed;
pub mod error;
pub mod hashing;
pub mod openai;
pub(crate) mod openai_compat;
pub mod provider;

pub use config::EmbedConfig;
pub use embed::Embedder;
pub use error::EmbedError;
pub use hashing::HashEmbedder;
pub use openai::OpenAI;
pub use provider::{EmbeddingProvider, l2_normalize};

/// Output dimension of the sentence-transformers model the service is built around
/// (all-MiniLM-L6-v2).
pub const DEFAULT_DIMENSION: usize = 384;
