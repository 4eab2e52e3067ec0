use std::time::Duration;

/// Builder-style configuration for embedder implementations.
///
/// Empty / zero fields fall back to the implementation's defaults.
#[derive(Debug, Clone, Default)]
pub struct EmbedConfig {
    pub model: String,
    pub dimension: usize,
    pub base_url: String,
    /// Send `dimensions` in the request body. Sentence-transformers servers
    /// with a fixed output size reject it, so it is off unless asked for.
    pub request_dimensions: bool,
    pub timeout: Option<Duration>,
}

impl EmbedConfig {
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dimension = dim;
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_request_dimensions(mut self, on: bool) -> Self {
        self.request_dimensions = on;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
