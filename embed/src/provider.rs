use std::sync::Arc;
use std::time::Duration;

use crate::embed::Embedder;
use crate::error::EmbedError;

/// EmbeddingProvider is the boundary every caller goes through to turn
/// text into a vector.
///
/// It makes one call to the wrapped [Embedder] per text and guarantees the
/// result has exactly `dimension()` components and unit L2 norm, so inner
/// product can be used directly as cosine similarity. A configured timeout
/// fails the call with [EmbedError::Timeout]; nothing is retried here.
#[derive(Clone)]
pub struct EmbeddingProvider {
    embedder: Arc<dyn Embedder>,
    dim: usize,
    timeout: Option<Duration>,
}

impl EmbeddingProvider {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let dim = embedder.dimension();
        Self {
            embedder,
            dim,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let call = self.embedder.embed(text);
        let mut v = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| EmbedError::Timeout(limit))??,
            None => call.await?,
        };

        if v.len() != self.dim {
            return Err(EmbedError::DimensionMismatch {
                got: v.len(),
                want: self.dim,
            });
        }
        l2_normalize(&mut v)?;
        Ok(v)
    }
}

/// Scale `v` in place to unit Euclidean length.
pub fn l2_normalize(v: &mut [f32]) -> Result<(), EmbedError> {
    let norm = v
        .iter()
        .map(|&x| (x as f64) * (x as f64))
        .sum::<f64>()
        .sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(EmbedError::ZeroVector);
    }
    for x in v.iter_mut() {
        *x = (*x as f64 / norm) as f32;
    }
    Ok(())
}
