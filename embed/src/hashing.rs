use crate::embed::Embedder;
use crate::error::EmbedError;
use crate::provider::l2_normalize;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// HashEmbedder is an offline, deterministic embedder based on feature
/// hashing: every lowercased alphanumeric token adds 1.0 to the bucket
/// `fnv1a(token) % dim`, and the result is L2-normalized.
///
/// Texts sharing vocabulary score high under inner product, texts with
/// disjoint vocabulary score (close to) zero. It has no notion of synonyms,
/// so it is meant for development and tests rather than production recall.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        let mut tokens = 0usize;
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = fnv1a(token.to_lowercase().as_bytes()) % self.dim as u64;
            v[bucket as usize] += 1.0;
            tokens += 1;
        }
        // Token-free text still needs a stable unit vector.
        if tokens == 0 {
            v[(fnv1a(b"") % self.dim as u64) as usize] = 1.0;
        }
        v
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(crate::DEFAULT_DIMENSION)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |h, &b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

#[async_trait::async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut v = self.vectorize(text);
        l2_normalize(&mut v)?;
        Ok(v)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_deterministic_unit_norm() {
        let e = HashEmbedder::default();
        let a = e.embed("Cannot submit login form").await.unwrap();
        let b = e.embed("Cannot submit login form").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 384);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_high() {
        let e = HashEmbedder::default();
        let a = e.embed("Cannot submit login form").await.unwrap();
        let b = e.embed("Login form does not submit").await.unwrap();
        let c = e.embed("Database backup fails nightly").await.unwrap();
        assert!(dot(&a, &b) > 0.6, "related: {}", dot(&a, &b));
        assert!(dot(&b, &c) < 0.1, "unrelated: {}", dot(&b, &c));
    }

    #[tokio::test]
    async fn test_case_and_punctuation_insensitive() {
        let e = HashEmbedder::default();
        let a = e.embed("LOGIN, form!").await.unwrap();
        let b = e.embed("login form").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_blank_text() {
        let e = HashEmbedder::new(8);
        let a = e.embed("").await.unwrap();
        let b = e.embed("    ").await.unwrap();
        assert_eq!(a, b);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_batch() {
        let e = HashEmbedder::new(16);
        let out = e.embed_batch(&["a b", "c"]).await.unwrap();
        assert_eq!(out.len(), 2);
        assert!(e.embed_batch(&[]).await.is_err());
    }
}
