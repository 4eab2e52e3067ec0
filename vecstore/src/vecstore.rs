use crate::error::VecError;
use crate::flat::FlatIndex;
use crate::hnsw::{HNSW, HNSWConfig};

/// Match is a single result from a vector similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Insertion position of the matched vector (0 for the first vector
    /// added, 1 for the second, ...).
    pub position: usize,

    /// Inner-product similarity between the query and the matched vector.
    /// Higher values indicate higher similarity.
    pub score: f32,
}

/// VecIndex is the nearest-neighbor capability the bug indices are built on.
///
/// Indices are append-only: `add` assigns dense positions in insertion order
/// and nothing is ever removed or replaced, so callers can keep a parallel
/// list keyed by position. Mutation takes `&mut self`; callers that share an
/// index across tasks wrap it in their own lock.
pub trait VecIndex: Send + Sync {
    /// Append a vector and return its position.
    fn add(&mut self, vector: &[f32]) -> Result<usize, VecError>;

    /// Return up to `top_k` vectors with the highest inner product against
    /// `query`, ordered by descending score. Equal scores keep ascending
    /// position order for exact indices.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Match>, VecError>;

    /// Return the number of vectors in the index.
    fn len(&self) -> usize;

    /// Return true if the index contains no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the vector dimension this index accepts.
    fn dim(&self) -> usize;
}

/// Selects the [VecIndex] implementation used for new indices.
#[derive(Debug, Clone, Default)]
pub enum IndexConfig {
    /// Exact linear scan.
    #[default]
    Flat,
    /// Approximate HNSW graph. `dim` in the embedded config is ignored and
    /// replaced by the dimension passed to [new_index].
    Hnsw(HNSWConfig),
}

/// Create an empty index of dimension `dim`.
pub fn new_index(dim: usize, cfg: &IndexConfig) -> Result<Box<dyn VecIndex>, VecError> {
    if dim == 0 {
        return Err(VecError::InvalidConfig("dimension must be positive".into()));
    }
    Ok(match cfg {
        IndexConfig::Flat => Box::new(FlatIndex::new(dim)),
        IndexConfig::Hnsw(h) => Box::new(HNSW::new(HNSWConfig { dim, ..h.clone() })?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_index_kinds() {
        let mut flat = new_index(2, &IndexConfig::Flat).unwrap();
        flat.add(&[1.0, 0.0]).unwrap();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat.dim(), 2);

        let hnsw = new_index(4, &IndexConfig::Hnsw(HNSWConfig::default())).unwrap();
        assert_eq!(hnsw.dim(), 4);
        assert!(hnsw.is_empty());
    }

    #[test]
    fn test_new_index_zero_dim() {
        assert!(new_index(0, &IndexConfig::Flat).is_err());
    }
}
