use crate::dot::inner_product;
use crate::error::VecError;
use crate::vecstore::{Match, VecIndex};

/// FlatIndex is an exact [VecIndex]: every search scans all stored vectors
/// and scores them by inner product. Vectors are stored contiguously.
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
        }
    }

    fn vector(&self, pos: usize) -> &[f32] {
        &self.data[pos * self.dim..(pos + 1) * self.dim]
    }
}

impl VecIndex for FlatIndex {
    fn add(&mut self, vector: &[f32]) -> Result<usize, VecError> {
        if vector.len() != self.dim {
            return Err(VecError::DimensionMismatch {
                got: vector.len(),
                want: self.dim,
            });
        }
        let pos = self.len();
        self.data.extend_from_slice(vector);
        Ok(pos)
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Match>, VecError> {
        if query.len() != self.dim {
            return Err(VecError::DimensionMismatch {
                got: query.len(),
                want: self.dim,
            });
        }
        if self.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }

        let mut results: Vec<Match> = (0..self.len())
            .map(|position| Match {
                position,
                score: inner_product(query, self.vector(position)),
            })
            .collect();

        // Stable: equal scores stay in insertion order.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    fn dim(&self) -> usize {
        self.dim
    }
}
