use tracing::debug;

use crate::error::DedupError;
use crate::registry::{ApplicationIndex, IndexRegistry};
use crate::types::SearchResult;

/// Candidates fetched from the index before threshold filtering.
pub const DEFAULT_TOP_K: usize = 3;
/// Threshold for duplicate-candidate discovery on new reports.
pub const DUPLICATE_MIN_SCORE: f32 = 0.6;
/// Threshold for free-text semantic search.
pub const SEMANTIC_MIN_SCORE: f32 = 0.4;
/// Threshold for closed-bug precedents used in priority classification.
pub const PRIORITY_MIN_SCORE: f32 = 0.5;

/// Per-operation search parameters. The three thresholds stay separate
/// because each call site has its own tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub top_k: usize,
    pub duplicate_min_score: f32,
    pub semantic_min_score: f32,
    pub priority_min_score: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            duplicate_min_score: DUPLICATE_MIN_SCORE,
            semantic_min_score: SEMANTIC_MIN_SCORE,
            priority_min_score: PRIORITY_MIN_SCORE,
        }
    }
}

impl ApplicationIndex {
    /// Return up to `k` stored bugs whose similarity to `vector` is at least
    /// `min_score`, best first.
    pub fn search(
        &self,
        vector: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>, DedupError> {
        let entries = self.entries.read();
        if entries.bug_ids.is_empty() || k == 0 {
            return Ok(vec![]);
        }

        let matches = entries.vectors.search(vector, k)?;
        let mut results: Vec<SearchResult> = matches
            .into_iter()
            .filter(|m| m.score >= min_score)
            // Positions past the id list are dropped rather than trusted.
            .filter_map(|m| {
                entries.bug_ids.get(m.position).map(|id| SearchResult {
                    bug_id: id.clone(),
                    score: m.score,
                })
            })
            .collect();

        // Stable sort: ties keep the index's own order.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(results)
    }
}

impl IndexRegistry {
    /// Threshold-filtered top-k search within one application.
    ///
    /// An unknown application, or one with no entries, yields an empty
    /// result rather than an error.
    pub fn search(
        &self,
        application: &str,
        vector: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>, DedupError> {
        let Some(idx) = self.get(application) else {
            debug!(kind = %self.kind(), application, "search on unknown application");
            return Ok(vec![]);
        };
        let results = idx.search(vector, k, min_score)?;
        debug!(
            kind = %self.kind(),
            application,
            k,
            min_score,
            hits = results.len(),
            "search"
        );
        Ok(results)
    }
}
