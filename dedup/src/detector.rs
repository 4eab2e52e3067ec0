use std::sync::Arc;
use std::time::Duration;

use bugsim_embed::{Embedder, EmbeddingProvider};
use bugsim_vecstore::{IndexConfig, VecError};

use crate::error::DedupError;
use crate::registry::IndexRegistry;
use crate::search::SearchSettings;
use crate::source::BugSource;
use crate::types::{BugText, IndexKind, SearchResult};

/// Bound on a single embedding call unless configured otherwise.
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(10);

/// Configures a [Detector].
pub struct DetectorConfig {
    /// Converts text to vectors. Required.
    pub embedder: Arc<dyn Embedder>,

    /// Upper bound on a single embedding call. Defaults to
    /// [DEFAULT_EMBED_TIMEOUT]; None waits indefinitely.
    pub embed_timeout: Option<Duration>,

    /// Nearest-neighbor structure backing every application index.
    pub index: IndexConfig,

    pub search: SearchSettings,

    /// Corpus used by [Detector::bootstrap]. Optional.
    pub source: Option<Arc<dyn BugSource>>,
}

impl DetectorConfig {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            embed_timeout: Some(DEFAULT_EMBED_TIMEOUT),
            index: IndexConfig::Flat,
            search: SearchSettings::default(),
            source: None,
        }
    }
}

/// Process-level entry point for duplicate detection.
///
/// Owns the embedding provider and the general and priority registries.
/// Construct one per process (or per test) and share it behind an `Arc`;
/// every method takes `&self` and is safe to call concurrently.
pub struct Detector {
    pub(crate) provider: EmbeddingProvider,
    pub(crate) general: IndexRegistry,
    pub(crate) priority: IndexRegistry,
    pub(crate) search: SearchSettings,
    pub(crate) source: Option<Arc<dyn BugSource>>,
}

impl Detector {
    pub fn new(cfg: DetectorConfig) -> Result<Self, DedupError> {
        let mut provider = EmbeddingProvider::new(cfg.embedder);
        if let Some(timeout) = cfg.embed_timeout {
            provider = provider.with_timeout(timeout);
        }
        let dim = provider.dimension();
        if dim == 0 {
            return Err(VecError::InvalidConfig("embedder reports dimension 0".into()).into());
        }

        Ok(Self {
            general: IndexRegistry::new(IndexKind::General, dim, cfg.index.clone()),
            priority: IndexRegistry::new(IndexKind::Priority, dim, cfg.index),
            provider,
            search: cfg.search,
            source: cfg.source,
        })
    }

    /// Registry holding every reported bug.
    pub fn general(&self) -> &IndexRegistry {
        &self.general
    }

    /// Registry holding closed bugs only.
    pub fn priority(&self) -> &IndexRegistry {
        &self.priority
    }

    pub fn registry(&self, kind: IndexKind) -> &IndexRegistry {
        match kind {
            IndexKind::General => &self.general,
            IndexKind::Priority => &self.priority,
        }
    }

    /// Embed `text` through the provider (fixed dimension, unit norm).
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, DedupError> {
        Ok(self.provider.embed(text).await?)
    }

    /// Find existing bugs in `application` that look like duplicates of `bug`.
    pub async fn check_duplicate(
        &self,
        application: &str,
        bug: &BugText,
    ) -> Result<Vec<SearchResult>, DedupError> {
        require(application, "Application is required for duplicate check.")?;
        self.search_text(
            IndexKind::General,
            application,
            &bug.normalized(),
            self.search.duplicate_min_score,
        )
        .await
    }

    /// Free-text search over every bug reported for `application`.
    pub async fn semantic_search(
        &self,
        application: &str,
        query: &str,
    ) -> Result<Vec<SearchResult>, DedupError> {
        let query = require_query(application, query)?;
        self.search_text(
            IndexKind::General,
            application,
            query,
            self.search.semantic_min_score,
        )
        .await
    }

    /// Find closed bugs in `application` similar to `query`, whose priority
    /// can serve as a precedent. `min_score` overrides the configured default.
    pub async fn classify_priority(
        &self,
        application: &str,
        query: &str,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>, DedupError> {
        let query = require_query(application, query)?;
        self.search_text(
            IndexKind::Priority,
            application,
            query,
            min_score.unwrap_or(self.search.priority_min_score),
        )
        .await
    }

    /// Store a newly reported bug in the general registry.
    pub async fn add_embedding(
        &self,
        application: &str,
        bug_id: &str,
        bug: &BugText,
    ) -> Result<(), DedupError> {
        require(application, "Application is required to add embedding.")?;
        self.insert_text(IndexKind::General, application, bug_id, &bug.normalized())
            .await
    }

    /// Store a closed bug in the priority registry.
    pub async fn add_priority_embedding(
        &self,
        application: &str,
        bug_id: &str,
        bug: &BugText,
    ) -> Result<(), DedupError> {
        require(application, "Application is required to add priority embedding.")?;
        self.insert_text(IndexKind::Priority, application, bug_id, &bug.normalized())
            .await
    }

    async fn search_text(
        &self,
        kind: IndexKind,
        application: &str,
        text: &str,
        min_score: f32,
    ) -> Result<Vec<SearchResult>, DedupError> {
        let registry = self.registry(kind);
        // Nothing to compare against; skip the embedding call entirely.
        if registry.entry_count(application) == 0 {
            return Ok(vec![]);
        }
        let vector = self.embed(text).await?;
        registry.search(application, &vector, self.search.top_k, min_score)
    }

    async fn insert_text(
        &self,
        kind: IndexKind,
        application: &str,
        bug_id: &str,
        text: &str,
    ) -> Result<(), DedupError> {
        let vector = self.embed(text).await?;
        self.registry(kind).insert(application, bug_id, &vector)
    }
}

fn require(application: &str, msg: &str) -> Result<(), DedupError> {
    if application.trim().is_empty() {
        return Err(DedupError::Validation(msg.to_string()));
    }
    Ok(())
}

fn require_query<'a>(application: &str, query: &'a str) -> Result<&'a str, DedupError> {
    let query = query.trim();
    if application.trim().is_empty() || query.is_empty() {
        return Err(DedupError::Validation(
            "Application and query fields are required".to_string(),
        ));
    }
    Ok(query)
}
