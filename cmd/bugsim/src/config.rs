//! Service configuration.
//!
//! Loaded from a YAML file where every field is optional, then overridden by
//! environment variables for secrets.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use bugsim_dedup::{DetectorConfig, HttpBugSource, HttpSourceConfig, SearchSettings};
use bugsim_embed::{EmbedConfig, Embedder, HashEmbedder, OpenAI};
use bugsim_vecstore::{HNSWConfig, IndexConfig};
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "BUGSIM_CONFIG";
/// Shared secret for the bug-tracker backend.
pub const SOURCE_KEY_ENV: &str = "SIMILARITY_API_KEY";
/// API key for the embedding server.
pub const EMBED_KEY_ENV: &str = "BUGSIM_EMBED_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address; a leading `:` binds all interfaces.
    pub listen: String,
    pub embedder: EmbedderConfig,
    pub source: SourceConfig,
    pub index: IndexSection,
    pub search: SearchConfig,
    pub bootstrap: BootstrapConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ":8000".to_string(),
            embedder: EmbedderConfig::default(),
            source: SourceConfig::default(),
            index: IndexSection::default(),
            search: SearchConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderProvider {
    /// OpenAI-compatible `/embeddings` server.
    #[default]
    Http,
    /// Offline feature hashing. Development only.
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub provider: EmbedderProvider,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: EmbedderProvider::Http,
            base_url: String::new(),
            model: String::new(),
            api_key: String::new(),
            dimension: bugsim_embed::DEFAULT_DIMENSION,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    pub accept_invalid_certs: bool,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:5000".to_string(),
            api_key: String::new(),
            accept_invalid_certs: true,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Flat,
    Hnsw,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSection {
    pub kind: IndexBackend,
    pub hnsw: HnswSection,
}

/// Zero values fall back to the HNSW defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswSection {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k: usize,
    pub duplicate_min_score: f32,
    pub semantic_min_score: f32,
    pub priority_min_score: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let s = SearchSettings::default();
        Self {
            top_k: s.top_k,
            duplicate_min_score: s.duplicate_min_score,
            semantic_min_score: s.semantic_min_score,
            priority_min_score: s.priority_min_score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Ingest the bug source in the background when the server starts.
    pub on_startup: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self { on_startup: true }
    }
}

/// Load the config at `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: Config = serde_yaml::from_str(&content)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

impl Config {
    /// Override secrets from the environment. `lookup` is normally
    /// `std::env::var(..).ok()`; empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(key) = get(SOURCE_KEY_ENV) {
            self.source.api_key = key;
        }
        if let Some(key) = get(EMBED_KEY_ENV) {
            self.embedder.api_key = key;
        }
    }

    pub fn index_config(&self) -> IndexConfig {
        match self.index.kind {
            IndexBackend::Flat => IndexConfig::Flat,
            IndexBackend::Hnsw => IndexConfig::Hnsw(HNSWConfig {
                dim: 0,
                m: self.index.hnsw.m,
                ef_construction: self.index.hnsw.ef_construction,
                ef_search: self.index.hnsw.ef_search,
            }),
        }
    }

    pub fn search_settings(&self) -> anyhow::Result<SearchSettings> {
        let s = &self.search;
        if s.top_k == 0 {
            anyhow::bail!("search.top_k must be positive");
        }
        for (name, v) in [
            ("duplicate_min_score", s.duplicate_min_score),
            ("semantic_min_score", s.semantic_min_score),
            ("priority_min_score", s.priority_min_score),
        ] {
            if !(-1.0..=1.0).contains(&v) {
                anyhow::bail!("search.{name} must be within [-1, 1], got {v}");
            }
        }
        Ok(SearchSettings {
            top_k: s.top_k,
            duplicate_min_score: s.duplicate_min_score,
            semantic_min_score: s.semantic_min_score,
            priority_min_score: s.priority_min_score,
        })
    }

    pub fn embedder(&self) -> anyhow::Result<Arc<dyn Embedder>> {
        let e = &self.embedder;
        let embedder: Arc<dyn Embedder> = match e.provider {
            EmbedderProvider::Hashing => Arc::new(HashEmbedder::new(e.dimension)),
            EmbedderProvider::Http => {
                let cfg = EmbedConfig::default()
                    .with_model(&e.model)
                    .with_dimension(e.dimension)
                    .with_base_url(&e.base_url)
                    .with_timeout(Duration::from_secs(e.timeout_secs));
                Arc::new(OpenAI::with_config(&e.api_key, cfg)?)
            }
        };
        Ok(embedder)
    }

    pub fn bug_source(&self) -> anyhow::Result<HttpBugSource> {
        Ok(HttpBugSource::new(HttpSourceConfig {
            base_url: self.source.base_url.clone(),
            api_key: self.source.api_key.clone(),
            timeout: Duration::from_secs(self.source.timeout_secs),
            accept_invalid_certs: self.source.accept_invalid_certs,
        })?)
    }

    /// Assemble everything the detector needs from this config.
    pub fn detector_config(&self) -> anyhow::Result<DetectorConfig> {
        let mut cfg = DetectorConfig::new(self.embedder()?);
        cfg.embed_timeout = Some(Duration::from_secs(self.embedder.timeout_secs));
        cfg.index = self.index_config();
        cfg.search = self.search_settings()?;
        cfg.source = Some(Arc::new(self.bug_source()?));
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.listen, ":8000");
        assert_eq!(cfg.embedder.provider, EmbedderProvider::Http);
        assert_eq!(cfg.embedder.dimension, 384);
        assert_eq!(cfg.source.base_url, "https://localhost:5000");
        assert!(cfg.source.accept_invalid_certs);
        assert!(cfg.bootstrap.on_startup);

        let s = cfg.search_settings().unwrap();
        assert_eq!(s.top_k, 3);
        assert_eq!(s.duplicate_min_score, 0.6);
        assert_eq!(s.semantic_min_score, 0.4);
        assert_eq!(s.priority_min_score, 0.5);
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "listen: 127.0.0.1:9100\n\
             embedder:\n  provider: hashing\n  dimension: 64\n\
             index:\n  kind: hnsw\n  hnsw:\n    m: 8\n\
             search:\n  duplicate_min_score: 0.75\n\
             bootstrap:\n  on_startup: false"
        )
        .unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.listen, "127.0.0.1:9100");
        assert_eq!(cfg.embedder.provider, EmbedderProvider::Hashing);
        assert_eq!(cfg.embedder.dimension, 64);
        assert_eq!(cfg.embedder.timeout_secs, 10);
        assert!(!cfg.bootstrap.on_startup);
        assert_eq!(cfg.source.timeout_secs, 30);

        let s = cfg.search_settings().unwrap();
        assert_eq!(s.duplicate_min_score, 0.75);
        assert_eq!(s.semantic_min_score, 0.4);

        match cfg.index_config() {
            IndexConfig::Hnsw(h) => {
                assert_eq!(h.m, 8);
                assert_eq!(h.ef_search, 0);
            }
            other => panic!("expected hnsw, got {other:?}"),
        }

        let detector_cfg = cfg.detector_config().unwrap();
        assert_eq!(detector_cfg.embedder.dimension(), 64);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.yaml"))).is_err());

        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "embedder:\n  provider: carrier-pigeon\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (SOURCE_KEY_ENV, "backend-secret"),
            (EMBED_KEY_ENV, ""),
        ]);
        let mut cfg = Config::default();
        cfg.embedder.api_key = "from-file".to_string();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.source.api_key, "backend-secret");
        assert_eq!(cfg.embedder.api_key, "from-file");
    }

    #[test]
    fn test_invalid_search_settings() {
        let mut cfg = Config::default();
        cfg.search.top_k = 0;
        assert!(cfg.search_settings().is_err());

        let mut cfg = Config::default();
        cfg.search.priority_min_score = 1.5;
        assert!(cfg.search_settings().is_err());
    }
}
