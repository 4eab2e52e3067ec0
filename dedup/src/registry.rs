use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bugsim_vecstore::{IndexConfig, VecIndex, new_index};
use parking_lot::RwLock;
use tracing::info;

use crate::error::DedupError;
use crate::types::IndexKind;

/// Vectors and the bug ids they belong to, kept in lockstep:
/// `bug_ids[i]` names the bug whose embedding sits at position `i`.
pub(crate) struct Entries {
    pub(crate) vectors: Box<dyn VecIndex>,
    pub(crate) bug_ids: Vec<String>,
}

/// ApplicationIndex holds every embedding stored for one application in one
/// registry. It only grows.
///
/// A single lock covers both sequences, so readers never see a vector
/// without its id or an id without its vector.
pub struct ApplicationIndex {
    pub(crate) entries: RwLock<Entries>,
}

impl ApplicationIndex {
    pub(crate) fn new(vectors: Box<dyn VecIndex>) -> Self {
        Self {
            entries: RwLock::new(Entries {
                vectors,
                bug_ids: Vec::new(),
            }),
        }
    }

    /// Append one `(bug_id, vector)` pair and return its position.
    ///
    /// The same bug id may be appended any number of times; each append is a
    /// separate, independently retrievable entry.
    pub fn append(&self, bug_id: &str, vector: &[f32]) -> Result<usize, DedupError> {
        let mut entries = self.entries.write();
        let pos = entries.vectors.add(vector)?;
        entries.bug_ids.push(bug_id.to_string());
        debug_assert_eq!(pos + 1, entries.bug_ids.len());
        Ok(pos)
    }

    pub fn len(&self) -> usize {
        self.entries.read().bug_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the stored bug ids in insertion order.
    pub fn bug_ids(&self) -> Vec<String> {
        self.entries.read().bug_ids.clone()
    }
}

/// IndexRegistry maps application names to their [ApplicationIndex].
///
/// Indices are created lazily on first insert. Creation is atomic per
/// application: concurrent first inserts for an unseen application all end
/// up in the same index.
pub struct IndexRegistry {
    kind: IndexKind,
    dim: usize,
    index_config: IndexConfig,
    apps: RwLock<HashMap<String, Arc<ApplicationIndex>>>,
}

impl IndexRegistry {
    pub fn new(kind: IndexKind, dim: usize, index_config: IndexConfig) -> Self {
        Self {
            kind,
            dim,
            index_config,
            apps: RwLock::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Return the index for `application`, creating an empty one if needed.
    pub fn ensure_index(&self, application: &str) -> Result<Arc<ApplicationIndex>, DedupError> {
        if let Some(idx) = self.get(application) {
            return Ok(idx);
        }

        let mut apps = self.apps.write();
        // Another writer may have won the race between the two locks.
        if let Some(idx) = apps.get(application) {
            return Ok(Arc::clone(idx));
        }
        let idx = Arc::new(ApplicationIndex::new(new_index(
            self.dim,
            &self.index_config,
        )?));
        apps.insert(application.to_string(), Arc::clone(&idx));
        info!(kind = %self.kind, application, "created index");
        Ok(idx)
    }

    /// Return the index for `application` if one exists.
    pub fn get(&self, application: &str) -> Option<Arc<ApplicationIndex>> {
        self.apps.read().get(application).cloned()
    }

    /// Append `vector` under `bug_id` to the application's index.
    ///
    /// Only the application's own lock is held while appending, so inserts
    /// into other applications and searches elsewhere proceed in parallel.
    pub fn insert(&self, application: &str, bug_id: &str, vector: &[f32]) -> Result<(), DedupError> {
        self.ensure_index(application)?.append(bug_id, vector)?;
        Ok(())
    }

    /// Number of entries stored for `application` (0 when unknown).
    pub fn entry_count(&self, application: &str) -> usize {
        self.get(application).map_or(0, |idx| idx.len())
    }

    /// Known application names, sorted.
    pub fn applications(&self) -> Vec<String> {
        let mut names: Vec<String> = self.apps.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Entry counts per application.
    pub fn stats(&self) -> BTreeMap<String, usize> {
        let apps: Vec<(String, Arc<ApplicationIndex>)> = self
            .apps
            .read()
            .iter()
            .map(|(name, idx)| (name.clone(), Arc::clone(idx)))
            .collect();
        apps.into_iter().map(|(name, idx)| (name, idx.len())).collect()
    }
}
