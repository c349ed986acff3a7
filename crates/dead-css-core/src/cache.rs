//! Per-run store of compiled modules.

use crate::exports::CompiledExports;
use crate::record::ModuleId;
use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Compiled exports keyed by normalized module path and by id.
///
/// Append-only: the first insertion for a key wins and entries are never
/// replaced, so anything read from the cache stays valid for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleCache {
    by_path: FxHashMap<Utf8PathBuf, Arc<CompiledExports>>,
    by_id: FxHashMap<ModuleId, Arc<CompiledExports>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_path(&self, path: &Utf8Path) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn get_path(&self, path: &Utf8Path) -> Option<&Arc<CompiledExports>> {
        self.by_path.get(path)
    }

    pub fn get_id(&self, id: ModuleId) -> Option<&Arc<CompiledExports>> {
        self.by_id.get(&id)
    }

    /// Stores `exports` under both keys unless already present.
    /// Returns false when the path was cached before.
    pub fn insert(&mut self, path: Utf8PathBuf, id: ModuleId, exports: Arc<CompiledExports>) -> bool {
        if self.by_path.contains_key(&path) {
            return false;
        }
        self.by_id.entry(id).or_insert_with(|| exports.clone());
        self.by_path.insert(path, exports);
        true
    }

    /// Number of distinct paths compiled.
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}
