//! Path -> snapshot map backing everything the engine reads
//!
//! The cache never decides on its own that the engine must be rebuilt; it
//! reports script-kind changes in [`SnapshotUpdate`] and leaves the reaction
//! to the owning container.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Snapshot, TextEdit};
use crate::paths::is_svelte_path;
use crate::preprocess::Preprocessor;

/// Outcome of a snapshot update
#[derive(Debug, Clone)]
pub struct SnapshotUpdate {
    pub snapshot: Arc<Snapshot>,
    /// The path had no snapshot before this update
    pub created: bool,
    /// The script kind differs from the previous snapshot's
    pub kind_changed: bool,
    /// The version matched and the cached snapshot was returned as-is
    pub unchanged: bool,
}

pub struct SnapshotCache {
    snapshots: HashMap<PathBuf, Arc<Snapshot>>,
    project_file_names: Vec<PathBuf>,
    project_file_set: HashSet<PathBuf>,
    /// Versions are unique for the cache's lifetime, deletions included
    next_version: u64,
    preprocessor: Arc<dyn Preprocessor>,
}

impl SnapshotCache {
    pub fn new(
        project_file_names: Vec<PathBuf>,
        preprocessor: Arc<dyn Preprocessor>,
    ) -> Self {
        let mut cache = Self {
            snapshots: HashMap::new(),
            project_file_names: Vec::new(),
            project_file_set: HashSet::new(),
            next_version: 0,
            preprocessor,
        };
        cache.set_project_file_names(project_file_names);
        cache
    }

    pub fn get(&self, path: &Path) -> Option<Arc<Snapshot>> {
        self.snapshots.get(path).cloned()
    }

    pub fn has(&self, path: &Path) -> bool {
        self.snapshots.contains_key(path)
    }

    /// Unconditional overwrite
    pub fn set(&mut self, path: PathBuf, snapshot: Arc<Snapshot>) {
        self.snapshots.insert(path, snapshot);
    }

    /// Remove the entry. Resolution caches referring to the path are the
    /// caller's responsibility.
    pub fn delete(&mut self, path: &Path) -> Option<Arc<Snapshot>> {
        self.snapshots.remove(path)
    }

    pub fn allocate_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    /// Snapshot for an open editor document. An equal document version
    /// returns the cached snapshot untouched.
    pub fn update_from_editor_state(
        &mut self,
        path: &Path,
        document_version: i32,
        text: &str,
    ) -> SnapshotUpdate {
        let previous = self.get(path);
        if let Some(prev) = &previous
            && prev.document_version() == Some(document_version)
        {
            return SnapshotUpdate {
                snapshot: Arc::clone(prev),
                created: false,
                kind_changed: false,
                unchanged: true,
            };
        }

        let version = self.allocate_version();
        let snapshot = Snapshot::from_text(
            path.to_path_buf(),
            text.to_string(),
            version,
            Some(document_version),
            self.preprocessor.as_ref(),
        );
        self.store(path, previous, snapshot)
    }

    /// Re-read and reclassify a file that is not open in the editor.
    /// A missing file yields an empty snapshot.
    pub fn update_from_disk(&mut self, path: &Path) -> SnapshotUpdate {
        let previous = self.get(path);
        let text = read_or_empty(path);
        let version = self.allocate_version();
        let snapshot = Snapshot::from_text(
            path.to_path_buf(),
            text,
            version,
            None,
            self.preprocessor.as_ref(),
        );
        self.store(path, previous, snapshot)
    }

    /// Apply `edits` to a host-language file, loading it from disk first if
    /// it is not cached. Without edits the file is re-read. Component files
    /// are never touched here and yield `None`.
    pub fn update_host_file(
        &mut self,
        path: &Path,
        edits: Option<&[TextEdit]>,
    ) -> Option<SnapshotUpdate> {
        if is_svelte_path(path) {
            tracing::debug!("ignoring host update for component {}", path.display());
            return None;
        }
        let Some(edits) = edits else {
            return Some(self.update_from_disk(path));
        };

        let previous = self.get(path);
        let base = match &previous {
            Some(prev) => Arc::clone(prev),
            None => {
                let version = self.allocate_version();
                Arc::new(Snapshot::from_host_text(
                    path.to_path_buf(),
                    read_or_empty(path),
                    version,
                    None,
                ))
            }
        };

        let version = self.allocate_version();
        let snapshot = base.with_edits(edits, version)?;
        Some(self.store(path, previous, snapshot))
    }

    fn store(
        &mut self,
        path: &Path,
        previous: Option<Arc<Snapshot>>,
        snapshot: Snapshot,
    ) -> SnapshotUpdate {
        let kind_changed = previous
            .as_ref()
            .is_some_and(|prev| prev.script_kind() != snapshot.script_kind());
        let snapshot = Arc::new(snapshot);
        self.set(path.to_path_buf(), Arc::clone(&snapshot));
        SnapshotUpdate {
            snapshot,
            created: previous.is_none(),
            kind_changed,
            unchanged: false,
        }
    }

    /// Paths of every cached snapshot
    pub fn file_names(&self) -> impl Iterator<Item = &PathBuf> {
        self.snapshots.keys()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn project_file_names(&self) -> &[PathBuf] {
        &self.project_file_names
    }

    pub fn is_project_file(&self, path: &Path) -> bool {
        self.project_file_set.contains(path)
    }

    /// Replace the declared file list, dropping duplicates but keeping order
    pub fn set_project_file_names(&mut self, names: Vec<PathBuf>) {
        let set = &mut self.project_file_set;
        set.clear();
        let names = names
            .into_iter()
            .filter(|name| set.insert(name.clone()))
            .collect();
        self.project_file_names = names;
    }

    pub fn preprocessor(&self) -> &dyn Preprocessor {
        self.preprocessor.as_ref()
    }

    /// Declared files, cached files and ambient declarations, deduplicated
    pub fn list_for_engine(&self, ambient: &[PathBuf]) -> Vec<PathBuf> {
        let mut seen: HashSet<&PathBuf> = HashSet::new();
        let mut listed = Vec::new();
        for path in self
            .project_file_names
            .iter()
            .chain(self.snapshots.keys())
            .chain(ambient)
        {
            if seen.insert(path) {
                listed.push(path.clone());
            }
        }
        listed
    }
}

fn read_or_empty(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| {
        tracing::debug!("reading {} failed, using empty text: {e}", path.display());
        String::new()
    })
}
