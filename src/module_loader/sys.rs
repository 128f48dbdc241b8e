//! File system view the engine gets: snapshots first, disk second

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::paths::{SVELTE_EXTENSION, ensure_real_svelte_path, is_svelte_path};
use crate::preprocess::COMPONENT_STUB;
use crate::snapshot::{ScriptKind, SnapshotCache};

/// Existence, read and listing callbacks over one project's snapshots.
///
/// Every lookup goes through real-path normalization, so `A.svelte.ts`
/// is answered for `A.svelte`.
pub struct ProjectSys<'a> {
    snapshots: &'a SnapshotCache,
}

impl<'a> ProjectSys<'a> {
    pub fn new(snapshots: &'a SnapshotCache) -> Self {
        Self { snapshots }
    }

    pub fn file_exists(&self, path: &Path) -> bool {
        let real = ensure_real_svelte_path(path);
        self.snapshots.has(&real) || real.is_file()
    }

    /// Content as the engine should see it. Uncached components are
    /// preprocessed on the fly.
    pub fn read_file(&self, path: &Path) -> Option<String> {
        let real = ensure_real_svelte_path(path);
        if let Some(snapshot) = self.snapshots.get(&real) {
            return Some(snapshot.text().to_string());
        }

        let text = std::fs::read_to_string(&real).ok()?;
        if !is_svelte_path(&real) {
            return Some(text);
        }
        let code = match self.snapshots.preprocessor().transform(&real, &text) {
            Ok(out) => out.code,
            Err(_) => COMPONENT_STUB.to_string(),
        };
        Some(code)
    }

    pub fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir() || self.snapshots.file_names().any(|f| f.starts_with(path))
    }

    /// Files under `dir` with one of `extensions` (dotted, e.g. `.ts`).
    /// `.svelte` is always included. `depth` of `None` means unbounded.
    pub fn read_directory(
        &self,
        dir: &Path,
        extensions: &[&str],
        depth: Option<usize>,
    ) -> Vec<PathBuf> {
        let mut wanted: Vec<&str> = extensions.to_vec();
        if !wanted.contains(&SVELTE_EXTENSION) {
            wanted.push(SVELTE_EXTENSION);
        }

        let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
        if let Some(depth) = depth {
            walker = walker.max_depth(depth + 1);
        }

        walker
            .into_iter()
            .filter_entry(|e| e.file_name() != "node_modules")
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let name = e.file_name().to_string_lossy();
                wanted.iter().any(|ext| name.ends_with(ext))
            })
            .map(|e| e.into_path())
            .collect()
    }

    /// Cached kind when known, otherwise classification by name
    pub fn script_kind(&self, path: &Path) -> ScriptKind {
        let real = ensure_real_svelte_path(path);
        self.snapshots
            .get(&real)
            .map_or_else(|| ScriptKind::from_file_name(&real), |s| s.script_kind())
    }
}
