//! [`LanguageServiceHost`] over one project's caches

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::LanguageServiceHost;
use crate::module_loader::{ModuleResolver, ProjectSys, ResolutionCache, ResolvedModule};
use crate::project_resolver::CompilerOptions;
use crate::snapshot::{ScriptKind, Snapshot, SnapshotCache};

/// Mutable state shared by a container and its host
pub struct ProjectState {
    pub snapshots: SnapshotCache,
    pub resolutions: ResolutionCache,
}

impl ProjectState {
    pub fn new(snapshots: SnapshotCache) -> Self {
        Self {
            snapshots,
            resolutions: ResolutionCache::new(),
        }
    }

    /// Cached snapshot, or one read from disk for a file the engine asks
    /// about first. A new snapshot purges stale failed resolutions.
    pub fn snapshot_or_load(&mut self, path: &Path) -> Option<Arc<Snapshot>> {
        if let Some(snapshot) = self.snapshots.get(path) {
            return Some(snapshot);
        }
        if !path.is_file() {
            return None;
        }
        self.purge_unresolved(path);
        Some(self.snapshots.update_from_disk(path).snapshot)
    }

    /// Forget failed resolutions that `path` may now satisfy
    pub fn purge_unresolved(&mut self, path: &Path) {
        let purged = self.resolutions.delete_unresolved_for(path);
        if purged > 0 {
            tracing::debug!(
                "purged {purged} unresolved imports after {} appeared",
                path.display()
            );
        }
    }
}

/// Callback adapter handed to the engine
pub struct ProjectHost {
    state: Arc<Mutex<ProjectState>>,
    options: CompilerOptions,
    resolver: ModuleResolver,
    current_directory: PathBuf,
    default_lib: PathBuf,
    ambient_files: Vec<PathBuf>,
    case_sensitive: bool,
}

impl ProjectHost {
    pub fn new(
        state: Arc<Mutex<ProjectState>>,
        options: CompilerOptions,
        resolver: ModuleResolver,
        current_directory: PathBuf,
        default_lib: PathBuf,
        ambient_files: Vec<PathBuf>,
        case_sensitive: bool,
    ) -> Self {
        Self {
            state,
            options,
            resolver,
            current_directory,
            default_lib,
            ambient_files,
            case_sensitive,
        }
    }

    pub fn ambient_files(&self) -> &[PathBuf] {
        &self.ambient_files
    }
}

impl LanguageServiceHost for ProjectHost {
    fn compilation_settings(&self) -> &CompilerOptions {
        &self.options
    }

    fn script_file_names(&self) -> Vec<PathBuf> {
        self.state.lock().snapshots.list_for_engine(&self.ambient_files)
    }

    fn script_version(&self, path: &Path) -> Option<u64> {
        self.script_snapshot(path).map(|s| s.version())
    }

    fn script_snapshot(&self, path: &Path) -> Option<Arc<Snapshot>> {
        self.state.lock().snapshot_or_load(path)
    }

    fn current_directory(&self) -> &Path {
        &self.current_directory
    }

    fn default_lib_file_name(&self) -> &Path {
        &self.default_lib
    }

    fn file_exists(&self, path: &Path) -> bool {
        ProjectSys::new(&self.state.lock().snapshots).file_exists(path)
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        ProjectSys::new(&self.state.lock().snapshots).read_file(path)
    }

    fn read_directory(
        &self,
        dir: &Path,
        extensions: &[&str],
        depth: Option<usize>,
    ) -> Vec<PathBuf> {
        ProjectSys::new(&self.state.lock().snapshots).read_directory(dir, extensions, depth)
    }

    fn directory_exists(&self, path: &Path) -> bool {
        ProjectSys::new(&self.state.lock().snapshots).directory_exists(path)
    }

    fn resolve_module_names(
        &self,
        containing: &Path,
        specifiers: &[String],
    ) -> Vec<Option<ResolvedModule>> {
        let mut guard = self.state.lock();
        let ProjectState {
            snapshots,
            resolutions,
        } = &mut *guard;
        let sys = ProjectSys::new(snapshots);
        self.resolver
            .resolve_module_names(containing, specifiers, resolutions, &sys)
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        self.case_sensitive
    }

    fn script_kind(&self, path: &Path) -> ScriptKind {
        ProjectSys::new(&self.state.lock().snapshots).script_kind(path)
    }
}
