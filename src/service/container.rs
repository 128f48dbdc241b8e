//! One project: config, caches and the live engine instance

use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::host::{ProjectHost, ProjectState};
use super::{EngineFactory, LanguageService, LanguageServiceHost, SnapshotSource};
use crate::config::ProjectConfig;
use crate::error::ServiceResult;
use crate::module_loader::ModuleResolver;
use crate::preprocess::Preprocessor;
use crate::project_resolver::options::find_package_dir;
use crate::project_resolver::{
    CompilerOptions, ConfigDiagnostic, ParsedConfig, ProjectKey, load_project_config,
};
use crate::snapshot::{Snapshot, SnapshotCache, SnapshotUpdate, TextEdit};

/// Preprocessor package shipping the ambient declarations
pub const AMBIENT_PACKAGE: &str = "svelte2tsx";
pub const AMBIENT_FILE_NAMES: &[&str] =
    &["svelte-shims.d.ts", "svelte-jsx.d.ts", "svelte-native-jsx.d.ts"];
pub const DEFAULT_LIB_FILE_NAME: &str = "lib.esnext.full.d.ts";

struct EngineSlot {
    service: Arc<dyn LanguageService>,
    generation: u64,
}

/// A running project. Created once per [`ProjectKey`] by the registry.
pub struct ProjectContainer {
    key: ProjectKey,
    workspace_root: PathBuf,
    parsed: ParsedConfig,
    state: Arc<Mutex<ProjectState>>,
    host: Arc<ProjectHost>,
    factory: Arc<dyn EngineFactory>,
    engine: Mutex<EngineSlot>,
}

impl ProjectContainer {
    /// Load the project's config and start an engine for it
    pub fn load(
        key: ProjectKey,
        workspace_root: &Path,
        project: &ProjectConfig,
        preprocessor: Arc<dyn Preprocessor>,
        factory: Arc<dyn EngineFactory>,
    ) -> ServiceResult<Self> {
        let parsed = load_project_config(key.config_path(), workspace_root, project)?;
        Ok(Self::new(
            key,
            workspace_root,
            parsed,
            project,
            preprocessor,
            factory,
        ))
    }

    pub fn new(
        key: ProjectKey,
        workspace_root: &Path,
        parsed: ParsedConfig,
        project: &ProjectConfig,
        preprocessor: Arc<dyn Preprocessor>,
        factory: Arc<dyn EngineFactory>,
    ) -> Self {
        let snapshots = SnapshotCache::new(parsed.file_names.clone(), preprocessor);
        let state = Arc::new(Mutex::new(ProjectState::new(snapshots)));

        let host = Arc::new(ProjectHost::new(
            Arc::clone(&state),
            parsed.options.clone(),
            ModuleResolver::new(&parsed.options, &parsed.config_dir),
            workspace_root.to_path_buf(),
            default_lib_path(workspace_root, project),
            ambient_file_paths(workspace_root, project),
            project.use_case_sensitive_file_names(),
        ));

        let service = factory.create(Arc::clone(&host) as Arc<dyn LanguageServiceHost>);
        tracing::info!(
            "created project {key} with {} declared files",
            parsed.file_names.len()
        );

        Self {
            key,
            workspace_root: workspace_root.to_path_buf(),
            parsed,
            state,
            host,
            factory,
            engine: Mutex::new(EngineSlot {
                service,
                generation: 0,
            }),
        }
    }

    /// The live engine. A different instance is returned after a restart.
    pub fn get_service(&self) -> Arc<dyn LanguageService> {
        Arc::clone(&self.engine.lock().service)
    }

    /// Number of engine restarts so far
    pub fn generation(&self) -> u64 {
        self.engine.lock().generation
    }

    pub fn key(&self) -> &ProjectKey {
        &self.key
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn compiler_options(&self) -> &CompilerOptions {
        &self.parsed.options
    }

    /// Project configs listed under `references`, loaded with this one
    pub fn referenced_configs(&self) -> &[PathBuf] {
        &self.parsed.references
    }

    pub fn config_diagnostics(&self) -> &[ConfigDiagnostic] {
        &self.parsed.diagnostics
    }

    pub fn ambient_files(&self) -> &[PathBuf] {
        self.host.ambient_files()
    }

    /// The callback adapter the engine was created with
    pub fn host(&self) -> Arc<dyn LanguageServiceHost> {
        Arc::clone(&self.host) as Arc<dyn LanguageServiceHost>
    }

    pub fn snapshot(&self, path: &Path) -> Option<Arc<Snapshot>> {
        self.state.lock().snapshots.get(path)
    }

    /// Bring the snapshot for an editor document or a closed file up to
    /// date. An unchanged editor version returns the cached snapshot.
    pub fn update_snapshot<'a>(&self, source: impl Into<SnapshotSource<'a>>) -> Arc<Snapshot> {
        let source = source.into();
        let update = {
            let mut state = self.state.lock();
            let path = source.path();
            if !state.snapshots.has(path) {
                state.purge_unresolved(path);
            }
            match source {
                SnapshotSource::Document(doc) => {
                    state
                        .snapshots
                        .update_from_editor_state(&doc.path, doc.version, &doc.text)
                }
                SnapshotSource::Path(path) => state.snapshots.update_from_disk(path),
            }
        };
        self.after_update(update)
    }

    /// Drop the snapshot and every resolution pointing at or made from it
    pub fn delete_snapshot(&self, path: &Path) {
        let mut state = self.state.lock();
        if state.snapshots.delete(path).is_some() {
            tracing::debug!("deleted snapshot {}", path.display());
        }
        state.resolutions.delete_resolved_to(path);
        state.resolutions.delete_from(path);
    }

    /// Re-derive the declared files from the already merged config
    pub fn update_project_files(&self) {
        let names = self.parsed.derive_file_names();
        let mut state = self.state.lock();
        state.snapshots.set_project_file_names(names);
    }

    /// Apply editor edits (or a re-read when `edits` is `None`) to a
    /// TypeScript/JavaScript file. Component files are left alone and
    /// yield `None` either way.
    pub fn update_ts_or_js_file(
        &self,
        path: &Path,
        edits: Option<&[TextEdit]>,
    ) -> Option<Arc<Snapshot>> {
        let update = {
            let mut state = self.state.lock();
            if !state.snapshots.has(path) {
                state.purge_unresolved(path);
            }
            state.snapshots.update_host_file(path, edits)?
        };
        Some(self.after_update(update))
    }

    pub fn has_file(&self, path: &Path) -> bool {
        self.state.lock().snapshots.has(path)
    }

    /// Cached, declared, or declared once the file list is re-derived
    pub fn file_belongs_to_project(&self, path: &Path) -> bool {
        {
            let state = self.state.lock();
            if state.snapshots.has(path) || state.snapshots.is_project_file(path) {
                return true;
            }
        }
        self.parsed
            .derive_file_names()
            .iter()
            .any(|name| name == path)
    }

    /// Dispose the live engine. Used at shutdown.
    pub fn dispose(&self) {
        self.engine.lock().service.dispose();
    }

    fn after_update(&self, update: SnapshotUpdate) -> Arc<Snapshot> {
        if update.kind_changed {
            self.restart_engine(update.snapshot.file_path());
        }
        update.snapshot
    }

    /// Engines cannot switch a file's script kind in place; replace the
    /// instance and keep the caches.
    fn restart_engine(&self, changed: &Path) {
        let fresh = self
            .factory
            .create(Arc::clone(&self.host) as Arc<dyn LanguageServiceHost>);
        let (previous, generation) = {
            let mut slot = self.engine.lock();
            slot.generation += 1;
            (std::mem::replace(&mut slot.service, fresh), slot.generation)
        };
        previous.dispose();
        tracing::info!(
            "script kind of {} changed, restarted engine for {} (generation {generation})",
            changed.display(),
            self.key
        );
    }
}

impl fmt::Debug for ProjectContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectContainer")
            .field("key", &self.key)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

/// Ambient declaration files shipped with the preprocessor
fn ambient_file_paths(workspace_root: &Path, project: &ProjectConfig) -> Vec<PathBuf> {
    let dir = find_package_dir(AMBIENT_PACKAGE, workspace_root).unwrap_or_else(|| {
        let fallback = project
            .ambient_dir
            .clone()
            .unwrap_or_else(|| workspace_root.join("node_modules").join(AMBIENT_PACKAGE));
        tracing::debug!(
            "{AMBIENT_PACKAGE} not found from {}, using {}",
            workspace_root.display(),
            fallback.display()
        );
        fallback
    });
    AMBIENT_FILE_NAMES.iter().map(|name| dir.join(name)).collect()
}

fn default_lib_path(workspace_root: &Path, project: &ProjectConfig) -> PathBuf {
    let lib_dir = project
        .typescript_lib_dir
        .clone()
        .or_else(|| find_package_dir("typescript", workspace_root).map(|dir| dir.join("lib")))
        .unwrap_or_else(|| workspace_root.join("node_modules/typescript/lib"));
    lib_dir.join(DEFAULT_LIB_FILE_NAME)
}
