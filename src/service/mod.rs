//! Engine seam and the per-project service layer
//!
//! The analysis engine is external. It talks to a project only through
//! [`LanguageServiceHost`] and is created by an [`EngineFactory`]; the
//! container and registry never look inside a [`LanguageService`].

pub mod container;
pub mod host;
pub mod inventory;
pub mod registry;

pub use container::ProjectContainer;
pub use host::{ProjectHost, ProjectState};
pub use inventory::{InventoryFactory, InventoryService};
pub use registry::ServiceRegistry;

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::module_loader::ResolvedModule;
use crate::project_resolver::CompilerOptions;
use crate::snapshot::{ScriptKind, Snapshot};

/// Callbacks the engine needs from its host
pub trait LanguageServiceHost: Send + Sync {
    fn compilation_settings(&self) -> &CompilerOptions;

    /// Every file the engine should treat as a root
    fn script_file_names(&self) -> Vec<PathBuf>;

    /// Version of the current snapshot; changes whenever content does
    fn script_version(&self, path: &Path) -> Option<u64>;

    fn script_snapshot(&self, path: &Path) -> Option<Arc<Snapshot>>;

    fn current_directory(&self) -> &Path;

    fn default_lib_file_name(&self) -> &Path;

    fn file_exists(&self, path: &Path) -> bool;

    fn read_file(&self, path: &Path) -> Option<String>;

    fn read_directory(&self, dir: &Path, extensions: &[&str], depth: Option<usize>)
    -> Vec<PathBuf>;

    fn directory_exists(&self, path: &Path) -> bool;

    fn resolve_module_names(
        &self,
        containing: &Path,
        specifiers: &[String],
    ) -> Vec<Option<ResolvedModule>>;

    fn use_case_sensitive_file_names(&self) -> bool;

    fn script_kind(&self, path: &Path) -> ScriptKind;
}

/// Opaque handle to a live engine instance
pub trait LanguageService: Send + Sync {
    /// Release engine resources; the instance is not used afterwards
    fn dispose(&self);

    /// Downcast hook for callers that know the concrete engine
    fn as_any(&self) -> &dyn Any;
}

/// Creates engine instances bound to a host
pub trait EngineFactory: Send + Sync {
    fn create(&self, host: Arc<dyn LanguageServiceHost>) -> Arc<dyn LanguageService>;
}

/// Text and version of a document open in the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorDocument {
    pub path: PathBuf,
    pub version: i32,
    pub text: String,
}

impl EditorDocument {
    pub fn new(path: impl Into<PathBuf>, version: i32, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version,
            text: text.into(),
        }
    }
}

/// Where a snapshot update takes its content from
#[derive(Debug, Clone, Copy)]
pub enum SnapshotSource<'a> {
    /// Live editor state
    Document(&'a EditorDocument),
    /// A file that is not open; read from disk
    Path(&'a Path),
}

impl SnapshotSource<'_> {
    pub fn path(&self) -> &Path {
        match self {
            Self::Document(doc) => &doc.path,
            Self::Path(path) => path,
        }
    }
}

impl<'a> From<&'a EditorDocument> for SnapshotSource<'a> {
    fn from(doc: &'a EditorDocument) -> Self {
        Self::Document(doc)
    }
}

impl<'a> From<&'a Path> for SnapshotSource<'a> {
    fn from(path: &'a Path) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<&'a PathBuf> for SnapshotSource<'a> {
    fn from(path: &'a PathBuf) -> Self {
        Self::Path(path)
    }
}
