//! Project configuration resolver
//!
//! Answers "which project owns this file, and what does that project look
//! like to the engine": config discovery, `extends` merging, forced compiler
//! options and the declared file list.
//!
//! This is distinct from `module_loader`, which answers where an import
//! inside a project points to.

pub mod config_loader;
pub mod files;
pub mod options;
pub mod tsconfig;

pub use config_loader::{ParsedConfig, load_project_config};
pub use options::CompilerOptions;

use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Config file names probed in each directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &["tsconfig.json", "jsconfig.json"];

/// Identity of a project. One live container exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectKey {
    /// Absolute path of the owning config file
    Config(PathBuf),
    /// No config file; the project is synthesized for the workspace
    Inferred { workspace_root: PathBuf },
}

impl ProjectKey {
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            Self::Config(path) => Some(path),
            Self::Inferred { .. } => None,
        }
    }

    /// Key for `file`: the nearest config up to the workspace root, else
    /// the inferred project of that root
    pub fn for_file(file: &Path, workspace_root: &Path) -> Self {
        match find_config_path(file, Some(workspace_root)) {
            Some(config) => Self::Config(config),
            None => Self::Inferred {
                workspace_root: normalize_path(workspace_root),
            },
        }
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(path) => write!(f, "{}", path.display()),
            Self::Inferred { workspace_root } => {
                write!(f, "<inferred {}>", workspace_root.display())
            }
        }
    }
}

/// A config problem reported to the user but never fatal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigDiagnostic {
    pub file: PathBuf,
    pub message: String,
}

impl ConfigDiagnostic {
    pub fn new(file: &Path, message: impl Into<String>) -> Self {
        Self {
            file: file.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Directories searched for the config owning `file`, nearest first.
/// The walk stops at `workspace_root` when `file` lives below it.
fn config_search_dirs<'a>(
    file: &'a Path,
    workspace_root: Option<&'a Path>,
) -> impl Iterator<Item = &'a Path> {
    let start = if file.is_dir() {
        Some(file)
    } else {
        file.parent()
    };
    let bound = workspace_root.filter(|root| file.starts_with(root));
    let mut done = false;
    start
        .into_iter()
        .flat_map(Path::ancestors)
        .take_while(move |dir| {
            if done {
                return false;
            }
            if bound.is_some_and(|root| *dir == root) {
                done = true;
            }
            true
        })
}

/// Config file owning `file`, probing `tsconfig.json` then `jsconfig.json`
pub fn find_config_path(file: &Path, workspace_root: Option<&Path>) -> Option<PathBuf> {
    config_search_dirs(file, workspace_root).find_map(|dir| {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Every key that could own `file`, nearest first, without probing disk.
/// Used for pure registry lookups.
pub fn candidate_keys(file: &Path, workspace_root: Option<&Path>) -> Vec<ProjectKey> {
    let mut keys: Vec<ProjectKey> = file
        .ancestors()
        .skip(1)
        .take_while(|dir| workspace_root.is_none_or(|root| dir.starts_with(root)))
        .flat_map(|dir| {
            CONFIG_FILE_NAMES
                .iter()
                .map(move |name| ProjectKey::Config(dir.join(name)))
        })
        .collect();
    if let Some(root) = workspace_root {
        keys.push(ProjectKey::Inferred {
            workspace_root: normalize_path(root),
        });
    }
    keys
}
