//! Turn a config path (or its absence) into what a container needs

use serde_json::{Value, json};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::files::{default_excludes, project_file_names};
use super::options::CompilerOptions;
use super::tsconfig::{extends_entries, preload_references, resolve_extends_chain};
use super::{ConfigDiagnostic, normalize_path};
use crate::config::ProjectConfig;
use crate::error::ConfigResult;

/// Fully resolved project configuration
#[derive(Debug, Clone)]
pub struct ParsedConfig {
    /// `None` for an inferred project
    pub config_path: Option<PathBuf>,
    /// Directory relative patterns and the engine's current directory resolve against
    pub config_dir: PathBuf,
    /// Merged options with the forced overrides applied
    pub options: CompilerOptions,
    pub file_names: Vec<PathBuf>,
    /// Merged config object, kept to re-derive the file list later
    pub raw: Value,
    /// Referenced project configs that were preloaded
    pub references: Vec<PathBuf>,
    pub diagnostics: Vec<ConfigDiagnostic>,
}

impl ParsedConfig {
    /// Re-derive the declared file list without reparsing options
    pub fn derive_file_names(&self) -> Vec<PathBuf> {
        project_file_names(&self.raw, &self.config_dir, self.options.allows_js())
    }
}

/// Minimal config used when the workspace has none. Empty `include` keeps
/// unrelated files out of the project.
pub fn default_config() -> Value {
    json!({
        "compilerOptions": { "allowJs": true, "maxNodeModuleJsDepth": 3 },
        "include": []
    })
}

/// Load, merge and normalize the config at `config_path`, or synthesize
/// the default config for `workspace_root` when there is none.
///
/// Only an unreadable root config or referenced project is an error.
pub fn load_project_config(
    config_path: Option<&Path>,
    workspace_root: &Path,
    project: &ProjectConfig,
) -> ConfigResult<ParsedConfig> {
    let mut diagnostics = Vec::new();

    let (config_path, config_dir, mut raw) = match config_path {
        Some(path) => {
            let path = normalize_path(path);
            let raw = resolve_extends_chain(&path, &mut HashSet::new(), &mut diagnostics)?;
            let dir = path
                .parent()
                .map_or_else(|| workspace_root.to_path_buf(), Path::to_path_buf);
            (Some(path), dir, raw)
        }
        None => (None, normalize_path(workspace_root), default_config()),
    };

    let inherits_excludes = !extends_entries(&raw).is_empty();
    if !inherits_excludes
        && raw.get("exclude").is_none()
        && let Some(obj) = raw.as_object_mut()
    {
        obj.insert(
            "exclude".to_string(),
            json!(default_excludes(&project.extra_build_dirs)),
        );
    }

    let mut options = match raw.get("compilerOptions") {
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            diagnostics.push(ConfigDiagnostic::new(
                config_path.as_deref().unwrap_or(workspace_root),
                format!("invalid compilerOptions: {e}"),
            ));
            CompilerOptions::default()
        }),
        None => CompilerOptions::default(),
    };
    options.apply_forced_overrides();
    options.infer_jsx_factory(Some(workspace_root));

    let file_names = project_file_names(&raw, &config_dir, options.allows_js());

    let references = match &config_path {
        Some(path) => preload_references(&raw, path, &mut diagnostics)?,
        None => Vec::new(),
    };

    for diagnostic in &diagnostics {
        tracing::debug!("config diagnostic: {diagnostic}");
    }

    Ok(ParsedConfig {
        config_path,
        config_dir,
        options,
        file_names,
        raw,
        references,
        diagnostics,
    })
}
