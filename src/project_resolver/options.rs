//! Compiler options as the engine receives them
//!
//! User and extended config is merged first; the overrides below are applied
//! afterwards and win over anything the project declares.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::snapshot::ScriptKind;

/// Recognized prefix of the rendering namespace (`jsxFactory`)
pub const NAMESPACE_PREFIX: &str = "svelte";
pub const DEFAULT_JSX_FACTORY: &str = "svelte.createElement";
pub const NATIVE_JSX_FACTORY: &str = "svelteNative.createElement";
/// Sibling package whose presence selects the native namespace
pub const NATIVE_PACKAGE: &str = "svelte-native";

/// Module kinds the engine cannot use for component imports
const LEGACY_MODULE_KINDS: &[&str] = &["amd", "commonjs", "none", "system", "umd"];

/// Non-TypeScript extension the engine must accept as a script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraFileExtension {
    pub extension: &'static str,
    pub is_mixed_content: bool,
    pub script_kind: ScriptKind,
}

pub const EXTRA_FILE_EXTENSIONS: &[ExtraFileExtension] = &[ExtraFileExtension {
    extension: "svelte",
    is_mixed_content: true,
    script_kind: ScriptKind::Extension,
}];

/// Typed subset of `compilerOptions`; anything else rides along in `extra`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsx_factory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_js: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_non_ts_extensions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_emit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_lib_check: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_node_module_js_depth: Option<u32>,
    /// Absolute once loaded through the config resolver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: BTreeMap<String, Vec<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CompilerOptions {
    pub fn allows_js(&self) -> bool {
        self.allow_js.unwrap_or(false)
    }

    /// Apply the overrides no project config may change
    pub fn apply_forced_overrides(&mut self) {
        self.allow_non_ts_extensions = Some(true);
        self.target = Some("ESNext".to_string());
        self.allow_js = Some(true);
        self.no_emit = Some(true);
        self.declaration = Some(false);
        self.skip_lib_check = Some(true);
        self.jsx = Some("preserve".to_string());

        let legacy_module = self
            .module
            .as_deref()
            .is_none_or(|m| LEGACY_MODULE_KINDS.contains(&m.to_ascii_lowercase().as_str()));
        if legacy_module {
            self.module = Some("ESNext".to_string());
        }

        let classic_resolution = self
            .module_resolution
            .as_deref()
            .is_none_or(|r| r.eq_ignore_ascii_case("classic"));
        if classic_resolution {
            self.module_resolution = Some("node".to_string());
        }
    }

    /// Pick the rendering namespace unless the project already chose a
    /// recognized one. Probing is best effort.
    pub fn infer_jsx_factory(&mut self, workspace_root: Option<&Path>) {
        if self
            .jsx_factory
            .as_deref()
            .is_some_and(|f| f.starts_with(NAMESPACE_PREFIX))
        {
            return;
        }

        self.jsx_factory = Some(DEFAULT_JSX_FACTORY.to_string());
        if let Some(root) = workspace_root
            && find_package_dir(NATIVE_PACKAGE, root).is_some()
        {
            tracing::debug!("found {NATIVE_PACKAGE} under {}", root.display());
            self.jsx_factory = Some(NATIVE_JSX_FACTORY.to_string());
        }
    }
}

/// Directory of `node_modules/<name>` visible from `from`, if any
pub fn find_package_dir(name: &str, from: &Path) -> Option<PathBuf> {
    from.ancestors()
        .map(|dir| dir.join("node_modules").join(name))
        .find(|dir| dir.join("package.json").is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn forced_overrides_win_over_project_values() {
        let mut options: CompilerOptions = serde_json::from_value(serde_json::json!({
            "allowJs": false,
            "noEmit": false,
            "declaration": true,
            "target": "ES5",
            "module": "CommonJS",
            "moduleResolution": "Classic",
            "strict": true
        }))
        .unwrap();

        options.apply_forced_overrides();

        assert_eq!(options.allow_js, Some(true));
        assert_eq!(options.no_emit, Some(true));
        assert_eq!(options.declaration, Some(false));
        assert_eq!(options.allow_non_ts_extensions, Some(true));
        assert_eq!(options.target.as_deref(), Some("ESNext"));
        assert_eq!(options.module.as_deref(), Some("ESNext"));
        assert_eq!(options.module_resolution.as_deref(), Some("node"));
        assert_eq!(options.jsx.as_deref(), Some("preserve"));
        // Unknown options pass through
        assert_eq!(options.extra.get("strict"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn modern_module_settings_are_kept() {
        let mut options = CompilerOptions {
            module: Some("NodeNext".to_string()),
            module_resolution: Some("bundler".to_string()),
            ..Default::default()
        };
        options.apply_forced_overrides();
        assert_eq!(options.module.as_deref(), Some("NodeNext"));
        assert_eq!(options.module_resolution.as_deref(), Some("bundler"));
    }

    #[test]
    fn jsx_factory_defaults_and_detects_native() {
        let temp_dir = TempDir::new().unwrap();

        let mut options = CompilerOptions {
            jsx_factory: Some("React.createElement".to_string()),
            ..Default::default()
        };
        options.infer_jsx_factory(Some(temp_dir.path()));
        assert_eq!(options.jsx_factory.as_deref(), Some(DEFAULT_JSX_FACTORY));

        let pkg = temp_dir.path().join("node_modules").join(NATIVE_PACKAGE);
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("package.json"), "{}").unwrap();

        let mut options = CompilerOptions::default();
        options.infer_jsx_factory(Some(temp_dir.path()));
        assert_eq!(options.jsx_factory.as_deref(), Some(NATIVE_JSX_FACTORY));
    }

    #[test]
    fn recognized_namespace_is_left_alone() {
        let mut options = CompilerOptions {
            jsx_factory: Some("svelteCustom.h".to_string()),
            ..Default::default()
        };
        options.infer_jsx_factory(None);
        assert_eq!(options.jsx_factory.as_deref(), Some("svelteCustom.h"));
    }
}
