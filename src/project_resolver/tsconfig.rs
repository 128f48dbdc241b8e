//! tsconfig.json / jsconfig.json reading, `extends` chains and path aliases
//!
//! Configs are kept as raw JSON so file membership can later be re-derived
//! the same way the engine derives it. Syntax problems are collected as
//! diagnostics instead of failing the load.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::options::{CompilerOptions, find_package_dir};
use super::{ConfigDiagnostic, normalize_path};
use crate::error::{ConfigError, ConfigResult};

/// Top-level keys holding paths relative to the declaring config
const PATH_LIST_KEYS: &[&str] = &["include", "exclude", "files"];

/// JSONC parsing helper using json5 for comment and trailing comma support
pub fn parse_jsonc(content: &str) -> Result<Value, String> {
    json5::from_str(content).map_err(|e| format!("Failed to parse config: {e}"))
}

/// Read a config file. A missing or unreadable file is an error; a file
/// with bad syntax is reported as a diagnostic and treated as `{}`.
pub fn read_config(path: &Path, diagnostics: &mut Vec<ConfigDiagnostic>) -> ConfigResult<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;

    match parse_jsonc(&content) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => {
            diagnostics.push(ConfigDiagnostic::new(path, "config root must be an object"));
            Ok(Value::Object(Map::new()))
        }
        Err(message) => {
            diagnostics.push(ConfigDiagnostic::new(path, message));
            Ok(Value::Object(Map::new()))
        }
    }
}

/// Resolve the `extends` chain of `config_path` and merge it, child last.
///
/// Only the root config must be readable. Unresolvable or circular parents
/// become diagnostics. The merged value keeps the root's own `extends` key.
pub fn resolve_extends_chain(
    config_path: &Path,
    visited: &mut HashSet<PathBuf>,
    diagnostics: &mut Vec<ConfigDiagnostic>,
) -> ConfigResult<Value> {
    let config_path = normalize_path(config_path);
    visited.insert(config_path.clone());

    let mut config = read_config(&config_path, diagnostics)?;
    let config_dir = config_path.parent().unwrap_or(Path::new("/")).to_path_buf();
    rebase_paths(&mut config, &config_dir);

    let mut merged = Value::Object(Map::new());
    for extends in extends_entries(&config) {
        let Some(parent_path) = resolve_extends_target(&extends, &config_dir) else {
            diagnostics.push(ConfigDiagnostic::new(
                &config_path,
                format!("cannot find base config '{extends}'"),
            ));
            continue;
        };

        if visited.contains(&parent_path) {
            diagnostics.push(ConfigDiagnostic::new(
                &config_path,
                format!("Circular extends chain detected: {}", parent_path.display()),
            ));
            continue;
        }

        match resolve_extends_chain(&parent_path, visited, diagnostics) {
            Ok(parent) => merged = merge_config(merged, parent),
            Err(e) => diagnostics.push(ConfigDiagnostic::new(&config_path, e.to_string())),
        }
    }

    visited.remove(&config_path);
    Ok(merge_config(merged, config))
}

/// `extends` as a list; both the string and array forms are accepted
pub fn extends_entries(config: &Value) -> Vec<String> {
    match config.get("extends") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Relative and absolute specifiers resolve against the config directory,
/// anything else is looked up as a package in `node_modules`.
fn resolve_extends_target(extends: &str, config_dir: &Path) -> Option<PathBuf> {
    let spec = Path::new(extends);
    let candidate = if spec.is_absolute() || extends.starts_with('.') {
        config_dir.join(spec)
    } else {
        let (package, rest) = split_package_specifier(extends);
        let package_dir = find_package_dir(package, config_dir)?;
        match rest {
            Some(rest) => package_dir.join(rest),
            None => package_dir.join("tsconfig.json"),
        }
    };

    // Add .json extension if not present
    let candidate = if candidate.extension().is_some_and(|ext| ext == "json") {
        candidate
    } else {
        let mut with_ext = candidate.into_os_string();
        with_ext.push(".json");
        PathBuf::from(with_ext)
    };
    let candidate = normalize_path(&candidate);
    candidate.is_file().then_some(candidate)
}

/// `@scope/pkg/sub/path` -> (`@scope/pkg`, Some(`sub/path`))
pub fn split_package_specifier(spec: &str) -> (&str, Option<&str>) {
    let segments = if spec.starts_with('@') { 2 } else { 1 };
    let mut split_at = None;
    for (count, (idx, _)) in spec.match_indices('/').enumerate() {
        if count + 1 == segments {
            split_at = Some(idx);
            break;
        }
    }
    match split_at {
        Some(idx) => (&spec[..idx], Some(&spec[idx + 1..])),
        None => (spec, None),
    }
}

/// Make path-valued settings absolute so they survive merging into a child
fn rebase_paths(config: &mut Value, config_dir: &Path) {
    let Some(obj) = config.as_object_mut() else {
        return;
    };

    for key in PATH_LIST_KEYS {
        if let Some(Value::Array(items)) = obj.get_mut(*key) {
            for item in items.iter_mut() {
                if let Some(s) = item.as_str() {
                    *item = Value::String(join_display(config_dir, s));
                }
            }
        }
    }

    if let Some(Value::String(base_url)) = obj
        .get_mut("compilerOptions")
        .and_then(|o| o.get_mut("baseUrl"))
    {
        *base_url = join_display(config_dir, base_url);
    }
}

fn join_display(dir: &Path, relative: &str) -> String {
    normalize_path(&dir.join(relative)).to_string_lossy().into_owned()
}

/// Merge two configs, with child overriding parent.
/// `compilerOptions` merges key by key, every other key is replaced.
pub fn merge_config(parent: Value, child: Value) -> Value {
    let (Value::Object(mut merged), Value::Object(mut child)) = (parent, child) else {
        return Value::Object(Map::new());
    };

    // References are never inherited
    merged.remove("references");
    merged.remove("extends");

    if let Some(Value::Object(overrides)) = child.remove("compilerOptions") {
        match merged.get_mut("compilerOptions") {
            Some(Value::Object(base)) => base.extend(overrides),
            _ => {
                merged.insert("compilerOptions".to_string(), Value::Object(overrides));
            }
        }
    }
    merged.extend(child);
    Value::Object(merged)
}

/// Paths of the configs listed under `references`, directories resolving
/// to their `tsconfig.json`
pub fn reference_paths(config: &Value, config_dir: &Path) -> Vec<PathBuf> {
    let Some(Value::Array(refs)) = config.get("references") else {
        return Vec::new();
    };
    refs.iter()
        .filter_map(|r| r.get("path").and_then(Value::as_str))
        .map(|p| {
            let path = normalize_path(&config_dir.join(p));
            if path.extension().is_some_and(|ext| ext == "json") {
                path
            } else {
                path.join("tsconfig.json")
            }
        })
        .collect()
}

/// Load every referenced project config, transitively. Referenced configs
/// must exist; syntax problems only produce diagnostics.
pub fn preload_references(
    config: &Value,
    config_path: &Path,
    diagnostics: &mut Vec<ConfigDiagnostic>,
) -> ConfigResult<Vec<PathBuf>> {
    let mut loaded = Vec::new();
    let mut seen = HashSet::from([normalize_path(config_path)]);
    let mut pending: Vec<(PathBuf, PathBuf)> = reference_paths(
        config,
        config_path.parent().unwrap_or(Path::new("/")),
    )
    .into_iter()
    .map(|p| (p, config_path.to_path_buf()))
    .collect();

    while let Some((path, from)) = pending.pop() {
        if !seen.insert(path.clone()) {
            continue;
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Reference {
            path: path.clone(),
            from: from.clone(),
            source,
        })?;
        match parse_jsonc(&content) {
            Ok(referenced) => {
                let dir = path.parent().unwrap_or(Path::new("/"));
                pending.extend(
                    reference_paths(&referenced, dir)
                        .into_iter()
                        .map(|p| (p, path.clone())),
                );
            }
            Err(message) => diagnostics.push(ConfigDiagnostic::new(&path, message)),
        }
        loaded.push(path);
    }
    Ok(loaded)
}

/// Compiled path rule for efficient pattern matching
#[derive(Debug)]
pub struct PathRule {
    /// Original pattern (e.g., "@components/*")
    pub pattern: String,
    /// Target paths (e.g., ["src/components/*"])
    pub targets: Vec<String>,
    /// Compiled regex for pattern matching
    regex: regex::Regex,
}

impl PathRule {
    /// Create a new path rule from pattern and targets.
    /// Returns `None` for patterns that cannot be compiled.
    pub fn new(pattern: String, targets: Vec<String>) -> Option<Self> {
        // "@components/*" becomes "^@components/(.*)$"
        let regex_pattern = format!("^{}$", regex::escape(&pattern).replace("\\*", "(.*)"));
        let regex = regex::Regex::new(&regex_pattern).ok()?;
        Some(Self {
            pattern,
            targets,
            regex,
        })
    }

    /// Substituted targets when `specifier` matches this rule
    pub fn try_resolve(&self, specifier: &str) -> Option<Vec<String>> {
        let captures = self.regex.captures(specifier)?;
        let captured = captures.get(1).map_or("", |m| m.as_str());
        Some(
            self.targets
                .iter()
                .map(|target| target.replacen('*', captured, 1))
                .collect(),
        )
    }
}

/// Path alias resolver for `baseUrl` + `paths`
#[derive(Debug)]
pub struct PathAliasResolver {
    /// Directory `paths` targets are relative to
    base_dir: PathBuf,
    /// Compiled rules, longest pattern first
    rules: Vec<PathRule>,
}

impl PathAliasResolver {
    /// Build from compiler options. `paths` targets resolve against
    /// `baseUrl`, or against `config_dir` when there is none.
    pub fn from_options(options: &CompilerOptions, config_dir: &Path) -> Self {
        let mut rules: Vec<PathRule> = options
            .paths
            .iter()
            .filter_map(|(pattern, targets)| PathRule::new(pattern.clone(), targets.clone()))
            .collect();
        rules.sort_by_key(|rule| std::cmp::Reverse(rule.pattern.len()));

        Self {
            base_dir: options
                .base_url
                .clone()
                .unwrap_or_else(|| config_dir.to_path_buf()),
            rules,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve an import specifier to candidate paths, without extensions
    pub fn resolve_import(&self, specifier: &str) -> Vec<PathBuf> {
        self.rules
            .iter()
            .filter_map(|rule| rule.try_resolve(specifier))
            .flatten()
            .map(|target| normalize_path(&self.base_dir.join(target)))
            .collect()
    }
}
