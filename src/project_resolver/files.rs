//! Declared project file list from raw `files` / `include` / `exclude`
//!
//! Patterns are either absolute (rebased while merging `extends`) or
//! relative to the config directory.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use super::options::EXTRA_FILE_EXTENSIONS;
use super::normalize_path;

/// Build output directories excluded by default
pub const IGNORED_BUILD_DIRS: &[&str] = &["__sapper__", ".svelte-kit", ".svelte"];

const TS_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];
const JS_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

/// `node_modules` plus the build directories, plus configured extras
pub fn default_excludes(extra_build_dirs: &[String]) -> Vec<String> {
    std::iter::once("node_modules")
        .chain(IGNORED_BUILD_DIRS.iter().copied())
        .map(str::to_string)
        .chain(extra_build_dirs.iter().cloned())
        .collect()
}

/// Whether the engine would accept `path` as a project script
pub fn is_supported_file(path: &Path, allow_js: bool) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    TS_EXTENSIONS.contains(&ext)
        || (allow_js && JS_EXTENSIONS.contains(&ext))
        || EXTRA_FILE_EXTENSIONS.iter().any(|extra| extra.extension == ext)
}

fn string_list(raw: &Value, key: &str) -> Option<Vec<String>> {
    raw.get(key)?.as_array().map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    })
}

fn absolute_pattern(config_dir: &Path, pattern: &str) -> String {
    normalize_path(&config_dir.join(pattern))
        .to_string_lossy()
        .into_owned()
}

fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?'])
}

/// Patterns naming a directory also match everything below it
fn expand_pattern(pattern: &str, into: &mut Vec<String>) {
    into.push(pattern.to_string());
    let last = pattern.rsplit('/').next().unwrap_or(pattern);
    if !has_wildcard(last) && !last.contains('.') {
        into.push(format!("{}/**/*", pattern.trim_end_matches('/')));
    }
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => tracing::debug!("skipping invalid pattern {pattern}: {e}"),
        }
    }
    builder.build().unwrap_or_else(|e| {
        tracing::debug!("cannot build glob set: {e}");
        GlobSet::empty()
    })
}

/// Directory to start walking from: the literal prefix before any wildcard
fn walk_root(pattern: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for component in Path::new(pattern).components() {
        match component {
            Component::Normal(segment) if has_wildcard(&segment.to_string_lossy()) => break,
            other => root.push(other),
        }
    }
    if root.is_file() {
        root.parent().map(Path::to_path_buf).unwrap_or(root)
    } else {
        root
    }
}

/// Files the config declares, in a stable order
pub fn project_file_names(raw: &Value, config_dir: &Path, allow_js: bool) -> Vec<PathBuf> {
    let files = string_list(raw, "files");
    let include = match (string_list(raw, "include"), &files) {
        (Some(include), _) => include,
        (None, Some(_)) => Vec::new(),
        (None, None) => vec!["**/*".to_string()],
    };
    let exclude = string_list(raw, "exclude").unwrap_or_default();

    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for file in files.unwrap_or_default() {
        let path = normalize_path(&config_dir.join(file));
        if seen.insert(path.clone()) {
            names.push(path);
        }
    }

    let include: Vec<String> = include
        .iter()
        .map(|p| absolute_pattern(config_dir, p))
        .collect();
    let mut include_patterns = Vec::new();
    for pattern in &include {
        expand_pattern(pattern, &mut include_patterns);
    }
    let mut exclude_patterns = Vec::new();
    for pattern in &exclude {
        let pattern = absolute_pattern(config_dir, pattern);
        exclude_patterns.push(format!("{}/**", pattern.trim_end_matches('/')));
        exclude_patterns.push(pattern);
    }

    let include_set = build_globset(&include_patterns);
    let exclude_set = build_globset(&exclude_patterns);

    let mut roots: Vec<PathBuf> = include.iter().map(|p| walk_root(p)).collect();
    roots.sort();
    roots.dedup();

    for root in roots {
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                // Wildcard walks never descend into packages
                let is_packages = entry.depth() > 0
                    && entry.file_type().is_dir()
                    && entry.file_name() == "node_modules";
                !is_packages && !exclude_set.is_match(entry.path())
            });

        for entry in walker.filter_map(Result::ok) {
            let path = entry.path();
            if entry.file_type().is_file()
                && is_supported_file(path, allow_js)
                && include_set.is_match(path)
                && seen.insert(path.to_path_buf())
            {
                names.push(path.to_path_buf());
            }
        }
    }

    names
}
