//! Module resolution on behalf of the engine
//!
//! Resolution results, including failures, are memoized per importing file
//! and specifier. A failure stays cached until a file that could satisfy it
//! appears; the owning container purges it through
//! [`ResolutionCache::delete_unresolved_for`].

pub mod sys;

pub use sys::ProjectSys;

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::paths::{ensure_real_svelte_path, file_stem};
use crate::project_resolver::options::CompilerOptions;
use crate::project_resolver::tsconfig::{PathAliasResolver, split_package_specifier};
use crate::project_resolver::normalize_path;
use crate::snapshot::ScriptKind;

/// Suffixes tried after the bare candidate, in order. `.svelte` + `.ts` is
/// the engine's virtual probe and maps back to the component.
const FILE_SUFFIXES: &[&str] = &[".ts", ".tsx", ".d.ts", ".js", ".jsx", ".svelte"];
const INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.d.ts", "index.js", "index.jsx"];
const PACKAGE_ENTRY_FIELDS: &[&str] = &["types", "typings", "main"];

/// A successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedModule {
    pub resolved_file_name: PathBuf,
    pub extension: ScriptKind,
    pub is_external_library: bool,
}

/// Memo of `(containing file, specifier)` -> resolution; `None` is a cached failure
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<(PathBuf, String), Option<ResolvedModule>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outer `None` means no entry; `Some(None)` is a cached failure
    pub fn get(&self, containing: &Path, specifier: &str) -> Option<Option<ResolvedModule>> {
        self.entries
            .get(&(containing.to_path_buf(), specifier.to_string()))
            .cloned()
    }

    pub fn set(&mut self, containing: &Path, specifier: &str, result: Option<ResolvedModule>) {
        self.entries
            .insert((containing.to_path_buf(), specifier.to_string()), result);
    }

    /// Drop successful resolutions that point at `path`
    pub fn delete_resolved_to(&mut self, path: &Path) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, resolved| {
            resolved
                .as_ref()
                .is_none_or(|r| r.resolved_file_name != path)
        });
        before - self.entries.len()
    }

    /// Drop failures whose specifier could name `path`
    pub fn delete_unresolved_for(&mut self, path: &Path) -> usize {
        let stem = file_stem(path);
        if stem.is_empty() {
            return 0;
        }
        let before = self.entries.len();
        self.entries
            .retain(|(_, specifier), resolved| resolved.is_some() || !specifier.contains(stem));
        before - self.entries.len()
    }

    /// Drop every entry made from `containing`
    pub fn delete_from(&mut self, containing: &Path) {
        self.entries.retain(|(from, _), _| from != containing);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves import specifiers with the project's compiler options
#[derive(Debug)]
pub struct ModuleResolver {
    aliases: PathAliasResolver,
    base_url: Option<PathBuf>,
}

impl ModuleResolver {
    pub fn new(options: &CompilerOptions, config_dir: &Path) -> Self {
        Self {
            aliases: PathAliasResolver::from_options(options, config_dir),
            base_url: options.base_url.clone(),
        }
    }

    /// Resolve every specifier imported by `containing`, memoizing results
    /// (failures included) in `cache`
    pub fn resolve_module_names(
        &self,
        containing: &Path,
        specifiers: &[String],
        cache: &mut ResolutionCache,
        sys: &ProjectSys<'_>,
    ) -> Vec<Option<ResolvedModule>> {
        specifiers
            .iter()
            .map(|specifier| {
                if let Some(cached) = cache.get(containing, specifier) {
                    return cached;
                }
                let resolved = self.resolve(containing, specifier, sys);
                if resolved.is_none() {
                    tracing::debug!(
                        "cannot resolve '{specifier}' from {}",
                        containing.display()
                    );
                }
                cache.set(containing, specifier, resolved.clone());
                resolved
            })
            .collect()
    }

    /// Uncached resolution of one specifier
    pub fn resolve(
        &self,
        containing: &Path,
        specifier: &str,
        sys: &ProjectSys<'_>,
    ) -> Option<ResolvedModule> {
        let dir = containing.parent().unwrap_or(Path::new("/"));

        let found = if is_relative(specifier) || Path::new(specifier).is_absolute() {
            resolve_file_or_directory(&dir.join(specifier), sys)
        } else {
            self.aliases
                .resolve_import(specifier)
                .iter()
                .find_map(|target| resolve_file_or_directory(target, sys))
                .or_else(|| {
                    self.base_url
                        .as_ref()
                        .and_then(|base| resolve_file_or_directory(&base.join(specifier), sys))
                })
                .or_else(|| resolve_node_module(specifier, dir, sys))
        }?;

        Some(ResolvedModule {
            extension: sys.script_kind(&found),
            is_external_library: is_in_node_modules(&found),
            resolved_file_name: found,
        })
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

fn is_in_node_modules(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == "node_modules"))
}

/// `base` as-is, with each suffix, then as a directory with an index file.
/// Candidates are normalized to real paths before the existence check.
fn resolve_file_or_directory(base: &Path, sys: &ProjectSys<'_>) -> Option<PathBuf> {
    let base = normalize_path(base);
    let mut candidates = vec![base.clone()];
    candidates.extend(FILE_SUFFIXES.iter().map(|suffix| {
        let mut name = base.clone().into_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }));
    candidates.extend(INDEX_FILES.iter().map(|index| base.join(index)));

    candidates
        .into_iter()
        .map(|candidate| ensure_real_svelte_path(&candidate))
        .find(|candidate| sys.file_exists(candidate))
}

fn resolve_node_module(specifier: &str, from_dir: &Path, sys: &ProjectSys<'_>) -> Option<PathBuf> {
    let (package, subpath) = split_package_specifier(specifier);
    let types_package = format!("@types/{}", package.trim_start_matches('@').replace('/', "__"));

    from_dir.ancestors().find_map(|dir| {
        let modules = dir.join("node_modules");
        [package, types_package.as_str()].iter().find_map(|name| {
            let package_dir = modules.join(name);
            match subpath {
                Some(sub) => resolve_file_or_directory(&package_dir.join(sub), sys),
                None => resolve_package_entry(&package_dir, sys)
                    .or_else(|| resolve_file_or_directory(&package_dir, sys)),
            }
        })
    })
}

/// Entry point named by `package.json` (`types`, `typings`, then `main`)
fn resolve_package_entry(package_dir: &Path, sys: &ProjectSys<'_>) -> Option<PathBuf> {
    let manifest = sys.read_file(&package_dir.join("package.json"))?;
    let manifest: Value = serde_json::from_str(&manifest).ok()?;
    PACKAGE_ENTRY_FIELDS.iter().find_map(|field| {
        let entry = manifest.get(*field)?.as_str()?;
        let entry = package_dir.join(entry);
        resolve_file_or_directory(&entry, sys).or_else(|| {
            // `main: "index.js"` alongside `index.d.ts`
            let stripped = entry.with_extension("");
            resolve_file_or_directory(&stripped, sys)
        })
    })
}
