//! Minimal built-in engine
//!
//! Knows nothing about types. It lists the program and follows imports,
//! which is enough to drive a project end to end through the host
//! interface.

use regex::Regex;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use super::{EngineFactory, LanguageService, LanguageServiceHost};
use crate::module_loader::ResolvedModule;

static IMPORT_SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)(?:^|[;\s])(?:import|export)\s+(?:[^'";]*?\s+from\s+)?['"](?P<from>[^'"]+)['"]|import\(\s*['"](?P<dynamic>[^'"]+)['"]\s*\)"#,
    )
    .expect("import regex is valid")
});

/// One import of a program file and where it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEdge {
    pub specifier: String,
    pub resolved: Option<ResolvedModule>,
}

pub struct InventoryService {
    host: Arc<dyn LanguageServiceHost>,
    disposed: AtomicBool,
}

impl InventoryService {
    pub fn new(host: Arc<dyn LanguageServiceHost>) -> Self {
        Self {
            host,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn host(&self) -> &Arc<dyn LanguageServiceHost> {
        &self.host
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Root files that currently have content
    pub fn program_files(&self) -> Vec<PathBuf> {
        self.host
            .script_file_names()
            .into_iter()
            .filter(|path| self.host.script_snapshot(path).is_some())
            .collect()
    }

    /// Import specifiers found in `path`, in source order
    pub fn import_specifiers(&self, path: &Path) -> Vec<String> {
        let Some(snapshot) = self.host.script_snapshot(path) else {
            return Vec::new();
        };
        IMPORT_SPECIFIER
            .captures_iter(snapshot.text())
            .filter_map(|caps| caps.name("from").or_else(|| caps.name("dynamic")))
            .map(|m| m.as_str().to_string())
            .collect()
    }

    pub fn imports(&self, path: &Path) -> Vec<ImportEdge> {
        let specifiers = self.import_specifiers(path);
        let resolved = self.host.resolve_module_names(path, &specifiers);
        specifiers
            .into_iter()
            .zip(resolved)
            .map(|(specifier, resolved)| ImportEdge {
                specifier,
                resolved,
            })
            .collect()
    }

    /// Imports of `path` that did not resolve
    pub fn unresolved_imports(&self, path: &Path) -> Vec<String> {
        self.imports(path)
            .into_iter()
            .filter(|edge| edge.resolved.is_none())
            .map(|edge| edge.specifier)
            .collect()
    }
}

impl LanguageService for InventoryService {
    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory for [`InventoryService`]
#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryFactory;

impl EngineFactory for InventoryFactory {
    fn create(&self, host: Arc<dyn LanguageServiceHost>) -> Arc<dyn LanguageService> {
        Arc::new(InventoryService::new(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_static_and_dynamic_imports() {
        let text = "import A from './A.svelte';\nimport { b } from \"../b\";\nimport './side.css';\nexport * from './re';\nconst c = await import('./lazy');\nconst s = 'import x from \"no\"';";
        let found: Vec<&str> = IMPORT_SPECIFIER
            .captures_iter(text)
            .filter_map(|caps| caps.name("from").or_else(|| caps.name("dynamic")))
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, ["./A.svelte", "../b", "./side.css", "./re", "./lazy"]);
    }
}
