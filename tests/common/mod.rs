use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use svelte_ts_service::{
    EngineFactory, InventoryFactory, InventoryService, LanguageService, LanguageServiceHost,
    ScriptBlockPreprocessor, ServiceRegistry, Settings,
};
use tempfile::TempDir;

pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn add_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn settings(&self) -> Settings {
        Settings {
            workspace_roots: vec![self.path().to_path_buf()],
            ..Default::default()
        }
    }

    pub fn registry(&self) -> ServiceRegistry {
        self.registry_with(self.settings(), Arc::new(InventoryFactory))
    }

    pub fn registry_with(
        &self,
        settings: Settings,
        factory: Arc<dyn EngineFactory>,
    ) -> ServiceRegistry {
        ServiceRegistry::new(settings, Arc::new(ScriptBlockPreprocessor), factory)
    }
}

/// Engine factory that counts how many engines it created
#[derive(Default)]
pub struct CountingFactory {
    created: AtomicUsize,
}

impl CountingFactory {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl EngineFactory for CountingFactory {
    fn create(&self, host: Arc<dyn LanguageServiceHost>) -> Arc<dyn LanguageService> {
        self.created.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to pile up on the same key
        std::thread::sleep(std::time::Duration::from_millis(20));
        Arc::new(InventoryService::new(host))
    }
}

pub fn inventory(service: &Arc<dyn LanguageService>) -> &InventoryService {
    service
        .as_any()
        .downcast_ref::<InventoryService>()
        .expect("engine is an InventoryService")
}
