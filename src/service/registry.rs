//! Process-wide map from project key to container
//!
//! Construction is single-flight per key: the first caller starts it on a
//! background task, later callers wait on the same result. A slot moves
//! `Constructing -> Ready` or `Constructing -> Failed`; an absent slot is
//! uninitialized.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use super::{EngineFactory, ProjectContainer};
use crate::config::Settings;
use crate::error::{ServiceError, SharedResult};
use crate::preprocess::Preprocessor;
use crate::project_resolver::{ProjectKey, candidate_keys};

type ContainerResult = SharedResult<Arc<ProjectContainer>>;

enum Slot {
    Constructing(watch::Receiver<Option<ContainerResult>>),
    Ready(Arc<ProjectContainer>),
    Failed(Arc<ServiceError>),
}

pub struct ServiceRegistry {
    slots: Arc<DashMap<ProjectKey, Slot>>,
    /// Owner recorded for each file routed through `get_for_file`
    routes: DashMap<PathBuf, ProjectKey>,
    settings: Arc<Settings>,
    preprocessor: Arc<dyn Preprocessor>,
    factory: Arc<dyn EngineFactory>,
    closed: Arc<AtomicBool>,
}

impl ServiceRegistry {
    pub fn new(
        settings: Settings,
        preprocessor: Arc<dyn Preprocessor>,
        factory: Arc<dyn EngineFactory>,
    ) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            routes: DashMap::new(),
            settings: Arc::new(settings),
            preprocessor,
            factory,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Container for `key`, constructing it on first request. Concurrent
    /// callers for the same key all receive the same container or error.
    pub async fn get(&self, key: &ProjectKey) -> ContainerResult {
        if self.closed.load(Ordering::Acquire) {
            return Err(Arc::new(ServiceError::RegistryClosed));
        }

        let mut start = None;
        let mut receiver = match self.slots.entry(key.clone()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Ready(container) => return Ok(Arc::clone(container)),
                Slot::Failed(error) => return Err(Arc::clone(error)),
                Slot::Constructing(receiver) => receiver.clone(),
            },
            Entry::Vacant(entry) => {
                let (sender, receiver) = watch::channel(None);
                entry.insert(Slot::Constructing(receiver.clone()));
                start = Some(sender);
                receiver
            }
        };

        if let Some(sender) = start {
            self.spawn_construction(key.clone(), sender);
        }

        match receiver.wait_for(Option::is_some).await {
            Ok(result) => match &*result {
                Some(result) => result.clone(),
                None => Err(Arc::new(aborted(key, "no result published"))),
            },
            Err(_) => Err(Arc::new(aborted(key, "construction task ended early"))),
        }
    }

    /// Container for the project owning `path`
    pub async fn get_for_file(&self, path: &Path) -> ContainerResult {
        let root = self.workspace_root_for(path);
        let key = ProjectKey::for_file(path, &root);
        self.routes.insert(path.to_path_buf(), key.clone());
        self.get(&key).await
    }

    /// Whether a container for the project owning `path` exists or is being
    /// built. Never touches the file system.
    ///
    /// Files already routed through [`get_for_file`](Self::get_for_file)
    /// answer for their recorded owner. For any other file the answer is
    /// approximate: the nearest registered config above it counts, even if
    /// a closer config exists on disk without a container.
    pub fn has(&self, path: &Path) -> bool {
        if let Some(key) = self.routes.get(path) {
            return self.is_live(&key);
        }
        let root = self.settings.workspace_root_for(path);
        candidate_keys(path, root)
            .iter()
            .any(|key| self.is_live(key))
    }

    fn is_live(&self, key: &ProjectKey) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| !matches!(*slot, Slot::Failed(_)))
    }

    /// Number of slots in any state
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Dispose every ready container and refuse further requests
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.routes.clear();
        let keys: Vec<ProjectKey> = self.slots.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, Slot::Ready(container))) = self.slots.remove(&key) {
                container.dispose();
            }
        }
        tracing::info!("service registry shut down");
    }

    fn workspace_root_for(&self, path: &Path) -> PathBuf {
        self.settings
            .workspace_root_for(path)
            .map(Path::to_path_buf)
            .or_else(|| path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("/"))
    }

    fn spawn_construction(&self, key: ProjectKey, sender: watch::Sender<Option<ContainerResult>>) {
        let slots = Arc::clone(&self.slots);
        let project = self.settings.project.clone();
        let retry_failed = self.settings.registry.retry_failed;
        let preprocessor = Arc::clone(&self.preprocessor);
        let factory = Arc::clone(&self.factory);
        let closed = Arc::clone(&self.closed);
        let workspace_root = match &key {
            ProjectKey::Config(path) => self.workspace_root_for(path),
            ProjectKey::Inferred { workspace_root } => workspace_root.clone(),
        };

        // Runs to completion even if every waiting caller goes away
        tokio::spawn(async move {
            tracing::debug!("constructing project {key}");
            let build_key = key.clone();
            let joined = tokio::task::spawn_blocking(move || {
                ProjectContainer::load(
                    build_key,
                    &workspace_root,
                    &project,
                    preprocessor,
                    factory,
                )
            })
            .await;

            let result: ContainerResult = match joined {
                Ok(Ok(container)) => Ok(Arc::new(container)),
                Ok(Err(error)) => Err(Arc::new(error)),
                Err(join_error) => Err(Arc::new(aborted(&key, join_error.to_string()))),
            };

            if closed.load(Ordering::Acquire) {
                slots.remove(&key);
                if let Ok(container) = &result {
                    container.dispose();
                }
            } else {
                match &result {
                    Ok(container) => {
                        slots.insert(key.clone(), Slot::Ready(Arc::clone(container)));
                    }
                    Err(error) if retry_failed => {
                        tracing::warn!("project {key} failed to load, will retry: {error}");
                        slots.remove(&key);
                    }
                    Err(error) => {
                        tracing::warn!("project {key} failed to load: {error}");
                        slots.insert(key.clone(), Slot::Failed(Arc::clone(error)));
                    }
                }
            }

            // Waiters may all be gone already
            let _ = sender.send(Some(result));
        });
    }
}

fn aborted(key: &ProjectKey, reason: impl Into<String>) -> ServiceError {
    ServiceError::ConstructionAborted {
        key: key.clone(),
        reason: reason.into(),
    }
}
