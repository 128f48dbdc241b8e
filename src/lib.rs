/// Per-project TypeScript language service instances for Svelte workspaces
pub mod config;
pub mod error;
pub mod module_loader;
pub mod paths;
pub mod preprocess;
pub mod project_resolver;
pub mod service;
pub mod snapshot;

// Explicit exports for better API clarity
pub use config::Settings;
pub use error::{ConfigError, ConfigResult, ServiceError, ServiceResult, SharedResult};
pub use module_loader::{ModuleResolver, ProjectSys, ResolutionCache, ResolvedModule};
pub use preprocess::{ParserError, Preprocessor, ScriptBlockPreprocessor};
pub use project_resolver::{CompilerOptions, ConfigDiagnostic, ParsedConfig, ProjectKey};
pub use service::{
    EditorDocument, EngineFactory, InventoryFactory, InventoryService, LanguageService,
    LanguageServiceHost, ProjectContainer, ServiceRegistry, SnapshotSource,
};
pub use snapshot::{ScriptKind, Snapshot, SnapshotCache, TextEdit};
