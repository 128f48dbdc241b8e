//! CLI entry point for the Svelte TypeScript project service.
//!
//! Loads a workspace the way an editor session would and prints what the
//! engine would see: the owning project, its files, and where imports go.

use anyhow::{Context, bail};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use svelte_ts_service::service::InventoryService;
use svelte_ts_service::{
    InventoryFactory, ProjectContainer, ProjectKey, ResolvedModule, ScriptBlockPreprocessor,
    ServiceRegistry, Settings,
};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Svelte TypeScript project service
#[derive(Parser)]
#[command(
    name = "svelte-ts-service",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspect Svelte/TypeScript projects as the language service sees them",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Open files in their projects and report resolutions
    #[command(about = "Load the projects owning the given files and list their imports")]
    Inspect {
        /// Workspace root
        workspace: PathBuf,

        /// Files to open; defaults to every declared project file
        #[arg(num_args = 0..)]
        files: Vec<PathBuf>,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show effective compiler options
    #[command(about = "Print the compiler options the engine receives for a workspace")]
    Config {
        /// Workspace root
        workspace: PathBuf,

        /// File whose owning project is shown; defaults to the workspace project
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct FileReport {
    path: PathBuf,
    version: u64,
    script_kind: svelte_ts_service::ScriptKind,
    parser_error: Option<String>,
    imports: Vec<ImportReport>,
}

#[derive(Debug, Serialize)]
struct ImportReport {
    specifier: String,
    resolved: Option<ResolvedModule>,
}

#[derive(Debug, Serialize)]
struct ProjectReport {
    key: ProjectKey,
    workspace_root: PathBuf,
    references: Vec<PathBuf>,
    declared_files: usize,
    diagnostics: Vec<String>,
    files: Vec<FileReport>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path).map_err(|e| {
            anyhow::anyhow!("Configuration error loading from {}: {e}", path.display())
        })?,
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        }),
    };

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        settings
            .logging
            .level
            .parse()
            .unwrap_or(tracing::Level::WARN)
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let workspace = match &cli.command {
        Commands::Inspect { workspace, .. } | Commands::Config { workspace, .. } => {
            absolute(workspace)?
        }
    };
    if !workspace.is_dir() {
        bail!("workspace {} is not a directory", workspace.display());
    }
    if !settings.workspace_roots.contains(&workspace) {
        settings.workspace_roots.push(workspace.clone());
    }

    let registry = ServiceRegistry::new(
        settings,
        Arc::new(ScriptBlockPreprocessor),
        Arc::new(InventoryFactory),
    );

    let result = match &cli.command {
        Commands::Inspect { files, json, .. } => {
            inspect(&registry, &workspace, files, *json).await
        }
        Commands::Config { file, .. } => show_config(&registry, &workspace, file.as_deref()).await,
    };
    registry.shutdown();
    result
}

async fn inspect(
    registry: &ServiceRegistry,
    workspace: &Path,
    files: &[PathBuf],
    json: bool,
) -> anyhow::Result<()> {
    let files = if files.is_empty() {
        let container = project_for(registry, workspace, None).await?;
        container.host().script_file_names()
    } else {
        files
            .iter()
            .map(|f| absolute(f))
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    let mut reports: Vec<ProjectReport> = Vec::new();
    for file in files {
        if !file.is_file() {
            continue;
        }
        let container = registry
            .get_for_file(&file)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let report = file_report(&container, &file);

        match reports.iter_mut().find(|r| &r.key == container.key()) {
            Some(project) => project.files.push(report),
            None => reports.push(ProjectReport {
                key: container.key().clone(),
                workspace_root: container.workspace_root().to_path_buf(),
                references: container.referenced_configs().to_vec(),
                declared_files: container.host().script_file_names().len(),
                diagnostics: container
                    .config_diagnostics()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                files: vec![report],
            }),
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for project in &reports {
        println!("Project: {}", project.key);
        println!("{}", "=".repeat(50));
        println!("Workspace: {}", project.workspace_root.display());
        for reference in &project.references {
            println!("References: {}", reference.display());
        }
        println!("Files known to the engine: {}", project.declared_files);
        for diagnostic in &project.diagnostics {
            println!("  config: {diagnostic}");
        }
        for file in &project.files {
            println!(
                "\n{} (v{}, {:?})",
                file.path.display(),
                file.version,
                file.script_kind
            );
            if let Some(error) = &file.parser_error {
                println!("  parse error: {error}");
            }
            for import in &file.imports {
                match &import.resolved {
                    Some(module) => println!(
                        "  {} -> {}",
                        import.specifier,
                        module.resolved_file_name.display()
                    ),
                    None => println!("  {} -> (unresolved)", import.specifier),
                }
            }
        }
        println!();
    }
    Ok(())
}

fn file_report(container: &ProjectContainer, file: &Path) -> FileReport {
    let snapshot = container.update_snapshot(file);
    let service = container.get_service();
    let imports = service
        .as_any()
        .downcast_ref::<InventoryService>()
        .map(|inventory| {
            inventory
                .imports(file)
                .into_iter()
                .map(|edge| ImportReport {
                    specifier: edge.specifier,
                    resolved: edge.resolved,
                })
                .collect()
        })
        .unwrap_or_default();

    FileReport {
        path: file.to_path_buf(),
        version: snapshot.version(),
        script_kind: snapshot.script_kind(),
        parser_error: snapshot.parser_error().map(ToString::to_string),
        imports,
    }
}

async fn show_config(
    registry: &ServiceRegistry,
    workspace: &Path,
    file: Option<&Path>,
) -> anyhow::Result<()> {
    let file = file.map(absolute).transpose()?;
    let container = project_for(registry, workspace, file.as_deref()).await?;
    println!("Project: {}", container.key());
    println!("{}", serde_json::to_string_pretty(container.compiler_options())?);
    for diagnostic in container.config_diagnostics() {
        eprintln!("Warning: {diagnostic}");
    }
    Ok(())
}

async fn project_for(
    registry: &ServiceRegistry,
    workspace: &Path,
    file: Option<&Path>,
) -> anyhow::Result<Arc<ProjectContainer>> {
    let key = ProjectKey::for_file(file.unwrap_or(workspace), workspace);
    registry.get(&key).await.map_err(|e| {
        let suggestions = e.recovery_suggestions().join("\n  ");
        anyhow::anyhow!("{e} [{}]\n  {suggestions}", e.status_code())
    })
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot read current directory")?
            .join(path)
    };
    Ok(svelte_ts_service::project_resolver::normalize_path(&path))
}
