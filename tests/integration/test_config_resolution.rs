//! Config loading as seen through a constructed project

use crate::common::TestProject;
use svelte_ts_service::project_resolver::options::{DEFAULT_JSX_FACTORY, NATIVE_JSX_FACTORY};
use svelte_ts_service::{ProjectKey, ScriptKind};

#[tokio::test]
async fn extended_package_config_and_forced_options() {
    let project = TestProject::new();
    project.add_file("node_modules/@tsconfig/svelte/package.json", "{}");
    project.add_file(
        "node_modules/@tsconfig/svelte/tsconfig.json",
        r#"{
            // shared base
            "compilerOptions": {
                "module": "es2020",
                "moduleResolution": "classic",
                "verbatimModuleSyntax": true,
            },
        }"#,
    );
    project.add_file(
        "tsconfig.json",
        r#"{
            "extends": "@tsconfig/svelte/tsconfig.json",
            "compilerOptions": {
                "noEmit": false,
                "jsxFactory": "h",
                "paths": { "$lib/*": ["src/lib/*"] }
            },
            "include": ["src/**/*"]
        }"#,
    );
    let page = project.add_file(
        "src/routes/Page.svelte",
        "<script lang=\"ts\">import Card from '$lib/Card.svelte';</script>",
    );
    let card = project.add_file("src/lib/Card.svelte", "<div />");

    let container = project.registry().get_for_file(&page).await.unwrap();
    let options = container.compiler_options();

    assert_eq!(options.module.as_deref(), Some("es2020"));
    assert_eq!(options.module_resolution.as_deref(), Some("node"));
    assert_eq!(options.no_emit, Some(true));
    assert_eq!(options.jsx.as_deref(), Some("preserve"));
    assert_eq!(options.jsx_factory.as_deref(), Some(DEFAULT_JSX_FACTORY));
    assert!(options.extra.contains_key("verbatimModuleSyntax"));
    assert!(container.config_diagnostics().is_empty());

    let resolved = container
        .host()
        .resolve_module_names(&page, &["$lib/Card.svelte".to_string()]);
    assert_eq!(resolved[0].as_ref().unwrap().resolved_file_name, card);
}

#[tokio::test]
async fn native_package_switches_the_namespace() {
    let project = TestProject::new();
    project.add_file("node_modules/svelte-native/package.json", "{}");
    project.add_file("tsconfig.json", "{}");
    let file = project.add_file("app/App.svelte", "<page></page>");

    let container = project.registry().get_for_file(&file).await.unwrap();
    assert_eq!(
        container.compiler_options().jsx_factory.as_deref(),
        Some(NATIVE_JSX_FACTORY)
    );
}

#[tokio::test]
async fn broken_config_still_builds_a_project() {
    let project = TestProject::new();
    project.add_file("jsconfig.json", "{ \"compilerOptions\": { ");
    let file = project.add_file("src/index.js", "export default 1;");

    let container = project.registry().get_for_file(&file).await.unwrap();
    assert_eq!(
        container.key(),
        &ProjectKey::Config(project.path().join("jsconfig.json"))
    );
    assert_eq!(container.config_diagnostics().len(), 1);
    // Treated as `{}`: everything but the default excludes
    assert!(container.file_belongs_to_project(&file));
    assert_eq!(container.host().script_kind(&file), ScriptKind::Host);
}

#[tokio::test]
async fn build_output_is_excluded_by_default() {
    let project = TestProject::new();
    project.add_file("tsconfig.json", "{}");
    let source = project.add_file("src/app.ts", "");
    let generated = project.add_file(".svelte-kit/types/app.d.ts", "");
    let sapper = project.add_file("__sapper__/build/server.js", "");

    let container = project.registry().get_for_file(&source).await.unwrap();
    let files = container.host().script_file_names();
    assert!(files.contains(&source));
    assert!(!files.contains(&generated));
    assert!(!files.contains(&sapper));
}

#[tokio::test]
async fn referenced_projects_load_with_the_root() {
    let project = TestProject::new();
    project.add_file(
        "tsconfig.json",
        r#"{ "include": ["src"], "references": [{ "path": "./packages/ui" }] }"#,
    );
    project.add_file("packages/ui/tsconfig.json", "{}");
    let file = project.add_file("src/main.ts", "");

    let container = project.registry().get_for_file(&file).await.unwrap();
    assert_eq!(
        container.referenced_configs(),
        [project.path().join("packages/ui/tsconfig.json")]
    );
    assert_eq!(container.workspace_root(), project.path());
}
