//! Failed imports recover once the missing file shows up

use crate::common::{TestProject, inventory};
use svelte_ts_service::{EditorDocument, ScriptKind};

#[tokio::test]
async fn opening_a_missing_component_fixes_the_import() {
    let project = TestProject::new();
    project.add_file("tsconfig.json", "{}");
    let importer = project.add_file(
        "src/x.ts",
        "import Y from './y.svelte';\nexport default Y;\n",
    );
    let target = project.path().join("src/y.svelte");

    let container = project.registry().get_for_file(&importer).await.unwrap();
    let service = container.get_service();
    let engine = inventory(&service);

    assert_eq!(engine.unresolved_imports(&importer), vec!["./y.svelte"]);
    // The failure is cached, not retried
    project.add_file("src/y.svelte", "<script>export let name;</script>");
    assert_eq!(engine.unresolved_imports(&importer), vec!["./y.svelte"]);

    container.update_snapshot(&EditorDocument::new(
        &target,
        1,
        "<script>export let name;</script>",
    ));

    let imports = engine.imports(&importer);
    let resolved = imports[0].resolved.as_ref().unwrap();
    assert_eq!(resolved.resolved_file_name, target);
    assert_eq!(resolved.extension, ScriptKind::Extension);
    assert!(!resolved.is_external_library);
}

#[tokio::test]
async fn extensionless_import_resolves_through_the_virtual_probe() {
    let project = TestProject::new();
    let importer = project.add_file("main.ts", "import Button from './Button';");
    let button = project.path().join("Button.svelte");

    let container = project.registry().get_for_file(&importer).await.unwrap();
    container.update_snapshot(importer.as_path());
    let service = container.get_service();
    let engine = inventory(&service);

    assert_eq!(engine.unresolved_imports(&importer), vec!["./Button"]);

    // Created on disk and first seen by the engine through the host
    project.add_file("Button.svelte", "<button><slot /></button>");
    let host = container.host();
    assert!(host.file_exists(&project.path().join("Button.svelte.ts")));
    assert!(host.script_snapshot(&button).is_some());

    let imports = engine.imports(&importer);
    assert_eq!(
        imports[0].resolved.as_ref().unwrap().resolved_file_name,
        button
    );
}

#[tokio::test]
async fn deleted_files_stop_resolving() {
    let project = TestProject::new();
    let importer = project.add_file("a.ts", "import { b } from './b';");
    let target = project.add_file("b.ts", "export const b = 1;");

    let container = project.registry().get_for_file(&importer).await.unwrap();
    let service = container.get_service();
    let engine = inventory(&service);
    assert!(engine.unresolved_imports(&importer).is_empty());

    std::fs::remove_file(&target).unwrap();
    container.delete_snapshot(&target);
    assert_eq!(engine.unresolved_imports(&importer), vec!["./b"]);
}
