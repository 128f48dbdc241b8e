//! Snapshot lifecycle through the container operations

use crate::common::{TestProject, inventory};
use std::sync::Arc;
use svelte_ts_service::snapshot::Range;
use svelte_ts_service::{EditorDocument, ProjectKey, ScriptKind, TextEdit};

#[tokio::test]
async fn unchanged_version_is_a_no_op() {
    let project = TestProject::new();
    project.add_file("tsconfig.json", "{}");
    let file = project.add_file("src/Counter.svelte", "<script>let n = 0;</script>");

    let container = project.registry().get_for_file(&file).await.unwrap();
    let host = container.host();
    let service = container.get_service();

    let first = container.update_snapshot(&EditorDocument::new(&file, 4, "<script>let n = 1;</script>"));
    let version = host.script_version(&file).unwrap();

    let again = container.update_snapshot(&EditorDocument::new(&file, 4, "<script>let n = 99;</script>"));
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(host.script_version(&file), Some(version));
    assert!(Arc::ptr_eq(&service, &container.get_service()));
    assert_eq!(container.generation(), 0);
    assert!(again.text().contains("let n = 1;"));
}

#[tokio::test]
async fn script_kind_change_replaces_the_engine() {
    let project = TestProject::new();
    let file = project.add_file("Widget.svelte", "");

    let container = project.registry().get_for_file(&file).await.unwrap();
    let untyped = container.update_snapshot(&EditorDocument::new(&file, 1, "<script>let a;</script>"));
    assert_eq!(untyped.script_kind(), ScriptKind::Extension);
    let before = container.get_service();

    let typed = container.update_snapshot(&EditorDocument::new(
        &file,
        2,
        "<script lang=\"ts\">let a: string;</script>",
    ));
    assert_eq!(typed.script_kind(), ScriptKind::HostJsx);

    let after = container.get_service();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(inventory(&before).is_disposed());
    assert!(!inventory(&after).is_disposed());
    // Caches survive the restart
    assert!(container.has_file(&file));
    assert_eq!(container.host().script_kind(&file), ScriptKind::HostJsx);
}

#[tokio::test]
async fn delete_then_reopen_gets_a_fresh_version() {
    let project = TestProject::new();
    let file = project.add_file("src/store.ts", "export const count = 0;");

    let container = project.registry().get_for_file(&file).await.unwrap();
    let opened = container.update_snapshot(&EditorDocument::new(&file, 1, "export const count = 1;"));

    container.delete_snapshot(&file);
    assert!(!container.has_file(&file));
    container.delete_snapshot(&file);

    let reopened = container.update_snapshot(&EditorDocument::new(&file, 1, "export const count = 1;"));
    assert!(container.has_file(&file));
    assert_ne!(reopened.version(), opened.version());
}

#[tokio::test]
async fn edits_round_trip_through_the_host() {
    let project = TestProject::new();
    project.add_file("tsconfig.json", "{}");
    let file = project.add_file("src/math.ts", "export function add(a, b) {\n  return a + b;\n}\n");

    let container = project.registry().get_for_file(&file).await.unwrap();
    assert!(!container.has_file(&file));

    let edits = [
        TextEdit::replace(Range::new(0, 20, 0, 24), "a: number, b: number"),
        TextEdit::replace(Range::new(1, 2, 1, 8), "return "),
    ];
    let snapshot = container.update_ts_or_js_file(&file, Some(&edits)).unwrap();
    let expected = "export function add(a: number, b: number) {\n  return  a + b;\n}\n";
    assert_eq!(snapshot.text(), expected);

    let host = container.host();
    assert_eq!(host.script_snapshot(&file).unwrap().text(), expected);
    assert_eq!(host.read_file(&file).as_deref(), Some(expected));

    // Without edits the file is re-read from disk
    let reread = container.update_ts_or_js_file(&file, None).unwrap();
    assert!(reread.text().starts_with("export function add(a, b)"));
    assert!(reread.version() > snapshot.version());
}

#[tokio::test]
async fn component_files_ignore_host_edits() {
    let project = TestProject::new();
    let file = project.add_file("Card.svelte", "<p></p>");

    let container = project.registry().get_for_file(&file).await.unwrap();
    container.update_snapshot(&EditorDocument::new(&file, 1, "<script lang=\"ts\">let a: number;</script>"));
    assert!(
        container
            .update_ts_or_js_file(&file, Some(&[TextEdit::full("x")]))
            .is_none()
    );
    // Re-reading from disk would drop the typed editor state
    assert!(container.update_ts_or_js_file(&file, None).is_none());
    assert_eq!(container.snapshot(&file).unwrap().script_kind(), ScriptKind::HostJsx);
    assert_eq!(container.generation(), 0);
}

#[tokio::test]
async fn typing_mistake_in_typed_component_keeps_the_engine() {
    let project = TestProject::new();
    let file = project.add_file("Field.svelte", "");

    let container = project.registry().get_for_file(&file).await.unwrap();
    let service = container.get_service();
    let typed = "<script lang=\"ts\">let a: number;</script>";

    let first = container.update_snapshot(&EditorDocument::new(&file, 1, typed));
    let broken = container.update_snapshot(&EditorDocument::new(
        &file,
        2,
        "<script lang=\"ts\">let a: number;</scr",
    ));
    let fixed = container.update_snapshot(&EditorDocument::new(&file, 3, typed));

    assert!(broken.parser_error().is_some());
    for snapshot in [&first, &broken, &fixed] {
        assert_eq!(snapshot.script_kind(), ScriptKind::HostJsx);
    }
    assert_eq!(container.generation(), 0);
    assert!(Arc::ptr_eq(&service, &container.get_service()));
    assert!(!inventory(&service).is_disposed());
}

#[tokio::test]
async fn empty_workspace_infers_an_empty_project() {
    let project = TestProject::new();
    let file = project.path().join("a.svelte");

    let container = project.registry().get_for_file(&file).await.unwrap();
    assert_eq!(
        container.key(),
        &ProjectKey::Inferred {
            workspace_root: project.path().to_path_buf()
        }
    );
    assert_eq!(container.host().script_file_names(), container.ambient_files());
    assert!(!container.file_belongs_to_project(&file));
    assert_eq!(container.compiler_options().allow_js, Some(true));
    assert_eq!(container.compiler_options().max_node_module_js_depth, Some(3));

    container.update_snapshot(&EditorDocument::new(&file, 1, "<h1>hello</h1>"));
    assert!(container.has_file(&file));
    assert!(container.file_belongs_to_project(&file));
    assert!(container.host().script_file_names().contains(&file));
}

#[tokio::test]
async fn project_files_follow_the_disk() {
    let project = TestProject::new();
    project.add_file("tsconfig.json", r#"{ "include": ["src/**/*"] }"#);
    let first = project.add_file("src/a.ts", "");

    let container = project.registry().get_for_file(&first).await.unwrap();
    let late = project.add_file("src/routes/Late.svelte", "<p></p>");
    assert!(!container.host().script_file_names().contains(&late));

    // Heavier membership test sees the new file without a refresh
    assert!(container.file_belongs_to_project(&late));
    assert!(!container.has_file(&late));

    container.update_project_files();
    assert!(container.host().script_file_names().contains(&late));
}
