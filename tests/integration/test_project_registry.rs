//! Registry behavior across concurrent and independent projects

use crate::common::{CountingFactory, TestProject};
use std::sync::Arc;
use svelte_ts_service::{EditorDocument, ProjectKey, ServiceError};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_container() {
    let project = TestProject::new();
    project.add_file("tsconfig.json", r#"{ "include": ["src"] }"#);
    project.add_file("src/App.svelte", "<script>let count = 0;</script>");

    let factory = Arc::new(CountingFactory::default());
    let registry = Arc::new(project.registry_with(project.settings(), factory.clone()));
    let key = ProjectKey::Config(project.path().join("tsconfig.json"));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let key = key.clone();
            tokio::spawn(async move { registry.get(&key).await })
        })
        .collect();

    let mut containers = Vec::new();
    for handle in handles {
        containers.push(handle.await.unwrap().unwrap());
    }

    assert!(containers.iter().all(|c| Arc::ptr_eq(c, &containers[0])));
    assert_eq!(factory.created(), 1);
    assert_eq!(registry.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dropped_waiter_does_not_abandon_construction() {
    let project = TestProject::new();
    project.add_file("tsconfig.json", "{}");
    let factory = Arc::new(CountingFactory::default());
    let registry = Arc::new(project.registry_with(project.settings(), factory.clone()));
    let key = ProjectKey::Config(project.path().join("tsconfig.json"));

    let early = {
        let registry = Arc::clone(&registry);
        let key = key.clone();
        tokio::spawn(async move { registry.get(&key).await })
    };
    tokio::task::yield_now().await;
    early.abort();

    let container = registry.get(&key).await.unwrap();
    assert_eq!(container.key(), &key);
    assert_eq!(factory.created(), 1);
}

#[tokio::test]
async fn failed_construction_reaches_every_waiter() {
    let project = TestProject::new();
    project.add_file(
        "tsconfig.json",
        r#"{ "references": [{ "path": "./packages/gone" }] }"#,
    );
    let mut settings = project.settings();
    settings.registry.retry_failed = false;
    let registry = project.registry_with(settings, Arc::new(CountingFactory::default()));
    let key = ProjectKey::Config(project.path().join("tsconfig.json"));

    let (a, b) = tokio::join!(registry.get(&key), registry.get(&key));
    let (a, b) = (a.unwrap_err(), b.unwrap_err());
    assert!(Arc::ptr_eq(&a, &b));
    assert!(matches!(a.as_ref(), ServiceError::Config(_)));
    assert!(!a.recovery_suggestions().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_projects_stay_independent() {
    let project = TestProject::new();
    project.add_file("app/tsconfig.json", "{}");
    project.add_file("site/tsconfig.json", "{}");
    let app_file = project.add_file("app/src/main.ts", "export const app = 1;");
    let site_file = project.add_file("site/src/main.ts", "export const site = 1;");

    let registry = project.registry();
    let (app, site) = tokio::join!(
        registry.get_for_file(&app_file),
        registry.get_for_file(&site_file)
    );
    let (app, site) = (app.unwrap(), site.unwrap());

    assert!(!Arc::ptr_eq(&app, &site));
    assert_eq!(
        app.key(),
        &ProjectKey::Config(project.path().join("app/tsconfig.json"))
    );
    assert_eq!(registry.len(), 2);

    app.update_snapshot(&EditorDocument::new(&app_file, 1, "export const app = 2;"));
    app.update_snapshot(&EditorDocument::new(&site_file, 1, "// opened in the wrong project"));

    assert!(app.has_file(&app_file));
    assert!(!site.has_file(&app_file));
    assert!(!site.has_file(&site_file));
    assert_eq!(
        site.host().script_snapshot(&site_file).unwrap().text(),
        "export const site = 1;"
    );
}

#[tokio::test]
async fn has_is_a_pure_lookup() {
    let project = TestProject::new();
    project.add_file("tsconfig.json", "{}");
    let file = project.add_file("src/lib/util.ts", "");

    let registry = project.registry();
    assert!(!registry.has(&file));

    registry.get_for_file(&file).await.unwrap();
    assert!(registry.has(&file));
    // Not on disk, but owned by the same config
    assert!(registry.has(&project.path().join("src/routes/+page.svelte")));
    assert!(!registry.has(std::path::Path::new("/elsewhere/a.ts")));
}

#[tokio::test]
async fn routed_file_answers_for_its_own_project() {
    let project = TestProject::new();
    project.add_file("tsconfig.json", "{}");
    project.add_file(
        "app/tsconfig.json",
        r#"{ "references": [{ "path": "./gone" }] }"#,
    );
    let root_file = project.add_file("src/main.ts", "");
    let app_file = project.add_file("app/x.ts", "");

    let mut settings = project.settings();
    settings.registry.retry_failed = false;
    let registry = project.registry_with(settings, Arc::new(CountingFactory::default()));

    registry.get_for_file(&root_file).await.unwrap();
    // Never routed: the registered root project is the nearest answer
    assert!(registry.has(&app_file));

    assert!(registry.get_for_file(&app_file).await.is_err());
    // Routed to app/tsconfig.json, which failed; the root project does not count
    assert!(!registry.has(&app_file));
    assert!(registry.has(&root_file));
}
