//! Tag creation de-duplication under concurrency

use super::fake_registry::{Call, FakeRegistry};
use apim_sync::provider::RemoteRegistryClient;
use apim_sync::reconciler::TagRegistry;
use futures::future::join_all;
use std::sync::Arc;

fn registry_with(fake: &Arc<FakeRegistry>) -> TagRegistry {
    let client: Arc<dyn RemoteRegistryClient> = Arc::clone(fake) as Arc<dyn RemoteRegistryClient>;
    TagRegistry::new(client, fake.state.lock().unwrap().tags.clone())
}

#[tokio::test]
async fn test_concurrent_ensure_creates_tag_once() {
    let fake = Arc::new(FakeRegistry::new());
    let tags = registry_with(&fake);

    let results = join_all((0..10).map(|_| tags.ensure_tag("shared"))).await;

    let created: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();
    assert!(created.iter().all(|tag| tag == &created[0]));
    assert!(created[0].name.starts_with("shared"));
    assert_eq!(
        fake.count(|c| matches!(c, Call::CreateTag(name) if name == "shared")),
        1
    );
}

#[tokio::test]
async fn test_names_are_trimmed_before_lookup() {
    let fake = Arc::new(FakeRegistry::new());
    let tags = registry_with(&fake);

    let results = join_all([" users", "users ", "users"].map(|name| tags.ensure_tag(name))).await;

    assert!(results.iter().all(|r| matches!(r, Ok(Some(_)))));
    assert_eq!(fake.count(|c| matches!(c, Call::CreateTag(_))), 1);
    assert_eq!(tags.find("users").unwrap().display_name, "users");
}

#[tokio::test]
async fn test_existing_tag_is_reused() {
    let fake = Arc::new(FakeRegistry::new());
    fake.add_tag("orders9", "orders");
    let tags = registry_with(&fake);

    let tag = tags.ensure_tag("orders").await.unwrap().unwrap();

    assert_eq!(tag.name, "orders9");
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_name_without_alphanumerics_is_skipped() {
    let fake = Arc::new(FakeRegistry::new());
    let tags = registry_with(&fake);

    assert!(tags.ensure_tag(" -- ").await.unwrap().is_none());
    assert!(fake.calls().is_empty());
}
