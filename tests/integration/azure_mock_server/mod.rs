//! ARM client tests against a local mock server
//!
//! Exercises the HTTP layer of the Azure provider: URL construction, paging,
//! request bodies, headers and error mapping.

mod server;

use apim_sync::config::ServiceConfig;
use apim_sync::provider::azure::{ApimClient, AzureAuthenticator, StaticTokenCredential};
use apim_sync::provider::{collect_all, Authenticator, OperationBody, RemoteRegistryClient};
use apim_sync::reconciler::{resolve_api, take_snapshot};
use std::sync::Arc;

fn config(arm_endpoint: String) -> ServiceConfig {
    ServiceConfig {
        subscription_id: "sub".to_string(),
        resource_group: "rg".to_string(),
        service_name: "svc".to_string(),
        api_id: "orders".to_string(),
        api_version: None,
        arm_endpoint,
        arm_api_version: "2022-08-01".to_string(),
    }
}

fn client(server: &server::MockArm, token: &str) -> ApimClient {
    ApimClient::new(&config(server.url()), token.to_string()).unwrap()
}

#[tokio::test]
async fn test_list_apis_resolves_current_revision() {
    let server = server::start().await;
    let client = client(&server, server::TOKEN);

    let page = client.list_apis(None).await.unwrap();

    assert!(page.next_link.is_none());
    let api = resolve_api(&page.items, "Orders", None, None).unwrap();
    assert_eq!(api.name, "orders");
    assert_eq!(api.revision, 3);
    assert_eq!(api.revision_ref(), "orders;rev=3");
    assert!(api.full_id.ends_with("/service/svc/apis/orders"));
}

#[tokio::test]
async fn test_operation_listing_follows_next_link() {
    let server = server::start().await;
    let client = client(&server, server::TOKEN);

    let first = client.list_operations("orders;rev=3", None).await.unwrap();
    assert_eq!(first.items.len(), 1);
    let next = first.next_link.clone().unwrap();
    assert!(next.contains("$skiptoken=2"));

    let client: Arc<dyn RemoteRegistryClient> = Arc::new(client);
    let all = collect_all(|next| {
        let client = Arc::clone(&client);
        async move { client.list_operations("orders;rev=3", next.as_deref()).await }
    })
    .await
    .unwrap();

    let names: Vec<&str> = all.iter().map(|op| op.name.as_str()).collect();
    assert_eq!(names, vec!["users-get-1", "users-post-2"]);
    assert_eq!(all[0].method, "GET");
    assert_eq!(all[0].url_template, "/users");
    // Empty descriptions are treated as missing
    assert_eq!(all[0].description, None);
}

#[tokio::test]
async fn test_operation_tags_skip_rows_without_operation() {
    let server = server::start().await;
    let client = client(&server, server::TOKEN);

    let page = client.list_operation_tags("orders;rev=3", None).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|row| row.operation_name == "users-get-1"));
    assert_eq!(page.items[0].tag.name, "apimsync1");
    assert_eq!(page.items[0].tag.display_name, "apim-sync");
}

#[tokio::test]
async fn test_snapshot_folds_tags_into_operations() {
    let server = server::start().await;
    let client: Arc<dyn RemoteRegistryClient> = Arc::new(client(&server, server::TOKEN));

    let snapshot = take_snapshot(&client, "orders;rev=3", "users").await.unwrap();

    assert_eq!(snapshot.operations.len(), 2);
    assert_eq!(snapshot.operations[0].tags, vec!["apim-sync", "users"]);
    assert!(snapshot.operations[1].tags.is_empty());
    // An empty nextLink ends the listing
    assert_eq!(snapshot.tags.len(), 2);
    assert!(server.recorded().is_empty());
}

#[tokio::test]
async fn test_snapshot_drops_operations_outside_base_path() {
    let server = server::start().await;
    let client: Arc<dyn RemoteRegistryClient> = Arc::new(client(&server, server::TOKEN));

    let snapshot = take_snapshot(&client, "orders;rev=3", "accounts").await.unwrap();

    assert!(snapshot.operations.is_empty());
    assert_eq!(snapshot.tags.len(), 2);
}

#[tokio::test]
async fn test_create_operation_sends_properties_envelope() {
    let server = server::start().await;
    let client = client(&server, server::TOKEN);
    let body = OperationBody {
        display_name: "Get Users Id".to_string(),
        method: "GET".to_string(),
        url_template: "/users/{userId}".to_string(),
        template_parameters: Vec::new(),
        description: None,
        request: None,
        responses: Vec::new(),
    };

    let created = client
        .create_or_update_operation("orders;rev=4", "users-get-1", &body)
        .await
        .unwrap();

    assert_eq!(created.name, "users-get-1");
    assert_eq!(created.url_template, "/users/{userId}");
    assert!(created.id.contains("/apis/orders;rev=4/operations/users-get-1"));

    let recorded = server.recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].path, "apis/orders;rev=4/operations/users-get-1");
    let properties = &recorded[0].body["properties"];
    assert_eq!(properties["displayName"], "Get Users Id");
    assert_eq!(properties["method"], "GET");
    assert!(properties.get("description").is_none());
}

#[tokio::test]
async fn test_delete_sends_if_match_and_tolerates_missing() {
    let server = server::start().await;
    let client = client(&server, server::TOKEN);

    client.delete_operation("orders;rev=4", "users-get-1").await.unwrap();
    client.delete_operation("orders;rev=4", "missing").await.unwrap();

    let deletes: Vec<String> = server
        .recorded()
        .into_iter()
        .filter(|r| r.method == "DELETE")
        .map(|r| r.path)
        .collect();
    assert_eq!(
        deletes,
        vec![
            "apis/orders;rev=4/operations/users-get-1",
            "apis/orders;rev=4/operations/missing"
        ]
    );
}

#[tokio::test]
async fn test_policy_is_sent_as_raw_xml() {
    let server = server::start().await;
    let client = client(&server, server::TOKEN);
    let xml = "<policies>\n  <inbound>\n    <base />\n  </inbound>\n</policies>\n";

    client
        .create_or_update_policy("orders;rev=4", "users-get-1", xml)
        .await
        .unwrap();

    let recorded = server.recorded();
    assert_eq!(
        recorded[0].path,
        "apis/orders;rev=4/operations/users-get-1/policies/policy"
    );
    assert_eq!(recorded[0].body["properties"]["value"], xml);
}

#[tokio::test]
async fn test_tag_creation_returns_tag() {
    let server = server::start().await;
    let client = client(&server, server::TOKEN);

    let tag = client.create_or_update_tag("users1700000000000", "users").await.unwrap();

    assert_eq!(tag.name, "users1700000000000");
    assert_eq!(tag.display_name, "users");
}

#[tokio::test]
async fn test_release_points_at_full_revision_id() {
    let server = server::start().await;
    let client = client(&server, server::TOKEN);

    client
        .create_release("orders", "apim-sync4release", "/apis/orders;rev=4", "notes")
        .await
        .unwrap();

    let recorded = server.recorded();
    assert_eq!(recorded[0].path, "apis/orders/releases/apim-sync4release");
    assert_eq!(recorded[0].body["properties"]["apiId"], "/apis/orders;rev=4");
    assert_eq!(recorded[0].body["properties"]["notes"], "notes");
}

#[tokio::test]
async fn test_server_error_carries_status_and_body() {
    let server = server::start().await;
    let client = client(&server, server::TOKEN);
    let body = OperationBody {
        display_name: "Broken".to_string(),
        method: "GET".to_string(),
        url_template: "/broken".to_string(),
        template_parameters: Vec::new(),
        description: None,
        request: None,
        responses: Vec::new(),
    };

    let err = client
        .create_or_update_operation("orders", "broken", &body)
        .await
        .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("500"), "{message}");
    assert!(message.contains("backend exploded"), "{message}");
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    let server = server::start().await;
    let client = client(&server, "stale-token");

    let err = client.list_apis(None).await.unwrap_err();

    assert!(format!("{err:#}").contains("401"));
}

#[tokio::test]
async fn test_authenticator_attaches_credential_token() {
    let server = server::start().await;
    let authenticator = AzureAuthenticator::new(
        config(server.url()),
        Arc::new(StaticTokenCredential::new(server::TOKEN)),
    );

    let client = authenticator.authenticate().await.unwrap();
    let page = client.list_apis(None).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "orders");
}

#[tokio::test]
async fn test_authenticator_with_stale_credential_is_rejected() {
    let server = server::start().await;
    let authenticator = AzureAuthenticator::new(
        config(server.url()),
        Arc::new(StaticTokenCredential::new("stale-token")),
    );

    let client = authenticator.authenticate().await.unwrap();
    let err = client.list_apis(None).await.unwrap_err();

    assert!(format!("{err:#}").contains("401"));
}
