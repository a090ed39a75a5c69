//! # Azure API Management Client
//!
//! [`RemoteRegistryClient`] over the Azure Resource Manager REST API.
//!
//! This module provides:
//! - Paged listings that follow ARM `nextLink` continuation URLs
//! - Operation, tag, policy, revision and release writes
//! - Token acquisition (see [`auth`])
//!
//! API reference: https://learn.microsoft.com/rest/api/apimanagement/

pub mod auth;
mod paths;
mod wire;

pub use auth::{create_credential, AzureAuthConfig, AzureAuthenticator, StaticTokenCredential};

use self::paths::ServicePaths;
use self::wire::{
    ApiProperties, Envelope, ListResponse, OperationProperties, PolicyBody, ReleaseBody, Resource,
    RevisionBody, RevisionContract, TagBody, TagProperties, TagResourceContract,
};
use crate::config::ServiceConfig;
use crate::constants::DEFAULT_HTTP_TIMEOUT_SECS;
use crate::provider::types::{
    ApiContract, ApiRevision, OperationBody, OperationTag, Page, RemoteOperation, Tag,
};
use crate::provider::RemoteRegistryClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info_span, Instrument};

/// Azure API Management provider implementation
pub struct ApimClient {
    http_client: ReqwestClient,
    token: String,
    paths: ServicePaths,
}

impl std::fmt::Debug for ApimClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApimClient")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl ApimClient {
    /// Create a client for the service in `config`, authorised with `token`
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ServiceConfig, token: String) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            token,
            paths: ServicePaths::new(config),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }

    /// Turn a non-success status into an error carrying the response body
    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response.text().await.unwrap_or_default();
        Err(anyhow::anyhow!("Failed to {what}: HTTP {status} - {error_text}"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .authorized(self.http_client.get(url))
            .send()
            .await
            .with_context(|| format!("Failed to {what}"))?;
        Self::check(response, what)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse response to {what}"))
    }

    async fn put(&self, url: &str, body: &impl Serialize, what: &str) -> Result<Response> {
        debug!("PUT {}", url);
        let response = self
            .authorized(self.http_client.put(url))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to {what}"))?;
        Self::check(response, what).await
    }

    async fn put_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &impl Serialize,
        what: &str,
    ) -> Result<T> {
        self.put(url, body, what)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse response to {what}"))
    }

    /// DELETE with `If-Match: *`; a resource that is already gone counts as deleted
    async fn delete(&self, url: &str, what: &str) -> Result<()> {
        debug!("DELETE {}", url);
        let response = self
            .authorized(self.http_client.delete(url))
            .header("If-Match", "*")
            .send()
            .await
            .with_context(|| format!("Failed to {what}"))?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Nothing to {} (HTTP 404)", what);
            return Ok(());
        }
        Self::check(response, what).await?;
        Ok(())
    }

    fn page_url(next: Option<&str>, first: impl FnOnce() -> String) -> String {
        next.map_or_else(first, str::to_string)
    }
}

#[async_trait]
impl RemoteRegistryClient for ApimClient {
    async fn list_apis(&self, next: Option<&str>) -> Result<Page<ApiContract>> {
        let url = Self::page_url(next, || self.paths.apis());
        let list: ListResponse<Resource<ApiProperties>> = self.get_json(&url, "list APIs").await?;
        Ok(list.into_page(ApiContract::from))
    }

    async fn list_operations(&self, api: &str, next: Option<&str>) -> Result<Page<RemoteOperation>> {
        let url = Self::page_url(next, || self.paths.operations(api));
        let list: ListResponse<Resource<OperationProperties>> = self
            .get_json(&url, &format!("list operations of {api}"))
            .await?;
        Ok(list.into_page(RemoteOperation::from))
    }

    async fn list_operation_tags(&self, api: &str, next: Option<&str>) -> Result<Page<OperationTag>> {
        let url = Self::page_url(next, || self.paths.operations_by_tags(api));
        let list: ListResponse<TagResourceContract> = self
            .get_json(&url, &format!("list tagged operations of {api}"))
            .await?;
        let page = list.into_page(TagResourceContract::into_operation_tag);
        Ok(Page {
            items: page.items.into_iter().flatten().collect(),
            next_link: page.next_link,
        })
    }

    async fn list_tags(&self, next: Option<&str>) -> Result<Page<Tag>> {
        let url = Self::page_url(next, || self.paths.tags());
        let list: ListResponse<Resource<TagProperties>> = self.get_json(&url, "list tags").await?;
        Ok(list.into_page(Tag::from))
    }

    async fn list_revisions(&self, api: &str, next: Option<&str>) -> Result<Page<ApiRevision>> {
        let url = Self::page_url(next, || self.paths.revisions(api));
        let list: ListResponse<RevisionContract> = self
            .get_json(&url, &format!("list revisions of {api}"))
            .await?;
        Ok(list.into_page(ApiRevision::from))
    }

    async fn create_or_update_operation(
        &self,
        api: &str,
        operation_id: &str,
        body: &OperationBody,
    ) -> Result<RemoteOperation> {
        let span = info_span!("apim.operation.put", operation.id = operation_id, api = api);
        async move {
            let resource: Resource<OperationProperties> = self
                .put_json(
                    &self.paths.operation(api, operation_id),
                    &Envelope { properties: body },
                    &format!("create or update operation {operation_id}"),
                )
                .await?;
            Ok(RemoteOperation::from(resource))
        }
        .instrument(span)
        .await
    }

    async fn delete_operation(&self, api: &str, operation_id: &str) -> Result<()> {
        self.delete(
            &self.paths.operation(api, operation_id),
            &format!("delete operation {operation_id}"),
        )
        .await
    }

    async fn create_or_update_tag(&self, tag_id: &str, display_name: &str) -> Result<Tag> {
        let resource: Resource<TagProperties> = self
            .put_json(
                &self.paths.tag(tag_id),
                &Envelope {
                    properties: TagBody { display_name },
                },
                &format!("create tag {display_name}"),
            )
            .await?;
        Ok(Tag::from(resource))
    }

    async fn assign_tag(&self, api: &str, operation_id: &str, tag_id: &str) -> Result<()> {
        self.put(
            &self.paths.operation_tag(api, operation_id, tag_id),
            &serde_json::json!({}),
            &format!("assign tag {tag_id} to {operation_id}"),
        )
        .await?;
        Ok(())
    }

    async fn detach_tag(&self, api: &str, operation_id: &str, tag_id: &str) -> Result<()> {
        self.delete(
            &self.paths.operation_tag(api, operation_id, tag_id),
            &format!("detach tag {tag_id} from {operation_id}"),
        )
        .await
    }

    async fn create_or_update_policy(&self, api: &str, operation_id: &str, xml: &str) -> Result<()> {
        self.put(
            &self.paths.operation_policy(api, operation_id),
            &Envelope {
                properties: PolicyBody {
                    format: "rawxml",
                    value: xml,
                },
            },
            &format!("set policy of {operation_id}"),
        )
        .await?;
        Ok(())
    }

    async fn create_revision(
        &self,
        revision_api_id: &str,
        source_api_id: &str,
        path: &str,
        description: &str,
    ) -> Result<ApiContract> {
        let span = info_span!("apim.revision.create", api = revision_api_id);
        async move {
            let resource: Resource<ApiProperties> = self
                .put_json(
                    &self.paths.api(revision_api_id),
                    &Envelope {
                        properties: RevisionBody {
                            source_api_id,
                            api_revision_description: description,
                            path,
                        },
                    },
                    &format!("create revision {revision_api_id}"),
                )
                .await?;
            Ok(ApiContract::from(resource))
        }
        .instrument(span)
        .await
    }

    async fn create_release(
        &self,
        api: &str,
        release_id: &str,
        full_api_id: &str,
        notes: &str,
    ) -> Result<()> {
        self.put(
            &self.paths.release(api, release_id),
            &Envelope {
                properties: ReleaseBody {
                    api_id: full_api_id,
                    notes,
                },
            },
            &format!("create release {release_id}"),
        )
        .await?;
        Ok(())
    }
}
