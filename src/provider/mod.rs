//! # Provider
//!
//! Remote API registry abstraction.
//!
//! The reconciler only talks to [`RemoteRegistryClient`]; [`azure`] provides
//! the Azure API Management implementation. Every listing is paged and
//! [`collect_all`] follows continuation links until the listing is exhausted.

pub mod azure;
pub mod types;

pub use types::{
    ApiContract, ApiRevision, OperationBody, OperationTag, Page, RemoteOperation, Tag,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Calls the reconciler makes against the remote registry
///
/// `api` arguments are API identifiers including the revision suffix
/// (`orders;rev=3`). `next` is the continuation link returned by the previous
/// page, `None` for the first page.
#[async_trait]
pub trait RemoteRegistryClient: Send + Sync {
    async fn list_apis(&self, next: Option<&str>) -> Result<Page<ApiContract>>;

    async fn list_operations(&self, api: &str, next: Option<&str>) -> Result<Page<RemoteOperation>>;

    /// Operation/tag pairs of an API
    async fn list_operation_tags(&self, api: &str, next: Option<&str>) -> Result<Page<OperationTag>>;

    /// Tags defined at service level
    async fn list_tags(&self, next: Option<&str>) -> Result<Page<Tag>>;

    async fn list_revisions(&self, api: &str, next: Option<&str>) -> Result<Page<ApiRevision>>;

    async fn create_or_update_operation(
        &self,
        api: &str,
        operation_id: &str,
        body: &OperationBody,
    ) -> Result<RemoteOperation>;

    async fn delete_operation(&self, api: &str, operation_id: &str) -> Result<()>;

    async fn create_or_update_tag(&self, tag_id: &str, display_name: &str) -> Result<Tag>;

    async fn assign_tag(&self, api: &str, operation_id: &str, tag_id: &str) -> Result<()>;

    async fn detach_tag(&self, api: &str, operation_id: &str, tag_id: &str) -> Result<()>;

    /// Replace the operation's policy document
    async fn create_or_update_policy(&self, api: &str, operation_id: &str, xml: &str) -> Result<()>;

    /// Create `revision_api_id` (`orders;rev=4`) as a copy of `source_api_id`
    async fn create_revision(
        &self,
        revision_api_id: &str,
        source_api_id: &str,
        path: &str,
        description: &str,
    ) -> Result<ApiContract>;

    /// Release `full_api_id` as the current revision of `api`
    async fn create_release(
        &self,
        api: &str,
        release_id: &str,
        full_api_id: &str,
        notes: &str,
    ) -> Result<()>;
}

/// Produces an authenticated registry client
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<Arc<dyn RemoteRegistryClient>>;
}

/// Fetch every page of a listing
///
/// Any page failure fails the whole listing.
///
/// # Errors
/// Returns the first page error, or an error if a page links back to itself.
pub async fn collect_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut next: Option<String> = None;

    loop {
        let page = fetch(next.clone()).await?;
        items.extend(page.items);

        match page.next_link {
            Some(link) if next.as_deref() == Some(link.as_str()) => {
                bail!("Listing returned the same continuation link twice: {link}");
            }
            Some(link) => next = Some(link),
            None => return Ok(items),
        }
    }
}
