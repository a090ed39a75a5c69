//! # Remote Snapshot
//!
//! API resolution and the one-shot read of a revision's operations and tags.

use crate::provider::types::{ApiContract, RemoteOperation, Tag};
use crate::provider::{collect_all, RemoteRegistryClient};
use crate::reconciler::revision::ResolvedApi;
use crate::routes::pattern::trim_slashes;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Remote state a plan is computed against
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Operations inside the base path, with their tag display names
    pub operations: Vec<RemoteOperation>,
    /// Every tag of the service
    pub tags: Vec<Tag>,
}

/// Pick the API `selector` refers to
///
/// With a version, the API must carry that version and match by name,
/// display name or path. Otherwise (or when that finds nothing) an exact
/// name match wins over a display name or path match.
pub fn resolve_api(
    apis: &[ApiContract],
    selector: &str,
    version: Option<&str>,
    pinned_revision: Option<u32>,
) -> Option<ResolvedApi> {
    let by_version = version.and_then(|version| {
        apis.iter().find(|api| {
            api.api_version.as_deref() == Some(version)
                && (api.display_name == selector || api.path == selector || api.name == selector)
        })
    });

    let api = by_version
        .or_else(|| apis.iter().find(|api| api.name == selector))
        .or_else(|| {
            apis.iter()
                .find(|api| api.display_name == selector || api.path == selector)
        })?;

    let base_id = api.id.split(";rev=").next().unwrap_or(&api.id);
    let full_id = match pinned_revision {
        Some(revision) => format!("{base_id};rev={revision}"),
        None => api.id.clone(),
    };

    Some(ResolvedApi {
        name: api.name.split(";rev=").next().unwrap_or(&api.name).to_string(),
        revision: pinned_revision.unwrap_or_else(|| api.api_revision.parse().unwrap_or(1)),
        full_id,
        path: api.path.clone(),
    })
}

/// Whether `url_template` lies under `base_path` (segment-wise)
pub fn within_base_path(url_template: &str, base_path: &str) -> bool {
    let base = trim_slashes(base_path);
    if base.is_empty() {
        return true;
    }
    let template = url_template.trim_start_matches('/');
    template
        .strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// List every API of the service
///
/// # Errors
/// Returns an error if any page fails.
pub async fn list_apis(client: &Arc<dyn RemoteRegistryClient>) -> Result<Vec<ApiContract>> {
    info!("Requesting APIs");
    collect_all(|next| {
        let client = Arc::clone(client);
        async move { client.list_apis(next.as_deref()).await }
    })
    .await
    .context("Failed to list APIs")
}

/// Read operations, operation tags and service tags concurrently
///
/// # Errors
/// Returns an error if any of the three listings fails.
pub async fn take_snapshot(
    client: &Arc<dyn RemoteRegistryClient>,
    api: &str,
    base_path: &str,
) -> Result<Snapshot> {
    info!("Requesting operations and tags of {}", api);

    let operations = collect_all(|next| {
        let client = Arc::clone(client);
        let api = api.to_string();
        async move { client.list_operations(&api, next.as_deref()).await }
    });
    let operation_tags = collect_all(|next| {
        let client = Arc::clone(client);
        let api = api.to_string();
        async move { client.list_operation_tags(&api, next.as_deref()).await }
    });
    let tags = collect_all(|next| {
        let client = Arc::clone(client);
        async move { client.list_tags(next.as_deref()).await }
    });

    let (operations, operation_tags, tags) = futures::try_join!(
        async { operations.await.context("Failed to list operations") },
        async { operation_tags.await.context("Failed to list operation tags") },
        async { tags.await.context("Failed to list tags") },
    )?;

    let mut tags_by_operation: HashMap<String, Vec<String>> = HashMap::new();
    for row in operation_tags {
        tags_by_operation
            .entry(row.operation_name)
            .or_default()
            .push(row.tag.display_name);
    }

    let total = operations.len();
    let operations: Vec<RemoteOperation> = operations
        .into_iter()
        .filter(|op| within_base_path(&op.url_template, base_path))
        .map(|mut op| {
            op.tags = tags_by_operation.remove(&op.name).unwrap_or_default();
            op
        })
        .collect();

    debug!(
        "Snapshot: {} of {} operations inside base path, {} tags",
        operations.len(),
        total,
        tags.len()
    );
    Ok(Snapshot { operations, tags })
}
