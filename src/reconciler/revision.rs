//! # Revision Coordinator
//!
//! Creates the revision a sync writes into and releases it as current.

use crate::constants::REVISION_DESCRIPTION;
use crate::provider::{collect_all, RemoteRegistryClient};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// API revision a sync run targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedApi {
    /// API identifier without the revision suffix
    pub name: String,
    pub revision: u32,
    /// Full resource id of the revision
    pub full_id: String,
    /// Version-less API path
    pub path: String,
}

impl ResolvedApi {
    /// `name;rev=N`, the identifier operation calls are made against
    pub fn revision_ref(&self) -> String {
        format!("{};rev={}", self.name, self.revision)
    }
}

/// Release id for a revision
pub fn release_id(revision: u32) -> String {
    format!("apim-sync{revision}release")
}

#[derive(Clone)]
pub struct RevisionCoordinator {
    client: Arc<dyn RemoteRegistryClient>,
}

impl std::fmt::Debug for RevisionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionCoordinator").finish_non_exhaustive()
    }
}

impl RevisionCoordinator {
    pub fn new(client: Arc<dyn RemoteRegistryClient>) -> Self {
        Self { client }
    }

    /// Create revision `max + 1` as a copy of `api` and return it
    ///
    /// # Errors
    /// Returns an error if listing revisions or creating the new one fails.
    pub async fn create_revision(&self, api: &ResolvedApi) -> Result<ResolvedApi> {
        info!("Requesting revisions of {}", api.name);
        let revisions = collect_all(|next| {
            let client = Arc::clone(&self.client);
            let name = api.name.clone();
            async move { client.list_revisions(&name, next.as_deref()).await }
        })
        .await
        .with_context(|| format!("Failed to list revisions of {}", api.name))?;

        let last = revisions
            .iter()
            .filter_map(|r| r.api_revision.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        let next_revision = last + 1;
        let revision_api_id = format!("{};rev={}", api.name, next_revision);

        info!("Creating revision {}", revision_api_id);
        let created = self
            .client
            .create_revision(&revision_api_id, &api.full_id, &api.path, REVISION_DESCRIPTION)
            .await
            .with_context(|| format!("Failed to create revision {revision_api_id}"))?;

        Ok(ResolvedApi {
            name: created
                .name
                .split(";rev=")
                .next()
                .unwrap_or(&api.name)
                .to_string(),
            revision: created.api_revision.parse().unwrap_or(next_revision),
            full_id: created.id,
            path: api.path.clone(),
        })
    }

    /// Release `api` as the current revision; returns the release id
    ///
    /// # Errors
    /// Returns an error if the release call fails.
    pub async fn promote_revision(&self, api: &ResolvedApi) -> Result<String> {
        let release = release_id(api.revision);
        info!("Setting revision {} as current ({})", api.revision, release);
        self.client
            .create_release(&api.name, &release, &api.full_id, REVISION_DESCRIPTION)
            .await
            .with_context(|| format!("Failed to release revision {}", api.revision))?;
        Ok(release)
    }
}
