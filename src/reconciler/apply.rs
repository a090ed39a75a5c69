//! # Plan Execution
//!
//! Side-effecting jobs for each planned create, edit and delete.
//!
//! Tags and policies are written on every edit: reading the current policy
//! back would cost one extra call per operation, the same as writing it.

use crate::constants::MANAGED_TAG;
use crate::provider::types::{OperationBody, RemoteOperation};
use crate::provider::RemoteRegistryClient;
use crate::reconciler::executor::{partition_results, run_lanes};
use crate::reconciler::tags::TagRegistry;
use crate::routes::annotation::dedup_tags;
use crate::routes::endpoint::EndpointDescriptor;
use anyhow::{bail, Context, Result};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// What every job of one run needs
#[derive(Clone)]
pub struct ApplyContext {
    pub client: Arc<dyn RemoteRegistryClient>,
    /// `name;rev=N` of the revision being written
    pub api: String,
    pub tags: TagRegistry,
    /// Lanes for the tag and policy calls of one operation
    pub tag_lanes: usize,
}

impl std::fmt::Debug for ApplyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplyContext")
            .field("api", &self.api)
            .field("tag_lanes", &self.tag_lanes)
            .finish_non_exhaustive()
    }
}

/// Whether description, display name, request or responses differ
///
/// Missing values compare equal to empty ones.
pub fn metadata_changed(old: &RemoteOperation, new: &EndpointDescriptor) -> bool {
    let empty_object = Value::Object(serde_json::Map::new());

    new.description.as_deref().unwrap_or("") != old.description.as_deref().unwrap_or("")
        || new.display_name != old.display_name
        || new.request.as_ref().unwrap_or(&empty_object)
            != old.request.as_ref().unwrap_or(&empty_object)
        || new.responses != old.responses
}

/// Tags to detach and tags to assign
///
/// Tags present on both sides are left alone.
pub fn tag_delta(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let mut to_detach: Vec<String> = old.to_vec();
    let mut to_assign = Vec::new();
    for tag in new {
        if let Some(index) = to_detach.iter().position(|o| o == tag) {
            to_detach.remove(index);
        } else {
            to_assign.push(tag.clone());
        }
    }
    (to_detach, to_assign)
}

/// Endpoint tags plus the managed tag
fn desired_tags(endpoint: &EndpointDescriptor) -> Vec<String> {
    dedup_tags(
        endpoint
            .tags
            .iter()
            .cloned()
            .chain(std::iter::once(MANAGED_TAG.to_string())),
    )
}

impl ApplyContext {
    /// # Errors
    /// Returns an error if the delete call fails.
    pub async fn delete_operation(&self, operation_id: String) -> Result<()> {
        info!("Deleting {}", operation_id);
        self.client
            .delete_operation(&self.api, &operation_id)
            .await
            .with_context(|| format!("Failed to delete operation {operation_id}"))
    }

    /// Create the operation, then assign its tags and write its policy
    ///
    /// # Errors
    /// Returns an error if the create call or any follow-up call fails.
    pub async fn create_operation(&self, endpoint: EndpointDescriptor) -> Result<()> {
        info!("Creating {}", endpoint.display_name);
        let created = self
            .client
            .create_or_update_operation(
                &self.api,
                &endpoint.operation_id,
                &OperationBody::from(&endpoint),
            )
            .await
            .with_context(|| format!("Failed to create operation {}", endpoint.operation_id))?;

        let mut jobs: Vec<BoxFuture<'_, Result<()>>> = Vec::new();
        for tag in desired_tags(&endpoint) {
            jobs.push(self.assign_tag(created.name.clone(), tag).boxed());
        }
        jobs.push(
            self.set_policy(created.name.clone(), endpoint.policies.to_xml())
                .boxed(),
        );

        self.run_follow_ups(jobs, &endpoint.operation_id).await
    }

    /// Update metadata if it changed, apply the tag delta and write the policy
    ///
    /// # Errors
    /// Returns an error if the update call or any follow-up call fails.
    pub async fn edit_operation(&self, old: RemoteOperation, new: EndpointDescriptor) -> Result<()> {
        info!("Editing {}", new.display_name);
        if metadata_changed(&old, &new) {
            info!("Modifying {}'s metadata", new.display_name);
            self.client
                .create_or_update_operation(&self.api, &old.name, &OperationBody::from(&new))
                .await
                .with_context(|| format!("Failed to update operation {}", old.name))?;
        }

        let (to_detach, to_assign) = tag_delta(&old.tags, &desired_tags(&new));
        let mut jobs: Vec<BoxFuture<'_, Result<()>>> = Vec::new();
        for tag in to_detach {
            jobs.push(self.detach_tag(old.name.clone(), tag).boxed());
        }
        for tag in to_assign {
            jobs.push(self.assign_tag(old.name.clone(), tag).boxed());
        }
        jobs.push(self.set_policy(old.name.clone(), new.policies.to_xml()).boxed());

        self.run_follow_ups(jobs, &old.name).await
    }

    async fn run_follow_ups(&self, jobs: Vec<BoxFuture<'_, Result<()>>>, operation: &str) -> Result<()> {
        let (_, failed) = partition_results(run_lanes(jobs, self.tag_lanes).await);
        if failed > 0 {
            bail!("{failed} tag/policy call(s) failed for operation {operation}");
        }
        Ok(())
    }

    async fn assign_tag(&self, operation: String, display_name: String) -> Result<()> {
        let Some(tag) = self.tags.ensure_tag(&display_name).await? else {
            debug!("Skipping tag {:?}: no alphanumeric characters", display_name);
            return Ok(());
        };
        info!("Assigning tag {} to {}", display_name, operation);
        self.client
            .assign_tag(&self.api, &operation, &tag.name)
            .await
            .with_context(|| format!("Failed to assign tag {display_name} to {operation}"))
    }

    async fn detach_tag(&self, operation: String, display_name: String) -> Result<()> {
        let Some(tag) = self.tags.find(&display_name) else {
            debug!("Tag {} is unknown, nothing to detach from {}", display_name, operation);
            return Ok(());
        };
        info!("Detaching tag {} from {}", display_name, operation);
        self.client
            .detach_tag(&self.api, &operation, &tag.name)
            .await
            .with_context(|| format!("Failed to detach tag {display_name} from {operation}"))
    }

    async fn set_policy(&self, operation: String, xml: String) -> Result<()> {
        info!("Setting policy of {}", operation);
        self.client
            .create_or_update_policy(&self.api, &operation, &xml)
            .await
            .with_context(|| format!("Failed to set policy of {operation}"))
    }
}
