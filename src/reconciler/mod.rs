//! # Reconciler
//!
//! Brings the remote registry in line with a route tree.
//!
//! ## Sync flow
//!
//! 1. Extract endpoints from the tree (fails before any remote call)
//! 2. Authenticate and resolve the target API
//! 3. Create a new revision (optional)
//! 4. Snapshot the revision's operations and tags
//! 5. Plan, then run deletes, creates and edits in bounded lanes
//! 6. Release the revision as current (optional)
//!
//! Stages 1-4 and 6 are fatal on error. Individual operation jobs in stage 5
//! fail in isolation and are counted in [`SyncReport::failed`].

pub mod apply;
pub mod executor;
pub mod plan;
pub mod revision;
pub mod snapshot;
pub mod tags;

pub use apply::ApplyContext;
pub use executor::run_lanes;
pub use plan::{plan, ReconciliationPlan};
pub use revision::{ResolvedApi, RevisionCoordinator};
pub use snapshot::{resolve_api, take_snapshot, Snapshot};
pub use tags::TagRegistry;

use crate::config::{ExecutorConfig, ServiceConfig, SyncOptions};
use crate::constants::MANAGED_TAG;
use crate::observability::metrics;
use crate::provider::{Authenticator, RemoteRegistryClient};
use crate::routes::annotation::AnnotationRegistry;
use crate::routes::endpoint::EndpointSet;
use crate::routes::extractor::{extract, ExtractError, ExtractOptions};
use crate::routes::tree::Router;
use self::executor::partition_results;
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};

/// Fatal sync errors, one per stage
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("route extraction failed: {0}")]
    Extraction(#[from] ExtractError),
    #[error("authentication failed: {0:#}")]
    Authentication(anyhow::Error),
    #[error("API resolution failed: {0:#}")]
    ApiResolution(anyhow::Error),
    #[error("API not found: {0}")]
    ApiNotFound(String),
    #[error("revision creation failed: {0:#}")]
    Revision(anyhow::Error),
    #[error("snapshot failed: {0:#}")]
    Snapshot(anyhow::Error),
    #[error("revision release failed: {0:#}")]
    Release(anyhow::Error),
}

impl SyncError {
    /// Stage label used in metrics
    pub fn stage(&self) -> &'static str {
        match self {
            SyncError::Extraction(_) => "extraction",
            SyncError::Authentication(_) => "authentication",
            SyncError::ApiResolution(_) | SyncError::ApiNotFound(_) => "api_resolution",
            SyncError::Revision(_) => "revision",
            SyncError::Snapshot(_) => "snapshot",
            SyncError::Release(_) => "release",
        }
    }
}

/// Outcome of a completed sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Operation jobs that failed without aborting the run
    pub failed: usize,
    /// Revision the run wrote into
    pub revision: u32,
    /// Release id, when the revision was made current
    pub release: Option<String>,
}

impl SyncReport {
    pub fn is_partial_failure(&self) -> bool {
        self.failed > 0
    }
}

/// Everything one sync needs
#[derive(Debug)]
pub struct SyncRequest<'a> {
    pub router: &'a Router,
    pub registry: &'a AnnotationRegistry,
    pub service: ServiceConfig,
    pub options: SyncOptions,
    pub executor: ExecutorConfig,
}

impl SyncRequest<'_> {
    /// Extract the endpoint set of the request's tree
    ///
    /// # Errors
    /// Returns an error on an undecodable pattern or, with
    /// `break_on_same_path`, on a duplicate endpoint.
    pub fn endpoints(&self) -> Result<EndpointSet, ExtractError> {
        extract(
            self.router,
            self.registry,
            ExtractOptions {
                base_path: self.options.base_path.clone(),
                fail_on_duplicate: self.options.break_on_same_path,
            },
        )
    }
}

/// Resolve the API named by the service configuration
async fn resolve(
    client: &Arc<dyn RemoteRegistryClient>,
    service: &ServiceConfig,
) -> Result<ResolvedApi, SyncError> {
    let (selector, pinned) = service
        .api_selector()
        .map_err(|e| SyncError::ApiResolution(anyhow!(e)))?;
    let apis = snapshot::list_apis(client)
        .await
        .map_err(SyncError::ApiResolution)?;

    info!("Searching for API {}", selector);
    resolve_api(&apis, &selector, service.api_version.as_deref(), pinned)
        .ok_or(SyncError::ApiNotFound(selector))
}

/// Compute the plan against the current revision without writing anything
///
/// # Errors
/// Returns the first fatal stage error.
pub async fn preview(
    request: &SyncRequest<'_>,
    authenticator: &dyn Authenticator,
) -> Result<ReconciliationPlan, SyncError> {
    let endpoints = request.endpoints()?;
    let client = authenticator
        .authenticate()
        .await
        .map_err(SyncError::Authentication)?;
    let api = resolve(&client, &request.service).await?;
    let snapshot = take_snapshot(&client, &api.revision_ref(), &request.options.base_path)
        .await
        .map_err(SyncError::Snapshot)?;
    Ok(plan(snapshot.operations, endpoints.into_vec()))
}

/// Run a full sync
///
/// # Errors
/// Returns the first fatal stage error. Per-operation failures are not
/// errors; see [`SyncReport::failed`].
pub async fn sync(
    request: &SyncRequest<'_>,
    authenticator: &dyn Authenticator,
) -> Result<SyncReport, SyncError> {
    metrics::increment_syncs_total();
    let start = Instant::now();
    let span = info_span!("apim.sync", api = %request.service.api_id);

    let result = run_sync(request, authenticator).instrument(span).await;

    metrics::observe_sync_duration(start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        metrics::increment_sync_errors_total(e.stage());
    }
    result
}

async fn run_sync(
    request: &SyncRequest<'_>,
    authenticator: &dyn Authenticator,
) -> Result<SyncReport, SyncError> {
    let endpoints = request.endpoints()?;

    let client = authenticator
        .authenticate()
        .await
        .map_err(SyncError::Authentication)?;
    let mut api = resolve(&client, &request.service).await?;
    info!("Using API {} (revision {})", api.name, api.revision);

    let revisions = RevisionCoordinator::new(Arc::clone(&client));
    if request.options.generate_new_revision {
        api = revisions
            .create_revision(&api)
            .await
            .map_err(SyncError::Revision)?;
    }
    let api_ref = api.revision_ref();

    let snapshot = take_snapshot(&client, &api_ref, &request.options.base_path)
        .await
        .map_err(SyncError::Snapshot)?;
    let tags = TagRegistry::new(Arc::clone(&client), snapshot.tags);
    tags.ensure_tag(MANAGED_TAG)
        .await
        .map_err(SyncError::Snapshot)?;

    let plan = plan(snapshot.operations, endpoints.into_vec());
    let context = ApplyContext {
        client: Arc::clone(&client),
        api: api_ref,
        tags,
        tag_lanes: request.executor.tag_lanes,
    };
    let mut report = execute(&context, plan, request.executor.operation_lanes).await;
    report.revision = api.revision;

    if request.options.promote_revision() {
        let release = revisions
            .promote_revision(&api)
            .await
            .map_err(SyncError::Release)?;
        report.release = Some(release);
    }

    if report.is_partial_failure() {
        warn!(
            "Sync finished with {} failed operation(s): {} created, {} updated, {} deleted",
            report.failed, report.created, report.updated, report.deleted
        );
    } else {
        info!(
            "Sync finished: {} created, {} updated, {} deleted",
            report.created, report.updated, report.deleted
        );
    }
    Ok(report)
}

/// Run the plan: deletes, then creates, then edits
pub async fn execute(
    context: &ApplyContext,
    plan: ReconciliationPlan,
    operation_lanes: usize,
) -> SyncReport {
    let mut report = SyncReport::default();

    info!("Deleting {} operations", plan.to_delete.len());
    let results = run_lanes(
        plan.to_delete
            .into_iter()
            .map(|operation_id| context.delete_operation(operation_id)),
        operation_lanes,
    )
    .await;
    let (done, failed) = partition_results(results);
    record(&mut report.deleted, &mut report.failed, "delete", done.len(), failed);

    info!("Creating {} operations", plan.to_create.len());
    let results = run_lanes(
        plan.to_create
            .into_iter()
            .map(|endpoint| context.create_operation(endpoint)),
        operation_lanes,
    )
    .await;
    let (done, failed) = partition_results(results);
    record(&mut report.created, &mut report.failed, "create", done.len(), failed);

    info!("Editing {} operations", plan.to_edit.len());
    let results = run_lanes(
        plan.to_edit
            .into_iter()
            .map(|(old, new)| context.edit_operation(old, new)),
        operation_lanes,
    )
    .await;
    let (done, failed) = partition_results(results);
    record(&mut report.updated, &mut report.failed, "edit", done.len(), failed);

    report
}

fn record(done_slot: &mut usize, failed_slot: &mut usize, action: &str, done: usize, failed: usize) {
    *done_slot += done;
    *failed_slot += failed;
    for _ in 0..done {
        metrics::record_operation(action);
    }
    for _ in 0..failed {
        metrics::increment_item_failures_total(action);
    }
}
