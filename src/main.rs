//! # apim-sync
//!
//! Syncs the routes described by a YAML manifest to an Azure API Management API.
//!
//! ## Usage
//!
//! ```bash
//! # Sync into a new revision and release it
//! APIM_SUBSCRIPTION_ID=... APIM_RESOURCE_GROUP=... APIM_SERVICE_NAME=... \
//!   apim-sync --manifest routes.yaml --api-id orders
//!
//! # Show what would change, without writing
//! apim-sync --manifest routes.yaml --api-id orders --dry-run
//!
//! # Write into the current revision
//! apim-sync --manifest routes.yaml --api-id "orders;rev=3" --no-revision
//! ```

use anyhow::{Context, Result};
use apim_sync::config::{ExecutorConfig, ServiceConfig, SyncOptions};
use apim_sync::observability::{self, metrics};
use apim_sync::provider::azure::AzureAuthenticator;
use apim_sync::reconciler::{preview, sync, ReconciliationPlan, SyncRequest};
use apim_sync::routes::{AnnotationRegistry, RouteManifest};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Exit code for a run where some operations failed
const PARTIAL_FAILURE_EXIT_CODE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "apim-sync")]
#[command(about = "Sync declared HTTP routes to Azure API Management operations", long_about = None)]
#[command(version)]
struct Cli {
    /// Route manifest (YAML)
    #[arg(long, short = 'm')]
    manifest: PathBuf,

    /// API name, display name or path, optionally with `;rev=N` (overrides APIM_API_ID)
    #[arg(long)]
    api_id: Option<String>,

    /// API version to prefer (overrides APIM_API_VERSION)
    #[arg(long)]
    api_version: Option<String>,

    /// Path prefix for every route (overrides the manifest's basePath)
    #[arg(long)]
    base_path: Option<String>,

    /// Fail when two routes resolve to the same endpoint
    #[arg(long)]
    break_on_same_path: bool,

    /// Write into the selected revision instead of creating a new one
    #[arg(long)]
    no_revision: bool,

    /// Do not release the revision as current
    #[arg(long)]
    no_promote: bool,

    /// Print the plan against the current revision and exit
    #[arg(long)]
    dry_run: bool,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    print_metrics: bool,
}

impl Cli {
    fn sync_options(&self, manifest: &RouteManifest) -> SyncOptions {
        let mut options = SyncOptions::from_env();
        if let Some(base_path) = self.base_path.clone().or_else(|| manifest.base_path.clone()) {
            options.base_path = base_path;
        }
        options.break_on_same_path |= self.break_on_same_path;
        if self.no_revision {
            options.generate_new_revision = false;
        }
        if self.no_promote {
            options.make_new_revision_as_current = Some(false);
        }
        options
    }
}

fn print_plan(plan: &ReconciliationPlan) {
    println!(
        "Plan: {} to create, {} to edit, {} to delete",
        plan.to_create.len(),
        plan.to_edit.len(),
        plan.to_delete.len()
    );
    for endpoint in &plan.to_create {
        println!(
            "  + {} {} ({})",
            endpoint.method.as_upper(),
            endpoint.url_template,
            endpoint.operation_id
        );
    }
    for (old, new) in &plan.to_edit {
        println!("  ~ {} {} ({})", new.method.as_upper(), new.url_template, old.name);
    }
    for operation_id in &plan.to_delete {
        println!("  - {operation_id}");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    observability::logging::init();
    metrics::register_metrics()?;

    let manifest = RouteManifest::load(&cli.manifest)
        .with_context(|| format!("Failed to load route manifest {}", cli.manifest.display()))?;
    let mut registry = AnnotationRegistry::new();
    let router = manifest.into_router(&mut registry)?;

    let service = ServiceConfig::from_env_with(cli.api_id.clone(), cli.api_version.clone())?;
    let authenticator = AzureAuthenticator::from_env(service.clone())?;
    let request = SyncRequest {
        router: &router,
        registry: &registry,
        service,
        options: cli.sync_options(&manifest),
        executor: ExecutorConfig::from_env(),
    };

    let exit_code = if cli.dry_run {
        let plan = preview(&request, &authenticator).await?;
        print_plan(&plan);
        ExitCode::SUCCESS
    } else {
        match sync(&request, &authenticator).await {
            Ok(report) if report.is_partial_failure() => {
                error!("{} operation(s) failed; see errors above", report.failed);
                ExitCode::from(PARTIAL_FAILURE_EXIT_CODE)
            }
            Ok(report) => {
                info!(
                    "Revision {} synced{}",
                    report.revision,
                    report
                        .release
                        .as_deref()
                        .map(|release| format!(" and released as {release}"))
                        .unwrap_or_default()
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Sync failed: {}", e);
                ExitCode::FAILURE
            }
        }
    };

    if cli.print_metrics {
        print!("{}", metrics::gather_text()?);
    }

    Ok(exit_code)
}
