//! # APIM Sync
//!
//! Keeps the operations of an Azure API Management API in line with the
//! routes an HTTP service declares.
//!
//! ## Overview
//!
//! 1. **Route extraction** - Walks a route tree (routers mounted on routers,
//!    routes with handler stacks) and decodes every mount pattern into a
//!    canonical endpoint: url template, method, operation id, display name,
//!    template parameters, tags and policy fragments
//! 2. **Annotations** - Metadata and policy fragments registered in an
//!    [`routes::AnnotationRegistry`] and attached to positions in the tree
//! 3. **Reconciliation** - Diffs the endpoints against a snapshot of the
//!    remote operations and applies creates, edits and deletes in bounded
//!    lanes, isolating per-operation failures
//! 4. **Revisions** - Optionally writes into a fresh API revision and
//!    releases it as current afterwards
//!
//! ## Example
//!
//! ```no_run
//! use apim_sync::config::{ExecutorConfig, ServiceConfig, SyncOptions};
//! use apim_sync::provider::azure::AzureAuthenticator;
//! use apim_sync::reconciler::{sync, SyncRequest};
//! use apim_sync::routes::{AnnotationRegistry, EndpointMetadata, Handle, Router};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut registry = AnnotationRegistry::new();
//! let listed = registry.register_metadata(EndpointMetadata {
//!     tags: Some(vec!["users".into()]),
//!     ..Default::default()
//! });
//!
//! let users = Router::new()
//!     .get("/", [Handle::Annotation(listed), Handle::Function])
//!     .get("/:userId", [Handle::Function]);
//! let root = Router::new().mount("/users", users)?;
//!
//! let service = ServiceConfig::from_env()?;
//! let authenticator = AzureAuthenticator::from_env(service.clone())?;
//! let request = SyncRequest {
//!     router: &root,
//!     registry: &registry,
//!     service,
//!     options: SyncOptions::default(),
//!     executor: ExecutorConfig::default(),
//! };
//! let report = sync(&request, &authenticator).await?;
//! println!("{} created, {} updated, {} deleted", report.created, report.updated, report.deleted);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod observability;
pub mod provider;
pub mod reconciler;
pub mod routes;
