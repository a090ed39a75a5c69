//! # Route Manifest
//!
//! YAML description of a route tree, for syncing without linking the
//! application that owns the routes.
//!
//! ```yaml
//! basePath: api
//! routes:
//!   - policies:                       # applies to every later sibling
//!       - location: inbound
//!         xml: <cors />
//!   - path: /users
//!     routes:                         # mounted sub-router
//!       - path: /
//!         methods: [get, post]
//!       - path: /:userId
//!         methods: [get]
//!         metadata:
//!           displayName: Get user
//!           tags: [users]
//! ```

use crate::routes::annotation::{AnnotationRegistry, EndpointMetadata};
use crate::routes::endpoint::Method;
use crate::routes::pattern::PatternError;
use crate::routes::policy::Location;
use crate::routes::tree::{Handle, Route, Router};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read route manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse route manifest: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("invalid manifest entry: {0}")]
    InvalidLayer(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestPolicy {
    pub location: Location,
    pub xml: String,
}

/// One manifest entry: a mount (`routes`), a route (`methods`), or an annotation-only entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestLayer {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub routes: Option<Vec<ManifestLayer>>,
    #[serde(default)]
    pub metadata: Option<EndpointMetadata>,
    #[serde(default)]
    pub policies: Vec<ManifestPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteManifest {
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub routes: Vec<ManifestLayer>,
}

impl RouteManifest {
    /// # Errors
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml(content: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Build the route tree, registering annotations in `registry`
    ///
    /// # Errors
    /// Returns an error on an uncompilable mount path or an entry that is
    /// both a mount and a route.
    pub fn into_router(&self, registry: &mut AnnotationRegistry) -> Result<Router, ManifestError> {
        build_router(&self.routes, registry)
    }
}

fn annotation_handles(layer: &ManifestLayer, registry: &mut AnnotationRegistry) -> Vec<Handle> {
    let mut handles = Vec::new();
    if let Some(metadata) = &layer.metadata {
        handles.push(Handle::Annotation(registry.register_metadata(metadata.clone())));
    }
    for policy in &layer.policies {
        handles.push(Handle::Annotation(
            registry.register_policy(policy.xml.clone(), policy.location),
        ));
    }
    handles
}

fn build_router(
    layers: &[ManifestLayer],
    registry: &mut AnnotationRegistry,
) -> Result<Router, ManifestError> {
    let mut router = Router::new();

    for layer in layers {
        let path = layer.path.as_deref().unwrap_or("/");
        match (&layer.routes, layer.methods.is_empty()) {
            (Some(_), false) => {
                return Err(ManifestError::InvalidLayer(format!(
                    "`{path}` declares both `routes` and `methods`"
                )));
            }
            (Some(children), true) => {
                let mut sub_router = Router::new();
                for handle in annotation_handles(layer, registry) {
                    if let Handle::Annotation(token) = handle {
                        sub_router = sub_router.annotate(token);
                    }
                }
                let mut built = build_router(children, registry)?;
                sub_router.layers.append(&mut built.layers);
                router = router.mount(path, sub_router)?;
            }
            (None, false) => {
                let mut handles = annotation_handles(layer, registry);
                handles.push(Handle::Function);
                let mut route = Route::new(path);
                for method in &layer.methods {
                    route = route.handle(*method, handles.clone());
                }
                router = router.add_route(route);
            }
            (None, true) => {
                if layer.path.is_some() {
                    return Err(ManifestError::InvalidLayer(format!(
                        "`{path}` declares neither `routes` nor `methods`"
                    )));
                }
                for handle in annotation_handles(layer, registry) {
                    if let Handle::Annotation(token) = handle {
                        router = router.annotate(token);
                    }
                }
            }
        }
    }

    Ok(router)
}
