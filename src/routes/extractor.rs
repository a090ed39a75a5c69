//! # Route Extraction
//!
//! Walks a route tree depth-first and produces the canonical endpoint set.
//!
//! Mount prefixes accumulate on the way down. Annotation markers apply to the
//! layers that follow them in the same router (and everything below those
//! layers) but never leak back up to the parent router.

use crate::routes::annotation::{
    dedup_tags, AnnotationRegistry, AnnotationToken, EndpointAnnotation, EndpointOverride,
};
use crate::routes::endpoint::{
    EndpointDescriptor, EndpointKey, EndpointSet, Method, TemplateParameter,
};
use crate::routes::pattern::{merge_paths, trim_slashes, PatternError};
use crate::routes::template::{display_name, operation_id, shape_key, url_template, RunCounter};
use crate::routes::tree::{Handle, Route, RouteNode, Router};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that stop extraction before any remote call is made
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("duplicate endpoint {} /{path}", .method.as_upper())]
    DuplicateEndpoint { path: String, method: Method },
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Extraction settings
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Prefix prepended to every extracted path
    pub base_path: String,
    /// Treat two routes resolving to the same endpoint as an error instead of merging them
    pub fail_on_duplicate: bool,
}

/// Single-use extraction run
///
/// The run counter lives inside the extractor, so every run starts numbering
/// operation ids from one.
#[derive(Debug)]
pub struct Extractor<'a> {
    registry: &'a AnnotationRegistry,
    options: ExtractOptions,
    counter: RunCounter,
    endpoints: EndpointSet,
}

impl<'a> Extractor<'a> {
    pub fn new(registry: &'a AnnotationRegistry, options: ExtractOptions) -> Self {
        Self {
            registry,
            options,
            counter: RunCounter::new(),
            endpoints: EndpointSet::new(),
        }
    }

    /// Walk `root` and return every endpoint found
    ///
    /// # Errors
    /// Returns an error on an undecodable path pattern, or on a duplicate
    /// endpoint when `fail_on_duplicate` is set.
    pub fn extract(mut self, root: &Router) -> Result<EndpointSet, ExtractError> {
        let base_path = trim_slashes(&self.options.base_path).to_string();
        self.walk_router(root, &base_path, Vec::new())?;

        info!("Extracted {} endpoints from route tree", self.endpoints.len());
        Ok(self.endpoints)
    }

    fn resolve(&self, token: AnnotationToken) -> Option<&'a EndpointAnnotation> {
        let annotation = self.registry.lookup(token);
        if annotation.is_none() {
            warn!("Ignoring annotation token not issued by this registry: {:?}", token);
        }
        annotation
    }

    /// Walk one router's layers in order
    ///
    /// `annotations` holds the markers inherited from the parent. A marker met
    /// here is pushed onto this router's own copy, so it reaches the layers
    /// after it (and their descendants) but never an earlier sibling or the
    /// parent router.
    fn walk_router(
        &mut self,
        router: &Router,
        prefix: &str,
        mut annotations: Vec<&'a EndpointAnnotation>,
    ) -> Result<(), ExtractError> {
        for layer in &router.layers {
            match &layer.node {
                RouteNode::Annotation(token) => {
                    if let Some(annotation) = self.resolve(*token) {
                        annotations.push(annotation);
                    }
                }
                RouteNode::Middleware => {}
                RouteNode::Route(route) => {
                    let path = merge_paths([prefix, layer.matcher.decode()?.as_str()]);
                    if route.is_simple() {
                        self.finalize_route(route, &path, annotations.clone())?;
                    } else {
                        self.walk_route_stack(route, &path, annotations.clone())?;
                    }
                }
                RouteNode::Router(sub_router) => {
                    let path = merge_paths([prefix, layer.matcher.decode()?.as_str()]);
                    self.walk_router(sub_router, &path, annotations.clone())?;
                }
            }
        }
        Ok(())
    }

    /// Route whose stack mixes routers in: walk each router as if mounted at the route path
    fn walk_route_stack(
        &mut self,
        route: &Route,
        path: &str,
        mut annotations: Vec<&'a EndpointAnnotation>,
    ) -> Result<(), ExtractError> {
        for layer in &route.stack {
            match &layer.handle {
                Handle::Annotation(token) => {
                    if let Some(annotation) = self.resolve(*token) {
                        annotations.push(annotation);
                    }
                }
                Handle::Router(router) => self.walk_router(router, path, annotations.clone())?,
                Handle::Function => {}
            }
        }
        Ok(())
    }

    fn finalize_route(
        &mut self,
        route: &Route,
        path: &str,
        mut annotations: Vec<&'a EndpointAnnotation>,
    ) -> Result<(), ExtractError> {
        for layer in &route.stack {
            if let Handle::Annotation(token) = &layer.handle {
                if let Some(annotation) = self.resolve(*token) {
                    annotations.push(annotation);
                }
            }
        }

        let merged = AnnotationRegistry::merge_all(&annotations);
        let full_path = format!("/{path}");
        // One template per route: every method shares the same parameter names
        let template = url_template(&full_path, &mut self.counter);
        for method in route.methods() {
            self.add_endpoint(&full_path, method, &template, &merged)?;
        }
        Ok(())
    }

    fn add_endpoint(
        &mut self,
        path: &str,
        method: Method,
        (template, template_parameters): &(String, Vec<TemplateParameter>),
        merged: &EndpointOverride,
    ) -> Result<(), ExtractError> {
        let key = EndpointKey {
            shape: shape_key(path),
            method,
        };

        if let Some(existing) = self.endpoints.get_mut_by_key(&key) {
            if self.options.fail_on_duplicate {
                return Err(ExtractError::DuplicateEndpoint {
                    path: trim_slashes(path).to_string(),
                    method,
                });
            }

            debug!("Merging duplicate endpoint {} {}", method.as_upper(), path);
            let previous_tags = std::mem::take(&mut existing.tags);
            merged.metadata.apply_to(existing);
            let merged_tags = std::mem::take(&mut existing.tags);
            existing.tags = dedup_tags(previous_tags.into_iter().chain(merged_tags));
            existing.policies.extend(&merged.policies);
            return Ok(());
        }

        let mut endpoint = EndpointDescriptor {
            operation_id: operation_id(path, method, &mut self.counter),
            url_template: template.clone(),
            method,
            display_name: display_name(path, method),
            description: None,
            template_parameters: template_parameters.clone(),
            tags: Vec::new(),
            request: None,
            responses: Vec::new(),
            policies: merged.policies.clone(),
        };
        merged.metadata.apply_to(&mut endpoint);

        debug!(
            "Found endpoint {} {} ({})",
            method.as_upper(),
            endpoint.url_template,
            endpoint.operation_id
        );
        self.endpoints.insert(key, endpoint);
        Ok(())
    }
}

/// Extract endpoints from `root` with a fresh run counter
///
/// # Errors
/// See [`Extractor::extract`].
pub fn extract(
    root: &Router,
    registry: &AnnotationRegistry,
    options: ExtractOptions,
) -> Result<EndpointSet, ExtractError> {
    Extractor::new(registry, options).extract(root)
}
