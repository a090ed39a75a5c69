//! # Routes
//!
//! Local side of a sync: the route tree model, the pattern decoder, the
//! annotation registry and the extractor that turns a tree into endpoints.

pub mod annotation;
pub mod endpoint;
pub mod extractor;
pub mod manifest;
pub mod pattern;
pub mod policies;
pub mod policy;
pub mod template;
pub mod tree;

pub use annotation::{AnnotationRegistry, AnnotationToken, EndpointAnnotation, EndpointMetadata};
pub use endpoint::{EndpointDescriptor, EndpointSet, Method, TemplateParameter};
pub use extractor::{extract, ExtractError, ExtractOptions, Extractor};
pub use manifest::{ManifestError, RouteManifest};
pub use pattern::{PathMatcher, PatternError};
pub use policy::{Location, PolicySet};
pub use tree::{Handle, Route, RouteNode, Router};
