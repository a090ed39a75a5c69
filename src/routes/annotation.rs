//! # Endpoint Annotations
//!
//! Metadata and policy fragments attached to positions in a route tree.
//!
//! Annotations are registered once while the tree is built. Registration hands
//! back an [`AnnotationToken`] that the tree stores as a marker node (or as a
//! handle in a route's stack); the extractor resolves tokens against the same
//! registry instance when it walks the tree.

use crate::routes::endpoint::{EndpointDescriptor, TemplateParameter};
use crate::routes::policy::{Location, PolicySet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Partial override of an endpoint descriptor
///
/// Every field left as `None` keeps the generated (or previously merged) value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointMetadata {
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub request: Option<serde_json::Value>,
    #[serde(default)]
    pub responses: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub template_parameters: Option<Vec<TemplateParameter>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl EndpointMetadata {
    /// Overwrite fields with the ones set in `later`
    pub fn merge(&mut self, later: &EndpointMetadata) {
        fn take<T: Clone>(slot: &mut Option<T>, later: &Option<T>) {
            if later.is_some() {
                slot.clone_from(later);
            }
        }
        take(&mut self.operation_id, &later.operation_id);
        take(&mut self.display_name, &later.display_name);
        take(&mut self.description, &later.description);
        take(&mut self.request, &later.request);
        take(&mut self.responses, &later.responses);
        take(&mut self.template_parameters, &later.template_parameters);
        take(&mut self.tags, &later.tags);
    }

    /// Write every set field onto a descriptor
    pub fn apply_to(&self, endpoint: &mut EndpointDescriptor) {
        if let Some(operation_id) = &self.operation_id {
            endpoint.operation_id.clone_from(operation_id);
        }
        if let Some(display_name) = &self.display_name {
            endpoint.display_name.clone_from(display_name);
        }
        if let Some(description) = &self.description {
            endpoint.description = Some(description.clone());
        }
        if let Some(request) = &self.request {
            endpoint.request = Some(request.clone());
        }
        if let Some(responses) = &self.responses {
            endpoint.responses.clone_from(responses);
        }
        if let Some(parameters) = &self.template_parameters {
            endpoint.template_parameters.clone_from(parameters);
        }
        if let Some(tags) = &self.tags {
            endpoint.tags = dedup_tags(tags.iter().cloned());
        }
    }
}

/// Remove duplicate and blank tags, keeping first-seen order
pub(crate) fn dedup_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Annotation attached to a route position
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointAnnotation {
    Metadata(EndpointMetadata),
    Policy { xml: String, location: Location },
}

/// Opaque handle returned by registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnnotationToken {
    registry: Uuid,
    index: usize,
}

/// Result of merging a list of annotations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointOverride {
    pub metadata: EndpointMetadata,
    pub policies: PolicySet,
}

/// Append-only store of annotations
#[derive(Debug)]
pub struct AnnotationRegistry {
    id: Uuid,
    entries: Vec<EndpointAnnotation>,
}

impl Default for AnnotationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationRegistry {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            entries: Vec::new(),
        }
    }

    fn push(&mut self, annotation: EndpointAnnotation) -> AnnotationToken {
        self.entries.push(annotation);
        AnnotationToken {
            registry: self.id,
            index: self.entries.len() - 1,
        }
    }

    pub fn register_metadata(&mut self, metadata: EndpointMetadata) -> AnnotationToken {
        self.push(EndpointAnnotation::Metadata(metadata))
    }

    pub fn register_policy(&mut self, xml: impl Into<String>, location: Location) -> AnnotationToken {
        self.push(EndpointAnnotation::Policy {
            xml: xml.into(),
            location,
        })
    }

    /// Resolve a token; tokens issued by another registry resolve to `None`
    pub fn lookup(&self, token: AnnotationToken) -> Option<&EndpointAnnotation> {
        if token.registry != self.id {
            return None;
        }
        self.entries.get(token.index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold annotations in order: metadata fields overwrite, policies accumulate
    pub fn merge_all(annotations: &[&EndpointAnnotation]) -> EndpointOverride {
        let mut merged = EndpointOverride::default();
        for annotation in annotations {
            match annotation {
                EndpointAnnotation::Metadata(metadata) => merged.metadata.merge(metadata),
                EndpointAnnotation::Policy { xml, location } => {
                    merged.policies.push(*location, xml.clone());
                }
            }
        }
        merged
    }
}
