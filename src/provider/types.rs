//! # Registry Types
//!
//! Transport-neutral views of the remote API registry's resources.

use crate::routes::endpoint::{EndpointDescriptor, TemplateParameter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of a listing, with the continuation link of the next page
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_link: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_link: None,
        }
    }
}

/// API registered in the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiContract {
    /// Full resource id
    pub id: String,
    /// API identifier, with `;rev=N` for non-current revisions
    pub name: String,
    pub display_name: String,
    pub path: String,
    pub api_version: Option<String>,
    pub api_revision: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRevision {
    pub api_id: String,
    pub api_revision: String,
}

/// Tag registered in the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag identifier used in resource paths
    pub name: String,
    pub display_name: String,
}

/// Row of the operations-by-tag listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTag {
    /// Operation identifier (last segment of its resource id)
    pub operation_name: String,
    pub tag: Tag,
}

/// Operation as it currently exists remotely
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteOperation {
    /// Full resource id
    pub id: String,
    pub name: String,
    pub url_template: String,
    pub method: String,
    /// Tag display names
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub display_name: String,
    pub request: Option<Value>,
    pub responses: Vec<Value>,
}

impl RemoteOperation {
    /// Identifier used by delete calls: the last segment of the resource id
    pub fn operation_id(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }
}

/// Body of a create-or-update operation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationBody {
    pub display_name: String,
    /// Upper-case HTTP method
    pub method: String,
    pub url_template: String,
    #[serde(default)]
    pub template_parameters: Vec<TemplateParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(default)]
    pub responses: Vec<Value>,
}

impl From<&EndpointDescriptor> for OperationBody {
    fn from(endpoint: &EndpointDescriptor) -> Self {
        Self {
            display_name: endpoint.display_name.clone(),
            method: endpoint.method.as_upper(),
            url_template: endpoint.url_template.clone(),
            template_parameters: endpoint.template_parameters.clone(),
            description: endpoint.description.clone(),
            request: endpoint.request.clone(),
            responses: endpoint.responses.clone(),
        }
    }
}
