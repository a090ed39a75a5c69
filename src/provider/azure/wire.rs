//! # ARM Wire Types
//!
//! JSON shapes of the Microsoft.ApiManagement REST API and their conversion
//! into provider types.

use crate::provider::types::{ApiContract, ApiRevision, OperationTag, Page, RemoteOperation, Tag};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ "value": [...], "nextLink": "..." }`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub next_link: Option<String>,
}

impl<T> ListResponse<T> {
    pub fn into_page<U>(self, convert: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.value.into_iter().map(convert).collect(),
            next_link: self.next_link.filter(|link| !link.is_empty()),
        }
    }
}

/// Resource envelope with `properties`
#[derive(Debug, Deserialize)]
pub(crate) struct Resource<P> {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: P,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiProperties {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub api_revision: Option<String>,
}

impl From<Resource<ApiProperties>> for ApiContract {
    fn from(resource: Resource<ApiProperties>) -> Self {
        let properties = resource.properties;
        Self {
            id: resource.id,
            display_name: properties.display_name.unwrap_or_default(),
            path: properties.path.unwrap_or_default(),
            api_version: properties.api_version.filter(|v| !v.is_empty()),
            api_revision: properties.api_revision.unwrap_or_else(|| "1".to_string()),
            name: resource.name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OperationProperties {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url_template: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub request: Option<Value>,
    #[serde(default)]
    pub responses: Option<Vec<Value>>,
}

impl From<Resource<OperationProperties>> for RemoteOperation {
    fn from(resource: Resource<OperationProperties>) -> Self {
        let properties = resource.properties;
        Self {
            id: resource.id,
            name: resource.name,
            url_template: properties.url_template.unwrap_or_default(),
            method: properties.method.unwrap_or_default(),
            tags: Vec::new(),
            description: properties.description.filter(|d| !d.is_empty()),
            display_name: properties.display_name.unwrap_or_default(),
            request: properties.request,
            responses: properties.responses.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TagProperties {
    #[serde(default)]
    pub display_name: Option<String>,
}

impl From<Resource<TagProperties>> for Tag {
    fn from(resource: Resource<TagProperties>) -> Self {
        Self {
            display_name: resource
                .properties
                .display_name
                .unwrap_or_else(|| resource.name.clone()),
            name: resource.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RevisionContract {
    #[serde(default)]
    pub api_id: String,
    pub api_revision: String,
}

impl From<RevisionContract> for ApiRevision {
    fn from(revision: RevisionContract) -> Self {
        Self {
            api_id: revision.api_id,
            api_revision: revision.api_revision,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceReference {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Row of `operationsByTags`
#[derive(Debug, Deserialize)]
pub(crate) struct TagResourceContract {
    #[serde(default)]
    pub tag: Option<ResourceReference>,
    #[serde(default)]
    pub operation: Option<ResourceReference>,
}

fn last_segment(id: &str) -> String {
    id.rsplit('/').next().unwrap_or(id).to_string()
}

impl TagResourceContract {
    /// Rows without both a tag and an operation carry nothing to fold
    pub fn into_operation_tag(self) -> Option<OperationTag> {
        let tag = self.tag?;
        let operation = self.operation?;
        let tag_name = last_segment(&tag.id);
        Some(OperationTag {
            operation_name: last_segment(&operation.id),
            tag: Tag {
                display_name: tag.name.unwrap_or_else(|| tag_name.clone()),
                name: tag_name,
            },
        })
    }
}

/// `{ "properties": ... }` request envelope
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<P> {
    pub properties: P,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TagBody<'a> {
    pub display_name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PolicyBody<'a> {
    pub format: &'static str,
    pub value: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RevisionBody<'a> {
    pub source_api_id: &'a str,
    pub api_revision_description: &'a str,
    pub path: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReleaseBody<'a> {
    pub api_id: &'a str,
    pub notes: &'a str,
}
