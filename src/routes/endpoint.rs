//! # Endpoint Model
//!
//! Canonical endpoint descriptors produced by the route extractor and the
//! insertion-ordered set that holds them.

use crate::routes::policy::PolicySet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// HTTP verb of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
            Method::Patch => "patch",
            Method::Options => "options",
            Method::Head => "head",
        }
    }

    /// Upper-case form used on the wire by APIM
    pub fn as_upper(self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "put" => Ok(Method::Put),
            "delete" => Ok(Method::Delete),
            "patch" => Ok(Method::Patch),
            "options" => Ok(Method::Options),
            "head" => Ok(Method::Head),
            other => Err(format!("unsupported HTTP method: {other}")),
        }
    }
}

/// Path parameter declared in an operation's url template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParameter {
    pub name: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TemplateParameter {
    /// Required string parameter, the only kind route paths can express
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            kind: "string".to_string(),
        }
    }
}

/// Canonical description of one operation as it should exist remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    pub operation_id: String,
    pub url_template: String,
    pub method: Method,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub template_parameters: Vec<TemplateParameter>,
    /// Tag display names, without duplicates, in first-seen order
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<serde_json::Value>,
    #[serde(default)]
    pub responses: Vec<serde_json::Value>,
    #[serde(default)]
    pub policies: PolicySet,
}

/// Dedup key of an endpoint: path shape with parameter names erased, plus method
///
/// `/user/:id` and `/user/:name` share a key because APIM cannot tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    pub shape: String,
    pub method: Method,
}

/// Insertion-ordered endpoint collection keyed by [`EndpointKey`]
#[derive(Debug, Clone, Default)]
pub struct EndpointSet {
    endpoints: Vec<EndpointDescriptor>,
    index: HashMap<EndpointKey, usize>,
}

impl EndpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get_by_key(&self, key: &EndpointKey) -> Option<&EndpointDescriptor> {
        self.index.get(key).map(|&i| &self.endpoints[i])
    }

    pub(crate) fn get_mut_by_key(&mut self, key: &EndpointKey) -> Option<&mut EndpointDescriptor> {
        self.index.get(key).map(|&i| &mut self.endpoints[i])
    }

    /// Look up by url template and method
    pub fn get(&self, url_template: &str, method: Method) -> Option<&EndpointDescriptor> {
        self.endpoints
            .iter()
            .find(|e| e.url_template == url_template && e.method == method)
    }

    pub(crate) fn insert(&mut self, key: EndpointKey, endpoint: EndpointDescriptor) {
        self.index.insert(key, self.endpoints.len());
        self.endpoints.push(endpoint);
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.endpoints.iter()
    }

    pub fn into_vec(self) -> Vec<EndpointDescriptor> {
        self.endpoints
    }
}

impl IntoIterator for EndpointSet {
    type Item = EndpointDescriptor;
    type IntoIter = std::vec::IntoIter<EndpointDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.endpoints.into_iter()
    }
}
