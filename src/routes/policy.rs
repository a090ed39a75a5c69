//! # Policy Documents
//!
//! Placement locations for policy fragments and the per-endpoint collection of
//! fragments, rendered into the `<policies>` document APIM stores per operation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage a policy fragment is executed in
///
/// - `inbound`: statements applied to the request
/// - `backend`: statements applied before the request is forwarded to the backend
/// - `outbound`: statements applied to the response
/// - `on-error`: statements applied if there is an error condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Location {
    Inbound,
    Backend,
    Outbound,
    OnError,
}

impl Location {
    /// All locations in document order
    pub const ALL: [Location; 4] = [
        Location::Inbound,
        Location::Backend,
        Location::Outbound,
        Location::OnError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Location::Inbound => "inbound",
            Location::Backend => "backend",
            Location::Outbound => "outbound",
            Location::OnError => "on-error",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered XML fragments per location
///
/// Fragments are only ever appended; merging two sets concatenates each
/// location's list, keeping the order fragments were discovered in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inbound: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backend: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outbound: Vec<String>,
    #[serde(default, rename = "on-error", skip_serializing_if = "Vec::is_empty")]
    pub on_error: Vec<String>,
}

impl PolicySet {
    pub fn fragments(&self, location: Location) -> &[String] {
        match location {
            Location::Inbound => &self.inbound,
            Location::Backend => &self.backend,
            Location::Outbound => &self.outbound,
            Location::OnError => &self.on_error,
        }
    }

    fn fragments_mut(&mut self, location: Location) -> &mut Vec<String> {
        match location {
            Location::Inbound => &mut self.inbound,
            Location::Backend => &mut self.backend,
            Location::Outbound => &mut self.outbound,
            Location::OnError => &mut self.on_error,
        }
    }

    pub fn push(&mut self, location: Location, xml: impl Into<String>) {
        self.fragments_mut(location).push(xml.into());
    }

    /// Append every fragment of `other` after the fragments already present
    pub fn extend(&mut self, other: &PolicySet) {
        for location in Location::ALL {
            self.fragments_mut(location)
                .extend(other.fragments(location).iter().cloned());
        }
    }

    pub fn is_empty(&self) -> bool {
        Location::ALL
            .iter()
            .all(|location| self.fragments(*location).is_empty())
    }

    /// Render the full policy document
    ///
    /// Every section keeps `<base />` after the endpoint's own fragments so the
    /// API-level and product-level policies still apply.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<policies>\n");
        for location in Location::ALL {
            xml.push_str(&format!("  <{location}>\n"));
            for fragment in self.fragments(location) {
                for line in fragment.lines() {
                    xml.push_str("    ");
                    xml.push_str(line);
                    xml.push('\n');
                }
            }
            xml.push_str("    <base />\n");
            xml.push_str(&format!("  </{location}>\n"));
        }
        xml.push_str("</policies>\n");
        xml
    }
}
