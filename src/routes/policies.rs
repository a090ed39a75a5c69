//! # Built-in Policy Fragments
//!
//! Builders for common APIM access-restriction policies. Each builder renders
//! the XML fragment and registers it, returning the token to place in a tree.
//!
//! See: https://learn.microsoft.com/azure/api-management/api-management-access-restriction-policies

use crate::routes::annotation::{AnnotationRegistry, AnnotationToken};
use crate::routes::policy::Location;

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `check-header` policy settings
#[derive(Debug, Clone)]
pub struct CheckHeader {
    /// Name of the HTTP header to check
    pub header_name: String,
    /// Status code returned when the header is missing or invalid
    pub failed_check_httpcode: u16,
    pub failed_check_error_message: String,
    pub ignore_case: bool,
    /// Accepted values; any match passes
    pub values: Vec<String>,
}

impl CheckHeader {
    pub fn to_xml(&self) -> String {
        let mut xml = format!(
            "<check-header name=\"{}\" failed-check-httpcode=\"{}\" failed-check-error-message=\"{}\" ignore-case=\"{}\"",
            escape_attr(&self.header_name),
            self.failed_check_httpcode,
            escape_attr(&self.failed_check_error_message),
            if self.ignore_case { "True" } else { "False" },
        );
        if self.values.is_empty() {
            xml.push_str(" />");
            return xml;
        }
        xml.push_str(">\n");
        for value in &self.values {
            xml.push_str(&format!("  <value>{}</value>\n", escape_text(value)));
        }
        xml.push_str("</check-header>");
        xml
    }
}

/// Register a `check-header` policy (inbound or outbound only)
pub fn check_header(
    registry: &mut AnnotationRegistry,
    config: &CheckHeader,
    outbound: bool,
) -> AnnotationToken {
    let location = if outbound {
        Location::Outbound
    } else {
        Location::Inbound
    };
    registry.register_policy(config.to_xml(), location)
}

/// `name`/`id` reference to an API or operation; APIM prefers `id` when both are set
fn reference_attrs(name: Option<&str>, id: Option<&str>) -> String {
    let mut attrs = String::new();
    if let Some(name) = name {
        attrs.push_str(&format!(" name=\"{}\"", escape_attr(name)));
    }
    if let Some(id) = id {
        attrs.push_str(&format!(" id=\"{}\"", escape_attr(id)));
    }
    attrs
}

/// Per-operation call limit inside a `rate-limit` policy
#[derive(Debug, Clone, Default)]
pub struct RateLimitOperation {
    pub name: Option<String>,
    pub id: Option<String>,
    pub calls: u32,
    pub renewal_period: u32,
}

/// Per-API call limit inside a `rate-limit` policy
#[derive(Debug, Clone, Default)]
pub struct RateLimitApi {
    pub name: Option<String>,
    pub id: Option<String>,
    pub calls: u32,
    pub renewal_period: u32,
    pub operations: Vec<RateLimitOperation>,
}

/// `rate-limit` policy settings
#[derive(Debug, Clone)]
pub struct RateLimit {
    pub calls: u32,
    /// Window in seconds
    pub renewal_period: u32,
    pub apis: Vec<RateLimitApi>,
}

impl RateLimit {
    pub fn to_xml(&self) -> String {
        let open = format!(
            "<rate-limit calls=\"{}\" renewal-period=\"{}\"",
            self.calls, self.renewal_period
        );
        if self.apis.is_empty() {
            return format!("{open} />");
        }

        let mut xml = format!("{open}>\n");
        for api in &self.apis {
            let api_open = format!(
                "  <api{} calls=\"{}\" renewal-period=\"{}\"",
                reference_attrs(api.name.as_deref(), api.id.as_deref()),
                api.calls,
                api.renewal_period
            );
            if api.operations.is_empty() {
                xml.push_str(&format!("{api_open} />\n"));
                continue;
            }
            xml.push_str(&format!("{api_open}>\n"));
            for operation in &api.operations {
                xml.push_str(&format!(
                    "    <operation{} calls=\"{}\" renewal-period=\"{}\" />\n",
                    reference_attrs(operation.name.as_deref(), operation.id.as_deref()),
                    operation.calls,
                    operation.renewal_period
                ));
            }
            xml.push_str("  </api>\n");
        }
        xml.push_str("</rate-limit>");
        xml
    }
}

/// Register a `rate-limit` policy; APIM only allows it inbound
pub fn rate_limit(registry: &mut AnnotationRegistry, config: &RateLimit) -> AnnotationToken {
    registry.register_policy(config.to_xml(), Location::Inbound)
}

/// `rate-limit-by-key` policy settings
#[derive(Debug, Clone)]
pub struct RateLimitByKey {
    pub calls: u32,
    /// Window in seconds
    pub renewal_period: u32,
    /// Policy expression naming the counter, e.g. `@(context.Request.IpAddress)`
    pub counter_key: String,
    /// Policy expression deciding whether a request counts; every request counts when unset
    pub increment_condition: Option<String>,
}

impl RateLimitByKey {
    pub fn to_xml(&self) -> String {
        let mut xml = format!(
            "<rate-limit-by-key calls=\"{}\" renewal-period=\"{}\" counter-key=\"{}\"",
            self.calls,
            self.renewal_period,
            escape_attr(&self.counter_key)
        );
        if let Some(condition) = &self.increment_condition {
            xml.push_str(&format!(" increment-condition=\"{}\"", escape_attr(condition)));
        }
        xml.push_str(" />");
        xml
    }
}

/// Register a `rate-limit-by-key` policy; inbound only
pub fn rate_limit_by_key(
    registry: &mut AnnotationRegistry,
    config: &RateLimitByKey,
) -> AnnotationToken {
    registry.register_policy(config.to_xml(), Location::Inbound)
}
