//! # ARM URL Builders

use crate::config::ServiceConfig;

/// Builds Microsoft.ApiManagement resource URLs for one service
#[derive(Debug, Clone)]
pub(crate) struct ServicePaths {
    service_url: String,
    api_version: String,
}

impl ServicePaths {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            service_url: format!(
                "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.ApiManagement/service/{}",
                config.arm_endpoint.trim_end_matches('/'),
                config.subscription_id,
                config.resource_group,
                config.service_name
            ),
            api_version: config.arm_api_version.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}?api-version={}", self.service_url, path, self.api_version)
    }

    pub fn apis(&self) -> String {
        self.url("apis")
    }

    pub fn api(&self, api: &str) -> String {
        self.url(&format!("apis/{api}"))
    }

    pub fn operations(&self, api: &str) -> String {
        self.url(&format!("apis/{api}/operations"))
    }

    pub fn operation(&self, api: &str, operation_id: &str) -> String {
        self.url(&format!("apis/{api}/operations/{operation_id}"))
    }

    /// Tagged operations only
    pub fn operations_by_tags(&self, api: &str) -> String {
        format!(
            "{}&includeNotTaggedOperations=false",
            self.url(&format!("apis/{api}/operationsByTags"))
        )
    }

    pub fn operation_tag(&self, api: &str, operation_id: &str, tag_id: &str) -> String {
        self.url(&format!("apis/{api}/operations/{operation_id}/tags/{tag_id}"))
    }

    pub fn operation_policy(&self, api: &str, operation_id: &str) -> String {
        self.url(&format!("apis/{api}/operations/{operation_id}/policies/policy"))
    }

    pub fn tags(&self) -> String {
        self.url("tags")
    }

    pub fn tag(&self, tag_id: &str) -> String {
        self.url(&format!("tags/{tag_id}"))
    }

    pub fn revisions(&self, api: &str) -> String {
        self.url(&format!("apis/{api}/revisions"))
    }

    pub fn release(&self, api: &str, release_id: &str) -> String {
        self.url(&format!("apis/{api}/releases/{release_id}"))
    }
}
