//! # Service Configuration
//!
//! Coordinates of the API Management service and the API being synced.

use super::{env_var_or_default, optional_env, required_env, ConfigError};

/// APIM service coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub service_name: String,
    /// API name, display name or path; may pin a revision with `;rev=N`
    pub api_id: String,
    /// API version to prefer when several APIs share a name
    pub api_version: Option<String>,
    /// Azure Resource Manager base URL
    pub arm_endpoint: String,
    /// ARM api-version query parameter
    pub arm_api_version: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a required variable is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(None, None)
    }

    /// Load configuration from environment variables, with the API selection
    /// taken from the arguments when given
    ///
    /// # Errors
    /// Returns an error if a required variable is missing.
    pub fn from_env_with(
        api_id: Option<String>,
        api_version: Option<String>,
    ) -> Result<Self, ConfigError> {
        use crate::constants::*;
        let api_id = match api_id {
            Some(api_id) => api_id,
            None => required_env("APIM_API_ID")?,
        };
        Ok(Self {
            subscription_id: required_env("APIM_SUBSCRIPTION_ID")?,
            resource_group: required_env("APIM_RESOURCE_GROUP")?,
            service_name: required_env("APIM_SERVICE_NAME")?,
            api_id,
            api_version: api_version.or_else(|| optional_env("APIM_API_VERSION")),
            arm_endpoint: env_var_or_default("APIM_ARM_ENDPOINT", DEFAULT_ARM_ENDPOINT.to_string()),
            arm_api_version: env_var_or_default(
                "APIM_ARM_API_VERSION",
                DEFAULT_ARM_API_VERSION.to_string(),
            ),
        })
    }

    /// Split `api_id` into the API identifier and the pinned revision, if any
    ///
    /// # Errors
    /// Returns an error if the revision suffix is not a number.
    pub fn api_selector(&self) -> Result<(String, Option<u32>), ConfigError> {
        match self.api_id.split_once(";rev=") {
            None => Ok((self.api_id.clone(), None)),
            Some((name, revision)) => {
                let revision = revision
                    .parse()
                    .ok()
                    .ok_or_else(|| ConfigError::InvalidApiId(self.api_id.clone()))?;
                Ok((name.to_string(), Some(revision)))
            }
        }
    }
}
