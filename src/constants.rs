//! # Constants
//!
//! Defaults shared by configuration, the reconciler and the Azure transport.

/// Display name of the tag marking operations owned by this tool
pub const MANAGED_TAG: &str = "apim-sync";

/// Concurrent lanes for operation create/edit/delete jobs
pub const DEFAULT_OPERATION_LANES: usize = 5;

/// Concurrent lanes for per-operation tag and policy calls
pub const DEFAULT_TAG_LANES: usize = 2;

/// Azure Resource Manager endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// ARM api-version used for every Microsoft.ApiManagement call
pub const DEFAULT_ARM_API_VERSION: &str = "2022-08-01";

/// OAuth scope requested for Azure Resource Manager tokens
pub const ARM_TOKEN_SCOPE: &str = "https://management.azure.com/.default";

/// Description and release notes written on revisions created by a sync
pub const REVISION_DESCRIPTION: &str = "Auto-created revision by apim-sync";

/// HTTP request timeout for ARM calls (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
