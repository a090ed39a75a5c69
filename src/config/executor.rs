//! # Executor Configuration
//!
//! Lane counts for the bounded concurrency executor.

use super::env_var_or_default;

/// Executor sizing
///
/// A lane count of zero is treated as one by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Lanes for operation create/edit/delete jobs
    pub operation_lanes: usize,
    /// Lanes for the tag and policy calls made for a single operation
    pub tag_lanes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            operation_lanes: DEFAULT_OPERATION_LANES,
            tag_lanes: DEFAULT_TAG_LANES,
        }
    }
}

impl ExecutorConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            operation_lanes: env_var_or_default("APIM_OPERATION_LANES", DEFAULT_OPERATION_LANES),
            tag_lanes: env_var_or_default("APIM_TAG_LANES", DEFAULT_TAG_LANES),
        }
    }
}
