//! # Sync Options
//!
//! Per-run behaviour switches.

use super::{env_var_or_default, optional_env};

/// Options for one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Prefix prepended to every extracted path; remote operations outside it are left alone
    pub base_path: String,
    /// Fail extraction when two routes resolve to the same endpoint
    pub break_on_same_path: bool,
    /// Create a new revision before applying changes
    pub generate_new_revision: bool,
    /// Release the new revision as current after applying changes
    ///
    /// `None` follows `generate_new_revision`.
    pub make_new_revision_as_current: Option<bool>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            break_on_same_path: false,
            generate_new_revision: true,
            make_new_revision_as_current: None,
        }
    }
}

impl SyncOptions {
    /// Load options from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_path: optional_env("APIM_BASE_PATH").unwrap_or(defaults.base_path),
            break_on_same_path: env_var_or_default(
                "APIM_BREAK_ON_SAME_PATH",
                defaults.break_on_same_path,
            ),
            generate_new_revision: env_var_or_default(
                "APIM_GENERATE_REVISION",
                defaults.generate_new_revision,
            ),
            make_new_revision_as_current: optional_env("APIM_PROMOTE_REVISION")
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Whether the revision used by this run is released at the end
    pub fn promote_revision(&self) -> bool {
        self.make_new_revision_as_current
            .unwrap_or(self.generate_new_revision)
    }
}
