//! # Reconciliation Plan
//!
//! Three-way diff between the remote operations and the extracted endpoints.

use crate::provider::types::RemoteOperation;
use crate::routes::endpoint::EndpointDescriptor;
use regex::Regex;
use std::sync::LazyLock;

/// Disambiguation suffix added to parameter names (`{idP3}`)
static PARAM_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(.*?)(?:P\d*?|)\}")
        .expect("Failed to compile PARAM_SUFFIX regex - this should never happen")
});

/// Work needed to make the remote registry match the local endpoints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationPlan {
    /// Operation ids to delete
    pub to_delete: Vec<String>,
    pub to_create: Vec<EndpointDescriptor>,
    /// Remote operation paired with the endpoint that claimed it
    pub to_edit: Vec<(RemoteOperation, EndpointDescriptor)>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty() && self.to_edit.is_empty()
    }
}

/// Url template with parameter suffixes removed, lower-cased
pub fn normalize_template(template: &str) -> String {
    PARAM_SUFFIX.replace_all(template, "{$1}").to_lowercase()
}

fn matching_key(template: &str, method: &str) -> (String, String) {
    (normalize_template(template), method.to_ascii_uppercase())
}

/// Build the plan
///
/// Greedy, in endpoint order: each endpoint claims the first unclaimed remote
/// operation with the same normalized template and method. Remote operations
/// left unclaimed are deleted.
pub fn plan(old: Vec<RemoteOperation>, new: Vec<EndpointDescriptor>) -> ReconciliationPlan {
    let mut pool: Vec<Option<((String, String), RemoteOperation)>> = old
        .into_iter()
        .map(|op| Some((matching_key(&op.url_template, &op.method), op)))
        .collect();

    let mut plan = ReconciliationPlan::default();

    for endpoint in new {
        let key = matching_key(&endpoint.url_template, endpoint.method.as_str());
        let claimed = pool
            .iter_mut()
            .find(|slot| matches!(slot, Some((candidate, _)) if *candidate == key))
            .and_then(Option::take);

        match claimed {
            Some((_, remote)) => plan.to_edit.push((remote, endpoint)),
            None => plan.to_create.push(endpoint),
        }
    }

    plan.to_delete = pool
        .into_iter()
        .flatten()
        .map(|(_, remote)| remote.operation_id().to_string())
        .collect();

    plan
}
