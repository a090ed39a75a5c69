//! # Tag Registry
//!
//! Cache of the service's tags with de-duplicated creation.
//!
//! Several operations usually share a tag that does not exist yet. The first
//! caller of [`TagRegistry::ensure_tag`] for a name starts the creation and
//! parks a shared future under the trimmed name; concurrent callers await the
//! same future, so each name is created once per run.

use crate::provider::types::Tag;
use crate::provider::RemoteRegistryClient;
use anyhow::{anyhow, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

type TagCreation = Shared<BoxFuture<'static, Result<Tag, Arc<anyhow::Error>>>>;

#[derive(Default)]
struct TagState {
    tags: Vec<Tag>,
    in_flight: HashMap<String, TagCreation>,
}

/// Tag cache shared by all jobs of one sync run
#[derive(Clone)]
pub struct TagRegistry {
    client: Arc<dyn RemoteRegistryClient>,
    state: Arc<Mutex<TagState>>,
}

impl std::fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("TagRegistry")
            .field("tags", &state.tags)
            .field("in_flight", &state.in_flight.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Tag id for a display name: its ASCII alphanumerics followed by `suffix`
pub fn tag_id(display_name: &str, suffix: i64) -> String {
    let stem: String = display_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    format!("{stem}{suffix}")
}

fn has_alphanumeric(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_alphanumeric())
}

impl TagRegistry {
    /// Seed the cache with the tags found in the snapshot
    pub fn new(client: Arc<dyn RemoteRegistryClient>, existing: Vec<Tag>) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(TagState {
                tags: existing,
                in_flight: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TagState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached tag with this display name
    pub fn find(&self, display_name: &str) -> Option<Tag> {
        let display_name = display_name.trim();
        self.lock()
            .tags
            .iter()
            .find(|tag| tag.display_name == display_name)
            .cloned()
    }

    /// Return the tag named `display_name`, creating it if needed
    ///
    /// Returns `Ok(None)` for names without any alphanumeric character, which
    /// cannot form a tag id.
    ///
    /// # Errors
    /// Returns an error if the creation call fails. Every caller waiting on
    /// that creation gets the error; a later call retries.
    pub async fn ensure_tag(&self, display_name: &str) -> Result<Option<Tag>> {
        let display_name = display_name.trim();
        if !has_alphanumeric(display_name) {
            return Ok(None);
        }

        let creation = {
            let mut state = self.lock();
            if let Some(tag) = state.tags.iter().find(|t| t.display_name == display_name) {
                return Ok(Some(tag.clone()));
            }
            if let Some(creation) = state.in_flight.get(display_name) {
                creation.clone()
            } else {
                let creation = Self::create(
                    Arc::clone(&self.client),
                    Arc::clone(&self.state),
                    display_name.to_string(),
                )
                .boxed()
                .shared();
                state
                    .in_flight
                    .insert(display_name.to_string(), creation.clone());
                creation
            }
        };

        creation
            .await
            .map(Some)
            .map_err(|e| anyhow!("Failed to create tag {display_name}: {e:#}"))
    }

    async fn create(
        client: Arc<dyn RemoteRegistryClient>,
        state: Arc<Mutex<TagState>>,
        display_name: String,
    ) -> Result<Tag, Arc<anyhow::Error>> {
        let id = tag_id(&display_name, chrono::Utc::now().timestamp_millis());
        info!("Creating tag {} ({})", display_name, id);
        let result = client.create_or_update_tag(&id, &display_name).await;

        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight.remove(&display_name);
        match result {
            Ok(tag) => {
                state.tags.push(tag.clone());
                Ok(tag)
            }
            Err(e) => Err(Arc::new(e)),
        }
    }
}
