//! In-memory registry client
//!
//! Stores operations, tags and revisions in memory, pages listings with a
//! configurable page size and records every write so tests can assert on the
//! exact calls a sync made.
//!
//! Any client method can be switched to fail with [`FakeRegistry::fail_call`].
//! A switched-off write fails before it is recorded.

use anyhow::{bail, Result};
use apim_sync::provider::{
    ApiContract, ApiRevision, Authenticator, OperationBody, OperationTag, Page, RemoteOperation,
    RemoteRegistryClient, Tag,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Write made against the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PutOperation(String),
    DeleteOperation(String),
    CreateTag(String),
    AssignTag { operation: String, tag: String },
    DetachTag { operation: String, tag: String },
    SetPolicy(String),
    CreateRevision(String),
    CreateRelease(String),
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub apis: Vec<ApiContract>,
    pub revisions: Vec<ApiRevision>,
    pub operations: Vec<RemoteOperation>,
    /// Operation name → tag display names
    pub operation_tags: HashMap<String, Vec<String>>,
    pub tags: Vec<Tag>,
    pub policies: HashMap<String, String>,
    pub calls: Vec<Call>,
    /// Operation ids whose create/update call fails
    pub failing_operations: HashSet<String>,
    /// Operation ids whose policy write fails
    pub failing_policies: HashSet<String>,
    /// Client methods that fail on every call, by method name
    pub failing_calls: HashSet<&'static str>,
}

#[derive(Debug)]
pub struct FakeRegistry {
    pub state: Mutex<FakeState>,
    page_size: usize,
    tag_delay: Duration,
}

fn page<T: Clone>(items: &[T], next: Option<&str>, size: usize) -> Page<T> {
    let start = next
        .and_then(|link| link.strip_prefix("page:"))
        .and_then(|offset| offset.parse().ok())
        .unwrap_or(0);
    let end = (start + size).min(items.len());
    Page {
        items: items[start.min(end)..end].to_vec(),
        next_link: (end < items.len()).then(|| format!("page:{end}")),
    }
}

pub fn operation(name: &str, template: &str, method: &str) -> RemoteOperation {
    RemoteOperation {
        id: format!("/service/svc/apis/orders/operations/{name}"),
        name: name.to_string(),
        url_template: template.to_string(),
        method: method.to_string(),
        tags: Vec::new(),
        description: None,
        display_name: name.to_string(),
        request: None,
        responses: Vec::new(),
    }
}

impl FakeRegistry {
    /// Registry with one API `orders` at revision 1
    pub fn new() -> Self {
        Self::with_page_size(100)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        let state = FakeState {
            apis: vec![ApiContract {
                id: "/service/svc/apis/orders".to_string(),
                name: "orders".to_string(),
                display_name: "Orders".to_string(),
                path: "orders".to_string(),
                api_version: None,
                api_revision: "1".to_string(),
            }],
            revisions: vec![ApiRevision {
                api_id: "/apis/orders".to_string(),
                api_revision: "1".to_string(),
            }],
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            page_size: page_size.max(1),
            tag_delay: Duration::from_millis(10),
        }
    }

    pub fn add_tag(&self, name: &str, display_name: &str) {
        self.state.lock().unwrap().tags.push(Tag {
            name: name.to_string(),
            display_name: display_name.to_string(),
        });
    }

    /// Add an operation, tagged with existing tags by display name
    pub fn add_operation(&self, operation: RemoteOperation, tags: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.operation_tags.insert(
            operation.name.clone(),
            tags.iter().map(|t| (*t).to_string()).collect(),
        );
        state.operations.push(operation);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    /// Make every call to the client method `name` fail
    pub fn fail_call(&self, name: &'static str) {
        self.state.lock().unwrap().failing_calls.insert(name);
    }

    fn check(&self, name: &'static str) -> Result<()> {
        if self.state.lock().unwrap().failing_calls.contains(name) {
            bail!("injected failure for {name}");
        }
        Ok(())
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn tag_display_name(&self, tag_id: &str) -> String {
        let state = self.state.lock().unwrap();
        state
            .tags
            .iter()
            .find(|t| t.name == tag_id)
            .map_or_else(|| tag_id.to_string(), |t| t.display_name.clone())
    }
}

#[async_trait]
impl RemoteRegistryClient for FakeRegistry {
    async fn list_apis(&self, next: Option<&str>) -> Result<Page<ApiContract>> {
        self.check("list_apis")?;
        Ok(page(&self.state.lock().unwrap().apis, next, self.page_size))
    }

    async fn list_operations(&self, _api: &str, next: Option<&str>) -> Result<Page<RemoteOperation>> {
        self.check("list_operations")?;
        Ok(page(&self.state.lock().unwrap().operations, next, self.page_size))
    }

    async fn list_operation_tags(&self, _api: &str, next: Option<&str>) -> Result<Page<OperationTag>> {
        self.check("list_operation_tags")?;
        let state = self.state.lock().unwrap();
        let mut rows = Vec::new();
        for operation in &state.operations {
            for display_name in state.operation_tags.get(&operation.name).into_iter().flatten() {
                if let Some(tag) = state.tags.iter().find(|t| &t.display_name == display_name) {
                    rows.push(OperationTag {
                        operation_name: operation.name.clone(),
                        tag: tag.clone(),
                    });
                }
            }
        }
        Ok(page(&rows, next, self.page_size))
    }

    async fn list_tags(&self, next: Option<&str>) -> Result<Page<Tag>> {
        self.check("list_tags")?;
        Ok(page(&self.state.lock().unwrap().tags, next, self.page_size))
    }

    async fn list_revisions(&self, _api: &str, next: Option<&str>) -> Result<Page<ApiRevision>> {
        self.check("list_revisions")?;
        Ok(page(&self.state.lock().unwrap().revisions, next, self.page_size))
    }

    async fn create_or_update_operation(
        &self,
        api: &str,
        operation_id: &str,
        body: &OperationBody,
    ) -> Result<RemoteOperation> {
        self.record(Call::PutOperation(operation_id.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.failing_operations.contains(operation_id) {
            bail!("injected failure for operation {operation_id}");
        }

        let operation = RemoteOperation {
            id: format!("/service/svc/apis/{api}/operations/{operation_id}"),
            name: operation_id.to_string(),
            url_template: body.url_template.clone(),
            method: body.method.clone(),
            tags: Vec::new(),
            description: body.description.clone(),
            display_name: body.display_name.clone(),
            request: body.request.clone(),
            responses: body.responses.clone(),
        };
        state.operations.retain(|op| op.name != operation_id);
        state.operations.push(operation.clone());
        Ok(operation)
    }

    async fn delete_operation(&self, _api: &str, operation_id: &str) -> Result<()> {
        self.record(Call::DeleteOperation(operation_id.to_string()));
        let mut state = self.state.lock().unwrap();
        state.operations.retain(|op| op.name != operation_id);
        state.operation_tags.remove(operation_id);
        Ok(())
    }

    async fn create_or_update_tag(&self, tag_id: &str, display_name: &str) -> Result<Tag> {
        self.check("create_or_update_tag")?;
        self.record(Call::CreateTag(display_name.to_string()));
        tokio::time::sleep(self.tag_delay).await;
        let tag = Tag {
            name: tag_id.to_string(),
            display_name: display_name.to_string(),
        };
        self.state.lock().unwrap().tags.push(tag.clone());
        Ok(tag)
    }

    async fn assign_tag(&self, _api: &str, operation_id: &str, tag_id: &str) -> Result<()> {
        let display_name = self.tag_display_name(tag_id);
        self.record(Call::AssignTag {
            operation: operation_id.to_string(),
            tag: display_name.clone(),
        });
        self.state
            .lock()
            .unwrap()
            .operation_tags
            .entry(operation_id.to_string())
            .or_default()
            .push(display_name);
        Ok(())
    }

    async fn detach_tag(&self, _api: &str, operation_id: &str, tag_id: &str) -> Result<()> {
        let display_name = self.tag_display_name(tag_id);
        self.record(Call::DetachTag {
            operation: operation_id.to_string(),
            tag: display_name.clone(),
        });
        if let Some(tags) = self.state.lock().unwrap().operation_tags.get_mut(operation_id) {
            tags.retain(|t| *t != display_name);
        }
        Ok(())
    }

    async fn create_or_update_policy(&self, _api: &str, operation_id: &str, xml: &str) -> Result<()> {
        self.record(Call::SetPolicy(operation_id.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.failing_policies.contains(operation_id) {
            bail!("injected policy failure for {operation_id}");
        }
        state.policies.insert(operation_id.to_string(), xml.to_string());
        Ok(())
    }

    async fn create_revision(
        &self,
        revision_api_id: &str,
        source_api_id: &str,
        path: &str,
        _description: &str,
    ) -> Result<ApiContract> {
        self.check("create_revision")?;
        self.record(Call::CreateRevision(revision_api_id.to_string()));
        let (name, revision) = revision_api_id
            .split_once(";rev=")
            .unwrap_or((revision_api_id, "1"));
        let mut state = self.state.lock().unwrap();
        state.revisions.push(ApiRevision {
            api_id: format!("/apis/{name}"),
            api_revision: revision.to_string(),
        });
        Ok(ApiContract {
            id: format!("{};rev={revision}", source_api_id.split(";rev=").next().unwrap_or(source_api_id)),
            name: revision_api_id.to_string(),
            display_name: name.to_string(),
            path: path.to_string(),
            api_version: None,
            api_revision: revision.to_string(),
        })
    }

    async fn create_release(
        &self,
        _api: &str,
        release_id: &str,
        _full_api_id: &str,
        _notes: &str,
    ) -> Result<()> {
        self.check("create_release")?;
        self.record(Call::CreateRelease(release_id.to_string()));
        Ok(())
    }
}

/// Hands out the same registry and counts authentications
#[derive(Debug)]
pub struct FakeAuthenticator {
    pub registry: Arc<FakeRegistry>,
    pub authentications: AtomicUsize,
}

impl FakeAuthenticator {
    pub fn new(registry: Arc<FakeRegistry>) -> Self {
        Self {
            registry,
            authentications: AtomicUsize::new(0),
        }
    }

    pub fn authentications(&self) -> usize {
        self.authentications.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn authenticate(&self) -> Result<Arc<dyn RemoteRegistryClient>> {
        self.authentications.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.registry) as Arc<dyn RemoteRegistryClient>)
    }
}
