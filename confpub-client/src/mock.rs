//! Test doubles: a manual clock and an in-memory content service.

use crate::api::{ContentApi, PageContent};
use crate::error::{ClientError, ClientResult, LookupKey};
use crate::gate::Clock;
use async_trait::async_trait;
use confpub_types::{ContentId, ContentType, RemoteAttachment, RemotePage, RemotePageContent};
use reqwest::StatusCode;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A clock that only moves when told to, or when something sleeps on it.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ClockState>,
}

#[derive(Debug)]
struct ClockState {
    now: Instant,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClockState {
                now: Instant::now(),
                sleeps: Vec::new(),
            }),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, duration: Duration) {
        self.lock().now += duration;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.lock();
            state.sleeps.push(duration);
            state.now += duration;
        }
        tokio::task::yield_now().await;
    }
}

/// One recorded call against [`InMemoryContentApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetPageByTitle { title: String },
    AddPage { title: String, ancestor_id: ContentId },
    UpdatePage { id: ContentId, title: String, version: u32 },
    DeletePage { id: ContentId },
    GetPageWithViewContent { id: ContentId },
    GetChildPages { id: ContentId },
    GetAttachments { id: ContentId },
    GetAttachmentByFileName { id: ContentId, file_name: String },
    AddAttachment { id: ContentId, file_name: String },
    UpdateAttachment { id: ContentId, file_name: String },
    DeleteAttachment { id: ContentId },
    GetProperty { id: ContentId, key: String },
    SetProperty { id: ContentId, key: String, value: String },
    DeleteProperty { id: ContentId, key: String },
    GetLabels { id: ContentId },
    AddLabels { id: ContentId, labels: Vec<String> },
    DeleteLabel { id: ContentId, label: String },
}

impl Call {
    /// Returns true for calls that change remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::AddPage { .. }
                | Call::UpdatePage { .. }
                | Call::DeletePage { .. }
                | Call::AddAttachment { .. }
                | Call::UpdateAttachment { .. }
                | Call::DeleteAttachment { .. }
                | Call::SetProperty { .. }
                | Call::DeleteProperty { .. }
                | Call::AddLabels { .. }
                | Call::DeleteLabel { .. }
        )
    }
}

/// A page held by [`InMemoryContentApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPage {
    pub id: ContentId,
    pub space_key: String,
    pub title: String,
    pub body: String,
    pub content_type: ContentType,
    pub version: u32,
    pub parent_id: Option<ContentId>,
    pub properties: BTreeMap<String, String>,
    pub labels: Vec<String>,
}

/// An attachment held by [`InMemoryContentApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockAttachment {
    pub id: ContentId,
    pub page_id: ContentId,
    pub file_name: String,
    pub content: Vec<u8>,
    pub version: u32,
}

impl MockAttachment {
    fn to_remote(&self) -> RemoteAttachment {
        RemoteAttachment {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            download_link: format!("/download/attachments/{}/{}", self.page_id, self.file_name),
            version: self.version,
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    pages: Vec<MockPage>,
    attachments: Vec<MockAttachment>,
    calls: Vec<Call>,
    failing_titles: HashMap<String, StatusCode>,
}

impl Store {
    fn allocate_id(&mut self) -> ContentId {
        self.next_id += 1;
        ContentId::new(format!("{}", 1000 + self.next_id))
    }

    fn page(&self, id: &ContentId) -> Option<&MockPage> {
        self.pages.iter().find(|p| &p.id == id)
    }

    fn page_mut(&mut self, id: &ContentId) -> ClientResult<&mut MockPage> {
        self.pages
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| rejected(format!("content {id}"), StatusCode::NOT_FOUND))
    }

    fn require_page(&self, id: &ContentId) -> ClientResult<&MockPage> {
        self.page(id)
            .ok_or_else(|| rejected(format!("content {id}"), StatusCode::NOT_FOUND))
    }

    /// Fails mutations aimed at a page whose title was marked as failing.
    fn check_failure(&self, title: &str, request: &str) -> ClientResult<()> {
        match self.failing_titles.get(title) {
            Some(status) => Err(rejected(request.to_string(), *status)),
            None => Ok(()),
        }
    }

    fn check_page_failure(&self, id: &ContentId, request: &str) -> ClientResult<()> {
        match self.page(id) {
            Some(page) => self.check_failure(&page.title, request),
            None => Ok(()),
        }
    }

    fn subtree_ids(&self, root: &ContentId) -> Vec<ContentId> {
        let mut ids = vec![root.clone()];
        let mut index = 0;
        while index < ids.len() {
            let current = ids[index].clone();
            ids.extend(
                self.pages
                    .iter()
                    .filter(|p| p.parent_id.as_ref() == Some(&current))
                    .map(|p| p.id.clone()),
            );
            index += 1;
        }
        ids
    }
}

fn rejected(request: String, status: StatusCode) -> ClientError {
    ClientError::RequestFailed {
        request,
        status: Some(status),
        detail: format!(
            "response {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status")
        ),
        source: None,
    }
}

/// In-memory content service that behaves like the remote API.
///
/// Versions are enforced (an update must carry `version + 1`, otherwise the
/// call fails with 409), deleting a page deletes its subtree, and creating an
/// existing property fails with 409 just like the real service. Every call
/// is recorded for later inspection.
#[derive(Debug, Default)]
pub struct InMemoryContentApi {
    store: Mutex<Store>,
}

impl InMemoryContentApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Seeding ─────────────────────────────────────────────────

    /// Stores a page at version 1 without recording a call.
    pub fn seed_page(
        &self,
        space_key: &str,
        parent_id: Option<&ContentId>,
        title: &str,
        body: &str,
    ) -> ContentId {
        let mut store = self.lock();
        let id = store.allocate_id();
        store.pages.push(MockPage {
            id: id.clone(),
            space_key: space_key.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            content_type: ContentType::Storage,
            version: 1,
            parent_id: parent_id.cloned(),
            properties: BTreeMap::new(),
            labels: Vec::new(),
        });
        id
    }

    pub fn seed_attachment(&self, page_id: &ContentId, file_name: &str, content: &[u8]) -> ContentId {
        let mut store = self.lock();
        let id = store.allocate_id();
        store.attachments.push(MockAttachment {
            id: id.clone(),
            page_id: page_id.clone(),
            file_name: file_name.to_string(),
            content: content.to_vec(),
            version: 1,
        });
        id
    }

    pub fn seed_property(&self, page_id: &ContentId, key: &str, value: &str) {
        if let Ok(page) = self.lock().page_mut(page_id) {
            page.properties.insert(key.to_string(), value.to_string());
        }
    }

    pub fn seed_labels(&self, page_id: &ContentId, labels: &[&str]) {
        if let Ok(page) = self.lock().page_mut(page_id) {
            page.labels.extend(labels.iter().map(|l| l.to_string()));
        }
    }

    /// Makes every mutation of the page titled `title` fail with `status`.
    pub fn fail_mutations_of(&self, title: &str, status: StatusCode) {
        self.lock().failing_titles.insert(title.to_string(), status);
    }

    // ── Inspection ──────────────────────────────────────────────

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Recorded calls that changed state.
    pub fn mutations(&self) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn page(&self, id: &ContentId) -> Option<MockPage> {
        self.lock().page(id).cloned()
    }

    /// The first stored page with `title`.
    pub fn page_by_title(&self, title: &str) -> Option<MockPage> {
        self.lock().pages.iter().find(|p| p.title == title).cloned()
    }

    pub fn page_count(&self) -> usize {
        self.lock().pages.len()
    }

    /// Titles of the direct children of a page, in creation order.
    pub fn child_titles(&self, id: &ContentId) -> Vec<String> {
        self.lock()
            .pages
            .iter()
            .filter(|p| p.parent_id.as_ref() == Some(id))
            .map(|p| p.title.clone())
            .collect()
    }

    pub fn attachments_of(&self, page_id: &ContentId) -> Vec<MockAttachment> {
        self.lock()
            .attachments
            .iter()
            .filter(|a| &a.page_id == page_id)
            .cloned()
            .collect()
    }

    fn record(&self, call: Call) -> MutexGuard<'_, Store> {
        let mut store = self.lock();
        store.calls.push(call);
        store
    }
}

#[async_trait]
impl ContentApi for InMemoryContentApi {
    async fn add_page_under_ancestor(
        &self,
        space_key: &str,
        ancestor_id: &ContentId,
        content: PageContent<'_>,
        _version_message: &str,
    ) -> ClientResult<ContentId> {
        let mut store = self.record(Call::AddPage {
            title: content.title.to_string(),
            ancestor_id: ancestor_id.clone(),
        });
        store.check_failure(content.title, "POST /rest/api/content")?;
        store.require_page(ancestor_id)?;
        if store
            .pages
            .iter()
            .any(|p| p.space_key == space_key && p.title == content.title)
        {
            return Err(rejected(
                "POST /rest/api/content".to_string(),
                StatusCode::BAD_REQUEST,
            ));
        }

        let id = store.allocate_id();
        store.pages.push(MockPage {
            id: id.clone(),
            space_key: space_key.to_string(),
            title: content.title.to_string(),
            body: content.body.to_string(),
            content_type: content.content_type,
            version: 1,
            parent_id: Some(ancestor_id.clone()),
            properties: BTreeMap::new(),
            labels: Vec::new(),
        });
        Ok(id)
    }

    async fn update_page(
        &self,
        content_id: &ContentId,
        ancestor_id: Option<&ContentId>,
        content: PageContent<'_>,
        new_version: u32,
        _version_message: &str,
        _notify_watchers: bool,
    ) -> ClientResult<()> {
        let mut store = self.record(Call::UpdatePage {
            id: content_id.clone(),
            title: content.title.to_string(),
            version: new_version,
        });
        let request = format!("PUT /rest/api/content/{content_id}");
        store.check_page_failure(content_id, &request)?;
        store.check_failure(content.title, &request)?;

        let page = store.page_mut(content_id)?;
        if new_version != page.version + 1 {
            return Err(rejected(request, StatusCode::CONFLICT));
        }
        page.version = new_version;
        page.title = content.title.to_string();
        page.body = content.body.to_string();
        page.content_type = content.content_type;
        if let Some(ancestor_id) = ancestor_id {
            page.parent_id = Some(ancestor_id.clone());
        }
        Ok(())
    }

    async fn delete_page(&self, content_id: &ContentId) -> ClientResult<()> {
        let mut store = self.record(Call::DeletePage {
            id: content_id.clone(),
        });
        store.check_page_failure(content_id, &format!("DELETE /rest/api/content/{content_id}"))?;
        if store.page(content_id).is_none() {
            return Ok(());
        }
        let doomed = store.subtree_ids(content_id);
        store.pages.retain(|p| !doomed.contains(&p.id));
        store.attachments.retain(|a| !doomed.contains(&a.page_id));
        Ok(())
    }

    async fn get_page_by_title(&self, space_key: &str, title: &str) -> ClientResult<ContentId> {
        let store = self.record(Call::GetPageByTitle {
            title: title.to_string(),
        });
        let matches: Vec<&MockPage> = store
            .pages
            .iter()
            .filter(|p| p.space_key == space_key && p.title == title)
            .collect();
        let key = LookupKey::PageTitle {
            space_key: space_key.to_string(),
            title: title.to_string(),
        };
        match matches.as_slice() {
            [] => Err(ClientError::NotFound { key }),
            [page] => Ok(page.id.clone()),
            many => Err(ClientError::MultipleResults {
                key,
                count: many.len(),
            }),
        }
    }

    async fn get_page_with_view_content(
        &self,
        content_id: &ContentId,
    ) -> ClientResult<RemotePageContent> {
        let store = self.record(Call::GetPageWithViewContent {
            id: content_id.clone(),
        });
        let page = store.require_page(content_id)?;
        Ok(RemotePageContent {
            id: page.id.clone(),
            title: page.title.clone(),
            body: page.body.clone(),
            version: page.version,
            parent_id: page.parent_id.clone(),
        })
    }

    async fn get_child_pages(&self, content_id: &ContentId) -> ClientResult<Vec<RemotePage>> {
        let store = self.record(Call::GetChildPages {
            id: content_id.clone(),
        });
        store.require_page(content_id)?;
        Ok(store
            .pages
            .iter()
            .filter(|p| p.parent_id.as_ref() == Some(content_id))
            .map(|p| RemotePage {
                id: p.id.clone(),
                title: p.title.clone(),
                version: p.version,
            })
            .collect())
    }

    async fn get_attachments(
        &self,
        content_id: &ContentId,
    ) -> ClientResult<Vec<RemoteAttachment>> {
        let store = self.record(Call::GetAttachments {
            id: content_id.clone(),
        });
        store.require_page(content_id)?;
        Ok(store
            .attachments
            .iter()
            .filter(|a| &a.page_id == content_id)
            .map(MockAttachment::to_remote)
            .collect())
    }

    async fn get_attachment_by_file_name(
        &self,
        content_id: &ContentId,
        file_name: &str,
    ) -> ClientResult<RemoteAttachment> {
        let store = self.record(Call::GetAttachmentByFileName {
            id: content_id.clone(),
            file_name: file_name.to_string(),
        });
        let matches: Vec<&MockAttachment> = store
            .attachments
            .iter()
            .filter(|a| &a.page_id == content_id && a.file_name == file_name)
            .collect();
        let key = LookupKey::AttachmentFileName {
            content_id: content_id.clone(),
            file_name: file_name.to_string(),
        };
        match matches.as_slice() {
            [] => Err(ClientError::NotFound { key }),
            [attachment] => Ok(attachment.to_remote()),
            many => Err(ClientError::MultipleResults {
                key,
                count: many.len(),
            }),
        }
    }

    async fn add_attachment(
        &self,
        content_id: &ContentId,
        file_name: &str,
        content: Vec<u8>,
    ) -> ClientResult<()> {
        let mut store = self.record(Call::AddAttachment {
            id: content_id.clone(),
            file_name: file_name.to_string(),
        });
        let request = format!("POST /rest/api/content/{content_id}/child/attachment");
        store.check_page_failure(content_id, &request)?;
        store.require_page(content_id)?;
        if store
            .attachments
            .iter()
            .any(|a| &a.page_id == content_id && a.file_name == file_name)
        {
            return Err(rejected(request, StatusCode::BAD_REQUEST));
        }
        let id = store.allocate_id();
        store.attachments.push(MockAttachment {
            id,
            page_id: content_id.clone(),
            file_name: file_name.to_string(),
            content,
            version: 1,
        });
        Ok(())
    }

    async fn update_attachment_content(
        &self,
        content_id: &ContentId,
        attachment: &RemoteAttachment,
        content: Vec<u8>,
        _notify_watchers: bool,
    ) -> ClientResult<()> {
        let mut store = self.record(Call::UpdateAttachment {
            id: content_id.clone(),
            file_name: attachment.file_name.clone(),
        });
        let request = format!(
            "POST /rest/api/content/{content_id}/child/attachment/{}/data",
            attachment.id
        );
        store.check_page_failure(content_id, &request)?;
        let stored = store
            .attachments
            .iter_mut()
            .find(|a| a.id == attachment.id && &a.page_id == content_id)
            .ok_or_else(|| rejected(request, StatusCode::NOT_FOUND))?;
        stored.content = content;
        stored.version += 1;
        Ok(())
    }

    async fn delete_attachment(&self, attachment_id: &ContentId) -> ClientResult<()> {
        let mut store = self.record(Call::DeleteAttachment {
            id: attachment_id.clone(),
        });
        store.attachments.retain(|a| &a.id != attachment_id);
        Ok(())
    }

    async fn get_property_by_key(
        &self,
        content_id: &ContentId,
        key: &str,
    ) -> ClientResult<Option<String>> {
        let store = self.record(Call::GetProperty {
            id: content_id.clone(),
            key: key.to_string(),
        });
        Ok(store
            .page(content_id)
            .and_then(|p| p.properties.get(key).cloned()))
    }

    async fn set_property_by_key(
        &self,
        content_id: &ContentId,
        key: &str,
        value: &str,
    ) -> ClientResult<()> {
        let mut store = self.record(Call::SetProperty {
            id: content_id.clone(),
            key: key.to_string(),
            value: value.to_string(),
        });
        let request = format!("POST /rest/api/content/{content_id}/property");
        store.check_page_failure(content_id, &request)?;
        let page = store.page_mut(content_id)?;
        if page.properties.contains_key(key) {
            return Err(rejected(request, StatusCode::CONFLICT));
        }
        page.properties.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_property_by_key(&self, content_id: &ContentId, key: &str) -> ClientResult<()> {
        let mut store = self.record(Call::DeleteProperty {
            id: content_id.clone(),
            key: key.to_string(),
        });
        if let Ok(page) = store.page_mut(content_id) {
            page.properties.remove(key);
        }
        Ok(())
    }

    async fn get_labels(&self, content_id: &ContentId) -> ClientResult<Vec<String>> {
        let store = self.record(Call::GetLabels {
            id: content_id.clone(),
        });
        Ok(store.require_page(content_id)?.labels.clone())
    }

    async fn add_labels(&self, content_id: &ContentId, labels: &[String]) -> ClientResult<()> {
        let mut store = self.record(Call::AddLabels {
            id: content_id.clone(),
            labels: labels.to_vec(),
        });
        let request = format!("POST /rest/api/content/{content_id}/label");
        store.check_page_failure(content_id, &request)?;
        let page = store.page_mut(content_id)?;
        for label in labels {
            if !page.labels.contains(label) {
                page.labels.push(label.clone());
            }
        }
        Ok(())
    }

    async fn delete_label(&self, content_id: &ContentId, label: &str) -> ClientResult<()> {
        let mut store = self.record(Call::DeleteLabel {
            id: content_id.clone(),
            label: label.to_string(),
        });
        let page = store.page_mut(content_id)?;
        page.labels.retain(|l| l != label);
        Ok(())
    }
}
