//! The content API seam.
//!
//! The publisher only depends on [`ContentApi`], so it runs unchanged against
//! the REST client or the in-memory implementation in [`crate::mock`].

use crate::error::ClientResult;
use async_trait::async_trait;
use confpub_types::{ContentId, ContentType, RemoteAttachment, RemotePage, RemotePageContent};

/// Title, body and representation of a page being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageContent<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub content_type: ContentType,
}

impl<'a> PageContent<'a> {
    pub fn new(title: &'a str, body: &'a str, content_type: ContentType) -> Self {
        Self {
            title,
            body,
            content_type,
        }
    }
}

/// Offset and batch size of one listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub start: usize,
    pub limit: usize,
}

impl PageCursor {
    pub fn first(limit: usize) -> Self {
        Self { start: 0, limit }
    }

    /// The cursor for the batch after this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self {
            start: self.start + self.limit,
            limit: self.limit,
        }
    }

    /// Returns true if a batch reporting `reported` items may be followed by
    /// more.
    pub fn has_more(&self, reported: usize) -> bool {
        reported >= self.limit
    }
}

/// Operations on remote pages, attachments, properties and labels.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Creates a page under `ancestor_id` and returns its id.
    async fn add_page_under_ancestor(
        &self,
        space_key: &str,
        ancestor_id: &ContentId,
        content: PageContent<'_>,
        version_message: &str,
    ) -> ClientResult<ContentId>;

    /// Replaces a page's content, moving it under `ancestor_id` when given.
    ///
    /// `new_version` must be the current version plus one.
    async fn update_page(
        &self,
        content_id: &ContentId,
        ancestor_id: Option<&ContentId>,
        content: PageContent<'_>,
        new_version: u32,
        version_message: &str,
        notify_watchers: bool,
    ) -> ClientResult<()>;

    /// Deletes a page and its subtree. An already absent page is not an error.
    async fn delete_page(&self, content_id: &ContentId) -> ClientResult<()>;

    /// Looks up the single page with `title` in a space.
    async fn get_page_by_title(&self, space_key: &str, title: &str) -> ClientResult<ContentId>;

    async fn get_page_with_view_content(
        &self,
        content_id: &ContentId,
    ) -> ClientResult<RemotePageContent>;

    /// Lists direct children, in server order.
    async fn get_child_pages(&self, content_id: &ContentId) -> ClientResult<Vec<RemotePage>>;

    async fn get_attachments(&self, content_id: &ContentId)
    -> ClientResult<Vec<RemoteAttachment>>;

    /// Looks up the single attachment named `file_name` under a page.
    async fn get_attachment_by_file_name(
        &self,
        content_id: &ContentId,
        file_name: &str,
    ) -> ClientResult<RemoteAttachment>;

    async fn add_attachment(
        &self,
        content_id: &ContentId,
        file_name: &str,
        content: Vec<u8>,
    ) -> ClientResult<()>;

    /// Uploads a new version of an existing attachment.
    async fn update_attachment_content(
        &self,
        content_id: &ContentId,
        attachment: &RemoteAttachment,
        content: Vec<u8>,
        notify_watchers: bool,
    ) -> ClientResult<()>;

    /// Deletes an attachment. An already absent attachment is not an error.
    async fn delete_attachment(&self, attachment_id: &ContentId) -> ClientResult<()>;

    /// Reads a property value, `None` when the page has no such property.
    async fn get_property_by_key(
        &self,
        content_id: &ContentId,
        key: &str,
    ) -> ClientResult<Option<String>>;

    async fn set_property_by_key(
        &self,
        content_id: &ContentId,
        key: &str,
        value: &str,
    ) -> ClientResult<()>;

    /// Deletes a property. A forbidden answer is treated as already absent.
    async fn delete_property_by_key(&self, content_id: &ContentId, key: &str) -> ClientResult<()>;

    async fn get_labels(&self, content_id: &ContentId) -> ClientResult<Vec<String>>;

    async fn add_labels(&self, content_id: &ContentId, labels: &[String]) -> ClientResult<()>;

    async fn delete_label(&self, content_id: &ContentId, label: &str) -> ClientResult<()>;
}
