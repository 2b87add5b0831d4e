//! Snapshots of remote state.
//!
//! These are rebuilt from the remote service on every run and never cached
//! across runs.

use crate::ids::ContentId;
use serde::{Deserialize, Serialize};

/// A page as listed under its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePage {
    pub id: ContentId,
    pub title: String,
    /// Current optimistic-concurrency version; the next update must send
    /// `version + 1`.
    pub version: u32,
}

/// A page fetched with its rendered body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePageContent {
    pub id: ContentId,
    pub title: String,
    /// Rendered (view) body.
    pub body: String,
    pub version: u32,
    /// Direct parent, when the page is not at the top of its space.
    pub parent_id: Option<ContentId>,
}

impl RemotePageContent {
    /// The version an update of this page has to carry.
    #[must_use]
    pub fn next_version(&self) -> u32 {
        self.version + 1
    }
}

/// An attachment stored under a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAttachment {
    pub id: ContentId,
    /// Natural key within the owning page.
    pub file_name: String,
    /// Download path relative to the service root.
    pub download_link: String,
    pub version: u32,
}
