//! The local page tree.
//!
//! A `PageNode` is produced once per run by the rendering stage and is
//! read-only from then on. Children keep their input order; attachments are
//! keyed by file name, which is also their identity on the remote side.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Representation of a rendered page body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentType {
    /// XHTML storage format.
    #[default]
    #[serde(alias = "storage")]
    Storage,
    /// Wiki markup.
    #[serde(alias = "wiki")]
    Wiki,
}

impl ContentType {
    /// The representation name the remote API expects for this body.
    #[must_use]
    pub const fn representation(self) -> &'static str {
        match self {
            ContentType::Storage => "storage",
            ContentType::Wiki => "wiki",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.representation())
    }
}

/// Where the bytes of an attachment come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// Content already held in memory.
    Bytes(Vec<u8>),
    /// A file read when the attachment is published.
    File(PathBuf),
}

/// A page in the local tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNode {
    /// The file the page was rendered from.
    pub source_path: PathBuf,
    /// Page title, unique within the target space.
    pub title: String,
    /// Rendered body in `content_type` representation.
    pub body: String,
    pub content_type: ContentType,
    /// Attachments keyed by file name.
    pub attachments: BTreeMap<String, AttachmentSource>,
    pub labels: Vec<String>,
    pub children: Vec<PageNode>,
}

impl PageNode {
    /// Creates a storage-format page with no attachments, labels or children.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source_path: PathBuf::new(),
            title: title.into(),
            body: body.into(),
            content_type: ContentType::Storage,
            attachments: BTreeMap::new(),
            labels: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    #[must_use]
    pub fn with_attachment(mut self, file_name: impl Into<String>, source: AttachmentSource) -> Self {
        self.attachments.insert(file_name.into(), source);
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: PageNode) -> Self {
        self.children.push(child);
        self
    }

    /// Visits this page and all of its descendants, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a PageNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Number of pages in this subtree, including this one.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }
}
