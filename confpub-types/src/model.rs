//! JSON content model.
//!
//! A content model file describes a page tree whose bodies and attachments
//! live next to it on disk:
//!
//! ```json
//! {
//!   "pages": [
//!     {
//!       "title": "Guide",
//!       "type": "STORAGE",
//!       "contentFilePath": "guide.xhtml",
//!       "attachments": { "diagram.png": "img/diagram.png" },
//!       "labels": ["docs"],
//!       "children": []
//!     }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the model file.

use crate::page::{AttachmentSource, ContentType, PageNode};
use crate::{TypesError, TypesResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Root of a content model file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentModel {
    #[serde(default)]
    pub pages: Vec<ModelPage>,
}

/// One page entry in the content model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPage {
    pub title: String,
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    pub content_file_path: PathBuf,
    #[serde(default)]
    pub attachments: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub children: Vec<ModelPage>,
}

impl ContentModel {
    /// Parses a content model from JSON text.
    pub fn from_json(json: &str) -> TypesResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a model file and loads the page tree it describes.
    pub fn load(path: &Path) -> TypesResult<Vec<PageNode>> {
        let json = std::fs::read_to_string(path).map_err(|source| TypesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json(&json)?.into_pages(base_dir)
    }

    /// Converts the model into page nodes, reading every body file.
    ///
    /// Attachment files are only checked for existence here; their bytes
    /// are read when they are published.
    pub fn into_pages(self, base_dir: &Path) -> TypesResult<Vec<PageNode>> {
        let mut seen_titles = HashSet::new();
        self.pages
            .into_iter()
            .map(|page| page.into_node(base_dir, &mut seen_titles))
            .collect()
    }
}

impl ModelPage {
    fn into_node(self, base_dir: &Path, seen_titles: &mut HashSet<String>) -> TypesResult<PageNode> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(TypesError::InvalidModel(format!(
                "page '{}' has an empty title",
                self.content_file_path.display()
            )));
        }
        // Titles are unique per space remotely, so a duplicate can never publish cleanly.
        if !seen_titles.insert(title.clone()) {
            return Err(TypesError::InvalidModel(format!(
                "duplicate page title '{title}'"
            )));
        }

        let source_path = base_dir.join(&self.content_file_path);
        let body = std::fs::read_to_string(&source_path).map_err(|source| TypesError::Io {
            path: source_path.clone(),
            source,
        })?;

        let mut attachments = BTreeMap::new();
        for (file_name, relative) in self.attachments {
            let path = base_dir.join(relative);
            if !path.is_file() {
                return Err(TypesError::InvalidModel(format!(
                    "attachment '{file_name}' of page '{title}' not found at '{}'",
                    path.display()
                )));
            }
            attachments.insert(file_name, AttachmentSource::File(path));
        }

        let children = self
            .children
            .into_iter()
            .map(|child| child.into_node(base_dir, seen_titles))
            .collect::<TypesResult<Vec<_>>>()?;

        Ok(PageNode {
            source_path,
            title,
            body,
            content_type: self.content_type,
            attachments,
            labels: self.labels,
            children,
        })
    }
}
