//! Summary of a publish run.

use crate::error::PublishError;
use confpub_types::ContentId;
use serde::Serialize;
use std::fmt;

/// A subtree that failed while the run continued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishFailure {
    pub path: String,
    pub content_id: Option<ContentId>,
    pub message: String,
}

/// What a publish run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub pages_created: usize,
    pub pages_updated: usize,
    pub pages_unchanged: usize,
    pub pages_deleted: usize,
    pub attachments_added: usize,
    pub attachments_updated: usize,
    pub attachments_unchanged: usize,
    pub attachments_deleted: usize,
    pub labels_added: usize,
    pub labels_removed: usize,
    pub failures: Vec<PublishFailure>,
}

impl PublishReport {
    /// Returns true if no subtree failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns true if the run changed nothing remotely.
    pub fn is_noop(&self) -> bool {
        self.pages_created == 0
            && self.pages_updated == 0
            && self.pages_deleted == 0
            && self.attachments_added == 0
            && self.attachments_updated == 0
            && self.attachments_deleted == 0
            && self.labels_added == 0
            && self.labels_removed == 0
    }

    pub(crate) fn record_failure(&mut self, error: &PublishError) {
        self.failures.push(PublishFailure {
            path: error.path().unwrap_or_default().to_string(),
            content_id: error.content_id().cloned(),
            message: error.to_string(),
        });
    }
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "pages: {} created, {} updated, {} unchanged, {} deleted",
            self.pages_created, self.pages_updated, self.pages_unchanged, self.pages_deleted
        )?;
        writeln!(
            f,
            "attachments: {} added, {} updated, {} unchanged, {} deleted",
            self.attachments_added,
            self.attachments_updated,
            self.attachments_unchanged,
            self.attachments_deleted
        )?;
        write!(
            f,
            "labels: {} added, {} removed",
            self.labels_added, self.labels_removed
        )?;
        for failure in &self.failures {
            write!(f, "\nfailed: {}", failure.message)?;
        }
        Ok(())
    }
}
