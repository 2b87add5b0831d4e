//! Error types for publishing.

use confpub_client::ClientError;
use confpub_types::ContentId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for publish operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors that can occur while publishing a page tree.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Invalid publish settings.
    #[error("invalid publish configuration: {0}")]
    Config(String),

    /// The ancestor page could not be resolved.
    #[error("failed to resolve ancestor page: {source}")]
    Ancestor {
        #[source]
        source: ClientError,
    },

    /// A remote call failed while publishing a page.
    #[error("failed to publish '{path}': {source}")]
    Page {
        /// Titles from the top-level page down to the failing one.
        path: String,
        /// Remote id, when the page was already resolved.
        content_id: Option<ContentId>,
        #[source]
        source: ClientError,
    },

    /// An attachment file could not be read.
    #[error("failed to read attachment '{file_name}' of '{path}' from {}: {source}", location.display())]
    AttachmentRead {
        path: String,
        file_name: String,
        location: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The local tree cannot be published as given.
    #[error("invalid page tree: {0}")]
    InvalidTree(String),
}

impl PublishError {
    /// Title path of the page the error belongs to.
    pub fn path(&self) -> Option<&str> {
        match self {
            PublishError::Page { path, .. } | PublishError::AttachmentRead { path, .. } => {
                Some(path.as_str())
            }
            _ => None,
        }
    }

    pub fn content_id(&self) -> Option<&ContentId> {
        match self {
            PublishError::Page { content_id, .. } => content_id.as_ref(),
            _ => None,
        }
    }

    /// The underlying client error, if any.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            PublishError::Ancestor { source } | PublishError::Page { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns true if the run must stop whatever the failure policy says.
    ///
    /// Ambiguous remote titles cannot be reconciled safely anywhere in the
    /// space.
    pub fn is_fatal(&self) -> bool {
        self.client_error()
            .is_some_and(ClientError::is_multiple_results)
    }
}
