//! Error types for the remote client.

use confpub_types::ContentId;
use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Result type for remote client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// What a uniqueness-constrained lookup was searching for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    /// A page by title within a space.
    PageTitle { space_key: String, title: String },
    /// An attachment by file name under a page.
    AttachmentFileName { content_id: ContentId, file_name: String },
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::PageTitle { space_key, title } => {
                write!(f, "page '{title}' in space '{space_key}'")
            }
            LookupKey::AttachmentFileName {
                content_id,
                file_name,
            } => write!(f, "attachment '{file_name}' of content {content_id}"),
        }
    }
}

/// Errors that can occur talking to the remote content service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid construction arguments.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A uniqueness-constrained lookup returned no result.
    #[error("not found: {key}")]
    NotFound { key: LookupKey },

    /// A uniqueness-constrained lookup returned more than one result.
    #[error("multiple results ({count}) for {key}")]
    MultipleResults { key: LookupKey, count: usize },

    /// Non-success response or transport failure.
    #[error("request failed: {request}: {detail}")]
    RequestFailed {
        /// `METHOD URL` of the attempted request.
        request: String,
        /// Response status, absent for transport failures.
        status: Option<StatusCode>,
        detail: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A success response whose body could not be understood.
    #[error("invalid response to {request}: {detail}")]
    InvalidResponse { request: String, detail: String },

    /// A paginated listing never returned a short batch.
    #[error("listing {request} did not end after {batches} batches")]
    UnboundedListing { request: String, batches: usize },
}

impl ClientError {
    /// Returns true for a lookup that found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    /// Returns true for an ambiguous lookup.
    pub fn is_multiple_results(&self) -> bool {
        matches!(self, ClientError::MultipleResults { .. })
    }

    /// Returns true for failed requests, whether rejected or never answered.
    pub fn is_request_failed(&self) -> bool {
        matches!(self, ClientError::RequestFailed { .. })
    }

    /// The response status, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::RequestFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns true if the server rejected a stale version.
    pub fn is_version_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }
}
