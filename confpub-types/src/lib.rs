//! Core type definitions for confpub.
//!
//! This crate defines the types shared by the remote client and the
//! publisher:
//! - Remote content identifiers
//! - The local page tree handed over by the rendering stage
//! - Snapshots of remote pages and attachments
//! - The JSON content model file that describes a page tree on disk
//!
//! Nothing here talks to the network.

mod ids;
mod model;
mod page;
mod remote;

pub use ids::ContentId;
pub use model::{ContentModel, ModelPage};
pub use page::{AttachmentSource, ContentType, PageNode};
pub use remote::{RemoteAttachment, RemotePage, RemotePageContent};

use std::path::PathBuf;

/// Result type alias using the crate's error type.
pub type TypesResult<T> = std::result::Result<T, TypesError>;

/// Errors that can occur while building a page tree.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid content model: {0}")]
    InvalidModel(String),
}
