//! Publishing engine for confpub.
//!
//! Walks a local [`PageNode`](confpub_types::PageNode) tree top-down and
//! makes the remote space match it:
//!
//! 1. **Resolve or create** each page by title
//! 2. **Diff** the body against the stored content hash and update on change
//! 3. **Reconcile** attachments and labels
//! 4. **Recurse** into children, then delete remote orphans
//!
//! The engine only talks to [`ContentApi`](confpub_client::ContentApi), so
//! it runs against the REST client or the in-memory mock alike.
//!
//! # Example
//!
//! ```
//! use confpub_client::mock::InMemoryContentApi;
//! use confpub_sync::{ParentPage, PublishConfig, Publisher};
//! use confpub_types::PageNode;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let api = Arc::new(InMemoryContentApi::new());
//! let home = api.seed_page("DOC", None, "Home", "");
//!
//! let config = PublishConfig {
//!     space_key: "DOC".to_string(),
//!     parent: Some(ParentPage::Id(home)),
//!     ..Default::default()
//! };
//! let publisher = Publisher::new(api, config).unwrap();
//! let report = publisher
//!     .publish(&[PageNode::new("Guide", "<p>Hello</p>")])
//!     .await
//!     .unwrap();
//! assert_eq!(report.pages_created, 1);
//! # }
//! ```

mod config;
mod error;
mod hash;
mod publisher;
mod report;

pub use config::{FailurePolicy, OrphanRemoval, ParentPage, PublishConfig, PublishingStrategy};
pub use error::{PublishError, PublishResult};
pub use hash::{CONTENT_HASH_KEY, attachment_hash_key, bytes_hash, content_hash};
pub use publisher::Publisher;
pub use report::{PublishFailure, PublishReport};
