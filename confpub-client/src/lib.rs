//! Remote content client for confpub.
//!
//! Talks to a paginated, versioned REST content API:
//! - [`HttpTransport`]: authentication, request pacing and failure
//!   classification for every outbound call
//! - [`RestContentClient`]: page, attachment, property and label operations
//!   with pagination, exposed through the [`ContentApi`] trait
//! - [`resolver`]: "not found / exactly one / ambiguous" for uniqueness
//!   constrained lookups
//!
//! The [`mock`] module provides an in-memory [`ContentApi`] and a manual
//! clock for tests.

mod api;
mod client;
mod config;
mod error;
mod gate;
mod transport;
mod wire;

pub mod mock;
pub mod resolver;

pub use api::{ContentApi, PageContent, PageCursor};
pub use client::{DEFAULT_MAX_LISTING_BATCHES, RestContentClient};
pub use config::{ClientConfig, Credentials, DEFAULT_PAGE_LIMIT};
pub use error::{ClientError, ClientResult, LookupKey};
pub use gate::{Clock, RateGate, TokioClock};
pub use transport::{ApiResponse, HttpTransport, HttpTransportBuilder};
pub use wire::ResultsEnvelope;
