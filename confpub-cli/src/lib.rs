//! Runner that publishes a content model file.
//!
//! Used by the `confpub` binary; exposed as a library so the whole run can
//! be exercised from tests.

pub mod settings;

pub use settings::{Args, Settings};

use anyhow::{Context, Result};
use confpub_client::{RateGate, RestContentClient};
use confpub_sync::{PublishReport, Publisher};
use confpub_types::ContentModel;
use std::sync::Arc;
use tracing::info;

/// Loads the content model and publishes it with the given settings.
pub async fn run(settings: &Settings) -> Result<PublishReport> {
    let model_path = settings
        .model
        .as_deref()
        .context("no content model given")?;
    let pages = ContentModel::load(model_path)
        .with_context(|| format!("failed to load content model {}", model_path.display()))?;
    info!(
        "Loaded {} top-level pages from {}",
        pages.len(),
        model_path.display()
    );

    let gate = Arc::new(RateGate::from_seconds(
        settings.client.min_seconds_between_requests,
    )?);
    let client = RestContentClient::from_config(&settings.client, gate)
        .context("failed to create content client")?;
    let publisher = Publisher::new(Arc::new(client), settings.publish.clone())?;

    let report = publisher
        .publish(&pages)
        .await
        .context("publish failed")?;
    Ok(report)
}
