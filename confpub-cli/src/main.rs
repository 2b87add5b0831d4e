//! confpub: publish a page tree to a remote content space
//!
//! Usage:
//!   confpub --model model.json --url https://wiki.example.com \
//!           --username me --space-key DOC --parent-title Home
//!
//! The password or token is read from `--password` or `CONFPUB_PASSWORD`.

use anyhow::{Result, bail};
use clap::Parser;
use confpub_cli::{Args, Settings};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::resolve(&args)?;
    let report = confpub_cli::run(&settings).await?;
    println!("{report}");

    if !report.is_success() {
        for failure in &report.failures {
            warn!("{}", failure.message);
        }
        bail!("{} subtrees failed to publish", report.failures.len());
    }
    Ok(())
}
