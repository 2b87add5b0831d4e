//! Command-line arguments and the settings file they override.

use anyhow::{Context, Result, bail};
use clap::Parser;
use confpub_client::ClientConfig;
use confpub_sync::{
    FailurePolicy, OrphanRemoval, ParentPage, PublishConfig, PublishingStrategy,
};
use confpub_types::ContentId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Default)]
#[command(name = "confpub")]
#[command(about = "Publish a page tree to a remote content space")]
pub struct Args {
    /// JSON settings file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Content model file describing the page tree
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Root URL of the content service
    #[arg(long)]
    pub url: Option<String>,

    /// User name; omit to send the password as a bearer token
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password or personal access token
    #[arg(long, env = "CONFPUB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Key of the target space
    #[arg(short, long)]
    pub space_key: Option<String>,

    /// Title of the page to publish under
    #[arg(long, conflicts_with = "parent_id")]
    pub parent_title: Option<String>,

    /// Id of the page to publish under
    #[arg(long)]
    pub parent_id: Option<String>,

    /// Minimum seconds between two requests
    #[arg(long)]
    pub min_seconds_between_requests: Option<f64>,

    /// Message stored with every new page version
    #[arg(long)]
    pub version_message: Option<String>,

    /// Notify watchers about updates
    #[arg(long)]
    pub notify_watchers: bool,

    /// Leave page labels untouched
    #[arg(long)]
    pub skip_labels: bool,

    /// Keep remote pages and attachments that no longer exist locally
    #[arg(long)]
    pub keep_orphans: bool,

    /// Publish the single top-level page onto the parent page itself
    #[arg(long)]
    pub replace_ancestor: bool,

    /// Record failed subtrees and continue with their siblings
    #[arg(long)]
    pub continue_on_error: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Everything a run needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Content model file. Relative paths in a settings file are resolved
    /// against the file's directory.
    pub model: Option<PathBuf>,
    pub client: ClientConfig,
    pub publish: PublishConfig,
}

impl Settings {
    /// Reads a JSON settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: Settings = serde_json::from_str(&json)
            .with_context(|| format!("invalid settings file {}", path.display()))?;
        if let (Some(model), Some(dir)) = (settings.model.as_mut(), path.parent()) {
            if model.is_relative() {
                *model = dir.join(&*model);
            }
        }
        Ok(settings)
    }

    /// Loads the settings file named by `args`, if any, and applies the flags
    /// on top.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut settings = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply(args);
        settings.check()?;
        Ok(settings)
    }

    fn apply(&mut self, args: &Args) {
        if let Some(model) = &args.model {
            self.model = Some(model.clone());
        }
        if let Some(url) = &args.url {
            self.client.root_url = url.clone();
        }
        if let Some(username) = &args.username {
            self.client.username = Some(username.clone());
        }
        if let Some(password) = &args.password {
            self.client.password_or_token = Some(password.clone());
        }
        if let Some(seconds) = args.min_seconds_between_requests {
            self.client.min_seconds_between_requests = Some(seconds);
        }

        let publish = &mut self.publish;
        if let Some(space_key) = &args.space_key {
            publish.space_key = space_key.clone();
        }
        if let Some(title) = &args.parent_title {
            publish.parent = Some(ParentPage::Title(title.clone()));
        }
        if let Some(id) = &args.parent_id {
            publish.parent = Some(ParentPage::Id(ContentId::new(id.clone())));
        }
        if let Some(message) = &args.version_message {
            publish.version_message = message.clone();
        }
        if args.notify_watchers {
            publish.notify_watchers = true;
        }
        if args.skip_labels {
            publish.sync_labels = false;
        }
        if args.keep_orphans {
            publish.orphan_removal = OrphanRemoval::Keep;
        }
        if args.replace_ancestor {
            publish.strategy = PublishingStrategy::ReplaceAncestor;
        }
        if args.continue_on_error {
            publish.failure_policy = FailurePolicy::ContinueWithSiblings;
        }
    }

    fn check(&self) -> Result<()> {
        if self.model.is_none() {
            bail!("no content model given (use --model or the settings file)");
        }
        if self.client.root_url.trim().is_empty() {
            bail!("no root URL given (use --url or the settings file)");
        }
        self.publish
            .validate()
            .context("incomplete publish settings")?;
        Ok(())
    }
}
