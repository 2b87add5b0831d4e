//! Publish configuration.

use crate::error::{PublishError, PublishResult};
use confpub_types::ContentId;
use serde::{Deserialize, Serialize};

/// The page every published tree hangs under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentPage {
    /// Known content id.
    Id(ContentId),
    /// Title looked up in the target space.
    Title(String),
}

/// Where top-level pages go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishingStrategy {
    /// Top-level pages become children of the ancestor. Other children of
    /// the ancestor are left alone.
    #[default]
    AppendToAncestor,
    /// The single top-level page is written onto the ancestor itself.
    ReplaceAncestor,
}

/// What happens to remote pages and attachments with no local counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanRemoval {
    #[default]
    Remove,
    Keep,
}

/// How a failed subtree affects the rest of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failure.
    #[default]
    Abort,
    /// Record the failure and move on to the next sibling.
    ContinueWithSiblings,
}

/// Settings for one publish run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Key of the target space.
    pub space_key: String,
    pub parent: Option<ParentPage>,
    /// Message attached to every new page version.
    pub version_message: String,
    /// Notify page watchers about updates (otherwise updates are minor edits).
    pub notify_watchers: bool,
    /// Reconcile page labels.
    pub sync_labels: bool,
    pub orphan_removal: OrphanRemoval,
    pub strategy: PublishingStrategy,
    pub failure_policy: FailurePolicy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            space_key: String::new(),
            parent: None,
            version_message: "Published by confpub".to_string(),
            notify_watchers: false,
            sync_labels: true,
            orphan_removal: OrphanRemoval::default(),
            strategy: PublishingStrategy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl PublishConfig {
    /// Checks that the configuration can drive a run.
    pub fn validate(&self) -> PublishResult<()> {
        if self.space_key.trim().is_empty() {
            return Err(PublishError::Config("space key must be set".to_string()));
        }
        match &self.parent {
            None => Err(PublishError::Config(
                "a parent page id or title must be set".to_string(),
            )),
            Some(ParentPage::Id(id)) if id.is_empty() => Err(PublishError::Config(
                "parent page id must not be empty".to_string(),
            )),
            Some(ParentPage::Title(title)) if title.trim().is_empty() => Err(
                PublishError::Config("parent page title must not be empty".to_string()),
            ),
            Some(_) => Ok(()),
        }
    }

    pub fn removes_orphans(&self) -> bool {
        self.orphan_removal == OrphanRemoval::Remove
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PublishConfig {
        PublishConfig {
            space_key: "DOC".into(),
            parent: Some(ParentPage::Id(ContentId::from("1"))),
            ..Default::default()
        }
    }

    #[test]
    fn defaults() {
        let config = PublishConfig::default();
        assert!(config.sync_labels);
        assert!(!config.notify_watchers);
        assert!(config.removes_orphans());
        assert_eq!(config.strategy, PublishingStrategy::AppendToAncestor);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn validate_requires_space_and_parent() {
        assert!(valid().validate().is_ok());
        assert!(
            PublishConfig {
                space_key: " ".into(),
                ..valid()
            }
            .validate()
            .is_err()
        );
        assert!(
            PublishConfig {
                parent: None,
                ..valid()
            }
            .validate()
            .is_err()
        );
        assert!(
            PublishConfig {
                parent: Some(ParentPage::Title(String::new())),
                ..valid()
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn parent_deserializes_from_tagged_json() {
        let parent: ParentPage = serde_json::from_str(r#"{"title": "Home"}"#).unwrap();
        assert_eq!(parent, ParentPage::Title("Home".into()));
        let parent: ParentPage = serde_json::from_str(r#"{"id": "123"}"#).unwrap();
        assert_eq!(parent, ParentPage::Id(ContentId::from("123")));
    }
}
