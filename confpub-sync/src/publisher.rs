//! Publishes a local page tree to the remote space.
//!
//! Pages are processed depth-first, parents before children. For each page
//! the publisher resolves or creates the remote page, updates its body when
//! the stored content hash differs, reconciles attachments and labels, and
//! then recurses into the children. Remote children and attachments without
//! a local counterpart are deleted after the subtree is done.

use crate::config::{FailurePolicy, ParentPage, PublishConfig, PublishingStrategy};
use crate::error::{PublishError, PublishResult};
use crate::hash::{CONTENT_HASH_KEY, attachment_hash_key, bytes_hash, content_hash};
use crate::report::PublishReport;
use confpub_client::{ClientError, ContentApi, PageContent};
use confpub_types::{AttachmentSource, ContentId, PageNode, RemoteAttachment};
use futures::future::BoxFuture;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

const PATH_SEPARATOR: &str = " / ";

/// State of one run.
#[derive(Debug, Default)]
struct Run {
    report: PublishReport,
    /// Every title in the local tree. A remote page with one of these titles
    /// is never removed as an orphan.
    local_titles: HashSet<String>,
}

/// Drives a publish run against a [`ContentApi`].
pub struct Publisher {
    api: Arc<dyn ContentApi>,
    config: PublishConfig,
}

impl Publisher {
    /// Creates a publisher. Fails if the configuration is incomplete.
    pub fn new(api: Arc<dyn ContentApi>, config: PublishConfig) -> PublishResult<Self> {
        config.validate()?;
        Ok(Self { api, config })
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Publishes `pages` under the configured ancestor.
    ///
    /// With [`FailurePolicy::Abort`] the first failure is returned. With
    /// [`FailurePolicy::ContinueWithSiblings`] failed subtrees are recorded in
    /// the report, except for ambiguous titles which always stop the run.
    pub async fn publish(&self, pages: &[PageNode]) -> PublishResult<PublishReport> {
        let local_titles = collect_titles(pages)?;
        let ancestor_id = self.resolve_ancestor().await?;
        info!(
            "Publishing {} pages to space {} under {}",
            local_titles.len(),
            self.config.space_key,
            ancestor_id
        );

        let mut run = Run {
            report: PublishReport::default(),
            local_titles,
        };

        match self.config.strategy {
            PublishingStrategy::AppendToAncestor => {
                self.publish_children(&ancestor_id, pages, "", false, &mut run)
                    .await?;
            }
            PublishingStrategy::ReplaceAncestor => {
                let [root] = pages else {
                    return Err(PublishError::InvalidTree(format!(
                        "replacing the ancestor needs exactly one top-level page, got {}",
                        pages.len()
                    )));
                };
                self.publish_onto_ancestor(&ancestor_id, root, &mut run)
                    .await?;
            }
        }

        info!(
            "Publish finished: {} created, {} updated, {} unchanged, {} deleted, {} failed",
            run.report.pages_created,
            run.report.pages_updated,
            run.report.pages_unchanged,
            run.report.pages_deleted,
            run.report.failures.len()
        );
        Ok(run.report)
    }

    async fn resolve_ancestor(&self) -> PublishResult<ContentId> {
        match &self.config.parent {
            Some(ParentPage::Id(id)) => Ok(id.clone()),
            Some(ParentPage::Title(title)) => {
                let id = self
                    .api
                    .get_page_by_title(&self.config.space_key, title)
                    .await
                    .map_err(|source| PublishError::Ancestor { source })?;
                debug!("Resolved ancestor '{}' to {}", title, id);
                Ok(id)
            }
            None => Err(PublishError::Config(
                "a parent page id or title must be set".to_string(),
            )),
        }
    }

    /// Writes the single top-level page onto the ancestor itself.
    async fn publish_onto_ancestor(
        &self,
        ancestor_id: &ContentId,
        root: &PageNode,
        run: &mut Run,
    ) -> PublishResult<()> {
        let path = root.title.clone();
        self.update_if_changed(ancestor_id, root, None, &path, run)
            .await?;
        self.sync_attachments(ancestor_id, root, &path, run).await?;
        if self.config.sync_labels {
            self.sync_labels(ancestor_id, root, &path, run).await?;
        }
        self.publish_children(
            ancestor_id,
            &root.children,
            &path,
            self.config.removes_orphans(),
            run,
        )
        .await
    }

    /// Publishes one page and its subtree under `ancestor_id`.
    fn publish_page<'a>(
        &'a self,
        node: &'a PageNode,
        ancestor_id: &'a ContentId,
        parent_path: &'a str,
        run: &'a mut Run,
    ) -> BoxFuture<'a, PublishResult<ContentId>> {
        Box::pin(async move {
            let path = join_path(parent_path, &node.title);
            let content_id = self.upsert_page(node, ancestor_id, &path, run).await?;
            self.sync_attachments(&content_id, node, &path, run).await?;
            if self.config.sync_labels {
                self.sync_labels(&content_id, node, &path, run).await?;
            }
            self.publish_children(
                &content_id,
                &node.children,
                &path,
                self.config.removes_orphans(),
                run,
            )
            .await?;
            Ok(content_id)
        })
    }

    /// Publishes `children` under `parent_id`, then removes remote orphans
    /// when `remove_orphans` is set.
    async fn publish_children(
        &self,
        parent_id: &ContentId,
        children: &[PageNode],
        parent_path: &str,
        remove_orphans: bool,
        run: &mut Run,
    ) -> PublishResult<()> {
        let remote_children = if remove_orphans {
            self.api
                .get_child_pages(parent_id)
                .await
                .map_err(page_error(parent_path, Some(parent_id)))?
        } else {
            Vec::new()
        };

        for child in children {
            if let Err(err) = self.publish_page(child, parent_id, parent_path, run).await {
                match self.config.failure_policy {
                    FailurePolicy::ContinueWithSiblings if !err.is_fatal() => {
                        warn!("Skipping failed subtree: {}", err);
                        run.report.record_failure(&err);
                    }
                    _ => return Err(err),
                }
            }
        }

        // Local titles cover these children and pages moved in from elsewhere.
        for orphan in remote_children {
            if run.local_titles.contains(&orphan.title) {
                continue;
            }
            let orphan_path = join_path(parent_path, &orphan.title);
            self.api
                .delete_page(&orphan.id)
                .await
                .map_err(page_error(&orphan_path, Some(&orphan.id)))?;
            warn!("Deleted orphan page '{}' ({})", orphan_path, orphan.id);
            run.report.pages_deleted += 1;
        }
        Ok(())
    }

    /// Finds the remote page for `node` or creates it.
    async fn upsert_page(
        &self,
        node: &PageNode,
        ancestor_id: &ContentId,
        path: &str,
        run: &mut Run,
    ) -> PublishResult<ContentId> {
        match self
            .api
            .get_page_by_title(&self.config.space_key, &node.title)
            .await
        {
            Ok(content_id) if content_id == *ancestor_id => Err(PublishError::InvalidTree(
                format!("page '{path}' has the same title as its own ancestor {ancestor_id}"),
            )),
            Ok(content_id) => {
                self.update_if_changed(&content_id, node, Some(ancestor_id), path, run)
                    .await?;
                Ok(content_id)
            }
            Err(err) if err.is_not_found() => {
                let content_id = self
                    .api
                    .add_page_under_ancestor(
                        &self.config.space_key,
                        ancestor_id,
                        page_content(node),
                        &self.config.version_message,
                    )
                    .await
                    .map_err(page_error(path, None))?;
                self.api
                    .set_property_by_key(&content_id, CONTENT_HASH_KEY, &content_hash(&node.body))
                    .await
                    .map_err(page_error(path, Some(&content_id)))?;
                info!("Created page '{}' ({})", path, content_id);
                run.report.pages_created += 1;
                Ok(content_id)
            }
            Err(err) => Err(page_error(path, None)(err)),
        }
    }

    /// Updates the page body when its hash differs from the stored one, or
    /// moves the page when it sits under a different parent.
    async fn update_if_changed(
        &self,
        content_id: &ContentId,
        node: &PageNode,
        expected_parent: Option<&ContentId>,
        path: &str,
        run: &mut Run,
    ) -> PublishResult<()> {
        let on_error = || page_error(path, Some(content_id));

        let remote = self
            .api
            .get_page_with_view_content(content_id)
            .await
            .map_err(on_error())?;
        let stored_hash = self
            .api
            .get_property_by_key(content_id, CONTENT_HASH_KEY)
            .await
            .map_err(on_error())?;

        let hash = content_hash(&node.body);
        let moved = expected_parent.is_some_and(|parent| remote.parent_id.as_ref() != Some(parent));
        if stored_hash.as_deref() == Some(hash.as_str()) && !moved {
            debug!("Page '{}' unchanged", path);
            run.report.pages_unchanged += 1;
            return Ok(());
        }

        self.api
            .update_page(
                content_id,
                expected_parent,
                page_content(node),
                remote.next_version(),
                &self.config.version_message,
                self.config.notify_watchers,
            )
            .await
            .map_err(on_error())?;
        self.api
            .delete_property_by_key(content_id, CONTENT_HASH_KEY)
            .await
            .map_err(on_error())?;
        self.api
            .set_property_by_key(content_id, CONTENT_HASH_KEY, &hash)
            .await
            .map_err(on_error())?;

        if moved {
            info!("Updated and moved page '{}' ({})", path, content_id);
        } else {
            info!(
                "Updated page '{}' ({}) to version {}",
                path,
                content_id,
                remote.next_version()
            );
        }
        run.report.pages_updated += 1;
        Ok(())
    }

    async fn sync_attachments(
        &self,
        content_id: &ContentId,
        node: &PageNode,
        path: &str,
        run: &mut Run,
    ) -> PublishResult<()> {
        let on_error = || page_error(path, Some(content_id));

        let remote: BTreeMap<String, RemoteAttachment> = self
            .api
            .get_attachments(content_id)
            .await
            .map_err(on_error())?
            .into_iter()
            .map(|attachment| (attachment.file_name.clone(), attachment))
            .collect();

        for (file_name, source) in &node.attachments {
            let content = read_attachment(source, path, file_name).await?;
            let hash = bytes_hash(&content);
            let hash_key = attachment_hash_key(file_name);

            match remote.get(file_name) {
                Some(existing) => {
                    let stored = self
                        .api
                        .get_property_by_key(content_id, &hash_key)
                        .await
                        .map_err(on_error())?;
                    if stored.as_deref() == Some(hash.as_str()) {
                        debug!("Attachment '{}' of '{}' unchanged", file_name, path);
                        run.report.attachments_unchanged += 1;
                        continue;
                    }
                    self.api
                        .update_attachment_content(
                            content_id,
                            existing,
                            content,
                            self.config.notify_watchers,
                        )
                        .await
                        .map_err(on_error())?;
                    self.api
                        .delete_property_by_key(content_id, &hash_key)
                        .await
                        .map_err(on_error())?;
                    info!("Updated attachment '{}' of '{}'", file_name, path);
                    run.report.attachments_updated += 1;
                }
                None => {
                    self.api
                        .add_attachment(content_id, file_name, content)
                        .await
                        .map_err(on_error())?;
                    info!("Added attachment '{}' to '{}'", file_name, path);
                    run.report.attachments_added += 1;
                }
            }

            self.api
                .set_property_by_key(content_id, &hash_key, &hash)
                .await
                .map_err(on_error())?;
        }

        if !self.config.removes_orphans() {
            return Ok(());
        }
        for (file_name, orphan) in &remote {
            if node.attachments.contains_key(file_name) {
                continue;
            }
            self.api
                .delete_attachment(&orphan.id)
                .await
                .map_err(on_error())?;
            self.api
                .delete_property_by_key(content_id, &attachment_hash_key(file_name))
                .await
                .map_err(on_error())?;
            warn!("Deleted orphan attachment '{}' of '{}'", file_name, path);
            run.report.attachments_deleted += 1;
        }
        Ok(())
    }

    async fn sync_labels(
        &self,
        content_id: &ContentId,
        node: &PageNode,
        path: &str,
        run: &mut Run,
    ) -> PublishResult<()> {
        let on_error = || page_error(path, Some(content_id));

        let remote = self
            .api
            .get_labels(content_id)
            .await
            .map_err(on_error())?;

        let mut missing: Vec<String> = Vec::new();
        for label in &node.labels {
            if !remote.contains(label) && !missing.contains(label) {
                missing.push(label.clone());
            }
        }
        if !missing.is_empty() {
            self.api
                .add_labels(content_id, &missing)
                .await
                .map_err(on_error())?;
            debug!("Added labels {:?} to '{}'", missing, path);
            run.report.labels_added += missing.len();
        }

        for label in remote.iter().filter(|l| !node.labels.contains(*l)) {
            self.api
                .delete_label(content_id, label)
                .await
                .map_err(on_error())?;
            debug!("Removed label '{}' from '{}'", label, path);
            run.report.labels_removed += 1;
        }
        Ok(())
    }
}

fn page_content(node: &PageNode) -> PageContent<'_> {
    PageContent::new(&node.title, &node.body, node.content_type)
}

fn join_path(parent_path: &str, title: &str) -> String {
    if parent_path.is_empty() {
        title.to_string()
    } else {
        format!("{parent_path}{PATH_SEPARATOR}{title}")
    }
}

fn page_error(path: &str, content_id: Option<&ContentId>) -> impl FnOnce(ClientError) -> PublishError {
    let path = path.to_string();
    let content_id = content_id.cloned();
    move |source| PublishError::Page {
        path,
        content_id,
        source,
    }
}

async fn read_attachment(
    source: &AttachmentSource,
    path: &str,
    file_name: &str,
) -> PublishResult<Vec<u8>> {
    match source {
        AttachmentSource::Bytes(bytes) => Ok(bytes.clone()),
        AttachmentSource::File(location) => {
            tokio::fs::read(location)
                .await
                .map_err(|source| PublishError::AttachmentRead {
                    path: path.to_string(),
                    file_name: file_name.to_string(),
                    location: location.clone(),
                    source,
                })
        }
    }
}

/// Collects every title in the tree, rejecting blank or repeated ones.
fn collect_titles(pages: &[PageNode]) -> PublishResult<HashSet<String>> {
    let mut titles = HashSet::new();
    for page in pages {
        let mut result = Ok(());
        page.walk(&mut |node| {
            if result.is_err() {
                return;
            }
            if node.title.trim().is_empty() {
                result = Err(PublishError::InvalidTree(
                    "page titles must not be blank".to_string(),
                ));
            } else if !titles.insert(node.title.clone()) {
                result = Err(PublishError::InvalidTree(format!(
                    "duplicate page title '{}'",
                    node.title
                )));
            }
        });
        result?;
    }
    Ok(titles)
}
