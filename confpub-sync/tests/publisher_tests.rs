use confpub_client::ClientError;
use confpub_client::mock::{Call, InMemoryContentApi};
use confpub_sync::{
    CONTENT_HASH_KEY, FailurePolicy, OrphanRemoval, ParentPage, PublishConfig, PublishError,
    Publisher, PublishingStrategy, attachment_hash_key, bytes_hash, content_hash,
};
use confpub_types::{AttachmentSource, ContentId, PageNode};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use std::sync::Arc;

fn setup() -> (Arc<InMemoryContentApi>, ContentId) {
    let api = Arc::new(InMemoryContentApi::new());
    let home = api.seed_page("DOC", None, "Home", "<p>home</p>");
    (api, home)
}

fn config(home: &ContentId) -> PublishConfig {
    PublishConfig {
        space_key: "DOC".to_string(),
        parent: Some(ParentPage::Id(home.clone())),
        ..Default::default()
    }
}

fn publisher(api: &Arc<InMemoryContentApi>, config: PublishConfig) -> Publisher {
    Publisher::new(api.clone(), config).unwrap()
}

fn id_of(api: &InMemoryContentApi, title: &str) -> ContentId {
    api.page_by_title(title).unwrap().id
}

fn root_with_child() -> Vec<PageNode> {
    vec![PageNode::new("Root", "<p>root</p>").with_child(PageNode::new("Child", "<p>child</p>"))]
}

// ── Fresh publish ───────────────────────────────────────────────

#[tokio::test]
async fn fresh_tree_creates_parents_before_children() {
    let (api, home) = setup();
    let pages = root_with_child();

    let report = publisher(&api, config(&home)).publish(&pages).await.unwrap();

    let root = id_of(&api, "Root");
    let child = id_of(&api, "Child");
    assert_eq!(
        api.mutations(),
        vec![
            Call::AddPage {
                title: "Root".into(),
                ancestor_id: home.clone()
            },
            Call::SetProperty {
                id: root.clone(),
                key: CONTENT_HASH_KEY.into(),
                value: content_hash("<p>root</p>")
            },
            Call::AddPage {
                title: "Child".into(),
                ancestor_id: root.clone()
            },
            Call::SetProperty {
                id: child.clone(),
                key: CONTENT_HASH_KEY.into(),
                value: content_hash("<p>child</p>")
            },
        ]
    );
    assert_eq!(report.pages_created, 2);
    assert!(report.is_success());
    assert_eq!(api.child_titles(&home), vec!["Root".to_string()]);
    assert_eq!(api.child_titles(&root), vec!["Child".to_string()]);
}

#[tokio::test]
async fn rerun_with_unchanged_content_makes_no_mutations() {
    let (api, home) = setup();
    let pages = root_with_child();
    let publisher = publisher(&api, config(&home));
    publisher.publish(&pages).await.unwrap();
    api.clear_calls();

    let report = publisher.publish(&pages).await.unwrap();

    assert!(api.mutations().is_empty());
    assert!(report.is_noop());
    assert_eq!(report.pages_unchanged, 2);

    let root = id_of(&api, "Root");
    let child = id_of(&api, "Child");
    let calls = api.calls();
    assert!(calls.contains(&Call::GetChildPages { id: root }));
    assert!(calls.contains(&Call::GetChildPages { id: child }));
}

// ── Content updates ─────────────────────────────────────────────

#[tokio::test]
async fn changed_body_updates_with_next_version_and_replaces_hash() {
    let (api, home) = setup();
    let publisher = publisher(&api, config(&home));
    publisher
        .publish(&[PageNode::new("Root", "<p>v1</p>")])
        .await
        .unwrap();
    api.clear_calls();

    let report = publisher
        .publish(&[PageNode::new("Root", "<p>v2</p>")])
        .await
        .unwrap();

    let root = id_of(&api, "Root");
    assert_eq!(
        api.mutations(),
        vec![
            Call::UpdatePage {
                id: root.clone(),
                title: "Root".into(),
                version: 2
            },
            Call::DeleteProperty {
                id: root.clone(),
                key: CONTENT_HASH_KEY.into()
            },
            Call::SetProperty {
                id: root.clone(),
                key: CONTENT_HASH_KEY.into(),
                value: content_hash("<p>v2</p>")
            },
        ]
    );
    assert_eq!(report.pages_updated, 1);
    let page = api.page(&root).unwrap();
    assert_eq!(page.version, 2);
    assert_eq!(page.body, "<p>v2</p>");
}

#[tokio::test]
async fn missing_hash_property_forces_update() {
    let (api, home) = setup();
    let existing = api.seed_page("DOC", Some(&home), "Root", "<p>same</p>");

    let report = publisher(&api, config(&home))
        .publish(&[PageNode::new("Root", "<p>same</p>")])
        .await
        .unwrap();

    assert_eq!(report.pages_updated, 1);
    assert_eq!(api.page(&existing).unwrap().version, 2);
    assert_eq!(
        api.page(&existing).unwrap().properties.get(CONTENT_HASH_KEY),
        Some(&content_hash("<p>same</p>"))
    );
}

#[tokio::test]
async fn page_under_wrong_parent_is_moved() {
    let (api, home) = setup();
    let stray = api.seed_page("DOC", Some(&home), "Moved", "<p>m</p>");
    api.seed_property(&stray, CONTENT_HASH_KEY, &content_hash("<p>m</p>"));
    let pages = vec![PageNode::new("Root", "").with_child(PageNode::new("Moved", "<p>m</p>"))];

    let report = publisher(&api, config(&home)).publish(&pages).await.unwrap();

    let root = id_of(&api, "Root");
    let moved = api.page(&stray).unwrap();
    assert_eq!(moved.parent_id, Some(root));
    assert_eq!(moved.version, 2);
    assert_eq!(report.pages_updated, 1);
}

// ── Orphans ─────────────────────────────────────────────────────

#[tokio::test]
async fn remote_children_without_local_counterpart_are_deleted() {
    let (api, home) = setup();
    let root = api.seed_page("DOC", Some(&home), "Root", "<p>root</p>");
    api.seed_property(&root, CONTENT_HASH_KEY, &content_hash("<p>root</p>"));
    let stale = api.seed_page("DOC", Some(&root), "Stale", "");
    api.seed_page("DOC", Some(&stale), "Stale Child", "");

    let report = publisher(&api, config(&home))
        .publish(&[PageNode::new("Root", "<p>root</p>")])
        .await
        .unwrap();

    assert_eq!(report.pages_deleted, 1);
    assert!(api.page(&stale).is_none());
    assert!(api.page_by_title("Stale Child").is_none());
    assert_eq!(api.mutations(), vec![Call::DeletePage { id: stale }]);
}

#[tokio::test]
async fn keep_strategy_leaves_orphans_alone() {
    let (api, home) = setup();
    let root = api.seed_page("DOC", Some(&home), "Root", "");
    let stale = api.seed_page("DOC", Some(&root), "Stale", "");
    api.seed_attachment(&root, "old.txt", b"old");

    let config = PublishConfig {
        orphan_removal: OrphanRemoval::Keep,
        ..config(&home)
    };
    let report = publisher(&api, config)
        .publish(&[PageNode::new("Root", "")])
        .await
        .unwrap();

    assert_eq!(report.pages_deleted, 0);
    assert!(api.page(&stale).is_some());
    assert_eq!(api.attachments_of(&root).len(), 1);
}

#[tokio::test]
async fn page_moved_elsewhere_in_tree_is_not_deleted_as_orphan() {
    let (api, home) = setup();
    // Remote: Home > [A, B]; local: A > B.
    let a = api.seed_page("DOC", Some(&home), "A", "");
    let b = api.seed_page("DOC", Some(&home), "B", "");
    let config = PublishConfig {
        strategy: PublishingStrategy::ReplaceAncestor,
        ..config(&home)
    };
    let pages = vec![
        PageNode::new("Home", "<p>home</p>")
            .with_child(PageNode::new("A", "").with_child(PageNode::new("B", ""))),
    ];

    let report = publisher(&api, config).publish(&pages).await.unwrap();

    assert_eq!(report.pages_deleted, 0);
    assert_eq!(api.page(&b).unwrap().parent_id, Some(a));
}

// ── Attachments ─────────────────────────────────────────────────

#[tokio::test]
async fn attachments_are_added_updated_and_pruned() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("b.txt");
    std::fs::write(&file, b"from disk").unwrap();

    let (api, home) = setup();
    let root = api.seed_page("DOC", Some(&home), "Root", "<p>r</p>");
    api.seed_property(&root, CONTENT_HASH_KEY, &content_hash("<p>r</p>"));
    api.seed_attachment(&root, "a.txt", b"old a");
    let orphan = api.seed_attachment(&root, "old.txt", b"gone");

    let pages = vec![
        PageNode::new("Root", "<p>r</p>")
            .with_attachment("a.txt", AttachmentSource::Bytes(b"new a".to_vec()))
            .with_attachment("b.txt", AttachmentSource::File(file)),
    ];
    let publisher = publisher(&api, config(&home));
    let report = publisher.publish(&pages).await.unwrap();

    assert_eq!(report.attachments_updated, 1);
    assert_eq!(report.attachments_added, 1);
    assert_eq!(report.attachments_deleted, 1);

    let attachments = api.attachments_of(&root);
    let names: Vec<&str> = attachments.iter().map(|a| a.file_name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
    assert_eq!(attachments[0].content, b"new a".to_vec());
    assert_eq!(attachments[1].content, b"from disk".to_vec());
    assert!(!attachments.iter().any(|a| a.id == orphan));

    let properties = api.page(&root).unwrap().properties;
    assert_eq!(
        properties.get(&attachment_hash_key("b.txt")),
        Some(&bytes_hash(b"from disk"))
    );

    api.clear_calls();
    let rerun = publisher.publish(&pages).await.unwrap();
    assert_eq!(rerun.attachments_unchanged, 2);
    assert!(api.mutations().is_empty());
}

#[tokio::test]
async fn new_attachment_sets_hash_without_deleting_first() {
    let (api, home) = setup();
    let root = api.seed_page("DOC", Some(&home), "Root", "<p>r</p>");
    api.seed_property(&root, CONTENT_HASH_KEY, &content_hash("<p>r</p>"));
    let pages = vec![
        PageNode::new("Root", "<p>r</p>")
            .with_attachment("new.txt", AttachmentSource::Bytes(b"fresh".to_vec())),
    ];

    publisher(&api, config(&home)).publish(&pages).await.unwrap();

    assert_eq!(
        api.mutations(),
        vec![
            Call::AddAttachment {
                id: root.clone(),
                file_name: "new.txt".into()
            },
            Call::SetProperty {
                id: root.clone(),
                key: attachment_hash_key("new.txt"),
                value: bytes_hash(b"fresh")
            },
        ]
    );
}

#[tokio::test]
async fn attachment_named_like_page_hash_does_not_disturb_body_hash() {
    let (api, home) = setup();
    let pages = vec![
        PageNode::new("Root", "<p>r</p>")
            .with_attachment("content", AttachmentSource::Bytes(b"payload".to_vec())),
    ];
    let publisher = publisher(&api, config(&home));
    publisher.publish(&pages).await.unwrap();

    let root = id_of(&api, "Root");
    let properties = api.page(&root).unwrap().properties;
    assert_eq!(
        properties.get(CONTENT_HASH_KEY),
        Some(&content_hash("<p>r</p>"))
    );
    assert_eq!(
        properties.get(&attachment_hash_key("content")),
        Some(&bytes_hash(b"payload"))
    );

    for _ in 0..2 {
        api.clear_calls();
        let rerun = publisher.publish(&pages).await.unwrap();
        assert!(api.mutations().is_empty());
        assert_eq!(rerun.pages_unchanged, 1);
        assert_eq!(rerun.attachments_unchanged, 1);
    }
}

#[tokio::test]
async fn unreadable_attachment_file_fails_with_location() {
    let (api, home) = setup();
    let pages = vec![PageNode::new("Root", "").with_attachment(
        "missing.png",
        AttachmentSource::File("/nonexistent/missing.png".into()),
    )];

    let err = publisher(&api, config(&home))
        .publish(&pages)
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::AttachmentRead { .. }));
    assert_eq!(err.path(), Some("Root"));
    assert!(err.to_string().contains("/nonexistent/missing.png"));
}

// ── Labels ──────────────────────────────────────────────────────

#[tokio::test]
async fn labels_are_reconciled() {
    let (api, home) = setup();
    let root = api.seed_page("DOC", Some(&home), "Root", "");
    api.seed_property(&root, CONTENT_HASH_KEY, &content_hash(""));
    api.seed_labels(&root, &["old", "keep"]);

    let pages = vec![
        PageNode::new("Root", "")
            .with_label("keep")
            .with_label("new")
            .with_label("new"),
    ];
    let report = publisher(&api, config(&home)).publish(&pages).await.unwrap();

    assert_eq!(
        api.mutations(),
        vec![
            Call::AddLabels {
                id: root.clone(),
                labels: vec!["new".into()]
            },
            Call::DeleteLabel {
                id: root.clone(),
                label: "old".into()
            },
        ]
    );
    assert_eq!(report.labels_added, 1);
    assert_eq!(report.labels_removed, 1);
    assert_eq!(
        api.page(&root).unwrap().labels,
        vec!["keep".to_string(), "new".to_string()]
    );
}

#[tokio::test]
async fn label_sync_can_be_disabled() {
    let (api, home) = setup();
    let root = api.seed_page("DOC", Some(&home), "Root", "");
    api.seed_labels(&root, &["manual"]);

    let config = PublishConfig {
        sync_labels: false,
        ..config(&home)
    };
    publisher(&api, config)
        .publish(&[PageNode::new("Root", "").with_label("docs")])
        .await
        .unwrap();

    assert!(
        !api
            .calls()
            .iter()
            .any(|c| matches!(c, Call::GetLabels { .. } | Call::AddLabels { .. }))
    );
    assert_eq!(api.page(&root).unwrap().labels, vec!["manual".to_string()]);
}

// ── Failures ────────────────────────────────────────────────────

#[tokio::test]
async fn failure_aborts_run_with_title_path() {
    let (api, home) = setup();
    api.fail_mutations_of("Child", StatusCode::CONFLICT);

    let err = publisher(&api, config(&home))
        .publish(&root_with_child())
        .await
        .unwrap_err();

    assert_eq!(err.path(), Some("Root / Child"));
    assert!(err.client_error().unwrap().is_version_conflict());
}

#[tokio::test]
async fn continue_policy_records_failure_and_keeps_going() {
    let (api, home) = setup();
    let root = api.seed_page("DOC", Some(&home), "Root", "<p>root</p>");
    api.seed_property(&root, CONTENT_HASH_KEY, &content_hash("<p>root</p>"));
    let failing = api.seed_page("DOC", Some(&root), "A", "<p>old</p>");
    let stale = api.seed_page("DOC", Some(&root), "Old", "");
    api.fail_mutations_of("A", StatusCode::INTERNAL_SERVER_ERROR);

    let config = PublishConfig {
        failure_policy: FailurePolicy::ContinueWithSiblings,
        ..config(&home)
    };
    let pages = vec![
        PageNode::new("Root", "<p>root</p>")
            .with_child(PageNode::new("A", "<p>new</p>"))
            .with_child(PageNode::new("B", "<p>b</p>")),
    ];
    let report = publisher(&api, config).publish(&pages).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "Root / A");
    assert_eq!(report.failures[0].content_id, Some(failing.clone()));
    assert_eq!(report.pages_created, 1);
    assert_eq!(report.pages_deleted, 1);
    assert!(api.page(&failing).is_some());
    assert!(api.page(&stale).is_none());
    assert!(api.page_by_title("B").is_some());
}

#[tokio::test]
async fn ambiguous_title_stops_run_even_when_continuing() {
    let (api, home) = setup();
    api.seed_page("DOC", Some(&home), "Dup", "");
    api.seed_page("DOC", Some(&home), "Dup", "");

    let config = PublishConfig {
        failure_policy: FailurePolicy::ContinueWithSiblings,
        ..config(&home)
    };
    let err = publisher(&api, config)
        .publish(&[PageNode::new("Dup", ""), PageNode::new("Other", "")])
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(
        err.client_error(),
        Some(ClientError::MultipleResults { count: 2, .. })
    ));
    assert!(api.page_by_title("Other").is_none());
}

// ── Strategy and ancestor ───────────────────────────────────────

#[tokio::test]
async fn replace_ancestor_writes_root_onto_ancestor() {
    let (api, home) = setup();
    let config = PublishConfig {
        strategy: PublishingStrategy::ReplaceAncestor,
        ..config(&home)
    };
    let pages = vec![PageNode::new("Handbook", "<p>hb</p>").with_child(PageNode::new("Intro", ""))];

    let report = publisher(&api, config).publish(&pages).await.unwrap();

    let ancestor = api.page(&home).unwrap();
    assert_eq!(ancestor.title, "Handbook");
    assert_eq!(ancestor.body, "<p>hb</p>");
    assert_eq!(ancestor.version, 2);
    assert_eq!(api.child_titles(&home), vec!["Intro".to_string()]);
    assert_eq!(report.pages_updated, 1);
    assert_eq!(report.pages_created, 1);
}

#[tokio::test]
async fn replace_ancestor_needs_single_root() {
    let (api, home) = setup();
    let config = PublishConfig {
        strategy: PublishingStrategy::ReplaceAncestor,
        ..config(&home)
    };

    let err = publisher(&api, config)
        .publish(&[PageNode::new("A", ""), PageNode::new("B", "")])
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::InvalidTree(_)));
}

#[tokio::test]
async fn append_mode_leaves_other_ancestor_children_alone() {
    let (api, home) = setup();
    let unrelated = api.seed_page("DOC", Some(&home), "Unrelated", "");

    publisher(&api, config(&home))
        .publish(&[PageNode::new("Root", "")])
        .await
        .unwrap();

    assert!(api.page(&unrelated).is_some());
}

#[tokio::test]
async fn parent_given_by_title_is_resolved() {
    let (api, home) = setup();
    let config = PublishConfig {
        parent: Some(ParentPage::Title("Home".into())),
        ..config(&home)
    };

    publisher(&api, config)
        .publish(&[PageNode::new("Root", "")])
        .await
        .unwrap();

    assert_eq!(api.child_titles(&home), vec!["Root".to_string()]);
}

#[tokio::test]
async fn local_page_titled_like_ancestor_is_rejected() {
    let (api, home) = setup();
    let config = PublishConfig {
        parent: Some(ParentPage::Title("Home".into())),
        ..config(&home)
    };

    let err = publisher(&api, config)
        .publish(&[PageNode::new("Home", "<p>new home</p>")])
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::InvalidTree(_)));
    assert!(api.mutations().is_empty());
    assert_eq!(api.page(&home).unwrap().version, 1);
}

#[tokio::test]
async fn unknown_parent_title_is_ancestor_error() {
    let (api, home) = setup();
    let config = PublishConfig {
        parent: Some(ParentPage::Title("Nowhere".into())),
        ..config(&home)
    };

    let err = publisher(&api, config)
        .publish(&[PageNode::new("Root", "")])
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Ancestor { ref source } if source.is_not_found()));
}

#[tokio::test]
async fn duplicate_local_titles_are_rejected_before_any_call() {
    let (api, home) = setup();
    let pages = vec![PageNode::new("Same", "").with_child(PageNode::new("Same", ""))];

    let err = publisher(&api, config(&home)).publish(&pages).await.unwrap_err();

    assert!(matches!(err, PublishError::InvalidTree(_)));
    assert!(api.calls().is_empty());
}

#[test]
fn publisher_keeps_validated_config() {
    let (api, home) = setup();
    let publisher = publisher(&api, config(&home));
    assert_eq!(publisher.config(), &config(&home));
}

#[test]
fn incomplete_config_is_rejected() {
    let api = Arc::new(InMemoryContentApi::new());
    let result = Publisher::new(api, PublishConfig::default());
    assert!(matches!(result, Err(PublishError::Config(_))));
}
