//! End-to-end sweep scenarios against the mock network

use std::sync::Arc;

use libpostline::analytics::AnalyticsStore;
use libpostline::config::{Config, SchedulerConfig};
use libpostline::credentials::CredentialStore;
use libpostline::network::mock::{MockNetwork, PublishOutcome};
use libpostline::network::SocialNetwork;
use libpostline::posts::PostRepository;
use libpostline::publisher::Publisher;
use libpostline::sweep::{SweepStatus, Sweeper};
use libpostline::types::{Post, PostStatus};
use libpostline::Database;
use tempfile::TempDir;

const NOW: i64 = 1_700_000_000;

struct Stack {
    _tmp: TempDir,
    db: Arc<Database>,
    posts: Arc<PostRepository>,
    analytics: Arc<AnalyticsStore>,
    sweeper: Sweeper,
    network: MockNetwork,
}

async fn stack_with(network: MockNetwork, batch_size: usize) -> Stack {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");
    let db = Arc::new(Database::new(db_path.to_str().unwrap()).await.unwrap());

    let posts = Arc::new(PostRepository::new(Arc::clone(&db)));
    let analytics = Arc::new(AnalyticsStore::new(Arc::clone(&db)));
    let shared: Arc<dyn SocialNetwork> = Arc::new(network.clone());
    let credentials = Arc::new(CredentialStore::new(
        Arc::clone(&db),
        Arc::clone(&shared),
        Config::default_config().network,
    ));
    let publisher = Arc::new(Publisher::new(
        shared,
        Arc::clone(&posts),
        Arc::clone(&analytics),
    ));
    let sweeper = Sweeper::new(
        Arc::clone(&posts),
        credentials,
        publisher,
        &SchedulerConfig {
            batch_size,
            poll_interval: 60,
            claim_lease_secs: 600,
        },
    );

    Stack {
        _tmp: tmp,
        db,
        posts,
        analytics,
        sweeper,
        network,
    }
}

async fn stack(network: MockNetwork) -> Stack {
    stack_with(network, 20).await
}

/// Insert an active credential row directly; tests control the expiry
async fn insert_credential(db: &Database, user_id: &str, expires_at: i64) {
    sqlx::query(
        r#"
        INSERT INTO credentials (
            user_id, external_id, access_token, scope, expires_at,
            is_active, connected_at
        )
        VALUES (?, 'member-1', 'tok', 'w_member_social', ?, 1, ?)
        "#,
    )
    .bind(user_id)
    .bind(expires_at)
    .bind(NOW - 86_400)
    .execute(db.pool())
    .await
    .unwrap();
}

fn due_post(owner: &str, scheduled_for: i64) -> Post {
    let mut post = Post::new_draft(owner, "Scheduled title", "Scheduled body");
    post.status = PostStatus::Scheduled;
    post.scheduled_for = Some(scheduled_for);
    post
}

#[tokio::test]
async fn scenario_a_due_post_with_valid_credential_is_published() {
    let stack = stack(MockNetwork::with_publish_script(vec![PublishOutcome::Id(
        "urn:123".to_string(),
    )]))
    .await;
    insert_credential(&stack.db, "user-1", NOW + 3600).await;

    let post = due_post("user-1", NOW - 1);
    stack.posts.create(&post).await.unwrap();

    let report = stack.sweeper.run_sweep(NOW).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.published, 1);
    assert_eq!(report.outcomes[0].external_id.as_deref(), Some("urn:123"));

    let stored = stack.posts.get_by_id(&post.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PostStatus::Published);
    assert!(stored.published_to_external);
    assert_eq!(stored.external_id.as_deref(), Some("urn:123"));
    assert_eq!(stored.published_at, Some(NOW));

    let analytics = stack.analytics.get(&post.id).await.unwrap().unwrap();
    assert_eq!(analytics.impressions, 0);
    assert_eq!(analytics.likes, 0);
    assert_eq!(analytics.engagement_rate, 0.0);
}

#[tokio::test]
async fn scenario_b_expired_credential_fails_post_and_sweep_continues() {
    let stack = stack(MockNetwork::healthy()).await;
    // user-1's token expired an hour ago; user-2's is valid
    insert_credential(&stack.db, "user-1", NOW - 3600).await;
    insert_credential(&stack.db, "user-2", NOW + 3600).await;

    let expired_owner = due_post("user-1", NOW - 100);
    let healthy_owner = due_post("user-2", NOW - 50);
    stack.posts.create(&expired_owner).await.unwrap();
    stack.posts.create(&healthy_owner).await.unwrap();

    let report = stack.sweeper.run_sweep(NOW).await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.published, 1);

    let failed = stack.posts.get_by_id(&expired_owner.id).await.unwrap().unwrap();
    assert_eq!(failed.status, PostStatus::Failed);
    assert!(
        failed.error_message.as_deref().unwrap().contains("expired"),
        "failure reason names the expiry"
    );

    let published = stack.posts.get_by_id(&healthy_owner.id).await.unwrap().unwrap();
    assert_eq!(published.status, PostStatus::Published);
}

#[tokio::test]
async fn scenario_c_upstream_401_lands_in_error_message() {
    let stack = stack(MockNetwork::publish_rejected(401, "invalid token")).await;
    insert_credential(&stack.db, "user-1", NOW + 3600).await;

    let post = due_post("user-1", NOW - 1);
    stack.posts.create(&post).await.unwrap();

    let report = stack.sweeper.run_sweep(NOW).await.unwrap();
    assert_eq!(report.failed, 1);

    let stored = stack.posts.get_by_id(&post.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PostStatus::Failed);
    assert!(stored.error_message.as_deref().unwrap().contains("401"));
}

#[tokio::test]
async fn scenario_d_first_post_fails_second_succeeds_in_order() {
    let stack = stack(MockNetwork::with_publish_script(vec![
        PublishOutcome::Error(libpostline::error::NetworkError::Transport(
            "connection reset by peer".to_string(),
        )),
        PublishOutcome::Id("urn:second".to_string()),
    ]))
    .await;
    insert_credential(&stack.db, "user-1", NOW + 3600).await;

    let mut first = due_post("user-1", NOW - 10);
    let mut second = due_post("user-1", NOW - 10);
    // Same due time: ties break by post id
    first.id = "post-a".to_string();
    second.id = "post-b".to_string();
    stack.posts.create(&second).await.unwrap();
    stack.posts.create(&first).await.unwrap();

    let report = stack.sweeper.run_sweep(NOW).await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.published, 1);
    assert_eq!(report.failed, 1);

    assert_eq!(report.outcomes[0].post_id, "post-a");
    assert_eq!(report.outcomes[0].status, SweepStatus::Failed);
    assert!(report.outcomes[0]
        .error
        .as_deref()
        .unwrap()
        .contains("connection reset"));

    assert_eq!(report.outcomes[1].post_id, "post-b");
    assert_eq!(report.outcomes[1].status, SweepStatus::Published);
    assert_eq!(report.outcomes[1].external_id.as_deref(), Some("urn:second"));
}

#[tokio::test]
async fn every_due_post_reaches_a_terminal_state() {
    let stack = stack(MockNetwork::with_publish_script(vec![
        PublishOutcome::Id("urn:1".to_string()),
        PublishOutcome::Error(libpostline::error::NetworkError::Transport(
            "timeout".to_string(),
        )),
        PublishOutcome::Id("urn:3".to_string()),
    ]))
    .await;
    insert_credential(&stack.db, "user-1", NOW + 3600).await;

    let mut ids = Vec::new();
    for i in 0..3 {
        let post = due_post("user-1", NOW - 300 + i);
        ids.push(post.id.clone());
        stack.posts.create(&post).await.unwrap();
    }

    stack.sweeper.run_sweep(NOW).await.unwrap();

    for id in ids {
        let stored = stack.posts.get_by_id(&id).await.unwrap().unwrap();
        assert!(
            matches!(stored.status, PostStatus::Published | PostStatus::Failed),
            "post {} still {:?} after the sweep",
            id,
            stored.status
        );
    }
}

#[tokio::test]
async fn published_posts_are_never_selected_again() {
    let stack = stack(MockNetwork::healthy()).await;
    insert_credential(&stack.db, "user-1", NOW + 7200).await;

    let post = due_post("user-1", NOW - 1);
    stack.posts.create(&post).await.unwrap();

    let first = stack.sweeper.run_sweep(NOW).await.unwrap();
    assert_eq!(first.published, 1);
    assert_eq!(stack.network.publish_call_count(), 1);

    // Later sweeps see nothing, even though scheduled_for is long past
    let second = stack.sweeper.run_sweep(NOW + 3600).await.unwrap();
    assert_eq!(second.scanned, 0);
    assert_eq!(stack.network.publish_call_count(), 1, "no double publish");
}

#[tokio::test]
async fn batch_size_caps_one_sweep_and_the_rest_stay_scheduled() {
    let stack = stack_with(MockNetwork::healthy(), 2).await;
    insert_credential(&stack.db, "user-1", NOW + 7200).await;

    for i in 0..5 {
        stack
            .posts
            .create(&due_post("user-1", NOW - 500 + i))
            .await
            .unwrap();
    }

    let first = stack.sweeper.run_sweep(NOW).await.unwrap();
    assert_eq!(first.scanned, 2);
    assert_eq!(first.published, 2);

    let remaining = stack
        .posts
        .list_by_owner_and_status("user-1", PostStatus::Scheduled)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 3, "posts beyond the batch stay scheduled");

    // The next sweeps drain the rest
    let second = stack.sweeper.run_sweep(NOW + 1).await.unwrap();
    assert_eq!(second.scanned, 2);
    let third = stack.sweeper.run_sweep(NOW + 2).await.unwrap();
    assert_eq!(third.scanned, 1);
}

#[tokio::test]
async fn draft_posts_are_ignored_by_the_sweep() {
    let stack = stack(MockNetwork::healthy()).await;
    insert_credential(&stack.db, "user-1", NOW + 3600).await;

    let mut draft = Post::new_draft("user-1", "Draft", "Not scheduled");
    // A stale scheduled_for on a draft must not make it due
    draft.scheduled_for = Some(NOW - 100);
    stack.posts.create(&draft).await.unwrap();

    let report = stack.sweeper.run_sweep(NOW).await.unwrap();
    assert_eq!(report.scanned, 0);

    let stored = stack.posts.get_by_id(&draft.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PostStatus::Draft);
}
