use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tg_forwardbot::forwarder::Forwarder;
use tg_forwardbot::model::SendMode;
use tg_forwardbot::scheduler::{run_cycle, CycleOutcome};
use tg_forwardbot::store::{DestStore, PostStore, SettingsStore};
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct RecordingForwarder {
    calls: Arc<Mutex<Vec<(i64, i64)>>>,
    failing_dests: Arc<Mutex<HashSet<i64>>>,
}

impl RecordingForwarder {
    async fn calls(&self) -> Vec<(i64, i64)> {
        self.calls.lock().await.clone()
    }

    async fn fail_for(&self, dest_chat_id: i64) {
        self.failing_dests.lock().await.insert(dest_chat_id);
    }
}

#[async_trait::async_trait]
impl Forwarder for RecordingForwarder {
    async fn forward_post(&self, message_id: i64, dest_chat_id: i64) -> Result<()> {
        self.calls.lock().await.push((message_id, dest_chat_id));
        if self.failing_dests.lock().await.contains(&dest_chat_id) {
            return Err(anyhow!("delivery failed"));
        }
        Ok(())
    }
}

fn setup() -> (TempDir, SettingsStore, PostStore, DestStore) {
    let td = tempdir().unwrap();
    let settings = SettingsStore::in_dir(td.path());
    let posts = PostStore::in_dir(td.path());
    let dests = DestStore::in_dir(td.path());
    (td, settings, posts, dests)
}

fn day(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[tokio::test]
async fn repeat_cycle_forwards_active_post_to_destination() {
    let (_td, settings, posts, dests) = setup();
    let today = day("2024-06-01");
    posts.add_post(1, today, None);
    dests.add(100, "G1");

    let forwarder = RecordingForwarder::default();
    let outcome = run_cycle(&settings, &posts, &dests, &forwarder, today)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Sent {
            posts: 1,
            dests: 1,
            failures: 0
        }
    );
    assert_eq!(forwarder.calls().await, vec![(1, 100)]);
}

#[tokio::test]
async fn inactive_post_is_not_forwarded() {
    let (_td, settings, posts, dests) = setup();
    let today = day("2024-06-01");
    posts.add_post(1, today, None);
    posts.set_active(1, false);
    dests.add(100, "G1");

    let forwarder = RecordingForwarder::default();
    let outcome = run_cycle(&settings, &posts, &dests, &forwarder, today)
        .await
        .unwrap();

    assert_eq!(outcome, CycleOutcome::Empty);
    assert!(forwarder.calls().await.is_empty());
}

#[tokio::test]
async fn only_todays_posts_are_eligible() {
    let (_td, settings, posts, dests) = setup();
    posts.add_post(1, day("2024-05-31"), None);
    posts.add_post(2, day("2024-06-01"), None);
    dests.add(100, "G1");

    let forwarder = RecordingForwarder::default();
    run_cycle(&settings, &posts, &dests, &forwarder, day("2024-06-01"))
        .await
        .unwrap();

    assert_eq!(forwarder.calls().await, vec![(2, 100)]);
}

#[tokio::test]
async fn once_mode_idles_and_repeat_resumes() {
    let (_td, settings, posts, dests) = setup();
    let today = day("2024-06-01");
    posts.add_post(1, today, None);
    dests.add(100, "G1");

    let forwarder = RecordingForwarder::default();

    // Mode switches must be visible on the very next iteration.
    settings.set_send_mode(SendMode::Once);
    let outcome = run_cycle(&settings, &posts, &dests, &forwarder, today)
        .await
        .unwrap();
    assert_eq!(outcome, CycleOutcome::Idle);
    assert!(forwarder.calls().await.is_empty());

    settings.set_send_mode(SendMode::Repeat);
    let outcome = run_cycle(&settings, &posts, &dests, &forwarder, today)
        .await
        .unwrap();
    assert!(matches!(outcome, CycleOutcome::Sent { .. }));
    assert_eq!(forwarder.calls().await, vec![(1, 100)]);
}

#[tokio::test]
async fn failing_destination_does_not_abort_cycle() {
    let (_td, settings, posts, dests) = setup();
    let today = day("2024-06-01");
    posts.add_post(1, today, None);
    posts.add_post(2, today, None);
    dests.add(100, "dead");
    dests.add(200, "alive");

    let forwarder = RecordingForwarder::default();
    forwarder.fail_for(100).await;

    let outcome = run_cycle(&settings, &posts, &dests, &forwarder, today)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Sent {
            posts: 2,
            dests: 2,
            failures: 2
        }
    );
    // Every (post, destination) pair is still attempted.
    assert_eq!(
        forwarder.calls().await,
        vec![(1, 100), (1, 200), (2, 100), (2, 200)]
    );
}

#[tokio::test]
async fn no_destinations_is_a_normal_skip() {
    let (_td, settings, posts, dests) = setup();
    let today = day("2024-06-01");
    posts.add_post(1, today, None);

    let forwarder = RecordingForwarder::default();
    let outcome = run_cycle(&settings, &posts, &dests, &forwarder, today)
        .await
        .unwrap();

    assert_eq!(outcome, CycleOutcome::Empty);
    assert!(forwarder.calls().await.is_empty());
}

#[tokio::test]
async fn posts_stay_eligible_across_cycles() {
    let (_td, settings, posts, dests) = setup();
    let today = day("2024-06-01");
    posts.add_post(1, today, None);
    dests.add(100, "G1");

    let forwarder = RecordingForwarder::default();
    for _ in 0..3 {
        run_cycle(&settings, &posts, &dests, &forwarder, today)
            .await
            .unwrap();
    }

    // Re-sent every cycle until an admin disables it; no deduplication.
    assert_eq!(forwarder.calls().await, vec![(1, 100), (1, 100), (1, 100)]);

    posts.toggle_active(1);
    let outcome = run_cycle(&settings, &posts, &dests, &forwarder, today)
        .await
        .unwrap();
    assert_eq!(outcome, CycleOutcome::Empty);
    assert_eq!(forwarder.calls().await.len(), 3);
}
