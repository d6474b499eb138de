//! The long-running control loop behind periodic (`repeat`) delivery.
//!
//! Mode and interval are re-read from the settings store on every iteration
//! so admin changes take effect on the very next pass. One-shot delivery is
//! driven by the ingest trigger, not by this loop.

use crate::forwarder::Forwarder;
use crate::model::SendMode;
use crate::store::{DestStore, PostStore, SettingsStore};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// What a single scheduler iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// One-shot mode: the loop only idles and re-checks the mode flag.
    Idle,
    /// Repeat mode with no eligible posts or no destinations; a normal skip.
    Empty,
    /// A periodic fan-out ran.
    Sent {
        posts: usize,
        dests: usize,
        failures: usize,
    },
}

/// Run one scheduler iteration.
///
/// Eligible posts are the active posts observed on `today`; each is copied
/// to every destination sequentially. Per-forward failures are logged and
/// counted but never abort the remaining (post, destination) pairs — the
/// post stays eligible and is retried wholesale next cycle.
#[instrument(skip_all)]
pub async fn run_cycle(
    settings: &SettingsStore,
    posts: &PostStore,
    dests: &DestStore,
    forwarder: &dyn Forwarder,
    today: NaiveDate,
) -> Result<CycleOutcome> {
    if settings.send_mode() == SendMode::Once {
        return Ok(CycleOutcome::Idle);
    }

    let eligible: Vec<_> = posts
        .list_for_date(today)
        .into_iter()
        .filter(|p| p.active)
        .collect();
    let targets = dests.list();

    if eligible.is_empty() {
        info!("no eligible posts for today; skipping cycle");
        return Ok(CycleOutcome::Empty);
    }
    if targets.is_empty() {
        info!("no destinations set; skipping cycle");
        return Ok(CycleOutcome::Empty);
    }

    info!(
        posts = eligible.len(),
        dests = targets.len(),
        "starting forward cycle"
    );

    let mut failures = 0usize;
    for post in &eligible {
        for dest in &targets {
            if let Err(err) = forwarder.forward_post(post.message_id, dest.chat_id).await {
                warn!(
                    ?err,
                    message_id = post.message_id,
                    chat_id = dest.chat_id,
                    "forward failed; continuing"
                );
                failures += 1;
            }
        }
    }

    info!(failures, "forward cycle completed");
    Ok(CycleOutcome::Sent {
        posts: eligible.len(),
        dests: targets.len(),
        failures,
    })
}

/// Drive [`run_cycle`] forever. Errors inside one iteration are logged and
/// followed by a short cooldown; the loop never terminates.
pub async fn run(
    settings: SettingsStore,
    posts: PostStore,
    dests: DestStore,
    forwarder: Arc<dyn Forwarder>,
    idle_sleep: Duration,
    error_cooldown: Duration,
) {
    info!("scheduler started");
    loop {
        let today = Local::now().date_naive();
        let sleep = match run_cycle(&settings, &posts, &dests, forwarder.as_ref(), today).await {
            Ok(CycleOutcome::Idle) => idle_sleep,
            Ok(CycleOutcome::Empty) | Ok(CycleOutcome::Sent { .. }) => {
                Duration::from_secs(settings.interval().max(1))
            }
            Err(err) => {
                error!(?err, "scheduler iteration failed");
                error_cooldown
            }
        };
        tokio::time::sleep(sleep).await;
    }
}
