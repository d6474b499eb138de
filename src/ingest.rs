//! Reacts to new source-channel posts: persists them and, in one-shot mode,
//! triggers an immediate send.

use crate::forwarder::Forwarder;
use crate::model::SendMode;
use crate::store::{DestStore, PostStore, SettingsStore};
use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use teloxide::types::Message;
use tracing::{info, instrument, warn};

// Matches the ad number in captions like "#1234" or a labeled form such as
// "آگهی شماره #1234".
static AD_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\d+)").unwrap());

/// Best-effort ad-number extraction from a caption or text body.
pub fn extract_ad_number(text: &str) -> Option<i64> {
    AD_NUMBER_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Persist a new source post and, when in one-shot mode, dispatch it to every
/// current destination exactly once.
///
/// Duplicate events for the same `message_id` are no-ops at the store layer;
/// the `is_sent_once` guard additionally prevents a double send round when
/// the trigger fires twice in a narrow race window.
#[instrument(skip_all)]
pub async fn ingest_post(
    posts: &PostStore,
    dests: &DestStore,
    settings: &SettingsStore,
    forwarder: &dyn Forwarder,
    message_id: i64,
    date: NaiveDate,
    ad_number: Option<i64>,
) {
    posts.add_post(message_id, date, ad_number);
    info!(message_id, %date, "source post recorded");

    if settings.send_mode() != SendMode::Once {
        return;
    }
    if posts.is_sent_once(message_id) {
        return;
    }

    let targets = dests.list();
    if targets.is_empty() {
        info!(message_id, "no destinations for immediate send");
        return;
    }

    info!(message_id, dests = targets.len(), "immediate one-shot send");
    for dest in &targets {
        if let Err(err) = forwarder.forward_post(message_id, dest.chat_id).await {
            warn!(
                ?err,
                message_id,
                chat_id = dest.chat_id,
                "immediate send failed; continuing"
            );
        }
    }
    posts.mark_sent_once(message_id);
}

/// Telegram glue: feed a channel-post update into [`ingest_post`].
///
/// Posts from chats other than the configured source channel are ignored.
pub async fn handle_channel_post(
    msg: &Message,
    source_channel_id: i64,
    posts: &PostStore,
    dests: &DestStore,
    settings: &SettingsStore,
    forwarder: &dyn Forwarder,
) {
    if msg.chat.id.0 != source_channel_id {
        return;
    }

    let ad_number = msg
        .caption()
        .or_else(|| msg.text())
        .and_then(extract_ad_number);
    let today = Local::now().date_naive();

    ingest_post(
        posts,
        dests,
        settings,
        forwarder,
        msg.id.0 as i64,
        today,
        ad_number,
    )
    .await;
}
