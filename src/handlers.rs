//! Admin chat interface: reply-keyboard menus, destination management,
//! per-post toggles and send-mode/interval configuration.

use crate::config::Config;
use crate::forwarder::Forwarder;
use crate::model::{Post, SendMode};
use crate::store::{DestStore, PostStore, SettingsStore};
use anyhow::Result;
use chrono::Local;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ParseMode, Recipient,
};
use tracing::{info, instrument, warn};

const BTN_DESTS: &str = "📍 Manage destinations";
const BTN_TODAY: &str = "📋 Today's posts";
const BTN_SEND_MODE: &str = "⚙️ Send mode";
const BTN_ADD_DEST: &str = "➕ Add destination";
const BTN_DEL_DEST: &str = "🗑 Remove destination";
const BTN_LIST_DESTS: &str = "📋 List destinations";
const BTN_MODE_REPEAT: &str = "🔁 Repeat sending";
const BTN_MODE_ONCE: &str = "1️⃣ Send once";
const BTN_UNIT_SECONDS: &str = "⏱ Seconds";
const BTN_UNIT_MINUTES: &str = "🕰 Minutes";
const BTN_UNIT_HOURS: &str = "⏳ Hours";
const BTN_BACK: &str = "🔙 Back";

const DENIED: &str = "⛔ You are not an admin.";
const FALLBACK_TITLE: &str = "group";

/// Unit chosen in the interval dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Seconds,
    Minutes,
    Hours,
}

impl IntervalUnit {
    pub fn to_seconds(self, value: u64) -> u64 {
        match self {
            IntervalUnit::Seconds => value,
            IntervalUnit::Minutes => value * 60,
            IntervalUnit::Hours => value * 3600,
        }
    }
}

/// Short-lived per-user conversation state; absent entry means idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminState {
    AwaitingDestInput,
    AwaitingDeleteInput,
    AwaitingIntervalValue(IntervalUnit),
}

/// Everything the update handlers need, cloned into each dptree branch.
#[derive(Clone)]
pub struct BotState {
    pub config: Arc<Config>,
    pub posts: PostStore,
    pub dests: DestStore,
    pub settings: SettingsStore,
    pub forwarder: Arc<dyn Forwarder>,
    admin_states: Arc<Mutex<HashMap<u64, AdminState>>>,
}

impl BotState {
    pub fn new(
        config: Arc<Config>,
        posts: PostStore,
        dests: DestStore,
        settings: SettingsStore,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            config,
            posts,
            dests,
            settings,
            forwarder,
            admin_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn take_state(&self, uid: u64) -> Option<AdminState> {
        self.admin_states.lock().expect("admin state lock").remove(&uid)
    }

    fn enter_state(&self, uid: u64, state: AdminState) {
        self.admin_states
            .lock()
            .expect("admin state lock")
            .insert(uid, state);
    }
}

/// What an admin typed when asked for a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestInput {
    ChatId(i64),
    Username(String),
    Invalid,
}

/// Accepts a raw `-100…` chat id or a `t.me/<username>` link.
pub fn parse_dest_input(text: &str) -> DestInput {
    let text = text.trim();
    if text.starts_with("-100") && text[1..].chars().all(|c| c.is_ascii_digit()) {
        if let Ok(id) = text.parse() {
            return DestInput::ChatId(id);
        }
    }
    if let Some(rest) = text.split("t.me/").nth(1) {
        let username = rest.split('/').next().unwrap_or_default();
        if !username.is_empty() {
            return DestInput::Username(username.to_string());
        }
    }
    DestInput::Invalid
}

/// Deep link into a private channel, e.g. `https://t.me/c/1234567890/42`.
pub fn post_link(source_channel_id: i64, message_id: i64) -> String {
    let internal = source_channel_id.to_string().replace("-100", "");
    format!("https://t.me/c/{internal}/{message_id}")
}

fn main_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(BTN_DESTS),
            KeyboardButton::new(BTN_TODAY),
        ],
        vec![KeyboardButton::new(BTN_SEND_MODE)],
    ])
    .resize_keyboard(true)
}

fn dests_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(BTN_ADD_DEST),
            KeyboardButton::new(BTN_DEL_DEST),
            KeyboardButton::new(BTN_LIST_DESTS),
        ],
        vec![KeyboardButton::new(BTN_BACK)],
    ])
    .resize_keyboard(true)
}

fn send_mode_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(BTN_MODE_REPEAT),
            KeyboardButton::new(BTN_MODE_ONCE),
        ],
        vec![KeyboardButton::new(BTN_BACK)],
    ])
    .resize_keyboard(true)
}

fn interval_unit_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(BTN_UNIT_SECONDS),
            KeyboardButton::new(BTN_UNIT_MINUTES),
            KeyboardButton::new(BTN_UNIT_HOURS),
        ],
        vec![KeyboardButton::new(BTN_BACK)],
    ])
    .resize_keyboard(true)
}

fn toggle_keyboard(message_id: i64, active: bool) -> InlineKeyboardMarkup {
    let label = if active { "✔ On" } else { "❌ Off" };
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        label,
        format!("toggle:{message_id}"),
    )]])
}

#[instrument(skip_all)]
pub async fn handle_message(bot: &Bot, state: &BotState, msg: &Message) -> Result<()> {
    let user = match msg.from() {
        Some(u) => u,
        None => return Ok(()),
    };
    let uid = user.id.0;
    let text = match msg.text() {
        Some(t) => t.trim(),
        None => return Ok(()),
    };

    match text {
        "/start" => {
            bot.send_message(
                msg.chat.id,
                "Hi! This bot relays channel posts to configured chats.\nAdmins: /admin",
            )
            .await?;
            return Ok(());
        }
        "/ping" => {
            bot.send_message(msg.chat.id, "PONG").await?;
            return Ok(());
        }
        "/admin" => {
            if !state.config.is_admin(uid) {
                bot.send_message(msg.chat.id, DENIED).await?;
                return Ok(());
            }
            state.take_state(uid);
            bot.send_message(msg.chat.id, "🔧 Admin panel")
                .reply_markup(main_keyboard())
                .await?;
            return Ok(());
        }
        _ => {}
    }

    // Everything below is the admin surface; silently ignore other users.
    if !state.config.is_admin(uid) {
        return Ok(());
    }

    if let Some(pending) = state.take_state(uid) {
        return match pending {
            AdminState::AwaitingDestInput => handle_add_dest_input(bot, state, msg, text).await,
            AdminState::AwaitingDeleteInput => handle_delete_input(bot, state, msg, text).await,
            AdminState::AwaitingIntervalValue(unit) => {
                handle_interval_value(bot, state, msg, text, unit).await
            }
        };
    }

    match text {
        BTN_DESTS => {
            bot.send_message(
                msg.chat.id,
                "📍 Destination management:\n\
                 ➕ add by chat id or t.me link\n\
                 🗑 remove by chat id\n\
                 📋 list all registered destinations",
            )
            .reply_markup(dests_keyboard())
            .await?;
        }
        BTN_ADD_DEST => {
            state.enter_state(uid, AdminState::AwaitingDestInput);
            bot.send_message(msg.chat.id, "Send the destination chat id or t.me link:")
                .await?;
        }
        BTN_DEL_DEST => {
            state.enter_state(uid, AdminState::AwaitingDeleteInput);
            bot.send_message(msg.chat.id, "Send the chat id of the destination to remove:")
                .await?;
        }
        BTN_LIST_DESTS => list_destinations(bot, state, msg).await?,
        BTN_TODAY => show_today_posts(bot, state, msg).await?,
        BTN_SEND_MODE => {
            let current = state.settings.send_mode();
            let label = match current {
                SendMode::Repeat => "🔁 repeat",
                SendMode::Once => "1️⃣ once",
            };
            bot.send_message(
                msg.chat.id,
                format!("⚙️ Current send mode: {label}\nPick a mode:"),
            )
            .reply_markup(send_mode_keyboard())
            .await?;
        }
        BTN_MODE_ONCE => {
            state.settings.set_send_mode(SendMode::Once);
            info!(admin = uid, "send mode set to once");
            bot.send_message(msg.chat.id, "🔔 One-shot mode enabled.")
                .reply_markup(main_keyboard())
                .await?;
        }
        BTN_MODE_REPEAT => {
            state.settings.set_send_mode(SendMode::Repeat);
            info!(admin = uid, "send mode set to repeat");
            bot.send_message(msg.chat.id, "Pick a time unit for the interval:")
                .reply_markup(interval_unit_keyboard())
                .await?;
        }
        BTN_UNIT_SECONDS | BTN_UNIT_MINUTES | BTN_UNIT_HOURS => {
            let unit = match text {
                BTN_UNIT_SECONDS => IntervalUnit::Seconds,
                BTN_UNIT_MINUTES => IntervalUnit::Minutes,
                _ => IntervalUnit::Hours,
            };
            state.enter_state(uid, AdminState::AwaitingIntervalValue(unit));
            bot.send_message(msg.chat.id, "⏱ Send the interval value:")
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
        BTN_BACK => {
            bot.send_message(msg.chat.id, "Back to the admin panel.")
                .reply_markup(main_keyboard())
                .await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "Use /admin to open the panel.")
                .await?;
        }
    }

    Ok(())
}

async fn handle_add_dest_input(
    bot: &Bot,
    state: &BotState,
    msg: &Message,
    text: &str,
) -> Result<()> {
    let recipient = match parse_dest_input(text) {
        DestInput::ChatId(id) => Recipient::Id(ChatId(id)),
        DestInput::Username(username) => Recipient::ChannelUsername(format!("@{username}")),
        DestInput::Invalid => {
            bot.send_message(msg.chat.id, "❗ That is not a chat id or t.me link.")
                .reply_markup(dests_keyboard())
                .await?;
            return Ok(());
        }
    };

    let (chat_id, title) = match bot.get_chat(recipient.clone()).await {
        Ok(chat) => (
            chat.id.0,
            chat.title().unwrap_or(FALLBACK_TITLE).to_string(),
        ),
        Err(err) => match recipient {
            // A raw id may still be forwardable even when the bot cannot
            // resolve chat info for it; fall back to a placeholder title.
            Recipient::Id(ChatId(id)) => {
                warn!(?err, chat_id = id, "get_chat failed; using placeholder title");
                (id, FALLBACK_TITLE.to_string())
            }
            _ => {
                bot.send_message(msg.chat.id, format!("❗ Could not resolve that chat: {err}"))
                    .reply_markup(dests_keyboard())
                    .await?;
                return Ok(());
            }
        },
    };

    let reply = if state.dests.add(chat_id, &title) {
        info!(chat_id, %title, "destination added");
        format!("✅ Destination added: {chat_id} — {title}")
    } else {
        "ℹ️ That destination is already registered.".to_string()
    };
    bot.send_message(msg.chat.id, reply)
        .reply_markup(dests_keyboard())
        .await?;
    Ok(())
}

async fn handle_delete_input(bot: &Bot, state: &BotState, msg: &Message, text: &str) -> Result<()> {
    let chat_id: i64 = match text.parse() {
        Ok(id) => id,
        Err(_) => {
            bot.send_message(msg.chat.id, "❗ That is not a valid chat id.")
                .reply_markup(dests_keyboard())
                .await?;
            return Ok(());
        }
    };

    let reply = if state.dests.remove(chat_id) {
        info!(chat_id, "destination removed");
        "🗑 Destination removed."
    } else {
        "❗ No destination with that chat id."
    };
    bot.send_message(msg.chat.id, reply)
        .reply_markup(dests_keyboard())
        .await?;
    Ok(())
}

async fn handle_interval_value(
    bot: &Bot,
    state: &BotState,
    msg: &Message,
    text: &str,
    unit: IntervalUnit,
) -> Result<()> {
    let value: u64 = match text.parse() {
        Ok(v) if v > 0 => v,
        _ => {
            bot.send_message(msg.chat.id, "❗ Send a positive number.")
                .reply_markup(main_keyboard())
                .await?;
            return Ok(());
        }
    };

    let seconds = unit.to_seconds(value);
    state.settings.set_interval(seconds);
    state.settings.set_send_mode(SendMode::Repeat);
    info!(seconds, "interval updated");

    bot.send_message(msg.chat.id, format!("⏱ Interval set to {seconds} seconds."))
        .reply_markup(main_keyboard())
        .await?;
    Ok(())
}

async fn list_destinations(bot: &Bot, state: &BotState, msg: &Message) -> Result<()> {
    let dests = state.dests.list();
    if dests.is_empty() {
        bot.send_message(msg.chat.id, "❗ No destinations registered yet.")
            .reply_markup(dests_keyboard())
            .await?;
        return Ok(());
    }

    let mut lines = vec!["📍 Registered destinations:".to_string(), String::new()];
    for (i, d) in dests.iter().enumerate() {
        let title = if d.title.is_empty() {
            FALLBACK_TITLE
        } else {
            &d.title
        };
        lines.push(format!("{}. {} — {}", i + 1, d.chat_id, title));
    }
    bot.send_message(msg.chat.id, lines.join("\n"))
        .reply_markup(dests_keyboard())
        .await?;
    Ok(())
}

async fn show_today_posts(bot: &Bot, state: &BotState, msg: &Message) -> Result<()> {
    let today = Local::now().date_naive();
    let posts = state.posts.list_for_date(today);
    if posts.is_empty() {
        bot.send_message(msg.chat.id, "📭 No posts observed today.")
            .reply_markup(main_keyboard())
            .await?;
        return Ok(());
    }

    for post in posts {
        bot.send_message(msg.chat.id, post_summary(&post, state.config.telegram.source_channel_id))
            .parse_mode(ParseMode::Html)
            .reply_markup(toggle_keyboard(post.message_id, post.active))
            .await?;
    }
    Ok(())
}

fn post_summary(post: &Post, source_channel_id: i64) -> String {
    let bell = if post.active { "🔔" } else { "🔕" };
    let ad = post.ad_number.unwrap_or(post.message_id);
    let link = post_link(source_channel_id, post.message_id);
    format!("{bell} <b>Ad #{ad}</b>\n<a href=\"{link}\">view post</a>")
}

#[instrument(skip_all)]
pub async fn handle_callback(bot: &Bot, state: &BotState, q: &CallbackQuery) -> Result<()> {
    let data = match q.data.as_deref() {
        Some(d) => d,
        None => {
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };

    if !state.config.is_admin(q.from.id.0) {
        bot.answer_callback_query(q.id.clone())
            .text(DENIED)
            .show_alert(true)
            .await?;
        return Ok(());
    }

    if let Some(raw) = data.strip_prefix("toggle:") {
        let message_id: i64 = match raw.parse() {
            Ok(id) => id,
            Err(_) => {
                bot.answer_callback_query(q.id.clone()).await?;
                return Ok(());
            }
        };

        match state.posts.toggle_active(message_id) {
            None => {
                bot.answer_callback_query(q.id.clone())
                    .text("❗ Post not found.")
                    .show_alert(true)
                    .await?;
            }
            Some(active) => {
                info!(message_id, active, "post toggled");
                bot.answer_callback_query(q.id.clone())
                    .text(if active { "🔔 Post enabled." } else { "❌ Post disabled." })
                    .await?;
                if let Some(m) = &q.message {
                    // Best effort; the message may be too old to edit.
                    let _ = bot
                        .edit_message_reply_markup(m.chat.id, m.id)
                        .reply_markup(toggle_keyboard(message_id, active))
                        .await;
                }
            }
        }
        return Ok(());
    }

    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_raw_chat_id() {
        assert_eq!(
            parse_dest_input("-1001234567890"),
            DestInput::ChatId(-1001234567890)
        );
        assert_eq!(parse_dest_input(" -1009 "), DestInput::ChatId(-1009));
    }

    #[test]
    fn parses_tme_links() {
        assert_eq!(
            parse_dest_input("https://t.me/mygroup"),
            DestInput::Username("mygroup".into())
        );
        assert_eq!(
            parse_dest_input("t.me/mygroup/123"),
            DestInput::Username("mygroup".into())
        );
    }

    #[test]
    fn rejects_garbage_dest_input() {
        assert_eq!(parse_dest_input("hello"), DestInput::Invalid);
        assert_eq!(parse_dest_input("-100abc"), DestInput::Invalid);
        assert_eq!(parse_dest_input("t.me/"), DestInput::Invalid);
        assert_eq!(parse_dest_input("12345"), DestInput::Invalid);
    }

    #[test]
    fn interval_unit_conversion() {
        assert_eq!(IntervalUnit::Seconds.to_seconds(45), 45);
        assert_eq!(IntervalUnit::Minutes.to_seconds(5), 300);
        assert_eq!(IntervalUnit::Hours.to_seconds(2), 7200);
    }

    #[test]
    fn private_channel_links() {
        assert_eq!(
            post_link(-1001234567890, 42),
            "https://t.me/c/1234567890/42"
        );
    }

    #[test]
    fn post_summary_prefers_ad_number() {
        let post = Post::new(7, "2024-06-01".parse().unwrap(), Some(1234));
        let text = post_summary(&post, -1001234567890);
        assert!(text.contains("Ad #1234"));
        assert!(text.contains("https://t.me/c/1234567890/7"));

        let plain = Post::new(7, "2024-06-01".parse().unwrap(), None);
        assert!(post_summary(&plain, -1001234567890).contains("Ad #7"));
    }
}
