use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Delivery policy for observed posts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SendMode {
    /// Re-send all eligible posts to all destinations on a fixed interval.
    #[default]
    Repeat,
    /// Send each new post immediately upon arrival, exactly once.
    Once,
}

impl SendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendMode::Repeat => "repeat",
            SendMode::Once => "once",
        }
    }
}

/// One observed source-channel post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub message_id: i64,
    pub date: NaiveDate,
    #[serde(default = "default_true")]
    pub active: bool,
    // Older deployments wrote this field as "sent".
    #[serde(default, alias = "sent")]
    pub sent_once: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_number: Option<i64>,
}

impl Post {
    pub fn new(message_id: i64, date: NaiveDate, ad_number: Option<i64>) -> Self {
        Self {
            message_id,
            date,
            active: true,
            sent_once: false,
            ad_number,
        }
    }
}

/// A chat that receives copies of source posts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Destination {
    pub chat_id: i64,
    #[serde(default)]
    pub title: String,
}

/// Singleton scheduling parameters, polled by the scheduler every cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub send_mode: SendMode,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

pub const DEFAULT_INTERVAL_SECS: u64 = 1800;

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            send_mode: SendMode::Repeat,
            interval: DEFAULT_INTERVAL_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_mode_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&SendMode::Repeat).unwrap(), "\"repeat\"");
        assert_eq!(serde_json::to_string(&SendMode::Once).unwrap(), "\"once\"");
    }

    #[test]
    fn post_accepts_legacy_sent_field() {
        let p: Post = serde_json::from_str(
            r#"{"message_id": 5, "date": "2024-06-01", "active": false, "sent": true}"#,
        )
        .unwrap();
        assert!(p.sent_once);
        assert!(!p.active);
        assert_eq!(p.ad_number, None);
    }

    #[test]
    fn post_defaults_on_missing_flags() {
        let p: Post = serde_json::from_str(r#"{"message_id": 9, "date": "2024-06-01"}"#).unwrap();
        assert!(p.active);
        assert!(!p.sent_once);
    }

    #[test]
    fn settings_defaults() {
        let s = Settings::default();
        assert_eq!(s.send_mode, SendMode::Repeat);
        assert_eq!(s.interval, 1800);
    }
}
