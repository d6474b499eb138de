use super::{read_json, write_json};
use crate::model::Post;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub const POSTS_FILE: &str = "fwd_posts.json";

/// Durable record of every observed source post and its per-post flags.
#[derive(Debug, Clone)]
pub struct PostStore {
    path: PathBuf,
}

impl PostStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by `fwd_posts.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(POSTS_FILE))
    }

    fn load(&self) -> Vec<Post> {
        read_json(&self.path)
    }

    fn save(&self, posts: &[Post]) {
        write_json(&self.path, &posts);
    }

    /// Insert a new record with `active=true`, `sent_once=false`.
    ///
    /// A duplicate `message_id` is a no-op: the second call's `date` and
    /// `ad_number` are ignored (idempotent ingest).
    pub fn add_post(&self, message_id: i64, date: NaiveDate, ad_number: Option<i64>) {
        let mut posts = self.load();
        if posts.iter().any(|p| p.message_id == message_id) {
            return;
        }
        posts.push(Post::new(message_id, date, ad_number));
        self.save(&posts);
    }

    pub fn list_all(&self) -> Vec<Post> {
        self.load()
    }

    /// Posts observed on the given calendar day.
    pub fn list_for_date(&self, date: NaiveDate) -> Vec<Post> {
        self.load().into_iter().filter(|p| p.date == date).collect()
    }

    pub fn list_active(&self) -> Vec<Post> {
        self.load().into_iter().filter(|p| p.active).collect()
    }

    pub fn list_inactive(&self) -> Vec<Post> {
        self.load().into_iter().filter(|p| !p.active).collect()
    }

    pub fn list_unsent(&self) -> Vec<Post> {
        self.load().into_iter().filter(|p| !p.sent_once).collect()
    }

    /// Flip the `active` flag. Returns the new value, or `None` when no post
    /// with `message_id` exists (nothing is mutated in that case).
    pub fn toggle_active(&self, message_id: i64) -> Option<bool> {
        let mut posts = self.load();
        let post = posts.iter_mut().find(|p| p.message_id == message_id)?;
        post.active = !post.active;
        let new_state = post.active;
        self.save(&posts);
        Some(new_state)
    }

    /// Explicitly set the `active` flag. Unknown ids are ignored.
    pub fn set_active(&self, message_id: i64, value: bool) {
        let mut posts = self.load();
        if let Some(post) = posts.iter_mut().find(|p| p.message_id == message_id) {
            post.active = value;
            self.save(&posts);
        }
    }

    /// Record that a one-shot dispatch fired. Returns false when the post
    /// does not exist.
    pub fn mark_sent_once(&self, message_id: i64) -> bool {
        let mut posts = self.load();
        match posts.iter_mut().find(|p| p.message_id == message_id) {
            Some(post) => {
                post.sent_once = true;
                self.save(&posts);
                true
            }
            None => false,
        }
    }

    pub fn is_sent_once(&self, message_id: i64) -> bool {
        self.load()
            .iter()
            .find(|p| p.message_id == message_id)
            .map(|p| p.sent_once)
            .unwrap_or(false)
    }
}
