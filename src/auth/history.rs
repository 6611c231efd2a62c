use std::ops::Deref;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Maximum number of logins remembered per user.
pub const LOGIN_HISTORY_CAPACITY: usize = 8;

/// One successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub date_time: OffsetDateTime,
    pub user_agent: String,
}

impl LoginEntry {
    pub fn now(user_agent: impl Into<String>) -> Self {
        Self {
            date_time: OffsetDateTime::now_utc(),
            user_agent: user_agent.into(),
        }
    }
}

/// Newest-first list of logins, never longer than [`LOGIN_HISTORY_CAPACITY`].
///
/// Deserializing a longer list keeps only the newest entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LoginEntry>", into = "Vec<LoginEntry>")]
pub struct LoginHistory(Vec<LoginEntry>);

impl LoginHistory {
    pub fn new() -> Self {
        Self(Vec::with_capacity(LOGIN_HISTORY_CAPACITY))
    }

    /// Evicts the oldest entry when full, then puts `entry` at the front.
    pub fn record(&mut self, entry: LoginEntry) {
        self.0.truncate(LOGIN_HISTORY_CAPACITY - 1);
        self.0.insert(0, entry);
    }
}

impl Deref for LoginHistory {
    type Target = [LoginEntry];

    fn deref(&self) -> &[LoginEntry] {
        &self.0
    }
}

impl From<Vec<LoginEntry>> for LoginHistory {
    fn from(mut entries: Vec<LoginEntry>) -> Self {
        entries.truncate(LOGIN_HISTORY_CAPACITY);
        Self(entries)
    }
}

impl From<LoginHistory> for Vec<LoginEntry> {
    fn from(history: LoginHistory) -> Self {
        history.0
    }
}
