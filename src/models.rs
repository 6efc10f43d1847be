use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored daily log, normalized from whatever the document holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub date: String,
    /// `None` when the stored score is missing or not a number.
    pub focus_score: Option<i64>,
    pub top_priority: String,
    pub sales_activity_count: i64,
    pub core_habit_done: bool,
    pub win_of_the_day: String,
    pub lesson_learned: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    pub fn display_focus_score(&self) -> i64 {
        self.focus_score.unwrap_or(0)
    }
}

/// A validated entry, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewJournalEntry {
    pub date: String,
    pub focus_score: i64,
    pub top_priority: String,
    pub sales_activity_count: i64,
    pub core_habit_done: bool,
    pub win_of_the_day: String,
    pub lesson_learned: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub core_habit_description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeTone {
    Success,
    Error,
}

/// The single user-facing message line. Newer messages replace older ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub text: String,
    pub tone: NoticeTone,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: NoticeTone::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: NoticeTone::Error,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HabitRequest {
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub accepted: bool,
    pub message: String,
}
