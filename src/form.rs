use crate::errors::ValidationError;
use crate::models::NewJournalEntry;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Editable daily-entry fields exactly as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryDraft {
    pub date: String,
    pub focus_score: String,
    pub top_priority: String,
    pub sales_activity_count: String,
    pub core_habit_done: bool,
    pub win_of_the_day: String,
    pub lesson_learned: String,
}

impl EntryDraft {
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            date: today.format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }
}

/// HTML form payload. Browsers omit unchecked checkboxes and send "on" otherwise.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EntryFormInput {
    pub date: String,
    pub focus_score: String,
    pub top_priority: String,
    pub sales_activity_count: String,
    pub core_habit_done: Option<String>,
    pub win_of_the_day: String,
    pub lesson_learned: String,
}

impl From<EntryFormInput> for EntryDraft {
    fn from(input: EntryFormInput) -> Self {
        Self {
            date: input.date,
            focus_score: input.focus_score,
            top_priority: input.top_priority,
            sales_activity_count: input.sales_activity_count,
            core_habit_done: input.core_habit_done.is_some_and(|value| value != "off"),
            win_of_the_day: input.win_of_the_day,
            lesson_learned: input.lesson_learned,
        }
    }
}

/// Runs the field checks in order and stops at the first failure.
///
/// Readiness (store and user present) is checked by the caller before this.
pub fn validate_draft(draft: &EntryDraft, core_habit: &str) -> Result<NewJournalEntry, ValidationError> {
    let required = [
        &draft.date,
        &draft.focus_score,
        &draft.top_priority,
        &draft.sales_activity_count,
        &draft.win_of_the_day,
        &draft.lesson_learned,
    ];
    if required.iter().any(|field| field.is_empty()) {
        return Err(ValidationError::MissingFields);
    }

    let focus_score = parse_leading_int(&draft.focus_score)
        .filter(|score| (1..=5).contains(score))
        .ok_or(ValidationError::FocusScoreOutOfRange)?;

    let sales_activity_count = parse_leading_int(&draft.sales_activity_count)
        .filter(|count| *count >= 0)
        .ok_or(ValidationError::NegativeSalesCount)?;

    if core_habit.is_empty() {
        return Err(ValidationError::CoreHabitUndefined);
    }

    Ok(NewJournalEntry {
        date: draft.date.clone(),
        focus_score,
        top_priority: draft.top_priority.clone(),
        sales_activity_count,
        core_habit_done: draft.core_habit_done,
        win_of_the_day: draft.win_of_the_day.clone(),
        lesson_learned: draft.lesson_learned.clone(),
    })
}

/// Parses the leading integer of `text`: "4" and " 4abc" give 4, "4.7" gives 4,
/// "abc" gives `None`. Digit runs too long for an `i64` saturate.
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
