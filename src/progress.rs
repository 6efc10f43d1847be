use crate::models::JournalEntry;
use serde::Serialize;
use std::collections::BTreeSet;

pub const CHALLENGE_DAYS: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub days_completed: usize,
    pub total_days: usize,
    pub percentage: f64,
    pub rounded_percentage: u32,
    pub challenge_complete: bool,
}

pub fn build_progress(entries: &[JournalEntry]) -> Progress {
    let days_completed = days_completed(entries);
    let percentage = progress_percentage(days_completed);
    Progress {
        days_completed,
        total_days: CHALLENGE_DAYS,
        percentage,
        rounded_percentage: percentage.round() as u32,
        challenge_complete: days_completed >= CHALLENGE_DAYS,
    }
}

/// Distinct calendar dates that carry a numeric focus score, capped at the
/// challenge length. Only the date part of a datetime string counts.
pub fn days_completed(entries: &[JournalEntry]) -> usize {
    let dates: BTreeSet<&str> = entries
        .iter()
        .filter(|entry| entry.focus_score.is_some())
        .map(|entry| entry.date.split('T').next().unwrap_or_default())
        .filter(|date| !date.is_empty())
        .collect();
    dates.len().min(CHALLENGE_DAYS)
}

pub fn progress_percentage(days_completed: usize) -> f64 {
    days_completed as f64 / CHALLENGE_DAYS as f64 * 100.0
}
