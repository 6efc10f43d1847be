use crate::errors::StoreError;
use crate::models::{JournalEntry, NewJournalEntry};
use crate::store::{server_timestamp, CollectionRef, Direction, DocumentSnapshot, DocumentStore, Fields, Query};
use crate::subscription::Subscription;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub fn entries_ref(user_id: &str) -> Result<CollectionRef, StoreError> {
    CollectionRef::new(&format!("users/{user_id}/journalEntries"))
}

pub fn entries_query(user_id: &str) -> Result<Query, StoreError> {
    Ok(entries_ref(user_id)?.order_by("date", Direction::Descending))
}

/// Maps a stored record, replacing anything absent or malformed with a default.
pub fn entry_from_snapshot(snapshot: &DocumentSnapshot) -> JournalEntry {
    let text = |field: &str| snapshot.get(field).map(value_to_text).unwrap_or_default();

    JournalEntry {
        id: snapshot.id.clone(),
        date: text("date"),
        focus_score: snapshot.get("focusScore").and_then(value_to_int),
        top_priority: text("topPriority"),
        sales_activity_count: snapshot
            .get("salesActivityCount")
            .and_then(value_to_int)
            .unwrap_or(0),
        core_habit_done: snapshot
            .get("coreHabitDone")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        win_of_the_day: text("winOfTheDay"),
        lesson_learned: text("lessonLearned"),
        created_at: snapshot
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|stamp| stamp.with_timezone(&Utc)),
    }
}

pub fn watch_entries<F>(
    store: &DocumentStore,
    user_id: &str,
    mut on_change: F,
) -> Result<Subscription, StoreError>
where
    F: FnMut(Result<Vec<JournalEntry>, StoreError>) + Send + 'static,
{
    let query = entries_query(user_id)?;
    Ok(store.on_query_snapshot(query, move |docs| {
        on_change(docs.map(|docs| docs.iter().map(entry_from_snapshot).collect()))
    }))
}

pub async fn append_entry(
    store: &DocumentStore,
    user_id: &str,
    entry: &NewJournalEntry,
) -> Result<String, StoreError> {
    let mut fields = Fields::new();
    fields.insert("date".into(), entry.date.clone().into());
    fields.insert("focusScore".into(), entry.focus_score.into());
    fields.insert("topPriority".into(), entry.top_priority.clone().into());
    fields.insert("salesActivityCount".into(), entry.sales_activity_count.into());
    fields.insert("coreHabitDone".into(), entry.core_habit_done.into());
    fields.insert("winOfTheDay".into(), entry.win_of_the_day.clone().into());
    fields.insert("lessonLearned".into(), entry.lesson_learned.clone().into());
    fields.insert("createdAt".into(), server_timestamp());

    let doc = store.add(&entries_ref(user_id)?, fields).await?;
    Ok(doc.id().to_owned())
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

/// Numbers truncate toward zero; numeric strings are parsed whole.
fn value_to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(text) => {
            let trimmed = text.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use serde_json::json;

    fn snapshot(data: Value) -> DocumentSnapshot {
        DocumentSnapshot {
            id: "doc1".into(),
            data: data.as_object().cloned(),
        }
    }

    #[test]
    fn complete_record_maps_every_field() {
        let entry = entry_from_snapshot(&snapshot(json!({
            "date": "2025-01-01",
            "focusScore": 4,
            "topPriority": "proposal",
            "salesActivityCount": 12,
            "coreHabitDone": true,
            "winOfTheDay": "closed",
            "lessonLearned": "focus",
            "createdAt": "2025-01-01T09:30:00.000Z"
        })));
        assert_eq!(entry.id, "doc1");
        assert_eq!(entry.focus_score, Some(4));
        assert_eq!(entry.sales_activity_count, 12);
        assert!(entry.core_habit_done);
        assert_eq!(entry.lesson_learned, "focus");
        assert!(entry.created_at.is_some());
    }

    #[test]
    fn malformed_record_gets_safe_defaults() {
        let entry = entry_from_snapshot(&snapshot(json!({
            "focusScore": "lots",
            "salesActivityCount": null,
            "coreHabitDone": "yes",
            "topPriority": ["nested"]
        })));
        assert_eq!(entry.date, "");
        assert_eq!(entry.focus_score, None);
        assert_eq!(entry.display_focus_score(), 0);
        assert_eq!(entry.sales_activity_count, 0);
        assert!(!entry.core_habit_done);
        assert_eq!(entry.top_priority, "");
        assert_eq!(entry.created_at, None);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let entry = entry_from_snapshot(&snapshot(json!({
            "focusScore": "3",
            "salesActivityCount": 7.9
        })));
        assert_eq!(entry.focus_score, Some(3));
        assert_eq!(entry.sales_activity_count, 7);
    }

    #[tokio::test]
    async fn appended_entries_arrive_newest_date_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(&StoreConfig {
            data_path: dir.path().join("store.json"),
        })
        .await
        .unwrap();

        for date in ["2025-01-01", "2025-01-03", "2025-01-02"] {
            let entry = NewJournalEntry {
                date: date.into(),
                focus_score: 3,
                top_priority: "p".into(),
                sales_activity_count: 1,
                core_habit_done: true,
                win_of_the_day: "w".into(),
                lesson_learned: "l".into(),
            };
            append_entry(&store, "u1", &entry).await.unwrap();
        }

        let docs = store.get_query(&entries_query("u1").unwrap()).await.unwrap();
        let entries: Vec<_> = docs.iter().map(entry_from_snapshot).collect();
        let dates: Vec<_> = entries.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, ["2025-01-03", "2025-01-02", "2025-01-01"]);
        assert!(entries.iter().all(|e| e.created_at.is_some()));
    }
}
