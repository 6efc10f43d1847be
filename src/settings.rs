use crate::errors::{HabitError, StoreError};
use crate::models::UserSettings;
use crate::store::{DocumentRef, DocumentSnapshot, DocumentStore, Fields};
use crate::subscription::Subscription;
use serde_json::Value;

const CORE_HABIT_FIELD: &str = "coreHabitDescription";

pub fn settings_ref(user_id: &str) -> Result<DocumentRef, StoreError> {
    DocumentRef::new(&format!("users/{user_id}"))
}

pub fn settings_from_snapshot(snapshot: &DocumentSnapshot) -> UserSettings {
    UserSettings {
        core_habit_description: snapshot
            .get(CORE_HABIT_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned),
    }
}

pub fn watch_settings<F>(
    store: &DocumentStore,
    user_id: &str,
    mut on_change: F,
) -> Result<Subscription, StoreError>
where
    F: FnMut(Result<UserSettings, StoreError>) + Send + 'static,
{
    let doc = settings_ref(user_id)?;
    Ok(store.on_document_snapshot(doc, move |snapshot| {
        on_change(snapshot.map(|snapshot| settings_from_snapshot(&snapshot)))
    }))
}

/// Merges the trimmed description into the user's settings and returns it.
pub async fn save_core_habit(
    store: Option<&DocumentStore>,
    user_id: Option<&str>,
    input: &str,
) -> Result<String, HabitError> {
    let description = input.trim();
    let (Some(store), Some(user_id)) = (store, user_id) else {
        return Err(HabitError::MissingDescription);
    };
    if description.is_empty() {
        return Err(HabitError::MissingDescription);
    }

    let mut fields = Fields::new();
    fields.insert(CORE_HABIT_FIELD.to_owned(), Value::String(description.to_owned()));
    store.set_merge(&settings_ref(user_id)?, fields).await?;
    Ok(description.to_owned())
}
