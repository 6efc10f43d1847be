//! The journal page's live state.
//!
//! A session owns the store and identity handles, three listeners (identity,
//! settings document, entry collection) and the view state they feed. All
//! user actions go through it; failures end up in the single `notice` line.

use crate::config::JournalConfig;
use crate::errors::{HabitError, InitError, ValidationError};
use crate::form::{validate_draft, EntryDraft};
use crate::identity::{IdentityProvider, User};
use crate::journal::{append_entry, watch_entries};
use crate::models::{ActionOutcome, JournalEntry, Notice, UserSettings};
use crate::progress::{build_progress, Progress};
use crate::settings::{save_core_habit, watch_settings};
use crate::store::DocumentStore;
use crate::subscription::Subscription;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::{Duration, Instant},
};
use tracing::{debug, error, info};

pub const REWARD_DURATION: Duration = Duration::from_millis(3000);

const INIT_FAILED: &str = "Failed to initialize application. Please check the logs for details.";
const SIGN_IN_FAILED: &str = "Error signing in. Please try again.";
const ENTRIES_FAILED: &str = "Failed to load journal entries. Please try again.";
const ENTRY_SAVED: &str = "Journal entry saved successfully!";
const ENTRY_SAVE_FAILED: &str = "Error saving entry. Please try again.";
const HABIT_SET: &str = "Your Core Habit has been set!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Ready,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub phase: Phase,
    pub user_id: Option<String>,
    pub notice: Option<Notice>,
    /// Empty while no habit is defined.
    pub core_habit: String,
    pub habit_setup_open: bool,
    pub habit_input: String,
    pub reward_until: Option<Instant>,
    pub entries: Vec<JournalEntry>,
    pub draft: EntryDraft,
}

impl ViewState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            phase: Phase::Loading,
            user_id: None,
            notice: None,
            core_habit: String::new(),
            habit_setup_open: false,
            habit_input: String::new(),
            reward_until: None,
            entries: Vec::new(),
            draft: EntryDraft::fresh(today),
        }
    }

    pub fn reward_visible_at(&self, now: Instant) -> bool {
        self.reward_until.is_some_and(|until| now < until)
    }

    pub fn apply_settings(&mut self, settings: UserSettings) {
        match settings.core_habit_description.filter(|text| !text.is_empty()) {
            Some(description) => self.core_habit = description,
            None => {
                self.core_habit.clear();
                if self.phase == Phase::Ready && !self.habit_setup_open {
                    self.habit_setup_open = true;
                }
            }
        }
    }

    pub fn snapshot_at(&self, now: Instant) -> ViewSnapshot {
        ViewSnapshot {
            phase: self.phase,
            user_id: self.user_id.clone(),
            notice: self.notice.clone(),
            core_habit: Some(self.core_habit.clone()).filter(|habit| !habit.is_empty()),
            habit_setup_open: self.habit_setup_open,
            habit_input: self.habit_input.clone(),
            reward_visible: self.reward_visible_at(now),
            progress: build_progress(&self.entries),
            entries: self.entries.clone(),
            draft: self.draft.clone(),
        }
    }
}

/// Read-only copy of the view handed to renderers and the JSON API.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub phase: Phase,
    pub user_id: Option<String>,
    pub notice: Option<Notice>,
    pub core_habit: Option<String>,
    pub habit_setup_open: bool,
    pub habit_input: String,
    pub reward_visible: bool,
    pub progress: Progress,
    pub entries: Vec<JournalEntry>,
    pub draft: EntryDraft,
}

#[derive(Clone)]
pub struct JournalSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Option<DocumentStore>,
    identity: Option<IdentityProvider>,
    view: Arc<Mutex<ViewState>>,
    listeners: Mutex<Listeners>,
}

#[derive(Default)]
struct Listeners {
    auth: Option<Subscription>,
    user: Option<UserListeners>,
}

struct UserListeners {
    user_id: String,
    _settings: Subscription,
    _entries: Subscription,
}

impl JournalSession {
    /// Opens the providers and starts listening for the signed-in user.
    ///
    /// If either provider fails to open, the session stays in `Loading`
    /// with an error notice.
    pub async fn start(config: &JournalConfig) -> Self {
        let view = Arc::new(Mutex::new(ViewState::new(today())));

        let (store, identity) = match open_providers(config).await {
            Ok((store, identity)) => (Some(store), Some(identity)),
            Err(err) => {
                error!("failed to initialize application: {err}");
                lock(&view).notice = Some(Notice::error(INIT_FAILED));
                (None, None)
            }
        };

        let session = Self {
            inner: Arc::new(SessionInner {
                store,
                identity,
                view,
                listeners: Mutex::default(),
            }),
        };
        session.watch_identity();
        session
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.view().snapshot_at(Instant::now())
    }

    pub fn is_ready(&self) -> bool {
        self.view().phase == Phase::Ready
    }

    pub fn open_habit_setup(&self) {
        let mut view = self.view();
        if view.habit_input.is_empty() {
            view.habit_input = view.core_habit.clone();
        }
        view.habit_setup_open = true;
    }

    pub async fn set_core_habit(&self, input: &str) -> ActionOutcome {
        let user_id = {
            let mut view = self.view();
            view.habit_input = input.to_owned();
            view.user_id.clone()
        };

        match save_core_habit(self.inner.store.as_ref(), user_id.as_deref(), input).await {
            Ok(description) => {
                info!(habit = %description, "core habit set");
                let mut view = self.view();
                view.core_habit = description.clone();
                view.habit_input = description;
                view.habit_setup_open = false;
                view.notice = Some(Notice::success(HABIT_SET));
                ActionOutcome {
                    accepted: true,
                    message: HABIT_SET.to_owned(),
                }
            }
            Err(err) => {
                match &err {
                    HabitError::Store(store_err) => error!("failed to set core habit: {store_err}"),
                    HabitError::MissingDescription => debug!("core habit rejected: empty input"),
                }
                self.fail(err.to_string())
            }
        }
    }

    /// Validates and stores a daily entry.
    ///
    /// Nothing is written unless every check passes. On success the draft is
    /// reset to today's blank entry and the reward overlay is shown.
    pub async fn submit_entry(&self, draft: EntryDraft) -> ActionOutcome {
        let (user_id, core_habit) = {
            let mut view = self.view();
            view.notice = None;
            view.draft = draft.clone();
            (view.user_id.clone(), view.core_habit.clone())
        };

        let (Some(store), Some(user_id)) = (self.inner.store.as_ref(), user_id) else {
            return self.reject(ValidationError::NotReady);
        };

        let entry = match validate_draft(&draft, &core_habit) {
            Ok(entry) => entry,
            Err(err) => {
                if err == ValidationError::CoreHabitUndefined {
                    self.view().habit_setup_open = true;
                }
                return self.reject(err);
            }
        };

        match append_entry(store, &user_id, &entry).await {
            Ok(id) => {
                info!(%id, date = %entry.date, "journal entry saved");
                let mut view = self.view();
                view.notice = Some(Notice::success(ENTRY_SAVED));
                view.reward_until = Some(Instant::now() + REWARD_DURATION);
                view.draft = EntryDraft::fresh(today());
                ActionOutcome {
                    accepted: true,
                    message: ENTRY_SAVED.to_owned(),
                }
            }
            Err(err) => {
                error!("failed to save journal entry: {err}");
                self.fail(ENTRY_SAVE_FAILED)
            }
        }
    }

    /// Tears down every listener. The view keeps its last state.
    pub fn shutdown(&self) {
        let mut listeners = lock(&self.inner.listeners);
        if let Some(auth) = listeners.auth.take() {
            auth.unsubscribe();
        }
        listeners.user = None;
        debug!("session listeners disposed");
    }

    /// Terminates the document store. Listeners still attached report a
    /// read failure; later writes fail.
    pub fn close_store(&self) {
        if let Some(store) = self.inner.store.as_ref() {
            store.terminate();
            info!("document store closed");
        }
    }

    pub fn store(&self) -> Option<&DocumentStore> {
        self.inner.store.as_ref()
    }

    fn watch_identity(&self) {
        let Some(identity) = self.inner.identity.clone() else {
            return;
        };

        let session: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let mut receiver = identity.subscribe();
        let task = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let user = receiver.borrow_and_update().clone();
                let Some(inner) = session.upgrade() else {
                    break;
                };
                JournalSession { inner }.handle_auth_state(&identity, user).await;
            }
        });
        lock(&self.inner.listeners).auth = Some(Subscription::new(task));
    }

    async fn handle_auth_state(&self, identity: &IdentityProvider, user: Option<User>) {
        match user {
            Some(user) => {
                info!(uid = %user.uid, "user signed in");
                self.mark_ready();
                self.attach_user(&user.uid);
            }
            None => {
                if let Err(err) = identity.sign_in_anonymously().await {
                    error!("anonymous sign-in failed: {err}");
                    self.view().notice = Some(Notice::error(SIGN_IN_FAILED));
                }
                self.mark_ready();
            }
        }
    }

    /// Points the settings and entry listeners at `user_id`, replacing any
    /// listeners held for a previous user.
    fn attach_user(&self, user_id: &str) {
        let Some(store) = self.inner.store.as_ref() else {
            return;
        };

        let mut listeners = lock(&self.inner.listeners);
        if listeners.user.as_ref().is_some_and(|held| held.user_id == user_id) {
            return;
        }
        listeners.user = None;
        self.view().user_id = Some(user_id.to_owned());

        let settings_view = Arc::clone(&self.inner.view);
        let settings = watch_settings(store, user_id, move |result| match result {
            Ok(settings) => lock(&settings_view).apply_settings(settings),
            Err(err) => error!("failed to read user settings: {err}"),
        });

        let entries_view = Arc::clone(&self.inner.view);
        let entries = watch_entries(store, user_id, move |result| match result {
            Ok(entries) => {
                debug!(count = entries.len(), "journal entries updated");
                lock(&entries_view).entries = entries;
            }
            Err(err) => {
                error!("failed to read journal entries: {err}");
                lock(&entries_view).notice = Some(Notice::error(ENTRIES_FAILED));
            }
        });

        match (settings, entries) {
            (Ok(settings), Ok(entries)) => {
                listeners.user = Some(UserListeners {
                    user_id: user_id.to_owned(),
                    _settings: settings,
                    _entries: entries,
                });
            }
            (Err(err), _) | (_, Err(err)) => {
                error!(uid = user_id, "cannot listen for user data: {err}");
                self.view().notice = Some(Notice::error(ENTRIES_FAILED));
            }
        }
    }

    fn mark_ready(&self) {
        self.view().phase = Phase::Ready;
    }

    fn reject(&self, err: ValidationError) -> ActionOutcome {
        debug!("entry rejected: {err}");
        self.fail(err.to_string())
    }

    fn fail(&self, message: impl Into<String>) -> ActionOutcome {
        let message = message.into();
        self.view().notice = Some(Notice::error(message.clone()));
        ActionOutcome {
            accepted: false,
            message,
        }
    }

    fn view(&self) -> MutexGuard<'_, ViewState> {
        lock(&self.inner.view)
    }
}

async fn open_providers(config: &JournalConfig) -> Result<(DocumentStore, IdentityProvider), InitError> {
    let store = DocumentStore::open(&config.store).await?;
    let identity = IdentityProvider::initialize(&config.identity).await?;
    Ok((store, identity))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_view() -> ViewState {
        let mut view = ViewState::new(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        view.phase = Phase::Ready;
        view
    }

    #[test]
    fn missing_habit_opens_prompt_once_ready() {
        let mut view = ready_view();
        view.apply_settings(UserSettings::default());
        assert!(view.habit_setup_open);
        assert!(view.core_habit.is_empty());
    }

    #[test]
    fn missing_habit_during_loading_does_not_prompt() {
        let mut view = ViewState::new(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        view.apply_settings(UserSettings::default());
        assert!(!view.habit_setup_open);
    }

    #[test]
    fn empty_description_counts_as_missing() {
        let mut view = ready_view();
        view.core_habit = "old".into();
        view.apply_settings(UserSettings {
            core_habit_description: Some(String::new()),
        });
        assert!(view.core_habit.is_empty());
        assert!(view.habit_setup_open);
    }

    #[test]
    fn stored_habit_becomes_active() {
        let mut view = ready_view();
        view.apply_settings(UserSettings {
            core_habit_description: Some("call 10 leads".into()),
        });
        assert_eq!(view.core_habit, "call 10 leads");
        assert!(!view.habit_setup_open);
    }

    #[test]
    fn reward_is_visible_for_three_seconds() {
        let mut view = ready_view();
        let start = Instant::now();
        assert!(!view.reward_visible_at(start));

        view.reward_until = Some(start + REWARD_DURATION);
        assert!(view.reward_visible_at(start + Duration::from_millis(2999)));
        assert!(!view.reward_visible_at(start + REWARD_DURATION));
    }

    #[test]
    fn snapshot_hides_blank_habit() {
        let view = ready_view();
        let snapshot = view.snapshot_at(Instant::now());
        assert_eq!(snapshot.core_habit, None);
        assert_eq!(snapshot.draft.date, "2025-06-01");
        assert_eq!(snapshot.progress.days_completed, 0);
    }
}
