use crate::errors::AppError;
use crate::form::{EntryDraft, EntryFormInput};
use crate::models::{ActionOutcome, HabitRequest, JournalEntry};
use crate::progress::Progress;
use crate::session::ViewSnapshot;
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    extract::State,
    response::{Html, Redirect},
    Form, Json,
};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.session.snapshot()))
}

pub async fn entry_form(
    State(state): State<AppState>,
    Form(input): Form<EntryFormInput>,
) -> Redirect {
    state.session.submit_entry(EntryDraft::from(input)).await;
    Redirect::to("/")
}

pub async fn habit_form(
    State(state): State<AppState>,
    Form(request): Form<HabitRequest>,
) -> Redirect {
    state.session.set_core_habit(&request.description).await;
    Redirect::to("/")
}

pub async fn habit_edit(State(state): State<AppState>) -> Redirect {
    state.session.open_habit_setup();
    Redirect::to("/")
}

pub async fn get_session(State(state): State<AppState>) -> Json<ViewSnapshot> {
    Json(state.session.snapshot())
}

pub async fn get_entries(State(state): State<AppState>) -> Result<Json<Vec<JournalEntry>>, AppError> {
    let snapshot = ready_snapshot(&state)?;
    Ok(Json(snapshot.entries))
}

pub async fn get_progress(State(state): State<AppState>) -> Result<Json<Progress>, AppError> {
    let snapshot = ready_snapshot(&state)?;
    Ok(Json(snapshot.progress))
}

pub async fn post_entry(
    State(state): State<AppState>,
    Json(draft): Json<EntryDraft>,
) -> Json<ActionOutcome> {
    Json(state.session.submit_entry(draft).await)
}

pub async fn post_habit(
    State(state): State<AppState>,
    Json(request): Json<HabitRequest>,
) -> Json<ActionOutcome> {
    Json(state.session.set_core_habit(&request.description).await)
}

fn ready_snapshot(state: &AppState) -> Result<ViewSnapshot, AppError> {
    if !state.session.is_ready() {
        return Err(AppError::unavailable("application is still loading"));
    }
    Ok(state.session.snapshot())
}
