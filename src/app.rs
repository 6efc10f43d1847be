use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/entries", post(handlers::entry_form))
        .route("/habit", post(handlers::habit_form))
        .route("/habit/edit", post(handlers::habit_edit))
        .route("/api/session", get(handlers::get_session))
        .route("/api/entries", get(handlers::get_entries).post(handlers::post_entry))
        .route("/api/progress", get(handlers::get_progress))
        .route("/api/habit", post(handlers::post_habit))
        .with_state(state)
}
