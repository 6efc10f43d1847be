use crate::session::JournalSession;

#[derive(Clone)]
pub struct AppState {
    pub session: JournalSession,
}

impl AppState {
    pub fn new(session: JournalSession) -> Self {
        Self { session }
    }
}
