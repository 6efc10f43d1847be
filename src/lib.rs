pub mod app;
pub mod config;
pub mod errors;
pub mod form;
pub mod handlers;
pub mod identity;
pub mod journal;
pub mod models;
pub mod progress;
pub mod session;
pub mod settings;
pub mod state;
pub mod store;
pub mod subscription;
pub mod ui;

pub use app::router;
pub use config::JournalConfig;
pub use session::JournalSession;
pub use state::AppState;
