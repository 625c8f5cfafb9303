//! docextract HTTP server: single-file extraction and batch sessions.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::{spawn_batch_sweeper, AppState};
