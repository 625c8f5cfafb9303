//! Submission orchestration for batches of files.
//!
//! A batch dispatches one independent extraction per file, tracks each
//! file's status in a session keyed by position, and exports completed
//! results as a single JSON document.

pub mod export;
pub mod orchestrator;
pub mod session;

pub use orchestrator::{spawn_progress_monitor, Dispatch, Orchestrator, SubmittedFile};
pub use session::ExtractionSession;
