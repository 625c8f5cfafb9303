//! Orchestrator: fans a batch out into independent per-file extractions.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use docextract_core::{Error, ExtractionRequest, Extractor, Progress, Result};
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::ExtractionSession;

/// One uploaded file awaiting dispatch.
#[derive(Debug, Clone)]
pub struct SubmittedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl SubmittedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// A dispatched batch: the live session plus one task per file.
///
/// Dropping the handle does not cancel anything; the tasks keep running and
/// keep writing into the session.
pub struct Dispatch {
    pub session: Arc<ExtractionSession>,
    handles: Vec<JoinHandle<()>>,
}

impl Dispatch {
    /// Wait for every file in the batch to settle.
    pub async fn join(self) -> Arc<ExtractionSession> {
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                warn!("Extraction task ended abnormally: {}", e);
            }
        }
        self.session
    }
}

/// Dispatches batches against an [`Extractor`].
pub struct Orchestrator<E: Extractor> {
    extractor: Arc<E>,
}

impl<E: Extractor> Clone for Orchestrator<E> {
    fn clone(&self) -> Self {
        Self {
            extractor: self.extractor.clone(),
        }
    }
}

impl<E: Extractor> Orchestrator<E> {
    pub fn new(extractor: Arc<E>) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &Arc<E> {
        &self.extractor
    }

    /// Validate the batch, then spawn one extraction per file without waiting
    /// for any of them.
    ///
    /// Validation failures return before any task is spawned. Must be called
    /// from within a Tokio runtime.
    pub fn submit(&self, files: Vec<SubmittedFile>, credential: &str) -> Result<Dispatch> {
        if credential.trim().is_empty() {
            return Err(Error::InvalidInput("API key is required".into()));
        }
        if files.is_empty() {
            return Err(Error::InvalidInput("At least one file is required".into()));
        }

        let session = Arc::new(ExtractionSession::new(files.iter().map(|f| f.name.clone())));
        info!("Dispatching batch {} with {} file(s)", session.id(), files.len());

        let handles = files
            .into_iter()
            .enumerate()
            .map(|(index, file)| {
                let request =
                    ExtractionRequest::new(file.bytes, file.name, file.content_type, credential);
                tokio::spawn(run_one(
                    self.extractor.clone(),
                    session.clone(),
                    index,
                    request,
                ))
            })
            .collect();

        Ok(Dispatch { session, handles })
    }
}

/// Extract one file and record the outcome at `index`. Panics inside the
/// extractor are caught and recorded as that file's error.
async fn run_one<E: Extractor>(
    extractor: Arc<E>,
    session: Arc<ExtractionSession>,
    index: usize,
    request: ExtractionRequest,
) {
    let file_name = request.file_name.clone();
    let outcome = AssertUnwindSafe(extractor.extract(request))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(extraction)) => {
            debug!(
                "Completed {} ({} entities)",
                file_name,
                extraction.entities.len()
            );
            session.complete(index, extraction);
        }
        Ok(Err(e)) => {
            warn!("Extraction failed for {}: {}", file_name, e);
            session.fail(index, e.to_string());
        }
        Err(_) => {
            warn!("Extraction panicked for {}", file_name);
            session.fail(index, "Internal error while processing file");
        }
    }
}

/// Sample batch progress every `interval` and log it until every file has
/// settled. Observational only.
pub fn spawn_progress_monitor(
    session: Arc<ExtractionSession>,
    interval: Duration,
) -> JoinHandle<Progress> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        loop {
            ticker.tick().await;
            let progress = session.progress();
            debug!(
                "Batch {}: {}/{} settled ({}%)",
                session.id(),
                progress.settled,
                progress.total,
                progress.percent
            );
            if progress.is_done() {
                info!("Batch {} finished: {} file(s)", session.id(), progress.total);
                return progress;
            }
        }
    })
}
