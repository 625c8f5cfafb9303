//! Per-batch result table.

use std::time::Instant;

use docextract_core::{Extraction, ExtractionResult, ExtractionState, Progress};
use parking_lot::RwLock;
use tracing::warn;

/// Results for one submitted batch, one entry per file, addressed by index.
///
/// Writers only ever replace the entry at their own index, and only while it
/// is still `processing`, so concurrent completions never touch siblings and
/// a settled entry never changes again.
pub struct ExtractionSession {
    id: String,
    created_at: String,
    entries: RwLock<Vec<ExtractionResult>>,
    /// Set when the last processing entry settles.
    settled_at: RwLock<Option<Instant>>,
}

impl ExtractionSession {
    pub fn new<I, S>(file_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            entries: RwLock::new(
                file_names
                    .into_iter()
                    .map(ExtractionResult::processing)
                    .collect(),
            ),
            settled_at: RwLock::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Mark entry `index` completed. Returns false if it had already settled
    /// or does not exist.
    pub fn complete(&self, index: usize, extraction: Extraction) -> bool {
        self.settle(index, ExtractionState::Completed(extraction))
    }

    /// Mark entry `index` failed. Returns false if it had already settled or
    /// does not exist.
    pub fn fail(&self, index: usize, message: impl Into<String>) -> bool {
        self.settle(
            index,
            ExtractionState::Error {
                message: message.into(),
            },
        )
    }

    fn settle(&self, index: usize, state: ExtractionState) -> bool {
        let mut entries = self.entries.write();
        match entries.get_mut(index) {
            Some(entry) if !entry.is_settled() => {
                entry.state = state;
                if entries.iter().all(|e| e.is_settled()) {
                    *self.settled_at.write() = Some(Instant::now());
                }
                true
            }
            Some(entry) => {
                warn!(
                    "Ignoring second transition for {} in batch {} (already {})",
                    entry.file_name,
                    self.id,
                    entry.status()
                );
                false
            }
            None => false,
        }
    }

    /// When every entry had settled, or `None` while any is still processing.
    pub fn settled_at(&self) -> Option<Instant> {
        *self.settled_at.read()
    }

    pub fn get(&self, index: usize) -> Option<ExtractionResult> {
        self.entries.read().get(index).cloned()
    }

    /// Copy of every entry, in submission order.
    pub fn snapshot(&self) -> Vec<ExtractionResult> {
        self.entries.read().clone()
    }

    /// Derived count of settled entries. Eventually consistent with the
    /// in-flight tasks; display only.
    pub fn progress(&self) -> Progress {
        let entries = self.entries.read();
        let settled = entries.iter().filter(|e| e.is_settled()).count();
        Progress::from_counts(entries.len(), settled)
    }
}
