//! Download artifact for completed results.

use chrono::NaiveDate;
use docextract_core::{ExtractionResult, ExtractionState, Result};
use serde_json::{json, Value};

/// `extraction-results-<YYYY-MM-DD>.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("extraction-results-{}.json", date.format("%Y-%m-%d"))
}

/// JSON array of every completed entry. Entries still processing or in error
/// are left out; with nothing completed the array is empty.
pub fn completed_results(entries: &[ExtractionResult]) -> Value {
    Value::Array(
        entries
            .iter()
            .filter_map(|entry| match &entry.state {
                ExtractionState::Completed(extraction) => Some(json!({
                    "fileName": entry.file_name,
                    "status": entry.status(),
                    "data": extraction.data,
                    "extractedText": extraction.extracted_text,
                    "entities": extraction.entities,
                })),
                _ => None,
            })
            .collect(),
    )
}

/// Pretty-printed export document.
pub fn export_json(entries: &[ExtractionResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&completed_results(entries))?)
}
