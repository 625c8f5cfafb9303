//! Extraction data model shared by the gateway, orchestrator, and server.

use serde::{Deserialize, Serialize};

/// A single file submitted for extraction, together with the caller's API key.
#[derive(Clone)]
pub struct ExtractionRequest {
    pub file_bytes: Vec<u8>,
    pub file_name: String,
    /// MIME type as reported by the uploader.
    pub file_type: String,
    pub credential: String,
}

impl ExtractionRequest {
    pub fn new(
        file_bytes: Vec<u8>,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            file_bytes,
            file_name: file_name.into(),
            file_type: file_type.into(),
            credential: credential.into(),
        }
    }

    pub fn file_size(&self) -> u64 {
        self.file_bytes.len() as u64
    }
}

impl std::fmt::Debug for ExtractionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionRequest")
            .field("file_name", &self.file_name)
            .field("file_type", &self.file_type)
            .field("file_size", &self.file_bytes.len())
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// A normalized fact pulled out of the upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub value: String,
    /// Best-effort score in `[0, 1]`; 0 when the upstream reports none.
    pub confidence: f64,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            entity_type: entity_type.into(),
            value: value.into(),
            confidence,
        }
    }
}

/// Normalized output of one successful extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    /// The untouched upstream JSON payload.
    pub data: serde_json::Value,
    #[serde(rename = "extractedText")]
    pub extracted_text: String,
    pub entities: Vec<Entity>,
    #[serde(rename = "fileSize")]
    pub file_size: u64,
    /// RFC 3339 timestamp.
    #[serde(rename = "processedAt")]
    pub processed_at: String,
}

/// Gateway success body: `{data, extractedText, entities, fileName, fileSize, processedAt}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResponse {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(flatten)]
    pub extraction: Extraction,
}

/// Lifecycle status of a submitted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Processing,
    Completed,
    Error,
}

impl std::fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Status plus the data that only exists in that status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExtractionState {
    Processing,
    Completed(Extraction),
    Error {
        #[serde(rename = "errorMessage")]
        message: String,
    },
}

/// Per-file record tracked by a batch session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(flatten)]
    pub state: ExtractionState,
}

impl ExtractionResult {
    /// A freshly queued entry.
    pub fn processing(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            state: ExtractionState::Processing,
        }
    }

    pub fn status(&self) -> ExtractionStatus {
        match self.state {
            ExtractionState::Processing => ExtractionStatus::Processing,
            ExtractionState::Completed(_) => ExtractionStatus::Completed,
            ExtractionState::Error { .. } => ExtractionStatus::Error,
        }
    }

    /// True once the entry reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.status() != ExtractionStatus::Processing
    }

    pub fn extraction(&self) -> Option<&Extraction> {
        match &self.state {
            ExtractionState::Completed(extraction) => Some(extraction),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            ExtractionState::Error { message } => Some(message),
            _ => None,
        }
    }
}

/// Aggregate batch progress, derived from entry statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: usize,
    pub settled: usize,
    /// Whole percent, 0..=100. An empty batch reports 100.
    pub percent: u8,
}

impl Progress {
    pub fn from_counts(total: usize, settled: usize) -> Self {
        let percent = if total == 0 {
            100
        } else {
            ((settled.min(total) * 100) / total) as u8
        };
        Self {
            total,
            settled,
            percent,
        }
    }

    pub fn is_done(&self) -> bool {
        self.settled >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_extraction() -> Extraction {
        Extraction {
            data: serde_json::json!({"predictions": []}),
            extracted_text: "hello".into(),
            entities: vec![Entity::new("NAME", "Jane", 0.9)],
            file_size: 12,
            processed_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_processing_result_shape() {
        let json = serde_json::to_value(ExtractionResult::processing("a.pdf")).unwrap();
        assert_eq!(json, serde_json::json!({"fileName": "a.pdf", "status": "processing"}));
    }

    #[test]
    fn test_completed_result_shape() {
        let result = ExtractionResult {
            file_name: "a.pdf".into(),
            state: ExtractionState::Completed(sample_extraction()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["fileName"], "a.pdf");
        assert_eq!(json["extractedText"], "hello");
        assert_eq!(json["entities"][0]["type"], "NAME");
        assert_eq!(json["entities"][0]["confidence"], 0.9);
        assert!(json["data"]["predictions"].is_array());
        assert!(json.get("errorMessage").is_none());
    }

    #[test]
    fn test_error_result_shape() {
        let result = ExtractionResult {
            file_name: "b.png".into(),
            state: ExtractionState::Error {
                message: "boom".into(),
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"fileName": "b.png", "status": "error", "errorMessage": "boom"})
        );
        assert_eq!(result.status(), ExtractionStatus::Error);
        assert!(result.is_settled());
    }

    #[test]
    fn test_response_wire_shape() {
        let response = ExtractionResponse {
            file_name: "a.pdf".into(),
            extraction: sample_extraction(),
        };
        let json = serde_json::to_value(&response).unwrap();
        for key in ["data", "extractedText", "entities", "fileName", "fileSize", "processedAt"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(Progress::from_counts(4, 1).percent, 25);
        assert_eq!(Progress::from_counts(3, 3).percent, 100);
        assert_eq!(Progress::from_counts(0, 0).percent, 100);
        assert!(!Progress::from_counts(2, 1).is_done());
    }

    #[test]
    fn test_request_debug_redacts_credential() {
        let req = ExtractionRequest::new(vec![1, 2, 3], "a.pdf", "application/pdf", "sk-secret");
        let debug = format!("{:?}", req);
        assert!(!debug.contains("sk-secret"));
        assert_eq!(req.file_size(), 3);
    }
}
