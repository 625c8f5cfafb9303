//! Multipart form parsing shared by the extract and batch routes.

use axum::extract::Multipart;
use docextract_core::{Error, Result};
use docextract_runtime::SubmittedFile;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Files plus the API key from an upload form.
///
/// Any part carrying a filename is a file; the `apiKey` text part is the
/// credential. Other parts are ignored.
pub struct UploadForm {
    pub files: Vec<SubmittedFile>,
    pub credential: Option<String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut files = Vec::new();
        let mut credential = None;

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    return Err(Error::InvalidInput(format!("Malformed upload: {}", e)));
                }
            };

            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::InvalidInput(format!("Failed to read {}: {}", file_name, e)))?;
                files.push(SubmittedFile::new(file_name, content_type, bytes.to_vec()));
                continue;
            }

            if field.name() == Some("apiKey") {
                let value = field
                    .text()
                    .await
                    .map_err(|e| Error::InvalidInput(format!("Failed to read apiKey: {}", e)))?;
                credential = Some(value);
            }
        }

        Ok(Self { files, credential })
    }

    /// The credential, if present and not blank.
    pub fn credential(&self) -> Result<&str> {
        match self.credential.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::InvalidInput("API key is required".into())),
        }
    }
}
