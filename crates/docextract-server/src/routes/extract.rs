//! Single-file extraction: the gateway boundary.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use docextract_core::{Error, ExtractionRequest, ExtractionResponse};
use tracing::{info, warn};

use super::error_response;
use super::upload::UploadForm;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/extract", post(extract_file))
}

/// POST /api/extract: one `file` part plus an `apiKey` part.
async fn extract_file(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let request = match read_request(multipart).await {
        Ok(request) => request,
        Err(e) => return error_response(&e).into_response(),
    };

    let file_name = request.file_name.clone();
    info!("Extracting {} ({} bytes)", file_name, request.file_size());

    match state.gateway.extract(request).await {
        Ok(extraction) => (
            StatusCode::OK,
            Json(ExtractionResponse {
                file_name,
                extraction,
            }),
        )
            .into_response(),
        Err(e) => {
            warn!("Extraction failed for {}: {}", file_name, e);
            error_response(&e).into_response()
        }
    }
}

async fn read_request(multipart: Multipart) -> docextract_core::Result<ExtractionRequest> {
    let mut form = UploadForm::read(multipart).await?;
    let credential = form.credential()?.to_string();

    if form.files.len() > 1 {
        return Err(Error::InvalidInput(
            "Exactly one file per request; use /api/batches for several".into(),
        ));
    }
    let file = form
        .files
        .pop()
        .ok_or_else(|| Error::InvalidInput("No file provided".into()))?;

    Ok(ExtractionRequest::new(
        file.bytes,
        file.name,
        file.content_type,
        credential,
    ))
}
