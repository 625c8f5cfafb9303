//! Batch routes: many files, one independent extraction each.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use docextract_runtime::{export, spawn_progress_monitor};
use tracing::info;

use super::error_response;
use super::upload::UploadForm;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/batches", post(submit_batch))
        .route("/batches/{id}", get(get_batch).delete(delete_batch))
        .route("/batches/{id}/export", get(export_batch))
}

/// POST /api/batches: `files` parts plus `apiKey`; dispatches and returns at once.
async fn submit_batch(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(&e).into_response(),
    };
    let credential = match form.credential() {
        Ok(key) => key.to_string(),
        Err(e) => return error_response(&e).into_response(),
    };

    let names: Vec<String> = form.files.iter().map(|f| f.name.clone()).collect();
    let dispatch = match state.orchestrator.submit(form.files, &credential) {
        Ok(dispatch) => dispatch,
        Err(e) => return error_response(&e).into_response(),
    };

    let session = dispatch.session.clone();
    state.insert_batch(session.clone());
    spawn_progress_monitor(session.clone(), state.config.progress_interval);

    info!("Accepted batch {} ({} files)", session.id(), names.len());

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "batchId": session.id(),
            "total": names.len(),
            "files": names,
        })),
    )
        .into_response()
}

/// GET /api/batches/:id: per-file results plus derived progress.
async fn get_batch(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Some(session) = state.batch(&id) else {
        return not_found(&id);
    };

    Json(serde_json::json!({
        "batchId": session.id(),
        "createdAt": session.created_at(),
        "results": session.snapshot(),
        "progress": session.progress(),
    }))
    .into_response()
}

/// GET /api/batches/:id/export: completed results as a JSON download.
async fn export_batch(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Some(session) = state.batch(&id) else {
        return not_found(&id);
    };

    let body = match export::export_json(&session.snapshot()) {
        Ok(body) => body,
        Err(e) => return error_response(&e).into_response(),
    };
    let file_name = export::export_file_name(chrono::Utc::now().date_naive());

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

/// DELETE /api/batches/:id: discard a batch's results.
async fn delete_batch(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.remove_batch(&id) {
        Some(_) => Json(serde_json::json!({ "deleted": true, "batchId": id })).into_response(),
        None => not_found(&id),
    }
}

fn not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": format!("Batch not found: {}", id) })),
    )
        .into_response()
}
