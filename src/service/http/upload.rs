use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, http::StatusCode, Extension, Json};
use gitdrop_core::uploader::UPLOAD_FAILED_MESSAGE;
use gitdrop_core::{RelayUploadRequest, RelayUploadResponse, UploadOutcome, Uploader};

/// Relays one file into GitHub. Every failure, whatever its cause, is a 500
/// with a message; the cause itself only goes to the log.
#[tracing::instrument(name = "http::upload", skip_all)]
pub async fn upload(
    Extension(uploader): Extension<Arc<Uploader>>,
    payload: Result<Json<RelayUploadRequest>, JsonRejection>,
) -> (StatusCode, Json<RelayUploadResponse>) {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!("rejecting upload body: {}", rejection);
            return failure(UPLOAD_FAILED_MESSAGE);
        }
    };

    let request = match payload.into_upload_request() {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(kind = err.kind(), "rejecting upload: {}", err);
            return failure(UPLOAD_FAILED_MESSAGE);
        }
    };

    match uploader.upload(&request).await {
        outcome @ UploadOutcome::Success { .. } => (
            StatusCode::OK,
            Json(RelayUploadResponse::new(&outcome.message())),
        ),
        outcome @ UploadOutcome::Failure { .. } => failure(&outcome.message()),
    }
}

fn failure(message: &str) -> (StatusCode, Json<RelayUploadResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(RelayUploadResponse::new(message)),
    )
}
