use std::sync::Arc;

use axum::{Extension, Json};
use gitdrop_core::Uploader;
use serde_json::{json, Value};

#[tracing::instrument(name = "http::health", skip_all)]
pub async fn health(Extension(uploader): Extension<Arc<Uploader>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "githubTokenConfigured": uploader.has_token(),
    }))
}
