use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use gitdrop_core::relay::UPLOAD_ROUTE;
use gitdrop_core::Uploader;

pub mod health;
pub mod upload;

pub fn http_router(uploader: Arc<Uploader>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(UPLOAD_ROUTE, post(upload::upload))
        .layer(Extension(uploader))
}
