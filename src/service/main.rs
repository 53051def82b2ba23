use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gitdrop::http::http_router;
use gitdrop::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    let config = ServiceConfig::from_env()?;

    if config.github_token.is_none() {
        tracing::warn!("GITHUB_TOKEN is not set; every upload will be refused");
    }

    let uploader = Arc::new(config.uploader()?);

    let tracing_layer = ServiceBuilder::new().layer(TraceLayer::new_for_http().make_span_with(
        |request: &Request<Body>| {
            tracing::info_span!(
                "http",
                http.method = %request.method(),
                http.url = %request.uri(),
            )
        },
    ));

    let router = http_router(uploader).layer(tracing_layer);

    tracing::info!(
        "upload relay listening on {} (github api {})",
        config.endpoint,
        config.github_api_url
    );

    axum::Server::bind(&config.endpoint)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}
