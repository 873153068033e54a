//! Route configuration and setup.

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use depot_core::Config;

use crate::handlers::{files, objects, uploads};
use crate::state::AppState;

// Multipart framing overhead on top of the chunk payload itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let mut api = Router::new()
        .route("/api/v0/uploads/init", post(uploads::init_upload))
        .route(
            "/api/v0/uploads/{upload_id}/chunks/{chunk_index}",
            post(uploads::upload_chunk),
        )
        .route(
            "/api/v0/uploads/{upload_id}/complete",
            post(uploads::complete_upload),
        )
        .route("/api/v0/files", get(files::list_files))
        .route(
            "/api/v0/files/{id}",
            get(files::get_file).delete(files::delete_file),
        )
        .route("/api/v0/files/{id}/status", get(files::get_status))
        .route("/api/v0/files/{id}/retry", post(files::retry_file))
        .route("/health", get(health_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        );

    if state.local.is_some() {
        api = api.route("/objects/{bucket}/{*key}", get(objects::serve_object));
    }

    let app = api
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(RequestBodyLimitLayer::new(
            config.max_chunk_size_bytes + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "depot-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
