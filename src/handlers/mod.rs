pub mod events;
pub mod interactions;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{any, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::middleware::verify_interaction;
use crate::AppState;

pub use events::{create_event, get_events};
pub use interactions::handle_interaction;

/// Flyer plus ten mapping images.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub fn router(state: AppState) -> Router {
    let flyers = ServeDir::new(state.uploads.root().join("flyers"));
    let mapping = ServeDir::new(state.uploads.root().join("mapping"));
    let public = ServeDir::new(&state.config.public_dir);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/events", get(get_events))
        .route(
            "/api/event",
            post(create_event).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/interactions",
            post(handle_interaction).layer(from_fn_with_state(state.clone(), verify_interaction)),
        )
        .nest_service("/uploads/flyers", flyers)
        .nest_service("/uploads/mapping", mapping)
        // the default UPLOADS_DIR sits inside PUBLIC_DIR; keep staged files out of the fallback
        .route("/uploads/incoming", any(not_found))
        .route("/uploads/incoming/*path", any(not_found))
        .fallback_service(public)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
