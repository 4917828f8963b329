pub mod v1;

use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    handlers::handle_health::{health_handler, not_found_handler},
    infra::{app_state::AppState, cors::cors_layer},
};

/// Create the main API router with all versions
pub fn create_api_router() -> Router<AppState> {
    Router::new().nest("/api/v1", v1::create_v1_router())
}

/// The full application: versioned API, `/health`, tracing and CORS.
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors);

    Router::new()
        .route("/health", get(health_handler))
        .merge(create_api_router())
        .fallback(not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
