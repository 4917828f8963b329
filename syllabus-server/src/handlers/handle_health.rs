use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::warn;

use crate::infra::{app_state::AppState, errors::AppError};

/// Liveness plus a database round trip. Answers 503 when the ping fails.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let mut health = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {}
    });

    let status = match state.db.ping().await {
        Ok(()) => {
            health["checks"]["database"] = json!({
                "status": "healthy",
                "pool": state.db.pool_stats(),
            });
            StatusCode::OK
        }
        Err(err) => {
            warn!(error = %err, "health check database ping failed");
            health["status"] = json!("unhealthy");
            health["checks"]["database"] = json!({
                "status": "unhealthy",
                "error": err.to_string(),
            });
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    (status, Json(health))
}

/// Unknown routes answer with the error envelope.
pub async fn not_found_handler() -> AppError {
    AppError::not_found("Route not found")
}
