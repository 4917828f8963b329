use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

use syllabus_config::CorsConfig;

/// Allow-list CORS from configuration. An empty or `*` origin list allows
/// any origin; credentials are never combined with a wildcard origin.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| match Method::from_bytes(m.trim().as_bytes()) {
            Ok(method) => Some(method),
            Err(_) => {
                warn!(method = %m, "ignoring invalid CORS method");
                None
            }
        })
        .collect();

    let headers: Vec<HeaderName> = config
        .allowed_headers
        .iter()
        .filter_map(|h| match HeaderName::from_bytes(h.trim().as_bytes()) {
            Ok(header) => Some(header),
            Err(_) => {
                warn!(header = %h, "ignoring invalid CORS header");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(AllowHeaders::list(headers));

    if config.allows_any_origin() {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin.trim()).ok())
        .collect();

    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(config.allow_credentials)
}
