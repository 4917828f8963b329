//! # Syllabus Server
//!
//! HTTP layer of the Syllabus catalog service. Every endpoint lives under
//! `/api/v1` and answers with the `{status, message, data, meta}` envelope;
//! `/health` sits outside the versioned tree.
//!
//! - [`routes`]: router assembly
//! - [`handlers`]: one module per resource family
//! - [`infra`]: application state, errors, extractors, response envelope and
//!   the country cache

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
pub use routes::create_app;
