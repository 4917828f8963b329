//! # Syllabus Core
//!
//! Domain layer of the Syllabus catalog service: models and request
//! validation for the course catalog, geo reference data and users, the
//! slug and geo resolvers, and the PostgreSQL repositories behind them.
//!
//! - [`catalog`]: categories, subcategories, courses, chapters, sections and media
//! - [`geo`]: countries, states, cities/districts and towns
//! - [`users`]: users and their optional creator profile
//! - [`slug`]: scoped slug generation
//! - [`database`]: pool wrapper and repositories

pub mod catalog;
pub mod database;
pub mod error;
pub mod geo;
pub mod query;
pub mod serde_ext;
pub mod slug;
pub mod users;
pub mod validation;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use error::{CatalogError, Result};
pub use validation::{Validate, ValidationErrors};
