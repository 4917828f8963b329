//! PostgreSQL persistence: the pool wrapper, one repository per resource and
//! the lookups backing the slug and geo resolvers.

pub mod geo_directory;
pub mod postgres;
pub mod repositories;
pub mod scoped;
pub mod slug_lookup;

pub use geo_directory::PgGeoDirectory;
pub use postgres::{PoolSettings, PoolStats, PostgresDatabase};
pub use slug_lookup::PgSlugLookup;
