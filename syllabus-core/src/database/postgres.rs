use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::fmt;
use std::time::Duration;
use tracing::info;

use super::repositories::{
    PostgresAssetRepository, PostgresCategoryRepository, PostgresChapterRepository,
    PostgresCourseRepository, PostgresGeoRepository, PostgresSectionRepository,
    PostgresSubcategoryRepository, PostgresUserRepository,
};
use crate::error::{CatalogError, Result};

/// Statistics about the connection pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: u32,
    pub max_size: u32,
    pub min_idle: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
    max_connections: u32,
    min_connections: u32,
    categories: PostgresCategoryRepository,
    subcategories: PostgresSubcategoryRepository,
    courses: PostgresCourseRepository,
    chapters: PostgresChapterRepository,
    sections: PostgresSectionRepository,
    assets: PostgresAssetRepository,
    geo: PostgresGeoRepository,
    users: PostgresUserRepository,
}

impl fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish()
    }
}

impl PostgresDatabase {
    pub async fn connect(connection_string: &str, settings: PoolSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .max_lifetime(Duration::from_secs(1800))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(connection_string)
            .await
            .map_err(|e| CatalogError::Internal(format!("Database connection failed: {e}")))?;

        info!(
            max_connections = settings.max_connections,
            min_connections = settings.min_connections,
            "database pool initialized"
        );
        Ok(Self::with_limits(
            pool,
            settings.max_connections,
            settings.min_connections,
        ))
    }

    /// Pool that connects on first use; nothing is dialed here.
    pub fn connect_lazy(connection_string: &str, settings: PoolSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_lazy(connection_string)
            .map_err(|e| CatalogError::Internal(format!("Invalid database url: {e}")))?;
        Ok(Self::with_limits(pool, settings.max_connections, 0))
    }

    /// Wrap an existing pool (tests hand one in from `sqlx::test`).
    pub fn from_pool(pool: PgPool) -> Self {
        let defaults = PoolSettings::default();
        Self::with_limits(pool, defaults.max_connections, defaults.min_connections)
    }

    fn with_limits(pool: PgPool, max_connections: u32, min_connections: u32) -> Self {
        Self {
            categories: PostgresCategoryRepository::new(pool.clone()),
            subcategories: PostgresSubcategoryRepository::new(pool.clone()),
            courses: PostgresCourseRepository::new(pool.clone()),
            chapters: PostgresChapterRepository::new(pool.clone()),
            sections: PostgresSectionRepository::new(pool.clone()),
            assets: PostgresAssetRepository::new(pool.clone()),
            geo: PostgresGeoRepository::new(pool.clone()),
            users: PostgresUserRepository::new(pool.clone()),
            pool,
            max_connections,
            min_connections,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn categories(&self) -> &PostgresCategoryRepository {
        &self.categories
    }

    pub fn subcategories(&self) -> &PostgresSubcategoryRepository {
        &self.subcategories
    }

    pub fn courses(&self) -> &PostgresCourseRepository {
        &self.courses
    }

    pub fn chapters(&self) -> &PostgresChapterRepository {
        &self.chapters
    }

    pub fn sections(&self) -> &PostgresSectionRepository {
        &self.sections
    }

    pub fn assets(&self) -> &PostgresAssetRepository {
        &self.assets
    }

    pub fn geo(&self) -> &PostgresGeoRepository {
        &self.geo
    }

    pub fn users(&self) -> &PostgresUserRepository {
        &self.users
    }

    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle() as u32,
            max_size: self.max_connections,
            min_idle: self.min_connections,
        }
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn initialize_schema(&self) -> Result<()> {
        crate::MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| CatalogError::Internal(format!("Migration failed: {e}")))?;
        info!("database migrations applied");
        Ok(())
    }
}
