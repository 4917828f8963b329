pub mod sources;

use std::path::PathBuf;
use std::time::Duration;

/// Fully composed runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub cache: CacheConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty()
            || self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

/// Settings for the country listing read-through cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub country_ttl: Duration,
    pub country_capacity: u64,
}

impl CacheConfig {
    pub fn country_cache_enabled(&self) -> bool {
        !self.country_ttl.is_zero() && self.country_capacity > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

pub fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn default_cors_headers() -> Vec<String> {
    ["content-type", "accept", "authorization"]
        .into_iter()
        .map(String::from)
        .collect()
}
