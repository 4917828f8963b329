use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::{parse_bool_var, parse_csv_var, parse_var, string_var};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub cors: FileCorsConfig,
    #[serde(default)]
    pub cache: FileCacheConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquire_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_migrations: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_methods: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_headers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCacheConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_ttl_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_capacity: Option<u64>,
}

/// Values read from the process environment. Every field is optional; unset
/// fields fall back to the file config and then to built-in defaults.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,

    pub server_host: Option<String>,
    pub server_port: Option<u16>,

    pub database_url: Option<String>,
    pub database_host: Option<String>,
    pub database_port: Option<u16>,
    pub database_user: Option<String>,
    pub database_password: Option<String>,
    pub database_name: Option<String>,
    pub database_max_connections: Option<u32>,
    pub database_min_connections: Option<u32>,
    pub database_acquire_timeout_secs: Option<u64>,
    pub run_migrations: Option<bool>,

    pub cors_allowed_origins: Option<Vec<String>>,
    pub cors_allowed_methods: Option<Vec<String>>,
    pub cors_allowed_headers: Option<Vec<String>>,
    pub cors_allow_credentials: Option<bool>,

    pub country_cache_ttl_secs: Option<u64>,
    pub country_cache_capacity: Option<u64>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: string_var("SYLLABUS_CONFIG").map(PathBuf::from),

            server_host: string_var("SERVER_HOST"),
            server_port: parse_var("SERVER_PORT"),

            database_url: string_var("DATABASE_URL"),
            database_host: string_var("DATABASE_HOST"),
            database_port: parse_var("DATABASE_PORT"),
            database_user: string_var("DATABASE_USER"),
            database_password: string_var("DATABASE_PASSWORD"),
            database_name: string_var("DATABASE_NAME"),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS"),
            database_min_connections: parse_var("DATABASE_MIN_CONNECTIONS"),
            database_acquire_timeout_secs: parse_var(
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
            ),
            run_migrations: parse_bool_var("RUN_MIGRATIONS"),

            cors_allowed_origins: parse_csv_var("CORS_ALLOWED_ORIGINS"),
            cors_allowed_methods: parse_csv_var("CORS_ALLOWED_METHODS"),
            cors_allowed_headers: parse_csv_var("CORS_ALLOWED_HEADERS"),
            cors_allow_credentials: parse_bool_var("CORS_ALLOW_CREDENTIALS"),

            country_cache_ttl_secs: parse_var("COUNTRY_CACHE_TTL_SECS"),
            country_cache_capacity: parse_var("COUNTRY_CACHE_CAPACITY"),
        }
    }
}
