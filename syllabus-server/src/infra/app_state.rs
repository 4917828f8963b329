use std::{fmt, sync::Arc};

use syllabus_config::Config;
use syllabus_core::database::PostgresDatabase;

use super::cache::CountryCache;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<PostgresDatabase>,
    pub config: Arc<Config>,
    pub countries: CountryCache,
}

impl AppState {
    pub fn new(db: Arc<PostgresDatabase>, config: Arc<Config>) -> Self {
        let countries = CountryCache::from_config(&config.cache);
        Self {
            db,
            config,
            countries,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db)
            .field("countries", &self.countries)
            .finish_non_exhaustive()
    }
}
