use moka::future::Cache;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use syllabus_config::CacheConfig;
use syllabus_core::geo::CountryWithCounts;
use syllabus_core::query::Page;

pub type CountryPage = Arc<Page<CountryWithCounts>>;

/// Read-through cache for the country listing, keyed by the normalized
/// query. Entries only expire by TTL; geo upserts do not invalidate them.
#[derive(Clone)]
pub struct CountryCache {
    inner: Option<Cache<String, CountryPage>>,
}

impl CountryCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { inner: Some(inner) }
    }

    /// Every lookup goes straight to the loader.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        if config.country_cache_enabled() {
            Self::new(config.country_ttl, config.country_capacity)
        } else {
            Self::disabled()
        }
    }

    pub async fn get_or_load<F, Fut>(&self, key: String, load: F) -> syllabus_core::Result<CountryPage>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = syllabus_core::Result<Page<CountryWithCounts>>>,
    {
        let Some(cache) = &self.inner else {
            return load().await.map(Arc::new);
        };

        if let Some(hit) = cache.get(&key).await {
            debug!(target: "catalog::geo", key = %key, "country cache hit");
            return Ok(hit);
        }

        let page = Arc::new(load().await?);
        cache.insert(key, page.clone()).await;
        Ok(page)
    }
}

impl fmt::Debug for CountryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountryCache")
            .field("enabled", &self.inner.is_some())
            .field(
                "entries",
                &self.inner.as_ref().map(|cache| cache.entry_count()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use syllabus_core::geo::requests::COUNTRY_PAGE;
    use syllabus_core::query::PageRequest;

    fn empty_page() -> Page<CountryWithCounts> {
        Page::new(Vec::new(), PageRequest::new(None, None, COUNTRY_PAGE), 0)
    }

    async fn load_counted(
        cache: &CountryCache,
        key: &str,
        calls: &AtomicUsize,
    ) -> CountryPage {
        cache
            .get_or_load(key.to_string(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(empty_page())
            })
            .await
            .expect("loader succeeds")
    }

    #[tokio::test]
    async fn repeated_queries_hit_the_cache() {
        let cache = CountryCache::new(Duration::from_secs(60), 16);
        let calls = AtomicUsize::new(0);

        load_counted(&cache, "q=in", &calls).await;
        load_counted(&cache, "q=in", &calls).await;
        load_counted(&cache, "q=us", &calls).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_cache_always_loads() {
        let cache = CountryCache::disabled();
        let calls = AtomicUsize::new(0);

        load_counted(&cache, "q=in", &calls).await;
        load_counted(&cache, "q=in", &calls).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn loader_errors_are_not_cached() {
        let cache = CountryCache::new(Duration::from_secs(60), 16);
        let failed = cache
            .get_or_load("q=x".into(), || async {
                Err(syllabus_core::CatalogError::Internal("down".into()))
            })
            .await;
        assert!(failed.is_err());

        let calls = AtomicUsize::new(0);
        load_counted(&cache, "q=x", &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
