pub mod cache;
mod client;
mod coalesce;
pub mod dedup;
mod error;
pub mod fetcher;
pub mod models;
pub mod text;


use cache::CacheKey;
use client::wikipedia::{check_coordinates, check_limit, check_title, MAX_LIST_LIMIT, MAX_RANDOM, MAX_SEARCH_LIMIT};
pub use client::{WebSearch, WebSearchConfig, Wikipedia, WikipediaConfig};
pub use coalesce::{CoalesceConfig, CoalesceError, CoalesceStats, RequestCoalescer, SharedRequestCoalescer};
use dedup::TextContent;
pub use error::Error;
pub use error::ErrorKind;
use fetcher::JsonFetcher;
use futures::Future;
use models::{
    ArticleHit, CategoryMember, GeoResult, LanguageLink, PageContent, PageMetadata, PageSummary,
    RandomPage, SearchResult,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use text::{analyze_sentiment, extract_keywords, Keyword, Sentiment};

// Re-export cache types
pub use cache::{CacheConfig, CacheStats, CachedResult, SharedTieredCache, Tier, TierConfig, TierStats, TieredCache};

/// A response together with whether it was served from the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cached<T> {
    pub data: T,
    pub cached: bool,
}

impl<T> Cached<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Cached<U> {
        Cached {
            data: f(self.data),
            cached: self.cached,
        }
    }
}

/// Web search and encyclopedia lookups with a cache in front.
///
/// Every lookup derives its key, consults the tier, and on a miss fetches,
/// denormalizes and stores the result with the tier's TTL. Failures are
/// returned to the caller and never stored.
#[derive(Clone)]
pub struct KnowledgeClient {
    web: WebSearch,
    wikipedia: Wikipedia,
    cache: Option<SharedTieredCache>,
    coalescer: Option<SharedRequestCoalescer<Result<Value, Error>>>,
}

impl KnowledgeClient {
    /// Create a new KnowledgeClient without caching
    pub fn new(
        fetcher: Arc<dyn JsonFetcher>,
        web_config: WebSearchConfig,
        wikipedia_config: WikipediaConfig,
    ) -> Self {
        Self {
            web: WebSearch::new(fetcher.clone(), web_config),
            wikipedia: Wikipedia::new(fetcher, wikipedia_config),
            cache: None,
            coalescer: None,
        }
    }

    /// Put a cache in front of every cacheable lookup
    pub fn with_cache(mut self, cache: SharedTieredCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Collapse concurrent misses on the same key into one upstream call
    pub fn with_coalescing(mut self, config: CoalesceConfig) -> Self {
        self.coalescer = Some(Arc::new(RequestCoalescer::new(config)));
        self
    }

    pub fn cache(&self) -> Option<&SharedTieredCache> {
        self.cache.as_ref()
    }

    pub fn default_language(&self) -> &str {
        &self.wikipedia.config().default_language
    }

    async fn cached<T, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Cached<T>, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        if let Some(cache) = &self.cache {
            if let Some(value) = cache.get(&key) {
                match serde_json::from_value(value) {
                    Ok(data) => return Ok(Cached { data, cached: true }),
                    Err(err) => {
                        log::warn!("Discarding undecodable cache entry {}: {}", key, err);
                        cache.invalidate(&key);
                    }
                }
            }
        }

        let value = match &self.coalescer {
            Some(coalescer) => {
                coalescer
                    .execute(key.clone(), move || async move {
                        let data = fetch().await?;
                        Ok(serde_json::to_value(data)?)
                    })
                    .await??
            }
            None => serde_json::to_value(fetch().await?)?,
        };

        if let Some(cache) = &self.cache {
            cache.set(key, value.clone(), None);
        }

        Ok(Cached {
            data: serde_json::from_value(value)?,
            cached: false,
        })
    }

    /// Search the web
    pub async fn web_search(&self, query: &str, num: u32, start: u32) -> Result<Cached<Vec<SearchResult>>, Error> {
        WebSearch::validate(query, num, start)?;
        let key = CacheKey::web_search(query, num, start);
        log::info!("Web search for query: {}", query);
        self.cached(key, || self.web.search(query, num, start)).await
    }

    /// Full-text search of the encyclopedia
    pub async fn wiki_search(
        &self,
        lang: Option<&str>,
        query: &str,
        limit: u32,
    ) -> Result<Cached<Vec<ArticleHit>>, Error> {
        let lang = self.wikipedia.language(lang)?;
        if query.trim().is_empty() {
            return Err(Error::InvalidParameter("query must not be empty".to_string()));
        }
        check_limit("limit", limit, MAX_SEARCH_LIMIT)?;

        let key = CacheKey::wiki_search(&lang, query, limit);
        self.cached(key, || self.wikipedia.search(&lang, query, limit)).await
    }

    pub async fn page(&self, lang: Option<&str>, title: &str) -> Result<Cached<Option<PageContent>>, Error> {
        let lang = self.wikipedia.language(lang)?;
        check_title(title)?;

        let key = CacheKey::page(&lang, title);
        self.cached(key, || self.wikipedia.page(&lang, title)).await
    }

    pub async fn page_by_id(&self, lang: Option<&str>, page_id: u64) -> Result<Cached<Option<PageContent>>, Error> {
        let lang = self.wikipedia.language(lang)?;
        if page_id == 0 {
            return Err(Error::InvalidParameter("page id must be positive".to_string()));
        }

        let key = CacheKey::page_by_id(&lang, page_id);
        self.cached(key, || self.wikipedia.page_by_id(&lang, page_id)).await
    }

    pub async fn summary(&self, lang: Option<&str>, title: &str) -> Result<Cached<Option<PageSummary>>, Error> {
        let lang = self.wikipedia.language(lang)?;
        check_title(title)?;

        let key = CacheKey::summary(&lang, title);
        self.cached(key, || self.wikipedia.summary(&lang, title)).await
    }

    pub async fn metadata(&self, lang: Option<&str>, title: &str) -> Result<Cached<Option<PageMetadata>>, Error> {
        let lang = self.wikipedia.language(lang)?;
        check_title(title)?;

        let key = CacheKey::metadata(&lang, title);
        self.cached(key, || self.wikipedia.metadata(&lang, title)).await
    }

    pub async fn languages(
        &self,
        lang: Option<&str>,
        title: &str,
    ) -> Result<Cached<Option<Vec<LanguageLink>>>, Error> {
        let lang = self.wikipedia.language(lang)?;
        check_title(title)?;

        let key = CacheKey::languages(&lang, title);
        self.cached(key, || self.wikipedia.languages(&lang, title)).await
    }

    pub async fn category_members(
        &self,
        lang: Option<&str>,
        category: &str,
        limit: u32,
    ) -> Result<Cached<Vec<CategoryMember>>, Error> {
        let lang = self.wikipedia.language(lang)?;
        check_title(category)?;
        check_limit("limit", limit, MAX_LIST_LIMIT)?;

        let key = CacheKey::category(&lang, category, limit);
        self.cached(key, || self.wikipedia.category_members(&lang, category, limit))
            .await
    }

    pub async fn related(&self, lang: Option<&str>, title: &str, limit: u32) -> Result<Cached<Vec<ArticleHit>>, Error> {
        let lang = self.wikipedia.language(lang)?;
        check_title(title)?;
        check_limit("limit", limit, MAX_SEARCH_LIMIT)?;

        let key = CacheKey::related(&lang, title, limit);
        self.cached(key, || self.wikipedia.related(&lang, title, limit)).await
    }

    pub async fn geosearch(
        &self,
        lang: Option<&str>,
        lat: f64,
        lon: f64,
        radius: u32,
        limit: u32,
    ) -> Result<Cached<Vec<GeoResult>>, Error> {
        let lang = self.wikipedia.language(lang)?;
        check_coordinates(lat, lon, radius)?;
        check_limit("limit", limit, MAX_LIST_LIMIT)?;

        let key = CacheKey::geosearch(&lang, lat, lon, radius, limit);
        self.cached(key, || self.wikipedia.geosearch(&lang, lat, lon, radius, limit))
            .await
    }

    /// Random articles. Never cached.
    pub async fn random(&self, lang: Option<&str>, count: u32) -> Result<Vec<RandomPage>, Error> {
        let lang = self.wikipedia.language(lang)?;
        check_limit("count", count, MAX_RANDOM)?;
        self.wikipedia.random(&lang, count).await
    }

    pub async fn keywords(&self, text: &str, limit: u32) -> Result<Cached<Vec<Keyword>>, Error> {
        if text.trim().is_empty() {
            return Err(Error::InvalidParameter("text must not be empty".to_string()));
        }
        check_limit("limit", limit, MAX_SEARCH_LIMIT)?;

        let key = CacheKey::keywords(text, limit);
        self.cached(key, || async { Ok(extract_keywords(text, limit as usize)) })
            .await
    }

    pub async fn sentiment(&self, text: &str) -> Result<Cached<Sentiment>, Error> {
        if text.trim().is_empty() {
            return Err(Error::InvalidParameter("text must not be empty".to_string()));
        }

        let key = CacheKey::analysis("sentiment", text);
        self.cached(key, || async { Ok(analyze_sentiment(text)) }).await
    }

    /// Drop near-duplicates from already fetched content. Touches neither cache nor network.
    pub fn deduplicate<T: TextContent>(&self, items: Vec<T>, threshold: f64) -> Result<Vec<T>, Error> {
        Ok(dedup::deduplicate(items, threshold)?)
    }

    /// Get cache statistics if caching is enabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    pub fn coalesce_stats(&self) -> Option<CoalesceStats> {
        self.coalescer.as_ref().map(|coalescer| coalescer.stats())
    }

    /// Clear cache if caching is enabled
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    pub fn clear_cache_tier(&self, tier: Tier) {
        if let Some(cache) = &self.cache {
            cache.clear_tier(tier);
        }
    }

    /// Evict expired cache entries if caching is enabled
    pub fn evict_expired_cache(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.evict_expired())
    }
}
