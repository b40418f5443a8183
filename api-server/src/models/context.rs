use getset::Getters;
use knowledge_search_client::fetcher::{HttpFetcher, JsonFetcher};
use knowledge_search_client::{Error, KnowledgeClient, SharedTieredCache, TieredCache};
use log::info;
use std::sync::Arc;

use super::config::Config;

#[derive(Getters)]
#[get = "pub"]
pub struct Context {
    knowledge_client: KnowledgeClient,
    config: Config,
}

impl Context {
    pub fn new(config: Config) -> Result<Self, Error> {
        let fetcher = Arc::new(HttpFetcher::new(config.http_config()));
        Self::with_fetcher(config, fetcher)
    }

    /// Build the client stack over any fetcher. Fails on an invalid cache configuration.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn JsonFetcher>) -> Result<Self, Error> {
        let mut knowledge_client =
            KnowledgeClient::new(fetcher, config.web_search_config(), config.wikipedia_config());

        let cache_config = config.cache_config();
        if cache_config.enabled {
            let cache: SharedTieredCache = Arc::new(TieredCache::new(cache_config)?);
            knowledge_client = knowledge_client.with_cache(cache);
            info!("Initialized KnowledgeClient with tiered caching");
        } else {
            info!("Initialized KnowledgeClient without caching");
        }

        if let Some(coalesce_config) = config.coalesce_config() {
            info!("Coalescing concurrent upstream requests");
            knowledge_client = knowledge_client.with_coalescing(coalesce_config);
        }

        Ok(Self {
            knowledge_client,
            config,
        })
    }

    /// Start the background sweep of expired entries, when caching is on.
    pub fn spawn_cache_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
        self.knowledge_client.cache().map(|cache| cache.spawn_sweeper())
    }
}

pub type ContextPointer = Arc<Context>;
