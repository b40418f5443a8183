use chrono::Duration;
use knowledge_search_client::fetcher::HttpFetcher;
use knowledge_search_client::{
    CacheConfig, CoalesceConfig, KnowledgeClient, Tier, TierConfig, TieredCache, WebSearchConfig,
    WikipediaConfig,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    // Example 1: Basic client without caching
    println!("=== Basic Client ===");
    let fetcher = Arc::new(HttpFetcher::default());
    let web_config = WebSearchConfig {
        api_key: std::env::var("SEARCH_API_KEY").unwrap_or_default(),
        engine_id: std::env::var("SEARCH_ENGINE_ID").unwrap_or_default(),
        ..Default::default()
    };
    let basic_client = KnowledgeClient::new(fetcher.clone(), web_config.clone(), WikipediaConfig::default());

    let start = std::time::Instant::now();
    let summary = basic_client.summary(None, "Rust (programming language)").await?;
    println!("Basic summary took: {:?}", start.elapsed());
    if let Some(summary) = &summary.data {
        println!("{}: {}", summary.title, summary.extract);
    }

    // Example 2: Client with caching enabled
    println!("\n=== Client with Caching ===");
    let cache_config = CacheConfig::default().with_tier(Tier::Summary, TierConfig::new(500, Duration::minutes(10)));
    let cache = Arc::new(TieredCache::new(cache_config)?);
    let cached_client = KnowledgeClient::new(fetcher, web_config, WikipediaConfig::default())
        .with_cache(cache.clone())
        .with_coalescing(CoalesceConfig::default());
    let _sweeper = cache.spawn_sweeper();

    // First lookup (will be cached)
    let start = std::time::Instant::now();
    let first = cached_client.summary(None, "Tokyo").await?;
    let duration1 = start.elapsed();
    println!("First lookup took: {:?} (cached: {})", duration1, first.cached);

    // Second lookup (should be from cache)
    let start = std::time::Instant::now();
    let second = cached_client.summary(Some("EN"), "tokyo").await?;
    let duration2 = start.elapsed();
    println!("Second lookup took: {:?} (cached: {})", duration2, second.cached);

    if duration2.as_millis() > 0 {
        println!("Cache speedup: {:.2}x", duration1.as_millis() as f64 / duration2.as_millis() as f64);
    } else {
        println!("Cache speedup: Very fast (cached result)");
    }

    // Example 3: Cache management
    println!("\n=== Cache Management ===");
    if let Some(stats) = cached_client.cache_stats() {
        for tier in stats.tiers.iter().filter(|tier| tier.total_entries > 0) {
            println!(
                "{}: {} entries, {} hits, {} misses",
                tier.tier, tier.total_entries, tier.hits, tier.misses
            );
        }
    }
    println!("Evicted {} expired entries", cached_client.evict_expired_cache());
    cached_client.clear_cache();

    Ok(())
}
