use super::super::get_context;
use async_graphql::{Context, Object, SimpleObject};
use knowledge_search_client::{CacheStats, CoalesceStats, Tier, TierStats};
use serde::Serialize;

#[derive(Default)]
pub struct CacheStatsQuery;

#[derive(SimpleObject, Serialize)]
pub struct CacheStatsResponse {
    pub cache_stats: Option<CacheStats>,
    pub cache_enabled: bool,
    pub coalesce_stats: Option<CoalesceStats>,
}

#[Object]
impl CacheStatsQuery {
    /// Get current cache statistics
    async fn cache_stats<'ctx>(&self, context: &Context<'ctx>) -> CacheStatsResponse {
        let client = get_context(context).knowledge_client();

        let cache_stats = client.cache_stats();
        let cache_enabled = cache_stats.as_ref().is_some_and(|stats| stats.enabled);

        CacheStatsResponse {
            cache_stats,
            cache_enabled,
            coalesce_stats: client.coalesce_stats(),
        }
    }

    /// Statistics of a single tier
    async fn tier_stats<'ctx>(&self, context: &Context<'ctx>, tier: Tier) -> Option<TierStats> {
        let stats = get_context(context).knowledge_client().cache_stats()?;
        stats.tier(tier).cloned()
    }
}
