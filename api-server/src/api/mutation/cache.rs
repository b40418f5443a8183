use super::super::get_context;
use async_graphql::{Context, Object};
use knowledge_search_client::Tier;

#[derive(Default)]
pub struct CacheMutation;

#[Object]
impl CacheMutation {
    /// Clear the whole cache, or one tier of it
    async fn clear_cache<'ctx>(&self, context: &Context<'ctx>, tier: Option<Tier>) -> bool {
        let client = get_context(context).knowledge_client();
        match tier {
            Some(tier) => client.clear_cache_tier(tier),
            None => client.clear_cache(),
        }
        client.cache().is_some()
    }

    /// Purge expired entries now instead of waiting for the sweeper. Returns how many were removed.
    async fn evict_expired_cache<'ctx>(&self, context: &Context<'ctx>) -> usize {
        get_context(context).knowledge_client().evict_expired_cache()
    }
}
