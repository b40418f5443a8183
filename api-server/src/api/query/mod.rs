mod cache_stats;

use async_graphql::MergedObject;
use cache_stats::CacheStatsQuery;

#[derive(MergedObject, Default)]
pub struct Query(CacheStatsQuery);
