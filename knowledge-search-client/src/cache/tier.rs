use chrono::Duration;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

#[cfg(feature = "graphql")]
use async_graphql::Enum;

/// Resource categories, each cached in its own independently configured partition.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
)]
#[cfg_attr(feature = "graphql", derive(Enum))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tier {
    /// Web and encyclopedia search hits, geosearch
    Search,
    Page,
    PageById,
    /// Page info, categories and links
    Metadata,
    /// Category member listings
    Category,
    /// Interlanguage links
    Language,
    Related,
    Summary,
    /// Keyword and sentiment results of the text utilities
    Analysis,
}

impl Tier {
    /// Default time-to-live, tuned to how fast each category goes stale.
    pub fn default_ttl(self) -> Duration {
        match self {
            Tier::Search => Duration::minutes(15),
            Tier::Page | Tier::PageById => Duration::minutes(60),
            Tier::Metadata | Tier::Category => Duration::minutes(45),
            Tier::Language => Duration::hours(6),
            Tier::Related => Duration::minutes(30),
            Tier::Summary => Duration::minutes(60),
            Tier::Analysis => Duration::minutes(30),
        }
    }

    pub fn default_capacity(self) -> usize {
        match self {
            Tier::Search => 500,
            Tier::Page | Tier::PageById => 200,
            Tier::Summary => 500,
            Tier::Metadata | Tier::Category | Tier::Related => 200,
            Tier::Language => 100,
            Tier::Analysis => 1000,
        }
    }
}

/// Capacity and TTL of a single tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Maximum number of entries before LRU eviction kicks in
    pub capacity: usize,
    /// Default time-to-live in seconds
    pub ttl_secs: i64,
    /// A disabled tier never stores anything
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl TierConfig {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl_secs: ttl.num_seconds(),
            enabled: true,
        }
    }

    pub fn for_tier(tier: Tier) -> Self {
        Self::new(tier.default_capacity(), tier.default_ttl())
    }

    /// Saturates instead of panicking; validated configs never get there.
    pub fn ttl(&self) -> Duration {
        Duration::try_seconds(self.ttl_secs).unwrap_or(if self.ttl_secs < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_search_expires_before_encyclopedic_content() {
        assert!(Tier::Search.default_ttl() < Tier::Page.default_ttl());
        assert!(Tier::Search.default_ttl() < Tier::Summary.default_ttl());
        assert!(Tier::Metadata.default_ttl() < Tier::Page.default_ttl());
        assert_eq!(Tier::Language.default_ttl(), Duration::hours(6));
    }

    #[test]
    fn test_tier_names_round_trip() {
        for tier in Tier::iter() {
            assert_eq!(Tier::from_str(tier.as_ref()).unwrap(), tier);
        }
        assert_eq!(Tier::PageById.as_ref(), "page_by_id");
    }

    #[test]
    fn test_every_tier_has_positive_defaults() {
        for tier in Tier::iter() {
            let config = TierConfig::for_tier(tier);
            assert!(config.capacity > 0);
            assert!(config.ttl() > Duration::zero());
            assert!(config.enabled);
        }
    }
}
