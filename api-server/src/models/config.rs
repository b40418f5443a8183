use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use getset::{CopyGetters, Getters};
use knowledge_search_client::fetcher::HttpConfig;
use knowledge_search_client::{CacheConfig, CoalesceConfig, Tier, TierConfig, WebSearchConfig, WikipediaConfig};
use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use simplelog::LevelFilter;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use utils::retry::RetryPolicy;

pub const CONFIG_PATH_VAR: &str = "KNOWLEDGE_CONFIG";
pub const ENV_PREFIX: &str = "KNOWLEDGE_";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[serde_inline_default]
#[derive(Deserialize, Serialize, Debug, Clone, Getters, CopyGetters)]
pub struct Config {
    #[serde_inline_default(IpAddr::V4(Ipv4Addr::LOCALHOST))]
    #[getset(get_copy = "pub")]
    address: IpAddr,
    #[serde_inline_default(8000)]
    #[getset(get_copy = "pub")]
    port: u16,
    #[serde_inline_default("info".to_string())]
    #[getset(get = "pub")]
    log_level: String,
    #[serde(default)]
    #[getset(get = "pub")]
    search: SearchSettings,
    #[serde(default)]
    #[getset(get = "pub")]
    wikipedia: WikipediaSettings,
    #[serde(default)]
    #[getset(get = "pub")]
    http: HttpSettings,
    #[serde(default)]
    #[getset(get = "pub")]
    cache: CacheSettings,
}

/// Credentials and endpoint of the programmable web search API.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SearchSettings {
    pub api_key: String,
    pub engine_id: String,
    pub endpoint: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct WikipediaSettings {
    pub default_language: Option<String>,
    pub endpoint_template: Option<String>,
}

#[serde_inline_default]
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct HttpSettings {
    #[serde_inline_default(HttpSettings::TIMEOUT_SECS)]
    pub timeout_secs: u64,
    #[serde_inline_default(HttpSettings::RETRIES)]
    pub retries: u32,
    #[serde_inline_default(HttpSettings::BACKOFF_MILLIS)]
    pub backoff_millis: u64,
}

impl HttpSettings {
    const TIMEOUT_SECS: u64 = 10;
    const RETRIES: u32 = 3;
    const BACKOFF_MILLIS: u64 = 250;
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: Self::TIMEOUT_SECS,
            retries: Self::RETRIES,
            backoff_millis: Self::BACKOFF_MILLIS,
        }
    }
}

/// Partial per-tier settings layered over the tier's defaults.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TierOverride {
    pub capacity: Option<usize>,
    pub ttl_secs: Option<i64>,
    pub enabled: Option<bool>,
}

#[serde_inline_default]
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CacheSettings {
    #[serde_inline_default(true)]
    pub enabled: bool,
    #[serde_inline_default(false)]
    pub coalesce_requests: bool,
    #[serde_inline_default(300)]
    pub cleanup_interval_secs: u64,
    #[serde(default)]
    pub tiers: HashMap<Tier, TierOverride>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            coalesce_requests: false,
            cleanup_interval_secs: 300,
            tiers: HashMap::new(),
        }
    }
}

impl Config {
    /// Defaults, then the YAML file, then `KNOWLEDGE_`-prefixed environment variables.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["CONFIG"]).split("__"))
    }

    pub fn load() -> Result<Self, figment::Error> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// Unknown level names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    pub fn web_search_config(&self) -> WebSearchConfig {
        let mut config = WebSearchConfig {
            api_key: self.search.api_key.clone(),
            engine_id: self.search.engine_id.clone(),
            ..Default::default()
        };
        if let Some(endpoint) = &self.search.endpoint {
            config.endpoint = endpoint.clone();
        }
        config
    }

    pub fn wikipedia_config(&self) -> WikipediaConfig {
        let mut config = WikipediaConfig::default();
        if let Some(language) = &self.wikipedia.default_language {
            config.default_language = language.clone();
        }
        if let Some(template) = &self.wikipedia.endpoint_template {
            config.endpoint_template = template.clone();
        }
        config
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: Duration::from_secs(self.http.timeout_secs),
            retry: RetryPolicy::new(self.http.retries, Duration::from_millis(self.http.backoff_millis)),
            ..Default::default()
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        let settings = &self.cache;
        let mut config = CacheConfig {
            enabled: settings.enabled,
            cleanup_interval_secs: settings.cleanup_interval_secs,
            ..Default::default()
        };
        for (tier, overrides) in &settings.tiers {
            let defaults = TierConfig::for_tier(*tier);
            let tier_config = TierConfig {
                capacity: overrides.capacity.unwrap_or(defaults.capacity),
                ttl_secs: overrides.ttl_secs.unwrap_or(defaults.ttl_secs),
                enabled: overrides.enabled.unwrap_or(defaults.enabled),
            };
            config = config.with_tier(*tier, tier_config);
        }
        config
    }

    pub fn coalesce_config(&self) -> Option<CoalesceConfig> {
        self.cache.coalesce_requests.then(CoalesceConfig::default)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
            log_level: "info".to_string(),
            search: SearchSettings::default(),
            wikipedia: WikipediaSettings::default(),
            http: HttpSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}
