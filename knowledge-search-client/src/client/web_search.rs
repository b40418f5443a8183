use crate::error::Error;
use crate::fetcher::JsonFetcher;
use crate::models::SearchResult;
use getset::Getters;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use surf::Url;

pub const MAX_RESULTS_PER_PAGE: u32 = 10;

#[derive(Clone, Debug, Deserialize)]
pub struct WebSearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub engine_id: String,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            api_key: String::new(),
            engine_id: String::new(),
        }
    }
}

/// Programmable web search returning `{title, link, snippet, displayLink}` items.
#[derive(Clone, Getters)]
pub struct WebSearch {
    fetcher: Arc<dyn JsonFetcher>,
    #[get = "pub"]
    config: WebSearchConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    display_link: String,
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    items: Vec<RawItem>,
}

impl WebSearch {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, config: WebSearchConfig) -> Self {
        Self { fetcher, config }
    }

    /// Reject parameters the upstream would refuse, before touching cache or network.
    pub fn validate(query: &str, num: u32, start: u32) -> Result<(), Error> {
        if query.trim().is_empty() {
            return Err(Error::InvalidParameter("query must not be empty".to_string()));
        }
        if !(1..=MAX_RESULTS_PER_PAGE).contains(&num) {
            return Err(Error::InvalidParameter(format!(
                "num must be between 1 and {}, got {}",
                MAX_RESULTS_PER_PAGE, num
            )));
        }
        if start == 0 {
            return Err(Error::InvalidParameter("start is 1-based".to_string()));
        }
        Ok(())
    }

    pub fn url(&self, query: &str, num: u32, start: u32) -> Result<Url, Error> {
        if self.config.api_key.is_empty() || self.config.engine_id.is_empty() {
            return Err(Error::Configuration(
                "web search requires an API key and engine id".to_string(),
            ));
        }
        let num = num.to_string();
        let start = start.to_string();
        Url::parse_with_params(
            &self.config.endpoint,
            &[
                ("key", self.config.api_key.as_str()),
                ("cx", self.config.engine_id.as_str()),
                ("q", query.trim()),
                ("num", num.as_str()),
                ("start", start.as_str()),
            ],
        )
        .map_err(|err| Error::Configuration(format!("invalid search endpoint: {}", err)))
    }

    pub async fn search(&self, query: &str, num: u32, start: u32) -> Result<Vec<SearchResult>, Error> {
        Self::validate(query, num, start)?;
        let url = self.url(query, num, start)?;
        let body = self.fetcher.get_json(&url).await?;
        Self::parse(body)
    }

    /// A response without `items` means zero hits, not an error.
    pub fn parse(body: Value) -> Result<Vec<SearchResult>, Error> {
        let raw: RawResponse = serde_json::from_value(body)?;
        Ok(raw
            .items
            .into_iter()
            .map(|item| SearchResult {
                title: item.title,
                link: item.link,
                snippet: item.snippet.replace('\n', " "),
                display_link: item.display_link,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::HttpFetcher;
    use serde_json::json;

    fn client() -> WebSearch {
        WebSearch::new(
            Arc::new(HttpFetcher::default()),
            WebSearchConfig {
                api_key: "secret".to_string(),
                engine_id: "engine".to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_parse_items() {
        let body = json!({
            "kind": "customsearch#search",
            "items": [{
                "title": "The Rust Programming Language",
                "link": "https://www.rust-lang.org/",
                "snippet": "A language empowering everyone\nto build reliable software.",
                "displayLink": "www.rust-lang.org"
            }]
        });
        let results = WebSearch::parse(body).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].display_link, "www.rust-lang.org");
        assert_eq!(results[0].snippet, "A language empowering everyone to build reliable software.");
    }

    #[test]
    fn test_missing_items_is_empty() {
        let body = json!({"searchInformation": {"totalResults": "0"}});
        assert!(WebSearch::parse(body).unwrap().is_empty());
    }

    #[test]
    fn test_url_carries_credentials_and_paging() {
        let url = client().url(" rust lang ", 5, 11).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("cx".to_string(), "engine".to_string())));
        assert!(pairs.contains(&("q".to_string(), "rust lang".to_string())));
        assert!(pairs.contains(&("start".to_string(), "11".to_string())));
    }

    #[test]
    fn test_missing_credentials() {
        let search = WebSearch::new(Arc::new(HttpFetcher::default()), WebSearchConfig::default());
        assert!(matches!(search.url("rust", 10, 1), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_validate() {
        assert!(WebSearch::validate("rust", 10, 1).is_ok());
        assert!(WebSearch::validate("  ", 10, 1).is_err());
        assert!(WebSearch::validate("rust", 0, 1).is_err());
        assert!(WebSearch::validate("rust", 11, 1).is_err());
        assert!(WebSearch::validate("rust", 10, 0).is_err());
    }
}
