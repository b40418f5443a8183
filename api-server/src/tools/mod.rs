//! Tool surface: argument decoding and dispatch onto the knowledge client.

mod args;
mod definitions;

pub use definitions::{definitions, ToolDefinition};

use crate::error::ApiError;
use args::*;
use knowledge_search_client::{Cached, KnowledgeClient};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ToolName {
    WebSearch,
    WikipediaSearch,
    WikipediaPage,
    WikipediaPageById,
    WikipediaSummary,
    WikipediaRandom,
    WikipediaGeosearch,
    WikipediaLanguages,
    WikipediaCategoryMembers,
    WikipediaMetadata,
    WikipediaRelated,
    DeduplicateContent,
    ExtractKeywords,
    AnalyzeSentiment,
}

/// Inbound tool invocation.
#[derive(Deserialize, Debug)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Successful result of a tool call or resource read.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub content: Value,
    pub cached: bool,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn from_cached<T: Serialize>(result: Cached<T>) -> Result<Self, ApiError> {
        Ok(Self {
            content: serde_json::to_value(result.data).map_err(knowledge_search_client::Error::from)?,
            cached: result.cached,
            is_error: false,
        })
    }

    pub fn fresh<T: Serialize>(data: T) -> Result<Self, ApiError> {
        Self::from_cached(Cached { data, cached: false })
    }
}

/// Missing arguments read as an empty object so that defaults apply.
fn parse<T: DeserializeOwned>(arguments: Value) -> Result<T, ApiError> {
    let arguments = if arguments.is_null() {
        Value::Object(Map::new())
    } else {
        arguments
    };
    Ok(serde_json::from_value(arguments)?)
}

pub async fn call(client: &KnowledgeClient, name: &str, arguments: Value) -> Result<ToolResponse, ApiError> {
    let tool = ToolName::from_str(name).map_err(|_| ApiError::UnknownTool(name.to_string()))?;
    log::info!("Calling tool {}", tool);

    match tool {
        ToolName::WebSearch => {
            let args: WebSearchArgs = parse(arguments)?;
            ToolResponse::from_cached(client.web_search(&args.query, args.num, args.start).await?)
        }
        ToolName::WikipediaSearch => {
            let args: WikiSearchArgs = parse(arguments)?;
            ToolResponse::from_cached(
                client
                    .wiki_search(args.lang.as_deref(), &args.query, args.limit)
                    .await?,
            )
        }
        ToolName::WikipediaPage => {
            let args: TitleArgs = parse(arguments)?;
            ToolResponse::from_cached(client.page(args.lang.as_deref(), &args.title).await?)
        }
        ToolName::WikipediaPageById => {
            let args: PageIdArgs = parse(arguments)?;
            ToolResponse::from_cached(client.page_by_id(args.lang.as_deref(), args.page_id).await?)
        }
        ToolName::WikipediaSummary => {
            let args: TitleArgs = parse(arguments)?;
            ToolResponse::from_cached(client.summary(args.lang.as_deref(), &args.title).await?)
        }
        ToolName::WikipediaRandom => {
            let args: RandomArgs = parse(arguments)?;
            ToolResponse::fresh(client.random(args.lang.as_deref(), args.count).await?)
        }
        ToolName::WikipediaGeosearch => {
            let args: GeoSearchArgs = parse(arguments)?;
            ToolResponse::from_cached(
                client
                    .geosearch(args.lang.as_deref(), args.lat, args.lon, args.radius, args.limit)
                    .await?,
            )
        }
        ToolName::WikipediaLanguages => {
            let args: TitleArgs = parse(arguments)?;
            ToolResponse::from_cached(client.languages(args.lang.as_deref(), &args.title).await?)
        }
        ToolName::WikipediaCategoryMembers => {
            let args: CategoryArgs = parse(arguments)?;
            ToolResponse::from_cached(
                client
                    .category_members(args.lang.as_deref(), &args.category, args.limit)
                    .await?,
            )
        }
        ToolName::WikipediaMetadata => {
            let args: TitleArgs = parse(arguments)?;
            ToolResponse::from_cached(client.metadata(args.lang.as_deref(), &args.title).await?)
        }
        ToolName::WikipediaRelated => {
            let args: RelatedArgs = parse(arguments)?;
            ToolResponse::from_cached(
                client
                    .related(args.lang.as_deref(), &args.title, args.limit)
                    .await?,
            )
        }
        ToolName::DeduplicateContent => {
            let args: DeduplicateArgs = parse(arguments)?;
            let original_count = args.items.len();
            let items = client.deduplicate(args.items, args.threshold)?;
            ToolResponse::fresh(json!({
                "originalCount": original_count,
                "uniqueCount": items.len(),
                "removedCount": original_count - items.len(),
                "threshold": args.threshold,
                "items": items,
            }))
        }
        ToolName::ExtractKeywords => {
            let args: KeywordArgs = parse(arguments)?;
            ToolResponse::from_cached(client.keywords(&args.text, args.limit).await?)
        }
        ToolName::AnalyzeSentiment => {
            let args: TextArgs = parse(arguments)?;
            ToolResponse::from_cached(client.sentiment(&args.text).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{client, StaticFetcher};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_tool_names_round_trip() {
        assert_eq!(ToolName::from_str("wikipedia_page_by_id").unwrap(), ToolName::WikipediaPageById);
        assert_eq!(ToolName::DeduplicateContent.as_ref(), "deduplicate_content");
        assert!(ToolName::from_str("WebSearch").is_err());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let client = client(Arc::new(StaticFetcher::default()));
        let err = call(&client, "delete_everything", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::UnknownTool(name) if name == "delete_everything"));
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let client = client(Arc::new(StaticFetcher::default()));
        let err = call(&client, "wikipedia_page", json!({"lang": "en"})).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
    }

    #[tokio::test]
    async fn test_deduplicate_content() {
        let client = client(Arc::new(StaticFetcher::default()));
        let response = call(
            &client,
            "deduplicate_content",
            json!({
                "items": [
                    {"title": "Cat facts", "source": "a"},
                    {"title": "Cat facts!", "source": "b"},
                    {"title": "Dog breeds"}
                ],
                "threshold": 0.5
            }),
        )
        .await
        .unwrap();

        assert!(!response.cached);
        assert_eq!(response.content["originalCount"], 3);
        assert_eq!(response.content["removedCount"], 1);
        assert_eq!(
            response.content["items"],
            json!([{"title": "Cat facts", "source": "a"}, {"title": "Dog breeds"}])
        );
    }

    #[tokio::test]
    async fn test_deduplicate_rejects_threshold_out_of_range() {
        let client = client(Arc::new(StaticFetcher::default()));
        let err = call(&client, "deduplicate_content", json!({"items": [], "threshold": 1.5}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
        assert_eq!(err.payload()["isError"], true);
    }

    #[tokio::test]
    async fn test_summary_is_cached_between_calls() {
        let fetcher = Arc::new(StaticFetcher::default().respond(
            "titles=Tokyo",
            json!({"query": {"pages": [{
                "pageid": 30057, "ns": 0, "title": "Tokyo",
                "extract": "Tokyo is the capital of Japan.",
                "fullurl": "https://en.wikipedia.org/wiki/Tokyo"
            }]}}),
        ));
        let client = client(fetcher.clone());

        let first = call(&client, "wikipedia_summary", json!({"title": "Tokyo"})).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.content["extract"], "Tokyo is the capital of Japan.");

        let second = call(&client, "wikipedia_summary", json!({"title": "Tokyo", "lang": "en"}))
            .await
            .unwrap();
        assert!(second.cached);
        assert_eq!(second.content, first.content);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_an_error() {
        let fetcher = Arc::new(StaticFetcher::default().respond(
            "action=parse",
            json!({"error": {"code": "missingtitle", "info": "The page you specified doesn't exist."}}),
        ));
        let client = client(fetcher);

        let response = call(&client, "wikipedia_page", json!({"title": "Nowhere"})).await.unwrap();
        assert_eq!(response.content, Value::Null);
        assert!(!response.is_error);
    }

    #[tokio::test]
    async fn test_text_tools() {
        let client = client(Arc::new(StaticFetcher::default()));
        let text = "The festival was a wonderful success. Wonderful music, wonderful people.";

        let keywords = call(&client, "extract_keywords", json!({"text": text, "limit": 1})).await.unwrap();
        assert_eq!(keywords.content[0]["keyword"], "wonderful");

        let sentiment = call(&client, "analyze_sentiment", json!({"text": text})).await.unwrap();
        assert_eq!(sentiment.content["label"], "positive");
    }
}
