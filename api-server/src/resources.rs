//! Addressable resources: `wikipedia://{lang}/{kind}/{target}` and `search://web/{query}`.

use crate::error::ApiError;
use crate::tools::ToolResponse;
use knowledge_search_client::KnowledgeClient;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::str::FromStr;

lazy_static! {
    static ref WIKIPEDIA_URI: Regex = Regex::new(
        r"^wikipedia://(?P<lang>[A-Za-z0-9-]+)/(?P<kind>page|page-id|summary|metadata|languages|category)/(?P<target>.+)$"
    )
    .unwrap();
    static ref SEARCH_URI: Regex = Regex::new(r"^search://web/(?P<query>.+)$").unwrap();
}

const CATEGORY_LIMIT: u32 = 50;
const SEARCH_RESULTS: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Page { lang: String, title: String },
    PageById { lang: String, page_id: u64 },
    Summary { lang: String, title: String },
    Metadata { lang: String, title: String },
    Languages { lang: String, title: String },
    Category { lang: String, name: String },
    WebSearch { query: String },
}

fn decode(uri: &str, segment: &str) -> Result<String, ApiError> {
    let decoded = urlencoding::decode(segment)
        .map_err(|_| ApiError::UnknownResource(uri.to_string()))?
        .trim()
        .to_string();
    if decoded.is_empty() {
        return Err(ApiError::UnknownResource(uri.to_string()));
    }
    Ok(decoded)
}

impl FromStr for Resource {
    type Err = ApiError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        if let Some(captures) = SEARCH_URI.captures(uri) {
            return Ok(Resource::WebSearch {
                query: decode(uri, &captures["query"])?,
            });
        }

        let captures = WIKIPEDIA_URI
            .captures(uri)
            .ok_or_else(|| ApiError::UnknownResource(uri.to_string()))?;
        let lang = captures["lang"].to_string();
        let target = decode(uri, &captures["target"])?;

        Ok(match &captures["kind"] {
            "page" => Resource::Page { lang, title: target },
            "page-id" => Resource::PageById {
                lang,
                page_id: target
                    .parse()
                    .map_err(|_| ApiError::InvalidArguments(format!("not a page id: {:?}", target)))?,
            },
            "summary" => Resource::Summary { lang, title: target },
            "metadata" => Resource::Metadata { lang, title: target },
            "languages" => Resource::Languages { lang, title: target },
            "category" => Resource::Category { lang, name: target },
            _ => return Err(ApiError::UnknownResource(uri.to_string())),
        })
    }
}

impl Resource {
    pub async fn read(&self, client: &KnowledgeClient) -> Result<ToolResponse, ApiError> {
        match self {
            Resource::Page { lang, title } => {
                ToolResponse::from_cached(client.page(Some(lang.as_str()), title).await?)
            }
            Resource::PageById { lang, page_id } => {
                ToolResponse::from_cached(client.page_by_id(Some(lang.as_str()), *page_id).await?)
            }
            Resource::Summary { lang, title } => {
                ToolResponse::from_cached(client.summary(Some(lang.as_str()), title).await?)
            }
            Resource::Metadata { lang, title } => {
                ToolResponse::from_cached(client.metadata(Some(lang.as_str()), title).await?)
            }
            Resource::Languages { lang, title } => {
                ToolResponse::from_cached(client.languages(Some(lang.as_str()), title).await?)
            }
            Resource::Category { lang, name } => ToolResponse::from_cached(
                client
                    .category_members(Some(lang.as_str()), name, CATEGORY_LIMIT)
                    .await?,
            ),
            Resource::WebSearch { query } => {
                ToolResponse::from_cached(client.web_search(query, SEARCH_RESULTS, 1).await?)
            }
        }
    }
}

pub async fn read(client: &KnowledgeClient, uri: &str) -> Result<ToolResponse, ApiError> {
    let resource: Resource = uri.parse()?;
    log::info!("Reading resource {}", uri);
    resource.read(client).await
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
}

const fn template(uri_template: &'static str, name: &'static str, description: &'static str) -> ResourceTemplate {
    ResourceTemplate {
        uri_template,
        name,
        description,
        mime_type: "application/json",
    }
}

pub fn templates() -> Vec<ResourceTemplate> {
    vec![
        template("wikipedia://{lang}/page/{title}", "Article", "Plain-text article content"),
        template("wikipedia://{lang}/page-id/{id}", "Article by id", "Article content by page id"),
        template("wikipedia://{lang}/summary/{title}", "Summary", "Introductory summary"),
        template("wikipedia://{lang}/metadata/{title}", "Metadata", "Page info, categories and links"),
        template("wikipedia://{lang}/languages/{title}", "Languages", "Interlanguage links"),
        template("wikipedia://{lang}/category/{name}", "Category", "Category members"),
        template("search://web/{query}", "Web search", "First page of web search results"),
    ]
}
