//! Denormalized shapes handed back to callers and stored in the cache.

use crate::dedup::TextContent;
use serde::{Deserialize, Serialize};

/// A web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub display_link: String,
}

impl TextContent for SearchResult {
    fn title(&self) -> Option<&str> {
        Some(&self.title)
    }

    fn text(&self) -> Option<&str> {
        Some(&self.snippet)
    }
}

/// An encyclopedia full-text search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleHit {
    pub title: String,
    pub page_id: u64,
    /// Plain-text excerpt around the match
    pub snippet: String,
    pub word_count: u64,
    pub timestamp: Option<String>,
}

impl TextContent for ArticleHit {
    fn title(&self) -> Option<&str> {
        Some(&self.title)
    }

    fn text(&self) -> Option<&str> {
        Some(&self.snippet)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub index: String,
    pub level: u32,
    pub title: String,
}

/// Rendered article reduced to plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub title: String,
    pub page_id: u64,
    pub language: String,
    pub text: String,
    pub sections: Vec<Section>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub title: String,
    pub page_id: u64,
    pub language: String,
    pub extract: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub title: String,
    pub page_id: u64,
    pub url: String,
    pub length: u64,
    pub last_touched: Option<String>,
}

/// Info, categories and outgoing links of a page, fetched together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub language: String,
    pub info: PageInfo,
    pub categories: Vec<String>,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageLink {
    pub language: String,
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMember {
    pub title: String,
    pub page_id: u64,
    pub namespace: i64,
    /// "page", "subcat" or "file"
    pub member_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoResult {
    pub title: String,
    pub page_id: u64,
    pub lat: f64,
    pub lon: f64,
    /// Metres from the queried point
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomPage {
    pub title: String,
    pub page_id: u64,
}
