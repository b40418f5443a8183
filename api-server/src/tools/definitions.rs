use super::ToolName;
use serde::Serialize;
use serde_json::{json, Value};
use strum::IntoEnumIterator;

/// A callable tool as advertised to clients.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

fn lang() -> Value {
    json!({
        "type": "string",
        "description": "Encyclopedia language code such as \"en\" or \"de\". Defaults to the configured language."
    })
}

fn limit(default: u32, maximum: u32) -> Value {
    json!({
        "type": "integer",
        "default": default,
        "minimum": 1,
        "maximum": maximum,
        "description": format!("Maximum number of results (1-{}, default: {}).", maximum, default)
    })
}

fn title_schema(what: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "lang": lang(),
            "title": {"type": "string", "description": format!("Title of the article to {}.", what)}
        },
        "required": ["title"]
    })
}

fn text_schema() -> Value {
    json!({
        "type": "string",
        "description": "Plain text to analyze."
    })
}

pub fn definition(tool: ToolName) -> ToolDefinition {
    let (description, schema) = match tool {
        ToolName::WebSearch => (
            "Search the web. Results are cached for 15 minutes.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query."},
                    "num": limit(10, 10),
                    "start": {"type": "integer", "default": 1, "minimum": 1, "description": "1-based index of the first result."}
                },
                "required": ["query"]
            }),
        ),
        ToolName::WikipediaSearch => (
            "Full-text search of encyclopedia articles.",
            json!({
                "type": "object",
                "properties": {
                    "lang": lang(),
                    "query": {"type": "string", "description": "Search terms."},
                    "limit": limit(10, 50)
                },
                "required": ["query"]
            }),
        ),
        ToolName::WikipediaPage => (
            "Plain-text content and section outline of an article.",
            title_schema("read"),
        ),
        ToolName::WikipediaPageById => (
            "Plain-text content of an article addressed by its numeric page id.",
            json!({
                "type": "object",
                "properties": {
                    "lang": lang(),
                    "page_id": {"type": "integer", "minimum": 1, "description": "Numeric page id."}
                },
                "required": ["page_id"]
            }),
        ),
        ToolName::WikipediaSummary => ("Introductory summary of an article.", title_schema("summarize")),
        ToolName::WikipediaRandom => (
            "Random articles. Never cached.",
            json!({
                "type": "object",
                "properties": {
                    "lang": lang(),
                    "count": limit(1, 20)
                }
            }),
        ),
        ToolName::WikipediaGeosearch => (
            "Articles about places near a coordinate.",
            json!({
                "type": "object",
                "properties": {
                    "lang": lang(),
                    "lat": {"type": "number", "minimum": -90, "maximum": 90},
                    "lon": {"type": "number", "minimum": -180, "maximum": 180},
                    "radius": {"type": "integer", "default": 1000, "minimum": 10, "maximum": 10000, "description": "Search radius in metres."},
                    "limit": limit(10, 500)
                },
                "required": ["lat", "lon"]
            }),
        ),
        ToolName::WikipediaLanguages => (
            "Titles of the same article in other languages.",
            title_schema("look up"),
        ),
        ToolName::WikipediaCategoryMembers => (
            "Pages and subcategories in a category.",
            json!({
                "type": "object",
                "properties": {
                    "lang": lang(),
                    "category": {"type": "string", "description": "Category name, with or without the \"Category:\" prefix."},
                    "limit": limit(50, 500)
                },
                "required": ["category"]
            }),
        ),
        ToolName::WikipediaMetadata => (
            "Page info, categories and outgoing links of an article.",
            title_schema("describe"),
        ),
        ToolName::WikipediaRelated => (
            "Articles similar to a given article.",
            json!({
                "type": "object",
                "properties": {
                    "lang": lang(),
                    "title": {"type": "string", "description": "Title of the reference article."},
                    "limit": limit(10, 50)
                },
                "required": ["title"]
            }),
        ),
        ToolName::DeduplicateContent => (
            "Drop near-duplicate items, keeping the first of each cluster. Items are compared by the words of their title and text.",
            json!({
                "type": "object",
                "properties": {
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": {"type": "string"},
                                "text": {"type": "string"}
                            }
                        }
                    },
                    "threshold": {
                        "type": "number",
                        "default": 0.8,
                        "minimum": 0,
                        "maximum": 1,
                        "description": "Items more similar than this to a kept item are dropped (0-1, default: 0.8)."
                    }
                },
                "required": ["items"]
            }),
        ),
        ToolName::ExtractKeywords => (
            "Most frequent meaningful words of a text.",
            json!({
                "type": "object",
                "properties": {
                    "text": text_schema(),
                    "limit": limit(10, 50)
                },
                "required": ["text"]
            }),
        ),
        ToolName::AnalyzeSentiment => (
            "Lexicon-based sentiment score between -1 and 1.",
            json!({
                "type": "object",
                "properties": {"text": text_schema()},
                "required": ["text"]
            }),
        ),
    };

    ToolDefinition::new(tool.as_ref(), description, schema)
}

/// Get all tool definitions.
pub fn definitions() -> Vec<ToolDefinition> {
    ToolName::iter().map(definition).collect()
}
