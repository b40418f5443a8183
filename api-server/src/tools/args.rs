use knowledge_search_client::dedup::ContentItem;
use serde::Deserialize;
use serde_inline_default::serde_inline_default;

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct WebSearchArgs {
    pub query: String,
    #[serde_inline_default(10)]
    pub num: u32,
    #[serde_inline_default(1)]
    pub start: u32,
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct WikiSearchArgs {
    #[serde(default)]
    pub lang: Option<String>,
    pub query: String,
    #[serde_inline_default(10)]
    pub limit: u32,
}

/// Arguments of every single-page lookup.
#[derive(Deserialize, Debug)]
pub struct TitleArgs {
    #[serde(default)]
    pub lang: Option<String>,
    pub title: String,
}

#[derive(Deserialize, Debug)]
pub struct PageIdArgs {
    #[serde(default)]
    pub lang: Option<String>,
    pub page_id: u64,
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct RandomArgs {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde_inline_default(1)]
    pub count: u32,
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct GeoSearchArgs {
    #[serde(default)]
    pub lang: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Metres
    #[serde_inline_default(1000)]
    pub radius: u32,
    #[serde_inline_default(10)]
    pub limit: u32,
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct CategoryArgs {
    #[serde(default)]
    pub lang: Option<String>,
    pub category: String,
    #[serde_inline_default(50)]
    pub limit: u32,
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct RelatedArgs {
    #[serde(default)]
    pub lang: Option<String>,
    pub title: String,
    #[serde_inline_default(10)]
    pub limit: u32,
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct DeduplicateArgs {
    pub items: Vec<ContentItem>,
    #[serde_inline_default(0.8)]
    pub threshold: f64,
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct KeywordArgs {
    pub text: String,
    #[serde_inline_default(10)]
    pub limit: u32,
}

#[derive(Deserialize, Debug)]
pub struct TextArgs {
    pub text: String,
}
