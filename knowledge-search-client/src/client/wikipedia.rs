use crate::error::Error;
use crate::fetcher::JsonFetcher;
use crate::models::{
    ArticleHit, CategoryMember, GeoResult, LanguageLink, PageContent, PageInfo, PageMetadata,
    PageSummary, RandomPage, Section,
};
use crate::text::strip_html;
use getset::Getters;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use surf::Url;

lazy_static! {
    static ref LANGUAGE_CODE: Regex = Regex::new(r"^[a-z][a-z0-9]{1,11}(?:-[a-z0-9]{1,11})*$").unwrap();
}

/// API error codes that mean "no such page" rather than a failure.
const NOT_FOUND_CODES: &[&str] = &["missingtitle", "nosuchpageid", "nosuchrevid"];

pub const MAX_SEARCH_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 500;
pub const MAX_RANDOM: u32 = 20;
pub const MAX_GEO_RADIUS: u32 = 10_000;

#[derive(Clone, Debug, Deserialize)]
pub struct WikipediaConfig {
    /// API endpoint with a `{lang}` placeholder
    pub endpoint_template: String,
    /// Article URL with `{lang}` and `{title}` placeholders
    pub article_url_template: String,
    pub default_language: String,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            endpoint_template: "https://{lang}.wikipedia.org/w/api.php".to_string(),
            article_url_template: "https://{lang}.wikipedia.org/wiki/{title}".to_string(),
            default_language: "en".to_string(),
        }
    }
}

/// Per-language MediaWiki API client.
#[derive(Clone, Getters)]
pub struct Wikipedia {
    fetcher: Arc<dyn JsonFetcher>,
    #[get = "pub"]
    config: WikipediaConfig,
}

#[derive(Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Deserialize, Default)]
struct Query {
    #[serde(default)]
    pages: Vec<RawPage>,
    #[serde(default)]
    search: Vec<RawSearchHit>,
    #[serde(default)]
    random: Vec<RawRandom>,
    #[serde(default)]
    geosearch: Vec<RawGeo>,
    #[serde(default)]
    categorymembers: Vec<RawMember>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Query,
}

#[derive(Deserialize)]
struct RawPage {
    #[serde(default)]
    pageid: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    extract: Option<String>,
    fullurl: Option<String>,
    #[serde(default)]
    length: u64,
    touched: Option<String>,
    #[serde(default)]
    langlinks: Vec<RawLangLink>,
    #[serde(default)]
    categories: Vec<RawTitle>,
    #[serde(default)]
    links: Vec<RawTitle>,
}

#[derive(Deserialize)]
struct RawLangLink {
    lang: String,
    title: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct RawTitle {
    title: String,
}

#[derive(Deserialize)]
struct RawSearchHit {
    title: String,
    #[serde(default)]
    pageid: u64,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    wordcount: u64,
    timestamp: Option<String>,
}

#[derive(Deserialize)]
struct RawRandom {
    id: u64,
    title: String,
}

#[derive(Deserialize)]
struct RawGeo {
    pageid: u64,
    title: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    dist: f64,
}

#[derive(Deserialize)]
struct RawMember {
    #[serde(default)]
    pageid: u64,
    #[serde(default)]
    ns: i64,
    title: String,
    #[serde(rename = "type")]
    member_type: Option<String>,
}

#[derive(Deserialize)]
struct ParseResponse {
    parse: RawParse,
}

#[derive(Deserialize)]
struct RawParse {
    title: String,
    pageid: u64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    sections: Vec<RawSection>,
}

#[derive(Deserialize)]
struct RawSection {
    #[serde(default)]
    index: String,
    #[serde(default)]
    level: String,
    #[serde(default)]
    line: String,
}

pub fn check_limit(name: &str, value: u32, max: u32) -> Result<(), Error> {
    if value == 0 || value > max {
        return Err(Error::InvalidParameter(format!(
            "{} must be between 1 and {}, got {}",
            name, max, value
        )));
    }
    Ok(())
}

pub fn check_title(title: &str) -> Result<(), Error> {
    if title.trim().is_empty() {
        return Err(Error::InvalidParameter("title must not be empty".to_string()));
    }
    if title.contains(['|', '#', '<', '>', '[', ']', '{', '}']) {
        return Err(Error::InvalidParameter(format!("illegal character in title {:?}", title)));
    }
    Ok(())
}

pub fn check_coordinates(lat: f64, lon: f64, radius: u32) -> Result<(), Error> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::InvalidParameter(format!(
            "coordinates out of range: {}, {}",
            lat, lon
        )));
    }
    if !(10..=MAX_GEO_RADIUS).contains(&radius) {
        return Err(Error::InvalidParameter(format!(
            "radius must be between 10 and {} metres, got {}",
            MAX_GEO_RADIUS, radius
        )));
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, Error> {
    Ok(serde_json::from_value(body)?)
}

/// A not-found call yields `Null`, which reads as an empty query.
fn decode_query(body: Value) -> Result<Query, Error> {
    if body.is_null() {
        return Ok(Query::default());
    }
    let response: QueryResponse = decode(body)?;
    Ok(response.query)
}

/// First page of a `prop=` query, or None when it is missing or invalid.
fn first_page(body: Value) -> Result<Option<RawPage>, Error> {
    Ok(decode_query(body)?
        .pages
        .into_iter()
        .next()
        .filter(|page| !page.missing && !page.invalid))
}

impl Wikipedia {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, config: WikipediaConfig) -> Self {
        Self { fetcher, config }
    }

    /// Normalise and validate a language code, falling back to the default.
    pub fn language(&self, lang: Option<&str>) -> Result<String, Error> {
        let lang = lang
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .unwrap_or(&self.config.default_language)
            .to_lowercase();
        if !LANGUAGE_CODE.is_match(&lang) {
            return Err(Error::InvalidParameter(format!("unsupported language code {:?}", lang)));
        }
        Ok(lang)
    }

    pub fn api_url(&self, lang: &str, params: &[(&str, &str)]) -> Result<Url, Error> {
        let endpoint = self.config.endpoint_template.replace("{lang}", lang);
        let base = [("format", "json"), ("formatversion", "2")];
        Url::parse_with_params(&endpoint, base.iter().chain(params.iter()))
            .map_err(|err| Error::Configuration(format!("invalid encyclopedia endpoint: {}", err)))
    }

    pub fn article_url(&self, lang: &str, title: &str) -> String {
        let slug = title.trim().replace(' ', "_");
        self.config
            .article_url_template
            .replace("{lang}", lang)
            .replace("{title}", &urlencoding::encode(&slug))
    }

    /// Perform an API call. Not-found API errors become `None`.
    async fn call(&self, lang: &str, params: &[(&str, &str)]) -> Result<Option<Value>, Error> {
        let url = self.api_url(lang, params)?;
        let mut body = self.fetcher.get_json(&url).await?;

        if let Some(error) = body.get_mut("error").map(Value::take) {
            let error: ApiError = decode(error)?;
            if NOT_FOUND_CODES.contains(&error.code.as_str()) {
                return Ok(None);
            }
            if error.code == "invalidtitle" {
                return Err(Error::InvalidParameter(error.info));
            }
            return Err(Error::Api {
                code: error.code,
                info: error.info,
            });
        }
        Ok(Some(body))
    }

    async fn query(&self, lang: &str, params: &[(&str, &str)]) -> Result<Value, Error> {
        let mut full = vec![("action", "query")];
        full.extend_from_slice(params);
        Ok(self.call(lang, &full).await?.unwrap_or(Value::Null))
    }

    pub async fn search(&self, lang: &str, query: &str, limit: u32) -> Result<Vec<ArticleHit>, Error> {
        let limit = limit.to_string();
        let body = self
            .query(
                lang,
                &[
                    ("list", "search"),
                    ("srsearch", query.trim()),
                    ("srlimit", limit.as_str()),
                    ("srprop", "snippet|wordcount|timestamp"),
                ],
            )
            .await?;
        Self::parse_search(body)
    }

    pub fn parse_search(body: Value) -> Result<Vec<ArticleHit>, Error> {
        Ok(decode_query(body)?
            .search
            .into_iter()
            .map(|hit| ArticleHit {
                title: hit.title,
                page_id: hit.pageid,
                snippet: strip_html(&hit.snippet),
                word_count: hit.wordcount,
                timestamp: hit.timestamp,
            })
            .collect())
    }

    /// Articles similar to `title`, via the `morelike:` search operator.
    pub async fn related(&self, lang: &str, title: &str, limit: u32) -> Result<Vec<ArticleHit>, Error> {
        self.search(lang, &format!("morelike:{}", title.trim()), limit).await
    }

    pub async fn page(&self, lang: &str, title: &str) -> Result<Option<PageContent>, Error> {
        self.parse_page(lang, ("page", title.trim())).await
    }

    pub async fn page_by_id(&self, lang: &str, page_id: u64) -> Result<Option<PageContent>, Error> {
        let page_id = page_id.to_string();
        self.parse_page(lang, ("pageid", page_id.as_str())).await
    }

    async fn parse_page(&self, lang: &str, target: (&str, &str)) -> Result<Option<PageContent>, Error> {
        let body = self
            .call(
                lang,
                &[
                    ("action", "parse"),
                    target,
                    ("prop", "text|sections"),
                    ("redirects", "1"),
                    ("disableeditsection", "1"),
                    ("disabletoc", "1"),
                ],
            )
            .await?;

        body.map(|body| self.parse_content(lang, body)).transpose()
    }

    pub fn parse_content(&self, lang: &str, body: Value) -> Result<PageContent, Error> {
        let response: ParseResponse = decode(body)?;
        let parse = response.parse;
        Ok(PageContent {
            url: self.article_url(lang, &parse.title),
            title: parse.title,
            page_id: parse.pageid,
            language: lang.to_string(),
            text: strip_html(&parse.text),
            sections: parse
                .sections
                .into_iter()
                .map(|section| Section {
                    index: section.index,
                    level: section.level.parse().unwrap_or(0),
                    title: strip_html(&section.line),
                })
                .collect(),
        })
    }

    pub async fn summary(&self, lang: &str, title: &str) -> Result<Option<PageSummary>, Error> {
        let body = self
            .query(
                lang,
                &[
                    ("prop", "extracts|info"),
                    ("exintro", "1"),
                    ("explaintext", "1"),
                    ("inprop", "url"),
                    ("redirects", "1"),
                    ("titles", title.trim()),
                ],
            )
            .await?;

        Ok(first_page(body)?.map(|page| PageSummary {
            url: page
                .fullurl
                .unwrap_or_else(|| self.article_url(lang, &page.title)),
            title: page.title,
            page_id: page.pageid,
            language: lang.to_string(),
            extract: page.extract.unwrap_or_default().trim().to_string(),
        }))
    }

    pub async fn random(&self, lang: &str, count: u32) -> Result<Vec<RandomPage>, Error> {
        let count = count.to_string();
        let body = self
            .query(lang, &[("list", "random"), ("rnnamespace", "0"), ("rnlimit", count.as_str())])
            .await?;

        Ok(decode_query(body)?
            .random
            .into_iter()
            .map(|page| RandomPage {
                title: page.title,
                page_id: page.id,
            })
            .collect())
    }

    pub async fn geosearch(
        &self,
        lang: &str,
        lat: f64,
        lon: f64,
        radius: u32,
        limit: u32,
    ) -> Result<Vec<GeoResult>, Error> {
        let coord = format!("{}|{}", lat, lon);
        let radius = radius.to_string();
        let limit = limit.to_string();
        let body = self
            .query(
                lang,
                &[
                    ("list", "geosearch"),
                    ("gscoord", coord.as_str()),
                    ("gsradius", radius.as_str()),
                    ("gslimit", limit.as_str()),
                ],
            )
            .await?;

        Ok(decode_query(body)?
            .geosearch
            .into_iter()
            .map(|hit| GeoResult {
                title: hit.title,
                page_id: hit.pageid,
                lat: hit.lat,
                lon: hit.lon,
                distance: hit.dist,
            })
            .collect())
    }

    /// Interlanguage links; None when the page does not exist.
    pub async fn languages(&self, lang: &str, title: &str) -> Result<Option<Vec<LanguageLink>>, Error> {
        let body = self
            .query(
                lang,
                &[
                    ("prop", "langlinks"),
                    ("lllimit", "max"),
                    ("llprop", "url"),
                    ("redirects", "1"),
                    ("titles", title.trim()),
                ],
            )
            .await?;

        Ok(first_page(body)?.map(|page| {
            page.langlinks
                .into_iter()
                .map(|link| LanguageLink {
                    language: link.lang,
                    title: link.title,
                    url: link.url,
                })
                .collect()
        }))
    }

    /// Members of a category; an unknown or empty category yields an empty list.
    pub async fn category_members(
        &self,
        lang: &str,
        category: &str,
        limit: u32,
    ) -> Result<Vec<CategoryMember>, Error> {
        let title = format!("Category:{}", crate::cache::key::strip_category_prefix(category));
        let limit = limit.to_string();
        let body = self
            .query(
                lang,
                &[
                    ("list", "categorymembers"),
                    ("cmtitle", title.as_str()),
                    ("cmlimit", limit.as_str()),
                    ("cmprop", "ids|title|type"),
                ],
            )
            .await?;

        Ok(decode_query(body)?
            .categorymembers
            .into_iter()
            .map(|member| CategoryMember {
                title: member.title,
                page_id: member.pageid,
                namespace: member.ns,
                member_type: member.member_type,
            })
            .collect())
    }

    pub async fn page_info(&self, lang: &str, title: &str) -> Result<Option<PageInfo>, Error> {
        let body = self
            .query(
                lang,
                &[
                    ("prop", "info"),
                    ("inprop", "url"),
                    ("redirects", "1"),
                    ("titles", title.trim()),
                ],
            )
            .await?;

        Ok(first_page(body)?.map(|page| PageInfo {
            url: page
                .fullurl
                .unwrap_or_else(|| self.article_url(lang, &page.title)),
            title: page.title,
            page_id: page.pageid,
            length: page.length,
            last_touched: page.touched,
        }))
    }

    /// Visible categories of a page, without the "Category:" prefix.
    pub async fn page_categories(&self, lang: &str, title: &str) -> Result<Option<Vec<String>>, Error> {
        let body = self
            .query(
                lang,
                &[
                    ("prop", "categories"),
                    ("cllimit", "max"),
                    ("clshow", "!hidden"),
                    ("redirects", "1"),
                    ("titles", title.trim()),
                ],
            )
            .await?;

        Ok(first_page(body)?.map(|page| {
            page.categories
                .into_iter()
                .map(|category| crate::cache::key::strip_category_prefix(&category.title).to_string())
                .collect()
        }))
    }

    /// Article-namespace links out of a page (first batch only).
    pub async fn page_links(&self, lang: &str, title: &str) -> Result<Option<Vec<String>>, Error> {
        let body = self
            .query(
                lang,
                &[
                    ("prop", "links"),
                    ("pllimit", "max"),
                    ("plnamespace", "0"),
                    ("redirects", "1"),
                    ("titles", title.trim()),
                ],
            )
            .await?;

        Ok(first_page(body)?.map(|page| page.links.into_iter().map(|link| link.title).collect()))
    }

    /// Info, categories and links fetched concurrently. Any branch failing fails the whole.
    pub async fn metadata(&self, lang: &str, title: &str) -> Result<Option<PageMetadata>, Error> {
        let (info, categories, links) = futures::try_join!(
            self.page_info(lang, title),
            self.page_categories(lang, title),
            self.page_links(lang, title),
        )?;

        Ok(info.map(|info| PageMetadata {
            language: lang.to_string(),
            info,
            categories: categories.unwrap_or_default(),
            links: links.unwrap_or_default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::FakeFetcher;
    use serde_json::json;

    fn wikipedia(fetcher: FakeFetcher) -> Wikipedia {
        Wikipedia::new(Arc::new(fetcher), WikipediaConfig::default())
    }

    #[test]
    fn test_language_defaults_and_validation() {
        let wiki = wikipedia(FakeFetcher::new());
        assert_eq!(wiki.language(None).unwrap(), "en");
        assert_eq!(wiki.language(Some("  ")).unwrap(), "en");
        assert_eq!(wiki.language(Some("DE")).unwrap(), "de");
        assert_eq!(wiki.language(Some("zh-yue")).unwrap(), "zh-yue");
        assert!(wiki.language(Some("e")).is_err());
        assert!(wiki.language(Some("en.evil.com/")).is_err());
    }

    #[test]
    fn test_urls() {
        let wiki = wikipedia(FakeFetcher::new());
        let url = wiki.api_url("ja", &[("action", "query"), ("titles", "A|B")]).unwrap();
        assert_eq!(url.host_str(), Some("ja.wikipedia.org"));
        assert_eq!(
            url.query(),
            Some("format=json&formatversion=2&action=query&titles=A%7CB")
        );
        assert_eq!(
            wiki.article_url("en", "New York City"),
            "https://en.wikipedia.org/wiki/New_York_City"
        );
        assert_eq!(
            wiki.article_url("fr", "Côte d'Ivoire"),
            "https://fr.wikipedia.org/wiki/C%C3%B4te_d%27Ivoire"
        );
    }

    #[test]
    fn test_parameter_checks() {
        assert!(check_limit("limit", 1, MAX_SEARCH_LIMIT).is_ok());
        assert!(check_limit("limit", 0, MAX_SEARCH_LIMIT).is_err());
        assert!(check_limit("limit", 51, MAX_SEARCH_LIMIT).is_err());
        assert!(check_title("Tokyo").is_ok());
        assert!(check_title("A|B").is_err());
        assert!(check_coordinates(-90.0, 180.0, 10).is_ok());
        assert!(check_coordinates(0.0, 180.5, 100).is_err());
        assert!(check_coordinates(0.0, 0.0, MAX_GEO_RADIUS + 1).is_err());
        assert!(check_coordinates(f64::NAN, 0.0, 100).is_err());
    }

    #[test]
    fn test_parse_search_strips_markup() {
        let hits = Wikipedia::parse_search(json!({
            "query": {"search": [
                {"title": "Rust", "pageid": 1, "wordcount": 5,
                 "snippet": "<span class=\"searchmatch\">Rust</span> &amp; iron oxide"}
            ]}
        }))
        .unwrap();
        assert_eq!(hits[0].snippet, "Rust & iron oxide");
        assert_eq!(hits[0].timestamp, None);
        assert!(Wikipedia::parse_search(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_parse_content_without_sections() {
        let wiki = wikipedia(FakeFetcher::new());
        let page = wiki
            .parse_content(
                "en",
                json!({"parse": {"title": "Stub", "pageid": 9, "text": "<p>Short&nbsp;text</p><style>.x{}</style>"}}),
            )
            .unwrap();
        assert_eq!(page.text, "Short text");
        assert!(page.sections.is_empty());
        assert_eq!(page.language, "en");
    }

    #[tokio::test]
    async fn test_not_found_codes_become_none() {
        let wiki = wikipedia(
            FakeFetcher::new()
                .route(&[("pageid", "404")], Ok(json!({"error": {"code": "nosuchpageid", "info": "x"}})))
                .route(&[("page", "Bad")], Ok(json!({"error": {"code": "invalidtitle", "info": "Bad title"}}))),
        );

        assert_eq!(wiki.page_by_id("en", 404).await.unwrap(), None);
        assert_eq!(
            wiki.page("en", "Bad").await.unwrap_err(),
            Error::InvalidParameter("Bad title".to_string())
        );
    }

    #[tokio::test]
    async fn test_metadata_of_missing_page() {
        let missing = json!({"query": {"pages": [{"ns": 0, "title": "Nope", "missing": true}]}});
        let wiki = wikipedia(FakeFetcher::new().route(&[("titles", "Nope")], Ok(missing)));
        assert_eq!(wiki.metadata("en", "Nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_metadata_fails_when_any_branch_fails() {
        let page = json!({"query": {"pages": [{"pageid": 1, "ns": 0, "title": "Tokyo"}]}});
        let wiki = wikipedia(
            FakeFetcher::new()
                .route(&[("prop", "info")], Ok(page.clone()))
                .route(&[("prop", "categories")], Ok(page)),
        );
        assert!(matches!(
            wiki.metadata("en", "Tokyo").await,
            Err(Error::Http { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_category_members_uses_prefixed_title() {
        let fetcher = Arc::new(FakeFetcher::new().route(
            &[("cmtitle", "Category:Physics")],
            Ok(json!({"query": {"categorymembers": []}})),
        ));
        let wiki = Wikipedia::new(fetcher.clone(), WikipediaConfig::default());

        assert!(wiki.category_members("en", "Physics", 10).await.unwrap().is_empty());
        assert!(wiki.category_members("en", "Category:Physics", 10).await.unwrap().is_empty());
        assert_eq!(fetcher.calls(), 2);
    }
}
