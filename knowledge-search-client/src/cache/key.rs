use super::tier::Tier;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Fully normalised cache key: the tier plus its canonical parameter string.
#[derive(Hash, Eq, PartialEq, Clone, Debug, PartialOrd, Ord)]
pub struct CacheKey {
    tier: Tier,
    canonical: String,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tier.as_ref(), self.canonical)
    }
}

/// Parameters of a cache lookup, normalised as they are added.
///
/// Names are sorted, strings trimmed and lower-cased, numbers rendered in one
/// canonical form. Two logically identical requests always produce the same
/// params regardless of the order fields were supplied in.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct KeyParams(BTreeMap<String, String>);

impl KeyParams {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(mut self, name: &str, value: String) -> Self {
        self.0.insert(name.trim().to_lowercase(), value);
        self
    }

    pub fn text(self, name: &str, value: &str) -> Self {
        let value = normalize_text(value);
        self.insert(name, value)
    }

    /// Page titles: underscores and spaces are interchangeable.
    pub fn title(self, name: &str, value: &str) -> Self {
        let value = normalize_text(&value.replace('_', " "));
        self.insert(name, value)
    }

    pub fn int(self, name: &str, value: i64) -> Self {
        self.insert(name, value.to_string())
    }

    pub fn float(self, name: &str, value: f64) -> Self {
        self.insert(name, canonical_float(value))
    }

    pub fn flag(self, name: &str, value: bool) -> Self {
        self.insert(name, value.to_string())
    }

    /// Free text of unbounded length is keyed by its SHA-256 digest.
    pub fn digest(self, name: &str, value: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize_text(value).as_bytes());
        self.insert(name, hex::encode(hasher.finalize()))
    }

    /// Normalise an arbitrary JSON parameter object.
    pub fn from_json(params: &serde_json::Map<String, Value>) -> Self {
        params.iter().fold(Self::new(), |acc, (name, value)| {
            let rendered = canonical_json(value);
            acc.insert(name, rendered)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn canonical_float(value: f64) -> String {
    // -0.0 and 0.0 are the same coordinate
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

/// Strings carry an `s:` tag so they never render like a number, bool or null.
/// Nested values are percent-encoded so separators inside them stay literal.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                (f as i64).to_string()
            }
            (None, Some(f)) => canonical_float(f),
            (None, None) => n.to_string(),
        },
        Value::String(s) => format!("s:{}", normalize_text(s)),
        Value::Array(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|item| urlencoding::encode(&canonical_json(item)).into_owned())
                .collect::<Vec<_>>()
                .join(",")
        ),
        Value::Object(map) => {
            let sorted: BTreeMap<String, String> = map
                .iter()
                .map(|(k, v)| (k.trim().to_lowercase(), canonical_json(v)))
                .collect();
            format!(
                "{{{}}}",
                sorted
                    .iter()
                    .map(|(k, v)| format!("{}:{}", urlencoding::encode(k), urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join(",")
            )
        }
    }
}

impl CacheKey {
    pub fn new(tier: Tier, params: &KeyParams) -> Self {
        Self {
            tier,
            canonical: params.canonical(),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn web_search(query: &str, num: u32, start: u32) -> Self {
        let params = KeyParams::new()
            .text("source", "web")
            .text("q", query)
            .int("num", num.into())
            .int("start", start.into());
        Self::new(Tier::Search, &params)
    }

    pub fn wiki_search(lang: &str, query: &str, limit: u32) -> Self {
        let params = KeyParams::new()
            .text("source", "wikipedia")
            .text("lang", lang)
            .text("q", query)
            .int("limit", limit.into());
        Self::new(Tier::Search, &params)
    }

    pub fn geosearch(lang: &str, lat: f64, lon: f64, radius: u32, limit: u32) -> Self {
        let params = KeyParams::new()
            .text("source", "geosearch")
            .text("lang", lang)
            .float("lat", lat)
            .float("lon", lon)
            .int("radius", radius.into())
            .int("limit", limit.into());
        Self::new(Tier::Search, &params)
    }

    pub fn page(lang: &str, title: &str) -> Self {
        Self::new(Tier::Page, &KeyParams::new().text("lang", lang).title("title", title))
    }

    pub fn page_by_id(lang: &str, page_id: u64) -> Self {
        let params = KeyParams::new()
            .text("lang", lang)
            .int("id", page_id as i64);
        Self::new(Tier::PageById, &params)
    }

    pub fn summary(lang: &str, title: &str) -> Self {
        Self::new(Tier::Summary, &KeyParams::new().text("lang", lang).title("title", title))
    }

    pub fn metadata(lang: &str, title: &str) -> Self {
        Self::new(Tier::Metadata, &KeyParams::new().text("lang", lang).title("title", title))
    }

    pub fn languages(lang: &str, title: &str) -> Self {
        Self::new(Tier::Language, &KeyParams::new().text("lang", lang).title("title", title))
    }

    pub fn category(lang: &str, category: &str, limit: u32) -> Self {
        let params = KeyParams::new()
            .text("lang", lang)
            .title("category", strip_category_prefix(category))
            .int("limit", limit.into());
        Self::new(Tier::Category, &params)
    }

    pub fn related(lang: &str, title: &str, limit: u32) -> Self {
        let params = KeyParams::new()
            .text("lang", lang)
            .title("title", title)
            .int("limit", limit.into());
        Self::new(Tier::Related, &params)
    }

    pub fn analysis(kind: &str, text: &str) -> Self {
        let params = KeyParams::new().text("kind", kind).digest("text", text);
        Self::new(Tier::Analysis, &params)
    }

    pub fn keywords(text: &str, limit: u32) -> Self {
        let params = KeyParams::new()
            .text("kind", "keywords")
            .int("limit", limit.into())
            .digest("text", text);
        Self::new(Tier::Analysis, &params)
    }
}

/// "Category:Physics" and "Physics" name the same category.
pub(crate) fn strip_category_prefix(category: &str) -> &str {
    let trimmed = category.trim();
    match trimmed.get(..9) {
        Some(prefix) if prefix.eq_ignore_ascii_case("category:") => &trimmed[9..],
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_cache_key_generation() {
        let key1 = CacheKey::page("en", "Tokyo");
        let key2 = CacheKey::page("en", "Tokyo");

        assert_eq!(key1, key2);
        assert_eq!(key1.to_string(), "page:lang=en&title=tokyo");

        // Different title should produce different key
        let key3 = CacheKey::page("en", "Kyoto");
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_casing_and_whitespace_are_not_significant() {
        assert_eq!(CacheKey::page("EN", "  Tokyo "), CacheKey::page("en", "tokyo"));
        assert_eq!(
            CacheKey::summary("en", "New_York  City"),
            CacheKey::summary("en", "new york city")
        );
        assert_eq!(
            CacheKey::web_search("Rust  Programming", 10, 1),
            CacheKey::web_search("rust programming", 10, 1)
        );
        assert_eq!(
            CacheKey::category("en", "Category:Physics", 50),
            CacheKey::category("en", "physics", 50)
        );
    }

    #[test]
    fn test_param_order_is_not_significant() {
        let a = KeyParams::new().text("lang", "en").title("title", "Paris");
        let b = KeyParams::new().title("title", "Paris").text("lang", "en");
        assert_eq!(CacheKey::new(Tier::Page, &a), CacheKey::new(Tier::Page, &b));

        let first = json!({"title": "Paris", "lang": "EN", "limit": 10});
        let second = json!({"limit": 10.0, "LANG": "en", "title": "paris"});
        assert_eq!(
            KeyParams::from_json(first.as_object().unwrap()),
            KeyParams::from_json(second.as_object().unwrap())
        );
    }

    #[test]
    fn test_numbers_render_consistently() {
        assert_eq!(
            CacheKey::geosearch("en", 35.0, -0.0, 1000, 10),
            CacheKey::geosearch("en", 35.0, 0.0, 1000, 10)
        );
        assert_eq!(
            CacheKey::geosearch("en", 35.6762, 139.6503, 1000, 10).to_string(),
            "search:lang=en&lat=35.6762&limit=10&lon=139.6503&radius=1000&source=geosearch"
        );
    }

    #[test]
    fn test_distinct_requests_never_collide() {
        let keys = vec![
            CacheKey::page("en", "Tokyo"),
            CacheKey::page("fr", "Tokyo"),
            CacheKey::page("en", "Kyoto"),
            CacheKey::summary("en", "Tokyo"),
            CacheKey::metadata("en", "Tokyo"),
            CacheKey::languages("en", "Tokyo"),
            CacheKey::related("en", "Tokyo", 5),
            CacheKey::related("en", "Tokyo", 10),
            CacheKey::page_by_id("en", 30057),
            CacheKey::page_by_id("fr", 30057),
            CacheKey::category("en", "Tokyo", 10),
            CacheKey::wiki_search("en", "Tokyo", 10),
            CacheKey::web_search("Tokyo", 10, 1),
            CacheKey::web_search("Tokyo", 10, 11),
            CacheKey::geosearch("en", 35.6, 139.6, 1000, 10),
            CacheKey::geosearch("en", 35.6, 139.6, 5000, 10),
            CacheKey::analysis("keywords", "Tokyo"),
            CacheKey::analysis("sentiment", "Tokyo"),
            CacheKey::analysis("keywords", "Kyoto"),
            CacheKey::keywords("Tokyo", 5),
            CacheKey::keywords("Tokyo", 10),
        ];
        let unique: HashSet<_> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn test_separators_in_values_cannot_forge_keys() {
        let injected = KeyParams::new().text("a", "1&b=2");
        let honest = KeyParams::new().text("a", "1").text("b", "2");
        assert_ne!(
            CacheKey::new(Tier::Search, &injected),
            CacheKey::new(Tier::Search, &honest)
        );

        // A title that looks like another language must not land on that key
        assert_ne!(CacheKey::page("en", "fr&title=x"), CacheKey::page("fr", "x"));
    }

    #[test]
    fn test_json_params_keep_structure_and_types_apart() {
        let pairs = [
            (json!({"tags": ["a,b"]}), json!({"tags": ["a", "b"]})),
            (json!({"tags": [["a"], "b"]}), json!({"tags": ["a", ["b"]]})),
            (json!({"tags": ["a]"]}), json!({"tags": [["a"]]})),
            (json!({"id": "1"}), json!({"id": 1})),
            (json!({"flag": "true"}), json!({"flag": true})),
            (json!({"missing": "null"}), json!({"missing": null})),
            (json!({"filter": {"k": "v,w:x"}}), json!({"filter": {"k": "v", "w": "x"}})),
        ];
        for (left, right) in pairs {
            assert_ne!(
                CacheKey::new(Tier::Search, &KeyParams::from_json(left.as_object().unwrap())),
                CacheKey::new(Tier::Search, &KeyParams::from_json(right.as_object().unwrap())),
                "{} vs {}",
                left,
                right
            );
        }
    }

    #[test]
    fn test_digest_keys_are_fixed_length() {
        let long_text = "lorem ipsum ".repeat(5_000);
        let key = CacheKey::analysis("keywords", &long_text);
        assert!(key.canonical().len() < 128);
        assert_eq!(key, CacheKey::analysis("keywords", &long_text.to_uppercase()));
    }

    #[test]
    fn test_strip_category_prefix() {
        assert_eq!(strip_category_prefix("Category:Physics"), "Physics");
        assert_eq!(strip_category_prefix("category:Physics"), "Physics");
        assert_eq!(strip_category_prefix(" Physics "), "Physics");
        assert_eq!(strip_category_prefix("Cat"), "Cat");
    }
}
