//! Near-duplicate suppression for fetched content lists.
//!
//! Items are tokenized into lower-cased `\w+` words (punctuation separates
//! tokens, so "Cat facts!" and "cat facts" are the same set) and compared
//! with Jaccard similarity against every item already kept. The first item
//! of a cluster wins.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").unwrap();
}

/// Anything with a title and/or body that can be compared for duplication.
pub trait TextContent {
    fn title(&self) -> Option<&str>;
    fn text(&self) -> Option<&str>;
}

/// A free-form content item as supplied by callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body text; search snippets and summary extracts are accepted too
    #[serde(
        default,
        alias = "snippet",
        alias = "extract",
        alias = "content",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<String>,
    /// Any other fields travel through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentItem {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }
}

impl TextContent for ContentItem {
    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DedupError {
    #[error("Similarity threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),
}

pub fn validate_threshold(threshold: f64) -> Result<(), DedupError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(DedupError::ThresholdOutOfRange(threshold))
    }
}

/// Lower-cased word set of an item's title and text combined.
pub fn tokens<T: TextContent + ?Sized>(item: &T) -> HashSet<String> {
    [item.title(), item.text()]
        .into_iter()
        .flatten()
        .flat_map(|field| WORD.find_iter(field))
        .map(|word| word.as_str().to_lowercase())
        .collect()
}

/// J(A, B) = |A ∩ B| / |A ∪ B|, and 0.0 when either set is empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

pub fn similarity<A: TextContent + ?Sized, B: TextContent + ?Sized>(a: &A, b: &B) -> f64 {
    jaccard(&tokens(a), &tokens(b))
}

/// Similarity must exceed the threshold, except at 1.0 where identical sets count.
fn is_duplicate(similarity: f64, threshold: f64) -> bool {
    similarity > threshold || (threshold >= 1.0 && similarity >= 1.0)
}

/// Keep items in order, dropping any whose similarity to an already kept item
/// exceeds `threshold`.
pub fn deduplicate<T: TextContent>(items: Vec<T>, threshold: f64) -> Result<Vec<T>, DedupError> {
    validate_threshold(threshold)?;

    let total = items.len();
    let mut kept: Vec<T> = Vec::with_capacity(total);
    let mut kept_tokens: Vec<HashSet<String>> = Vec::with_capacity(total);

    for item in items {
        let candidate = tokens(&item);
        let duplicate = kept_tokens
            .iter()
            .any(|accepted| is_duplicate(jaccard(&candidate, accepted), threshold));

        if !duplicate {
            kept.push(item);
            kept_tokens.push(candidate);
        }
    }

    log::debug!(
        "Deduplicated {} items down to {} at threshold {}",
        total,
        kept.len(),
        threshold
    );
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(items: &[ContentItem]) -> Vec<&str> {
        items.iter().filter_map(|item| item.title.as_deref()).collect()
    }

    fn sample() -> Vec<ContentItem> {
        vec![
            ContentItem::titled("Rust programming language"),
            ContentItem::titled("The Rust programming language"),
            ContentItem::titled("Rust language"),
            ContentItem::titled("Tokyo travel guide"),
            ContentItem::titled("Tokyo travel"),
            ContentItem::titled("Paris"),
            ContentItem::default(),
            ContentItem::default(),
        ]
    }

    #[test]
    fn test_punctuation_is_not_part_of_tokens() {
        let items = vec![
            ContentItem::titled("Cat facts"),
            ContentItem::titled("Cat facts!"),
            ContentItem::titled("Dog breeds"),
        ];
        assert_eq!(similarity(&items[0], &items[1]), 1.0);

        let result = deduplicate(items, 0.5).unwrap();
        assert_eq!(titles(&result), vec!["Cat facts", "Dog breeds"]);
    }

    #[test]
    fn test_similarity_combines_title_and_text() {
        let a = ContentItem::titled("Tokyo").with_text("capital of Japan");
        let b = ContentItem::default().with_text("TOKYO capital");
        // {tokyo, capital, of, japan} vs {tokyo, capital}
        assert_eq!(similarity(&a, &b), 0.5);
    }

    #[test]
    fn test_empty_items_are_never_duplicates() {
        let empty = ContentItem::default();
        let blank = ContentItem::titled("   ").with_text("");
        assert_eq!(similarity(&empty, &blank), 0.0);

        let result = deduplicate(vec![empty.clone(), blank, empty], 0.0).unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_empty_input() {
        let result = deduplicate(Vec::<ContentItem>::new(), 0.5).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_zero_threshold_suppresses_any_overlap() {
        let items = vec![
            ContentItem::titled("alpha beta"),
            ContentItem::titled("beta gamma delta epsilon"),
            ContentItem::titled("zeta"),
        ];
        let result = deduplicate(items, 0.0).unwrap();
        assert_eq!(titles(&result), vec!["alpha beta", "zeta"]);
    }

    #[test]
    fn test_threshold_one_only_drops_exact_sets() {
        let items = vec![
            ContentItem::titled("a b c"),
            ContentItem::titled("C, B, A"),
            ContentItem::titled("a b c d"),
        ];
        let result = deduplicate(items, 1.0).unwrap();
        assert_eq!(titles(&result), vec!["a b c", "a b c d"]);
    }

    #[test]
    fn test_compares_only_against_kept_items() {
        // b is dropped as a near copy of a; c resembles b (0.67) but not a (0.5), so it stays
        let items = vec![
            ContentItem::titled("one two three four"),
            ContentItem::titled("one two three four five"),
            ContentItem::titled("two three four five six"),
        ];
        let result = deduplicate(items, 0.5).unwrap();
        assert_eq!(
            titles(&result),
            vec!["one two three four", "two three four five six"]
        );
    }

    #[test]
    fn test_first_of_cluster_wins() {
        let items = vec![
            ContentItem::titled("tokyo travel"),
            ContentItem::titled("tokyo travel guide"),
        ];
        let forward = deduplicate(items.clone(), 0.5).unwrap();
        let backward = deduplicate(items.into_iter().rev().collect(), 0.5).unwrap();
        assert_eq!(titles(&forward), vec!["tokyo travel"]);
        assert_eq!(titles(&backward), vec!["tokyo travel guide"]);
    }

    #[test]
    fn test_idempotent() {
        for threshold in [0.0, 0.2, 0.5, 0.7, 1.0] {
            let once = deduplicate(sample(), threshold).unwrap();
            let twice = deduplicate(once.clone(), threshold).unwrap();
            assert_eq!(once, twice, "threshold {threshold}");
        }
    }

    #[test]
    fn test_output_is_ordered_subsequence() {
        let input = sample();
        let output = deduplicate(input.clone(), 0.4).unwrap();

        let mut cursor = input.iter();
        for kept in &output {
            assert!(cursor.any(|candidate| candidate == kept));
        }
    }

    #[test]
    fn test_stricter_threshold_keeps_fewer() {
        let thresholds = [0.0, 0.25, 0.5, 0.75, 1.0];
        let lengths: Vec<usize> = thresholds
            .iter()
            .map(|&t| deduplicate(sample(), t).unwrap().len())
            .collect();
        assert!(lengths.windows(2).all(|pair| pair[0] <= pair[1]), "{lengths:?}");
    }

    #[test]
    fn test_out_of_range_threshold_is_rejected() {
        assert_eq!(
            deduplicate(sample(), 1.5).unwrap_err(),
            DedupError::ThresholdOutOfRange(1.5)
        );
        assert!(deduplicate(sample(), -0.1).is_err());
        assert!(deduplicate(sample(), f64::NAN).is_err());
    }

    #[test]
    fn test_extra_fields_pass_through() {
        let item: ContentItem =
            serde_json::from_str(r#"{"title": "Tokyo", "link": "https://example.org"}"#).unwrap();
        assert_eq!(item.extra.get("link").and_then(Value::as_str), Some("https://example.org"));

        let round = serde_json::to_value(&item).unwrap();
        assert_eq!(round["link"], "https://example.org");
        assert!(round.get("text").is_none());
    }
}
