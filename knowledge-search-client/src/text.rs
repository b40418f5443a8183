//! Pure text helpers: HTML to plain text, keyword extraction, lexicon sentiment.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use strum_macros::{AsRefStr, Display};

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").unwrap();
    static ref NOISE_BLOCK: Regex =
        Regex::new(r#"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)>|<sup\b[^>]*class="[^"]*reference[^"]*"[^>]*>.*?</sup>|<!--.*?-->"#).unwrap();
    static ref BLOCK_TAG: Regex =
        Regex::new(r"(?i)</?(?:p|br|div|li|ul|ol|tr|table|h[1-6]|dd|dt|blockquote)\b[^>]*>").unwrap();
    static ref ANY_TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref ENTITY: Regex = Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap();
    static ref INLINE_SPACE: Regex = Regex::new(r"[ \t\u{a0}]+").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n\s*\n(?:\s*\n)+").unwrap();
    static ref STOP_WORDS: HashSet<&'static str> = [
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
        "one", "our", "out", "has", "have", "him", "his", "how", "its", "may", "new", "now", "old",
        "see", "two", "way", "who", "did", "get", "she", "too", "use", "that", "with", "this",
        "from", "they", "will", "would", "there", "their", "what", "about", "which", "when",
        "make", "like", "time", "just", "know", "take", "into", "year", "your", "some", "could",
        "them", "than", "then", "look", "only", "come", "over", "also", "back", "after", "work",
        "first", "well", "even", "want", "because", "these", "give", "most", "were", "been",
        "being", "such", "where", "while", "other", "more", "many", "very", "each", "both",
        "between", "during", "under", "through", "should", "does", "here", "those", "upon",
    ]
    .into_iter()
    .collect();
    static ref POSITIVE: HashSet<&'static str> = [
        "good", "great", "excellent", "amazing", "wonderful", "best", "love", "loved", "happy",
        "positive", "fantastic", "beautiful", "success", "successful", "win", "winning", "brilliant",
        "pleasant", "enjoy", "enjoyed", "favorable", "benefit", "improve", "improved", "popular",
        "strong", "helpful", "perfect", "outstanding", "impressive", "peaceful", "prosperous",
    ]
    .into_iter()
    .collect();
    static ref NEGATIVE: HashSet<&'static str> = [
        "bad", "terrible", "awful", "worst", "hate", "hated", "sad", "negative", "poor", "fail",
        "failed", "failure", "horrible", "ugly", "loss", "lose", "war", "death", "disaster",
        "crisis", "weak", "harmful", "broken", "decline", "declined", "violent", "conflict",
        "problem", "difficult", "dangerous", "corrupt", "painful",
    ]
    .into_iter()
    .collect();
    static ref NEGATIONS: HashSet<&'static str> =
        ["not", "no", "never", "without", "hardly", "nor"].into_iter().collect();
}

fn decode_entity(caps: &Captures) -> String {
    let entity = &caps[1];
    let decoded = match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "ndash" => Some('–'),
        "mdash" => Some('—'),
        _ if entity.starts_with("#x") || entity.starts_with("#X") => {
            u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
        }
        _ if entity.starts_with('#') => entity[1..].parse().ok().and_then(char::from_u32),
        _ => None,
    };
    decoded.map_or_else(|| caps[0].to_string(), String::from)
}

/// Reduce rendered HTML to readable plain text.
pub fn strip_html(html: &str) -> String {
    let text = NOISE_BLOCK.replace_all(html, "");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = ENTITY.replace_all(&text, decode_entity);
    let text = INLINE_SPACE.replace_all(&text, " ");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    BLANK_LINES
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD.find_iter(text).map(|word| word.as_str().to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub keyword: String,
    pub count: usize,
    /// Share of all retained words
    pub score: f64,
}

/// Most frequent non-trivial words, ties broken by first appearance.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<Keyword> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut total = 0;

    for (position, word) in words(text)
        .filter(|word| word.chars().count() >= 3)
        .filter(|word| !STOP_WORDS.contains(word.as_str()))
        .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
        .enumerate()
    {
        total += 1;
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(keyword, count, _)| Keyword {
            keyword,
            count,
            score: count as f64 / total as f64,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// In [-1, 1]
    pub score: f64,
    pub label: SentimentLabel,
    pub positive: usize,
    pub negative: usize,
}

/// Lexicon-based polarity. A negation word flips the next opinion word.
pub fn analyze_sentiment(text: &str) -> Sentiment {
    let mut positive = 0;
    let mut negative = 0;
    let mut negated = false;

    for word in words(text) {
        let word = word.as_str();
        if NEGATIONS.contains(word) {
            negated = true;
            continue;
        }
        let polarity = if POSITIVE.contains(word) {
            1
        } else if NEGATIVE.contains(word) {
            -1
        } else {
            0
        };
        match (polarity, negated) {
            (1, false) | (-1, true) => positive += 1,
            (-1, false) | (1, true) => negative += 1,
            _ => {}
        }
        if polarity != 0 {
            negated = false;
        }
    }

    let opinionated = positive + negative;
    let score = if opinionated == 0 {
        0.0
    } else {
        (positive as f64 - negative as f64) / opinionated as f64
    };
    let label = if score > 0.1 {
        SentimentLabel::Positive
    } else if score < -0.1 {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };

    Sentiment {
        score,
        label,
        positive,
        negative,
    }
}
