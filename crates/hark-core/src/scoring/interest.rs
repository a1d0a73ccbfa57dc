//! Topic interest scoring.

use std::collections::HashSet;
use std::sync::Arc;

use moka::sync::Cache;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::InterestConfig;
use crate::text::Tokenizer;

static NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\W_]+$").unwrap());

static FILLER: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["嗯", "啊", "哦", "哈", "哈哈", "嘿嘿", "哎", "欸"]
        .into_iter()
        .collect()
});

// Exponent below 1 lifts strong partial matches
const TOPIC_GAMMA: f64 = 0.8;

/// Scores how well a message matches configured interest topics.
///
/// Topics are fixed at construction; the only mutable part is the token cache.
pub struct InterestScorer {
    topics: Vec<Vec<String>>,
    tokenizer: Arc<dyn Tokenizer>,
    cache: Cache<String, Arc<Vec<String>>>,
    min_message_len: usize,
}

impl std::fmt::Debug for InterestScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterestScorer")
            .field("topics", &self.topics)
            .field("min_message_len", &self.min_message_len)
            .finish()
    }
}

impl InterestScorer {
    /// Build a scorer over keyword topics. Keywords are lowercased; empty ones dropped.
    pub fn new(
        topics: Vec<Vec<String>>,
        tokenizer: Arc<dyn Tokenizer>,
        config: &InterestConfig,
    ) -> Self {
        let topics = topics
            .into_iter()
            .map(|topic| {
                topic
                    .into_iter()
                    .map(|kw| kw.trim().to_lowercase())
                    .filter(|kw| !kw.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|topic| !topic.is_empty())
            .collect();

        Self {
            topics,
            tokenizer,
            cache: Cache::new(config.cache_size),
            min_message_len: config.min_message_len,
        }
    }

    /// Whether any topic is configured.
    pub fn has_topics(&self) -> bool {
        !self.topics.is_empty()
    }

    /// Interest score in `[0, 1]`.
    pub fn score(&self, text: &str) -> f64 {
        if self.is_noise(text) {
            return 0.0;
        }

        let tokens = self.tokens(text);
        let lowered = text.to_lowercase();

        self.topics
            .iter()
            .map(|topic| score_topic(&lowered, &tokens, topic))
            .fold(0.0, f64::max)
            .min(1.0)
    }

    fn is_noise(&self, text: &str) -> bool {
        let trimmed = text.trim();
        trimmed.chars().count() < self.min_message_len
            || NOISE.is_match(trimmed)
            || FILLER.contains(trimmed)
    }

    fn tokens(&self, text: &str) -> Arc<Vec<String>> {
        if let Some(hit) = self.cache.get(text) {
            return hit;
        }
        let tokens: Vec<String> = self
            .tokenizer
            .tokenize(&text.to_lowercase())
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect();
        let tokens = Arc::new(tokens);
        self.cache.insert(text.to_string(), Arc::clone(&tokens));
        tokens
    }

    #[cfg(test)]
    fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

fn score_topic(text: &str, tokens: &[String], topic: &[String]) -> f64 {
    let mut total = 0.0;
    let mut gained = 0.0;

    for kw in topic {
        let weight = keyword_weight(kw);
        total += weight;
        gained += weight * match_strength(kw, text, tokens);
    }

    if total == 0.0 {
        return 0.0;
    }
    (gained / total).powf(TOPIC_GAMMA)
}

/// Longer keywords are more specific and weigh more.
fn keyword_weight(kw: &str) -> f64 {
    match kw.chars().count() {
        0 | 1 => 0.8,
        2 => 1.2,
        3 => 1.5,
        _ => 1.8,
    }
}

fn match_strength(kw: &str, text: &str, tokens: &[String]) -> f64 {
    if tokens.iter().any(|t| t == kw) {
        return 1.0;
    }

    if let Some(byte_pos) = text.find(kw) {
        let pos = text[..byte_pos].chars().count() as f64;
        let len = text.chars().count().max(1) as f64;
        // Earlier in the message counts more
        return 0.7 * (1.0 - pos / len).max(0.5);
    }

    let kw_len = kw.chars().count();
    let hits = kw.chars().filter(|c| text.contains(*c)).count();
    if hits as f64 >= kw_len as f64 / 2.0 {
        return 0.35;
    }

    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::DictionaryTokenizer;
    use proptest::prelude::*;

    fn scorer(topics: &[&[&str]]) -> InterestScorer {
        let topics: Vec<Vec<String>> = topics
            .iter()
            .map(|t| t.iter().map(|s| s.to_string()).collect())
            .collect();
        let tokenizer = DictionaryTokenizer::with_words(topics.iter().flatten());
        InterestScorer::new(topics, Arc::new(tokenizer), &InterestConfig::default())
    }

    #[test]
    fn test_noise_scores_zero() {
        let s = scorer(&[&["游戏"]]);
        assert_eq!(s.score("游戏"), 0.0); // too short
        assert_eq!(s.score("!!!???"), 0.0);
        assert_eq!(s.score("  嘿嘿  "), 0.0);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let s = scorer(&[&["rust", "cargo"]]);
        assert_eq!(s.score(""), 0.0);
        assert_eq!(s.score("   "), 0.0);
    }

    #[test]
    fn test_whole_keyword_scores_full() {
        let s = scorer(&[&["打游戏"]]);
        assert!((s.score("打游戏") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_token_beats_substring() {
        let s = scorer(&[&["rust"]]);
        // "rust" is a whole token
        let token = s.score("i love rust");
        // "rust" only appears inside "rustacean"
        let substring = s.score("rustacean here");
        assert!((token - 1.0).abs() < 1e-9);
        assert!(substring < token);
        assert!(substring > 0.0);
    }

    #[test]
    fn test_position_weighting() {
        let s = scorer(&[&["cargo"]]);
        let early = s.score("cargobuild is slow today");
        let late = s.score("today is slow for cargobuild");
        assert!(early > late);
    }

    #[test]
    fn test_half_character_hit() {
        let s = scorer(&[&["排位"]]);
        // Only "排" appears: half of the keyword's characters
        let c = s.score("今天排队好久");
        assert!((c - 0.35_f64.powf(TOPIC_GAMMA)).abs() < 1e-9);
    }

    #[test]
    fn test_best_topic_wins() {
        let s = scorer(&[&["足球", "比赛"], &["编程", "rust"]]);
        let c = s.score("今天写rust编程");
        assert!((c - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_topics() {
        let s = scorer(&[]);
        assert!(!s.has_topics());
        assert_eq!(s.score("anything at all"), 0.0);
    }

    #[test]
    fn test_tokens_are_cached() {
        let s = scorer(&[&["rust"]]);
        s.score("rust rust rust");
        s.score("rust rust rust");
        assert_eq!(s.cached_entries(), 1);
    }

    proptest! {
        #[test]
        fn prop_score_in_unit_range(text in "\\PC{0,30}") {
            let s = scorer(&[&["游戏", "排位"], &["rust"]]);
            let c = s.score(&text);
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
