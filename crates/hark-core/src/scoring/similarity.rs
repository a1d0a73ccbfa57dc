//! Per-conversation TF-IDF similarity between user and bot messages.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::SimilarityConfig;
use crate::text::{symbols_to_spaces, Tokenizer};

static CQ_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[CQ:[^\]]+\]$").unwrap());
static SYMBOLS_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\W_]+$").unwrap());
static DIGITS_SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\W_]+$").unwrap());

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "的", "了", "吗", "吧", "啊", "哦", "嗯", "恩", "你", "我", "他", "她", "它", "这", "那",
        "就", "都", "又",
    ]
    .into_iter()
    .collect()
});

type Vector = HashMap<String, f64>;

/// Outcome of one similarity query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityReport {
    /// Best cosine found, in `[0, 1]`.
    pub score: f64,
    /// Candidates actually compared before returning.
    pub inspected: usize,
    /// Candidates left after preprocessing.
    pub candidates: usize,
}

impl SimilarityReport {
    fn empty() -> Self {
        Self {
            score: 0.0,
            inspected: 0,
            candidates: 0,
        }
    }
}

/// Sliding window of user messages for one conversation.
#[derive(Debug, Default)]
struct GroupIndex {
    history: VecDeque<Vec<String>>,
    df: HashMap<String, usize>,
    total_docs: usize,
}

impl GroupIndex {
    /// Add a document; the oldest one leaves the window once it is full.
    fn push(&mut self, tokens: Vec<String>, limit: usize) {
        let distinct: Vec<String> = unique(&tokens);
        for t in distinct {
            *self.df.entry(t).or_insert(0) += 1;
        }
        self.total_docs += 1;
        self.history.push_back(tokens);

        while self.history.len() > limit {
            let Some(old) = self.history.pop_front() else {
                break;
            };
            for t in unique(&old) {
                if let Some(count) = self.df.get_mut(&t) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        self.df.remove(&t);
                    }
                }
            }
            self.total_docs = self.total_docs.saturating_sub(1);
        }
    }

    fn vector(&self, tokens: &[String]) -> Vector {
        let docs = self.total_docs.max(1) as f64;
        let mut tf: HashMap<&str, usize> = HashMap::new();
        for t in tokens {
            *tf.entry(t.as_str()).or_insert(0) += 1;
        }
        tf.into_iter()
            .map(|(t, count)| {
                let df = self.df.get(t).copied().unwrap_or(0) as f64;
                let idf = ((docs + 1.0) / (df + 1.0)).ln() + 1.0;
                (t.to_string(), count as f64 * idf)
            })
            .collect()
    }
}

/// TF-IDF similarity engine with one isolated index per conversation.
pub struct SimilarityEngine {
    groups: DashMap<String, GroupIndex>,
    tokenizer: Arc<dyn Tokenizer>,
    config: SimilarityConfig,
}

impl std::fmt::Debug for SimilarityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityEngine")
            .field("groups", &self.groups.len())
            .field("config", &self.config)
            .finish()
    }
}

impl SimilarityEngine {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, config: SimilarityConfig) -> Self {
        Self {
            groups: DashMap::new(),
            tokenizer,
            config,
        }
    }

    /// Best cosine between `user_text` and any usable bot message.
    pub fn similarity(
        &self,
        gid: &str,
        user_text: &str,
        bot_messages: &[String],
        update_history: bool,
    ) -> f64 {
        self.similarity_report(gid, user_text, bot_messages, update_history)
            .score
    }

    /// Like [`similarity`](Self::similarity), also reporting how much work was done.
    pub fn similarity_report(
        &self,
        gid: &str,
        user_text: &str,
        bot_messages: &[String],
        update_history: bool,
    ) -> SimilarityReport {
        let user_tokens = self.tokenize(user_text);
        if user_tokens.is_empty() {
            return SimilarityReport::empty();
        }

        let mut index = self.groups.entry(gid.to_string()).or_default();
        if update_history {
            index.push(user_tokens.clone(), self.config.history_limit);
        }

        let user_vec = index.vector(&user_tokens);
        let candidates = self.preprocess(bot_messages);

        let mut report = SimilarityReport {
            candidates: candidates.len(),
            ..SimilarityReport::empty()
        };

        // Most recent bot message first
        for tokens in candidates.iter().rev() {
            let sim = cosine(&user_vec, &index.vector(tokens));
            report.inspected += 1;
            if sim > report.score {
                report.score = sim;
            }
            if sim >= self.config.early_stop {
                report.score = sim;
                break;
            }
        }

        report
    }

    /// Number of user messages currently indexed for a conversation.
    pub fn history_len(&self, gid: &str) -> usize {
        self.groups.get(gid).map(|g| g.history.len()).unwrap_or(0)
    }

    /// Document frequency of a token in a conversation's window.
    pub fn document_frequency(&self, gid: &str, token: &str) -> usize {
        self.groups
            .get(gid)
            .and_then(|g| g.df.get(token).copied())
            .unwrap_or(0)
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenizer
            .tokenize(&symbols_to_spaces(text).to_lowercase())
            .into_iter()
            .filter(|t| !t.trim().is_empty() && !STOP_WORDS.contains(t.as_str()))
            .collect()
    }

    /// Deduplicate and drop noise and template-like messages, keeping order.
    fn preprocess(&self, messages: &[String]) -> Vec<Vec<String>> {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();

        for msg in messages {
            if msg.is_empty() || !seen.insert(msg.as_str()) || is_noise(msg) {
                continue;
            }
            let tokens = self.tokenize(msg);
            if tokens.len() <= self.config.template_threshold {
                continue;
            }
            kept.push(tokens);
        }

        kept
    }
}

fn is_noise(text: &str) -> bool {
    let s = text.trim();
    s.is_empty() || CQ_TAG.is_match(s) || SYMBOLS_ONLY.is_match(s) || DIGITS_SYMBOLS.is_match(s)
}

fn unique(tokens: &[String]) -> Vec<String> {
    let set: HashSet<&String> = tokens.iter().collect();
    set.into_iter().cloned().collect()
}

fn cosine(a: &Vector, b: &Vector) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .map(|(k, v)| v * b.get(k).copied().unwrap_or(0.0))
        .sum();
    let norm_a = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = b.values().map(|v| v * v).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    // Rounding can push identical vectors a hair past 1
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}
