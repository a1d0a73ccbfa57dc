//! Lexicon-driven intent confidence.
//!
//! One algorithm, five keyword tables. A message is tokenized, each token found
//! in the intent's table contributes `weight × intensity` (softened by nearby
//! negations or a rhetorical question), a density and multi-hit bonus is added,
//! and the total is squashed through a sigmoid centred at 1.5.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use super::lexicon::{
    KeywordTable, RawTable, BOREDOM, INSULT, NEGATION_WORDS, QUESTION, RHETORICAL_WORDS,
    ROBOTIC, SHUT_UP, STOP_WORDS,
};
use crate::error::HarkResult;
use crate::text::{strip_symbols, Tokenizer};

/// Highest confidence the scorer reports.
pub const MAX_CONFIDENCE: f64 = 0.99;

// Tokens before a keyword searched for a negation
const NEGATION_WINDOW: usize = 3;

/// The intents the scorer classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ShutUp,
    Insult,
    Boredom,
    Question,
    Robotic,
}

impl Intent {
    fn builtin_table(&self) -> RawTable {
        match self {
            Intent::ShutUp => SHUT_UP,
            Intent::Insult => INSULT,
            Intent::Boredom => BOREDOM,
            Intent::Question => QUESTION,
            Intent::Robotic => ROBOTIC,
        }
    }
}

/// Stateless intent scorer.
pub struct SentimentScorer {
    tokenizer: Arc<dyn Tokenizer>,
    tables: HashMap<Intent, KeywordTable>,
}

impl std::fmt::Debug for SentimentScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentScorer")
            .field("tables", &self.tables.len())
            .finish()
    }
}

impl SentimentScorer {
    /// Build a scorer over the built-in tables.
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> HarkResult<Self> {
        let mut tables = HashMap::new();
        for intent in Intent::iter() {
            let table = KeywordTable::new(intent.builtin_table().iter().copied())?;
            tables.insert(intent, table);
        }
        Ok(Self { tokenizer, tables })
    }

    /// Replace the table for one intent.
    pub fn with_table(mut self, intent: Intent, table: KeywordTable) -> Self {
        self.tables.insert(intent, table);
        self
    }

    /// Every phrase the built-in lexicons know, for seeding a dictionary tokenizer.
    pub fn builtin_phrases() -> Vec<&'static str> {
        let mut phrases: Vec<&'static str> = Intent::iter()
            .flat_map(|intent| intent.builtin_table().iter().map(|(phrase, _, _)| *phrase))
            .collect();
        phrases.extend(NEGATION_WORDS.iter().copied());
        phrases.extend(RHETORICAL_WORDS.iter().copied());
        phrases
    }

    /// Confidence in `[0, 0.99]` that `text` expresses `intent`.
    pub fn score(&self, intent: Intent, text: &str) -> f64 {
        let Some(table) = self.tables.get(&intent) else {
            return 0.0;
        };
        let tokens = self.segment(text);
        confidence(&tokens, table)
    }

    pub fn shut_up(&self, text: &str) -> f64 {
        self.score(Intent::ShutUp, text)
    }

    pub fn insult(&self, text: &str) -> f64 {
        self.score(Intent::Insult, text)
    }

    pub fn bored(&self, text: &str) -> f64 {
        self.score(Intent::Boredom, text)
    }

    pub fn ask(&self, text: &str) -> f64 {
        self.score(Intent::Question, text)
    }

    pub fn robotic(&self, text: &str) -> f64 {
        self.score(Intent::Robotic, text)
    }

    /// Normalized tokens with blanks and stop-words removed.
    pub fn segment(&self, text: &str) -> Vec<String> {
        self.tokenizer
            .tokenize(&strip_symbols(text))
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t.as_str()))
            .collect()
    }
}

fn confidence(tokens: &[String], table: &KeywordTable) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }

    let rhetorical = tokens
        .iter()
        .any(|t| RHETORICAL_WORDS.contains(t.as_str()));

    let mut base = 0.0;
    let mut matches = 0usize;

    for (i, token) in tokens.iter().enumerate() {
        let Some(kw) = table.get(token) else {
            continue;
        };
        let (mut weight, mut intensity) = (kw.weight, kw.intensity);

        let window = &tokens[i.saturating_sub(NEGATION_WINDOW)..i];
        if window.iter().any(|t| NEGATION_WORDS.contains(t.as_str())) {
            weight *= 0.3;
            intensity *= 0.5;
        } else if rhetorical {
            weight *= 0.7;
            intensity *= 0.8;
        }

        base += weight * intensity;
        matches += 1;
    }

    let mut bonus = 0.0;
    if matches > 0 {
        let density = matches as f64 / tokens.len() as f64;
        bonus += (density * 5.0).min(1.0) * 0.5;
        if matches > 1 {
            bonus += ((matches - 1) as f64 * 0.4).min(1.0);
        }
    }

    sigmoid(4.0 * (base + bonus - 1.5)).min(MAX_CONFIDENCE)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::DictionaryTokenizer;
    use proptest::prelude::*;

    fn scorer() -> SentimentScorer {
        let tokenizer = DictionaryTokenizer::with_words(SentimentScorer::builtin_phrases());
        SentimentScorer::new(Arc::new(tokenizer)).unwrap()
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let s = scorer();
        assert_eq!(s.shut_up(""), 0.0);
        assert_eq!(s.shut_up("！！！"), 0.0);
        // Stop-words only
        assert_eq!(s.insult("的了吧"), 0.0);
    }

    #[test]
    fn test_single_strong_keyword() {
        // base 2.0, density bonus 0.5 => sigmoid(4.0)
        let c = scorer().shut_up("闭嘴");
        assert!((c - sigmoid(4.0)).abs() < 1e-9);
        assert!(c > 0.98);
    }

    #[test]
    fn test_unrelated_text_scores_low() {
        let s = scorer();
        assert!(s.shut_up("今天天气不错") < 0.01);
        assert!(s.insult("hello world") < 0.01);
    }

    #[test]
    fn test_negation_weakens() {
        let s = scorer();
        let plain = s.shut_up("闭嘴");
        let negated = s.shut_up("不闭嘴");
        assert!(negated < plain);
        assert!(negated < 0.1);
    }

    #[test]
    fn test_english_contraction_negates() {
        let s = scorer();
        let plain = s.shut_up("please shut up");
        let negated = s.shut_up("Please don't shut up!");
        assert!(plain > 0.9);
        assert!(negated < plain);
        assert!(negated < 0.1);
    }

    #[test]
    fn test_rhetorical_softens() {
        let s = scorer();
        let plain = s.insult("你是猪");
        let rhetorical = s.insult("难道你是猪");
        assert!(rhetorical < plain);
    }

    #[test]
    fn test_multiple_matches_capped() {
        let c = scorer().ask("请问怎么办");
        assert!((c - MAX_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn test_each_intent_has_a_hit() {
        let s = scorer();
        assert!(s.insult("傻逼") > 0.9);
        assert!(s.bored("好无聊啊") > 0.9);
        assert!(s.robotic("作为一个人工智能") > 0.9);
        assert!(s.shut_up("Shut up!") > 0.9);
    }

    #[test]
    fn test_custom_table() {
        let table = KeywordTable::new([("走开", 1.0, 2.0)]).unwrap();
        let tokenizer = DictionaryTokenizer::with_words(["走开"]);
        let s = SentimentScorer::new(Arc::new(tokenizer))
            .unwrap()
            .with_table(Intent::ShutUp, table);
        assert!(s.shut_up("走开") > 0.9);
        assert!(s.shut_up("闭嘴") < 0.1);
    }

    proptest! {
        #[test]
        fn prop_confidence_in_range(text in "\\PC{0,40}") {
            let s = scorer();
            for intent in Intent::iter() {
                let c = s.score(intent, &text);
                prop_assert!((0.0..=MAX_CONFIDENCE).contains(&c));
            }
        }

        #[test]
        fn prop_deterministic(text in "[a-z闭嘴无聊请问 ]{0,20}") {
            let s = scorer();
            prop_assert_eq!(s.bored(&text), s.bored(&text));
        }
    }
}
