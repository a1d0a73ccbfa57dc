//! Keyword tables for the sentiment scorer.
//!
//! Each table maps a trigger phrase to `(weight, intensity)`. Weight says how
//! reliably the phrase signals the intent; intensity says how strongly.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{HarkError, HarkResult};

/// Weight and intensity of one trigger phrase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeywordWeight {
    pub weight: f64,
    pub intensity: f64,
}

/// Validated phrase → weight table.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    entries: HashMap<String, KeywordWeight>,
}

impl KeywordTable {
    /// Build a table, rejecting empty phrases and non-positive or non-finite values.
    pub fn new<I, S>(entries: I) -> HarkResult<Self>
    where
        I: IntoIterator<Item = (S, f64, f64)>,
        S: Into<String>,
    {
        let mut map = HashMap::new();
        for (phrase, weight, intensity) in entries {
            let phrase = phrase.into().trim().to_lowercase();
            if phrase.is_empty() {
                return Err(HarkError::lexicon(phrase, "phrase is empty"));
            }
            for (name, value) in [("weight", weight), ("intensity", intensity)] {
                if !value.is_finite() || value <= 0.0 {
                    return Err(HarkError::lexicon(
                        phrase,
                        format!("{name} must be finite and positive, got {value}"),
                    ));
                }
            }
            map.insert(phrase, KeywordWeight { weight, intensity });
        }
        Ok(Self { entries: map })
    }

    /// Look up a token.
    pub fn get(&self, token: &str) -> Option<&KeywordWeight> {
        self.entries.get(token)
    }

    /// All phrases in the table.
    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) type RawTable = &'static [(&'static str, f64, f64)];

pub(crate) const SHUT_UP: RawTable = &[
    // strong commands
    ("闭嘴", 1.0, 2.0),
    ("住口", 1.0, 1.9),
    ("安静", 1.0, 1.8),
    ("shut up", 1.0, 2.0),
    ("别说话", 1.0, 1.8),
    ("别吵", 1.0, 1.8),
    ("别出声", 1.0, 1.7),
    ("别嚷嚷", 1.0, 1.7),
    // moderate
    ("安静点", 0.9, 1.5),
    ("小点声", 0.9, 1.4),
    ("别吵了", 0.9, 1.6),
    ("别闹了", 0.8, 1.4),
    ("别烦我", 0.8, 1.5),
    ("别打扰", 0.8, 1.4),
    ("别插嘴", 0.8, 1.5),
    // mild
    ("太吵了", 0.7, 1.3),
    ("吵死了", 0.7, 1.3),
    ("好吵", 0.6, 1.2),
    ("话多", 0.6, 1.2),
    ("话痨", 0.6, 1.2),
    ("少说点", 0.5, 1.1),
    ("少说话", 0.5, 1.1),
];

pub(crate) const INSULT: RawTable = &[
    // severe
    ("傻逼", 1.0, 2.0),
    ("sb", 1.0, 1.9),
    ("nmsl", 1.0, 2.0),
    ("去死", 1.0, 2.0),
    ("草泥马", 1.0, 1.9),
    ("cnm", 1.0, 1.9),
    ("废物", 1.0, 1.8),
    ("垃圾", 1.0, 1.8),
    ("脑残", 1.0, 1.8),
    ("弱智", 1.0, 1.7),
    ("智障", 1.0, 1.7),
    // moderate
    ("有病", 0.9, 1.6),
    ("神经病", 0.9, 1.6),
    ("白痴", 0.9, 1.6),
    ("蠢货", 0.9, 1.5),
    ("滚", 0.9, 1.7),
    ("滚开", 0.9, 1.6),
    ("滚蛋", 0.9, 1.7),
    ("nt", 0.9, 1.6),
    ("fw", 0.9, 1.6),
    ("菜鸡", 0.8, 1.5),
    // mild
    ("憨憨", 0.7, 1.3),
    ("笨", 0.6, 1.2),
    ("呆", 0.6, 1.2),
    ("猪", 0.7, 1.3),
    ("没脑子", 0.8, 1.4),
    ("没出息", 0.7, 1.3),
    ("low", 0.7, 1.4),
];

pub(crate) const BOREDOM: RawTable = &[
    // strong
    ("无聊死了", 1.0, 1.8),
    ("好无聊", 1.0, 1.7),
    ("太无聊", 1.0, 1.7),
    ("闷死了", 1.0, 1.7),
    ("好没劲", 1.0, 1.6),
    ("真没意思", 1.0, 1.6),
    ("闲得慌", 1.0, 1.6),
    // moderate
    ("无聊", 0.8, 1.5),
    ("好闲", 0.8, 1.4),
    ("寂寞", 0.8, 1.4),
    ("冷清", 0.8, 1.4),
    ("空虚", 0.7, 1.3),
    ("没人", 0.7, 1.3),
    ("冷场", 0.8, 1.5),
    ("死群", 0.8, 1.5),
    // mild
    ("有点闷", 0.6, 1.2),
    ("没事做", 0.6, 1.1),
    ("打发时间", 0.6, 1.1),
    ("求聊天", 0.7, 1.3),
    ("有人吗", 0.7, 1.4),
    ("在吗", 0.5, 1.0),
    ("滴滴", 0.5, 1.0),
];

pub(crate) const QUESTION: RawTable = &[
    // explicit
    ("请问", 1.0, 1.8),
    ("求解", 1.0, 1.8),
    ("求教", 1.0, 1.7),
    ("请教", 1.0, 1.7),
    ("如何解决", 1.0, 1.8),
    ("怎么处理", 1.0, 1.7),
    ("怎么办", 1.0, 1.7),
    ("为什么", 1.0, 1.6),
    ("什么原因", 1.0, 1.6),
    ("怎么回事", 1.0, 1.7),
    ("谁能帮", 1.0, 1.7),
    // general
    ("怎么", 0.9, 1.5),
    ("如何", 0.9, 1.5),
    ("啥意思", 0.9, 1.5),
    ("怎么做", 0.9, 1.6),
    ("哪里", 0.8, 1.4),
    ("哪个", 0.8, 1.4),
    ("哪能", 0.8, 1.4),
    ("有什么", 0.8, 1.4),
    ("有没有", 0.8, 1.4),
    ("会不会", 0.8, 1.4),
    ("能不能", 0.8, 1.5),
    ("可不可以", 0.8, 1.5),
    // vague
    ("什么", 0.7, 1.3),
    ("啥", 0.7, 1.2),
    ("呢", 0.5, 1.1),
    ("吗", 0.5, 1.0),
    ("谁懂", 0.8, 1.4),
    ("谁知道", 0.8, 1.4),
    ("有人会", 0.7, 1.3),
];

pub(crate) const ROBOTIC: RawTable = &[
    // self-identification
    ("一个ai", 1.0, 2.0),
    ("人工智能", 1.0, 2.0),
    ("我是ai", 1.0, 1.9),
    ("ai助手", 1.0, 1.8),
    ("智能助手", 1.0, 1.8),
    // assistant tics
    ("作为一个", 0.9, 1.5),
    ("根据你的描述", 0.9, 1.5),
    ("上下文", 0.8, 1.4),
    ("抱歉", 0.8, 1.4),
    ("模型", 0.9, 1.5),
    ("不能保证", 0.8, 1.5),
    ("无法提供", 0.8, 1.5),
    ("无法回答", 0.8, 1.5),
    // weak signals
    ("理解", 0.7, 1.2),
    ("希望", 0.7, 1.2),
    ("请注意", 0.7, 1.2),
    ("参考", 0.6, 1.1),
];

/// Tokens ignored by the sentiment scorer.
pub(crate) static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "的", "了", "在", "是", "都", "就", "也", "和", "把", "我", "你", "他", "她", "它", "啊",
        "吧", "吗", "嘛",
    ]
    .into_iter()
    .collect()
});

/// Tokens that weaken a keyword found within the next three tokens.
pub(crate) static NEGATION_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "不", "没", "无", "非", "否", "别", "不要", "不太", "不太想", "不想", "不至于", "算不上",
        "才不", "才不会", "not", "dont", "didnt", "never",
    ]
    .into_iter()
    .collect()
});

/// Rhetorical-question markers; their presence softens every keyword.
pub(crate) static RHETORICAL_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["难道", "何必", "怎么可以", "怎么可能", "哪能", "岂能", "谁还"]
        .into_iter()
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_validate() {
        for raw in [SHUT_UP, INSULT, BOREDOM, QUESTION, ROBOTIC] {
            let table = KeywordTable::new(raw.iter().copied()).unwrap();
            assert_eq!(table.len(), raw.len());
        }
    }

    #[test]
    fn test_rejects_bad_entries() {
        assert!(KeywordTable::new([("闭嘴", 0.0, 1.0)]).is_err());
        assert!(KeywordTable::new([("闭嘴", 1.0, f64::NAN)]).is_err());
        assert!(KeywordTable::new([("  ", 1.0, 1.0)]).is_err());
    }

    #[test]
    fn test_phrases_are_lowercased() {
        let table = KeywordTable::new([("Shut Up", 1.0, 2.0)]).unwrap();
        assert!(table.get("shut up").is_some());
        assert!(table.get("Shut Up").is_none());
    }
}
