//! Text normalization and tokenization.

mod tokenizer;

pub use tokenizer::{DictionaryTokenizer, Tokenizer};

use once_cell::sync::Lazy;
use regex::Regex;

// Anything that is not a word character (CJK included) or whitespace
static SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s\x{4e00}-\x{9fa5}]").unwrap());

// Anything that is not a word character
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\x{4e00}-\x{9fff}]").unwrap());

/// Lowercase and drop punctuation/symbols, keeping whitespace.
pub fn strip_symbols(text: &str) -> String {
    SYMBOLS.replace_all(&text.to_lowercase(), "").into_owned()
}

/// Replace every punctuation, symbol or whitespace character with a space.
pub fn symbols_to_spaces(text: &str) -> String {
    NON_WORD.replace_all(text, " ").into_owned()
}

/// Key used to compare messages for repeats: word characters only, lowercased.
pub fn repeat_key(text: &str) -> String {
    NON_WORD.replace_all(text, "").to_lowercase()
}
