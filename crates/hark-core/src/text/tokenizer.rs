//! Tokenizer capability and the default dictionary segmenter.

use std::collections::HashSet;

/// Splits text into an ordered sequence of word tokens.
///
/// Implementations must be deterministic; scorers cache and compare their output.
pub trait Tokenizer: Send + Sync {
    /// Tokenize text. Whitespace never appears inside returned tokens unless a
    /// dictionary phrase contains it.
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Forward-maximum-matching segmenter.
///
/// At each position the longest dictionary phrase wins. Without a dictionary hit,
/// a run of ASCII alphanumerics forms one token and any other character stands
/// alone. Dictionary phrases may mix scripts (`一个ai`) or contain spaces
/// (`shut up`), but never split an ASCII word in half.
///
/// Dictionary words are stored lowercased; callers lowercase text before
/// tokenizing if they want Latin phrases to hit.
#[derive(Debug, Clone, Default)]
pub struct DictionaryTokenizer {
    words: HashSet<String>,
    max_len: usize,
}

impl DictionaryTokenizer {
    /// Create a tokenizer with an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tokenizer seeded with words.
    pub fn with_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokenizer = Self::new();
        tokenizer.extend(words);
        tokenizer
    }

    /// Add a word to the dictionary.
    pub fn add_word(&mut self, word: &str) {
        let word = word.trim().to_lowercase();
        let len = word.chars().count();
        // Single characters already stand alone
        if len < 2 {
            return;
        }
        self.max_len = self.max_len.max(len);
        self.words.insert(word);
    }

    /// Add several words.
    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            self.add_word(word.as_ref());
        }
    }

    /// Whether the dictionary contains a word.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    /// Number of dictionary words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Longest dictionary phrase starting at `start`, in chars.
    fn longest_match(&self, chars: &[char], start: usize) -> Option<usize> {
        let available = chars.len() - start;
        let upper = self.max_len.min(available);
        (2..=upper).rev().find(|&len| {
            let end = start + len;
            if chars[end - 1].is_whitespace() || !ends_cleanly(chars, end) {
                return false;
            }
            let candidate: String = chars[start..end].iter().collect();
            self.words.contains(&candidate)
        })
    }
}

impl Tokenizer for DictionaryTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }

            let run = if is_ascii_word(c) {
                ascii_run(&chars, i)
            } else {
                1
            };

            match self.longest_match(&chars, i) {
                Some(len) if len >= run => {
                    tokens.push(chars[i..i + len].iter().collect());
                    i += len;
                }
                _ => {
                    tokens.push(chars[i..i + run].iter().collect());
                    i += run;
                }
            }
        }

        tokens
    }
}

fn is_ascii_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ascii_run(chars: &[char], start: usize) -> usize {
    chars[start..].iter().take_while(|c| is_ascii_word(**c)).count()
}

/// A match ending at `end` must not cut an ASCII word in two.
fn ends_cleanly(chars: &[char], end: usize) -> bool {
    end >= chars.len() || !(is_ascii_word(chars[end - 1]) && is_ascii_word(chars[end]))
}
