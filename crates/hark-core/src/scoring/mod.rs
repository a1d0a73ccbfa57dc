//! Message scorers used by the wake and silence steps.
//!
//! - [`SentimentScorer`]: lexicon confidence for shut-up, insult, boredom,
//!   question and robotic phrasing
//! - [`InterestScorer`]: match against configured interest topics
//! - [`SimilarityEngine`]: TF-IDF similarity to the agent's recent messages

mod interest;
mod lexicon;
mod sentiment;
mod similarity;

pub use interest::InterestScorer;
pub use lexicon::{KeywordTable, KeywordWeight};
pub use sentiment::{Intent, SentimentScorer, MAX_CONFIDENCE};
pub use similarity::{SimilarityEngine, SimilarityReport};
