//! hark-core - Core library for hark.
//!
//! This crate decides, for every inbound group-chat message, whether an agent
//! should wake up and answer, stay quiet, or put itself on a timed silence.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hark_core::{EventSignals, HarkConfig, Pipeline, Segment, StateStore, WakeContext};
//!
//! let store = Arc::new(StateStore::default());
//! let pipeline = Pipeline::new(HarkConfig::default(), Arc::clone(&store))?;
//!
//! let signals = Arc::new(EventSignals::new());
//! let mut ctx = WakeContext::builder(Arc::clone(&signals))
//!     .chain(vec![Segment::mention("bot"), Segment::plain("hello")])
//!     .group_id("g1")
//!     .user_id("u1")
//!     .bot_id("bot")
//!     .command_matcher(pipeline.command_matcher())
//!     .state(&store)
//!     .build();
//!
//! pipeline.run(&mut ctx).await;
//! assert!(signals.is_woken());
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod scoring;
pub mod state;
pub mod text;

// Re-export commonly used types
pub use config::HarkConfig;
pub use context::{CommandMatcher, EventSignals, HostEvent, Segment, WakeContext};
pub use error::{ErrorCode, HarkError, HarkResult};
pub use pipeline::{
    BlockReason, Disposition, Pipeline, SilenceKind, Step, StepName, StepResult, StepTrace,
    WakeReason,
};
pub use scoring::{InterestScorer, SentimentScorer, SimilarityEngine, SimilarityReport};
pub use state::{GroupSnapshot, GroupState, MemberState, SharedMember, StateStore};
pub use text::{DictionaryTokenizer, Tokenizer};
