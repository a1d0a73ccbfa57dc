//! The wake decision pipeline.
//!
//! Steps run strictly in order over one mutable [`WakeContext`]. After each
//! step the orchestrator applies the result:
//! - `wake = Some(true)`: record the wake on the member and mark the event woken
//! - `wake = Some(false)`: stop event propagation
//! - `abort`: skip the remaining steps

mod steps;
mod types;

pub use steps::{is_robot_account, BlockStep, CommandStep, GateStep, SilenceStep, WakeStep};
pub use types::{
    BlockReason, Disposition, SilenceKind, StepName, StepResult, StepTrace, WakeReason,
};

use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::{debug, instrument};

use crate::config::HarkConfig;
use crate::context::{CommandMatcher, WakeContext};
use crate::error::HarkResult;
use crate::scoring::{InterestScorer, SentimentScorer, SimilarityEngine};
use crate::state::StateStore;
use crate::text::{DictionaryTokenizer, Tokenizer};

/// One stage of the pipeline.
///
/// Steps are synchronous; all per-message state is reached through the context,
/// whose member lock is held by the pipeline for the whole run.
pub trait Step: Send + Sync {
    fn name(&self) -> StepName;

    fn handle(&self, ctx: &mut WakeContext) -> StepResult;
}

/// Ordered steps plus the state they share.
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
    config: HarkConfig,
    store: Arc<StateStore>,
    matcher: CommandMatcher,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline with the default dictionary tokenizer, seeded with the
    /// sentiment lexicons, interest keywords and the bot's names.
    pub fn new(config: HarkConfig, store: Arc<StateStore>) -> HarkResult<Self> {
        let mut tokenizer = DictionaryTokenizer::with_words(SentimentScorer::builtin_phrases());
        tokenizer.extend(config.wake.topic_keywords().iter().flatten());
        tokenizer.extend(&config.wake.names);
        Self::with_tokenizer(config, store, Arc::new(tokenizer))
    }

    /// Build a pipeline around a host-provided tokenizer.
    pub fn with_tokenizer(
        config: HarkConfig,
        store: Arc<StateStore>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> HarkResult<Self> {
        config.validate()?;

        let sentiment = Arc::new(SentimentScorer::new(Arc::clone(&tokenizer))?);
        let interest = Arc::new(InterestScorer::new(
            config.wake.topic_keywords(),
            Arc::clone(&tokenizer),
            &config.interest,
        ));
        let similarity = Arc::new(SimilarityEngine::new(
            tokenizer,
            config.similarity.clone(),
        ));

        let order: Vec<StepName> = if config.pipeline.lock_order {
            StepName::iter()
                .filter(|s| config.pipeline.is_enabled_step(*s))
                .collect()
        } else {
            config.pipeline.steps.clone()
        };

        let steps = order
            .into_iter()
            .map(|name| -> Box<dyn Step> {
                match name {
                    StepName::Gate => Box::new(GateStep::new(config.gate.clone())),
                    StepName::Block => Box::new(BlockStep::new(config.block.clone())),
                    StepName::Command => Box::new(CommandStep::new(config.command.clone())),
                    StepName::Wake => Box::new(WakeStep::new(
                        config.wake.clone(),
                        Arc::clone(&sentiment),
                        Arc::clone(&interest),
                        Arc::clone(&similarity),
                    )),
                    StepName::Silence => Box::new(SilenceStep::new(
                        config.silence.clone(),
                        Arc::clone(&sentiment),
                    )),
                }
            })
            .collect();

        let matcher = CommandMatcher::new(&config.command);
        let pipeline = Self {
            steps,
            config,
            store,
            matcher,
        };
        debug!(steps = ?pipeline.step_names(), "Pipeline built");
        Ok(pipeline)
    }

    /// Names of the steps in execution order.
    pub fn step_names(&self) -> Vec<StepName> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn config(&self) -> &HarkConfig {
        &self.config
    }

    /// Matcher for the configured commands and wake prefixes.
    pub fn command_matcher(&self) -> &CommandMatcher {
        &self.matcher
    }

    /// Run every step over one message.
    ///
    /// Blank messages are ignored. The member lock is held from the first step
    /// to the last.
    #[instrument(skip(self, ctx), fields(gid = %ctx.gid, uid = %ctx.uid))]
    pub async fn run(&self, ctx: &mut WakeContext) {
        if ctx.plain.trim().is_empty() {
            return;
        }

        ctx.lock_member().await;

        for step in &self.steps {
            let name = step.name();
            if ctx.is_admin && self.config.pipeline.is_admin_step(name) {
                continue;
            }

            let result = step.handle(ctx);
            self.apply(ctx, &result);

            if let Some(msg) = &result.msg {
                debug!(step = %name, wake = ?result.wake, abort = result.abort, "{msg}");
            }
            ctx.trace.push(StepTrace::new(name, &result));

            if result.abort {
                break;
            }
        }

        ctx.unlock_member();
    }

    fn apply(&self, ctx: &mut WakeContext, result: &StepResult) {
        match result.wake {
            Some(true) => {
                let now = ctx.now;
                if let Some(member) = ctx.member_state_mut() {
                    member.last_wake = Some(now);
                    member.last_wake_reason = result.wake_reason();
                    member.can_prolong = result.prolong;
                }
                ctx.event().mark_woken();
            }
            Some(false) => ctx.event().stop_event(),
            None => {}
        }
    }

    #[cfg(test)]
    pub(crate) fn from_steps(
        steps: Vec<Box<dyn Step>>,
        config: HarkConfig,
        store: Arc<StateStore>,
    ) -> Self {
        let matcher = CommandMatcher::new(&config.command);
        Self {
            steps,
            config,
            store,
            matcher,
        }
    }
}
