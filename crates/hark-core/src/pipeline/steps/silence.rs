//! Silence penalties applied after a wake.

use std::sync::Arc;

use crate::config::SilenceConfig;
use crate::context::WakeContext;
use crate::pipeline::{SilenceKind, Step, StepName, StepResult};
use crate::scoring::SentimentScorer;

/// Applies timed silence when a waking message tells the agent off.
///
/// Shut-up silences the whole conversation; insults and robotic phrasing
/// silence the sender. Only the first penalty that fires is applied.
#[derive(Debug)]
pub struct SilenceStep {
    config: SilenceConfig,
    sentiment: Arc<SentimentScorer>,
}

impl SilenceStep {
    pub fn new(config: SilenceConfig, sentiment: Arc<SentimentScorer>) -> Self {
        Self { config, sentiment }
    }
}

impl Step for SilenceStep {
    fn name(&self) -> StepName {
        StepName::Silence
    }

    fn handle(&self, ctx: &mut WakeContext) -> StepResult {
        let cfg = &self.config;

        if !ctx.event().is_woken() || ctx.plain.is_empty() {
            return StepResult::pass();
        }

        if cfg.shutup < 1.0 {
            if let Some(group) = &ctx.group {
                let c = self.sentiment.shut_up(&ctx.plain);
                if c > cfg.shutup {
                    let seconds = c * cfg.multiple;
                    group.extend_shutup(ctx.now, seconds);
                    return StepResult::silence(
                        SilenceKind::ShutUp,
                        seconds,
                        true,
                        format!("group shut up for {seconds:.0}s"),
                    );
                }
            }
        }

        if cfg.insult < 1.0 && ctx.member_state().is_some() {
            let c = self.sentiment.insult(&ctx.plain);
            if c > cfg.insult {
                let seconds = c * cfg.multiple;
                let now = ctx.now;
                if let Some(member) = ctx.member_state_mut() {
                    member.extend_silence(now, seconds);
                }
                // The agent may still answer this one message
                return StepResult::silence(
                    SilenceKind::Insult,
                    seconds,
                    false,
                    format!("member silenced for {seconds:.0}s (insult)"),
                );
            }
        }

        if cfg.robotic < 1.0 && ctx.member_state().is_some() {
            let c = self.sentiment.robotic(&ctx.plain);
            if c > cfg.robotic {
                let seconds = c * cfg.multiple;
                let now = ctx.now;
                if let Some(member) = ctx.member_state_mut() {
                    member.extend_silence(now, seconds);
                }
                return StepResult::silence(
                    SilenceKind::Robotic,
                    seconds,
                    true,
                    format!("member silenced for {seconds:.0}s (robotic)"),
                );
            }
        }

        StepResult::pass()
    }
}
