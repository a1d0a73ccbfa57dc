//! Operational suppression: forbidden words, repeats and cooldown.

use crate::config::BlockConfig;
use crate::context::WakeContext;
use crate::pipeline::{BlockReason, Step, StepName, StepResult};
use crate::text::repeat_key;

/// Blocks forbidden words, repeats of the agent's messages and wakes inside the cooldown.
#[derive(Debug, Clone)]
pub struct BlockStep {
    config: BlockConfig,
}

impl BlockStep {
    pub fn new(config: BlockConfig) -> Self {
        Self { config }
    }
}

impl Step for BlockStep {
    fn name(&self) -> StepName {
        StepName::Block
    }

    fn handle(&self, ctx: &mut WakeContext) -> StepResult {
        let cfg = &self.config;

        if !ctx.plain.is_empty() {
            if let Some(word) = cfg
                .keywords
                .iter()
                .find(|w| !w.is_empty() && ctx.plain.contains(w.as_str()))
            {
                return StepResult::block(
                    BlockReason::ForbiddenWord,
                    format!("forbidden word: {word}"),
                );
            }
        }

        if cfg.repeat && !ctx.plain.is_empty() {
            if let Some(group) = &ctx.group {
                let key = repeat_key(&ctx.plain);
                let repeated = !key.is_empty()
                    && group
                        .bot_messages()
                        .iter()
                        .any(|msg| repeat_key(msg) == key);
                if repeated {
                    return StepResult::block(BlockReason::Repeat, "repeat of a bot message");
                }
            }
        }

        if cfg.wake_cd > 0.0 {
            let since = ctx
                .member_state()
                .and_then(|m| m.seconds_since_wake(ctx.now));
            if let Some(elapsed) = since {
                if elapsed < cfg.wake_cd {
                    return StepResult::block(
                        BlockReason::Cooldown,
                        format!("wake cooldown ({}s)", cfg.wake_cd),
                    );
                }
            }
        }

        StepResult::pass()
    }
}
