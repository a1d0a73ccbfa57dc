//! Built-in commands and wake prefixes.

use crate::config::CommandConfig;
use crate::context::{CommandMatcher, WakeContext};
use crate::pipeline::{BlockReason, Step, StepName, StepResult, WakeReason};

/// Blocks configured command classes and wakes on prefixed messages.
#[derive(Debug, Clone)]
pub struct CommandStep {
    config: CommandConfig,
    matcher: CommandMatcher,
}

impl CommandStep {
    pub fn new(config: CommandConfig) -> Self {
        let matcher = CommandMatcher::new(&config);
        Self { config, matcher }
    }
}

impl Step for CommandStep {
    fn name(&self) -> StepName {
        StepName::Command
    }

    fn handle(&self, ctx: &mut WakeContext) -> StepResult {
        let cfg = &self.config;

        if let Some(cmd) = ctx.cmd.as_deref() {
            if cfg.block_builtin && cfg.builtin_cmds.iter().any(|b| b == cmd) {
                return StepResult::block(
                    BlockReason::BuiltinCommand,
                    format!("built-in command '{cmd}' disabled"),
                );
            }
        }

        let Some(prefix) = ctx.leading_text().and_then(|t| self.matcher.prefix_of(t)) else {
            return StepResult::pass();
        };

        match ctx.cmd.as_deref() {
            Some(cmd) if cfg.block_prefix_cmd => StepResult::block(
                BlockReason::PrefixCommand,
                format!("prefixed command '{cmd}' disabled"),
            ),
            None if cfg.block_prefix_llm => {
                StepResult::block(BlockReason::PrefixFreeText, "prefixed free text disabled")
            }
            Some(cmd) => StepResult::wake(WakeReason::Prefix, format!("prefix {prefix} ({cmd})")),
            None => StepResult::wake(WakeReason::Prefix, format!("prefix {prefix}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EventSignals, Segment};
    use crate::pipeline::Disposition;

    fn ctx(step: &CommandStep, text: &str) -> WakeContext {
        WakeContext::builder(EventSignals::new())
            .chain(vec![Segment::plain(text)])
            .command_matcher(&step.matcher)
            .build()
    }

    fn reason(result: &StepResult) -> Option<BlockReason> {
        match result.disposition {
            Some(Disposition::Block { reason }) => Some(reason),
            _ => None,
        }
    }

    #[test]
    fn test_builtin_blocked() {
        let step = CommandStep::new(CommandConfig {
            block_builtin: true,
            ..Default::default()
        });
        let result = step.handle(&mut ctx(&step, "reset"));
        assert_eq!(reason(&result), Some(BlockReason::BuiltinCommand));
    }

    #[test]
    fn test_prefix_wakes_by_default() {
        let step = CommandStep::new(CommandConfig::default());

        let result = step.handle(&mut ctx(&step, "/reset"));
        assert_eq!(result.wake, Some(true));
        assert_eq!(result.wake_reason(), Some(WakeReason::Prefix));
        assert!(!result.abort);

        let result = step.handle(&mut ctx(&step, "/tell me a joke"));
        assert_eq!(result.wake_reason(), Some(WakeReason::Prefix));
    }

    #[test]
    fn test_prefix_blocks() {
        let step = CommandStep::new(CommandConfig {
            block_prefix_cmd: true,
            block_prefix_llm: true,
            ..Default::default()
        });
        assert_eq!(
            reason(&step.handle(&mut ctx(&step, "/model list"))),
            Some(BlockReason::PrefixCommand)
        );
        assert_eq!(
            reason(&step.handle(&mut ctx(&step, "/tell me a joke"))),
            Some(BlockReason::PrefixFreeText)
        );
    }

    #[test]
    fn test_no_prefix_passes() {
        let step = CommandStep::new(CommandConfig::default());
        assert_eq!(step.handle(&mut ctx(&step, "just chatting")), StepResult::pass());

        // Prefix only counts on a leading plain segment
        let mut c = WakeContext::builder(EventSignals::new())
            .chain(vec![Segment::mention("bot"), Segment::plain("/reset")])
            .build();
        assert_eq!(step.handle(&mut c), StepResult::pass());
    }
}
