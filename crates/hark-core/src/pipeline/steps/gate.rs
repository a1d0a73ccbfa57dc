//! Identity filtering.

use crate::config::GateConfig;
use crate::context::WakeContext;
use crate::pipeline::{BlockReason, Step, StepName, StepResult};

/// Known automated peer accounts (closed ranges).
const ROBOT_RANGES: &[(u64, u64)] = &[
    (3_328_144_510, 3_328_144_510),
    (2_854_196_301, 2_854_216_399),
    (66_600_000, 66_600_000),
    (3_889_000_000, 3_889_999_999),
    (4_010_000_000, 4_019_999_999),
];

/// Whether a sender id belongs to an automated peer account.
pub fn is_robot_account(uid: &str) -> bool {
    uid.trim()
        .parse::<u64>()
        .map(|id| ROBOT_RANGES.iter().any(|(lo, hi)| (*lo..=*hi).contains(&id)))
        .unwrap_or(false)
}

/// Blocks the bot's own messages, robot accounts and allow/deny-list misses.
#[derive(Debug, Clone)]
pub struct GateStep {
    config: GateConfig,
}

impl GateStep {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }
}

impl Step for GateStep {
    fn name(&self) -> StepName {
        StepName::Gate
    }

    fn handle(&self, ctx: &mut WakeContext) -> StepResult {
        let cfg = &self.config;
        let has_group = !ctx.gid.is_empty();

        if cfg.block_self && ctx.uid == ctx.bid {
            return StepResult::block(BlockReason::SelfMessage, "own message");
        }
        if cfg.block_robots && is_robot_account(&ctx.uid) {
            return StepResult::block(
                BlockReason::RobotAccount,
                format!("robot account {}", ctx.uid),
            );
        }
        if !cfg.allow_users.is_empty() && !cfg.allow_users.contains(&ctx.uid) {
            return StepResult::block(
                BlockReason::UserNotAllowed,
                format!("user {} not in allow-list", ctx.uid),
            );
        }
        if has_group && !cfg.allow_groups.is_empty() && !cfg.allow_groups.contains(&ctx.gid) {
            return StepResult::block(
                BlockReason::GroupNotAllowed,
                format!("group {} not in allow-list", ctx.gid),
            );
        }
        if cfg.deny_users.contains(&ctx.uid) {
            return StepResult::block(
                BlockReason::UserDenied,
                format!("user {} denied", ctx.uid),
            );
        }
        if has_group && cfg.deny_groups.contains(&ctx.gid) {
            return StepResult::block(
                BlockReason::GroupDenied,
                format!("group {} denied", ctx.gid),
            );
        }

        StepResult::pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EventSignals;
    use crate::pipeline::Disposition;

    fn ctx(gid: &str, uid: &str) -> WakeContext {
        WakeContext::builder(EventSignals::new())
            .group_id(gid)
            .user_id(uid)
            .bot_id("10000")
            .plain("hello")
            .build()
    }

    fn reason(result: &StepResult) -> Option<BlockReason> {
        match result.disposition {
            Some(Disposition::Block { reason }) => Some(reason),
            _ => None,
        }
    }

    #[test]
    fn test_robot_ranges() {
        assert!(is_robot_account("3328144510"));
        assert!(is_robot_account("2854200000"));
        assert!(is_robot_account("4019999999"));
        assert!(!is_robot_account("4020000000"));
        assert!(!is_robot_account("not-a-number"));
    }

    #[test]
    fn test_blocks_self() {
        let step = GateStep::new(GateConfig::default());
        let result = step.handle(&mut ctx("g", "10000"));
        assert_eq!(result.wake, Some(false));
        assert!(result.abort);
        assert_eq!(reason(&result), Some(BlockReason::SelfMessage));
    }

    #[test]
    fn test_robot_toggle() {
        let on = GateStep::new(GateConfig::default());
        assert_eq!(
            reason(&on.handle(&mut ctx("g", "66600000"))),
            Some(BlockReason::RobotAccount)
        );

        let off = GateStep::new(GateConfig {
            block_robots: false,
            ..Default::default()
        });
        assert_eq!(off.handle(&mut ctx("g", "66600000")), StepResult::pass());
    }

    #[test]
    fn test_allow_lists() {
        let step = GateStep::new(GateConfig {
            allow_users: vec!["alice".into()],
            allow_groups: vec!["g1".into()],
            ..Default::default()
        });
        assert_eq!(
            reason(&step.handle(&mut ctx("g1", "bob"))),
            Some(BlockReason::UserNotAllowed)
        );
        assert_eq!(
            reason(&step.handle(&mut ctx("g2", "alice"))),
            Some(BlockReason::GroupNotAllowed)
        );
        assert_eq!(step.handle(&mut ctx("g1", "alice")), StepResult::pass());
        // Group lists do not apply to direct messages
        assert_eq!(step.handle(&mut ctx("", "alice")), StepResult::pass());
    }

    #[test]
    fn test_deny_lists() {
        let step = GateStep::new(GateConfig {
            deny_users: vec!["mallory".into()],
            deny_groups: vec!["spam".into()],
            ..Default::default()
        });
        assert_eq!(
            reason(&step.handle(&mut ctx("g1", "mallory"))),
            Some(BlockReason::UserDenied)
        );
        assert_eq!(
            reason(&step.handle(&mut ctx("spam", "alice"))),
            Some(BlockReason::GroupDenied)
        );
    }
}
