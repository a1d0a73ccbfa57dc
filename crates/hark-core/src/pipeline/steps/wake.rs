//! Wake triggers.

use std::sync::Arc;

use rand::Rng;

use crate::config::WakeConfig;
use crate::context::WakeContext;
use crate::pipeline::{BlockReason, Step, StepName, StepResult, WakeReason};
use crate::scoring::{InterestScorer, SentimentScorer, SimilarityEngine};
use crate::state::seconds_between;

/// Decides whether the agent should answer, trying triggers in priority order.
///
/// A silenced group or member blocks every trigger. An event woken upstream
/// (for example by a wake prefix) passes through unchanged.
#[derive(Debug)]
pub struct WakeStep {
    config: WakeConfig,
    sentiment: Arc<SentimentScorer>,
    interest: Arc<InterestScorer>,
    similarity: Arc<SimilarityEngine>,
}

impl WakeStep {
    pub fn new(
        config: WakeConfig,
        sentiment: Arc<SentimentScorer>,
        interest: Arc<InterestScorer>,
        similarity: Arc<SimilarityEngine>,
    ) -> Self {
        Self {
            config,
            sentiment,
            interest,
            similarity,
        }
    }

    fn silenced(&self, ctx: &WakeContext) -> Option<StepResult> {
        if ctx.group.as_ref().is_some_and(|g| g.is_shut_up(ctx.now)) {
            return Some(StepResult::block(
                BlockReason::GroupSilenced,
                "group is shut up",
            ));
        }
        if ctx.member_state().is_some_and(|m| m.is_silenced(ctx.now)) {
            return Some(StepResult::block(
                BlockReason::MemberSilenced,
                "member is silenced",
            ));
        }
        None
    }

    fn within_prolong(&self, ctx: &WakeContext) -> bool {
        if self.config.prolong <= 0.0 {
            return false;
        }
        ctx.member_state().is_some_and(|m| {
            m.can_prolong
                && m.last_reply
                    .is_some_and(|at| seconds_between(at, ctx.now) <= self.config.prolong)
        })
    }

    fn similar(&self, ctx: &WakeContext) -> Option<f64> {
        let group = ctx.group.as_ref()?;
        let bot_messages = group.bot_messages();
        if bot_messages.is_empty() {
            return None;
        }
        Some(
            self.similarity
                .similarity(&ctx.gid, &ctx.plain, &bot_messages, true),
        )
    }
}

fn enabled(threshold: f64) -> bool {
    threshold < 1.0
}

impl Step for WakeStep {
    fn name(&self) -> StepName {
        StepName::Wake
    }

    fn handle(&self, ctx: &mut WakeContext) -> StepResult {
        let cfg = &self.config;

        if let Some(blocked) = self.silenced(ctx) {
            return blocked;
        }
        if ctx.event().is_woken() {
            return StepResult::pass();
        }

        if ctx.mentions_bot() {
            return StepResult::wake(WakeReason::Mention, "mentioned");
        }
        if ctx.replies_to_bot() {
            return StepResult::wake(WakeReason::Reply, "reply to bot");
        }
        if !ctx.plain.is_empty() {
            let name = cfg
                .names
                .iter()
                .find(|n| !n.is_empty() && ctx.plain.contains(n.as_str()));
            if let Some(name) = name {
                return StepResult::wake(WakeReason::Name, format!("name {name} mentioned"));
            }
        }
        if self.within_prolong(ctx) {
            return StepResult::wake(WakeReason::Prolong, "wake extension");
        }
        if ctx.plain.is_empty() {
            return StepResult::pass();
        }

        if enabled(cfg.similar) {
            if let Some(sim) = self.similar(ctx) {
                if sim > cfg.similar {
                    return StepResult::wake(WakeReason::Similar, format!("similarity {sim:.3}"));
                }
            }
        }
        if enabled(cfg.ask) {
            let c = self.sentiment.ask(&ctx.plain);
            if c > cfg.ask {
                return StepResult::wake(WakeReason::Ask, format!("question {c:.3}"));
            }
        }
        if enabled(cfg.bored) {
            let c = self.sentiment.bored(&ctx.plain);
            if c > cfg.bored {
                return StepResult::wake(WakeReason::Bored, format!("boredom {c:.3}"));
            }
        }
        if enabled(cfg.interest) && self.interest.has_topics() {
            let c = self.interest.score(&ctx.plain);
            if c > cfg.interest {
                return StepResult::wake(WakeReason::Interest, format!("interest {c:.3}"));
            }
        }
        if cfg.prob > 0.0 && rand::thread_rng().gen::<f64>() < cfg.prob {
            return StepResult::wake(WakeReason::Random, "random draw");
        }

        StepResult::pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InterestConfig, SimilarityConfig};
    use crate::context::{EventSignals, Segment};
    use crate::pipeline::Disposition;
    use crate::state::StateStore;
    use crate::text::DictionaryTokenizer;
    use chrono::{Duration, Utc};

    fn step(config: WakeConfig) -> WakeStep {
        let mut words = DictionaryTokenizer::with_words(SentimentScorer::builtin_phrases());
        words.extend(config.topic_keywords().iter().flatten());
        let tokenizer: Arc<DictionaryTokenizer> = Arc::new(words);

        let sentiment = SentimentScorer::new(tokenizer.clone()).unwrap();
        let interest = InterestScorer::new(
            config.topic_keywords(),
            tokenizer.clone(),
            &InterestConfig::default(),
        );
        let similarity = SimilarityEngine::new(tokenizer, SimilarityConfig::default());
        WakeStep::new(
            config,
            Arc::new(sentiment),
            Arc::new(interest),
            Arc::new(similarity),
        )
    }

    async fn ctx(store: &StateStore, chain: Vec<Segment>) -> WakeContext {
        let mut ctx = WakeContext::builder(EventSignals::new())
            .chain(chain)
            .group_id("g1")
            .user_id("u1")
            .bot_id("bot")
            .state(store)
            .build();
        ctx.lock_member().await;
        ctx
    }

    #[tokio::test]
    async fn test_mention_and_reply() {
        let store = StateStore::default();
        let s = step(WakeConfig::default());

        let r = s.handle(&mut ctx(&store, vec![Segment::mention("bot"), Segment::plain("hi")]).await);
        assert_eq!(r.wake_reason(), Some(WakeReason::Mention));
        assert!(r.prolong);

        let r = s.handle(&mut ctx(&store, vec![Segment::reply("bot"), Segment::plain("ok")]).await);
        assert_eq!(r.wake_reason(), Some(WakeReason::Reply));

        // Mentions of someone else do nothing
        let r = s.handle(&mut ctx(&store, vec![Segment::mention("u2"), Segment::plain("hi")]).await);
        assert_eq!(r, StepResult::pass());
    }

    #[tokio::test]
    async fn test_name_trigger() {
        let store = StateStore::default();
        let s = step(WakeConfig {
            names: vec!["小哈".into()],
            ..Default::default()
        });
        let r = s.handle(&mut ctx(&store, vec![Segment::plain("小哈在吗")]).await);
        assert_eq!(r.wake_reason(), Some(WakeReason::Name));
        assert!(r.prolong);
    }

    #[tokio::test]
    async fn test_silenced_member_blocks_mention() {
        let store = StateStore::default();
        let s = step(WakeConfig::default());
        let mut c = ctx(&store, vec![Segment::mention("bot")]).await;
        let now = c.now;
        c.member_state_mut().unwrap().extend_silence(now, 60.0);

        let r = s.handle(&mut c);
        assert_eq!(r.wake, Some(false));
        assert!(r.abort);
        assert_eq!(
            r.disposition,
            Some(Disposition::Block {
                reason: BlockReason::MemberSilenced
            })
        );
    }

    #[tokio::test]
    async fn test_shut_up_group_blocks() {
        let store = StateStore::default();
        let s = step(WakeConfig::default());
        let mut c = ctx(&store, vec![Segment::mention("bot")]).await;
        store.group("g1").extend_shutup(c.now, 60.0);

        let r = s.handle(&mut c);
        assert_eq!(
            r.disposition,
            Some(Disposition::Block {
                reason: BlockReason::GroupSilenced
            })
        );
    }

    #[tokio::test]
    async fn test_already_woken_passes() {
        let store = StateStore::default();
        let s = step(WakeConfig::default());
        let mut c = ctx(&store, vec![Segment::mention("bot")]).await;
        c.event().mark_woken();
        assert_eq!(s.handle(&mut c), StepResult::pass());
    }

    #[tokio::test]
    async fn test_prolong_window() {
        let store = StateStore::default();
        let s = step(WakeConfig {
            prolong: 60.0,
            ..Default::default()
        });
        let mut c = ctx(&store, vec![Segment::plain("and another thing")]).await;
        let now = c.now;
        {
            let m = c.member_state_mut().unwrap();
            m.can_prolong = true;
            m.last_reply = Some(now - Duration::seconds(30));
        }
        assert_eq!(s.handle(&mut c).wake_reason(), Some(WakeReason::Prolong));

        c.member_state_mut().unwrap().last_reply = Some(now - Duration::seconds(90));
        assert_eq!(s.handle(&mut c), StepResult::pass());

        c.member_state_mut().unwrap().last_reply = Some(Utc::now());
        c.member_state_mut().unwrap().can_prolong = false;
        assert_eq!(s.handle(&mut c), StepResult::pass());
    }

    #[tokio::test]
    async fn test_confidence_triggers() {
        let store = StateStore::default();
        let s = step(WakeConfig {
            ask: 0.5,
            bored: 0.5,
            interest: 0.5,
            interest_topics: vec!["原神 抽卡".into()],
            ..Default::default()
        });

        let r = s.handle(&mut ctx(&store, vec![Segment::plain("请问怎么办")]).await);
        assert_eq!(r.wake_reason(), Some(WakeReason::Ask));
        assert!(!r.prolong);

        let r = s.handle(&mut ctx(&store, vec![Segment::plain("好无聊啊")]).await);
        assert_eq!(r.wake_reason(), Some(WakeReason::Bored));

        let r = s.handle(&mut ctx(&store, vec![Segment::plain("原神抽卡")]).await);
        assert_eq!(r.wake_reason(), Some(WakeReason::Interest));
    }

    #[tokio::test]
    async fn test_similarity_trigger() {
        let store = StateStore::default();
        store
            .group("g1")
            .push_bot_message("rust ownership rules prevent data races");
        let s = step(WakeConfig {
            similar: 0.5,
            ..Default::default()
        });
        let r = s.handle(
            &mut ctx(
                &store,
                vec![Segment::plain("rust ownership rules prevent data races")],
            )
            .await,
        );
        assert_eq!(r.wake_reason(), Some(WakeReason::Similar));
    }

    #[tokio::test]
    async fn test_disabled_thresholds_never_fire() {
        let store = StateStore::default();
        let s = step(WakeConfig::default());
        let r = s.handle(&mut ctx(&store, vec![Segment::plain("请问怎么办 好无聊")]).await);
        assert_eq!(r, StepResult::pass());
    }

    #[tokio::test]
    async fn test_random_wake() {
        let store = StateStore::default();
        let always = step(WakeConfig {
            prob: 1.0,
            ..Default::default()
        });
        let r = always.handle(&mut ctx(&store, vec![Segment::plain("whatever")]).await);
        assert_eq!(r.wake_reason(), Some(WakeReason::Random));
    }
}
