//! Per-conversation state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::lru::LruMap;
use super::member::{advance, MemberState, SharedMember};
use crate::config::StateConfig;

#[derive(Debug)]
struct GroupInner {
    members: LruMap<String, SharedMember>,
    shutup_until: Option<DateTime<Utc>>,
    bot_messages: VecDeque<String>,
    bot_message_capacity: usize,
}

/// State of one conversation: bounded members, shut-up deadline and the
/// agent's recent outgoing messages.
///
/// Fields sit behind a short synchronous critical section; nothing awaits
/// while holding it.
#[derive(Debug)]
pub struct GroupState {
    gid: String,
    inner: Mutex<GroupInner>,
}

/// Read-only view of a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSnapshot {
    pub gid: String,
    pub shutup_until: Option<DateTime<Utc>>,
    pub member_count: usize,
    pub bot_messages: Vec<String>,
}

impl GroupState {
    pub fn new(gid: impl Into<String>, config: &StateConfig) -> Self {
        Self {
            gid: gid.into(),
            inner: Mutex::new(GroupInner {
                members: LruMap::new(config.max_members),
                shutup_until: None,
                bot_messages: VecDeque::with_capacity(config.bot_message_capacity),
                bot_message_capacity: config.bot_message_capacity.max(1),
            }),
        }
    }

    pub fn gid(&self) -> &str {
        &self.gid
    }

    fn lock(&self) -> MutexGuard<'_, GroupInner> {
        // Inner state stays consistent across a panic; keep serving it
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get or create a member, evicting the least recently touched on overflow.
    ///
    /// Members still referenced outside the group (a run holding their lock,
    /// a context not yet dropped) are never evicted, so one participant always
    /// maps to one mutex.
    pub fn member(&self, uid: &str) -> SharedMember {
        let mut inner = self.lock();
        let (member, evicted) = inner.members.get_or_insert_with(
            uid.to_string(),
            || MemberState::shared(uid),
            |m| Arc::strong_count(m) == 1,
        );
        let member = SharedMember::clone(member);
        for (old, _) in evicted {
            tracing::debug!(gid = %self.gid, evicted = %old, "Member evicted from group state");
        }
        member
    }

    /// Get a member without creating it.
    pub fn existing_member(&self, uid: &str) -> Option<SharedMember> {
        self.lock().members.get(&uid.to_string()).cloned()
    }

    pub fn member_count(&self) -> usize {
        self.lock().members.len()
    }

    pub fn shutup_until(&self) -> Option<DateTime<Utc>> {
        self.lock().shutup_until
    }

    /// Whether the whole conversation is shut up at `now`.
    pub fn is_shut_up(&self, now: DateTime<Utc>) -> bool {
        self.shutup_until().is_some_and(|until| now < until)
    }

    /// Push the shut-up deadline to `now + seconds`; never moves it backwards.
    pub fn extend_shutup(&self, now: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
        let mut inner = self.lock();
        let until = advance(inner.shutup_until, now, seconds);
        inner.shutup_until = Some(until);
        until
    }

    /// The agent's recent messages, oldest first.
    pub fn bot_messages(&self) -> Vec<String> {
        self.lock().bot_messages.iter().cloned().collect()
    }

    /// Remember an outgoing message, dropping the oldest past capacity.
    pub fn push_bot_message(&self, text: impl Into<String>) {
        let mut inner = self.lock();
        inner.bot_messages.push_back(text.into());
        while inner.bot_messages.len() > inner.bot_message_capacity {
            inner.bot_messages.pop_front();
        }
    }

    pub fn snapshot(&self) -> GroupSnapshot {
        let inner = self.lock();
        GroupSnapshot {
            gid: self.gid.clone(),
            shutup_until: inner.shutup_until,
            member_count: inner.members.len(),
            bot_messages: inner.bot_messages.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn group() -> GroupState {
        GroupState::new("g1", &StateConfig::default())
    }

    #[test]
    fn test_member_is_shared() {
        let g = group();
        let a = g.member("u1");
        let b = g.member("u1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(g.member_count(), 1);
    }

    #[test]
    fn test_member_capacity_evicts_one() {
        let g = group();
        for i in 0..15 {
            g.member(&format!("u{i}"));
        }
        // Touch the oldest so u1 becomes the eviction candidate
        g.member("u0");
        g.member("u15");

        assert_eq!(g.member_count(), 15);
        assert!(g.existing_member("u0").is_some());
        assert!(g.existing_member("u1").is_none());
        assert!(g.existing_member("u15").is_some());
    }

    #[test]
    fn test_member_in_use_is_not_evicted() {
        let g = group();
        // Held like a pipeline run holds its member
        let held = g.member("u0");
        for i in 1..15 {
            g.member(&format!("u{i}"));
        }
        g.member("u15");

        assert_eq!(g.member_count(), 15);
        assert!(g.existing_member("u1").is_none());
        let again = g.member("u0");
        assert!(Arc::ptr_eq(&held, &again));
    }

    #[tokio::test]
    async fn test_locked_member_keeps_its_mutex() {
        let g = GroupState::new(
            "g1",
            &StateConfig {
                max_members: 1,
                ..Default::default()
            },
        );
        let guard = g.member("u1").lock_owned().await;
        g.member("u2");

        // u1 survived the overflow, so a second run must wait on the same lock
        let u1 = g.member("u1");
        assert!(u1.try_lock().is_err());
        drop(guard);
        assert!(u1.try_lock().is_ok());
    }

    #[test]
    fn test_bot_message_queue_bounded() {
        let g = group();
        for i in 0..7 {
            g.push_bot_message(format!("m{i}"));
        }
        assert_eq!(g.bot_messages(), vec!["m2", "m3", "m4", "m5", "m6"]);
    }

    #[test]
    fn test_shutup_only_forward() {
        let g = group();
        let now = Utc::now();
        assert!(!g.is_shut_up(now));

        let long = g.extend_shutup(now, 600.0);
        let short = g.extend_shutup(now, 60.0);
        assert_eq!(long, short);
        assert!(g.is_shut_up(now + Duration::seconds(300)));
        assert!(!g.is_shut_up(now + Duration::seconds(601)));
    }

    #[test]
    fn test_snapshot() {
        let g = group();
        g.member("u1");
        g.push_bot_message("hi");
        let snap = g.snapshot();
        assert_eq!(snap.gid, "g1");
        assert_eq!(snap.member_count, 1);
        assert_eq!(snap.bot_messages, vec!["hi"]);
        assert!(snap.shutup_until.is_none());
    }
}
