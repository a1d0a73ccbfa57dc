//! In-memory registry of conversation state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::group::{GroupSnapshot, GroupState};
use super::member::SharedMember;
use crate::config::StateConfig;

/// Lazily populated state for every conversation the process has seen.
///
/// Groups are never removed; the map grows for the life of the process.
/// Members are bounded per group, but a member whose handle is still held
/// elsewhere (typically by a running pipeline) is skipped when evicting, so a
/// group can briefly exceed its bound instead of splitting one member in two.
#[derive(Debug, Default)]
pub struct StateStore {
    groups: DashMap<String, Arc<GroupState>>,
    config: StateConfig,
}

impl StateStore {
    pub fn new(config: StateConfig) -> Self {
        Self {
            groups: DashMap::new(),
            config,
        }
    }

    /// Get or atomically create a group.
    pub fn group(&self, gid: &str) -> Arc<GroupState> {
        if let Some(group) = self.groups.get(gid) {
            return Arc::clone(group.value());
        }
        let group = self
            .groups
            .entry(gid.to_string())
            .or_insert_with(|| {
                debug!(gid, "Creating group state");
                Arc::new(GroupState::new(gid, &self.config))
            });
        Arc::clone(group.value())
    }

    /// Get or create a member of a group.
    pub fn member(&self, gid: &str, uid: &str) -> SharedMember {
        self.group(gid).member(uid)
    }

    /// Group state, if the group was ever seen.
    pub fn existing_group(&self, gid: &str) -> Option<Arc<GroupState>> {
        self.groups.get(gid).map(|g| Arc::clone(g.value()))
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Record that the agent replied in a conversation.
    ///
    /// The text joins the group's recent bot messages (used for repeat and
    /// similarity checks) and, when the member is known, their `last_reply`
    /// is set so the wake extension can apply.
    pub async fn record_bot_reply(
        &self,
        gid: &str,
        uid: Option<&str>,
        text: &str,
        now: DateTime<Utc>,
    ) {
        let group = self.group(gid);
        let text = text.trim();
        if !text.is_empty() {
            group.push_bot_message(text);
        }

        if let Some(member) = uid.and_then(|uid| group.existing_member(uid)) {
            member.lock().await.last_reply = Some(now);
        }
    }

    /// Read-only view of a group.
    pub fn snapshot(&self, gid: &str) -> Option<GroupSnapshot> {
        self.existing_group(gid).map(|g| g.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_created_once() {
        let store = StateStore::default();
        let a = store.group("g1");
        let b = store.group("g1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.group_count(), 1);
        assert!(store.existing_group("g2").is_none());
    }

    #[test]
    fn test_member_scoped_by_group() {
        let store = StateStore::default();
        let a = store.member("g1", "u1");
        let b = store.member("g2", "u1");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_record_bot_reply() {
        let store = StateStore::default();
        let member = store.member("g1", "u1");
        let now = Utc::now();

        store
            .record_bot_reply("g1", Some("u1"), "  hello there  ", now)
            .await;

        assert_eq!(member.lock().await.last_reply, Some(now));
        let snap = store.snapshot("g1").unwrap();
        assert_eq!(snap.bot_messages, vec!["hello there"]);
    }

    #[tokio::test]
    async fn test_record_bot_reply_unknown_member() {
        let store = StateStore::default();
        store
            .record_bot_reply("g1", Some("ghost"), "hi", Utc::now())
            .await;
        // Unknown members are not created by replies
        assert_eq!(store.snapshot("g1").unwrap().member_count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_group_creation() {
        let store = Arc::new(StateStore::default());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.group("shared") })
            })
            .collect();

        let mut groups = Vec::new();
        for h in handles {
            groups.push(h.await.unwrap());
        }
        assert!(groups.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
