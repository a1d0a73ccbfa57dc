//! Per-message context shared by the pipeline steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;

use crate::config::CommandConfig;
use crate::pipeline::StepTrace;
use crate::state::{GroupState, MemberState, SharedMember, StateStore};

/// One component of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text.
    Plain { text: String },
    /// Mention of a participant (or the bot).
    Mention { target: String },
    /// Quote of an earlier message.
    Reply { sender_id: String },
    /// Anything else (images, stickers, files).
    Other { kind: String },
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Segment::Plain { text: text.into() }
    }

    pub fn mention(target: impl Into<String>) -> Self {
        Segment::Mention {
            target: target.into(),
        }
    }

    pub fn reply(sender_id: impl Into<String>) -> Self {
        Segment::Reply {
            sender_id: sender_id.into(),
        }
    }
}

/// Signals the pipeline sends back to the host's event.
#[cfg_attr(test, mockall::automock)]
pub trait HostEvent: Send + Sync {
    /// Stop the event from reaching the host's other handlers.
    fn stop_event(&self);
    fn is_stopped(&self) -> bool;
    /// Mark the event as one the agent should answer.
    fn mark_woken(&self);
    fn is_woken(&self) -> bool;
}

/// In-memory [`HostEvent`] for hosts without an event object of their own.
#[derive(Debug, Default)]
pub struct EventSignals {
    stopped: AtomicBool,
    woken: AtomicBool,
}

impl EventSignals {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostEvent for EventSignals {
    fn stop_event(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn mark_woken(&self) {
        self.woken.store(true, Ordering::SeqCst);
    }

    fn is_woken(&self) -> bool {
        self.woken.load(Ordering::SeqCst)
    }
}

impl<T: HostEvent + ?Sized> HostEvent for Arc<T> {
    fn stop_event(&self) {
        (**self).stop_event()
    }

    fn is_stopped(&self) -> bool {
        (**self).is_stopped()
    }

    fn mark_woken(&self) {
        (**self).mark_woken()
    }

    fn is_woken(&self) -> bool {
        (**self).is_woken()
    }
}

/// Recognizes the command token at the start of a message.
///
/// One wake prefix is stripped first; then the longest known command the text
/// starts with wins, provided whitespace or the end of text follows it.
#[derive(Debug, Clone, Default)]
pub struct CommandMatcher {
    commands: Vec<String>,
    prefixes: Vec<String>,
}

impl CommandMatcher {
    pub fn new(config: &CommandConfig) -> Self {
        let mut commands: Vec<String> = config
            .all_commands()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        commands.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        commands.dedup();

        let mut prefixes: Vec<String> = config
            .wake_prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()));

        Self { commands, prefixes }
    }

    /// The longest wake prefix `text` starts with.
    pub fn prefix_of(&self, text: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|p| text.starts_with(p.as_str()))
            .map(String::as_str)
    }

    /// The command token of `text`, if any.
    pub fn match_command(&self, text: &str) -> Option<String> {
        let text = text.trim_start();
        let body = match self.prefix_of(text) {
            Some(prefix) => &text[prefix.len()..],
            None => text,
        };

        self.commands
            .iter()
            .find(|cmd| {
                body.strip_prefix(cmd.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
            })
            .cloned()
    }
}

/// Everything the steps know about one inbound message.
///
/// The member lock is taken by the pipeline for the duration of a run; steps
/// reach member state through [`member_state`](Self::member_state) and
/// [`member_state_mut`](Self::member_state_mut).
pub struct WakeContext {
    event: Box<dyn HostEvent>,
    /// Message segments in order.
    pub chain: Vec<Segment>,
    /// Concatenated plain text.
    pub plain: String,
    /// Recognized command token.
    pub cmd: Option<String>,
    pub is_admin: bool,
    /// Conversation id; empty for direct messages.
    pub gid: String,
    /// Sender id.
    pub uid: String,
    /// The bot's own id.
    pub bid: String,
    pub group: Option<Arc<GroupState>>,
    pub member: Option<SharedMember>,
    pub now: DateTime<Utc>,
    /// Steps executed so far.
    pub trace: Vec<StepTrace>,
    locked: Option<OwnedMutexGuard<MemberState>>,
}

impl std::fmt::Debug for WakeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakeContext")
            .field("plain", &self.plain)
            .field("cmd", &self.cmd)
            .field("is_admin", &self.is_admin)
            .field("gid", &self.gid)
            .field("uid", &self.uid)
            .field("bid", &self.bid)
            .field("now", &self.now)
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}

impl WakeContext {
    pub fn builder(event: impl HostEvent + 'static) -> WakeContextBuilder {
        WakeContextBuilder::new(Box::new(event))
    }

    pub fn event(&self) -> &dyn HostEvent {
        self.event.as_ref()
    }

    /// Whether the message mentions the bot.
    pub fn mentions_bot(&self) -> bool {
        self.chain
            .iter()
            .any(|seg| matches!(seg, Segment::Mention { target } if *target == self.bid))
    }

    /// Whether the message quotes one of the bot's messages.
    pub fn replies_to_bot(&self) -> bool {
        self.chain
            .iter()
            .any(|seg| matches!(seg, Segment::Reply { sender_id } if *sender_id == self.bid))
    }

    /// The leading segment, when it is plain text.
    pub fn leading_text(&self) -> Option<&str> {
        match self.chain.first() {
            Some(Segment::Plain { text }) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Locked member state. `None` outside a pipeline run or without a member.
    pub fn member_state(&self) -> Option<&MemberState> {
        self.locked.as_deref()
    }

    pub fn member_state_mut(&mut self) -> Option<&mut MemberState> {
        self.locked.as_deref_mut()
    }

    /// Take the member lock; held until [`unlock_member`](Self::unlock_member).
    pub async fn lock_member(&mut self) {
        if self.locked.is_some() {
            return;
        }
        if let Some(member) = &self.member {
            self.locked = Some(Arc::clone(member).lock_owned().await);
        }
    }

    pub fn unlock_member(&mut self) {
        self.locked = None;
    }
}

/// Builder for [`WakeContext`].
pub struct WakeContextBuilder {
    event: Box<dyn HostEvent>,
    chain: Vec<Segment>,
    plain: Option<String>,
    cmd: Option<String>,
    matcher: Option<CommandMatcher>,
    is_admin: bool,
    gid: String,
    uid: String,
    bid: String,
    group: Option<Arc<GroupState>>,
    member: Option<SharedMember>,
    now: Option<DateTime<Utc>>,
}

impl WakeContextBuilder {
    fn new(event: Box<dyn HostEvent>) -> Self {
        Self {
            event,
            chain: Vec::new(),
            plain: None,
            cmd: None,
            matcher: None,
            is_admin: false,
            gid: String::new(),
            uid: String::new(),
            bid: String::new(),
            group: None,
            member: None,
            now: None,
        }
    }

    pub fn chain(mut self, chain: Vec<Segment>) -> Self {
        self.chain = chain;
        self
    }

    /// Override the plain text (defaults to the joined plain segments).
    pub fn plain(mut self, plain: impl Into<String>) -> Self {
        self.plain = Some(plain.into());
        self
    }

    pub fn cmd(mut self, cmd: impl Into<String>) -> Self {
        self.cmd = Some(cmd.into());
        self
    }

    /// Detect the command token from the plain text when none is set.
    pub fn command_matcher(mut self, matcher: &CommandMatcher) -> Self {
        self.matcher = Some(matcher.clone());
        self
    }

    pub fn is_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    pub fn group_id(mut self, gid: impl Into<String>) -> Self {
        self.gid = gid.into();
        self
    }

    pub fn user_id(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn bot_id(mut self, bid: impl Into<String>) -> Self {
        self.bid = bid.into();
        self
    }

    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn group(mut self, group: Arc<GroupState>) -> Self {
        self.group = Some(group);
        self
    }

    pub fn member(mut self, member: SharedMember) -> Self {
        self.member = Some(member);
        self
    }

    /// Resolve group and member state from a store. Direct messages (no group
    /// id) get neither.
    pub fn state(mut self, store: &StateStore) -> Self {
        if !self.gid.is_empty() {
            let group = store.group(&self.gid);
            if !self.uid.is_empty() {
                self.member = Some(group.member(&self.uid));
            }
            self.group = Some(group);
        }
        self
    }

    pub fn build(self) -> WakeContext {
        let plain = self.plain.unwrap_or_else(|| {
            self.chain
                .iter()
                .filter_map(|seg| match seg {
                    Segment::Plain { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<String>()
                .trim()
                .to_string()
        });

        let cmd = self
            .cmd
            .or_else(|| self.matcher.as_ref().and_then(|m| m.match_command(&plain)));

        WakeContext {
            event: self.event,
            chain: self.chain,
            plain,
            cmd,
            is_admin: self.is_admin,
            gid: self.gid,
            uid: self.uid,
            bid: self.bid,
            group: self.group,
            member: self.member,
            now: self.now.unwrap_or_else(Utc::now),
            trace: Vec::new(),
            locked: None,
        }
    }
}
