//! Per-participant state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::pipeline::WakeReason;

/// Shared handle to a member's state. The pipeline holds the lock for a whole run.
pub type SharedMember = Arc<Mutex<MemberState>>;

/// State of one participant in one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberState {
    pub uid: String,
    /// The member cannot wake the agent before this instant.
    pub silence_until: Option<DateTime<Utc>>,
    /// Last successful wake.
    pub last_wake: Option<DateTime<Utc>>,
    /// Why the last wake happened.
    pub last_wake_reason: Option<WakeReason>,
    /// When the agent last replied to this member.
    pub last_reply: Option<DateTime<Utc>>,
    /// Member may keep the agent listening.
    pub can_prolong: bool,
}

impl MemberState {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Default::default()
        }
    }

    pub fn shared(uid: impl Into<String>) -> SharedMember {
        Arc::new(Mutex::new(Self::new(uid)))
    }

    /// Whether the member is silenced at `now`.
    pub fn is_silenced(&self, now: DateTime<Utc>) -> bool {
        self.silence_until.is_some_and(|until| now < until)
    }

    /// Push `silence_until` to `now + seconds`; never moves it backwards.
    pub fn extend_silence(&mut self, now: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
        let until = advance(self.silence_until, now, seconds);
        self.silence_until = Some(until);
        until
    }

    /// Seconds since the last wake, if any.
    pub fn seconds_since_wake(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_wake.map(|at| seconds_between(at, now))
    }

    /// Seconds since the agent last replied, if ever.
    pub fn seconds_since_reply(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_reply.map(|at| seconds_between(at, now))
    }
}

/// `max(current, now + seconds)`.
pub(crate) fn advance(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    seconds: f64,
) -> DateTime<Utc> {
    let candidate = now
        .checked_add_signed(duration_from_secs(seconds))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    match current {
        Some(existing) if existing > candidate => existing,
        _ => candidate,
    }
}

// Longer windows are clamped (100 years)
const MAX_WINDOW_SECS: f64 = 3_153_600_000.0;

pub(crate) fn duration_from_secs(seconds: f64) -> Duration {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Duration::zero();
    }
    Duration::milliseconds((seconds.min(MAX_WINDOW_SECS) * 1000.0).round() as i64)
}

pub(crate) fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_silence_only_forward() {
        let now = Utc::now();
        let mut member = MemberState::new("u1");

        let first = member.extend_silence(now, 100.0);
        assert!(member.is_silenced(now));

        // A shorter window keeps the longer deadline
        let second = member.extend_silence(now, 10.0);
        assert_eq!(first, second);

        let third = member.extend_silence(now, 200.0);
        assert!(third > first);
        assert!(!member.is_silenced(now + Duration::seconds(201)));
    }

    #[test]
    fn test_elapsed_helpers() {
        let now = Utc::now();
        let mut member = MemberState::new("u1");
        assert!(member.seconds_since_wake(now).is_none());

        member.last_wake = Some(now - Duration::seconds(30));
        let elapsed = member.seconds_since_wake(now).unwrap();
        assert!((elapsed - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_duration_from_secs_rejects_garbage() {
        assert_eq!(duration_from_secs(-5.0), Duration::zero());
        assert_eq!(duration_from_secs(f64::NAN), Duration::zero());
        assert_eq!(duration_from_secs(1.5), Duration::milliseconds(1500));
    }
}
