//! Step names, decision reasons and step results.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::HarkError;

/// The closed set of pipeline steps, in default registry order.
///
/// Deserializes from config strings such as `"gate"` or `"gate(identity filter)"`;
/// the parenthesized label is display text and is ignored. Unknown names fail
/// deserialization, so a pipeline can never be built with an unknown step.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum StepName {
    /// Identity and allow/deny-list filtering.
    Gate,
    /// Forbidden words, repeats and cooldowns.
    Block,
    /// Built-in commands and wake prefixes.
    Command,
    /// Wake triggers.
    Wake,
    /// Silence penalties after a wake.
    Silence,
}

impl StepName {
    /// Parse a configured step name, dropping any `(label)` suffix.
    pub fn parse_labeled(raw: &str) -> Result<Self, HarkError> {
        let name = raw.split(['(', '（']).next().unwrap_or_default().trim();
        Self::from_str(name).map_err(|_| HarkError::unknown_step(raw))
    }
}

impl TryFrom<String> for StepName {
    type Error = HarkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_labeled(&value)
    }
}

/// Why a step decided to wake the agent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WakeReason {
    /// Message started with a configured wake prefix.
    Prefix,
    /// Message contained a mention tag addressed at the bot.
    Mention,
    /// Message quoted a message sent by the bot.
    Reply,
    /// Message text contained one of the bot's configured names.
    Name,
    /// Member is still inside the wake-extension window.
    Prolong,
    /// Message is topically similar to recent bot messages.
    Similar,
    /// Message looks like a question.
    Ask,
    /// Message expresses boredom.
    Bored,
    /// Message matches configured interest topics.
    Interest,
    /// Random draw.
    Random,
}

impl WakeReason {
    /// Whether a wake for this reason lets the member keep the agent listening.
    pub fn grants_prolong(&self) -> bool {
        matches!(
            self,
            WakeReason::Mention | WakeReason::Reply | WakeReason::Name | WakeReason::Prolong
        )
    }
}

/// Why a step blocked the message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    SelfMessage,
    RobotAccount,
    UserNotAllowed,
    GroupNotAllowed,
    UserDenied,
    GroupDenied,
    ForbiddenWord,
    Repeat,
    Cooldown,
    BuiltinCommand,
    PrefixCommand,
    PrefixFreeText,
    GroupSilenced,
    MemberSilenced,
}

/// Which silence window a silence step applied.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SilenceKind {
    /// Whole conversation told the agent to be quiet.
    ShutUp,
    /// Member insulted the agent.
    Insult,
    /// Member talks like a bot.
    Robotic,
}

/// The decision a step reached, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    Wake { reason: WakeReason },
    Block { reason: BlockReason },
    Silence { silence: SilenceKind, seconds: f64 },
}

/// Outcome of a single step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResult {
    /// `Some(true)` wakes, `Some(false)` blocks, `None` leaves the decision open.
    pub wake: Option<bool>,
    /// Stop running subsequent steps.
    pub abort: bool,
    /// Diagnostic message, never shown to users.
    pub msg: Option<String>,
    /// Member may keep the agent listening (wake extension).
    pub prolong: bool,
    /// Typed decision.
    pub disposition: Option<Disposition>,
    /// Opaque payload for later steps.
    pub data: Option<serde_json::Value>,
}

impl StepResult {
    /// Leave the decision to later steps.
    pub fn pass() -> Self {
        Self::default()
    }

    /// Block the message and stop the pipeline.
    pub fn block(reason: BlockReason, msg: impl Into<String>) -> Self {
        Self {
            wake: Some(false),
            abort: true,
            msg: Some(msg.into()),
            disposition: Some(Disposition::Block { reason }),
            ..Default::default()
        }
    }

    /// Wake the agent; later steps still run.
    pub fn wake(reason: WakeReason, msg: impl Into<String>) -> Self {
        Self {
            wake: Some(true),
            msg: Some(msg.into()),
            prolong: reason.grants_prolong(),
            disposition: Some(Disposition::Wake { reason }),
            ..Default::default()
        }
    }

    /// Apply a silence window and stop the pipeline.
    ///
    /// `stop` controls whether the event's propagation is halted as well.
    pub fn silence(kind: SilenceKind, seconds: f64, stop: bool, msg: impl Into<String>) -> Self {
        Self {
            wake: if stop { Some(false) } else { None },
            abort: true,
            msg: Some(msg.into()),
            disposition: Some(Disposition::Silence {
                silence: kind,
                seconds,
            }),
            ..Default::default()
        }
    }

    /// Attach a payload for later steps.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The wake reason, when this result woke the agent.
    pub fn wake_reason(&self) -> Option<WakeReason> {
        match self.disposition {
            Some(Disposition::Wake { reason }) => Some(reason),
            _ => None,
        }
    }
}

/// Record of one executed step, kept on the context for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepTrace {
    pub step: StepName,
    pub wake: Option<bool>,
    pub abort: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<Disposition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl StepTrace {
    pub fn new(step: StepName, result: &StepResult) -> Self {
        Self {
            step,
            wake: result.wake,
            abort: result.abort,
            disposition: result.disposition.clone(),
            msg: result.msg.clone(),
        }
    }
}
