//! Configuration system for hark.
//!
//! Every section deserializes with defaults, so a config file only needs the
//! values it changes. Step names are validated while parsing.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{HarkError, HarkResult};
use crate::pipeline::StepName;

/// Built-in command names of the host platform.
pub const DEFAULT_BUILTIN_CMDS: &[&str] = &[
    "llm",
    "t2i",
    "tts",
    "sid",
    "op",
    "wl",
    "dashboard_update",
    "alter_cmd",
    "provider",
    "model",
    "plugin",
    "plugin ls",
    "new",
    "switch",
    "rename",
    "del",
    "reset",
    "history",
    "persona",
    "tool ls",
    "key",
    "websearch",
];

/// Step ordering and admin exemptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Keep registry order and treat `steps` as the enabled subset.
    pub lock_order: bool,
    /// Enabled steps (or the custom order when `lock_order` is false).
    pub steps: Vec<StepName>,
    /// Steps that administrators skip.
    pub admin_steps: Vec<StepName>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lock_order: true,
            steps: vec![
                StepName::Gate,
                StepName::Block,
                StepName::Command,
                StepName::Wake,
                StepName::Silence,
            ],
            admin_steps: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Whether a step is enabled.
    pub fn is_enabled_step(&self, step: StepName) -> bool {
        self.steps.contains(&step)
    }

    /// Whether administrators skip a step.
    pub fn is_admin_step(&self, step: StepName) -> bool {
        self.admin_steps.contains(&step)
    }
}

/// Identity filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Ignore messages sent by the bot itself.
    pub block_self: bool,
    /// Ignore known automated peer accounts.
    pub block_robots: bool,
    /// If non-empty, only these users pass.
    pub allow_users: Vec<String>,
    /// If non-empty, only these groups pass.
    pub allow_groups: Vec<String>,
    /// Users that never pass.
    pub deny_users: Vec<String>,
    /// Groups that never pass.
    pub deny_groups: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            block_self: true,
            block_robots: true,
            allow_users: Vec::new(),
            allow_groups: Vec::new(),
            deny_users: Vec::new(),
            deny_groups: Vec::new(),
        }
    }
}

/// Operational suppression.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// Messages containing any of these never wake the agent.
    pub keywords: Vec<String>,
    /// Block users repeating one of the agent's recent messages.
    pub repeat: bool,
    /// Seconds a member must wait between wakes (0 disables).
    pub wake_cd: f64,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            repeat: true,
            wake_cd: 0.0,
        }
    }
}

/// Command and wake-prefix handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Built-in commands of the host.
    pub builtin_cmds: Vec<String>,
    /// Commands registered by other host components.
    pub known_cmds: Vec<String>,
    /// Block built-in commands.
    pub block_builtin: bool,
    /// Block commands triggered through a wake prefix.
    pub block_prefix_cmd: bool,
    /// Block free text triggered through a wake prefix.
    pub block_prefix_llm: bool,
    /// Wake prefixes of the host.
    pub wake_prefixes: Vec<String>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            builtin_cmds: DEFAULT_BUILTIN_CMDS.iter().map(|s| s.to_string()).collect(),
            known_cmds: Vec::new(),
            block_builtin: false,
            block_prefix_cmd: false,
            block_prefix_llm: false,
            wake_prefixes: vec!["/".to_string()],
        }
    }
}

impl CommandConfig {
    /// All commands the matcher should recognize.
    pub fn all_commands(&self) -> impl Iterator<Item = &String> {
        self.builtin_cmds.iter().chain(self.known_cmds.iter())
    }
}

/// Wake triggers.
///
/// Confidence thresholds at or above 1.0 disable their trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    /// Names of the bot; mentioning one in text wakes it.
    pub names: Vec<String>,
    /// Wake-extension window in seconds after the last reply (0 disables).
    pub prolong: f64,
    /// Topical similarity threshold.
    pub similar: f64,
    /// Question confidence threshold.
    pub ask: f64,
    /// Boredom confidence threshold.
    pub bored: f64,
    /// Interest score threshold.
    pub interest: f64,
    /// Interest topics, each a whitespace-separated keyword list.
    pub interest_topics: Vec<String>,
    /// Probability of a random wake (0 disables).
    pub prob: f64,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            prolong: 0.0,
            similar: 1.0,
            ask: 1.0,
            bored: 1.0,
            interest: 1.0,
            interest_topics: Vec::new(),
            prob: 0.0,
        }
    }
}

impl WakeConfig {
    /// Interest topics split into keyword lists.
    pub fn topic_keywords(&self) -> Vec<Vec<String>> {
        self.interest_topics
            .iter()
            .map(|topic| topic.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|words| !words.is_empty())
            .collect()
    }
}

/// Silence penalties.
///
/// Thresholds at or above 1.0 disable their penalty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceConfig {
    /// Shut-up confidence threshold (silences the whole group).
    pub shutup: f64,
    /// Insult confidence threshold (silences the member).
    pub insult: f64,
    /// Robotic-phrasing confidence threshold (silences the member).
    pub robotic: f64,
    /// Seconds of silence per unit of confidence.
    pub multiple: f64,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            shutup: 1.0,
            insult: 1.0,
            robotic: 1.0,
            multiple: 500.0,
        }
    }
}

/// State store capacities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Members tracked per group before the least recently touched is evicted.
    pub max_members: usize,
    /// Outgoing bot messages cached per group.
    pub bot_message_capacity: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_members: 15,
            bot_message_capacity: 5,
        }
    }
}

/// Similarity engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// User messages kept per group in the TF-IDF window.
    pub history_limit: usize,
    /// Bot messages with at most this many tokens are treated as templates.
    pub template_threshold: usize,
    /// Stop scanning candidates once one scores at least this much.
    pub early_stop: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            history_limit: 120,
            template_threshold: 2,
            early_stop: 0.92,
        }
    }
}

/// Interest scorer parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestConfig {
    /// Messages shorter than this (in characters) score zero.
    pub min_message_len: usize,
    /// Tokenization cache entries.
    pub cache_size: u64,
}

impl Default for InterestConfig {
    fn default() -> Self {
        Self {
            min_message_len: 3,
            cache_size: 2048,
        }
    }
}

/// Main hark configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarkConfig {
    pub pipeline: PipelineConfig,
    pub gate: GateConfig,
    pub block: BlockConfig,
    pub command: CommandConfig,
    pub wake: WakeConfig,
    pub silence: SilenceConfig,
    pub state: StateConfig,
    pub similarity: SimilarityConfig,
    pub interest: InterestConfig,
}

impl HarkConfig {
    /// Default config file location (`~/.hark/config.toml`).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".hark"))
            .unwrap_or_else(|| PathBuf::from(".hark"))
            .join("config.toml")
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> HarkResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| HarkError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| HarkError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| HarkError::Configuration(e.to_string()))?,
            _ => {
                return Err(HarkError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables on top of the defaults.
    ///
    /// Reads:
    /// - `HARK_WAKE_NAMES` (comma separated)
    /// - `HARK_WAKE_CD` (seconds)
    /// - `HARK_WAKE_PROB` (0..1)
    /// - `HARK_SILENCE_MULTIPLE` (seconds per unit of confidence)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(names) = std::env::var("HARK_WAKE_NAMES") {
            config.wake.names = names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Ok(cd) = std::env::var("HARK_WAKE_CD") {
            if let Ok(seconds) = cd.parse() {
                config.block.wake_cd = seconds;
            }
        }

        if let Ok(prob) = std::env::var("HARK_WAKE_PROB") {
            if let Ok(p) = prob.parse::<f64>() {
                config.wake.prob = p.clamp(0.0, 1.0);
            }
        }

        if let Ok(multiple) = std::env::var("HARK_SILENCE_MULTIPLE") {
            if let Ok(m) = multiple.parse() {
                config.silence.multiple = m;
            }
        }

        config
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> HarkResult<()> {
        if self.pipeline.steps.is_empty() {
            return Err(HarkError::missing_field("pipeline.steps"));
        }
        if self.state.max_members == 0 {
            return Err(HarkError::configuration("state.max_members must be at least 1"));
        }
        if self.state.bot_message_capacity == 0 {
            return Err(HarkError::configuration(
                "state.bot_message_capacity must be at least 1",
            ));
        }
        if self.similarity.history_limit == 0 {
            return Err(HarkError::configuration(
                "similarity.history_limit must be at least 1",
            ));
        }
        for (field, value) in [
            ("block.wake_cd", self.block.wake_cd),
            ("wake.prolong", self.wake.prolong),
            ("silence.multiple", self.silence.multiple),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(HarkError::configuration(format!(
                    "{field} must be a non-negative number of seconds"
                )));
            }
        }
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> HarkConfigBuilder {
        HarkConfigBuilder::default()
    }
}

/// Builder for HarkConfig.
#[derive(Default)]
pub struct HarkConfigBuilder {
    config: HarkConfig,
}

impl HarkConfigBuilder {
    /// Set pipeline configuration.
    pub fn pipeline(mut self, config: PipelineConfig) -> Self {
        self.config.pipeline = config;
        self
    }

    /// Set gate configuration.
    pub fn gate(mut self, config: GateConfig) -> Self {
        self.config.gate = config;
        self
    }

    /// Set block configuration.
    pub fn block(mut self, config: BlockConfig) -> Self {
        self.config.block = config;
        self
    }

    /// Set command configuration.
    pub fn command(mut self, config: CommandConfig) -> Self {
        self.config.command = config;
        self
    }

    /// Set wake configuration.
    pub fn wake(mut self, config: WakeConfig) -> Self {
        self.config.wake = config;
        self
    }

    /// Set silence configuration.
    pub fn silence(mut self, config: SilenceConfig) -> Self {
        self.config.silence = config;
        self
    }

    /// Set state configuration.
    pub fn state(mut self, config: StateConfig) -> Self {
        self.config.state = config;
        self
    }

    /// Set similarity configuration.
    pub fn similarity(mut self, config: SimilarityConfig) -> Self {
        self.config.similarity = config;
        self
    }

    /// Set interest configuration.
    pub fn interest(mut self, config: InterestConfig) -> Self {
        self.config.interest = config;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> HarkConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = HarkConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.pipeline.lock_order);
        assert_eq!(config.pipeline.steps.len(), 5);
        assert_eq!(config.state.max_members, 15);
        assert_eq!(config.state.bot_message_capacity, 5);
        assert!((config.similarity.early_stop - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn test_example_config_parses() {
        let config: HarkConfig =
            toml::from_str(include_str!("../../../../hark.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.steps.len(), 5);
        assert!(config.pipeline.is_admin_step(StepName::Block));
        assert_eq!(config.wake.topic_keywords().len(), 2);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[pipeline]
lock_order = false
steps = ["gate(filter)", "wake", "silence"]
admin_steps = ["gate"]

[wake]
names = ["hark"]
interest_topics = ["rust cargo crate", "游戏 排位"]

[silence]
shutup = 0.3
"#
        )
        .unwrap();

        let config = HarkConfig::from_file(file.path()).unwrap();
        assert!(!config.pipeline.lock_order);
        assert_eq!(
            config.pipeline.steps,
            vec![StepName::Gate, StepName::Wake, StepName::Silence]
        );
        assert!(config.pipeline.is_admin_step(StepName::Gate));
        assert_eq!(config.wake.names, vec!["hark".to_string()]);
        assert_eq!(config.wake.topic_keywords().len(), 2);
        assert!((config.silence.shutup - 0.3).abs() < f64::EPSILON);
        // Untouched sections keep their defaults
        assert_eq!(config.state.max_members, 15);
    }

    #[test]
    fn test_from_file_rejects_unknown_step() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"pipeline": {{"steps": ["gate", "greet"]}}}}"#).unwrap();

        let err = HarkConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("greet"));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "block:\n  wake_cd: 30\n  keywords: [\"广告\"]").unwrap();

        let config = HarkConfig::from_file(file.path()).unwrap();
        assert!((config.block.wake_cd - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.block.keywords, vec!["广告".to_string()]);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(HarkConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_steps() {
        let config = HarkConfig::builder()
            .pipeline(PipelineConfig {
                steps: Vec::new(),
                ..Default::default()
            })
            .build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pipeline.steps"));
    }

    #[test]
    fn test_validate_rejects_negative_seconds() {
        let config = HarkConfig::builder()
            .block(BlockConfig {
                wake_cd: -1.0,
                ..Default::default()
            })
            .build();
        assert!(config.validate().is_err());
    }
}
