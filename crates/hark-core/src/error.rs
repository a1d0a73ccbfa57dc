//! Error types for hark operations.
//!
//! Errors only surface while building the pipeline (configuration, lexicons,
//! config files). Per-message processing never fails: degenerate inputs
//! short-circuit to a pass.

use thiserror::Error;

/// Result type alias for hark operations.
pub type HarkResult<T> = Result<T, HarkError>;

/// Main error type for all hark operations.
#[derive(Error, Debug)]
pub enum HarkError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A configuration field is missing or empty where a value is required.
    #[error("Missing configuration field: {field}")]
    MissingField { field: String },

    /// A pipeline step name did not match any known step.
    #[error("Unknown pipeline step: {name}")]
    UnknownStep { name: String },

    /// A keyword table entry failed validation.
    #[error("Invalid lexicon entry '{phrase}': {message}")]
    Lexicon { phrase: String, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Configuration (CFG_xxx)
    CfgInvalid,
    CfgMissingField,
    CfgUnknownStep,

    // Lexicon (LEX_xxx)
    LexInvalidEntry,

    // IO (IO_xxx)
    IoFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::CfgMissingField => "CFG_002",
            ErrorCode::CfgUnknownStep => "CFG_003",
            ErrorCode::LexInvalidEntry => "LEX_001",
            ErrorCode::IoFailed => "IO_001",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl HarkError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a missing-field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an unknown-step error.
    pub fn unknown_step(name: impl Into<String>) -> Self {
        Self::UnknownStep { name: name.into() }
    }

    /// Create a lexicon validation error.
    pub fn lexicon(phrase: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lexicon {
            phrase: phrase.into(),
            message: message.into(),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::MissingField { .. } => ErrorCode::CfgMissingField,
            Self::UnknownStep { .. } => ErrorCode::CfgUnknownStep,
            Self::Lexicon { .. } => ErrorCode::LexInvalidEntry,
            Self::Io(_) => ErrorCode::IoFailed,
            Self::Serialization(_) => ErrorCode::ParseInvalidJson,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::UnknownStep { .. } => {
                Some("Valid steps are: gate, block, command, wake, silence")
            }
            Self::MissingField { .. } => Some("Please check your configuration file"),
            Self::Lexicon { .. } => Some("Weights and intensities must be finite and positive"),
            _ => None,
        }
    }
}
