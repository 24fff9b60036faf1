//! Domain error types.

use std::fmt;

/// Coarse failure category reported alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DataUnavailable,
    InsufficientData,
    Analysis,
    Configuration,
    Timeout,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::DataUnavailable => "DataUnavailable",
            ErrorKind::InsufficientData => "InsufficientData",
            ErrorKind::Analysis => "AnalysisError",
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Io => "IoError",
        };
        f.write_str(name)
    }
}

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no data for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("analysis error: {reason}")]
    Analysis { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("analysis of {symbol} timed out after {millis} ms")]
    Timeout { symbol: String, millis: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn data_unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        EngineError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            EngineError::InsufficientData { .. } => ErrorKind::InsufficientData,
            EngineError::Analysis { .. } => ErrorKind::Analysis,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => ErrorKind::Configuration,
            EngineError::Timeout { .. } => ErrorKind::Timeout,
            EngineError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err.kind() {
            ErrorKind::Io => 1,
            ErrorKind::Configuration => 2,
            ErrorKind::DataUnavailable => 3,
            ErrorKind::Analysis => 4,
            ErrorKind::InsufficientData => 5,
            ErrorKind::Timeout => 6,
        };
        std::process::ExitCode::from(code)
    }
}
