//! Error types for trace accumulation, frame parsing and configuration.

use thiserror::Error;

/// Errors returned by trace operations
///
/// The only failure a trace operation can produce is being invoked without a
/// trace to act on. Frame content is never rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceError {
    /// Append was attempted through a handle that was never bound to a trace
    #[error("cannot append frame: trace is not initialised")]
    InvalidReceiver,
}

/// Errors raised while parsing frame metadata from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("unknown frame type: {0:?}")]
    UnknownFrameType(String),
}

/// Errors raised while loading a [`TraceConfig`](crate::config::TraceConfig)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for environment variable {var}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Verdicts of a load run that must fail the process
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Load run lost frames: expected {expected}, found {appended} ({unique} unique)")]
    FramesLost {
        expected: usize,
        appended: usize,
        unique: usize,
    },

    #[error("Load run reordered frames within a producer")]
    Reordered,
}

pub type Result<T> = std::result::Result<T, TraceError>;
