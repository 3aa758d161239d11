//! Error types for the image pipeline.
//!
//! Provides a hierarchy of error types using `thiserror`: engine failures,
//! per-file pipeline failures, and the tagged error surfaced on the stream.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Name every stream-level error is tagged with.
pub const PLUGIN_NAME: &str = "image-optimizer-pipeline";

/// Failures reported by a codec engine or its pool.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The pool could not be created
    #[error("Pool creation failed: {0}")]
    PoolCreation(String),

    /// Work was submitted to a pool that has already been closed
    #[error("Pool is closed")]
    PoolClosed,

    /// Bytes could not be decoded into a bitmap
    #[error("Decode failed: {0}")]
    Decode(String),

    /// A preprocessor rejected its settings
    #[error("Preprocess failed: {0}")]
    Preprocess(String),

    /// An encoder failed to produce output
    #[error("Encode with '{encoder}' failed: {message}")]
    Encode { encoder: String, message: String },

    /// The engine does not provide the requested encoder
    #[error("Unknown encoder: {0}")]
    UnknownEncoder(String),

    /// Encoder options did not deserialize or are out of range
    #[error("Invalid options for '{name}': {message}")]
    InvalidOptions { name: String, message: String },

    /// A blocking worker panicked or was cancelled
    #[error("Worker failed: {0}")]
    Worker(String),
}

/// Convenience result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn pool_creation<T: Into<String>>(msg: T) -> Self {
        Self::PoolCreation(msg.into())
    }

    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::Decode(msg.into())
    }

    pub fn preprocess<T: Into<String>>(msg: T) -> Self {
        Self::Preprocess(msg.into())
    }

    pub fn encode(encoder: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Encode {
            encoder: encoder.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_options(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidOptions {
            name: name.into(),
            message: msg.into(),
        }
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}

impl From<tokio::sync::AcquireError> for EngineError {
    fn from(_: tokio::sync::AcquireError) -> Self {
        Self::PoolClosed
    }
}

/// Per-file failure, tagged with the pipeline stage it happened in.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The file carries an open byte stream instead of materialized content
    #[error("Streaming not supported")]
    StreamingNotSupported,

    /// The shared pool could not be acquired
    #[error("Codec pool unavailable: {0}")]
    PoolUnavailable(#[source] EngineError),

    #[error("{0}")]
    Decode(#[source] EngineError),

    #[error("{0}")]
    Preprocess(#[source] EngineError),

    #[error("{0}")]
    Encode(#[source] EngineError),
}

/// Convenience result type for per-file pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error emitted on the output stream for a file that failed.
///
/// Carries the plugin name, the underlying cause, and the offending path.
#[derive(Error, Debug)]
#[error("[{plugin}] {}: {source}", .path.display())]
pub struct PluginError {
    pub plugin: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: PipelineError,
}

impl PluginError {
    pub fn new(path: impl Into<PathBuf>, source: PipelineError) -> Self {
        Self {
            plugin: PLUGIN_NAME,
            path: path.into(),
            source,
        }
    }
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Cannot read config '{}': {message}", .path.display())]
    Read { path: PathBuf, message: String },

    /// The configuration is not valid JSON for the expected shape
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override did not parse
    #[error("Invalid value for {name}: {value}")]
    Env { name: &'static str, value: String },
}

impl ConfigError {
    pub fn read(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
