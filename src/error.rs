//! Typed errors for each pipeline layer, unified under [`TierError`].
//!
//! Library functions return their own layer's error type; the CLI and the orchestrator's
//! outer tick loop collapse these into `anyhow::Result` with path/share context attached.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("mode '{0}' is not defined in config")]
    UnknownMode(String),
}

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("share '{share}' has no resolvable endpoint")]
    NoEndpoint { share: String },
    #[error("I/O error entering directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry provider unavailable for volume '{volume}': {reason}")]
    Unavailable { volume: String, reason: String },
}

/// The scorer (C3) is a pure function over already-validated inputs and cannot itself fail;
/// this type exists so every component in §10.2's error taxonomy has a named layer error.
#[derive(Debug, Error)]
pub enum ScoringError {}

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("free-space budget for share '{share}' is zero or negative")]
    NoBudget { share: String },
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("permission denied reading {path}")]
    PermissionDenied { path: String },
    #[error("source not found: {path}")]
    SourceNotFound { path: String },
    #[error("zero-size source: {path}")]
    ZeroSizeSource { path: String },
    #[error("download failed for {path}: {reason}")]
    DownloadFailed { path: String, reason: String },
    #[error("upload failed for {path}: {reason}")]
    UploadFailed { path: String, reason: String },
    #[error("failed to delete source {path}: {reason}")]
    SourceDeleteFailed { path: String, reason: String },
    #[error("operation on {path} timed out")]
    Timeout { path: String },
    #[error("unexpected failure on {path}: {reason}")]
    FatalUnexpected { path: String, reason: String },
}

impl MigrationError {
    /// Short reason code used in `MovementRecord`/failure-list output.
    pub fn reason_code(&self) -> &'static str {
        match self {
            MigrationError::PermissionDenied { .. } => "permission-denied",
            MigrationError::SourceNotFound { .. } => "source-not-found",
            MigrationError::ZeroSizeSource { .. } => "zero-size-source",
            MigrationError::DownloadFailed { .. } => "download-failed",
            MigrationError::UploadFailed { .. } => "upload-failed",
            MigrationError::SourceDeleteFailed { .. } => "source-delete-failed",
            MigrationError::Timeout { .. } => "timeout",
            MigrationError::FatalUnexpected { .. } => "fatal-unexpected",
        }
    }
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to open journal store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("journal transaction failed: {source}")]
    Transaction {
        #[source]
        source: rusqlite::Error,
    },
    #[error("journal query failed: {source}")]
    Query {
        #[source]
        source: rusqlite::Error,
    },
}

#[derive(Debug, Error)]
pub enum TierError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Planning(#[from] PlanningError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Journal(#[from] JournalError),
}

pub type Result<T> = std::result::Result<T, TierError>;
