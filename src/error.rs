//! Error types for hearth.

use std::time::Duration;

/// Top-level error type for a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Decision backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Configuration-related errors. All of these are fatal and surface before
/// the first simulated day.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration file not found: {path}")]
    NotFound { path: std::path::PathBuf },

    #[error("No identity supplied for household member '{role}'")]
    MissingIdentity { role: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decision backend errors.
///
/// Persona agents never propagate these: any failure routes the decision
/// through the local rule instead.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend {backend} request failed: {reason}")]
    RequestFailed { backend: String, reason: String },

    #[error("Backend {backend} timed out after {timeout:?}")]
    Timeout { backend: String, timeout: Duration },

    #[error("Invalid response from {backend}: {reason}")]
    InvalidResponse { backend: String, reason: String },

    #[error("Response from {backend} exceeded {limit} bytes")]
    ResponseTooLarge { backend: String, limit: usize },

    #[error("Authentication failed for backend {backend}")]
    AuthFailed { backend: String },

    #[error("Backend {backend} is unavailable")]
    Unavailable { backend: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence sink errors. Logged and counted by the dispatcher; never
/// abort a run.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Sink {sink} write failed: {reason}")]
    WriteFailed { sink: String, reason: String },

    #[error("Sink {sink} is closed")]
    Closed { sink: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors detected while setting up a run.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Invalid phase schedule: {0}")]
    InvalidSchedule(String),

    #[error("Run length must be at least one day, got {days}")]
    EmptyRun { days: u32 },

    #[error("This orchestrator has already run; build a fresh one per run")]
    AlreadyRun,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
