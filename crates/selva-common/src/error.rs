//! Error types for Selva.

use thiserror::Error;

/// Top-level error type for Selva operations.
#[derive(Debug, Error)]
pub enum SelvaError {
    /// Behavior profile persistence errors
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Pattern catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Encounter configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading or writing the behavior profile.
///
/// These are always recovered locally by the caller.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Record could not be decoded
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The background writer still has a write queued
    #[error("Profile writer is busy")]
    WriterBusy,

    /// The background writer has shut down
    #[error("Profile writer is closed")]
    WriterClosed,

    /// Temp-file rename failed
    #[error("Atomic write failed: {0}")]
    AtomicWriteFailed(String),
}

/// Programmer errors in the pattern catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// A reachable (boss, state) pair has no pattern constructors
    #[error("Empty pattern catalog for {boss} in state {state}")]
    Empty {
        /// Boss name
        boss: String,
        /// Threat state name
        state: String,
    },

    /// A reachable (boss, state) pair has no catalog entry at all
    #[error("Missing pattern catalog for {boss} in state {state}")]
    Missing {
        /// Boss name
        boss: String,
        /// Threat state name
        state: String,
    },

    /// Concurrency range is empty or starts at zero
    #[error("Invalid concurrency range {min}..={max} for state {state}")]
    InvalidConcurrency {
        /// Threat state name
        state: String,
        /// Lower bound
        min: usize,
        /// Upper bound
        max: usize,
    },
}

/// Invalid encounter configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Unknown threat state key
    #[error("Unknown threat state: {0}")]
    UnknownThreatState(String),

    /// Threat table thresholds do not describe three ordered ranges
    #[error("Invalid threat thresholds: aggressive {aggressive}, unhinged {unhinged}")]
    InvalidThresholds {
        /// Lower bound of the aggressive range
        aggressive: f32,
        /// Lower bound of the unhinged range (upper bound is `aggressive`)
        unhinged: f32,
    },
}

/// Result type alias for Selva operations.
pub type SelvaResult<T> = Result<T, SelvaError>;
