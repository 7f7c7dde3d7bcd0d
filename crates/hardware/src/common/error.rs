//! Error types.
//!
//! [`ConfigError`] covers everything that can be wrong with a configuration
//! and is only produced while building a controller. [`SimError`] is the
//! run-time surface: internal timing violations, malformed requests and
//! trace input problems.

use thiserror::Error;

use super::command::Command;
use super::request::BankAddress;
use super::time::Time;

/// Rejected configuration. Reported once at construction and never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("memory type {0} is not supported")]
    UnsupportedMemoryType(String),

    #[error("memspec {spec}: missing parameter `{key}`")]
    MissingParameter { spec: String, key: String },

    #[error("memspec {spec}: parameter `{key}` is invalid: {reason}")]
    InvalidParameter {
        spec: String,
        key: String,
        reason: String,
    },

    #[error("memspec {spec}: inconsistent timing: {reason}")]
    InconsistentTiming { spec: String, reason: String },

    #[error("unsatisfiable timing: {0}")]
    UnsatisfiableTiming(String),

    #[error("refresh policy {policy} is not supported by {memory}")]
    UnsupportedRefreshPolicy { policy: String, memory: String },

    #[error("invalid controller configuration: {0}")]
    InvalidController(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run-time failure.
#[derive(Debug, Error)]
pub enum SimError {
    /// A command reached the issue stage outside its legal window. Always a
    /// scheduler bug.
    #[error("timing violation: {command} to {target} at {time} ps, earliest legal {earliest} ps")]
    TimingViolation {
        command: Command,
        target: BankAddress,
        time: Time,
        earliest: Time,
    },

    #[error("request {id} targets rank {rank} bank {bank} row {row}, outside the device")]
    InvalidRequest {
        id: u64,
        rank: usize,
        bank: usize,
        row: u32,
    },

    #[error("request {id} arrives at {arrival} ps, before the current time {now} ps")]
    LateRequest { id: u64, arrival: Time, now: Time },

    #[error("trace {path}:{line}: {reason}")]
    Trace {
        path: String,
        line: usize,
        reason: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
