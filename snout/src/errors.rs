//! Error types for snout
//!
//! Per-line decode failures are reported as [`SnoutError::MalformedFrame`]
//! and are expected to be swallowed by capture loops. Everything else
//! signals a programming or environment problem and is propagated.

use snout_common::Protocol;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnoutError {
    #[error("Malformed frame: {reason}")]
    MalformedFrame { reason: String },

    #[error("Unknown protocol: {protocol}. Valid protocols: {valid_protocols:?}")]
    UnknownProtocol {
        protocol: String,
        valid_protocols: Vec<String>,
    },

    #[error("Duplicate {protocol} device {id}, already registered as {existing}")]
    DuplicateDevice {
        protocol: Protocol,
        id: String,
        existing: String,
    },

    #[error("Failed to launch {command}: {source}")]
    LaunchError {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Process {pid} still alive after {attempts} termination attempts")]
    TerminationTimeout { pid: u32, attempts: u32 },

    #[error("Process not running: {command}")]
    ProcessNotRunning { command: String },

    #[error("Process already running with pid {pid}")]
    ProcessAlreadyRunning { pid: u32 },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SnoutError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        SnoutError::MalformedFrame {
            reason: reason.into(),
        }
    }

    pub fn unknown_protocol(token: &str) -> Self {
        SnoutError::UnknownProtocol {
            protocol: token.to_string(),
            valid_protocols: Protocol::ALL
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
        }
    }
}

/// Parses a protocol token, reporting the accepted set on failure.
pub fn parse_protocol(token: &str) -> Result<Protocol> {
    token
        .parse::<Protocol>()
        .map_err(|_| SnoutError::unknown_protocol(token))
}

pub type Result<T> = std::result::Result<T, SnoutError>;
