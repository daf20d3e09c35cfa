//! Configuration type definitions
//!
//! Every section deserializes with defaults so partial files are valid.

use crate::process::TerminationPolicy;
use crate::registry::fingerprint::Signature;
use serde::{Deserialize, Serialize};
use snout_common::Protocol;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BTLE_EXECUTABLE: &str = "btle_rx";
pub const DEFAULT_ACCESS_ADDRESS: &str = "8e89bed6";
pub const DEFAULT_CRC_INIT: &str = "555555";
pub const DEFAULT_GAIN: u8 = 6;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capture {
    pub protocol: Protocol,
    pub channels: Vec<u8>,
    /// Wall-clock limit per channel.
    pub timeout_secs: u64,
    /// Packets per channel before moving on. `None` is unlimited.
    pub packet_threshold: Option<usize>,
    /// Raw capture lines are appended here when set.
    pub dump_file: Option<PathBuf>,
}

impl Capture {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Capture {
    fn default() -> Self {
        Self {
            protocol: Protocol::Btle,
            channels: vec![37],
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            packet_threshold: None,
            dump_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Btle {
    pub executable: String,
    pub gain: u8,
    pub access_address: String,
    pub crc_init: String,
}

impl Default for Btle {
    fn default() -> Self {
        Self {
            executable: DEFAULT_BTLE_EXECUTABLE.to_string(),
            gain: DEFAULT_GAIN,
            access_address: DEFAULT_ACCESS_ADDRESS.to_string(),
            crc_init: DEFAULT_CRC_INIT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Process {
    pub terminate_retries: u32,
    pub poll_interval_ms: u64,
}

impl Process {
    pub fn termination_policy(&self) -> TerminationPolicy {
        TerminationPolicy {
            retries: self.terminate_retries,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

impl Default for Process {
    fn default() -> Self {
        let policy = TerminationPolicy::default();
        Self {
            terminate_retries: policy.retries,
            poll_interval_ms: policy.poll_interval.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Output {
    pub verbose: bool,
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Runtime {
    pub config_file: Option<PathBuf>,
}

/// On-disk layout shared by the YAML, JSON and TOML loaders. Every field
/// is optional so a file only overrides the keys it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub capture: CaptureFile,
    pub btle: BtleFile,
    pub process: ProcessFile,
    pub output: OutputFile,
    /// Tool environment overlay.
    pub environment: BTreeMap<String, String>,
    /// Signatures tried before the built-in table.
    pub fingerprints: Vec<Signature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CaptureFile {
    pub protocol: Option<Protocol>,
    pub channels: Option<Vec<u8>>,
    pub timeout_secs: Option<u64>,
    pub packet_threshold: Option<usize>,
    pub dump_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BtleFile {
    pub executable: Option<String>,
    pub gain: Option<u8>,
    pub access_address: Option<String>,
    pub crc_init: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProcessFile {
    pub terminate_retries: Option<u32>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputFile {
    pub verbose: Option<bool>,
    pub report_path: Option<PathBuf>,
}
