//! Unified Configuration System
//!
//! Combines CLI arguments, configuration files (YAML, JSON or TOML) and
//! environment variables into one validated [`Configuration`].
//!
//! # Basic Usage
//!
//! ```rust
//! use snout::configuration::Configuration;
//!
//! let config = Configuration::builder()
//!     .from_cli_args(&["--protocol", "zigbee", "--channels", "11:13"])
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.capture.channels, vec![11, 12, 13]);
//! ```

pub mod builder;
pub mod types;
pub mod validation;

pub use builder::ConfigurationBuilder;
pub use types::*;

use crate::errors::{Result, SnoutError};
use crate::process::{overlay_process_environment, CommandSpec, TerminationPolicy};
use crate::registry::fingerprint::{Fingerprinter, Signature};
use snout_common::Protocol;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub capture: Capture,
    pub btle: Btle,
    pub process: Process,
    pub output: Output,
    pub environment: BTreeMap<String, String>,
    pub fingerprints: Vec<Signature>,
    pub runtime: Runtime,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_channels()?;
        self.validate_limits()?;
        self.validate_btle()?;
        self.validate_process()?;
        self.validate_fingerprints()?;
        Ok(())
    }

    pub fn protocol(&self) -> Protocol {
        self.capture.protocol
    }

    pub fn is_verbose(&self) -> bool {
        self.output.verbose
    }

    pub fn termination_policy(&self) -> TerminationPolicy {
        self.process.termination_policy()
    }

    /// Built-in fingerprint table extended with the configured signatures.
    pub fn fingerprinter(&self) -> Fingerprinter {
        Fingerprinter::with_extra(self.fingerprints.clone())
    }

    /// `btle_rx -c <ch> -g <gain> -a <access address> -k <crc init>`
    pub fn btle_command(&self, channel: u8) -> CommandSpec {
        CommandSpec::new(&self.btle.executable)
            .option("-c", channel)
            .option("-g", self.btle.gain)
            .option("-a", &self.btle.access_address)
            .option("-k", &self.btle.crc_init)
            .envs(overlay_process_environment(&self.environment))
    }
}

/// Channel used when none is configured for `protocol`.
pub fn default_channel(protocol: Protocol) -> u8 {
    match protocol {
        Protocol::Btle => 37,
        Protocol::Wifi => 6,
        Protocol::Zigbee => 11,
        Protocol::Zwave => 1,
    }
}

/// Parses `37`, `11:26` (inclusive), `[11,12,13]`, `11,12` or `all`.
pub fn parse_channels(protocol: Protocol, spec: &str) -> Result<Vec<u8>> {
    let spec = spec.trim();
    let (low, high) = protocol.channel_range();
    let invalid = |message: String| SnoutError::ConfigError { message };
    let parse_one = |token: &str| -> Result<u8> {
        token
            .trim()
            .parse::<u8>()
            .map_err(|_| invalid(format!("Invalid channel: {token}")))
    };

    if spec.eq_ignore_ascii_case("all") {
        return Ok((low..=high).collect());
    }

    if let Some((start, end)) = spec.split_once(':') {
        let (start, end) = (parse_one(start)?, parse_one(end)?);
        if start > end {
            return Err(invalid(format!("Empty channel range: {spec}")));
        }
        return Ok((start..=end).collect());
    }

    let list = spec.trim_start_matches('[').trim_end_matches(']');
    list.split(',')
        .filter(|token| !token.trim().is_empty())
        .map(parse_one)
        .collect()
}
