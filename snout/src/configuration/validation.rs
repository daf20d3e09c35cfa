//! Configuration validation logic

use super::Configuration;
use crate::errors::{Result, SnoutError};

fn config_error(message: impl Into<String>) -> SnoutError {
    SnoutError::ConfigError {
        message: message.into(),
    }
}

impl Configuration {
    /// Channels must be non-empty and inside the protocol's band plan.
    pub fn validate_channels(&self) -> Result<()> {
        let protocol = self.capture.protocol;
        if self.capture.channels.is_empty() {
            return Err(config_error("At least one channel must be specified"));
        }
        if let Some(bad) = self
            .capture
            .channels
            .iter()
            .find(|ch| !protocol.is_valid_channel(**ch))
        {
            let (low, high) = protocol.channel_range();
            return Err(config_error(format!(
                "Channel {bad} is outside the {protocol} range [{low}, {high}]"
            )));
        }
        Ok(())
    }

    pub fn validate_limits(&self) -> Result<()> {
        if self.capture.timeout_secs == 0 {
            return Err(config_error("Timeout must be greater than zero"));
        }
        if self.capture.packet_threshold == Some(0) {
            return Err(config_error("Packet threshold must be greater than zero"));
        }
        Ok(())
    }

    pub fn validate_btle(&self) -> Result<()> {
        let address = &self.btle.access_address;
        if address.len() != 8 || !address.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(config_error(format!(
                "Access address must be 8 hex digits, got {address:?}"
            )));
        }
        if self.btle.executable.trim().is_empty() {
            return Err(config_error("Capture executable must not be empty"));
        }
        Ok(())
    }

    pub fn validate_process(&self) -> Result<()> {
        if self.process.terminate_retries == 0 {
            return Err(config_error("Terminate retries must be greater than zero"));
        }
        if self.process.poll_interval_ms == 0 {
            return Err(config_error("Poll interval must be greater than zero"));
        }
        Ok(())
    }

    pub fn validate_fingerprints(&self) -> Result<()> {
        match self
            .fingerprints
            .iter()
            .find(|s| s.requires_label() && s.label.is_none())
        {
            Some(signature) => Err(config_error(format!(
                "Fingerprint {:?} for {:?} needs a label",
                signature.matcher, signature.target
            ))),
            None => Ok(()),
        }
    }
}
