//! Configuration Builder
//!
//! Provides a builder pattern for constructing Configuration instances
//! from multiple sources with proper validation. Later sources override
//! earlier ones.

use super::{
    default_channel, parse_channels, Btle, Capture, Configuration, FileConfig, Output, Process,
    Runtime,
};
use crate::errors::{parse_protocol, Result, SnoutError};
use crate::registry::fingerprint::Signature;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_BTLE_EXECUTABLE: &str = "SNOUT_BTLE_RX";
pub const ENV_TIMEOUT: &str = "SNOUT_TIMEOUT";

#[derive(Debug)]
pub struct ConfigurationBuilder {
    capture: Capture,
    btle: Btle,
    process: Process,
    output: Output,
    environment: BTreeMap<String, String>,
    fingerprints: Vec<Signature>,
    runtime: Runtime,
    /// Channel list as typed on the command line, resolved against the
    /// final protocol in `build`.
    channel_spec: Option<String>,
    channels_explicit: bool,
}

fn config_error(message: impl Into<String>) -> SnoutError {
    SnoutError::ConfigError {
        message: message.into(),
    }
}

fn missing_value(flag: &str) -> SnoutError {
    config_error(format!("Missing value for {flag}"))
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| config_error(format!("Invalid value for {flag}: {value}")))
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            capture: Capture::default(),
            btle: Btle::default(),
            process: Process::default(),
            output: Output::default(),
            environment: BTreeMap::new(),
            fingerprints: Vec::new(),
            runtime: Runtime::default(),
            channel_spec: None,
            channels_explicit: false,
        }
    }

    /// Configure from CLI arguments (slice format for testing)
    pub fn from_cli_args(mut self, args: &[&str]) -> Result<Self> {
        let mut i = 0;
        while i < args.len() {
            let flag = args[i];
            let value = args.get(i + 1).copied();
            let takes_value = match flag {
                "--protocol" | "-p" => {
                    let value = value.ok_or_else(|| missing_value(flag))?;
                    self.capture.protocol = parse_protocol(value)?;
                    true
                }
                "--channels" | "-c" => {
                    let value = value.ok_or_else(|| missing_value(flag))?;
                    self.channel_spec = Some(value.to_string());
                    true
                }
                "--timeout" | "-t" => {
                    let value = value.ok_or_else(|| missing_value(flag))?;
                    self.capture.timeout_secs = parse_number(flag, value)?;
                    true
                }
                "--num" | "-n" => {
                    let value = value.ok_or_else(|| missing_value(flag))?;
                    self.capture.packet_threshold = Some(parse_number(flag, value)?);
                    true
                }
                "--dump" | "-d" => {
                    let value = value.ok_or_else(|| missing_value(flag))?;
                    self.capture.dump_file = Some(PathBuf::from(value));
                    true
                }
                "--executable" => {
                    let value = value.ok_or_else(|| missing_value(flag))?;
                    self.btle.executable = value.to_string();
                    true
                }
                "--gain" | "-g" => {
                    let value = value.ok_or_else(|| missing_value(flag))?;
                    self.btle.gain = parse_number(flag, value)?;
                    true
                }
                "--access-address" | "-a" => {
                    let value = value.ok_or_else(|| missing_value(flag))?;
                    self.btle.access_address = value.to_lowercase();
                    true
                }
                "--crc-init" | "-k" => {
                    let value = value.ok_or_else(|| missing_value(flag))?;
                    self.btle.crc_init = value.to_lowercase();
                    true
                }
                "--report" | "-o" => {
                    let value = value.ok_or_else(|| missing_value(flag))?;
                    self.output.report_path = Some(PathBuf::from(value));
                    true
                }
                "--verbose" | "-v" => {
                    self.output.verbose = true;
                    false
                }
                _ => false, // Skip unknown arguments
            };
            i += if takes_value { 2 } else { 1 };
        }

        Ok(self)
    }

    /// Configure from a YAML, JSON or TOML file. JSON is detected by
    /// extension or a leading `{`, TOML by extension, YAML otherwise.
    pub fn from_config_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            config_error(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let extension = path.extension().and_then(|s| s.to_str());
        let mut builder = if extension == Some("json") || content.trim_start().starts_with('{') {
            self.from_json_str(&content)?
        } else if extension == Some("toml") {
            self.from_toml_str(&content)?
        } else {
            self.from_yaml_str(&content)?
        };

        builder.runtime.config_file = Some(path.to_path_buf());
        Ok(builder)
    }

    pub fn from_yaml_str(self, yaml: &str) -> Result<Self> {
        let config: FileConfig = serde_yaml::from_str(yaml)
            .map_err(|e| config_error(format!("Failed to parse YAML config: {e}")))?;
        Ok(self.merge_file(config))
    }

    pub fn from_json_str(self, json: &str) -> Result<Self> {
        let config: FileConfig = serde_json::from_str(json)
            .map_err(|e| config_error(format!("Failed to parse JSON config: {e}")))?;
        Ok(self.merge_file(config))
    }

    pub fn from_toml_str(self, toml: &str) -> Result<Self> {
        let config: FileConfig = toml::from_str(toml)
            .map_err(|e| config_error(format!("Failed to parse TOML config: {e}")))?;
        Ok(self.merge_file(config))
    }

    /// Reads `SNOUT_BTLE_RX` and `SNOUT_TIMEOUT`.
    pub fn from_environment(self) -> Result<Self> {
        self.from_env_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_env_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(executable) = lookup(ENV_BTLE_EXECUTABLE).filter(|v| !v.trim().is_empty()) {
            self.btle.executable = executable;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            self.capture.timeout_secs = parse_number(ENV_TIMEOUT, timeout.trim())?;
        }
        Ok(self)
    }

    pub fn build(mut self) -> Result<Configuration> {
        if let Some(spec) = self.channel_spec.take() {
            self.capture.channels = parse_channels(self.capture.protocol, &spec)?;
        } else if !self.channels_explicit {
            self.capture.channels = vec![default_channel(self.capture.protocol)];
        }

        let config = Configuration {
            capture: self.capture,
            btle: self.btle,
            process: self.process,
            output: self.output,
            environment: self.environment,
            fingerprints: self.fingerprints,
            runtime: self.runtime,
        };

        config.validate()?;
        Ok(config)
    }

    fn merge_file(mut self, config: FileConfig) -> Self {
        let FileConfig {
            capture,
            btle,
            process,
            output,
            environment,
            fingerprints,
        } = config;

        if let Some(protocol) = capture.protocol {
            self.capture.protocol = protocol;
        }
        if let Some(channels) = capture.channels {
            self.capture.channels = channels;
            self.channels_explicit = true;
        }
        if let Some(timeout_secs) = capture.timeout_secs {
            self.capture.timeout_secs = timeout_secs;
        }
        if capture.packet_threshold.is_some() {
            self.capture.packet_threshold = capture.packet_threshold;
        }
        if capture.dump_file.is_some() {
            self.capture.dump_file = capture.dump_file;
        }

        if let Some(executable) = btle.executable {
            self.btle.executable = executable;
        }
        if let Some(gain) = btle.gain {
            self.btle.gain = gain;
        }
        if let Some(access_address) = btle.access_address {
            self.btle.access_address = access_address.to_lowercase();
        }
        if let Some(crc_init) = btle.crc_init {
            self.btle.crc_init = crc_init.to_lowercase();
        }

        if let Some(retries) = process.terminate_retries {
            self.process.terminate_retries = retries;
        }
        if let Some(poll_interval_ms) = process.poll_interval_ms {
            self.process.poll_interval_ms = poll_interval_ms;
        }

        if let Some(verbose) = output.verbose {
            self.output.verbose = verbose;
        }
        if output.report_path.is_some() {
            self.output.report_path = output.report_path;
        }

        self.environment.extend(environment);
        self.fingerprints.extend(fingerprints);
        self
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use snout_common::Protocol;
    use std::collections::HashMap;

    mod cli_tests {
        use super::*;

        #[test]
        fn should_parse_capture_flags() {
            let config = Configuration::builder()
                .from_cli_args(&[
                    "--protocol", "btle", "-c", "37:39", "-t", "5", "-n", "20", "-v",
                ])
                .unwrap()
                .build()
                .unwrap();

            assert_eq!(config.capture.protocol, Protocol::Btle);
            assert_eq!(config.capture.channels, vec![37, 38, 39]);
            assert_eq!(config.capture.timeout_secs, 5);
            assert_eq!(config.capture.packet_threshold, Some(20));
            assert!(config.is_verbose());
        }

        #[test]
        fn should_resolve_channels_against_final_protocol() {
            let config = Configuration::builder()
                .from_cli_args(&["-c", "all", "-p", "zigbee"])
                .unwrap()
                .build()
                .unwrap();

            assert_eq!(config.capture.channels.len(), 16);
        }

        #[test]
        fn should_default_channel_to_protocol() {
            let config = Configuration::builder()
                .from_cli_args(&["-p", "zigbee"])
                .unwrap()
                .build()
                .unwrap();

            assert_eq!(config.capture.channels, vec![11]);
        }

        #[test]
        fn should_reject_unknown_protocol() {
            let result = Configuration::builder().from_cli_args(&["--protocol", "lora"]);
            assert_matches!(result, Err(SnoutError::UnknownProtocol { .. }));
        }

        #[test]
        fn should_report_missing_value() {
            let result = Configuration::builder().from_cli_args(&["--timeout"]);
            assert_matches!(
                result,
                Err(SnoutError::ConfigError { message }) if message.contains("--timeout")
            );
        }
    }

    mod file_tests {
        use super::*;

        #[test]
        fn should_load_yaml_sections() {
            let yaml = r#"
capture:
  protocol: zigbee
  channels: [15, 20]
  timeout_secs: 3
btle:
  gain: 10
environment:
  PATH: /opt/sdr/bin
"#;
            let config = Configuration::builder()
                .from_yaml_str(yaml)
                .unwrap()
                .build()
                .unwrap();

            assert_eq!(config.capture.protocol, Protocol::Zigbee);
            assert_eq!(config.capture.channels, vec![15, 20]);
            assert_eq!(config.capture.timeout_secs, 3);
            assert_eq!(config.btle.gain, 10);
            assert_eq!(config.btle.executable, "btle_rx");
            assert_eq!(config.environment["PATH"], "/opt/sdr/bin");
        }

        #[test]
        fn should_load_json_and_toml() {
            let json = r#"{"capture": {"channels": [38], "packet_threshold": 4}}"#;
            let config = Configuration::builder()
                .from_json_str(json)
                .unwrap()
                .build()
                .unwrap();
            assert_eq!(config.capture.channels, vec![38]);
            assert_eq!(config.capture.packet_threshold, Some(4));

            let toml = "[process]\nterminate_retries = 3\npoll_interval_ms = 20\n";
            let config = Configuration::builder()
                .from_toml_str(toml)
                .unwrap()
                .build()
                .unwrap();
            assert_eq!(config.termination_policy().retries, 3);
        }

        #[test]
        fn should_let_cli_override_file() {
            let config = Configuration::builder()
                .from_yaml_str("capture:\n  channels: [37]\n")
                .unwrap()
                .from_cli_args(&["-c", "39"])
                .unwrap()
                .build()
                .unwrap();

            assert_eq!(config.capture.channels, vec![39]);
        }

        #[test]
        fn should_default_channel_for_file_protocol() {
            let config = Configuration::builder()
                .from_yaml_str("capture:\n  protocol: zigbee\n")
                .unwrap()
                .build()
                .unwrap();

            assert_eq!(config.capture.channels, vec![11]);
        }

        #[test]
        fn should_keep_builder_values_for_absent_keys() {
            let config = Configuration::builder()
                .from_cli_args(&["--gain", "12", "-t", "4"])
                .unwrap()
                .from_yaml_str("btle:\n  executable: /opt/sdr/bin/btle_rx\n")
                .unwrap()
                .build()
                .unwrap();

            assert_eq!(config.btle.gain, 12);
            assert_eq!(config.capture.timeout_secs, 4);
            assert_eq!(config.btle.executable, "/opt/sdr/bin/btle_rx");
        }

        #[test]
        fn should_reject_invalid_yaml() {
            let result = Configuration::builder().from_yaml_str("capture: [unclosed");
            assert_matches!(result, Err(SnoutError::ConfigError { .. }));
        }
    }

    mod environment_tests {
        use super::*;

        fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
            let vars: HashMap<String, String> = vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            move |key| vars.get(key).cloned()
        }

        #[test]
        fn should_read_executable_and_timeout() {
            let config = Configuration::builder()
                .from_env_lookup(lookup(&[
                    (ENV_BTLE_EXECUTABLE, "/opt/sdr/bin/btle_rx"),
                    (ENV_TIMEOUT, "42"),
                ]))
                .unwrap()
                .build()
                .unwrap();

            assert_eq!(config.btle.executable, "/opt/sdr/bin/btle_rx");
            assert_eq!(config.capture.timeout_secs, 42);
        }

        #[test]
        fn should_reject_non_numeric_timeout() {
            let result = Configuration::builder().from_env_lookup(lookup(&[(ENV_TIMEOUT, "soon")]));
            assert_matches!(result, Err(SnoutError::ConfigError { .. }));
        }
    }
}
