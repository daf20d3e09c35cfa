use clap::Parser;
use snout_common::Protocol;
use std::path::PathBuf;

pub mod configuration;
pub mod decoding;
pub mod errors;
pub mod message;
pub mod process;
pub mod radio;
pub mod registry;
pub mod report;
pub mod scan;

pub use configuration::Configuration;
pub use errors::{Result, SnoutError};
pub use message::{Message, MessageBuilder, Payload};
pub use registry::{Device, DeviceRegistry};
pub use report::ScanReport;
pub use scan::{CancelFlag, ScanDriver, ScanOutcome};

#[derive(Debug, Clone, Parser)]
#[clap(name = "snout", about = "Short-range wireless capture and device fingerprinting")]
pub struct Args {
    #[clap(short, long, help = "Protocol to scan (btle, zigbee)")]
    pub protocol: Option<String>,

    #[clap(
        short,
        long,
        help = "Channels: single (37), inclusive range (37:39), list ([37,39]) or all"
    )]
    pub channels: Option<String>,

    #[clap(short, long, help = "Timeout per channel in seconds")]
    pub timeout: Option<u64>,

    #[clap(short, long, help = "Packet threshold per channel")]
    pub num: Option<usize>,

    #[clap(short, long, help = "Dump decoded capture lines to this file")]
    pub dump: Option<PathBuf>,

    #[clap(long, help = "Capture executable for BTLE")]
    pub executable: Option<String>,

    #[clap(long, help = "Replay hex encoded Zigbee frames from this file")]
    pub replay: Option<PathBuf>,

    #[clap(long, help = "Replayed Zigbee frames end with an FCS")]
    pub fcs: bool,

    #[clap(short = 'o', long, help = "Write the scan report (.json or .md)")]
    pub report: Option<PathBuf>,

    #[clap(short, long, help = "Show verbose output")]
    pub verbose: bool,

    #[clap(long, help = "Configuration file path")]
    pub config: Option<String>,
}

impl Args {
    pub fn validate(&self) -> std::result::Result<(), String> {
        let protocol = match &self.protocol {
            Some(token) => errors::parse_protocol(token).map_err(|e| e.to_string())?,
            None => return Ok(()),
        };
        match protocol {
            Protocol::Btle => Ok(()),
            Protocol::Zigbee if self.replay.is_none() => {
                Err("Zigbee capture needs a frame source, pass --replay".to_string())
            }
            Protocol::Zigbee => Ok(()),
            other => Err(format!("Scanning {other} is not supported")),
        }
    }

    /// Flags in the form understood by
    /// [`ConfigurationBuilder::from_cli_args`](configuration::ConfigurationBuilder::from_cli_args).
    pub fn builder_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut push = |flag: &str, value: Option<String>| {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value);
            }
        };
        push("--protocol", self.protocol.clone());
        push("--channels", self.channels.clone());
        push("--timeout", self.timeout.map(|t| t.to_string()));
        push("--num", self.num.map(|n| n.to_string()));
        push("--dump", self.dump.as_ref().map(|p| p.display().to_string()));
        push("--executable", self.executable.clone());
        push("--report", self.report.as_ref().map(|p| p.display().to_string()));
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args
    }

    /// Config file, then environment, then command line.
    pub fn configuration(&self) -> Result<Configuration> {
        let mut builder = Configuration::builder();
        if let Some(path) = &self.config {
            builder = builder.from_config_file(path)?;
        }
        let args = self.builder_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        builder.from_environment()?.from_cli_args(&args)?.build()
    }
}
