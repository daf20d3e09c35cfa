use std::{fs::File, io::Write, path::Path};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use snout_common::Protocol;

use crate::registry::{DeviceRegistry, DeviceSummary};
use crate::scan::{ScanOutcome, StopReason};

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub metadata: ReportMetadata,
    pub channels: Vec<ChannelSummary>,
    pub devices: Vec<DeviceSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub duration_seconds: f64,
    pub protocol: Protocol,
    pub channels: Vec<u8>,
    pub total_packets: usize,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub channel: u8,
    pub packets: usize,
    pub stop_reason: String,
}

impl ScanReport {
    /// Devices that sent at least once, most recently seen first.
    pub fn new(outcome: &ScanOutcome, registry: &DeviceRegistry, started: DateTime<Utc>) -> Self {
        let channels: Vec<ChannelSummary> = outcome
            .channels
            .iter()
            .map(|c| ChannelSummary {
                channel: c.channel,
                packets: c.packets,
                stop_reason: stop_reason_text(c.stop_reason).to_string(),
            })
            .collect();

        Self {
            metadata: ReportMetadata {
                timestamp: started.to_rfc3339(),
                duration_seconds: outcome.elapsed.as_secs_f64(),
                protocol: outcome.protocol,
                channels: channels.iter().map(|c| c.channel).collect(),
                total_packets: outcome.total_packets(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            channels,
            devices: registry
                .recent_devices(outcome.protocol)
                .iter()
                .map(|d| d.summary())
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Wireless Scan Report\n\n");

        md.push_str("## Metadata\n\n");
        md.push_str(&format!("- **Timestamp**: {}\n", self.metadata.timestamp));
        md.push_str(&format!(
            "- **Duration**: {:.1} seconds\n",
            self.metadata.duration_seconds
        ));
        md.push_str(&format!("- **Protocol**: {}\n", self.metadata.protocol));
        md.push_str(&format!(
            "- **Channels**: {}\n",
            self.metadata
                .channels
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ));
        md.push_str(&format!(
            "- **Total Packets**: {}\n",
            self.metadata.total_packets
        ));
        md.push_str(&format!("- **Version**: {}\n\n", self.metadata.version));

        md.push_str("## Channels\n\n");
        md.push_str("| Channel | Packets | Stopped By |\n");
        md.push_str("|---------|---------|------------|\n");
        for channel in &self.channels {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                channel.channel, channel.packets, channel.stop_reason
            ));
        }
        md.push('\n');

        md.push_str("## Devices\n\n");
        if self.devices.is_empty() {
            md.push_str("No devices observed.\n");
            return md;
        }

        md.push_str("| Address | Last Seen | # | Up | Vendor | Model | OS | Info |\n");
        md.push_str("|---------|-----------|---|----|--------|-------|----|------|\n");
        for device in &self.devices {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                device.id,
                device.last_seen_nice,
                device.occurrences,
                device.uptime_nice,
                device.vendor,
                device.model,
                device.os,
                device.activity.replace('\n', "<br>")
            ));
        }

        let vulnerable: Vec<&DeviceSummary> = self
            .devices
            .iter()
            .filter(|d| d.vulnerabilities.values().any(|v| *v))
            .collect();
        if !vulnerable.is_empty() {
            md.push_str("\n## Vulnerable Devices\n\n");
            for device in vulnerable {
                let flags: Vec<&str> = device
                    .vulnerabilities
                    .iter()
                    .filter(|(_, v)| **v)
                    .map(|(k, _)| k.as_str())
                    .collect();
                md.push_str(&format!("- `{}`: {}\n", device.id, flags.join(", ")));
            }
        }

        md
    }

    /// Markdown for `.md` paths, JSON otherwise.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => self.to_markdown(),
            _ => self.to_json()?,
        };
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    pub fn print_summary(&self) {
        println!("\nScan Summary");
        println!("============");
        println!("Protocol: {}", self.metadata.protocol);
        println!("Duration: {:.1} seconds", self.metadata.duration_seconds);
        println!("Total Packets: {}", self.metadata.total_packets);
        println!("Devices: {}", self.devices.len());

        if self.devices.is_empty() {
            return;
        }
        println!(
            "\n{:<18} {:<16} {:>5} {:>8}  {:<24} {:<20} {:<12}",
            "Address", "Last Seen", "#", "Up", "Vendor", "Model", "OS"
        );
        for device in &self.devices {
            println!(
                "{:<18} {:<16} {:>5} {:>8}  {:<24} {:<20} {:<12}",
                device.id,
                device.last_seen_nice,
                device.occurrences,
                device.uptime_nice,
                device.vendor,
                device.model,
                device.os
            );
        }
    }
}

fn stop_reason_text(reason: StopReason) -> &'static str {
    match reason {
        StopReason::PacketThreshold => "packet threshold",
        StopReason::Timeout => "timeout",
        StopReason::Cancelled => "cancelled",
        StopReason::SourceExhausted => "end of capture",
    }
}
