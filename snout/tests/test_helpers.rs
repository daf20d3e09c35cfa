//! Test utilities shared by the integration tests
//!
//! Builders produce capture input the way the real tools emit it, so tests
//! read as "given this line, expect that device".

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// The advertisement used throughout: an iPhone sending a Nearby record
/// with the iOS 12 hint on channel 37.
pub const SAMPLE_LINE: &str = "1567108496.651985 Pkt8 Ch37 AA:8e89bed6 ADV_PDU_t0:ADV_IND T1 R0 PloadL20 AdvA:6385725ebfcd Data:0201060aff4c001005011c569415 CRC0";

/// Builder for `btle_rx` output lines with a fluent API
pub struct CaptureLineBuilder {
    timestamp: f64,
    number: u32,
    channel: u8,
    pdu: &'static str,
    sender: String,
    data: String,
    crc_ok: bool,
}

impl CaptureLineBuilder {
    pub fn new() -> Self {
        Self {
            timestamp: 1567108496.651985,
            number: 1,
            channel: 37,
            pdu: "ADV_IND",
            sender: "aabbccddeeff".to_string(),
            data: "020106".to_string(),
            crc_ok: true,
        }
    }

    pub fn timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn number(mut self, number: u32) -> Self {
        self.number = number;
        self
    }

    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn sender(mut self, sender: &str) -> Self {
        self.sender = sender.to_string();
        self
    }

    pub fn data(mut self, data: &str) -> Self {
        self.data = data.to_string();
        self
    }

    pub fn bad_crc(mut self) -> Self {
        self.crc_ok = false;
        self
    }

    pub fn build(self) -> String {
        format!(
            "{:.6} Pkt{} Ch{} AA:8e89bed6 ADV_PDU_t0:{} T1 R0 PloadL{} AdvA:{} Data:{} CRC{}",
            self.timestamp,
            self.number,
            self.channel,
            self.pdu,
            6 + self.data.len() / 2,
            self.sender,
            self.data,
            if self.crc_ok { 0 } else { 1 }
        )
    }
}

impl Default for CaptureLineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Common advertising payloads with descriptive names
pub mod payloads {
    /// Flags plus Apple Nearby, action 0x1c, iOS 12 hint.
    pub const IPHONE_NEARBY: &str = "0201060aff4c001005011c569415";
    /// Apple AirPods record.
    pub const AIRPODS: &str = "05ff4c000700";
    /// Microsoft beacon.
    pub const WINDOWS: &str = "05ff06000109";
    /// Incomplete 128-bit UUID list with the FitBit service.
    pub const FITBIT: &str = "1106ba5689a6fabfa2bd01467d6e00fbabad";
    /// Nordic Semiconductor manufacturer data.
    pub const NORDIC: &str = "05ff59000102";
}

/// Zigbee MAC frames
pub mod frames {
    /// Data frame 0x0001 -> 0xffff on PAN 0x1a62, seq 0x2a.
    pub const SHORT_DATA: [u8; 9] = [0x41, 0x88, 0x2a, 0x62, 0x1a, 0xff, 0xff, 0x01, 0x00];

    pub fn zll_scan_response() -> Vec<u8> {
        let mut frame = vec![
            0x01, 0xc8, 0x07, 0xff, 0xff, 0xff, 0xff, 0x62, 0x1a, 0x08, 0x07, 0x06, 0x05, 0x04,
            0x03, 0x02, 0x01,
        ];
        frame.extend_from_slice(&[0x0b, 0x00, 0x0b, 0x00, 0x10, 0x5e, 0xc0, 0x19, 0x01, 0x01]);
        frame
    }
}

/// Writes an executable shell script standing in for a capture tool.
/// The script receives the same arguments as the real tool.
pub fn fake_capture_tool(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake_btle_rx");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut permissions = fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_line_in_capture_format() {
        let line = CaptureLineBuilder::new()
            .number(8)
            .sender("6385725ebfcd")
            .data(payloads::IPHONE_NEARBY)
            .build();

        assert_eq!(line, SAMPLE_LINE);
    }
}
