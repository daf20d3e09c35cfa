//! Apple continuity manufacturer data
//!
//! The company payload is a second TLV stream: one type byte, one length
//! byte, then `length` bytes of record data.

use serde::ser::{Serialize, SerializeMap, Serializer};
use snout_common::apple::{nearby_action_text, AppleRecordKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    On,
    Off,
}

impl WifiState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WifiState::On => "On",
            WifiState::Off => "Off",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearbyInfo {
    pub location_sharing: u8,
    pub action_code: u8,
    pub action_code_text: &'static str,
    pub ios_version_hint: Option<&'static str>,
    pub wifi: Option<WifiState>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppleRecord {
    /// A known record type whose body is not decoded further, or whose
    /// body is too short for its decoder.
    Plain(AppleRecordKind),
    Handoff {
        clipboard_status: u8,
        sequence_number: Option<u16>,
    },
    WifiSettings {
        icloud_id: String,
    },
    InstantHotspot {
        battery_life: Option<u8>,
        cell_service: Option<u8>,
        cell_bars: Option<u8>,
    },
    WifiJoinNetwork {
        data: String,
    },
    Nearby(NearbyInfo),
    Unknown {
        type_code: u8,
        data: String,
    },
}

impl AppleRecord {
    pub fn kind(&self) -> Option<AppleRecordKind> {
        match self {
            AppleRecord::Plain(kind) => Some(*kind),
            AppleRecord::Handoff { .. } => Some(AppleRecordKind::Handoff),
            AppleRecord::WifiSettings { .. } => Some(AppleRecordKind::WifiSettings),
            AppleRecord::InstantHotspot { .. } => Some(AppleRecordKind::InstantHotspot),
            AppleRecord::WifiJoinNetwork { .. } => Some(AppleRecordKind::WifiJoinNetwork),
            AppleRecord::Nearby(_) => Some(AppleRecordKind::Nearby),
            AppleRecord::Unknown { .. } => None,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            AppleRecord::Unknown { type_code, .. } => format!("{:#x}", type_code),
            other => other
                .kind()
                .map(|k| k.name().to_string())
                .unwrap_or_default(),
        }
    }

    pub fn nearby(&self) -> Option<&NearbyInfo> {
        match self {
            AppleRecord::Nearby(info) => Some(info),
            _ => None,
        }
    }

    fn decode(type_code: u8, data: &[u8]) -> Self {
        let Some(kind) = AppleRecordKind::from_code(type_code) else {
            return AppleRecord::Unknown {
                type_code,
                data: hex::encode(data),
            };
        };

        match kind {
            AppleRecordKind::Handoff => match data.first() {
                Some(&clipboard_status) => AppleRecord::Handoff {
                    clipboard_status,
                    sequence_number: snout_common::read_u16_le(&data[1..]),
                },
                None => AppleRecord::Plain(kind),
            },
            AppleRecordKind::WifiSettings => AppleRecord::WifiSettings {
                icloud_id: hex::encode(data.get(2..).unwrap_or_default()),
            },
            AppleRecordKind::InstantHotspot => AppleRecord::InstantHotspot {
                battery_life: data.get(4).copied(),
                cell_service: data.get(6).copied(),
                cell_bars: data.get(7).copied(),
            },
            AppleRecordKind::WifiJoinNetwork => AppleRecord::WifiJoinNetwork {
                data: hex::encode(data),
            },
            AppleRecordKind::Nearby => match data.split_first() {
                Some((&status, rest)) => AppleRecord::Nearby(decode_nearby(status, rest)),
                None => AppleRecord::Plain(kind),
            },
            _ => AppleRecord::Plain(kind),
        }
    }
}

fn decode_nearby(status: u8, rest: &[u8]) -> NearbyInfo {
    let action_code = status & 0x0f;
    let mut info = NearbyInfo {
        location_sharing: status >> 4,
        action_code,
        action_code_text: nearby_action_text(action_code),
        ios_version_hint: None,
        wifi: None,
        data: None,
    };

    match rest {
        [0x00] => info.ios_version_hint = Some("10"),
        [lead, tail @ ..] if rest.len() == 4 => {
            info.data = Some(hex::encode(tail));
            match lead {
                0x10 => info.ios_version_hint = Some("11"),
                0x18 | 0x1c => {
                    info.ios_version_hint = Some("12");
                    info.wifi = Some(if *lead == 0x1c {
                        WifiState::On
                    } else {
                        WifiState::Off
                    });
                }
                _ => {}
            }
        }
        _ => {}
    }

    info
}

/// Decodes an Apple company payload. A trailing record whose declared
/// length runs past the buffer is dropped.
pub fn parse_apple_records(payload: &[u8]) -> Vec<AppleRecord> {
    let mut records = Vec::new();
    let mut rest = payload;

    while let [type_code, len, body @ ..] = rest {
        let len = *len as usize;
        if len > body.len() {
            break;
        }
        records.push(AppleRecord::decode(*type_code, &body[..len]));
        rest = &body[len..];
    }

    records
}

impl Serialize for AppleRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &self.type_name())?;
        match self {
            AppleRecord::Plain(_) => {}
            AppleRecord::Handoff {
                clipboard_status,
                sequence_number,
            } => {
                map.serialize_entry("Clipboard Status", clipboard_status)?;
                if let Some(seq) = sequence_number {
                    map.serialize_entry("Sequence Number", seq)?;
                }
            }
            AppleRecord::WifiSettings { icloud_id } => {
                map.serialize_entry("iCloud ID", icloud_id)?;
            }
            AppleRecord::InstantHotspot {
                battery_life,
                cell_service,
                cell_bars,
            } => {
                let fields = [
                    ("Battery Life", battery_life),
                    ("Cell Service", cell_service),
                    ("Cell Bars", cell_bars),
                ];
                for (key, value) in fields {
                    if let Some(value) = value {
                        map.serialize_entry(key, value)?;
                    }
                }
            }
            AppleRecord::WifiJoinNetwork { data } | AppleRecord::Unknown { data, .. } => {
                map.serialize_entry("data", data)?;
            }
            AppleRecord::Nearby(info) => {
                map.serialize_entry("Location Sharing", &info.location_sharing)?;
                map.serialize_entry("Action Code", &info.action_code)?;
                map.serialize_entry("Action Code Text", info.action_code_text)?;
                if let Some(data) = &info.data {
                    map.serialize_entry("Data", data)?;
                }
                if let Some(hint) = info.ios_version_hint {
                    map.serialize_entry("iOS Version Hint", hint)?;
                }
                if let Some(wifi) = info.wifi {
                    map.serialize_entry("Wi-Fi", wifi.as_str())?;
                }
            }
        }
        map.end()
    }
}
