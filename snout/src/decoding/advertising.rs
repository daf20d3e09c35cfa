//! Advertising-Data (AD) structure parsing
//!
//! A BTLE advertising payload is a flat run of `length | type | data`
//! structures. Each structure is dispatched on its [`AdType`]; anything the
//! parser does not understand is preserved as raw hex.

use super::apple::{parse_apple_records, AppleRecord};
use crate::errors::{Result, SnoutError};
use serde::Serialize;
use snout_common::ad_types::{
    AdType, ADVERTISING_FLAGS, OOB_DATA_ABSENT, OOB_DATA_PRESENT, OOB_LE_SUPPORTED,
    OOB_PUBLIC_ADDRESS, OOB_RANDOM_ADDRESS, OOB_SIMULTANEOUS_HOST,
};
use snout_common::apple::{APPLE_COMPANY_ID, MICROSOFT_COMPANY_ID};
use snout_common::company_ids::company_name_or_unknown;
use snout_common::read_u16_le;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceData {
    pub uuid: u16,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ManufacturerRecords {
    Apple(Vec<AppleRecord>),
    /// Microsoft beacons are kept as hex only.
    Microsoft(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManufacturerData {
    pub company_id: u16,
    pub company_name: &'static str,
    #[serde(rename = "company_raw")]
    pub raw_hex: String,
    #[serde(rename = "manufacturer-specific", skip_serializing_if = "Option::is_none")]
    pub records: Option<ManufacturerRecords>,
}

impl ManufacturerData {
    fn parse(company_id: u16, body: &[u8]) -> Self {
        let records = match company_id {
            APPLE_COMPANY_ID => Some(ManufacturerRecords::Apple(parse_apple_records(body))),
            MICROSOFT_COMPANY_ID => Some(ManufacturerRecords::Microsoft(hex::encode(body))),
            _ => None,
        };

        Self {
            company_id,
            company_name: company_name_or_unknown(company_id),
            raw_hex: hex::encode(body),
            records,
        }
    }

    pub fn apple_records(&self) -> &[AppleRecord] {
        match &self.records {
            Some(ManufacturerRecords::Apple(records)) => records,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownStructure {
    #[serde(rename = "type")]
    pub ad_type: u8,
    pub hex: String,
}

/// Decoded advertising payload keyed by semantic field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdvertisingPayload {
    #[serde(rename = "hex")]
    pub raw_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<&'static str>>,
    #[serde(rename = "sec-mg-oob-flags", skip_serializing_if = "Option::is_none")]
    pub oob_flags: Option<Vec<&'static str>>,
    #[serde(rename = "service-data", skip_serializing_if = "Option::is_none")]
    pub service_data: Option<ServiceData>,
    #[serde(
        rename = "Incomplete List of 128-bit Service Class UUIDs",
        skip_serializing_if = "Option::is_none"
    )]
    pub incomplete_uuids_128: Option<String>,
    #[serde(rename = "local-name", skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    #[serde(flatten)]
    pub manufacturer: Option<ManufacturerData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown: Vec<UnknownStructure>,
}

impl AdvertisingPayload {
    pub fn parse(buf: &[u8]) -> Self {
        let mut payload = AdvertisingPayload {
            raw_hex: hex::encode(buf),
            ..Default::default()
        };

        for (code, data) in AdStructures::new(buf) {
            payload.apply(AdType::from_code(code), data);
        }

        payload
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| SnoutError::malformed(format!("payload is not hex: {e}")))?;
        Ok(Self::parse(&bytes))
    }

    fn apply(&mut self, ad_type: AdType, data: &[u8]) {
        match ad_type {
            AdType::Flags if !data.is_empty() => {
                self.flags = Some(decode_flags(data[0]));
            }
            AdType::SecurityManagerOobFlags if !data.is_empty() => {
                self.oob_flags = Some(decode_oob_flags(data[0]));
            }
            AdType::IncompleteServiceUuids128 => {
                self.incomplete_uuids_128 = Some(hex::encode(data));
            }
            AdType::ShortenedLocalName | AdType::CompleteLocalName => {
                self.local_name = Some(String::from_utf8_lossy(data).into_owned());
            }
            AdType::ServiceData16 if data.len() >= 2 => {
                self.service_data = Some(ServiceData {
                    uuid: u16::from_le_bytes([data[0], data[1]]),
                    data: hex::encode(&data[2..]),
                });
            }
            AdType::ManufacturerSpecific if data.len() >= 2 => {
                if let Some(company_id) = read_u16_le(data) {
                    self.manufacturer = Some(ManufacturerData::parse(company_id, &data[2..]));
                }
            }
            other => self.unknown.push(UnknownStructure {
                ad_type: other.code(),
                hex: hex::encode(data),
            }),
        }
    }

    pub fn company_id(&self) -> Option<u16> {
        self.manufacturer.as_ref().map(|m| m.company_id)
    }

    pub fn apple_records(&self) -> &[AppleRecord] {
        self.manufacturer
            .as_ref()
            .map(ManufacturerData::apple_records)
            .unwrap_or_default()
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn decode_flags(value: u8) -> Vec<&'static str> {
    ADVERTISING_FLAGS
        .iter()
        .enumerate()
        .filter(|(bit, _)| value & (1u8 << *bit) != 0)
        .map(|(_, name)| *name)
        .collect()
}

fn decode_oob_flags(value: u8) -> Vec<&'static str> {
    let mut flags = Vec::with_capacity(4);
    flags.push(if value & 0x01 != 0 {
        OOB_DATA_PRESENT
    } else {
        OOB_DATA_ABSENT
    });
    if value & 0x02 != 0 {
        flags.push(OOB_LE_SUPPORTED);
    }
    if value & 0x04 != 0 {
        flags.push(OOB_SIMULTANEOUS_HOST);
    }
    flags.push(if value & 0x08 != 0 {
        OOB_RANDOM_ADDRESS
    } else {
        OOB_PUBLIC_ADDRESS
    });
    flags
}

/// Iterator over `(ad_type, data)` pairs. Zero-length structures are
/// skipped; a structure whose length overruns the buffer ends iteration.
struct AdStructures<'a> {
    rest: &'a [u8],
}

impl<'a> AdStructures<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { rest: buf }
    }
}

impl<'a> Iterator for AdStructures<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (&len, body) = self.rest.split_first()?;
            let len = len as usize;
            if len > body.len() {
                log::trace!(
                    "dropping truncated AD structure ({} of {} bytes)",
                    body.len(),
                    len
                );
                self.rest = &[];
                return None;
            }
            let (structure, rest) = body.split_at(len);
            self.rest = rest;
            if let Some((&ad_type, data)) = structure.split_first() {
                return Some((ad_type, data));
            }
        }
    }
}
