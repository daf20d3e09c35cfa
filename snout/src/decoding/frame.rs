//! BTLE capture line decoding
//!
//! `btle_rx` prints one line per received advertising PDU:
//!
//! ```text
//! 1567108496.651985 Pkt8 Ch37 AA:8e89bed6 ADV_PDU_t0:ADV_IND T1 R0 PloadL20 AdvA:6385725ebfcd Data:0201060aff4c001005011c569415 CRC0
//! ```
//!
//! Only lines with exactly eleven fields whose last field is `CRC0` are
//! accepted. Anything else is noise from the receiver.

use super::advertising::AdvertisingPayload;
use crate::errors::{Result, SnoutError};
use log::trace;
use serde::Serialize;

const FIELD_COUNT: usize = 11;
const CRC_OK: &str = "CRC0";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BtleFrame {
    pub timestamp: f64,
    pub number: i64,
    pub channel: u8,
    pub access_address: String,
    pub pdu_type: u8,
    pub pdu_name: String,
    pub tx_add: bool,
    pub rx_add: bool,
    pub payload_len: usize,
    pub sender: String,
    pub payload_hex: String,
    #[serde(skip)]
    pub payload: AdvertisingPayload,
}

impl BtleFrame {
    /// Decodes a capture line, returning the reason when it is rejected.
    pub fn decode_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != FIELD_COUNT {
            return Err(SnoutError::malformed(format!(
                "expected {} fields, got {}",
                FIELD_COUNT,
                fields.len()
            )));
        }
        if fields[10] != CRC_OK {
            return Err(SnoutError::malformed(format!(
                "trailer is {}, not {}",
                fields[10], CRC_OK
            )));
        }

        let timestamp = parse_number::<f64>(fields[0], "timestamp")?;
        let number = parse_number::<i64>(field(fields[1], "Pkt")?, "packet number")?;
        let channel = parse_number::<u8>(field(fields[2], "Ch")?, "channel")?;
        let access_address = hex_field(fields[3], "AA:")?;

        let (pdu_type, pdu_name) = field(fields[4], "ADV_PDU_t")?
            .split_once(':')
            .ok_or_else(|| SnoutError::malformed("PDU type without name"))?;
        let pdu_type = parse_number::<u8>(pdu_type, "PDU type")?;

        let tx_add = parse_flag(field(fields[5], "T")?)?;
        let rx_add = parse_flag(field(fields[6], "R")?)?;
        let payload_len = parse_number::<usize>(field(fields[7], "PloadL")?, "payload length")?;
        let sender = hex_field(fields[8], "AdvA:")?;
        let payload_hex = field(fields[9], "Data:")?;
        let payload = AdvertisingPayload::from_hex(payload_hex)?;

        Ok(Self {
            timestamp,
            number,
            channel,
            access_address: access_address.to_string(),
            pdu_type,
            pdu_name: pdu_name.to_string(),
            tx_add,
            rx_add,
            payload_len,
            sender: sender.to_string(),
            payload_hex: payload_hex.to_string(),
            payload,
        })
    }

    /// Lenient variant used by capture loops: rejected lines become `None`.
    pub fn decode(line: &str) -> Option<Self> {
        match Self::decode_line(line) {
            Ok(frame) => Some(frame),
            Err(e) => {
                trace!("skipping capture line: {e}");
                None
            }
        }
    }

    pub fn decode_bytes(line: &[u8]) -> Option<Self> {
        std::str::from_utf8(line).ok().and_then(Self::decode)
    }
}

fn field<'a>(raw: &'a str, prefix: &str) -> Result<&'a str> {
    raw.strip_prefix(prefix)
        .ok_or_else(|| SnoutError::malformed(format!("field {raw:?} lacks prefix {prefix:?}")))
}

fn hex_field<'a>(raw: &'a str, prefix: &str) -> Result<&'a str> {
    let value = field(raw, prefix)?;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SnoutError::malformed(format!(
            "{prefix} value {value:?} is not hex"
        )));
    }
    Ok(value)
}

fn parse_number<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| SnoutError::malformed(format!("invalid {what}: {raw:?}")))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(SnoutError::malformed(format!("invalid address flag {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAMPLE: &str = "1567108496.651985 Pkt8 Ch37 AA:8e89bed6 ADV_PDU_t0:ADV_IND T1 R0 PloadL20 AdvA:6385725ebfcd Data:0201060aff4c001005011c569415 CRC0";

    #[test]
    fn should_decode_every_field_of_sample_line() {
        let frame = BtleFrame::decode_line(SAMPLE).unwrap();

        assert_eq!(frame.timestamp, 1567108496.651985);
        assert_eq!(frame.number, 8);
        assert_eq!(frame.channel, 37);
        assert_eq!(frame.access_address, "8e89bed6");
        assert_eq!(frame.pdu_type, 0);
        assert_eq!(frame.pdu_name, "ADV_IND");
        assert!(frame.tx_add);
        assert!(!frame.rx_add);
        assert_eq!(frame.payload_len, 20);
        assert_eq!(frame.sender, "6385725ebfcd");
        assert_eq!(frame.payload_hex, "0201060aff4c001005011c569415");
        assert_eq!(frame.payload.company_id(), Some(0x004c));
    }

    #[test]
    fn should_ignore_trailing_newline() {
        let line = format!("{SAMPLE}\n");
        assert!(BtleFrame::decode(&line).is_some());
    }

    #[test]
    fn should_reject_bad_crc_trailer() {
        let line = SAMPLE.replace("CRC0", "CRC1");
        assert_matches!(
            BtleFrame::decode_line(&line),
            Err(SnoutError::MalformedFrame { .. })
        );
    }

    #[test]
    fn should_reject_wrong_field_count() {
        let line = SAMPLE.replace(" T1 R0", " T1");
        assert!(BtleFrame::decode(&line).is_none());
    }

    #[test]
    fn should_reject_missing_prefix_and_bad_hex() {
        assert!(BtleFrame::decode(&SAMPLE.replace("Ch37", "37")).is_none());
        assert!(BtleFrame::decode(&SAMPLE.replace("Data:02", "Data:0x")).is_none());
        assert!(BtleFrame::decode(&SAMPLE.replace("AdvA:6385725ebfcd", "AdvA:")).is_none());
    }

    #[test]
    fn should_reject_invalid_utf8_bytes() {
        assert!(BtleFrame::decode_bytes(&[0xff, 0xfe, b'\n']).is_none());
    }
}
