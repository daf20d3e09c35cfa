//! IEEE 802.15.4 MAC frames carrying Zigbee traffic
//!
//! Only the MAC header is decoded in full. Beyond it the decoder looks for
//! one thing: inter-PAN ZigBee Light Link scan responses, which reveal a
//! device that will accept touchlink commissioning from outside its
//! network.

use crate::errors::{Result, SnoutError};
use log::trace;
use serde::Serialize;

const ZLL_PROFILE_ID: u16 = 0xc05e;
const ZLL_COMMISSIONING_CLUSTER: u16 = 0x1000;
const ZLL_SCAN_RESPONSE: u8 = 0x01;
const NWK_FRAME_INTER_PAN: u16 = 0x03;
const APS_FRAME_INTER_PAN: u8 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MacFrameType {
    Beacon,
    Data,
    Ack,
    Command,
    Reserved(u8),
}

impl MacFrameType {
    fn from_bits(bits: u16) -> Self {
        match bits & 0x07 {
            0 => MacFrameType::Beacon,
            1 => MacFrameType::Data,
            2 => MacFrameType::Ack,
            3 => MacFrameType::Command,
            other => MacFrameType::Reserved(other as u8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressMode {
    None,
    Short,
    Extended,
}

impl AddressMode {
    fn from_bits(bits: u16) -> Result<Self> {
        match bits & 0x03 {
            0 => Ok(AddressMode::None),
            2 => Ok(AddressMode::Short),
            3 => Ok(AddressMode::Extended),
            _ => Err(SnoutError::malformed("reserved 802.15.4 addressing mode")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZigbeeFrame {
    pub frame_type: MacFrameType,
    pub security_enabled: bool,
    pub seq_number: u8,
    pub dest_pan: Option<u16>,
    pub dest_addr: Option<String>,
    pub src_pan: Option<u16>,
    pub src_addr: Option<String>,
    pub payload_hex: String,
    pub fcs_valid: Option<bool>,
    pub zll_scan_response: bool,
}

impl ZigbeeFrame {
    /// Decodes a MAC frame. With `has_fcs` the last two bytes are taken as
    /// the frame check sequence and verified.
    pub fn decode_bytes(raw: &[u8], has_fcs: bool) -> Result<Self> {
        let (frame, fcs_valid) = if has_fcs {
            if raw.len() < 2 {
                return Err(SnoutError::malformed("frame shorter than its FCS"));
            }
            let (body, fcs) = raw.split_at(raw.len() - 2);
            let expected = u16::from_le_bytes([fcs[0], fcs[1]]);
            (body, Some(crc16_kermit(body) == expected))
        } else {
            (raw, None)
        };

        let mut cursor = Cursor::new(frame);
        let control = cursor.u16()?;
        let frame_type = MacFrameType::from_bits(control);
        let security_enabled = control & (1 << 3) != 0;
        let pan_compression = control & (1 << 6) != 0;
        let dest_mode = AddressMode::from_bits(control >> 10)?;
        let src_mode = AddressMode::from_bits(control >> 14)?;
        let seq_number = cursor.u8()?;

        let mut dest_pan = None;
        let mut dest_addr = None;
        if dest_mode != AddressMode::None {
            dest_pan = Some(cursor.u16()?);
            dest_addr = Some(cursor.address(dest_mode)?);
        }

        let mut src_pan = None;
        let mut src_addr = None;
        if src_mode != AddressMode::None {
            src_pan = if pan_compression && dest_pan.is_some() {
                dest_pan
            } else {
                Some(cursor.u16()?)
            };
            src_addr = Some(cursor.address(src_mode)?);
        }

        let payload = cursor.rest();
        let zll_scan_response =
            frame_type == MacFrameType::Data && !security_enabled && is_zll_scan_response(payload);

        Ok(Self {
            frame_type,
            security_enabled,
            seq_number,
            dest_pan,
            dest_addr,
            src_pan,
            src_addr,
            payload_hex: hex::encode(payload),
            fcs_valid,
            zll_scan_response,
        })
    }

    pub fn decode(raw: &[u8], has_fcs: bool) -> Option<Self> {
        match Self::decode_bytes(raw, has_fcs) {
            Ok(frame) => Some(frame),
            Err(e) => {
                trace!("skipping zigbee frame: {e}");
                None
            }
        }
    }
}

/// Walks the NWK, APS and ZCL headers of an inter-PAN frame.
fn is_zll_scan_response(payload: &[u8]) -> bool {
    let mut cursor = Cursor::new(payload);
    let Ok(nwk_control) = cursor.u16() else {
        return false;
    };
    if nwk_control & 0x03 != NWK_FRAME_INTER_PAN {
        return false;
    }

    is_zll_scan_response_aps(&mut cursor).unwrap_or(false)
}

fn is_zll_scan_response_aps(cursor: &mut Cursor<'_>) -> Result<bool> {
    let aps_control = cursor.u8()?;
    if aps_control & 0x03 != APS_FRAME_INTER_PAN {
        return Ok(false);
    }
    if (aps_control >> 2) & 0x03 == 0x03 {
        cursor.u16()?;
    }
    let cluster = cursor.u16()?;
    let profile = cursor.u16()?;
    if cluster != ZLL_COMMISSIONING_CLUSTER || profile != ZLL_PROFILE_ID {
        return Ok(false);
    }

    let zcl_control = cursor.u8()?;
    if zcl_control & 0x04 != 0 {
        cursor.u16()?;
    }
    let _zcl_seq = cursor.u8()?;
    let command = cursor.u8()?;
    let cluster_specific = zcl_control & 0x03 == 0x01;
    let server_to_client = zcl_control & 0x08 != 0;
    Ok(cluster_specific && server_to_client && command == ZLL_SCAN_RESPONSE)
}

/// CRC-16 as used for the 802.15.4 FCS (CCITT polynomial, reflected, zero init).
fn crc16_kermit(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0x8408
            } else {
                crc >> 1
            };
        }
    }
    crc
}

struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() < n {
            return Err(SnoutError::malformed(format!(
                "need {} bytes, {} left",
                n,
                self.buf.len()
            )));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn address(&mut self, mode: AddressMode) -> Result<String> {
        match mode {
            AddressMode::Short => Ok(format!("0x{:04x}", self.u16()?)),
            AddressMode::Extended => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(self.take(8)?);
                Ok(format!("{:016x}", u64::from_le_bytes(bytes)))
            }
            AddressMode::None => Err(SnoutError::malformed("no address present")),
        }
    }

    fn rest(&self) -> &'a [u8] {
        self.buf
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn should_decode_short_addressed_data_frame() {
        let frame = ZigbeeFrame::decode_bytes(&SHORT_DATA_FRAME, false).unwrap();

        assert_eq!(frame.frame_type, MacFrameType::Data);
        assert_eq!(frame.seq_number, 0x2a);
        assert_eq!(frame.dest_pan, Some(0x1a62));
        assert_eq!(frame.src_pan, Some(0x1a62));
        assert_eq!(frame.dest_addr.as_deref(), Some("0xffff"));
        assert_eq!(frame.src_addr.as_deref(), Some("0x0001"));
        assert!(!frame.zll_scan_response);
    }

    #[test]
    fn should_verify_appended_fcs() {
        let mut raw = SHORT_DATA_FRAME.to_vec();
        let crc = crc16_kermit(&raw);
        raw.extend_from_slice(&crc.to_le_bytes());

        let frame = ZigbeeFrame::decode_bytes(&raw, true).unwrap();
        assert_eq!(frame.fcs_valid, Some(true));

        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        assert_eq!(ZigbeeFrame::decode_bytes(&raw, true).unwrap().fcs_valid, Some(false));
    }

    #[test]
    fn should_match_known_crc_vector() {
        assert_eq!(crc16_kermit(b"123456789"), 0x2189);
    }

    #[test]
    fn should_detect_zll_scan_response() {
        let frame = ZigbeeFrame::decode_bytes(&zll_scan_response(), false).unwrap();

        assert!(frame.zll_scan_response);
        assert_eq!(frame.src_addr.as_deref(), Some("0102030405060708"));
        assert_eq!(frame.src_pan, Some(0x1a62));
    }

    #[test]
    fn should_not_flag_scan_request() {
        let mut raw = zll_scan_response();
        let len = raw.len();
        raw[len - 3] = 0x11;
        raw[len - 1] = 0x00;
        assert!(!ZigbeeFrame::decode_bytes(&raw, false).unwrap().zll_scan_response);
    }

    #[test]
    fn should_reject_truncated_frames() {
        assert!(ZigbeeFrame::decode(&SHORT_DATA_FRAME[..5], false).is_none());
        assert!(ZigbeeFrame::decode(&[0x41], false).is_none());
        assert!(ZigbeeFrame::decode(&[0x41], true).is_none());
    }

    #[test]
    fn should_reject_reserved_addressing_mode() {
        assert!(ZigbeeFrame::decode(&[0x41, 0x84, 0x00, 0, 0, 0, 0], false).is_none());
    }
}
