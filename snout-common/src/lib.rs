#![no_std]

//! Shared definitions for snout
//!
//! Everything here is allocation-free so the tables can be embedded in
//! constrained capture front-ends as well as the host-side decoder.

#[cfg(test)]
extern crate std;

pub mod ad_types;
pub mod apple;
pub mod company_ids;

use core::fmt;
use core::str::FromStr;

/// Radio technologies the capture pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "user",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Protocol {
    Btle,
    Wifi,
    Zigbee,
    Zwave,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [
        Protocol::Btle,
        Protocol::Wifi,
        Protocol::Zigbee,
        Protocol::Zwave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Btle => "btle",
            Protocol::Wifi => "wifi",
            Protocol::Zigbee => "zigbee",
            Protocol::Zwave => "zwave",
        }
    }

    /// Inclusive channel range accepted by capture front-ends for this protocol.
    pub fn channel_range(&self) -> (u8, u8) {
        match self {
            Protocol::Btle => (0, 39),
            Protocol::Wifi => (1, 196),
            Protocol::Zigbee => (11, 26),
            Protocol::Zwave => (1, 3),
        }
    }

    pub fn is_valid_channel(&self, channel: u8) -> bool {
        let (low, high) = self.channel_range();
        (low..=high).contains(&channel)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a protocol token is not one of [`Protocol::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProtocolError;

impl fmt::Display for ParseProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unrecognized protocol token")
    }
}

impl FromStr for Protocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or(ParseProtocolError)
    }
}

/// Reads two bytes as a little-endian word, the wire order of every
/// multi-octet field in Bluetooth advertising data.
pub fn read_u16_le(data: &[u8]) -> Option<u16> {
    match data {
        [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod protocol_tests {
        use super::*;

        #[test]
        fn should_parse_every_lowercase_token() {
            for protocol in Protocol::ALL {
                assert_eq!(protocol.as_str().parse::<Protocol>(), Ok(protocol));
            }
        }

        #[test]
        fn should_reject_unknown_and_uppercase_tokens() {
            assert_eq!("bluetooth".parse::<Protocol>(), Err(ParseProtocolError));
            assert_eq!("BTLE".parse::<Protocol>(), Err(ParseProtocolError));
            assert_eq!("".parse::<Protocol>(), Err(ParseProtocolError));
        }

        #[test]
        fn should_bound_channels_per_protocol() {
            assert!(Protocol::Btle.is_valid_channel(37));
            assert!(!Protocol::Btle.is_valid_channel(40));
            assert!(Protocol::Zigbee.is_valid_channel(11));
            assert!(!Protocol::Zigbee.is_valid_channel(10));
            assert!(!Protocol::Zwave.is_valid_channel(0));
        }
    }

    mod byte_order_tests {
        use super::*;

        #[test]
        fn should_read_little_endian_word() {
            assert_eq!(read_u16_le(&[0x4c, 0x00]), Some(0x004c));
            assert_eq!(read_u16_le(&[0x06, 0x00, 0xff]), Some(0x0006));
        }

        #[test]
        fn should_return_none_for_short_input() {
            assert_eq!(read_u16_le(&[0x4c]), None);
            assert_eq!(read_u16_le(&[]), None);
        }
    }
}
