//! Frame and payload decoding
//!
//! Decoders are pure: they turn a capture line or raw frame bytes into
//! typed values and never touch the device registry. Rejected input is
//! reported as [`SnoutError::MalformedFrame`](crate::errors::SnoutError)
//! by the strict entry points and as `None` by the lenient ones.

pub mod advertising;
pub mod apple;
pub mod frame;
pub mod zigbee;

pub use advertising::{AdvertisingPayload, ManufacturerData, ManufacturerRecords, ServiceData};
pub use apple::{AppleRecord, NearbyInfo, WifiState};
pub use frame::BtleFrame;
pub use zigbee::{MacFrameType, ZigbeeFrame};
