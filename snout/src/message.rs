//! Decoded messages bound to the devices that sent and received them
//!
//! A [`Message`] is assembled with a [`MessageBuilder`] and becomes live
//! through [`MessageBuilder::bind`], which resolves sender and receiver in
//! the [`DeviceRegistry`] and appends the message to their logs. The message
//! only holds weak references back into the registry.

use crate::decoding::{AdvertisingPayload, BtleFrame, ZigbeeFrame};
use crate::registry::{Attributes, Device, DeviceRegistry};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Map, Value};
use snout_common::Protocol;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

pub const UNKNOWN_NUMBER: i64 = -1;

/// Protocol-specific decoded content.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Btle(BtleFrame),
    Zigbee(ZigbeeFrame),
    Raw,
}

impl Payload {
    pub fn advertising(&self) -> Option<&AdvertisingPayload> {
        match self {
            Payload::Btle(frame) => Some(&frame.payload),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Payload::Btle(frame) => frame.payload.to_value(),
            Payload::Zigbee(frame) => serde_json::to_value(frame).unwrap_or(Value::Null),
            Payload::Raw => Value::Null,
        }
    }
}

#[derive(Debug)]
pub struct Message {
    protocol: Protocol,
    timestamp: f64,
    number: i64,
    seq_number: Option<u32>,
    sender: Option<Weak<Device>>,
    receiver: Option<Weak<Device>>,
    payload: Payload,
    raw: Bytes,
    vulnerabilities: BTreeMap<String, bool>,
    meta: Map<String, Value>,
}

impl Message {
    pub fn builder(protocol: Protocol) -> MessageBuilder {
        MessageBuilder::new(protocol)
    }

    /// Prepares a BTLE message from a decoded capture line.
    pub fn from_btle_frame(frame: BtleFrame, raw: impl Into<Bytes>) -> MessageBuilder {
        MessageBuilder::new(Protocol::Btle)
            .timestamp(frame.timestamp)
            .number(frame.number)
            .sender(frame.sender.clone())
            .meta("channel", frame.channel)
            .meta("pdu_type", frame.pdu_name.clone())
            .meta("access_address", frame.access_address.clone())
            .raw(raw)
            .payload(Payload::Btle(frame))
    }

    /// Decodes a raw `btle_rx` line. Rejected lines yield `None`.
    pub fn from_btle_line(line: &[u8]) -> Option<MessageBuilder> {
        let frame = BtleFrame::decode_bytes(line)?;
        Some(Self::from_btle_frame(frame, Bytes::copy_from_slice(line)))
    }

    /// Prepares a Zigbee message. Short frames such as acknowledgements
    /// carry no addresses and produce a message without sender.
    pub fn from_zigbee_frame(frame: ZigbeeFrame, raw: impl Into<Bytes>) -> MessageBuilder {
        let mut builder = MessageBuilder::new(Protocol::Zigbee)
            .seq_number(frame.seq_number as u32)
            .vulnerability("zll", frame.zll_scan_response)
            .meta(
                "pan",
                json!({ "src_panid": frame.src_pan, "dest_panid": frame.dest_pan }),
            )
            .raw(raw);
        if let Some(src) = &frame.src_addr {
            builder = builder.sender(src.clone());
        }
        if let Some(dest) = &frame.dest_addr {
            builder = builder.receiver(dest.clone());
        }
        builder.payload(Payload::Zigbee(frame))
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn seq_number(&self) -> Option<u32> {
        self.seq_number
    }

    pub fn sender(&self) -> Option<Arc<Device>> {
        self.sender.as_ref().and_then(Weak::upgrade)
    }

    pub fn receiver(&self) -> Option<Arc<Device>> {
        self.receiver.as_ref().and_then(Weak::upgrade)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn vulnerabilities(&self) -> &BTreeMap<String, bool> {
        &self.vulnerabilities
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    pub fn summary(&self) -> MessageSummary {
        MessageSummary {
            protocol: self.protocol,
            timestamp: self.timestamp,
            sender: self.sender().map(|d| d.id()),
            receiver: self.receiver().map(|d| d.id()),
            seq_number: self.seq_number,
            number: self.number,
            meta: self.meta.clone(),
            raw: hex::encode(&self.raw),
            payload: self.payload.to_value(),
        }
    }
}

/// Display form of a message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub protocol: Protocol,
    pub timestamp: f64,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub seq_number: Option<u32>,
    pub number: i64,
    pub meta: Map<String, Value>,
    pub raw: String,
    pub payload: Value,
}

#[derive(Debug)]
pub struct MessageBuilder {
    protocol: Protocol,
    timestamp: Option<f64>,
    number: i64,
    seq_number: Option<u32>,
    sender: Option<String>,
    sender_attributes: Attributes,
    receiver: Option<String>,
    payload: Payload,
    raw: Bytes,
    vulnerabilities: BTreeMap<String, bool>,
    meta: Map<String, Value>,
}

impl MessageBuilder {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            timestamp: None,
            number: UNKNOWN_NUMBER,
            seq_number: None,
            sender: None,
            sender_attributes: Attributes::new(),
            receiver: None,
            payload: Payload::Raw,
            raw: Bytes::new(),
            vulnerabilities: BTreeMap::new(),
            meta: Map::new(),
        }
    }

    pub fn timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn number(mut self, number: i64) -> Self {
        self.number = number;
        self
    }

    pub fn seq_number(mut self, seq_number: u32) -> Self {
        self.seq_number = Some(seq_number);
        self
    }

    pub fn sender(mut self, id: impl Into<String>) -> Self {
        self.sender = Some(id.into());
        self
    }

    /// Attribute merged into the sender device when the message is bound.
    pub fn sender_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sender_attributes.insert(key.into(), value.into());
        self
    }

    pub fn receiver(mut self, id: impl Into<String>) -> Self {
        self.receiver = Some(id.into());
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn raw(mut self, raw: impl Into<Bytes>) -> Self {
        self.raw = raw.into();
        self
    }

    pub fn vulnerability(mut self, name: impl Into<String>, vulnerable: bool) -> Self {
        self.vulnerabilities.insert(name.into(), vulnerable);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Resolves sender and receiver through the registry and appends the
    /// message to their logs. The receiver also inherits every
    /// vulnerability flag the message carries.
    pub fn bind(self, registry: &DeviceRegistry) -> Arc<Message> {
        let sender = self
            .sender
            .as_deref()
            .map(|id| registry.get_unique(self.protocol, id, self.sender_attributes.clone()));
        let receiver = self
            .receiver
            .as_deref()
            .map(|id| registry.get_unique(self.protocol, id, Attributes::new()));

        let message = Arc::new(Message {
            protocol: self.protocol,
            timestamp: self.timestamp.unwrap_or_else(now_seconds),
            number: self.number,
            seq_number: self.seq_number,
            sender: sender.as_ref().map(Arc::downgrade),
            receiver: receiver.as_ref().map(Arc::downgrade),
            payload: self.payload,
            raw: self.raw,
            vulnerabilities: self.vulnerabilities,
            meta: self.meta,
        });

        if let Some(device) = &sender {
            device.push_sent(Arc::clone(&message));
        }
        if let Some(device) = &receiver {
            device.merge_vulnerabilities(&message.vulnerabilities);
            device.push_received(Arc::clone(&message));
        }

        message
    }
}

pub(crate) fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::zigbee::fixtures;

    const SAMPLE: &[u8] = b"1567108496.651985 Pkt8 Ch37 AA:8e89bed6 ADV_PDU_t0:ADV_IND T1 R0 PloadL20 AdvA:6385725ebfcd Data:0201060aff4c001005011c569415 CRC0\n";

    mod binding_tests {
        use super::*;

        #[test]
        fn should_append_message_to_sender_log() {
            let registry = DeviceRegistry::new();
            let message = Message::from_btle_line(SAMPLE).unwrap().bind(&registry);

            let sender = message.sender().unwrap();
            assert_eq!(sender.id(), "6385725ebfcd");
            assert_eq!(sender.occurrences(), 1);
            assert!(Arc::ptr_eq(&sender.sent_messages()[0], &message));
            assert!(message.receiver().is_none());
        }

        #[test]
        fn should_keep_call_order_in_logs() {
            let registry = DeviceRegistry::new();
            for (n, ts) in [(1, 20.0), (2, 10.0)] {
                Message::builder(Protocol::Btle)
                    .sender("aa")
                    .number(n)
                    .timestamp(ts)
                    .bind(&registry);
            }

            let device = registry.known(Protocol::Btle, "aa").unwrap();
            let numbers: Vec<i64> = device.sent_messages().iter().map(|m| m.number()).collect();
            assert_eq!(numbers, vec![1, 2]);
        }

        #[test]
        fn should_or_merge_vulnerabilities_into_receiver() {
            let registry = DeviceRegistry::new();
            Message::builder(Protocol::Zigbee)
                .sender("0x0001")
                .receiver("0xffff")
                .vulnerability("zll", true)
                .bind(&registry);
            Message::builder(Protocol::Zigbee)
                .sender("0x0002")
                .receiver("0xffff")
                .vulnerability("zll", false)
                .bind(&registry);

            let receiver = registry.known(Protocol::Zigbee, "0xffff").unwrap();
            assert_eq!(receiver.vulnerabilities().get("zll"), Some(&true));
            assert_eq!(receiver.received_messages().len(), 2);
        }

        #[test]
        fn should_default_number_and_timestamp() {
            let registry = DeviceRegistry::new();
            let before = now_seconds();
            let message = Message::builder(Protocol::Wifi).sender("x").bind(&registry);

            assert_eq!(message.number(), UNKNOWN_NUMBER);
            assert!(message.timestamp() >= before);
        }
    }

    mod constructor_tests {
        use super::*;

        #[test]
        fn should_carry_btle_metadata() {
            let registry = DeviceRegistry::new();
            let message = Message::from_btle_line(SAMPLE).unwrap().bind(&registry);

            assert_eq!(message.meta()["channel"], 37);
            assert_eq!(message.meta()["pdu_type"], "ADV_IND");
            assert_eq!(message.meta()["access_address"], "8e89bed6");
            assert_eq!(message.number(), 8);
            assert_eq!(message.raw().as_ref(), SAMPLE);
        }

        #[test]
        fn should_reject_malformed_lines() {
            assert!(Message::from_btle_line(b"garbage\n").is_none());
        }

        #[test]
        fn should_bind_zigbee_addresses_and_zll_flag() {
            let registry = DeviceRegistry::new();
            let raw = fixtures::zll_scan_response();
            let frame = ZigbeeFrame::decode_bytes(&raw, false).unwrap();
            let message = Message::from_zigbee_frame(frame, raw).bind(&registry);

            assert_eq!(message.sender().unwrap().id(), "0102030405060708");
            assert_eq!(message.receiver().unwrap().id(), "0xffff");
            assert_eq!(message.seq_number(), Some(7));
            assert_eq!(message.meta()["pan"]["src_panid"], 0x1a62);
            assert_eq!(
                message.receiver().unwrap().vulnerabilities().get("zll"),
                Some(&true)
            );
        }

        #[test]
        fn should_summarize_with_device_ids() {
            let registry = DeviceRegistry::new();
            let message = Message::from_btle_line(SAMPLE).unwrap().bind(&registry);
            let summary = message.summary();

            assert_eq!(summary.sender.as_deref(), Some("6385725ebfcd"));
            assert_eq!(summary.receiver, None);
            assert_eq!(summary.payload["company_name"], "Apple, Inc.");
        }
    }
}
