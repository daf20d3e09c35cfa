//! Vendor, model and OS fingerprinting
//!
//! Signatures are data, not code: the built-in table can be extended from
//! the configuration file. For every derived trait the sent messages are
//! scanned oldest first, and for each message the signatures are tried in
//! table order. The first hit wins.

use crate::decoding::AdvertisingPayload;
use crate::message::Message;
use serde::{Deserialize, Serialize};
use snout_common::apple::{AppleRecordKind, MICROSOFT_COMPANY_ID};
use snout_common::company_ids::company_name;
use std::sync::Arc;

pub const UNKNOWN_TRAIT: &str = "-";

const FITBIT_SERVICE_FRAGMENT: &str = "ba5689a6fabfa2bd01467d6e00fbabad";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Vendor,
    Model,
    Os,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Matcher {
    /// Resolves to the assigned name of the manufacturer data's company.
    CompanyName,
    CompanyId { id: u16 },
    /// Hex fragment inside the incomplete 128-bit service UUID list.
    ServiceUuidFragment { fragment: String },
    AppleRecord { record: AppleRecordKind },
    /// Resolves to `label` followed by the Nearby iOS version hint.
    NearbyIosHint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(rename = "trait")]
    pub target: Trait,
    pub matcher: Matcher,
    #[serde(default)]
    pub label: Option<String>,
}

impl Signature {
    pub fn new(target: Trait, matcher: Matcher, label: Option<&str>) -> Self {
        Self {
            target,
            matcher,
            label: label.map(str::to_string),
        }
    }

    /// Matchers that do not produce their own text need a label.
    pub fn requires_label(&self) -> bool {
        !matches!(self.matcher, Matcher::CompanyName | Matcher::NearbyIosHint)
    }

    fn evaluate(&self, payload: &AdvertisingPayload) -> Option<String> {
        let label = || self.label.clone();
        match &self.matcher {
            Matcher::CompanyName => payload
                .company_id()
                .and_then(company_name)
                .map(str::to_string),
            Matcher::CompanyId { id } => (payload.company_id() == Some(*id))
                .then(label)
                .flatten(),
            Matcher::ServiceUuidFragment { fragment } => payload
                .incomplete_uuids_128
                .as_deref()
                .filter(|uuids| uuids.contains(fragment.as_str()))
                .and_then(|_| label()),
            Matcher::AppleRecord { record } => payload
                .apple_records()
                .iter()
                .any(|r| r.kind() == Some(*record))
                .then(label)
                .flatten(),
            Matcher::NearbyIosHint => payload
                .apple_records()
                .iter()
                .filter_map(|r| r.nearby())
                .find_map(|n| n.ios_version_hint)
                .map(|hint| format!("{}{}", self.label.as_deref().unwrap_or("iOS "), hint)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprinter {
    signatures: Vec<Signature>,
}

impl Fingerprinter {
    pub fn new(signatures: Vec<Signature>) -> Self {
        Self { signatures }
    }

    /// Built-in table with `extra` signatures tried first.
    pub fn with_extra(extra: Vec<Signature>) -> Self {
        let mut signatures = extra;
        signatures.extend(Self::default().signatures);
        Self { signatures }
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn resolve(&self, target: Trait, messages: &[Arc<Message>]) -> Option<String> {
        let candidates: Vec<&Signature> = self
            .signatures
            .iter()
            .filter(|s| s.target == target)
            .collect();

        messages
            .iter()
            .filter_map(|m| m.payload().advertising())
            .find_map(|payload| candidates.iter().find_map(|s| s.evaluate(payload)))
    }

    pub fn resolve_or_unknown(&self, target: Trait, messages: &[Arc<Message>]) -> String {
        self.resolve(target, messages)
            .unwrap_or_else(|| UNKNOWN_TRAIT.to_string())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        let fitbit = || Matcher::ServiceUuidFragment {
            fragment: FITBIT_SERVICE_FRAGMENT.to_string(),
        };
        Self::new(vec![
            Signature::new(Trait::Vendor, Matcher::CompanyName, None),
            Signature::new(Trait::Vendor, fitbit(), Some("FitBit")),
            Signature::new(Trait::Model, fitbit(), Some("Charge / Charge HR")),
            Signature::new(
                Trait::Model,
                Matcher::AppleRecord {
                    record: AppleRecordKind::AirPods,
                },
                Some("AirPods"),
            ),
            Signature::new(Trait::Os, Matcher::NearbyIosHint, Some("iOS ")),
            Signature::new(
                Trait::Os,
                Matcher::CompanyId {
                    id: MICROSOFT_COMPANY_ID,
                },
                Some("Windows 10 >= v10.0.10240.0"),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Payload;
    use crate::registry::DeviceRegistry;
    use crate::decoding::BtleFrame;

    fn message_with(payload_hex: &str, registry: &DeviceRegistry) -> Arc<Message> {
        let line = format!(
            "1.0 Pkt1 Ch37 AA:8e89bed6 ADV_PDU_t0:ADV_IND T0 R0 PloadL6 AdvA:aabbccddeeff Data:{payload_hex} CRC0"
        );
        let frame = BtleFrame::decode_line(&line).unwrap();
        Message::builder(snout_common::Protocol::Btle)
            .sender("aabbccddeeff")
            .payload(Payload::Btle(frame))
            .bind(registry)
    }

    #[test]
    fn should_resolve_vendor_from_company_name() {
        let registry = DeviceRegistry::new();
        let messages = vec![message_with("0aff4c001005011c569415", &registry)];

        let fp = Fingerprinter::default();
        assert_eq!(fp.resolve(Trait::Vendor, &messages).as_deref(), Some("Apple, Inc."));
        assert_eq!(fp.resolve(Trait::Os, &messages).as_deref(), Some("iOS 12"));
    }

    #[test]
    fn should_take_ios_hint_from_later_nearby_record() {
        let registry = DeviceRegistry::new();
        // Nearby without a hint, then Nearby with the iOS 12 lead byte.
        let messages = vec![message_with("0eff4c00100201011005011c569415", &registry)];

        let fp = Fingerprinter::default();
        assert_eq!(fp.resolve(Trait::Os, &messages).as_deref(), Some("iOS 12"));
    }

    #[test]
    fn should_recognise_fitbit_by_service_uuid_fragment() {
        let registry = DeviceRegistry::new();
        let messages = vec![message_with(
            "1106ba5689a6fabfa2bd01467d6e00fbabad",
            &registry,
        )];

        let fp = Fingerprinter::default();
        assert_eq!(fp.resolve(Trait::Vendor, &messages).as_deref(), Some("FitBit"));
        assert_eq!(
            fp.resolve(Trait::Model, &messages).as_deref(),
            Some("Charge / Charge HR")
        );
    }

    #[test]
    fn should_recognise_airpods_record() {
        let registry = DeviceRegistry::new();
        let messages = vec![message_with("05ff4c000700", &registry)];

        assert_eq!(
            Fingerprinter::default().resolve_or_unknown(Trait::Model, &messages),
            "AirPods"
        );
    }

    #[test]
    fn should_map_microsoft_company_to_windows() {
        let registry = DeviceRegistry::new();
        let messages = vec![message_with("05ff06000109", &registry)];

        assert_eq!(
            Fingerprinter::default().resolve_or_unknown(Trait::Os, &messages),
            "Windows 10 >= v10.0.10240.0"
        );
    }

    #[test]
    fn should_fall_back_to_sentinel() {
        let registry = DeviceRegistry::new();
        let messages = vec![message_with("020106", &registry)];

        let fp = Fingerprinter::default();
        assert_eq!(fp.resolve_or_unknown(Trait::Vendor, &messages), "-");
        assert_eq!(fp.resolve_or_unknown(Trait::Os, &messages), "-");
    }

    #[test]
    fn should_ignore_unassigned_company_for_vendor() {
        let registry = DeviceRegistry::new();
        let messages = vec![message_with("03fffeff", &registry)];

        assert_eq!(
            Fingerprinter::default().resolve_or_unknown(Trait::Vendor, &messages),
            "-"
        );
    }

    #[test]
    fn should_prefer_earliest_message_that_matches() {
        let registry = DeviceRegistry::new();
        let messages = vec![
            message_with("020106", &registry),
            message_with("05ff59000102", &registry),
            message_with("0aff4c001005011c569415", &registry),
        ];

        assert_eq!(
            Fingerprinter::default().resolve_or_unknown(Trait::Vendor, &messages),
            "Nordic Semiconductor ASA"
        );
    }

    #[test]
    fn should_try_extra_signatures_first() {
        let registry = DeviceRegistry::new();
        let messages = vec![message_with("05ff59000102", &registry)];
        let fp = Fingerprinter::with_extra(vec![Signature::new(
            Trait::Vendor,
            Matcher::CompanyId { id: 0x0059 },
            Some("Nordic devkit"),
        )]);

        assert_eq!(fp.resolve_or_unknown(Trait::Vendor, &messages), "Nordic devkit");
    }

    #[test]
    fn should_deserialize_signature_from_yaml() {
        let yaml = "trait: model\nmatcher:\n  type: company_id\n  id: 89\nlabel: devkit\n";
        let signature: Signature = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(signature.target, Trait::Model);
        assert_eq!(signature.matcher, Matcher::CompanyId { id: 89 });
        assert!(signature.requires_label());
    }
}
