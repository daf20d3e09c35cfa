//! Device identity and fingerprinting across bound messages

mod test_helpers;

use assert_matches::assert_matches;
use serde_json::json;
use snout::registry::{Attributes, Fingerprinter, Matcher, Signature, Trait};
use snout::{DeviceRegistry, Message, SnoutError};
use snout_common::Protocol;
use std::sync::Arc;
use test_helpers::{payloads, CaptureLineBuilder, SAMPLE_LINE};

fn attributes(pairs: &[(&str, serde_json::Value)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn bind_line(registry: &DeviceRegistry, line: &str) -> Arc<Message> {
    Message::from_btle_line(line.as_bytes())
        .expect("line should decode")
        .bind(registry)
}

mod identity_tests {
    use super::*;

    #[test]
    fn should_return_same_device_and_merge_attributes() {
        let registry = DeviceRegistry::new();

        let first = registry.get_unique(
            Protocol::Zigbee,
            "0x0001",
            attributes(&[("pan", json!(6754))]),
        );
        let second = registry.get_unique(
            Protocol::Zigbee,
            "0x0001",
            attributes(&[("channel", json!(15))]),
        );

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.attribute("pan"), Some(json!(6754)));
        assert_eq!(first.attribute("channel"), Some(json!(15)));
        assert_eq!(registry.len(Protocol::Zigbee), 1);
    }

    #[test]
    fn should_keep_protocol_namespaces_apart() {
        let registry = DeviceRegistry::new();

        let btle = registry.get_unique(Protocol::Btle, "0x0001", Attributes::new());
        let zigbee = registry.get_unique(Protocol::Zigbee, "0x0001", Attributes::new());

        assert!(!Arc::ptr_eq(&btle, &zigbee));
        assert_eq!(btle.protocol(), Protocol::Btle);
        assert_eq!(zigbee.protocol(), Protocol::Zigbee);
    }

    #[test]
    fn should_reject_unknown_protocol_name() {
        let registry = DeviceRegistry::new();

        assert_matches!(
            registry.get_unique_named("lora", "aabb", Attributes::new()),
            Err(SnoutError::UnknownProtocol { .. })
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn should_follow_rotated_address() {
        let registry = DeviceRegistry::new();
        let device = registry.get_unique(Protocol::Btle, "aabbccddeeff", Attributes::new());

        registry
            .reassign_identifier(&device, "112233445566")
            .unwrap();

        let by_new = registry.known(Protocol::Btle, "112233445566").unwrap();
        let by_old = registry.known(Protocol::Btle, "aabbccddeeff").unwrap();
        assert!(Arc::ptr_eq(&by_new, &by_old));
        assert_eq!(device.id(), "112233445566");
        assert_eq!(device.ids().len(), 2);
    }
}

mod binding_tests {
    use super::*;

    #[test]
    fn should_count_occurrences_per_sender() {
        let registry = DeviceRegistry::new();
        for number in 1..=3 {
            let line = CaptureLineBuilder::new().number(number).build();
            bind_line(&registry, &line);
        }
        bind_line(
            &registry,
            &CaptureLineBuilder::new().sender("001122334455").build(),
        );

        let recent = registry.recent_devices(Protocol::Btle);
        assert_eq!(recent.len(), 2);
        let busy = registry.known(Protocol::Btle, "aabbccddeeff").unwrap();
        assert_eq!(busy.occurrences(), 3);
    }

    #[test]
    fn should_resolve_message_sender_to_registry_device() {
        let registry = DeviceRegistry::new();
        let message = bind_line(&registry, SAMPLE_LINE);

        let sender = message.sender().unwrap();
        let known = registry.known(Protocol::Btle, "6385725ebfcd").unwrap();
        assert!(Arc::ptr_eq(&sender, &known));
        assert!(message.receiver().is_none());
    }
}

mod fingerprint_tests {
    use super::*;

    #[test]
    fn should_fingerprint_iphone() {
        let registry = DeviceRegistry::new();
        let message = bind_line(&registry, SAMPLE_LINE);
        let device = message.sender().unwrap();

        assert_eq!(device.vendor(), "Apple, Inc.");
        assert_eq!(device.os(), "iOS 12");
        assert_eq!(device.model(), "-");
    }

    #[test]
    fn should_fingerprint_known_accessories() {
        let registry = DeviceRegistry::new();
        let cases = [
            ("000000000001", payloads::AIRPODS, "Apple, Inc.", "AirPods", "-"),
            ("000000000002", payloads::FITBIT, "FitBit", "Charge / Charge HR", "-"),
            (
                "000000000003",
                payloads::WINDOWS,
                "Microsoft",
                "-",
                "Windows 10 >= v10.0.10240.0",
            ),
        ];

        for (sender, data, vendor, model, os) in cases {
            let line = CaptureLineBuilder::new().sender(sender).data(data).build();
            let device = bind_line(&registry, &line).sender().unwrap();

            assert_eq!(device.vendor(), vendor, "vendor of {sender}");
            assert_eq!(device.model(), model, "model of {sender}");
            assert_eq!(device.os(), os, "os of {sender}");
        }
    }

    #[test]
    fn should_prefer_configured_signatures() {
        let fingerprints = Fingerprinter::with_extra(vec![Signature::new(
            Trait::Model,
            Matcher::CompanyId { id: 0x0059 },
            Some("nRF52 dongle"),
        )]);
        let registry = DeviceRegistry::with_fingerprints(fingerprints);

        let line = CaptureLineBuilder::new().data(payloads::NORDIC).build();
        let device = bind_line(&registry, &line).sender().unwrap();

        assert_eq!(device.vendor(), "Nordic Semiconductor ASA");
        assert_eq!(device.model(), "nRF52 dongle");
    }

    #[test]
    fn should_summarise_device() {
        let registry = DeviceRegistry::new();
        bind_line(&registry, SAMPLE_LINE);

        let summary = registry.recent_devices(Protocol::Btle)[0].summary();
        assert_eq!(summary.id, "6385725ebfcd");
        assert_eq!(summary.occurrences, 1);
        assert_eq!(summary.os, "iOS 12");
        assert_eq!(summary.uptime_nice, "00:00");
    }
}
