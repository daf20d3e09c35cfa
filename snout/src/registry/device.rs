//! A device seen on the air
//!
//! Derived views (`last_seen`, `uptime`, `vendor`, `activity`, ...) are
//! computed from the message logs on every call; nothing is cached.

use super::fingerprint::{Fingerprinter, Trait, UNKNOWN_TRAIT};
use super::Attributes;
use crate::message::Message;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use snout_common::Protocol;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

const ACTIVITY_DEPTH: usize = 3;

struct DeviceState {
    ids: Vec<String>,
    sent: Vec<Arc<Message>>,
    received: Vec<Arc<Message>>,
    attributes: Attributes,
    vulnerabilities: BTreeMap<String, bool>,
}

pub struct Device {
    protocol: Protocol,
    fingerprints: Arc<Fingerprinter>,
    state: RwLock<DeviceState>,
}

impl Device {
    pub(crate) fn new(
        protocol: Protocol,
        id: String,
        attributes: Attributes,
        fingerprints: Arc<Fingerprinter>,
    ) -> Self {
        Self {
            protocol,
            fingerprints,
            state: RwLock::new(DeviceState {
                ids: vec![id],
                sent: Vec::new(),
                received: Vec::new(),
                attributes,
                vulnerabilities: BTreeMap::new(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DeviceState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DeviceState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Current identifier, the most recently assigned one.
    pub fn id(&self) -> String {
        self.read().ids.last().cloned().unwrap_or_default()
    }

    pub fn ids(&self) -> Vec<String> {
        self.read().ids.clone()
    }

    pub(crate) fn push_id(&self, id: String) {
        self.write().ids.push(id);
    }

    /// Merges `attributes` into the attribute map, overwriting per key.
    pub fn update(&self, attributes: Attributes) {
        if attributes.is_empty() {
            return;
        }
        self.write().attributes.extend(attributes);
    }

    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.read().attributes.get(key).cloned()
    }

    pub fn attributes(&self) -> Attributes {
        self.read().attributes.clone()
    }

    /// Flags never revert: once a vulnerability is seen it stays set.
    pub fn set_vulnerability(&self, name: &str, vulnerable: bool) {
        let mut state = self.write();
        let flag = state.vulnerabilities.entry(name.to_string()).or_insert(false);
        *flag |= vulnerable;
    }

    pub(crate) fn merge_vulnerabilities(&self, flags: &BTreeMap<String, bool>) {
        let mut state = self.write();
        for (name, vulnerable) in flags {
            let flag = state.vulnerabilities.entry(name.clone()).or_insert(false);
            *flag |= *vulnerable;
        }
    }

    pub fn vulnerabilities(&self) -> BTreeMap<String, bool> {
        self.read().vulnerabilities.clone()
    }

    pub(crate) fn push_sent(&self, message: Arc<Message>) {
        self.write().sent.push(message);
    }

    pub(crate) fn push_received(&self, message: Arc<Message>) {
        self.write().received.push(message);
    }

    pub fn sent_messages(&self) -> Vec<Arc<Message>> {
        self.read().sent.clone()
    }

    pub fn received_messages(&self) -> Vec<Arc<Message>> {
        self.read().received.clone()
    }

    pub fn occurrences(&self) -> usize {
        self.read().sent.len()
    }

    /// Timestamp of the newest sent message, 0 when nothing was sent.
    pub fn last_seen(&self) -> f64 {
        self.read().sent.last().map_or(0.0, |m| m.timestamp())
    }

    /// Seconds between first and last sent message, -1 when nothing was sent.
    pub fn uptime(&self) -> i64 {
        let state = self.read();
        match (state.sent.first(), state.sent.last()) {
            (Some(first), Some(last)) => (last.timestamp() - first.timestamp()).round() as i64,
            _ => -1,
        }
    }

    pub fn uptime_nice(&self) -> String {
        format_uptime(self.uptime())
    }

    pub fn last_seen_nice(&self) -> String {
        self.last_seen_nice_at(Utc::now())
    }

    pub fn last_seen_nice_at(&self, now: DateTime<Utc>) -> String {
        if self.occurrences() == 0 {
            return UNKNOWN_TRAIT.to_string();
        }
        time_ago(self.last_seen(), now)
    }

    fn fingerprint(&self, target: Trait) -> String {
        let sent = self.sent_messages();
        self.fingerprints.resolve_or_unknown(target, &sent)
    }

    pub fn vendor(&self) -> String {
        self.fingerprint(Trait::Vendor)
    }

    pub fn model(&self) -> String {
        self.fingerprint(Trait::Model)
    }

    pub fn os(&self) -> String {
        self.fingerprint(Trait::Os)
    }

    /// Nearby action codes seen in sent messages, consecutive repeats
    /// collapsed, newest [`ACTIVITY_DEPTH`] kept, oldest first.
    pub fn activities(&self) -> Vec<(f64, &'static str)> {
        let mut activities: Vec<(f64, &'static str)> = Vec::new();
        for message in self.sent_messages() {
            let Some(payload) = message.payload().advertising() else {
                continue;
            };
            for nearby in payload.apple_records().iter().filter_map(|r| r.nearby()) {
                let text = nearby.action_code_text;
                if activities.last().map(|(_, prev)| *prev) != Some(text) {
                    activities.push((message.timestamp(), text));
                }
            }
        }
        let skip = activities.len().saturating_sub(ACTIVITY_DEPTH);
        activities.split_off(skip)
    }

    pub fn activity(&self) -> String {
        self.activity_at(Utc::now())
    }

    pub fn activity_at(&self, now: DateTime<Utc>) -> String {
        let activities = self.activities();
        if activities.is_empty() {
            return UNKNOWN_TRAIT.to_string();
        }
        activities
            .iter()
            .map(|(ts, text)| format!("{}: {}", time_ago(*ts, now), text))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn summary(&self) -> DeviceSummary {
        let now = Utc::now();
        let messages_received = self.read().received.len();
        DeviceSummary {
            protocol: self.protocol,
            id: self.id(),
            ids: self.ids(),
            vendor: self.vendor(),
            model: self.model(),
            os: self.os(),
            occurrences: self.occurrences(),
            messages_received,
            last_seen: self.last_seen(),
            last_seen_nice: self.last_seen_nice_at(now),
            uptime: self.uptime(),
            uptime_nice: self.uptime_nice(),
            activity: self.activity_at(now),
            attributes: self.attributes().into_iter().collect(),
            vulnerabilities: self.vulnerabilities(),
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("protocol", &self.protocol)
            .field("ids", &self.ids())
            .field("occurrences", &self.occurrences())
            .finish()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.protocol, self.id())
    }
}

/// Read-only view of a device for rendering and export.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub protocol: Protocol,
    pub id: String,
    pub ids: Vec<String>,
    pub vendor: String,
    pub model: String,
    pub os: String,
    pub occurrences: usize,
    pub messages_received: usize,
    pub last_seen: f64,
    pub last_seen_nice: String,
    pub uptime: i64,
    pub uptime_nice: String,
    pub activity: String,
    pub attributes: BTreeMap<String, Value>,
    pub vulnerabilities: BTreeMap<String, bool>,
}

/// `MM:SS`, or `HH:MM:SS` past one hour; `-` when unknown.
fn format_uptime(uptime: i64) -> String {
    if uptime < 0 {
        return UNKNOWN_TRAIT.to_string();
    }
    let (hours, minutes, seconds) = (uptime / 3600, (uptime % 3600) / 60, uptime % 60);
    if uptime > 3600 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", uptime / 60, seconds)
    }
}

fn time_ago(timestamp: f64, now: DateTime<Utc>) -> String {
    let then_ms = (timestamp * 1000.0) as i64;
    let elapsed = Duration::milliseconds((now.timestamp_millis() - then_ms).max(0));

    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    };

    if elapsed.num_seconds() < 10 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 1 {
        plural(elapsed.num_seconds(), "second")
    } else if elapsed.num_hours() < 1 {
        plural(elapsed.num_minutes(), "minute")
    } else if elapsed.num_days() < 1 {
        plural(elapsed.num_hours(), "hour")
    } else {
        plural(elapsed.num_days(), "day")
    }
}
