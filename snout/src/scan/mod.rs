//! Scan drivers
//!
//! A driver walks the configured channels, turns whatever the capture path
//! produces into bound [`Message`]s and decides when to move on. Drivers
//! are blocking; the binary runs them on `spawn_blocking` and raises the
//! shared cancel flag on Ctrl+C.

pub mod btle;
pub mod zigbee;

pub use btle::BtleScan;
pub use zigbee::ZigbeeCapture;

use crate::configuration::Configuration;
use crate::errors::Result;
use crate::message::Message;
use snout_common::Protocol;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Pause between empty non-blocking reads.
pub const IDLE_POLL: Duration = Duration::from_millis(10);

pub trait ScanDriver {
    fn protocol(&self) -> Protocol;

    /// Scans every configured channel in order.
    fn run(&mut self) -> Result<ScanOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PacketThreshold,
    Timeout,
    Cancelled,
    /// The capture path ran dry before any limit was hit.
    SourceExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub timeout: Duration,
    /// Per channel. `None` is unlimited.
    pub packet_threshold: Option<usize>,
}

impl ScanLimits {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            timeout: config.capture.timeout(),
            packet_threshold: config.capture.packet_threshold,
        }
    }

    pub fn check(&self, packets: usize, elapsed: Duration, cancel: &CancelFlag) -> Option<StopReason> {
        if cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }
        if self.packet_threshold.is_some_and(|limit| packets >= limit) {
            return Some(StopReason::PacketThreshold);
        }
        if elapsed >= self.timeout {
            return Some(StopReason::Timeout);
        }
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: u8,
    pub packets: usize,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub protocol: Protocol,
    pub packets: Vec<Arc<Message>>,
    pub channels: Vec<ChannelOutcome>,
    pub elapsed: Duration,
}

impl ScanOutcome {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            packets: Vec::new(),
            channels: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn total_packets(&self) -> usize {
        self.packets.len()
    }

    pub fn per_channel(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.channels {
            *counts.entry(outcome.channel).or_insert(0) += outcome.packets;
        }
        counts
    }

    pub fn was_cancelled(&self) -> bool {
        self.channels
            .iter()
            .any(|c| c.stop_reason == StopReason::Cancelled)
    }
}
