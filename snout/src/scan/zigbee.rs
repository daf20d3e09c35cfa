//! Zigbee capture from a radio frame source

use super::{CancelFlag, ChannelOutcome, ScanDriver, ScanLimits, ScanOutcome, StopReason};
use crate::configuration::Configuration;
use crate::decoding::ZigbeeFrame;
use crate::errors::{Result, SnoutError};
use crate::message::Message;
use crate::radio::{FrameSource, RadioController, RadioMode};
use crate::registry::DeviceRegistry;
use bytes::Bytes;
use log::{info, warn};
use snout_common::Protocol;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Receive wait per poll.
pub const RECV_TIMEOUT: Duration = Duration::from_millis(250);

pub struct ZigbeeCapture<R, S> {
    radio: R,
    source: S,
    channels: Vec<u8>,
    limits: ScanLimits,
    cancel: CancelFlag,
    registry: Arc<DeviceRegistry>,
    has_fcs: bool,
    dump: Option<BufWriter<File>>,
    packets: Vec<Arc<Message>>,
}

impl<R, S> ZigbeeCapture<R, S>
where
    R: RadioController,
    S: FrameSource,
{
    pub fn new(
        config: &Configuration,
        radio: R,
        source: S,
        registry: Arc<DeviceRegistry>,
        cancel: CancelFlag,
    ) -> Result<Self> {
        let dump = match &config.capture.dump_file {
            Some(path) => Some(BufWriter::new(File::create(path)?)),
            None => None,
        };

        Ok(Self {
            radio,
            source,
            channels: config.capture.channels.clone(),
            limits: ScanLimits::from_config(config),
            cancel,
            registry,
            has_fcs: false,
            dump,
            packets: Vec::new(),
        })
    }

    /// Frames end with a two byte FCS that is checked and stripped.
    pub fn with_fcs(mut self, has_fcs: bool) -> Self {
        self.has_fcs = has_fcs;
        self
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Decodes and binds one frame. The dump file receives every decoded
    /// frame as a hex line.
    pub fn handle_frame(&mut self, channel: u8, raw: Bytes) -> Result<Option<Arc<Message>>> {
        let Some(frame) = ZigbeeFrame::decode(&raw, self.has_fcs) else {
            return Ok(None);
        };
        if frame.fcs_valid == Some(false) {
            warn!("Frame with bad FCS on channel {channel}");
        }

        if let Some(dump) = self.dump.as_mut() {
            writeln!(dump, "{}", hex::encode(&raw))?;
        }

        let zll = frame.zll_scan_response;
        let message = Message::from_zigbee_frame(frame, raw)
            .meta("channel", channel)
            .bind(&self.registry);
        if zll {
            if let Some(sender) = message.sender() {
                warn!("ZLL scan response from {} on channel {channel}", sender.id());
            }
        }

        self.packets.push(Arc::clone(&message));
        Ok(Some(message))
    }

    fn capture_channel(&mut self, channel: u8) -> Result<ChannelOutcome> {
        self.radio.set_channel(channel)?;
        info!("Capturing on channel {channel}");

        let started = Instant::now();
        let mut packets = 0usize;
        let stop_reason = loop {
            if let Some(reason) = self.limits.check(packets, started.elapsed(), &self.cancel) {
                break reason;
            }
            if self.source.is_finished() {
                break StopReason::SourceExhausted;
            }
            let wait = RECV_TIMEOUT.min(self.limits.timeout.saturating_sub(started.elapsed()));
            if let Some(raw) = self.source.recv_frame(wait)? {
                if self.handle_frame(channel, raw)?.is_some() {
                    packets += 1;
                }
            }
        };

        info!("Channel {channel}: {packets} packets, {stop_reason:?}");
        Ok(ChannelOutcome {
            channel,
            packets,
            stop_reason,
        })
    }
}

impl<R, S> ScanDriver for ZigbeeCapture<R, S>
where
    R: RadioController,
    S: FrameSource,
{
    fn protocol(&self) -> Protocol {
        Protocol::Zigbee
    }

    fn run(&mut self) -> Result<ScanOutcome> {
        if !self.radio.switch_mode(Protocol::Zigbee, RadioMode::Receive) {
            return Err(SnoutError::ConfigError {
                message: "radio cannot receive zigbee".to_string(),
            });
        }

        let started = Instant::now();
        let mut outcome = ScanOutcome::new(Protocol::Zigbee);
        for channel in self.channels.clone() {
            if self.cancel.is_cancelled() {
                break;
            }
            outcome.channels.push(self.capture_channel(channel)?);
        }

        if let Some(dump) = self.dump.as_mut() {
            dump.flush()?;
        }

        outcome.packets = self.packets.clone();
        outcome.elapsed = started.elapsed();
        info!(
            "Zigbee capture finished: {} frames from {} devices",
            outcome.total_packets(),
            self.registry.len(Protocol::Zigbee)
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::zigbee::fixtures;
    use crate::radio::{ReplaySource, StaticRadio};
    use assert_matches::assert_matches;

    fn zigbee_config(args: &[&str]) -> Configuration {
        let mut full = vec!["-p", "zigbee"];
        full.extend_from_slice(args);
        Configuration::builder().from_cli_args(&full).unwrap().build().unwrap()
    }

    fn replay(frames: Vec<Vec<u8>>) -> ReplaySource {
        ReplaySource::new(frames.into_iter().map(Bytes::from))
    }

    #[test]
    fn should_bind_frames_and_flag_zll_receiver() {
        let registry = Arc::new(DeviceRegistry::new());
        let source = replay(vec![
            fixtures::SHORT_DATA_FRAME.to_vec(),
            vec![0x02, 0x00], // truncated ack
            fixtures::zll_scan_response(),
        ]);
        let mut capture = ZigbeeCapture::new(
            &zigbee_config(&["-c", "15"]),
            StaticRadio::new(),
            source,
            Arc::clone(&registry),
            CancelFlag::new(),
        )
        .unwrap();

        let outcome = capture.run().unwrap();

        assert_eq!(outcome.total_packets(), 2);
        assert_eq!(outcome.channels[0].stop_reason, StopReason::SourceExhausted);
        assert_eq!(capture.radio().current_channel(), Some(15));

        let broadcast = registry.known(Protocol::Zigbee, "0xffff").unwrap();
        assert_eq!(broadcast.vulnerabilities().get("zll"), Some(&true));
        assert!(registry.known(Protocol::Zigbee, "0x0001").is_some());
        assert_eq!(outcome.packets[1].meta()["channel"], 15);
    }

    #[test]
    fn should_stop_at_packet_threshold() {
        let frames = vec![fixtures::SHORT_DATA_FRAME.to_vec(); 5];
        let mut capture = ZigbeeCapture::new(
            &zigbee_config(&["-n", "2"]),
            StaticRadio::new(),
            replay(frames),
            Arc::new(DeviceRegistry::new()),
            CancelFlag::new(),
        )
        .unwrap();

        let outcome = capture.run().unwrap();

        assert_eq!(outcome.channels[0].stop_reason, StopReason::PacketThreshold);
        assert_eq!(outcome.total_packets(), 2);
        assert_eq!(capture.source().remaining(), 3);
    }

    #[test]
    fn should_reject_channel_the_radio_cannot_tune() {
        let mut config = zigbee_config(&[]);
        config.capture.channels = vec![40];
        let mut capture = ZigbeeCapture::new(
            &config,
            StaticRadio::new(),
            replay(vec![]),
            Arc::new(DeviceRegistry::new()),
            CancelFlag::new(),
        )
        .unwrap();

        assert_matches!(capture.run(), Err(SnoutError::ConfigError { .. }));
    }

    #[test]
    fn should_write_decoded_frames_as_hex_lines() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("zigbee.hex");
        let mut config = zigbee_config(&[]);
        config.capture.dump_file = Some(dump.clone());
        let mut capture = ZigbeeCapture::new(
            &config,
            StaticRadio::new(),
            replay(vec![fixtures::SHORT_DATA_FRAME.to_vec()]),
            Arc::new(DeviceRegistry::new()),
            CancelFlag::new(),
        )
        .unwrap();

        capture.run().unwrap();

        let written = std::fs::read_to_string(&dump).unwrap();
        assert_eq!(written, "41882a621affff0100\n");
        let replayed = ReplaySource::from_hex_file(&dump).unwrap();
        assert_eq!(replayed.remaining(), 1);
    }
}
