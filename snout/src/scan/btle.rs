//! BTLE advertising scan driven by an external `btle_rx` process

use super::{CancelFlag, ChannelOutcome, ScanDriver, ScanLimits, ScanOutcome, StopReason, IDLE_POLL};
use crate::configuration::Configuration;
use crate::errors::Result;
use crate::message::Message;
use crate::process::{CommandSpec, OutputStream, ProcessSupervisor, ReadMode, ReadResult};
use crate::radio::{RadioController, RadioMode};
use crate::registry::DeviceRegistry;
use log::{debug, info, warn};
use snout_common::Protocol;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

type CommandFactory = Box<dyn Fn(u8) -> CommandSpec + Send>;

pub struct BtleScan {
    channels: Vec<u8>,
    limits: ScanLimits,
    cancel: CancelFlag,
    registry: Arc<DeviceRegistry>,
    supervisor: ProcessSupervisor,
    command_for: CommandFactory,
    radio: Option<Box<dyn RadioController>>,
    dump: Option<BufWriter<File>>,
    packets: Vec<Arc<Message>>,
}

impl BtleScan {
    /// Opens (truncating) the dump file when one is configured.
    pub fn new(config: &Configuration, registry: Arc<DeviceRegistry>, cancel: CancelFlag) -> Result<Self> {
        let dump = match &config.capture.dump_file {
            Some(path) => Some(BufWriter::new(File::create(path)?)),
            None => None,
        };
        let command_config = config.clone();

        Ok(Self {
            channels: config.capture.channels.clone(),
            limits: ScanLimits::from_config(config),
            cancel,
            registry,
            supervisor: ProcessSupervisor::new(config.termination_policy()),
            command_for: Box::new(move |channel| command_config.btle_command(channel)),
            radio: None,
            dump,
            packets: Vec::new(),
        })
    }

    pub fn with_radio(mut self, radio: Box<dyn RadioController>) -> Self {
        self.radio = Some(radio);
        self
    }

    /// Replaces the per-channel capture command.
    pub fn with_command<F>(mut self, command_for: F) -> Self
    where
        F: Fn(u8) -> CommandSpec + Send + 'static,
    {
        self.command_for = Box::new(command_for);
        self
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn packets(&self) -> &[Arc<Message>] {
        &self.packets
    }

    /// Decodes one capture line, dumps it and binds the message. Lines
    /// that do not decode are dropped without touching the dump file.
    pub fn handle_packet(&mut self, line: &[u8]) -> Result<Option<Arc<Message>>> {
        let Some(builder) = Message::from_btle_line(line) else {
            return Ok(None);
        };

        if let Some(dump) = self.dump.as_mut() {
            dump.write_all(line)?;
            if !line.ends_with(b"\n") {
                dump.write_all(b"\n")?;
            }
        }

        let message = builder.bind(&self.registry);
        self.packets.push(Arc::clone(&message));
        Ok(Some(message))
    }

    /// Stops the capture process once a limit is reached.
    pub fn check_stop(&mut self, channel_packets: usize) -> Result<Option<StopReason>> {
        let elapsed = self.supervisor.elapsed().unwrap_or_default();
        let reason = self.limits.check(channel_packets, elapsed, &self.cancel);
        if let Some(reason) = reason {
            debug!("Stopping capture: {reason:?}");
            self.supervisor.stop()?;
        }
        Ok(reason)
    }

    fn scan_channel(&mut self, channel: u8) -> Result<ChannelOutcome> {
        if let Some(radio) = self.radio.as_mut() {
            if !radio.switch_mode(Protocol::Btle, RadioMode::Receive) {
                warn!("Radio refused BTLE receive mode, capturing anyway");
            }
        }

        self.supervisor.configure((self.command_for)(channel));
        self.supervisor.start()?;
        info!("Capturing on channel {channel}");

        let mut packets = 0usize;
        let captured = self.capture_until_stop(&mut packets);
        let stopped = self.supervisor.stop();
        let stop_reason = captured?;
        let state = stopped?;
        if stop_reason != StopReason::PacketThreshold {
            packets += self.drain_relayed()?;
        }
        for line in self.supervisor.read_all(OutputStream::Stderr) {
            debug!("btle_rx: {}", String::from_utf8_lossy(&line).trim_end());
        }

        info!("Channel {channel}: {packets} packets, capture {state}, {stop_reason:?}");
        Ok(ChannelOutcome {
            channel,
            packets,
            stop_reason,
        })
    }

    /// Reads capture lines until the tool exits or a limit is hit. The
    /// caller stops the supervisor whatever this returns.
    fn capture_until_stop(&mut self, packets: &mut usize) -> Result<StopReason> {
        loop {
            match self.supervisor.read_line(OutputStream::Stdout, ReadMode::NonBlocking) {
                ReadResult::Line(line) => {
                    if self.handle_packet(&line)?.is_some() {
                        *packets += 1;
                    }
                }
                ReadResult::NoData => thread::sleep(IDLE_POLL),
                ReadResult::Eof => return Ok(StopReason::SourceExhausted),
            }
            if let Some(reason) = self.check_stop(*packets)? {
                return Ok(reason);
            }
        }
    }

    fn flush_dump(&mut self) -> Result<()> {
        if let Some(dump) = self.dump.as_mut() {
            dump.flush()?;
        }
        Ok(())
    }

    fn drain_relayed(&mut self) -> Result<usize> {
        let mut handled = 0;
        for line in self.supervisor.read_all(OutputStream::Stdout) {
            if self.handle_packet(&line)?.is_some() {
                handled += 1;
            }
        }
        Ok(handled)
    }
}

impl ScanDriver for BtleScan {
    fn protocol(&self) -> Protocol {
        Protocol::Btle
    }

    fn run(&mut self) -> Result<ScanOutcome> {
        let started = Instant::now();
        let mut outcome = ScanOutcome::new(Protocol::Btle);

        for channel in self.channels.clone() {
            if self.cancel.is_cancelled() {
                break;
            }
            outcome.channels.push(self.scan_channel(channel)?);
        }

        self.flush_dump()?;

        outcome.packets = self.packets.clone();
        outcome.elapsed = started.elapsed();
        info!(
            "BTLE scan finished: {} packets from {} devices in {:.1}s",
            outcome.total_packets(),
            self.registry.len(Protocol::Btle),
            outcome.elapsed.as_secs_f64()
        );
        Ok(outcome)
    }
}
