//! Radio collaborators
//!
//! Hardware access sits behind two small traits. Scan drivers only tune
//! the radio and pull frames; everything vendor specific lives in the
//! implementations.

use crate::errors::{Result, SnoutError};
use bytes::Bytes;
use log::debug;
use snout_common::Protocol;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    Receive,
    Transmit,
    /// Full duplex, receive while transmitting.
    Transceive,
}

pub trait RadioController: Send {
    /// Returns false when the radio cannot serve `protocol` in `mode`.
    fn switch_mode(&mut self, protocol: Protocol, mode: RadioMode) -> bool;

    fn set_channel(&mut self, channel: u8) -> Result<()>;

    fn current_channel(&self) -> Option<u8>;
}

pub trait FrameSource: Send {
    /// `Ok(None)` when nothing arrived within `timeout`.
    fn recv_frame(&mut self, timeout: Duration) -> Result<Option<Bytes>>;

    fn send_frame(&mut self, frame: &[u8]) -> Result<()>;

    /// True once no further frame can arrive.
    fn is_finished(&self) -> bool {
        false
    }
}

/// Radio without tuning hardware. Accepts any channel valid for the
/// protocol it was switched to.
#[derive(Debug, Clone, Default)]
pub struct StaticRadio {
    protocol: Option<Protocol>,
    mode: Option<RadioMode>,
    channel: Option<u8>,
}

impl StaticRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Option<RadioMode> {
        self.mode
    }
}

impl RadioController for StaticRadio {
    fn switch_mode(&mut self, protocol: Protocol, mode: RadioMode) -> bool {
        debug!("Radio switched to {protocol} ({mode:?})");
        self.protocol = Some(protocol);
        self.mode = Some(mode);
        true
    }

    fn set_channel(&mut self, channel: u8) -> Result<()> {
        if let Some(protocol) = self.protocol {
            if !protocol.is_valid_channel(channel) {
                return Err(SnoutError::ConfigError {
                    message: format!("Channel {channel} is not valid for {protocol}"),
                });
            }
        }
        self.channel = Some(channel);
        Ok(())
    }

    fn current_channel(&self) -> Option<u8> {
        self.channel
    }
}

/// Frame source that replays recorded frames and keeps what was sent.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    frames: VecDeque<Bytes>,
    sent: Vec<Bytes>,
}

impl ReplaySource {
    pub fn new<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        Self {
            frames: frames.into_iter().collect(),
            sent: Vec::new(),
        }
    }

    /// One hex encoded frame per line. Blank lines and `#` comments are
    /// skipped.
    pub fn from_hex_lines(text: &str) -> Result<Self> {
        let frames = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                hex::decode(line)
                    .map(Bytes::from)
                    .map_err(|e| SnoutError::malformed(format!("bad hex frame {line:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(frames))
    }

    pub fn from_hex_file(path: &Path) -> Result<Self> {
        Self::from_hex_lines(&fs::read_to_string(path)?)
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn sent(&self) -> &[Bytes] {
        &self.sent
    }
}

impl FrameSource for ReplaySource {
    fn recv_frame(&mut self, _timeout: Duration) -> Result<Option<Bytes>> {
        Ok(self.frames.pop_front())
    }

    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.sent.push(Bytes::copy_from_slice(frame));
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }
}
