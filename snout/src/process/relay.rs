//! Pipe relays
//!
//! A relay owns one pipe of a child process and moves its output into an
//! unbounded queue from a dedicated OS thread, so the consumer can choose
//! between waiting and polling without ever blocking the child on a full
//! pipe buffer.

use bytes::Bytes;
use log::debug;
use std::io::{self, BufRead, BufReader, Read};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

/// How the relay splits the byte stream into queue items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Newline-terminated lines, newline kept.
    #[default]
    Lines,
    /// Reads of at most the given number of bytes.
    Chunks(usize),
}

/// Outcome of a single read from a relay or supervised stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult<T = Bytes> {
    Line(T),
    /// Nothing queued right now, the stream is still open.
    NoData,
    /// The relay finished and its queue is drained.
    Eof,
}

impl<T> ReadResult<T> {
    pub fn into_line(self) -> Option<T> {
        match self {
            ReadResult::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, ReadResult::Eof)
    }
}

pub struct IoRelay {
    name: String,
    rx: UnboundedReceiver<Bytes>,
    worker: Option<JoinHandle<()>>,
}

impl IoRelay {
    pub fn spawn<R>(name: &str, pipe: R, framing: Framing) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let thread_name = name.to_string();

        let worker = thread::Builder::new()
            .name(format!("relay-{name}"))
            .spawn(move || {
                let mut reader = BufReader::new(pipe);
                let mut forwarded = 0usize;
                loop {
                    match next_item(&mut reader, framing) {
                        Ok(Some(item)) => {
                            if tx.send(item).is_err() {
                                break;
                            }
                            forwarded += 1;
                        }
                        Ok(None) => break,
                        Err(e) => {
                            debug!("relay {thread_name}: read error: {e}");
                            break;
                        }
                    }
                }
                debug!("relay {thread_name} finished after {forwarded} items");
            })?;

        debug!("relay {name} started");
        Ok(Self {
            name: name.to_string(),
            rx,
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn try_read(&mut self) -> ReadResult {
        match self.rx.try_recv() {
            Ok(item) => ReadResult::Line(item),
            Err(TryRecvError::Empty) => ReadResult::NoData,
            Err(TryRecvError::Disconnected) => ReadResult::Eof,
        }
    }

    /// Waits for the next item. Must not be called from an async task.
    pub fn read_blocking(&mut self) -> ReadResult {
        match self.rx.blocking_recv() {
            Some(item) => ReadResult::Line(item),
            None => ReadResult::Eof,
        }
    }

    /// Everything queued right now, without waiting.
    pub fn drain(&mut self) -> Vec<Bytes> {
        let mut items = Vec::new();
        while let ReadResult::Line(item) = self.try_read() {
            items.push(item);
        }
        items
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for IoRelay {
    fn drop(&mut self) {
        self.rx.close();
        // A worker blocked on a pipe whose writer is still alive would hang
        // the join, so only reap threads that already ended.
        if let Some(worker) = self.worker.take() {
            if worker.is_finished() {
                let _ = worker.join();
            }
        }
    }
}

fn next_item<R: BufRead>(reader: &mut R, framing: Framing) -> io::Result<Option<Bytes>> {
    loop {
        let result = match framing {
            Framing::Lines => {
                let mut line = Vec::new();
                reader.read_until(b'\n', &mut line).map(|n| (n, line))
            }
            Framing::Chunks(size) => {
                let mut chunk = vec![0u8; size.max(1)];
                reader.read(&mut chunk).map(|n| {
                    chunk.truncate(n);
                    (n, chunk)
                })
            }
        };

        return match result {
            Ok((0, _)) => Ok(None),
            Ok((_, data)) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Err(e),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    fn wait_until_finished(relay: &IoRelay) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !relay.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    mod line_framing_tests {
        use super::*;

        #[test]
        fn should_relay_lines_in_order_and_keep_newlines() {
            let pipe = Cursor::new(b"first\nsecond\nlast".to_vec());
            let mut relay = IoRelay::spawn("test", pipe, Framing::Lines).unwrap();

            assert_eq!(relay.read_blocking(), ReadResult::Line(Bytes::from_static(b"first\n")));
            assert_eq!(relay.read_blocking(), ReadResult::Line(Bytes::from_static(b"second\n")));
            assert_eq!(relay.read_blocking(), ReadResult::Line(Bytes::from_static(b"last")));
            assert_eq!(relay.read_blocking(), ReadResult::Eof);
        }

        #[test]
        fn should_distinguish_eof_from_no_data() {
            let mut relay = IoRelay::spawn("empty", Cursor::new(Vec::new()), Framing::Lines).unwrap();
            wait_until_finished(&relay);

            assert_matches!(relay.try_read(), ReadResult::Eof);
        }

        #[test]
        fn should_drain_queued_lines() {
            let pipe = Cursor::new(b"a\nb\nc\n".to_vec());
            let mut relay = IoRelay::spawn("drain", pipe, Framing::Lines).unwrap();
            wait_until_finished(&relay);
            assert_eq!(relay.name(), "drain");

            let items = relay.drain();
            assert_eq!(items.len(), 3);
            assert_eq!(&items[2][..], b"c\n");
        }
    }

    mod chunk_framing_tests {
        use super::*;

        #[test]
        fn should_split_stream_into_bounded_chunks() {
            let pipe = Cursor::new(b"abcdefg".to_vec());
            let mut relay = IoRelay::spawn("chunks", pipe, Framing::Chunks(3)).unwrap();

            let mut collected = Vec::new();
            while let ReadResult::Line(chunk) = relay.read_blocking() {
                assert!(chunk.len() <= 3);
                collected.extend_from_slice(&chunk);
            }
            assert_eq!(collected, b"abcdefg");
        }
    }

    #[test]
    fn should_convert_read_result_into_line() {
        assert_eq!(ReadResult::Line(3).into_line(), Some(3));
        assert_eq!(ReadResult::<u8>::NoData.into_line(), None);
        assert!(ReadResult::<u8>::Eof.is_eof());
    }
}
