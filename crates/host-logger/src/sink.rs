// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Destination of the console output, chosen once from the configured mode.

use tracing::{debug, error};

use crate::config::{Config, Mode};
use crate::constants::STREAM_MESSAGE_MAX;
use crate::errors::TransportError;
use crate::file_storage::{flush_buffer, FileStorage};
use crate::forwarder::StreamForwarder;
use crate::log_buffer::LogBuffer;
use crate::segmenter::Segmenter;

#[derive(Debug)]
pub enum Sink {
    Buffered(BufferedSink),
    Forwarding(ForwardingSink),
}

impl Sink {
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        match config.mode {
            Mode::Buffer => Ok(Sink::Buffered(BufferedSink::new(config))),
            Mode::Stream => Ok(Sink::Forwarding(ForwardingSink::new(
                StreamForwarder::new(&config.stream_destination)?,
            ))),
        }
    }

    /// Feed a chunk of console output.
    pub fn consume(&mut self, data: &[u8]) {
        match self {
            Sink::Buffered(sink) => sink.consume(data),
            Sink::Forwarding(sink) => sink.consume(data),
        }
    }

    /// Persist what was collected so far.
    pub fn flush(&mut self) {
        match self {
            Sink::Buffered(sink) => sink.flush(),
            Sink::Forwarding(_) => debug!("Ignore flush: stream mode"),
        }
    }

    /// Last call before shutdown.
    pub fn finish(&mut self) {
        match self {
            Sink::Buffered(sink) => sink.finish(),
            Sink::Forwarding(sink) => sink.finish(),
        }
    }
}

/// Buffer mode: bounded in-memory window, saved to files on flush.
#[derive(Debug)]
pub struct BufferedSink {
    buffer: LogBuffer,
    storage: FileStorage,
}

impl BufferedSink {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let storage = FileStorage::new(&config.out_dir, config.max_files);
        let mut buffer = LogBuffer::new(config.buf_max_size, config.buf_max_time);
        if config.buf_flush_full {
            let storage = storage.clone();
            buffer.set_full_handler(move |buffer| flush_buffer(buffer, &storage));
        }
        BufferedSink { buffer, storage }
    }

    #[must_use]
    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn consume(&mut self, data: &[u8]) {
        self.buffer.append(data);
    }

    pub fn flush(&mut self) {
        flush_buffer(&mut self.buffer, &self.storage);
    }

    /// Save the remaining messages, if any.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            self.flush();
        }
    }
}

/// Stream mode: every complete line is sent as soon as its terminator
/// arrives. An unterminated tail is held back until then, at most
/// [`STREAM_MESSAGE_MAX`] bytes of it; a longer line goes out in pieces.
#[derive(Debug)]
pub struct ForwardingSink {
    forwarder: StreamForwarder,
    segmenter: Segmenter,
    pending: Vec<u8>,
}

impl ForwardingSink {
    #[must_use]
    pub fn new(forwarder: StreamForwarder) -> Self {
        ForwardingSink {
            forwarder,
            segmenter: Segmenter::new(),
            pending: Vec::new(),
        }
    }

    pub fn consume(&mut self, data: &[u8]) {
        let ForwardingSink {
            forwarder,
            segmenter,
            pending,
        } = self;

        segmenter.split(data, |fragment| {
            if !fragment.text.is_empty() {
                if !fragment.continues {
                    pending.clear();
                }
                pending.extend_from_slice(&fragment.text);
            }
            while pending.len() >= STREAM_MESSAGE_MAX {
                let rest = pending.split_off(STREAM_MESSAGE_MAX);
                send(forwarder, pending);
                *pending = rest;
            }
            if fragment.terminated && !pending.is_empty() {
                send(forwarder, pending);
                pending.clear();
            }
        });
    }

    /// Send the held back partial line.
    pub fn finish(&mut self) {
        if !self.pending.is_empty() {
            send(&self.forwarder, &self.pending);
            self.pending.clear();
        }
        self.segmenter.reset();
    }
}

// a failed line is dropped
fn send(forwarder: &StreamForwarder, line: &[u8]) {
    if let Err(err) = forwarder.send(line) {
        error!("{err}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixDatagram;
    use std::path::Path;
    use std::time::Duration;
    use tracing_test::traced_test;

    fn receive_all(receiver: &UnixDatagram) -> Vec<Vec<u8>> {
        receiver.set_nonblocking(true).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 256];
        while let Ok(n) = receiver.recv(&mut buf) {
            out.push(buf[..n].to_vec());
        }
        out
    }

    fn forwarding(path: &Path) -> ForwardingSink {
        ForwardingSink::new(StreamForwarder::new(path.to_str().unwrap()).unwrap())
    }

    fn buffer_config(out_dir: &Path) -> Config {
        Config {
            out_dir: out_dir.to_str().unwrap().to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_forwarding_complete_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dst");
        let receiver = UnixDatagram::bind(&path).unwrap();
        let mut sink = forwarding(&path);

        sink.consume(b"one\r\ntw");
        assert_eq!(receive_all(&receiver), vec![b"one".to_vec()]);

        sink.consume(b"o\n\nthree\n");
        assert_eq!(
            receive_all(&receiver),
            vec![b"two".to_vec(), b"three".to_vec()]
        );
    }

    #[test]
    fn test_forwarding_finish_sends_partial_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dst");
        let receiver = UnixDatagram::bind(&path).unwrap();
        let mut sink = forwarding(&path);

        sink.consume(b"partial");
        assert!(receive_all(&receiver).is_empty());

        sink.finish();
        assert_eq!(receive_all(&receiver), vec![b"partial".to_vec()]);
    }

    #[test]
    fn test_forwarding_long_line_is_split() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dst");
        let receiver = UnixDatagram::bind(&path).unwrap();
        let mut sink = forwarding(&path);

        // progress bar redrawn with bare carriage returns, no line feed
        let mut sent = Vec::new();
        for i in 0..200 {
            let update = format!("\rProgress {i:06} .....");
            sink.consume(update.as_bytes());
            sent.extend_from_slice(update.as_bytes());
        }

        let mut buf = vec![0u8; 2 * STREAM_MESSAGE_MAX];
        receiver.set_nonblocking(true).unwrap();
        let mut received = Vec::new();
        while let Ok(n) = receiver.recv(&mut buf) {
            assert_eq!(n, STREAM_MESSAGE_MAX);
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received.len(), sent.len() / STREAM_MESSAGE_MAX * STREAM_MESSAGE_MAX);

        sink.consume(b"\n");
        let n = receiver.recv(&mut buf).unwrap();
        assert!(n > 0 && n < STREAM_MESSAGE_MAX);
        received.extend_from_slice(&buf[..n]);
        assert_eq!(received, sent);
    }

    #[test]
    #[traced_test]
    fn test_forwarding_error_drops_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dst");
        let mut sink = forwarding(&path);

        sink.consume(b"lost\n");
        assert!(logs_contain("Unable to send to the destination"));

        let receiver = UnixDatagram::bind(&path).unwrap();
        sink.consume(b"next\n");
        assert_eq!(receive_all(&receiver), vec![b"next".to_vec()]);
    }

    #[test]
    fn test_sink_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::from_config(&buffer_config(dir.path())).unwrap();
        assert!(matches!(sink, Sink::Buffered(_)));

        let config = Config {
            mode: Mode::Stream,
            stream_destination: dir.path().join("dst").to_str().unwrap().to_string(),
            ..Default::default()
        };
        let sink = Sink::from_config(&config).unwrap();
        assert!(matches!(sink, Sink::Forwarding(_)));
    }

    #[test]
    fn test_buffered_flush() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = BufferedSink::new(&buffer_config(dir.path()));

        sink.consume(b"line\n");
        assert_eq!(sink.buffer().len(), 1);

        sink.flush();
        assert!(sink.buffer().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_buffered_finish_empty() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("logs");
        let mut sink = BufferedSink::new(&buffer_config(&out_dir));

        sink.finish();
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_buffered_flush_on_full() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            buf_max_size: 3,
            buf_flush_full: true,
            ..buffer_config(dir.path())
        };
        let mut sink = BufferedSink::new(&config);

        sink.consume(b"1\n2\n3\n");
        assert_eq!(sink.buffer().len(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        sink.consume(b"4\n");
        assert!(sink.buffer().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_buffered_drops_without_flush_on_full() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            buf_max_size: 2,
            buf_max_time: Duration::ZERO,
            ..buffer_config(dir.path())
        };
        let mut sink = BufferedSink::new(&config);

        sink.consume(b"1\n2\n3\n");

        let texts: Vec<_> = sink.buffer().iter().map(|m| m.text().into_owned()).collect();
        assert_eq!(texts, vec!["2", "3"]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
