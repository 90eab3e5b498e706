//! Line-oriented request/response transport over a [`SerialChannel`].
//!
//! Lines are ASCII. Characters outside ASCII are written as `?`, and received bytes above
//! `0x7F` are read back as `?`. A received line ends at the last byte of the configured
//! terminator, so a transport configured for `"\r\n"` still accepts devices that answer with a
//! bare `"\n"`; surrounding whitespace (including any `'\r'`) is stripped from what is returned.

use std::{
    thread,
    time::{Duration, Instant},
};

use embedded_io::{Error as _, Read, Write};
use tracing::{debug, warn};

use crate::{
    channel::{Connector, SerialChannel, is_idle},
    error::{Error, Result},
    serial::SerialConfig,
};

/// Pause between writing a query and the first read attempt.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);
/// Pause between empty polls in [`LineTransport::send_and_receive`].
pub const POLL_BACKOFF: Duration = Duration::from_millis(20);
/// Shortest polling window, whatever the configured read timeout.
pub const MIN_POLL_WINDOW: Duration = Duration::from_secs(1);

/// Pause between idle channel reads inside a single `read_line`.
const IDLE_READ_BACKOFF: Duration = Duration::from_millis(5);
const READ_CHUNK: usize = 64;

type ChannelError<C> = <<C as Connector>::Channel as embedded_io::ErrorType>::Error;

/// The write and exchange operations a pipeline needs from a transport.
pub trait LineIo {
    type Error: embedded_io::Error;

    fn write_line(&mut self, text: &str) -> Result<(), Self::Error>;

    /// Write `text` and wait for one reply line. An empty reply means nothing arrived in time.
    fn send_and_receive(&mut self, text: &str) -> Result<String, Self::Error>;
}

/// Owns one serial channel and exchanges terminated text lines over it.
///
/// Starts closed. Every I/O operation fails with [`Error::NotOpen`] until [`Self::open`]
/// succeeds. Exclusive `&mut` access serialises all use of the underlying channel.
pub struct LineTransport<C: Connector> {
    connector: C,
    config: SerialConfig,
    channel: Option<C::Channel>,
    /// Bytes received after the last returned line.
    pending: Vec<u8>,
}

impl<C: Connector> LineTransport<C> {
    pub fn new(config: SerialConfig, connector: C) -> Self {
        Self {
            connector,
            config,
            channel: None,
            pending: Vec::new(),
        }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Acquire the channel. Does nothing if already open.
    ///
    /// Stale input and output are discarded on a best-effort basis once the channel is up.
    pub fn open(&mut self) -> Result<(), ChannelError<C>> {
        if self.channel.is_some() {
            return Ok(());
        }

        let mut channel = self
            .connector
            .connect(&self.config)
            .map_err(Error::TransportOpenFailed)?;

        if let Err(err) = channel.clear_input() {
            warn!(error = ?err, "Failed to clear input buffer after open");
        }
        if let Err(err) = channel.clear_output() {
            warn!(error = ?err, "Failed to clear output buffer after open");
        }

        debug!(
            port = self.config.port(),
            baud = self.config.baud_rate(),
            "Serial port opened"
        );
        self.pending.clear();
        self.channel = Some(channel);
        Ok(())
    }

    /// Release the channel. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.channel.take().is_some() {
            debug!(port = self.config.port(), "Serial port closed");
        }
        self.pending.clear();
    }

    /// Write `text` followed by the line terminator, then flush.
    pub fn write_line(&mut self, text: &str) -> Result<(), ChannelError<C>> {
        let payload = encode_line(text, self.config.newline());
        let channel = self.channel.as_mut().ok_or(Error::NotOpen)?;
        channel.write_all(&payload).map_err(Error::WriteFailed)?;
        channel.flush().map_err(Error::WriteFailed)
    }

    /// Read one line, waiting at most the configured read timeout.
    ///
    /// Returns an empty string if nothing arrived, or whatever partial line had arrived when
    /// the timeout ran out.
    pub fn read_line(&mut self) -> Result<String, ChannelError<C>> {
        let deadline = Instant::now() + self.config.read_timeout();
        self.read_line_until(deadline)
    }

    /// [`Self::send_and_receive_with_settle`] with [`DEFAULT_SETTLE`].
    pub fn send_and_receive(&mut self, text: &str) -> Result<String, ChannelError<C>> {
        self.send_and_receive_with_settle(text, DEFAULT_SETTLE)
    }

    /// Write a query and poll for its reply.
    ///
    /// Input buffered before the write is discarded and DTR is held high for the duration
    /// of the exchange. After `settle`, reads are retried every [`POLL_BACKOFF`] until a
    /// non-empty line arrives or `max(read timeout, MIN_POLL_WINDOW)` has passed since
    /// polling began. Running out of time is not an error: the result is then empty.
    pub fn send_and_receive_with_settle(
        &mut self,
        text: &str,
        settle: Duration,
    ) -> Result<String, ChannelError<C>> {
        let channel = self.channel.as_mut().ok_or(Error::NotOpen)?;

        if let Err(err) = channel.clear_input() {
            warn!(error = ?err, "Failed to clear input buffer before exchange");
        }
        self.pending.clear();

        if let Err(err) = channel.set_dtr(true) {
            warn!(error = ?err, "Failed to assert DTR");
        }

        let outcome = self.exchange(text, settle);

        if let Some(channel) = self.channel.as_mut()
            && let Err(err) = channel.set_dtr(false)
        {
            warn!(error = ?err, "Failed to release DTR");
        }

        outcome
    }

    fn exchange(&mut self, text: &str, settle: Duration) -> Result<String, ChannelError<C>> {
        self.write_line(text)?;
        if !settle.is_zero() {
            thread::sleep(settle);
        }

        let window = self.config.read_timeout().max(MIN_POLL_WINDOW);
        let poll_deadline = Instant::now() + window;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let read_deadline = (Instant::now() + self.config.read_timeout()).min(poll_deadline);
            let line = self.read_line_until(read_deadline)?;
            if !line.is_empty() {
                debug!(attempts, "Reply received");
                return Ok(line);
            }

            let now = Instant::now();
            if now >= poll_deadline {
                debug!(attempts, ?window, "No reply before deadline");
                return Ok(line);
            }
            thread::sleep(POLL_BACKOFF.min(poll_deadline - now));
        }
    }

    fn read_line_until(&mut self, deadline: Instant) -> Result<String, ChannelError<C>> {
        let end = self.config.newline().bytes().last().unwrap_or(b'\n');
        let channel = self.channel.as_mut().ok_or(Error::NotOpen)?;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(line) = take_line(&mut self.pending, end) {
                return Ok(line);
            }

            let idle = match channel.read(&mut chunk) {
                Ok(0) => true,
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    false
                }
                Err(err) if is_idle(err.kind()) => true,
                Err(err) => return Err(Error::ReadFailed(err)),
            };

            if let Some(line) = take_line(&mut self.pending, end) {
                return Ok(line);
            }

            let now = Instant::now();
            if now >= deadline {
                let partial = core::mem::take(&mut self.pending);
                return Ok(decode_line(&partial));
            }
            if idle {
                thread::sleep(IDLE_READ_BACKOFF.min(deadline - now));
            }
        }
    }
}

impl<C: Connector> LineIo for LineTransport<C> {
    type Error = ChannelError<C>;

    fn write_line(&mut self, text: &str) -> Result<(), Self::Error> {
        LineTransport::write_line(self, text)
    }

    fn send_and_receive(&mut self, text: &str) -> Result<String, Self::Error> {
        LineTransport::send_and_receive(self, text)
    }
}

/// `text` plus terminator as ASCII bytes, with `?` in place of anything non-ASCII.
pub(crate) fn encode_line(text: &str, newline: &str) -> Vec<u8> {
    text.chars()
        .chain(newline.chars())
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

fn decode_line(raw: &[u8]) -> String {
    let text: String = raw
        .iter()
        .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
        .collect();
    text.trim().to_owned()
}

/// Remove and decode everything up to and including the first `end` byte.
fn take_line(pending: &mut Vec<u8>, end: u8) -> Option<String> {
    let pos = pending.iter().position(|&b| b == end)?;
    let line: Vec<u8> = pending.drain(..=pos).collect();
    Some(decode_line(&line))
}
