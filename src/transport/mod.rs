//! # Printer Transport Layer
//!
//! The driver core never touches a device directly. Everything it needs
//! from the outside world goes through the [`Port`] trait: a wrapping
//! microsecond clock, byte send and receive, an optional busy line, and
//! cooperative suspension.
//!
//! ## Available Transports
//!
//! - [`serial`]: Unix TTY (USB-serial adapters, on-board UARTs)
//! - [`mock`]: Scripted fake with a virtual clock, for tests
//!
//! ## Bitmap Sources
//!
//! Bitmap data can come from memory or from a stream that delivers bytes
//! as they arrive. Both are read through [`BitmapSource`].

pub mod mock;
#[cfg(unix)]
pub mod serial;

use std::io::{ErrorKind, Read};

use async_trait::async_trait;

use crate::error::Result;

pub use mock::MockPort;
#[cfg(unix)]
pub use serial::SerialPort;

/// Capabilities the driver consumes from the hardware side.
///
/// Implementations must keep `now_micros` monotonic modulo 2^32; the
/// throttle compares deadlines with wrapping arithmetic.
#[async_trait]
pub trait Port: Send {
    /// Current time in microseconds. Wraps at `u32::MAX`.
    fn now_micros(&self) -> u32;

    /// Transmit one byte.
    fn send_byte(&mut self, byte: u8) -> Result<()>;

    /// Whether a received byte is waiting.
    fn receive_available(&mut self) -> Result<bool>;

    /// Read one received byte, `None` if nothing has arrived.
    fn receive_byte(&mut self) -> Result<Option<u8>>;

    /// State of the printer's busy line. Ports without one report idle.
    fn handshake_busy(&mut self) -> Result<bool> {
        Ok(false)
    }

    /// Suspend for a fixed amount of real time.
    async fn sleep_millis(&mut self, ms: u64);

    /// Hand control back to the scheduler once.
    async fn yield_now(&mut self);
}

// ============================================================================
// BITMAP SOURCES
// ============================================================================

/// Result of polling a bitmap source for its next byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamByte {
    Byte(u8),
    /// Nothing available yet; try again after yielding
    Pending,
    /// The source is exhausted
    Closed,
}

/// Sequential byte source feeding a bitmap transfer.
pub trait BitmapSource {
    fn read_byte(&mut self) -> Result<StreamByte>;
}

/// In-memory bitmap source over a preloaded buffer.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl BitmapSource for SliceSource<'_> {
    fn read_byte(&mut self) -> Result<StreamByte> {
        match self.data.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Ok(StreamByte::Byte(b))
            }
            None => Ok(StreamByte::Closed),
        }
    }
}

/// Bitmap source over any [`Read`]er.
///
/// `WouldBlock` and `Interrupted` are reported as [`StreamByte::Pending`],
/// so a non-blocking file or socket can feed a transfer while it arrives.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> BitmapSource for ReaderSource<R> {
    fn read_byte(&mut self) -> Result<StreamByte> {
        let mut buf = [0u8; 1];
        match self.reader.read(&mut buf) {
            Ok(0) => Ok(StreamByte::Closed),
            Ok(_) => Ok(StreamByte::Byte(buf[0])),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(StreamByte::Pending)
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
