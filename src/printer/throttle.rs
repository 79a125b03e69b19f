//! # Timing Throttle
//!
//! The serial link has no flow control, so the host has to guess how long
//! the printer stays busy after each command and hold off until then.
//!
//! The throttle keeps exactly one deadline, "busy until". Every throttled
//! write overwrites it; nothing queues. Commands are strictly sequential,
//! so the most recent estimate is the only one that matters.
//!
//! ## Rollover
//!
//! The clock is a `u32` microsecond counter that wraps about every 71
//! minutes. Deadlines are compared with signed wrapping subtraction:
//!
//! ```text
//! ready  <=>  (now - deadline) as i32 >= 0
//! ```
//!
//! which is correct whenever `now` and `deadline` are within 2^31 µs
//! (~35 minutes) of each other.

/// How the driver decides the printer can accept more data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    /// Estimated busy time from byte counts and dot timing
    #[default]
    Timed,
    /// The printer's busy line; deadlines are ignored
    Handshake,
}

/// Single-deadline pacing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    resume_at: u32,
    byte_time: u32,
}

impl Throttle {
    pub fn new(byte_time: u32) -> Self {
        Self {
            resume_at: 0,
            byte_time,
        }
    }

    /// Microseconds to transmit one byte.
    #[inline]
    pub fn byte_time(&self) -> u32 {
        self.byte_time
    }

    /// Transmit time for `n` bytes.
    #[inline]
    pub fn bytes_time(&self, n: usize) -> u32 {
        self.byte_time.saturating_mul(n as u32)
    }

    /// Deadline currently in force.
    #[inline]
    pub fn resume_at(&self) -> u32 {
        self.resume_at
    }

    /// Busy until `now + duration`, replacing any earlier deadline.
    #[inline]
    pub fn set_deadline(&mut self, now: u32, duration: u32) {
        self.resume_at = now.wrapping_add(duration);
    }

    /// Whether `now` has reached the deadline.
    #[inline]
    pub fn is_ready(&self, now: u32) -> bool {
        now.wrapping_sub(self.resume_at) as i32 >= 0
    }
}

// ============================================================================
// TESTS
// ============================================================================
