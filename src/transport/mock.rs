//! # Mock Transport
//!
//! A scripted [`Port`] with a virtual clock, used to test the driver
//! without hardware.
//!
//! - Time only moves when the driver yields or sleeps, so every deadline
//!   the driver computes can be checked exactly.
//! - Each transmitted byte is recorded with the virtual time it left at.
//! - Status replies are queued up front and can be held back for a number
//!   of polls to exercise the paper probe's retry loop.
//! - The busy line can be held high for a number of reads.

use std::collections::VecDeque;

use async_trait::async_trait;

use super::Port;
use crate::error::Result;

/// Default virtual time that passes per `yield_now()`, in microseconds.
pub const DEFAULT_YIELD_STEP_US: u32 = 500;

/// A byte transmitted through the mock, with the virtual time it was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentByte {
    pub byte: u8,
    pub at: u32,
}

/// Scripted fake port.
#[derive(Debug)]
pub struct MockPort {
    now: u32,
    yield_step: u32,
    sent: Vec<SentByte>,
    replies: VecDeque<u8>,
    reply_delay_polls: usize,
    busy_reads: usize,
    yields: usize,
    sleeps: Vec<u64>,
}

impl MockPort {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Start the virtual clock at `now` (e.g. just below `u32::MAX` to
    /// exercise rollover).
    pub fn starting_at(now: u32) -> Self {
        Self {
            now,
            yield_step: DEFAULT_YIELD_STEP_US,
            sent: Vec::new(),
            replies: VecDeque::new(),
            reply_delay_polls: 0,
            busy_reads: 0,
            yields: 0,
            sleeps: Vec::new(),
        }
    }

    /// Builder: virtual microseconds that pass per yield.
    pub fn with_yield_step(mut self, step_us: u32) -> Self {
        self.yield_step = step_us.max(1);
        self
    }

    /// Builder: queue a byte the printer will "send back".
    pub fn with_reply(mut self, byte: u8) -> Self {
        self.replies.push_back(byte);
        self
    }

    /// Builder: report no received data for the first `polls` availability
    /// checks.
    pub fn with_reply_delay(mut self, polls: usize) -> Self {
        self.reply_delay_polls = polls;
        self
    }

    /// Builder: hold the busy line high for the next `reads` checks.
    pub fn with_busy_reads(mut self, reads: usize) -> Self {
        self.busy_reads = reads;
        self
    }

    /// Every byte sent so far, with timestamps.
    pub fn sent(&self) -> &[SentByte] {
        &self.sent
    }

    /// Just the bytes sent so far.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.sent.iter().map(|s| s.byte).collect()
    }

    /// Forget recorded output (the clock keeps running).
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    /// Number of `yield_now()` calls so far.
    pub fn yields(&self) -> usize {
        self.yields
    }

    /// Durations passed to `sleep_millis()`, in order.
    pub fn sleeps(&self) -> &[u64] {
        &self.sleeps
    }

    /// Move the virtual clock forward without yielding.
    pub fn advance(&mut self, us: u32) {
        self.now = self.now.wrapping_add(us);
    }
}

impl Default for MockPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Port for MockPort {
    fn now_micros(&self) -> u32 {
        self.now
    }

    fn send_byte(&mut self, byte: u8) -> Result<()> {
        self.sent.push(SentByte { byte, at: self.now });
        Ok(())
    }

    fn receive_available(&mut self) -> Result<bool> {
        if self.reply_delay_polls > 0 {
            self.reply_delay_polls -= 1;
            return Ok(false);
        }
        Ok(!self.replies.is_empty())
    }

    fn receive_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.replies.pop_front())
    }

    fn handshake_busy(&mut self) -> Result<bool> {
        if self.busy_reads > 0 {
            self.busy_reads -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    async fn sleep_millis(&mut self, ms: u64) {
        self.sleeps.push(ms);
        self.advance((ms * 1000) as u32);
    }

    async fn yield_now(&mut self) {
        self.yields += 1;
        self.advance(self.yield_step);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clock_advances_on_yield_and_sleep() {
        let mut port = MockPort::new().with_yield_step(10);
        port.yield_now().await;
        assert_eq!(port.now_micros(), 10);
        port.sleep_millis(2).await;
        assert_eq!(port.now_micros(), 2010);
        assert_eq!(port.yields(), 1);
        assert_eq!(port.sleeps(), &[2]);
    }

    #[tokio::test]
    async fn test_clock_wraps() {
        let mut port = MockPort::starting_at(u32::MAX).with_yield_step(2);
        port.yield_now().await;
        assert_eq!(port.now_micros(), 1);
    }

    #[test]
    fn test_records_sent_bytes() {
        let mut port = MockPort::starting_at(42);
        port.send_byte(0x1B).unwrap();
        port.send_byte(0x40).unwrap();
        assert_eq!(port.sent_bytes(), vec![0x1B, 0x40]);
        assert_eq!(port.sent()[1], SentByte { byte: 0x40, at: 42 });
        port.clear_sent();
        assert!(port.sent().is_empty());
    }

    #[test]
    fn test_delayed_reply() {
        let mut port = MockPort::new().with_reply(0x04).with_reply_delay(2);
        assert!(!port.receive_available().unwrap());
        assert!(!port.receive_available().unwrap());
        assert!(port.receive_available().unwrap());
        assert_eq!(port.receive_byte().unwrap(), Some(0x04));
        assert_eq!(port.receive_byte().unwrap(), None);
    }

    #[test]
    fn test_busy_reads() {
        let mut port = MockPort::new().with_busy_reads(1);
        assert!(port.handshake_busy().unwrap());
        assert!(!port.handshake_busy().unwrap());
    }
}
