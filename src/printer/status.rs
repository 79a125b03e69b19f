//! # Paper Status Probe
//!
//! Asks the printer whether paper is loaded. This needs the printer's TX
//! line wired back to the host; without it every probe times out.

use tracing::{debug, warn};

use super::driver::Printer;
use crate::error::Result;
use crate::transport::Port;

/// Times the receive side is checked before giving up.
pub const STATUS_POLL_ATTEMPTS: usize = 10;

/// Real-time pause between checks, in ms.
pub const STATUS_POLL_INTERVAL_MS: u64 = 100;

/// Status bit set when the paper roll is out.
const PAPER_OUT_BIT: u8 = 0x04;

/// Result of a paper probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperStatus {
    Present,
    Out,
    /// The printer did not answer in time
    Unknown,
}

impl PaperStatus {
    pub fn from_status_byte(byte: u8) -> Self {
        if byte & PAPER_OUT_BIT == 0 {
            Self::Present
        } else {
            Self::Out
        }
    }

    /// Best-effort answer. A printer that did not reply counts as having
    /// no paper.
    pub fn is_present(self) -> bool {
        self == Self::Present
    }
}

impl std::fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "paper present"),
            Self::Out => write!(f, "paper out"),
            Self::Unknown => write!(f, "no response"),
        }
    }
}

impl<P: Port> Printer<P> {
    /// Query the paper sensor.
    ///
    /// Waits up to about one second for the reply.
    pub async fn has_paper(&mut self) -> Result<PaperStatus> {
        let query = self.strategy().status_query;
        self.write_command(&query).await?;

        for _ in 0..STATUS_POLL_ATTEMPTS {
            if self.port.receive_available()? {
                if let Some(byte) = self.port.receive_byte()? {
                    let status = PaperStatus::from_status_byte(byte);
                    debug!(byte, %status, "paper probe");
                    return Ok(status);
                }
            }
            self.port.sleep_millis(STATUS_POLL_INTERVAL_MS).await;
        }

        warn!("paper probe timed out");
        Ok(PaperStatus::Unknown)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::PrinterConfig;
    use crate::protocol::firmware::Firmware;
    use crate::transport::MockPort;

    fn printer(port: MockPort, firmware: u16) -> Printer<MockPort> {
        let config = PrinterConfig {
            firmware: Firmware(firmware),
            ..Default::default()
        };
        Printer::new(port, &config)
    }

    #[test]
    fn test_status_byte_decoding() {
        assert_eq!(PaperStatus::from_status_byte(0x00), PaperStatus::Present);
        assert_eq!(PaperStatus::from_status_byte(0xFB), PaperStatus::Present);
        assert_eq!(PaperStatus::from_status_byte(0x04), PaperStatus::Out);
        assert_eq!(PaperStatus::from_status_byte(0xFF), PaperStatus::Out);
    }

    #[test]
    fn test_is_present() {
        assert!(PaperStatus::Present.is_present());
        assert!(!PaperStatus::Out.is_present());
        assert!(!PaperStatus::Unknown.is_present());
    }

    #[tokio::test]
    async fn test_immediate_reply() {
        let mut p = printer(MockPort::new().with_reply(0x00), 268);
        assert_eq!(p.has_paper().await.unwrap(), PaperStatus::Present);
        assert_eq!(p.port().sent_bytes(), vec![0x1B, 0x76, 0x00]);
        assert!(p.port().sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_delayed_reply_legacy_query() {
        let port = MockPort::new().with_reply(0x04).with_reply_delay(3);
        let mut p = printer(port, 263);
        assert_eq!(p.has_paper().await.unwrap(), PaperStatus::Out);
        assert_eq!(p.port().sent_bytes(), vec![0x1D, 0x72, 0x00]);
        assert_eq!(p.port().sleeps(), &[100, 100, 100]);
    }

    #[tokio::test]
    async fn test_timeout_is_unknown() {
        let mut p = printer(MockPort::new(), 268);
        assert_eq!(p.has_paper().await.unwrap(), PaperStatus::Unknown);
        assert_eq!(p.port().sleeps().len(), STATUS_POLL_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_reply_on_last_poll() {
        let port = MockPort::new().with_reply(0x00).with_reply_delay(9);
        let mut p = printer(port, 268);
        assert_eq!(p.has_paper().await.unwrap(), PaperStatus::Present);
        assert_eq!(p.port().sleeps().len(), 9);
    }
}
