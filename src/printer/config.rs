//! # Printer Configuration
//!
//! This module defines the operator-tunable settings of a KP-347 printer.
//!
//! ## Defaults
//!
//! | Setting | Default | Notes |
//! |---------|---------|-------|
//! | Baud rate | 19200 | A few units ship at 9600 |
//! | Firmware | 2.68 | Printed on the self-test page |
//! | Heat profile | 11 / 120 / 40 | 96 dots, 1.2ms, 400µs |
//! | Dot print time | 30000 µs | Per printed dot row |
//! | Dot feed time | 2100 µs | Per fed dot row |
//! | Max chunk height | 255 rows | Bitmap chunk ceiling |
//! | Handshake | none | Timing estimates only |
//!
//! ## Loading
//!
//! Configuration is JSON. Every field is optional:
//!
//! ```
//! use kp347::printer::PrinterConfig;
//!
//! let config = PrinterConfig::from_json(r#"{ "firmware": 264, "handshake": "cts" }"#)?;
//! assert_eq!(config.baud_rate, 19200);
//! assert!(config.handshake.is_some());
//! # Ok::<(), kp347::PrinterError>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PrinterError, Result};
use crate::protocol::firmware::Firmware;

/// Modem-status input the printer's busy (DTR) output is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeLine {
    Cts,
    Dsr,
    Dcd,
    Ri,
}

/// # Heat Profile (ESC 7)
///
/// - **max_heating_dots**: elements fired at once, in units of 8 dots minus 1
/// - **heating_time**: firing time, 10µs units
/// - **heating_interval**: recovery time between groups, 10µs units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatProfile {
    pub max_heating_dots: u8,
    pub heating_time: u8,
    pub heating_interval: u8,
}

impl Default for HeatProfile {
    fn default() -> Self {
        Self {
            max_heating_dots: 11,
            heating_time: 120,
            heating_interval: 40,
        }
    }
}

/// # Printer Configuration
///
/// ## Timing Calibration
///
/// `dot_print_time_us` and `dot_feed_time_us` depend on supply voltage,
/// paper thickness and the unit itself. Too small and the printer's
/// buffer overruns (garbled or dropped output); too large and printing
/// just gets slower. A line of normal text costs roughly
/// `24 × print + 6 × feed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Serial bit rate
    pub baud_rate: u32,

    /// Firmware version (e.g. 268 for 2.68)
    pub firmware: Firmware,

    /// Heating parameters sent at start-up
    pub heat: HeatProfile,

    /// Microseconds to print one dot row
    pub dot_print_time_us: u32,

    /// Microseconds to feed one dot row
    pub dot_feed_time_us: u32,

    /// Ceiling on bitmap chunk height, in rows
    pub max_chunk_height: u8,

    /// Busy line for hardware flow control; `None` uses timing estimates
    pub handshake: Option<HandshakeLine>,
}

impl PrinterConfig {
    pub const DEFAULT_BAUD_RATE: u32 = 19200;
    pub const DEFAULT_DOT_PRINT_TIME_US: u32 = 30_000;
    pub const DEFAULT_DOT_FEED_TIME_US: u32 = 2_100;
    pub const DEFAULT_MAX_CHUNK_HEIGHT: u8 = 255;

    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PrinterError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PrinterError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Reject values the driver cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(PrinterError::Config("baud_rate must be positive".into()));
        }
        Ok(())
    }

    /// Microseconds to transmit one byte: 11 bit times (start, 8 data,
    /// stop, one idle) rounded to the nearest microsecond.
    ///
    /// ```
    /// use kp347::printer::PrinterConfig;
    ///
    /// assert_eq!(PrinterConfig::default().byte_time_us(), 573);
    /// ```
    pub fn byte_time_us(&self) -> u32 {
        let baud = u64::from(self.baud_rate.max(1));
        ((11 * 1_000_000 + baud / 2) / baud) as u32
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            baud_rate: Self::DEFAULT_BAUD_RATE,
            firmware: Firmware::DEFAULT,
            heat: HeatProfile::default(),
            dot_print_time_us: Self::DEFAULT_DOT_PRINT_TIME_US,
            dot_feed_time_us: Self::DEFAULT_DOT_FEED_TIME_US,
            max_chunk_height: Self::DEFAULT_MAX_CHUNK_HEIGHT,
            handshake: None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
