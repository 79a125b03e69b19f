//! # Firmware Strategy Table
//!
//! Printer firmware revisions disagree on how several commands are framed.
//! Rather than sprinkling `if firmware >= N` through the driver, every
//! version-dependent decision lives in one table keyed by the minimum
//! firmware version that introduced it.
//!
//! ## Known Boundaries
//!
//! | Version | Changes |
//! |---------|---------|
//! | < 2.64  | Legacy framing: newline-emulated feeds, NUL-terminated barcodes, 1-byte sleep timeout, `GS r` status |
//! | ≥ 2.64  | `ESC d n` feeds, length-prefixed barcodes (type + 65), 2-byte sleep timeout, `ESC v` status, tab stops |
//! | ≥ 2.68  | Inverse and upside-down get dedicated commands (`GS B n`, `ESC { n`) |
//!
//! Versions are written without the dot: 2.68 is `268`.
//!
//! ## Example
//!
//! ```
//! use kp347::protocol::firmware::{Firmware, FeedEncoding};
//!
//! assert_eq!(Firmware(263).strategy().feed, FeedEncoding::NewlineEmulation);
//! assert_eq!(Firmware(264).strategy().feed, FeedEncoding::Batched);
//! ```

use serde::{Deserialize, Serialize};

use super::commands::{ESC, GS};

/// How `feed(n)` is transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEncoding {
    /// Single `ESC d n` command
    Batched,
    /// `n` literal newline bytes through the text path (old firmware feeds
    /// extra lines when given `ESC d`)
    NewlineEmulation,
}

/// How the barcode payload is terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeFraming {
    /// `len d1..dlen`, length clamped to 255
    LengthPrefixed,
    /// `d1..dk NUL`
    NulTerminated,
}

/// How inverse and upside-down styles are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleEncoding {
    /// Bits inside the `ESC ! n` print mode mask
    PrintModeMask,
    /// Dedicated `GS B n` / `ESC { n` commands, mask untouched
    Dedicated,
}

/// Parameter shape of `ESC 8` (sleep timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepEncoding {
    /// `ESC 8 n` (low byte only)
    OneByte,
    /// `ESC 8 nL nH`
    TwoByte,
}

/// Recovery sequence used after the wake byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeStrategy {
    /// Wait 50ms of real time, then explicitly cancel sleep with `ESC 8 0 0`
    CancelSleep,
    /// Ten NUL bytes, each followed by a 10ms throttle delay. Old firmware
    /// misreads style commands given too soon after waking.
    NulPadding,
}

/// One row of the strategy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    /// Lowest firmware version this row applies to
    pub min_version: u16,
    pub feed: FeedEncoding,
    pub barcode: BarcodeFraming,
    /// Added to the barcode type code before `GS k`
    pub barcode_type_offset: u8,
    pub style: StyleEncoding,
    pub sleep: SleepEncoding,
    pub wake: WakeStrategy,
    /// Full paper status query command
    pub status_query: [u8; 3],
    /// Whether `reset()` programs tab stops every 4 columns
    pub tab_stops: bool,
}

/// Strategy rows in ascending `min_version` order.
const STRATEGIES: [Strategy; 3] = [
    Strategy {
        min_version: 0,
        feed: FeedEncoding::NewlineEmulation,
        barcode: BarcodeFraming::NulTerminated,
        barcode_type_offset: 0,
        style: StyleEncoding::PrintModeMask,
        sleep: SleepEncoding::OneByte,
        wake: WakeStrategy::NulPadding,
        status_query: [GS, b'r', 0],
        tab_stops: false,
    },
    Strategy {
        min_version: 264,
        feed: FeedEncoding::Batched,
        barcode: BarcodeFraming::LengthPrefixed,
        barcode_type_offset: 65,
        style: StyleEncoding::PrintModeMask,
        sleep: SleepEncoding::TwoByte,
        wake: WakeStrategy::CancelSleep,
        status_query: [ESC, b'v', 0],
        tab_stops: true,
    },
    Strategy {
        min_version: 268,
        feed: FeedEncoding::Batched,
        barcode: BarcodeFraming::LengthPrefixed,
        barcode_type_offset: 65,
        style: StyleEncoding::Dedicated,
        sleep: SleepEncoding::TwoByte,
        wake: WakeStrategy::CancelSleep,
        status_query: [ESC, b'v', 0],
        tab_stops: true,
    },
];

/// Printer firmware version, e.g. `Firmware(268)` for 2.68.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Firmware(pub u16);

impl Firmware {
    /// Version most current units ship with.
    pub const DEFAULT: Self = Self(268);

    /// Look up the encoding strategy for this version.
    pub fn strategy(self) -> &'static Strategy {
        STRATEGIES
            .iter()
            .rev()
            .find(|s| self.0 >= s.min_version)
            .unwrap_or(&STRATEGIES[0])
    }
}

impl Default for Firmware {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for Firmware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// TESTS
// ============================================================================
