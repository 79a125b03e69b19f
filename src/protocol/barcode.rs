//! # Barcode Commands
//!
//! 1D barcode printing on KP-347 printers. A barcode is sent as a short
//! setup sequence followed by the payload:
//!
//! ```text
//! GS H 2        human-readable label below the bars
//! GS w 3        module width 3 (0.375mm thin / 1.0mm thick)
//! GS k m        barcode type
//! payload       firmware-dependent framing (see below)
//! ```
//!
//! ## Payload Framing
//!
//! | Firmware | Type code | Payload |
//! |----------|-----------|---------|
//! | < 2.64   | `m`       | `d1...dk NUL` |
//! | ≥ 2.64   | `m + 65`  | `len d1...dlen` (len ≤ 255) |
//!
//! The two framings are incompatible; the wrong one prints garbage or
//! nothing.

use super::commands::{GS, NUL};
use super::firmware::BarcodeFraming;

/// Supported barcode symbologies (base type codes, before any firmware offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeType {
    UpcA = 0,
    UpcE = 1,
    Ean13 = 2,
    Ean8 = 3,
    Code39 = 4,
    Itf = 5,
    Codabar = 6,
    Code93 = 7,
    Code128 = 8,
}

impl BarcodeType {
    /// Parse a symbology name as used on the command line.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "").as_str() {
            "upca" => Some(Self::UpcA),
            "upce" => Some(Self::UpcE),
            "ean13" => Some(Self::Ean13),
            "ean8" => Some(Self::Ean8),
            "code39" => Some(Self::Code39),
            "itf" => Some(Self::Itf),
            "codabar" => Some(Self::Codabar),
            "code93" => Some(Self::Code93),
            "code128" => Some(Self::Code128),
            _ => None,
        }
    }

    /// Type code to put after `GS k`, including the firmware offset.
    #[inline]
    pub fn code(self, offset: u8) -> u8 {
        (self as u8).wrapping_add(offset)
    }
}

/// # Human-Readable Label Position (GS H n)
///
/// `n = 2` prints the label below the bars.
#[inline]
pub fn label_below() -> Vec<u8> {
    vec![GS, b'H', 2]
}

/// # Module Width (GS w n)
#[inline]
pub fn module_width(n: u8) -> Vec<u8> {
    vec![GS, b'w', n]
}

/// # Select Barcode Type (GS k m)
#[inline]
pub fn select(type_code: u8) -> Vec<u8> {
    vec![GS, b'k', type_code]
}

/// # Set Barcode Height (GS h n)
///
/// Bar height in dots, not counting the label. Zero is raised to 1.
#[inline]
pub fn height(dots: u8) -> Vec<u8> {
    vec![GS, b'h', dots.max(1)]
}

/// Frame the barcode text for the given firmware framing.
///
/// The driver sends these bytes one throttled write at a time.
///
/// - `LengthPrefixed`: length byte then at most 255 bytes of text.
/// - `NulTerminated`: text up to (not including) any interior NUL, then NUL.
///
/// ## Example
///
/// ```
/// use kp347::protocol::barcode::payload;
/// use kp347::protocol::firmware::BarcodeFraming;
///
/// assert_eq!(payload(b"123", BarcodeFraming::LengthPrefixed), vec![3, b'1', b'2', b'3']);
/// assert_eq!(payload(b"123", BarcodeFraming::NulTerminated), vec![b'1', b'2', b'3', 0]);
/// ```
pub fn payload(text: &[u8], framing: BarcodeFraming) -> Vec<u8> {
    match framing {
        BarcodeFraming::LengthPrefixed => {
            let len = text.len().min(255);
            let mut out = Vec::with_capacity(len + 1);
            out.push(len as u8);
            out.extend_from_slice(&text[..len]);
            out
        }
        BarcodeFraming::NulTerminated => {
            let end = text.iter().position(|&b| b == NUL).unwrap_or(text.len());
            let mut out = Vec::with_capacity(end + 1);
            out.extend_from_slice(&text[..end]);
            out.push(NUL);
            out
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
