//! # Printer Protocol Commands
//!
//! This module implements the byte-level command set understood by KP-347
//! class thermal printers (the 58mm TTL serial mechanisms sold as the
//! Adafruit "Mini Thermal Receipt Printer" and its clones).
//!
//! ## Protocol Overview
//!
//! The protocol is an ESC/POS dialect. Every command is a single prefix
//! byte followed by a fixed, command-specific number of parameter bytes:
//!
//! - Single byte: `FF`, `HT`, `LF`
//! - Two bytes: `ESC @`, `ESC 7`, `DC2 T`
//! - Three bytes: `ESC d n`, `ESC ! n`, `GS h n`
//! - Four bytes: `DC2 * r n`, `ESC 8 nL nH`
//!
//! Builders here are pure: they return the exact bytes and never touch
//! printer state or timing. The driver decides when to send them.
//!
//! ## Byte Order
//!
//! Multi-byte integers use **little-endian** encoding:
//! - `u16` value 0x1234 is sent as bytes `[0x34, 0x12]`
//!
//! ## Write Units
//!
//! A few commands are sent as more than one throttled write (for example
//! `ESC 7` followed by its three heat parameters). Those builders return
//! `Vec<Vec<u8>>`, one inner vector per write.

// ============================================================================
// CONTROL BYTE CONSTANTS
// ============================================================================

/// HT (Horizontal Tab) - Advance to next tab stop
pub const TAB: u8 = 0x09;

/// LF (Line Feed) - Print the line buffer and advance one line
pub const LF: u8 = 0x0A;

/// FF (Form Feed) - Flush the print buffer
pub const FF: u8 = 0x0C;

/// CR (Carriage Return) - Never transmitted; stripped from text output
pub const CR: u8 = 0x0D;

/// DC2 (Device Control 2) - Prefix for density, bitmap and test page commands
pub const DC2: u8 = 0x12;

/// ESC (Escape) - Main command prefix byte
pub const ESC: u8 = 0x1B;

/// FS (Field Separator) - Prefix for Kanji/extended character commands
pub const FS: u8 = 0x1C;

/// GS (Group Separator) - Prefix for barcode, status and extended commands
pub const GS: u8 = 0x1D;

/// Wake byte sent to bring the printer out of its low-power state
pub const WAKE: u8 = 0xFF;

/// NUL - No-op padding byte, also the legacy barcode terminator
pub const NUL: u8 = 0x00;

/// Printable width of the mechanism in dots (48 bytes per row)
pub const PRINT_WIDTH_DOTS: u16 = 384;

/// Maximum bitmap row width in bytes (384 dots / 8)
pub const MAX_ROW_BYTES: u8 = 48;

// ============================================================================
// INITIALIZATION COMMANDS
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Clears the print buffer and restores the power-on formatting defaults.
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
/// | Decimal | 27 64 |
///
/// ## Example
///
/// ```
/// use kp347::protocol::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Set Tab Stops (ESC D n1...nk NUL)
///
/// Programs horizontal tab stops every 4 columns. Only understood by
/// firmware 2.64 and later.
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC D 4 8 12 16 20 24 28 NUL |
/// | Hex     | 1B 44 04 08 0C 10 14 18 1C 00 |
///
/// Sent as three writes: the 2-byte prefix, then two 4-byte runs of
/// stop positions. The zero marks the end of the list.
pub fn tab_stops() -> Vec<Vec<u8>> {
    vec![vec![ESC, b'D'], vec![4, 8, 12, 16], vec![20, 24, 28, 0]]
}

/// # Print Self-Test Page (DC2 T)
///
/// Prints the printer's built-in test page (26 lines of text).
#[inline]
pub fn test_page() -> Vec<u8> {
    vec![DC2, b'T']
}

/// # Enable Busy Line (GS a n)
///
/// Turns on the printer's DTR-style busy output so the host can use it
/// for hardware flow control. Bit 5 of `n` selects the busy line.
#[inline]
pub fn enable_busy_line() -> Vec<u8> {
    vec![GS, b'a', 1 << 5]
}

// ============================================================================
// PAPER FEED COMMANDS
// ============================================================================

/// # Feed Lines (ESC d n)
///
/// Prints the buffer and feeds `n` text lines. Firmware 2.64 and later
/// only; older firmware overfeeds and must emulate this with newlines.
///
/// ## Protocol Details
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | ESC d n  |
/// | Hex     | 1B 64 n  |
/// | Decimal | 27 100 n |
///
/// ## Example
///
/// ```
/// use kp347::protocol::commands;
///
/// assert_eq!(commands::feed_lines(3), vec![0x1B, 0x64, 0x03]);
/// ```
#[inline]
pub fn feed_lines(n: u8) -> Vec<u8> {
    vec![ESC, b'd', n]
}

/// # Feed Dot Rows (ESC J n)
///
/// Prints the buffer and feeds `n` individual dot rows (1/8mm each at
/// 203 DPI).
///
/// ## Protocol Details
///
/// | Format  | Bytes   |
/// |---------|---------|
/// | ASCII   | ESC J n |
/// | Hex     | 1B 4A n |
/// | Decimal | 27 74 n |
#[inline]
pub fn feed_rows(n: u8) -> Vec<u8> {
    vec![ESC, b'J', n]
}

/// # Form Feed (FF)
#[inline]
pub fn form_feed() -> Vec<u8> {
    vec![FF]
}

// ============================================================================
// LAYOUT COMMANDS
// ============================================================================

/// Text justification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

impl Justify {
    /// Parse the single-letter form (`L`, `C`, `R`, case-insensitive).
    ///
    /// Anything else falls back to left justification.
    pub fn from_char(c: char) -> Self {
        match c.to_ascii_uppercase() {
            'C' => Self::Center,
            'R' => Self::Right,
            _ => Self::Left,
        }
    }
}

/// # Select Justification (ESC a n)
///
/// | n | Justification |
/// |---|---------------|
/// | 0 | Left |
/// | 1 | Center |
/// | 2 | Right |
///
/// ## Example
///
/// ```
/// use kp347::protocol::commands::{justify, Justify};
///
/// assert_eq!(justify(Justify::Center), vec![0x1B, 0x61, 0x01]);
/// ```
#[inline]
pub fn justify(j: Justify) -> Vec<u8> {
    vec![ESC, b'a', j as u8]
}

/// # Set Line Height (ESC 3 n)
///
/// The printer treats `n` as the distance between baselines in dots and
/// ignores the current character height. Values below 24 (the font A
/// height) are raised to 24.
#[inline]
pub fn line_height(n: u8) -> Vec<u8> {
    vec![ESC, b'3', n.max(24)]
}

/// # Set Character Spacing (ESC SP n)
#[inline]
pub fn char_spacing(n: u8) -> Vec<u8> {
    vec![ESC, b' ', n]
}

/// # Horizontal Tab (HT)
#[inline]
pub fn tab() -> Vec<u8> {
    vec![TAB]
}

// ============================================================================
// STYLE COMMANDS
// ============================================================================

/// # Select Print Mode (ESC ! n)
///
/// Sets every text style bit at once. See
/// [`PrintMode`](crate::printer::state::PrintMode) for the bit layout.
///
/// ## Protocol Details
///
/// | Format  | Bytes   |
/// |---------|---------|
/// | ASCII   | ESC ! n |
/// | Hex     | 1B 21 n |
/// | Decimal | 27 33 n |
#[inline]
pub fn print_mode(mask: u8) -> Vec<u8> {
    vec![ESC, b'!', mask]
}

/// # White/Black Reverse (GS B n)
///
/// Dedicated inverse command, firmware 2.68 and later.
#[inline]
pub fn inverse(on: bool) -> Vec<u8> {
    vec![GS, b'B', on as u8]
}

/// # Upside-Down Mode (ESC { n)
///
/// Dedicated upside-down command, firmware 2.68 and later.
#[inline]
pub fn upside_down(on: bool) -> Vec<u8> {
    vec![ESC, b'{', on as u8]
}

/// # Underline (ESC - n)
///
/// | n | Underline |
/// |---|-----------|
/// | 0 | Off |
/// | 1 | Normal (1 dot) |
/// | 2 | Thick (2 dots) |
///
/// Weights above 2 are clamped to 2.
///
/// ## Example
///
/// ```
/// use kp347::protocol::commands;
///
/// assert_eq!(commands::underline(9), vec![0x1B, 0x2D, 0x02]);
/// ```
#[inline]
pub fn underline(weight: u8) -> Vec<u8> {
    vec![ESC, b'-', weight.min(2)]
}

/// # Select International Character Set (ESC R n)
///
/// Alters some characters in the 0x23-0x7E range. `n` is clamped to 15.
#[inline]
pub fn charset(n: u8) -> Vec<u8> {
    vec![ESC, b'R', n.min(15)]
}

/// # Select Code Page (ESC t n)
///
/// Selects alternate glyphs for the upper half (0x80-0xFF). `n` is clamped
/// to 47.
#[inline]
pub fn code_page(n: u8) -> Vec<u8> {
    vec![ESC, b't', n.min(47)]
}

// ============================================================================
// PRINT QUALITY COMMANDS
// ============================================================================

/// # Set Heating Parameters (ESC 7 n1 n2 n3)
///
/// ## Parameters
///
/// | Param | Range | Unit | Meaning |
/// |-------|-------|------|---------|
/// | `max_heating_dots` | 0-255 | 8 dots, minus 1 | Elements fired at once |
/// | `heating_time` | 3-255 | 10 µs | How long each group is fired |
/// | `heating_interval` | 0-255 | 10 µs | Recovery time between groups |
///
/// More heating dots means more peak current but faster printing. More
/// heating time gives darker print but slower feed.
///
/// Sent as two writes: `ESC 7`, then the three parameters.
pub fn heat_config(max_heating_dots: u8, heating_time: u8, heating_interval: u8) -> Vec<Vec<u8>> {
    vec![
        vec![ESC, b'7'],
        vec![max_heating_dots, heating_time, heating_interval],
    ]
}

/// # Set Print Density (DC2 # n)
///
/// | Bits   | Field      | Meaning          | Clamp |
/// |--------|------------|------------------|-------|
/// | D7..D5 | density    | 50% + 5% × n     | 7     |
/// | D4..D0 | break time | n × 250µs        | 31    |
///
/// The packed byte is `(density << 5) | break_time`.
///
/// ## Example
///
/// ```
/// use kp347::protocol::commands;
///
/// assert_eq!(commands::print_density(4, 2), vec![0x12, 0x23, 0x82]);
/// ```
#[inline]
pub fn print_density(density: u8, break_time: u8) -> Vec<u8> {
    vec![DC2, b'#', (density.min(7) << 5) | break_time.min(31)]
}

// ============================================================================
// POWER AND ONLINE COMMANDS
// ============================================================================

/// # Set Online/Offline (ESC = n)
///
/// While offline the printer ignores print commands.
#[inline]
pub fn online(on: bool) -> Vec<u8> {
    vec![ESC, b'=', on as u8]
}

/// # Sleep After Timeout, Two-Byte Form (ESC 8 nL nH)
///
/// Firmware 2.64 and later. `0` disables sleep.
#[inline]
pub fn sleep_after_u16(seconds: u16) -> Vec<u8> {
    let [lo, hi] = u16_le(seconds);
    vec![ESC, b'8', lo, hi]
}

/// # Sleep After Timeout, Legacy Form (ESC 8 n)
///
/// Older firmware takes a single byte; only the low byte is sent.
#[inline]
pub fn sleep_after_u8(seconds: u16) -> Vec<u8> {
    vec![ESC, b'8', seconds as u8]
}

// ============================================================================
// BITMAP COMMANDS
// ============================================================================

/// # Print Raster Bit Image Chunk (DC2 * r n d1...dk)
///
/// Declares a chunk of `height` rows, each `row_bytes` wide; exactly
/// `height × row_bytes` data bytes must follow.
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | DC2 * r n d1...dk |
/// | Hex     | 12 2A r n d1...dk |
///
/// ## Data Layout
///
/// ```text
/// Bit 7 (MSB) = leftmost dot, 1 = black
/// Row 0: d1 .. dn
/// Row 1: dn+1 .. d2n
/// ```
#[inline]
pub fn bitmap_chunk_header(height: u8, row_bytes: u8) -> Vec<u8> {
    vec![DC2, b'*', height, row_bytes]
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Encode a u16 value as little-endian bytes [low, high]
///
/// ## Example
///
/// ```
/// use kp347::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

// ============================================================================
// TESTS
// ============================================================================
