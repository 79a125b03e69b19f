//! # Printer State
//!
//! The host-side mirror of what the printer is doing: active text styles,
//! where the print head is on the current line, how tall a line is, and
//! the calibration constants used to estimate busy time.
//!
//! ## Character Metrics
//!
//! | Font | Cell (w×h) | Columns (384 dots) |
//! |------|------------|--------------------|
//! | A    | 12×24      | 32 |
//! | B    | 9×17       | 42 |
//!
//! Double width doubles the cell width (16 / 21 columns). Double height
//! doubles the cell height (48 / 34 dots).

use crate::protocol::commands::{LF, PRINT_WIDTH_DOTS};
use crate::protocol::firmware::Firmware;

/// Fixed baseline the printer measures line height from, in dots.
pub const BASELINE_DOTS: u8 = 24;

/// # Print Mode Mask
///
/// Bit layout of `ESC ! n`:
///
/// | Bit | Mask | Style |
/// |-----|------|-------|
/// | 0 | 0x01 | Font B |
/// | 1 | 0x02 | Inverse (pre-2.68 only) |
/// | 2 | 0x04 | Upside-down (pre-2.68 only) |
/// | 3 | 0x08 | Bold |
/// | 4 | 0x10 | Double height |
/// | 5 | 0x20 | Double width |
/// | 6 | 0x40 | Strike-through |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PrintMode(u8);

impl PrintMode {
    pub const FONT_B: Self = Self(1 << 0);
    pub const INVERSE: Self = Self(1 << 1);
    pub const UPSIDE_DOWN: Self = Self(1 << 2);
    pub const BOLD: Self = Self(1 << 3);
    pub const DOUBLE_HEIGHT: Self = Self(1 << 4);
    pub const DOUBLE_WIDTH: Self = Self(1 << 5);
    pub const STRIKE: Self = Self(1 << 6);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// Mutable record of one physical printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterState {
    pub print_mode: PrintMode,
    /// Current column; wraps at `max_column`
    pub column: u8,
    /// Characters per line for the current font and width
    pub max_column: u8,
    /// Glyph height in dot rows
    pub char_height: u8,
    /// Gap between lines in dot rows (line height minus the baseline)
    pub line_spacing: u8,
    /// Barcode bar height in dots
    pub barcode_height: u8,
    pub firmware: Firmware,
    /// Microseconds per printed dot row
    pub dot_print_time: u32,
    /// Microseconds per fed dot row
    pub dot_feed_time: u32,
    /// Bitmap chunk ceiling in rows
    pub max_chunk_height: u8,
    /// Last byte sent through the text path
    pub prev_byte: u8,
}

impl PrinterState {
    pub fn new(firmware: Firmware, dot_print_time: u32, dot_feed_time: u32) -> Self {
        let mut state = Self {
            print_mode: PrintMode::empty(),
            column: 0,
            max_column: 32,
            char_height: 24,
            line_spacing: 6,
            barcode_height: 50,
            firmware,
            dot_print_time,
            dot_feed_time,
            max_chunk_height: 255,
            prev_byte: LF,
        };
        state.reset_layout();
        state
    }

    /// Restore the layout the printer has after `ESC @`.
    ///
    /// The previous line is treated as blank.
    pub fn reset_layout(&mut self) {
        self.prev_byte = LF;
        self.column = 0;
        self.max_column = 32;
        self.char_height = 24;
        self.line_spacing = 6;
        self.barcode_height = 50;
    }

    /// Re-derive `char_height` and `max_column` from the print mode.
    pub fn adjust_char_values(&mut self) {
        let (mut height, mut width): (u8, u16) = if self.print_mode.contains(PrintMode::FONT_B) {
            (17, 9)
        } else {
            (24, 12)
        };
        if self.print_mode.contains(PrintMode::DOUBLE_WIDTH) {
            width *= 2;
        }
        if self.print_mode.contains(PrintMode::DOUBLE_HEIGHT) {
            height *= 2;
        }
        self.char_height = height;
        self.max_column = (PRINT_WIDTH_DOTS / width) as u8;
        self.column = self.column.min(self.max_column);
    }

    /// Record a new line height (baseline to baseline, in dots).
    pub fn set_line_height(&mut self, height: u8) {
        self.line_spacing = height.max(BASELINE_DOTS) - BASELINE_DOTS;
    }

    /// Mark the start of a fresh line after a feed or graphic.
    pub fn end_line(&mut self) {
        self.prev_byte = LF;
        self.column = 0;
    }

    /// Busy time for the line just ended, in microseconds.
    ///
    /// A line that follows another newline is blank and only feeds:
    /// `(char_height + line_spacing) × feed`. Otherwise the text is
    /// printed: `char_height × print + line_spacing × feed`.
    pub fn line_delay(&self) -> u32 {
        let height = u32::from(self.char_height);
        let spacing = u32::from(self.line_spacing);
        if self.prev_byte == LF {
            (height + spacing).saturating_mul(self.dot_feed_time)
        } else {
            height
                .saturating_mul(self.dot_print_time)
                .saturating_add(spacing.saturating_mul(self.dot_feed_time))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
