//! # Printer Driver
//!
//! [`Printer`] owns one port and the state of one physical printer, and
//! turns high-level operations into paced byte writes.
//!
//! ## Pacing
//!
//! Every operation follows the same shape:
//!
//! ```text
//! await_ready()  →  send bytes  →  set deadline (estimated busy time)
//! ```
//!
//! `await_ready()` is the only place the driver suspends. It yields to the
//! surrounding scheduler instead of spinning, so other tasks keep running
//! while the mechanism is busy.
//!
//! ## Firmware Differences
//!
//! Encoding choices that depend on the firmware version are looked up in
//! [`crate::protocol::firmware`]; this module never compares version
//! numbers itself.

use tracing::debug;

use super::config::PrinterConfig;
use super::state::{PrintMode, PrinterState};
use super::throttle::{FlowControl, Throttle};
use crate::error::Result;
use crate::protocol::barcode::{self, BarcodeType};
use crate::protocol::commands::{self, Justify, CR, LF, NUL, WAKE};
use crate::protocol::firmware::{
    FeedEncoding, SleepEncoding, Strategy, StyleEncoding, WakeStrategy,
};
use crate::transport::Port;

/// Cold-boot settle time before the first byte, in microseconds.
const BOOT_DELAY_US: u32 = 500_000;

/// Real-time pause after the wake byte on current firmware, in ms.
const WAKE_SETTLE_MS: u64 = 50;

/// Legacy wake: number of NUL padding bytes and the delay after each.
const WAKE_NUL_COUNT: usize = 10;
const WAKE_NUL_DELAY_US: u32 = 10_000;

/// Extra dot rows a barcode occupies beyond its bar height (the label).
const BARCODE_LABEL_ROWS: u32 = 40;

/// Character size presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Size {
    /// Normal width and height
    #[default]
    Small,
    /// Double height
    Medium,
    /// Double width and height
    Large,
}

impl Size {
    /// Parse the single-letter form (`S`, `M`, `L`); anything else is small.
    pub fn from_char(c: char) -> Self {
        match c.to_ascii_uppercase() {
            'M' => Self::Medium,
            'L' => Self::Large,
            _ => Self::Small,
        }
    }
}

/// Character fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Font {
    /// 12×24 dots
    #[default]
    A,
    /// 9×17 dots
    B,
}

/// # Thermal Printer Driver
///
/// ## Example
///
/// ```
/// use kp347::printer::{Printer, PrinterConfig};
/// use kp347::transport::MockPort;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> kp347::Result<()> {
/// let config = PrinterConfig::default();
/// let mut printer = Printer::new(MockPort::new(), &config);
/// printer.begin().await?;
/// printer.bold_on().await?;
/// printer.println("TOTAL  $4.20").await?;
/// printer.bold_off().await?;
/// printer.feed(2).await?;
/// # Ok(())
/// # }
/// ```
pub struct Printer<P: Port> {
    pub(crate) port: P,
    pub(crate) state: PrinterState,
    pub(crate) throttle: Throttle,
    flow: FlowControl,
    /// Settings `begin()` restores
    config: PrinterConfig,
}

impl<P: Port> Printer<P> {
    /// Wrap a port. Nothing is sent until [`Printer::begin`].
    pub fn new(port: P, config: &PrinterConfig) -> Self {
        let flow = if config.handshake.is_some() {
            FlowControl::Handshake
        } else {
            FlowControl::Timed
        };
        let mut state = PrinterState::new(
            config.firmware,
            config.dot_print_time_us,
            config.dot_feed_time_us,
        );
        state.max_chunk_height = config.max_chunk_height;
        let mut throttle = Throttle::new(config.byte_time_us());
        throttle.set_deadline(port.now_micros(), 0);
        Self {
            port,
            state,
            throttle,
            flow,
            config: config.clone(),
        }
    }

    pub fn state(&self) -> &PrinterState {
        &self.state
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }

    pub fn flow_control(&self) -> FlowControl {
        self.flow
    }

    /// Deadline currently in force on the wrapping microsecond clock.
    pub fn resume_at(&self) -> u32 {
        self.throttle.resume_at()
    }

    pub(crate) fn strategy(&self) -> &'static Strategy {
        self.state.firmware.strategy()
    }

    // ========================================================================
    // PACING
    // ========================================================================

    /// Estimated busy time from now, replacing any earlier deadline.
    pub(crate) fn set_deadline(&mut self, duration_us: u32) {
        let now = self.port.now_micros();
        self.throttle.set_deadline(now, duration_us);
    }

    /// Suspend until the printer can take more data.
    ///
    /// With timed flow control this waits for the current deadline and
    /// returns at once if it has passed. With handshake flow control it
    /// waits for the busy line to drop instead.
    ///
    /// There is no timeout. A busy line that never clears (printer
    /// unplugged, out of paper with the lid open, miswired) suspends the
    /// caller forever; callers that need a bound should wrap the operation
    /// in `tokio::time::timeout` and check [`Printer::has_paper`].
    pub async fn await_ready(&mut self) -> Result<()> {
        match self.flow {
            FlowControl::Timed => self.await_deadline().await,
            FlowControl::Handshake => {
                while self.port.handshake_busy()? {
                    self.port.yield_now().await;
                }
            }
        }
        Ok(())
    }

    /// Suspend until the current deadline passes, whatever the flow control.
    async fn await_deadline(&mut self) {
        while !self.throttle.is_ready(self.port.now_micros()) {
            self.port.yield_now().await;
        }
    }

    /// Send one command as a single throttled write.
    pub(crate) async fn write_command(&mut self, bytes: &[u8]) -> Result<()> {
        self.await_ready().await?;
        for &b in bytes {
            self.port.send_byte(b)?;
        }
        let cost = self.throttle.bytes_time(bytes.len());
        self.set_deadline(cost);
        Ok(())
    }

    /// Send a multi-write command, one throttled write per unit.
    async fn write_units(&mut self, units: &[Vec<u8>]) -> Result<()> {
        for unit in units {
            self.write_command(unit).await?;
        }
        Ok(())
    }

    // ========================================================================
    // TEXT
    // ========================================================================

    /// Send one byte of text.
    ///
    /// Carriage returns are dropped. A newline, or a byte sent when the
    /// line is full, ends the line: the deadline grows by the line's print
    /// or feed time and the column returns to 0. A wrap counts as a
    /// newline for the next line's estimate.
    pub async fn write_byte(&mut self, byte: u8) -> Result<()> {
        if byte == CR {
            return Ok(());
        }
        self.await_ready().await?;
        self.port.send_byte(byte)?;

        let mut delay = self.throttle.byte_time();
        let recorded = if byte == LF || self.state.column >= self.state.max_column {
            delay = delay.saturating_add(self.state.line_delay());
            self.state.column = 0;
            LF
        } else {
            self.state.column += 1;
            byte
        };
        self.set_deadline(delay);
        self.state.prev_byte = recorded;
        Ok(())
    }

    /// Print raw bytes through the text path.
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &b in bytes {
            self.write_byte(b).await?;
        }
        Ok(())
    }

    /// Print a string (no newline appended).
    pub async fn print(&mut self, text: &str) -> Result<()> {
        self.write_bytes(text.as_bytes()).await
    }

    /// Print a string followed by a newline.
    pub async fn println(&mut self, text: &str) -> Result<()> {
        self.print(text).await?;
        self.write_byte(LF).await
    }

    // ========================================================================
    // START-UP AND RESET
    // ========================================================================

    /// Bring the printer up: cold-boot wait, wake, reset, heat profile.
    ///
    /// When handshake flow control is configured the printer is also told
    /// to drive its busy line.
    pub async fn begin(&mut self) -> Result<()> {
        debug!(firmware = %self.state.firmware, flow = ?self.flow, "starting printer");

        // The printer ignores data for a moment after power-up.
        // The busy line is not driven yet, so this always goes by the clock.
        self.set_deadline(BOOT_DELAY_US);
        self.await_deadline().await;

        self.wake().await?;
        self.reset().await?;

        let heat = self.config.heat;
        self.set_heat_config(heat.max_heating_dots, heat.heating_time, heat.heating_interval)
            .await?;

        if self.flow == FlowControl::Handshake {
            self.write_command(&commands::enable_busy_line()).await?;
        }

        let (print, feed) = (self.config.dot_print_time_us, self.config.dot_feed_time_us);
        self.set_times(print, feed);
        self.state.max_chunk_height = self.config.max_chunk_height;
        Ok(())
    }

    /// Reset the printer (`ESC @`) and the host-side layout to defaults.
    pub async fn reset(&mut self) -> Result<()> {
        debug!("reset");
        self.write_command(&commands::init()).await?;
        self.state.reset_layout();

        if self.strategy().tab_stops {
            self.write_units(&commands::tab_stops()).await?;
        }
        Ok(())
    }

    /// Restore every text formatting setting to its default.
    pub async fn set_default(&mut self) -> Result<()> {
        self.online().await?;
        self.justify(Justify::Left).await?;
        self.inverse_off().await?;
        self.double_height_off().await?;
        self.set_line_height(30).await?;
        self.bold_off().await?;
        self.underline_off().await?;
        self.set_barcode_height(50).await?;
        self.set_size(Size::Small).await?;
        self.set_charset(0).await?;
        self.set_code_page(0).await
    }

    /// Print a short greeting and feed two lines.
    pub async fn test(&mut self) -> Result<()> {
        self.println("Hello World!").await?;
        self.feed(2).await
    }

    /// Print the printer's built-in test page.
    pub async fn test_page(&mut self) -> Result<()> {
        self.write_command(&commands::test_page()).await?;
        // 26 lines of 24-dot text, 6 dots spacing each, plus a 30-dot blank line.
        let print = self.state.dot_print_time.saturating_mul(24 * 26);
        let feed = self.state.dot_feed_time.saturating_mul(6 * 26 + 30);
        self.set_deadline(print.saturating_add(feed));
        Ok(())
    }

    /// Update the per-dot-row print and feed time estimates (µs).
    pub fn set_times(&mut self, dot_print_time: u32, dot_feed_time: u32) {
        self.state.dot_print_time = dot_print_time;
        self.state.dot_feed_time = dot_feed_time;
    }

    /// Ceiling on bitmap chunk height in rows. 0 is treated as 1.
    pub fn set_max_chunk_height(&mut self, rows: u8) {
        self.state.max_chunk_height = rows;
    }

    // ========================================================================
    // PAPER MOVEMENT
    // ========================================================================

    /// Feed `lines` text lines.
    ///
    /// Old firmware overfeeds with `ESC d`, so there the feed is emulated
    /// with newlines and each line carries its own blank-line delay.
    pub async fn feed(&mut self, lines: u8) -> Result<()> {
        match self.strategy().feed {
            FeedEncoding::Batched => {
                self.write_command(&commands::feed_lines(lines)).await?;
                let delay = self
                    .state
                    .dot_feed_time
                    .saturating_mul(u32::from(self.state.char_height));
                self.set_deadline(delay);
                self.state.end_line();
            }
            FeedEncoding::NewlineEmulation => {
                for _ in 0..lines {
                    self.write_byte(LF).await?;
                }
            }
        }
        Ok(())
    }

    /// Feed `rows` individual dot rows.
    pub async fn feed_rows(&mut self, rows: u8) -> Result<()> {
        self.write_command(&commands::feed_rows(rows)).await?;
        self.set_deadline(u32::from(rows).saturating_mul(self.state.dot_feed_time));
        self.state.end_line();
        Ok(())
    }

    /// Send a form feed.
    pub async fn flush(&mut self) -> Result<()> {
        self.write_command(&commands::form_feed()).await
    }

    // ========================================================================
    // LAYOUT
    // ========================================================================

    pub async fn justify(&mut self, j: Justify) -> Result<()> {
        self.write_command(&commands::justify(j)).await
    }

    /// Set the baseline-to-baseline line height in dots (minimum 24).
    pub async fn set_line_height(&mut self, height: u8) -> Result<()> {
        self.state.set_line_height(height);
        self.write_command(&commands::line_height(height)).await
    }

    pub async fn set_char_spacing(&mut self, spacing: u8) -> Result<()> {
        self.write_command(&commands::char_spacing(spacing)).await
    }

    /// Advance to the next tab stop (every 4 columns).
    ///
    /// A tab past the end of the line leaves the column at the line end, so
    /// the next byte wraps.
    pub async fn tab(&mut self) -> Result<()> {
        self.write_command(&commands::tab()).await?;
        let next = self.state.column.saturating_add(4) & !0b11;
        self.state.column = next.min(self.state.max_column);
        Ok(())
    }

    pub async fn set_charset(&mut self, n: u8) -> Result<()> {
        self.write_command(&commands::charset(n)).await
    }

    pub async fn set_code_page(&mut self, n: u8) -> Result<()> {
        self.write_command(&commands::code_page(n)).await
    }

    // ========================================================================
    // PRINT MODE
    // ========================================================================

    async fn write_print_mode(&mut self) -> Result<()> {
        let mask = self.state.print_mode.bits();
        self.write_command(&commands::print_mode(mask)).await
    }

    /// Turn style bits on, send the full mask, and re-derive metrics.
    pub async fn set_print_mode(&mut self, mode: PrintMode) -> Result<()> {
        self.state.print_mode.insert(mode);
        self.write_print_mode().await?;
        self.state.adjust_char_values();
        Ok(())
    }

    /// Turn style bits off, send the full mask, and re-derive metrics.
    pub async fn unset_print_mode(&mut self, mode: PrintMode) -> Result<()> {
        self.state.print_mode.remove(mode);
        self.write_print_mode().await?;
        self.state.adjust_char_values();
        Ok(())
    }

    /// Clear every style bit and fall back to font A metrics.
    pub async fn normal(&mut self) -> Result<()> {
        self.state.print_mode = PrintMode::empty();
        self.write_print_mode().await?;
        self.state.adjust_char_values();
        Ok(())
    }

    pub async fn inverse_on(&mut self) -> Result<()> {
        match self.strategy().style {
            StyleEncoding::Dedicated => self.write_command(&commands::inverse(true)).await,
            StyleEncoding::PrintModeMask => self.set_print_mode(PrintMode::INVERSE).await,
        }
    }

    pub async fn inverse_off(&mut self) -> Result<()> {
        match self.strategy().style {
            StyleEncoding::Dedicated => self.write_command(&commands::inverse(false)).await,
            StyleEncoding::PrintModeMask => self.unset_print_mode(PrintMode::INVERSE).await,
        }
    }

    pub async fn upside_down_on(&mut self) -> Result<()> {
        match self.strategy().style {
            StyleEncoding::Dedicated => self.write_command(&commands::upside_down(true)).await,
            StyleEncoding::PrintModeMask => self.set_print_mode(PrintMode::UPSIDE_DOWN).await,
        }
    }

    pub async fn upside_down_off(&mut self) -> Result<()> {
        match self.strategy().style {
            StyleEncoding::Dedicated => self.write_command(&commands::upside_down(false)).await,
            StyleEncoding::PrintModeMask => self.unset_print_mode(PrintMode::UPSIDE_DOWN).await,
        }
    }

    pub async fn bold_on(&mut self) -> Result<()> {
        self.set_print_mode(PrintMode::BOLD).await
    }

    pub async fn bold_off(&mut self) -> Result<()> {
        self.unset_print_mode(PrintMode::BOLD).await
    }

    pub async fn double_height_on(&mut self) -> Result<()> {
        self.set_print_mode(PrintMode::DOUBLE_HEIGHT).await
    }

    pub async fn double_height_off(&mut self) -> Result<()> {
        self.unset_print_mode(PrintMode::DOUBLE_HEIGHT).await
    }

    pub async fn double_width_on(&mut self) -> Result<()> {
        self.set_print_mode(PrintMode::DOUBLE_WIDTH).await
    }

    pub async fn double_width_off(&mut self) -> Result<()> {
        self.unset_print_mode(PrintMode::DOUBLE_WIDTH).await
    }

    pub async fn strike_on(&mut self) -> Result<()> {
        self.set_print_mode(PrintMode::STRIKE).await
    }

    pub async fn strike_off(&mut self) -> Result<()> {
        self.unset_print_mode(PrintMode::STRIKE).await
    }

    pub async fn set_font(&mut self, font: Font) -> Result<()> {
        match font {
            Font::B => self.set_print_mode(PrintMode::FONT_B).await,
            Font::A => self.unset_print_mode(PrintMode::FONT_B).await,
        }
    }

    pub async fn set_size(&mut self, size: Size) -> Result<()> {
        match size {
            Size::Small => {
                self.double_width_off().await?;
                self.double_height_off().await
            }
            Size::Medium => {
                self.double_height_on().await?;
                self.double_width_off().await
            }
            Size::Large => {
                self.double_height_on().await?;
                self.double_width_on().await
            }
        }
    }

    /// Underline with weight 1 (normal) or 2 (thick); larger is clamped.
    pub async fn underline_on(&mut self, weight: u8) -> Result<()> {
        self.write_command(&commands::underline(weight)).await
    }

    pub async fn underline_off(&mut self) -> Result<()> {
        self.write_command(&commands::underline(0)).await
    }

    // ========================================================================
    // PRINT QUALITY
    // ========================================================================

    pub async fn set_heat_config(
        &mut self,
        max_heating_dots: u8,
        heating_time: u8,
        heating_interval: u8,
    ) -> Result<()> {
        self.write_units(&commands::heat_config(
            max_heating_dots,
            heating_time,
            heating_interval,
        ))
        .await
    }

    /// Density 0-7 (50% + 5% each step) and break time 0-31 (250µs each).
    pub async fn set_print_density(&mut self, density: u8, break_time: u8) -> Result<()> {
        self.write_command(&commands::print_density(density, break_time))
            .await
    }

    // ========================================================================
    // BARCODES
    // ========================================================================

    /// Set the barcode bar height in dots (minimum 1).
    pub async fn set_barcode_height(&mut self, dots: u8) -> Result<()> {
        let dots = dots.max(1);
        self.state.barcode_height = dots;
        self.write_command(&barcode::height(dots)).await
    }

    /// Print a 1D barcode with its label underneath.
    ///
    /// Always feeds one line first: some firmware refuses to print a
    /// barcode that does not start on a fresh line.
    pub async fn print_barcode(&mut self, text: &str, kind: BarcodeType) -> Result<()> {
        self.feed(1).await?;
        let strategy = self.strategy();

        self.write_command(&barcode::label_below()).await?;
        self.write_command(&barcode::module_width(3)).await?;
        self.write_command(&barcode::select(kind.code(strategy.barcode_type_offset)))
            .await?;
        for b in barcode::payload(text.as_bytes(), strategy.barcode) {
            self.write_command(&[b]).await?;
        }

        let rows = u32::from(self.state.barcode_height) + BARCODE_LABEL_ROWS;
        self.set_deadline(rows.saturating_mul(self.state.dot_print_time));
        self.state.prev_byte = LF;
        Ok(())
    }

    // ========================================================================
    // POWER
    // ========================================================================

    /// Take the printer offline; print commands are ignored until online.
    pub async fn offline(&mut self) -> Result<()> {
        self.write_command(&commands::online(false)).await
    }

    pub async fn online(&mut self) -> Result<()> {
        self.write_command(&commands::online(true)).await
    }

    /// Enter low-power mode immediately.
    pub async fn sleep(&mut self) -> Result<()> {
        // 0 would mean "never sleep".
        self.sleep_after(1).await
    }

    /// Enter low-power mode after `seconds` of inactivity.
    pub async fn sleep_after(&mut self, seconds: u16) -> Result<()> {
        debug!(seconds, "sleep");
        let cmd = match self.strategy().sleep {
            SleepEncoding::TwoByte => commands::sleep_after_u16(seconds),
            SleepEncoding::OneByte => commands::sleep_after_u8(seconds),
        };
        self.write_command(&cmd).await
    }

    /// Wake the printer from low-power mode.
    pub async fn wake(&mut self) -> Result<()> {
        debug!("wake");
        self.set_deadline(0);
        self.write_command(&[WAKE]).await?;

        match self.strategy().wake {
            WakeStrategy::CancelSleep => {
                self.port.sleep_millis(WAKE_SETTLE_MS).await;
                self.write_command(&commands::sleep_after_u16(0)).await?;
            }
            WakeStrategy::NulPadding => {
                for _ in 0..WAKE_NUL_COUNT {
                    self.write_command(&[NUL]).await?;
                    self.set_deadline(WAKE_NUL_DELAY_US);
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::firmware::Firmware;
    use crate::transport::MockPort;
    use pretty_assertions::assert_eq;

    const BYTE_TIME: u32 = 573;

    fn printer(firmware: u16) -> Printer<MockPort> {
        let config = PrinterConfig {
            firmware: Firmware(firmware),
            ..Default::default()
        };
        Printer::new(MockPort::new(), &config)
    }

    /// Deadline left after the last operation; the mock clock only moves
    /// when the driver yields, so this is exactly the computed delay.
    fn pending(p: &Printer<MockPort>) -> u32 {
        p.resume_at().wrapping_sub(p.port().now_micros())
    }

    // ========== Text Path ==========

    #[tokio::test]
    async fn test_carriage_return_is_stripped() {
        let mut p = printer(268);
        p.write_byte(b'A').await.unwrap();
        let before = p.resume_at();
        p.write_byte(CR).await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![b'A']);
        assert_eq!(p.resume_at(), before);
        assert_eq!(p.state().column, 1);
    }

    #[tokio::test]
    async fn test_plain_byte_costs_one_byte_time() {
        let mut p = printer(268);
        p.write_byte(b'x').await.unwrap();
        assert_eq!(pending(&p), BYTE_TIME);
        assert_eq!(p.state().prev_byte, b'x');
    }

    #[tokio::test]
    async fn test_text_line_delay() {
        let mut p = printer(268);
        p.print("hi").await.unwrap();
        p.write_byte(LF).await.unwrap();
        assert_eq!(pending(&p), BYTE_TIME + 24 * 30_000 + 6 * 2_100);
        assert_eq!(p.state().column, 0);
        assert_eq!(p.state().prev_byte, LF);
    }

    #[tokio::test]
    async fn test_blank_line_delay() {
        let mut p = printer(268);
        p.write_byte(LF).await.unwrap();
        assert_eq!(pending(&p), BYTE_TIME + (24 + 6) * 2_100);
    }

    #[tokio::test]
    async fn test_wrap_counts_as_newline() {
        let mut p = printer(268);
        p.state.column = 32;
        p.state.prev_byte = b'q';
        p.write_byte(b'Z').await.unwrap();
        assert_eq!(p.state().column, 0);
        assert_eq!(p.state().prev_byte, LF);
        assert_eq!(pending(&p), BYTE_TIME + 24 * 30_000 + 6 * 2_100);
    }

    #[tokio::test]
    async fn test_no_byte_before_deadline() {
        let mut p = printer(268);
        p.println("ab").await.unwrap();
        p.print("c").await.unwrap();
        let sent = p.port().sent().to_vec();
        // 'c' went out only after the newline's line delay elapsed.
        let newline_at = sent[2].at;
        let c_at = sent[3].at;
        assert!(c_at.wrapping_sub(newline_at) >= BYTE_TIME + 24 * 30_000 + 6 * 2_100);
    }

    // ========== Reset / Begin ==========

    #[tokio::test]
    async fn test_reset_on_legacy_firmware_skips_tab_stops() {
        let mut p = printer(263);
        p.reset().await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![0x1B, 0x40]);
    }

    #[tokio::test]
    async fn test_begin_sequence_current_firmware() {
        let mut p = printer(268);
        p.begin().await.unwrap();
        let bytes = p.port().sent_bytes();
        let mut expected = vec![0xFF, 0x1B, 0x38, 0, 0, 0x1B, 0x40, 0x1B, 0x44];
        expected.extend([4, 8, 12, 16, 20, 24, 28, 0]);
        expected.extend([0x1B, 0x37, 11, 120, 40]);
        assert_eq!(bytes, expected);
        // Nothing went out before the cold-boot delay.
        assert!(p.port().sent()[0].at >= BOOT_DELAY_US);
        assert_eq!(p.port().sleeps(), &[WAKE_SETTLE_MS]);
    }

    #[tokio::test]
    async fn test_begin_with_handshake_enables_busy_line() {
        let config = PrinterConfig {
            handshake: Some(crate::printer::config::HandshakeLine::Cts),
            ..Default::default()
        };
        let mut p = Printer::new(MockPort::new(), &config);
        assert_eq!(p.flow_control(), FlowControl::Handshake);
        p.begin().await.unwrap();
        let bytes = p.port().sent_bytes();
        assert_eq!(&bytes[bytes.len() - 3..], &[0x1D, 0x61, 0x20]);
    }

    #[tokio::test]
    async fn test_handshake_ignores_deadline() {
        let config = PrinterConfig {
            handshake: Some(crate::printer::config::HandshakeLine::Dsr),
            ..Default::default()
        };
        let mut p = Printer::new(MockPort::new().with_busy_reads(3), &config);
        p.write_byte(b'a').await.unwrap();
        assert_eq!(p.port().yields(), 3);
        // The 573µs deadline from 'a' is still pending, but the line is idle.
        p.write_byte(b'b').await.unwrap();
        assert_eq!(p.port().yields(), 3);
        assert_eq!(p.port().sent()[0].at, p.port().sent()[1].at);
    }

    #[tokio::test]
    async fn test_begin_applies_configured_timing() {
        let config = PrinterConfig {
            dot_print_time_us: 20_000,
            dot_feed_time_us: 1_000,
            max_chunk_height: 64,
            ..Default::default()
        };
        let mut p = Printer::new(MockPort::new(), &config);
        p.set_times(1, 1);
        p.state.max_chunk_height = 1;
        p.begin().await.unwrap();
        assert_eq!(p.state().dot_print_time, 20_000);
        assert_eq!(p.state().dot_feed_time, 1_000);
        assert_eq!(p.state().max_chunk_height, 64);
    }

    // ========== Wake / Sleep ==========

    #[tokio::test]
    async fn test_wake_legacy_pads_with_nuls() {
        let mut p = printer(263);
        p.wake().await.unwrap();
        let mut expected = vec![0xFF];
        expected.extend([0u8; 10]);
        assert_eq!(p.port().sent_bytes(), expected);
        assert!(p.port().sleeps().is_empty());
        assert_eq!(pending(&p), WAKE_NUL_DELAY_US);
        // Each NUL waited out the previous padding delay.
        let sent = p.port().sent();
        for pair in sent[1..].windows(2) {
            assert!(pair[1].at.wrapping_sub(pair[0].at) >= WAKE_NUL_DELAY_US);
        }
    }

    #[tokio::test]
    async fn test_sleep_encoding_by_firmware() {
        let mut p = printer(264);
        p.sleep_after(300).await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![0x1B, 0x38, 0x2C, 0x01]);

        let mut p = printer(263);
        p.sleep().await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![0x1B, 0x38, 0x01]);
    }

    #[tokio::test]
    async fn test_offline() {
        let mut p = printer(268);
        p.offline().await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![0x1B, 0x3D, 0]);
        assert_eq!(pending(&p), 3 * BYTE_TIME);
    }

    // ========== Feeds ==========

    #[tokio::test]
    async fn test_feed_batched_delay() {
        let mut p = printer(264);
        p.print("x").await.unwrap();
        p.feed(3).await.unwrap();
        assert_eq!(&p.port().sent_bytes()[1..], &[0x1B, 0x64, 3]);
        assert_eq!(pending(&p), 2_100 * 24);
        assert_eq!(p.state().column, 0);
        assert_eq!(p.state().prev_byte, LF);
    }

    #[tokio::test]
    async fn test_feed_rows() {
        let mut p = printer(268);
        p.feed_rows(12).await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![0x1B, 0x4A, 12]);
        assert_eq!(pending(&p), 12 * 2_100);
        assert_eq!(p.state().column, 0);
    }

    #[tokio::test]
    async fn test_test_page_delay() {
        let mut p = printer(268);
        p.test_page().await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![0x12, 0x54]);
        assert_eq!(pending(&p), 30_000 * 24 * 26 + 2_100 * (6 * 26 + 30));
    }

    #[tokio::test]
    async fn test_hello_world() {
        let mut p = printer(268);
        p.test().await.unwrap();
        let mut expected = b"Hello World!".to_vec();
        expected.extend([LF, 0x1B, 0x64, 2]);
        assert_eq!(p.port().sent_bytes(), expected);
        assert_eq!(pending(&p), 24 * 2_100);
    }

    // ========== Print Mode ==========

    #[tokio::test]
    async fn test_bold_toggle_is_reversible() {
        let mut p = printer(268);
        let before = p.state().clone();
        p.bold_on().await.unwrap();
        assert!(p.state().print_mode.contains(PrintMode::BOLD));
        p.bold_off().await.unwrap();
        assert_eq!(p.state().print_mode, before.print_mode);
        assert_eq!(p.state().max_column, before.max_column);
        assert_eq!(p.state().char_height, before.char_height);
        assert_eq!(
            p.port().sent_bytes(),
            vec![0x1B, 0x21, 0x08, 0x1B, 0x21, 0x00]
        );
    }

    #[tokio::test]
    async fn test_mode_command_carries_full_mask() {
        let mut p = printer(268);
        p.double_width_on().await.unwrap();
        p.bold_on().await.unwrap();
        assert_eq!(&p.port().sent_bytes()[3..], &[0x1B, 0x21, 0x28]);
        assert_eq!(p.state().max_column, 16);
    }

    #[tokio::test]
    async fn test_inverse_encoding_by_firmware() {
        let mut p = printer(268);
        p.inverse_on().await.unwrap();
        p.upside_down_on().await.unwrap();
        assert_eq!(
            p.port().sent_bytes(),
            vec![0x1D, 0x42, 0x01, 0x1B, 0x7B, 0x01]
        );
        assert_eq!(p.state().print_mode, PrintMode::empty());

        let mut p = printer(267);
        p.inverse_on().await.unwrap();
        p.upside_down_on().await.unwrap();
        assert_eq!(
            p.port().sent_bytes(),
            vec![0x1B, 0x21, 0x02, 0x1B, 0x21, 0x06]
        );
        p.inverse_off().await.unwrap();
        assert_eq!(p.state().print_mode, PrintMode::UPSIDE_DOWN);
    }

    #[tokio::test]
    async fn test_size_presets() {
        let mut p = printer(268);
        p.set_size(Size::Large).await.unwrap();
        assert_eq!((p.state().char_height, p.state().max_column), (48, 16));
        p.set_size(Size::Medium).await.unwrap();
        assert_eq!((p.state().char_height, p.state().max_column), (48, 32));
        p.set_size(Size::Small).await.unwrap();
        assert_eq!((p.state().char_height, p.state().max_column), (24, 32));
    }

    #[tokio::test]
    async fn test_font_b_metrics() {
        let mut p = printer(268);
        p.set_font(Font::B).await.unwrap();
        assert_eq!((p.state().char_height, p.state().max_column), (17, 42));
        p.set_font(Font::A).await.unwrap();
        assert_eq!((p.state().char_height, p.state().max_column), (24, 32));
    }

    #[tokio::test]
    async fn test_normal_clears_mask() {
        let mut p = printer(268);
        p.strike_on().await.unwrap();
        p.normal().await.unwrap();
        assert_eq!(p.state().print_mode, PrintMode::empty());
        assert_eq!(&p.port().sent_bytes()[3..], &[0x1B, 0x21, 0x00]);
    }

    #[tokio::test]
    async fn test_normal_restores_font_a_metrics() {
        let mut p = printer(268);
        p.set_font(Font::B).await.unwrap();
        p.double_height_on().await.unwrap();
        assert_eq!((p.state().char_height, p.state().max_column), (34, 42));
        p.normal().await.unwrap();
        assert_eq!((p.state().char_height, p.state().max_column), (24, 32));
    }

    #[tokio::test]
    async fn test_narrowing_clamps_column() {
        let mut p = printer(268);
        p.print(&"x".repeat(20)).await.unwrap();
        assert_eq!(p.state().column, 20);
        p.double_width_on().await.unwrap();
        assert_eq!(p.state().column, 16);
        // Next byte wraps instead of running past the line end.
        p.print(&"y".repeat(240)).await.unwrap();
        assert!(p.state().column <= p.state().max_column);
    }

    #[test]
    fn test_size_from_char() {
        assert_eq!(Size::from_char('l'), Size::Large);
        assert_eq!(Size::from_char('M'), Size::Medium);
        assert_eq!(Size::from_char('x'), Size::Small);
    }

    // ========== Layout ==========

    #[tokio::test]
    async fn test_tab_rounds_column() {
        let mut p = printer(268);
        p.print("ab").await.unwrap();
        p.tab().await.unwrap();
        assert_eq!(p.state().column, 4);
        p.tab().await.unwrap();
        assert_eq!(p.state().column, 8);
    }

    #[tokio::test]
    async fn test_tab_at_line_end_stays_in_bounds() {
        let mut p = printer(268);
        p.print(&"x".repeat(32)).await.unwrap();
        p.tab().await.unwrap();
        assert_eq!(p.state().column, 32);
        p.print(&"y".repeat(230)).await.unwrap();
        assert!(p.state().column <= 32);

        let mut p = printer(268);
        p.print(&"x".repeat(30)).await.unwrap();
        p.tab().await.unwrap();
        assert_eq!(p.state().column, 32);
        p.write_byte(b'z').await.unwrap();
        assert_eq!(p.state().column, 0);
        assert_eq!(p.state().prev_byte, LF);
    }

    #[tokio::test]
    async fn test_flush_sends_form_feed() {
        let mut p = printer(268);
        p.flush().await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![0x0C]);
        assert_eq!(pending(&p), BYTE_TIME);
    }

    #[tokio::test]
    async fn test_char_spacing() {
        let mut p = printer(268);
        p.set_char_spacing(5).await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![0x1B, 0x20, 5]);
        assert_eq!(pending(&p), 3 * BYTE_TIME);
    }

    #[tokio::test]
    async fn test_line_height_updates_spacing() {
        let mut p = printer(268);
        p.set_line_height(40).await.unwrap();
        assert_eq!(p.state().line_spacing, 16);
        p.set_line_height(5).await.unwrap();
        assert_eq!(p.state().line_spacing, 0);
        assert_eq!(&p.port().sent_bytes()[3..], &[0x1B, 0x33, 24]);
    }

    #[tokio::test]
    async fn test_multi_unit_command_deadline() {
        let mut p = printer(268);
        p.set_heat_config(7, 80, 2).await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![0x1B, 0x37, 7, 80, 2]);
        // Deadline reflects only the last write (3 bytes).
        assert_eq!(pending(&p), 3 * BYTE_TIME);
    }

    #[tokio::test]
    async fn test_clamped_parameters() {
        let mut p = printer(268);
        p.underline_on(5).await.unwrap();
        p.set_print_density(15, 3).await.unwrap();
        p.set_barcode_height(0).await.unwrap();
        assert_eq!(
            p.port().sent_bytes(),
            vec![0x1B, 0x2D, 2, 0x12, 0x23, (7 << 5) | 3, 0x1D, 0x68, 1]
        );
        assert_eq!(p.state().barcode_height, 1);
    }

    // ========== Barcodes ==========

    #[tokio::test]
    async fn test_barcode_current_firmware() {
        let mut p = printer(268);
        p.print_barcode("42", BarcodeType::Code128).await.unwrap();
        assert_eq!(
            p.port().sent_bytes(),
            vec![
                0x1B, 0x64, 1, // forced feed
                0x1D, 0x48, 2, 0x1D, 0x77, 3, 0x1D, 0x6B, 73, // setup
                2, b'4', b'2', // length-prefixed payload
            ]
        );
        assert_eq!(pending(&p), (50 + 40) * 30_000);
        assert_eq!(p.state().prev_byte, LF);
    }

    #[tokio::test]
    async fn test_barcode_legacy_firmware() {
        let mut p = printer(263);
        p.print_barcode("42", BarcodeType::Code128).await.unwrap();
        assert_eq!(
            p.port().sent_bytes(),
            vec![
                0x0A, // forced feed, emulated
                0x1D, 0x48, 2, 0x1D, 0x77, 3, 0x1D, 0x6B, 8, // setup
                b'4', b'2', 0, // NUL-terminated payload
            ]
        );
    }
}
