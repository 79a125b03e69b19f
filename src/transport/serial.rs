//! # Serial TTY Transport
//!
//! This module talks to the printer over a serial TTY: a USB-serial
//! adapter (`/dev/ttyUSB0`), an on-board UART (`/dev/ttyS0`,
//! `/dev/serial0` on a Raspberry Pi), or a bound RFCOMM device.
//!
//! ## Wiring
//!
//! The printer's RX goes to the adapter's TX. Its TX (status replies) is
//! optional and only needed for the paper probe. If the printer's DTR
//! busy output is wired to one of the adapter's modem-status inputs
//! (usually CTS), select that line in the config to switch the driver from
//! timing estimates to hardware flow control.
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so binary data passes untouched:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL, IXON, IXOFF, IXANY off
//! - **No output processing**: OPOST off (no LF → CRLF translation)
//! - **8N1**: CS8, no parity, one stop bit
//! - **Non-canonical, no echo**: ICANON, ECHO, ECHONL, ISIG, IEXTEN off
//! - **Non-blocking reads**: VMIN = 0, VTIME = 0
//!
//! XON/XOFF must stay disabled: 0x11 and 0x13 appear in bitmap data.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::Port;
use crate::error::{PrinterError, Result};
use crate::printer::config::HandshakeLine;

/// Default serial device path
pub const DEFAULT_DEVICE: &str = "/dev/serial0";

/// # Serial Printer Port
///
/// ## Example
///
/// ```no_run
/// use kp347::printer::{Printer, PrinterConfig};
/// use kp347::transport::SerialPort;
///
/// # async fn demo() -> kp347::Result<()> {
/// let config = PrinterConfig::default();
/// let port = SerialPort::open("/dev/ttyUSB0", &config)?;
/// let mut printer = Printer::new(port, &config);
/// printer.begin().await?;
/// printer.println("Hello!").await?;
/// # Ok(())
/// # }
/// ```
pub struct SerialPort {
    file: File,
    epoch: Instant,
    handshake: Option<HandshakeLine>,
}

impl SerialPort {
    /// Open and configure a serial device.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The device doesn't exist
    /// - Permission denied (may need the dialout group)
    /// - The configured baud rate has no termios constant
    /// - TTY configuration fails
    pub fn open<P: AsRef<Path>>(
        device: P,
        config: &crate::printer::PrinterConfig,
    ) -> Result<Self> {
        let path = device.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .map_err(|e| {
                PrinterError::Transport(format!("Failed to open {}: {}", path.display(), e))
            })?;

        let speed = baud_constant(config.baud_rate)?;
        configure_tty_raw(file.as_raw_fd(), speed)?;

        tracing::debug!(
            device = %path.display(),
            baud = config.baud_rate,
            handshake = ?config.handshake,
            "serial port opened"
        );

        Ok(Self {
            file,
            epoch: Instant::now(),
            handshake: config.handshake,
        })
    }

    /// Open with the default device path.
    pub fn open_default(config: &crate::printer::PrinterConfig) -> Result<Self> {
        Self::open(DEFAULT_DEVICE, config)
    }

    fn modem_bits(&self) -> Result<libc::c_int> {
        let mut bits: libc::c_int = 0;
        let result = unsafe { libc::ioctl(self.file.as_raw_fd(), libc::TIOCMGET, &mut bits) };
        if result != 0 {
            return Err(PrinterError::Transport(format!(
                "TIOCMGET failed: {}",
                io::Error::last_os_error()
            )));
        }
        Ok(bits)
    }
}

#[async_trait]
impl Port for SerialPort {
    fn now_micros(&self) -> u32 {
        // Truncation is the intended wrap.
        self.epoch.elapsed().as_micros() as u32
    }

    fn send_byte(&mut self, byte: u8) -> Result<()> {
        self.file
            .write_all(&[byte])
            .map_err(|e| PrinterError::Transport(format!("Write failed: {}", e)))
    }

    fn receive_available(&mut self) -> Result<bool> {
        let mut count: libc::c_int = 0;
        let result = unsafe { libc::ioctl(self.file.as_raw_fd(), libc::FIONREAD, &mut count) };
        if result != 0 {
            return Err(PrinterError::Transport(format!(
                "FIONREAD failed: {}",
                io::Error::last_os_error()
            )));
        }
        Ok(count > 0)
    }

    fn receive_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.file.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(PrinterError::Transport(format!("Read failed: {}", e))),
        }
    }

    fn handshake_busy(&mut self) -> Result<bool> {
        match self.handshake {
            Some(line) => Ok(self.modem_bits()? & modem_mask(line) != 0),
            None => Ok(false),
        }
    }

    async fn sleep_millis(&mut self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn yield_now(&mut self) {
        tokio::task::yield_now().await;
    }
}

/// `TIOCM_*` bit for a handshake line.
fn modem_mask(line: HandshakeLine) -> libc::c_int {
    match line {
        HandshakeLine::Cts => libc::TIOCM_CTS,
        HandshakeLine::Dsr => libc::TIOCM_DSR,
        HandshakeLine::Dcd => libc::TIOCM_CAR,
        HandshakeLine::Ri => libc::TIOCM_RNG,
    }
}

/// Map a numeric baud rate to its termios speed constant.
fn baud_constant(baud: u32) -> Result<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        other => {
            return Err(PrinterError::Config(format!(
                "Unsupported baud rate {}",
                other
            )));
        }
    };
    Ok(speed)
}

/// Configure a file descriptor for raw 8N1 TTY mode at `speed`.
fn configure_tty_raw(fd: i32, speed: libc::speed_t) -> Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(PrinterError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);

    termios.c_oflag &= !libc::OPOST;

    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB | libc::CRTSCTS);
    termios.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;

    // Reads return immediately with whatever is buffered.
    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = 0;

    let speed_ok = unsafe {
        libc::cfsetispeed(&mut termios, speed) == 0 && libc::cfsetospeed(&mut termios, speed) == 0
    };
    if !speed_ok {
        return Err(PrinterError::Transport(format!(
            "cfsetspeed failed: {}",
            io::Error::last_os_error()
        )));
    }

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(PrinterError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_path() {
        assert_eq!(DEFAULT_DEVICE, "/dev/serial0");
    }

    #[test]
    fn test_baud_constants() {
        assert_eq!(baud_constant(19200).unwrap(), libc::B19200);
        assert_eq!(baud_constant(9600).unwrap(), libc::B9600);
        assert!(matches!(
            baud_constant(12345),
            Err(PrinterError::Config(_))
        ));
    }

    #[test]
    fn test_modem_masks_are_distinct() {
        let masks = [
            modem_mask(HandshakeLine::Cts),
            modem_mask(HandshakeLine::Dsr),
            modem_mask(HandshakeLine::Dcd),
            modem_mask(HandshakeLine::Ri),
        ];
        for (i, a) in masks.iter().enumerate() {
            for b in &masks[i + 1..] {
                assert_eq!(a & b, 0);
            }
        }
    }

    #[test]
    fn test_open_missing_device_fails() {
        let config = crate::printer::PrinterConfig::default();
        let result = SerialPort::open("/dev/does-not-exist-kp347", &config);
        assert!(matches!(result, Err(PrinterError::Transport(_))));
    }

    // Note: Most transport tests require actual hardware.
}
