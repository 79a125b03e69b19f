//! # kp347 - Serial Thermal Printer Driver
//!
//! kp347 drives the small 58mm TTL-serial thermal printers built around
//! the KP-347 mechanism. It provides:
//!
//! - **Protocol implementation**: ESC/POS-style command builders, including
//!   the framing differences between firmware revisions
//! - **Pacing**: the printer has no flow control by default, so every write
//!   is followed by an estimated busy time the driver waits out
//! - **Bitmaps**: raster images split into buffer-safe chunks
//! - **Transport**: a Unix serial TTY, plus a scripted mock for tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use kp347::{
//!     printer::{Printer, PrinterConfig},
//!     protocol::{barcode::BarcodeType, commands::Justify},
//!     transport::SerialPort,
//! };
//!
//! # async fn demo() -> kp347::Result<()> {
//! let config = PrinterConfig::from_file("printer.json")?;
//! let port = SerialPort::open("/dev/serial0", &config)?;
//!
//! let mut printer = Printer::new(port, &config);
//! printer.begin().await?;
//!
//! printer.justify(Justify::Center).await?;
//! printer.double_height_on().await?;
//! printer.println("RECEIPT").await?;
//! printer.double_height_off().await?;
//!
//! printer.print_barcode("ORDER-42", BarcodeType::Code128).await?;
//! printer.feed(3).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Command builders and the firmware strategy table |
//! | [`printer`] | Driver, state, pacing, bitmaps, paper probe |
//! | [`transport`] | Port trait and backends |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Tested against firmware 2.68; 2.64 and older units are handled through
//! the firmware setting in [`PrinterConfig`].

pub mod error;
pub mod printer;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use error::{PrinterError, Result};
pub use printer::{Printer, PrinterConfig};
