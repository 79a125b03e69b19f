//! # KP-347 Protocol Implementation
//!
//! This module provides low-level command builders for the ESC/POS dialect
//! spoken by KP-347 class thermal receipt printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: Control bytes and stateless command builders
//! - [`barcode`]: 1D barcode setup and payload framing
//! - [`firmware`]: Per-firmware-version encoding strategy table
//!
//! ## Usage Example
//!
//! ```
//! use kp347::protocol::{barcode, commands, firmware::Firmware};
//!
//! let fw = Firmware(268);
//! let strategy = fw.strategy();
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(commands::justify(commands::Justify::Center));
//! data.extend(barcode::select(barcode::BarcodeType::Code128.code(strategy.barcode_type_offset)));
//! data.extend(barcode::payload(b"12345", strategy.barcode));
//! ```
//!
//! These builders only produce bytes. Pacing them so the printer's buffer
//! never overruns is the job of [`crate::printer::Printer`].

pub mod barcode;
pub mod commands;
pub mod firmware;
