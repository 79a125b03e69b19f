//! # Printer Module
//!
//! The driver core: configuration, host-side state, pacing, and the
//! [`Printer`] that ties them to a [`Port`](crate::transport::Port).
//!
//! ## Modules
//!
//! - [`config`]: Operator-tunable settings (baud, firmware, timing, heat)
//! - [`state`]: Styles, column tracking and character metrics
//! - [`throttle`]: Single-deadline pacing on a wrapping clock
//! - [`driver`]: Text, formatting, barcodes, power
//! - [`bitmap`]: Chunked raster transfers
//! - [`status`]: Paper sensor probe

pub mod bitmap;
pub mod config;
pub mod driver;
pub mod state;
pub mod status;
pub mod throttle;

pub use bitmap::{Bitmap, ChunkPlan};
pub use config::{HandshakeLine, HeatProfile, PrinterConfig};
pub use driver::{Font, Printer, Size};
pub use state::{PrintMode, PrinterState};
pub use status::PaperStatus;
pub use throttle::FlowControl;
