//! # kp347 CLI
//!
//! Command-line interface for KP-347 serial thermal printers.
//!
//! ## Usage
//!
//! ```bash
//! # Print a few lines of text
//! kp347 text "Hello" "World"
//!
//! # Print stdin, centered and bold
//! echo "ORDER 42" | kp347 text --justify c --bold
//!
//! # Print the printer's self-test page
//! kp347 test-page
//!
//! # Check the paper sensor
//! kp347 paper
//!
//! # Print an image (thresholded to black and white)
//! kp347 bitmap logo.png --threshold 100
//!
//! # Print a barcode
//! kp347 barcode 012345678905 --kind upca
//!
//! # Use another device and a config file
//! kp347 --device /dev/ttyUSB0 --config printer.json feed 3
//! ```
//!
//! Set `RUST_LOG=kp347=debug` to see what the driver is doing.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kp347::{
    PrinterError,
    printer::{Bitmap, Printer, PrinterConfig, Size},
    protocol::{barcode::BarcodeType, commands::Justify},
    transport::serial::{DEFAULT_DEVICE, SerialPort},
};

/// kp347 - Serial thermal receipt printer utility
#[derive(Parser, Debug)]
#[command(name = "kp347")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Serial device path
    #[arg(long, global = true, default_value = DEFAULT_DEVICE)]
    device: PathBuf,

    /// JSON config file (baud rate, firmware, timing, handshake)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print lines of text (reads stdin when none are given)
    Text {
        lines: Vec<String>,

        /// Bold text
        #[arg(long)]
        bold: bool,

        /// Justification: l, c or r
        #[arg(long, default_value = "l")]
        justify: char,

        /// Character size: s, m or l
        #[arg(long, default_value = "s")]
        size: char,

        /// Lines to feed afterwards
        #[arg(long, default_value = "2")]
        feed: u8,
    },

    /// Print the built-in self-test page
    TestPage,

    /// Query the paper sensor
    Paper,

    /// Print an image file
    Bitmap {
        file: PathBuf,

        /// Pixels darker than this print black
        #[arg(long, default_value = "128")]
        threshold: u8,
    },

    /// Print a 1D barcode
    Barcode {
        text: String,

        /// Symbology (upca, upce, ean13, ean8, code39, itf, codabar, code93, code128)
        #[arg(long, default_value = "code128")]
        kind: String,
    },

    /// Feed paper
    Feed {
        /// Text lines to feed
        #[arg(default_value = "3")]
        lines: u8,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), PrinterError> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PrinterConfig::from_file(path)?,
        None => PrinterConfig::default(),
    };

    // Decode before touching the device so a bad file fails fast.
    let bitmap = match &cli.command {
        Commands::Bitmap { file, threshold } => Some(load_bitmap(file, *threshold)?),
        _ => None,
    };

    let port = SerialPort::open(&cli.device, &config)?;
    let mut printer = Printer::new(port, &config);
    printer.begin().await?;

    match cli.command {
        Commands::Text {
            lines,
            bold,
            justify,
            size,
            feed,
        } => {
            let lines = if lines.is_empty() {
                read_stdin_lines()?
            } else {
                lines
            };

            printer.justify(Justify::from_char(justify)).await?;
            printer.set_size(Size::from_char(size)).await?;
            if bold {
                printer.bold_on().await?;
            }
            for line in &lines {
                printer.println(line).await?;
            }
            printer.set_default().await?;
            printer.feed(feed).await?;
        }
        Commands::TestPage => {
            printer.test_page().await?;
        }
        Commands::Paper => {
            let status = printer.has_paper().await?;
            println!("{}", status);
            if !status.is_present() {
                std::process::exit(2);
            }
        }
        Commands::Bitmap { .. } => {
            if let Some(bitmap) = bitmap {
                println!("Printing {}x{} bitmap...", bitmap.width, bitmap.height);
                printer.print_image(&bitmap).await?;
                printer.feed(2).await?;
            }
        }
        Commands::Barcode { text, kind } => {
            let kind = BarcodeType::parse(&kind).ok_or_else(|| {
                PrinterError::Config(format!("Unknown barcode type '{}'", kind))
            })?;
            printer.print_barcode(&text, kind).await?;
            printer.feed(2).await?;
        }
        Commands::Feed { lines } => {
            printer.feed(lines).await?;
        }
    }

    // Let the last command finish before the port is closed.
    printer.await_ready().await?;
    Ok(())
}

fn load_bitmap(path: &Path, threshold: u8) -> Result<Bitmap, PrinterError> {
    let img = image::open(path).map_err(|e| {
        PrinterError::Image(format!("Failed to load {}: {}", path.display(), e))
    })?;
    Bitmap::from_luma(&img.to_luma8(), threshold)
}

fn read_stdin_lines() -> Result<Vec<String>, PrinterError> {
    let stdin = std::io::stdin();
    let lines = stdin.lock().lines().collect::<Result<Vec<_>, _>>()?;
    Ok(lines)
}
