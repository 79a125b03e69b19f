//! # Bitmap Printing
//!
//! The printer's receive buffer holds 256 bytes of raster data, so a
//! bitmap is sent as a series of `DC2 *` chunks, each small enough to fit,
//! with a print-time deadline after every chunk.
//!
//! ## Chunk Geometry
//!
//! ```text
//! row_bytes          = ceil(width / 8)
//! row_bytes_clipped  = min(row_bytes, 48)        384 dots max
//! chunk_height_limit = clamp(256 / row_bytes_clipped, 1, max_chunk_height)
//! ```
//!
//! Rows wider than the print head are read in full but only the first 48
//! bytes are transmitted.
//!
//! ## Sources
//!
//! Bitmap data comes from a preloaded slice ([`Printer::print_bitmap`]) or
//! from a [`BitmapSource`] that delivers bytes as they arrive
//! ([`Printer::print_bitmap_from_stream`]). Slices are length-checked
//! before anything is sent. A stream that closes early fails mid-transfer;
//! the bytes already sent stay sent.

use image::GrayImage;
use tracing::{debug, trace, warn};

use super::driver::Printer;
use crate::error::{PrinterError, Result};
use crate::protocol::commands::{self, LF, MAX_ROW_BYTES};
use crate::transport::{BitmapSource, Port, SliceSource, StreamByte};

/// Raster bytes the printer can buffer per chunk.
const CHUNK_BUFFER_BYTES: u32 = 256;

/// Bytes per bitmap row for a width in dots.
#[inline]
pub fn row_bytes(width: u16) -> usize {
    usize::from(width).div_ceil(8)
}

/// One `DC2 *` chunk of a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// First bitmap row in this chunk
    pub row_start: u16,
    /// Rows in this chunk (1..=limit)
    pub height: u8,
}

/// # Chunk Plan
///
/// Iterator over the chunks a `width × height` bitmap is split into.
/// The chunk heights always add up to `height`; only the last chunk can be
/// shorter than the limit.
///
/// ## Example
///
/// ```
/// use kp347::printer::bitmap::ChunkPlan;
///
/// // 384 dots wide: 48 bytes per row, 256 / 48 = 5 rows per chunk.
/// let plan = ChunkPlan::new(384, 12, 255);
/// assert_eq!(plan.limit(), 5);
/// let heights: Vec<u8> = plan.map(|c| c.height).collect();
/// assert_eq!(heights, vec![5, 5, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    row_bytes: usize,
    row_bytes_clipped: u8,
    limit: u8,
    height: u16,
    next_row: u32,
}

impl ChunkPlan {
    pub fn new(width: u16, height: u16, max_chunk_height: u8) -> Self {
        let row_bytes = row_bytes(width);
        let row_bytes_clipped = row_bytes.min(usize::from(MAX_ROW_BYTES)) as u8;
        let ceiling = u32::from(max_chunk_height.max(1));
        let limit = match row_bytes_clipped {
            0 => ceiling,
            n => (CHUNK_BUFFER_BYTES / u32::from(n)).clamp(1, ceiling),
        };
        Self {
            row_bytes,
            row_bytes_clipped,
            limit: limit as u8,
            height,
            next_row: 0,
        }
    }

    /// Bytes per source row.
    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    /// Bytes per transmitted row.
    pub fn row_bytes_clipped(&self) -> u8 {
        self.row_bytes_clipped
    }

    /// Maximum rows per chunk.
    pub fn limit(&self) -> u8 {
        self.limit
    }

    /// Source bytes needed for the whole bitmap.
    pub fn total_bytes(&self) -> usize {
        self.row_bytes * usize::from(self.height)
    }
}

impl Iterator for ChunkPlan {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let height = u32::from(self.height);
        if self.next_row >= height {
            return None;
        }
        let rows = (height - self.next_row).min(u32::from(self.limit));
        let chunk = Chunk {
            row_start: self.next_row as u16,
            height: rows as u8,
        };
        self.next_row += rows;
        Some(chunk)
    }
}

/// A packed 1-bit bitmap, MSB first, 1 = black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u16,
    pub height: u16,
    pub data: Vec<u8>,
}

impl Bitmap {
    /// Threshold a grayscale image: pixels darker than `threshold` print.
    pub fn from_luma(img: &GrayImage, threshold: u8) -> Result<Self> {
        let (w, h) = img.dimensions();
        let width = u16::try_from(w)
            .map_err(|_| PrinterError::Image(format!("Image too wide: {} px", w)))?;
        let height = u16::try_from(h)
            .map_err(|_| PrinterError::Image(format!("Image too tall: {} px", h)))?;

        let stride = row_bytes(width);
        let mut data = vec![0u8; stride * usize::from(height)];
        for (x, y, pixel) in img.enumerate_pixels() {
            if pixel.0[0] < threshold {
                let idx = y as usize * stride + x as usize / 8;
                data[idx] |= 0x80 >> (x % 8);
            }
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }
}

impl<P: Port> Printer<P> {
    /// Print a bitmap from memory.
    ///
    /// `data` must hold at least `ceil(width / 8) × height` bytes; extra
    /// bytes are ignored.
    pub async fn print_bitmap(&mut self, width: u16, height: u16, data: &[u8]) -> Result<()> {
        let expected = row_bytes(width) * usize::from(height);
        if data.len() < expected {
            return Err(PrinterError::BitmapTooShort {
                expected,
                actual: data.len(),
            });
        }
        let mut source = SliceSource::new(&data[..expected]);
        self.print_bitmap_from_stream(width, height, &mut source)
            .await
    }

    pub async fn print_image(&mut self, bitmap: &Bitmap) -> Result<()> {
        self.print_bitmap(bitmap.width, bitmap.height, &bitmap.data)
            .await
    }

    /// Print a bitmap whose bytes are read from `source` as they arrive.
    pub async fn print_bitmap_from_stream<S: BitmapSource>(
        &mut self,
        width: u16,
        height: u16,
        source: &mut S,
    ) -> Result<()> {
        let plan = ChunkPlan::new(width, height, self.state.max_chunk_height);
        let row_bytes = plan.row_bytes();
        let clipped = plan.row_bytes_clipped();
        let mut remaining = plan.total_bytes();

        debug!(width, height, chunk_limit = plan.limit(), "printing bitmap");

        for chunk in plan {
            trace!(row_start = chunk.row_start, height = chunk.height, "bitmap chunk");
            self.write_command(&commands::bitmap_chunk_header(chunk.height, clipped))
                .await?;

            for _ in 0..chunk.height {
                for x in 0..row_bytes {
                    let byte = self.next_stream_byte(source, remaining).await?;
                    remaining -= 1;
                    if x < usize::from(clipped) {
                        self.await_ready().await?;
                        self.port.send_byte(byte)?;
                    }
                }
            }

            let delay = u32::from(chunk.height).saturating_mul(self.state.dot_print_time);
            self.set_deadline(delay);
        }

        self.state.prev_byte = LF;
        Ok(())
    }

    /// Read a `width, height` header (little-endian u16s), then the bitmap.
    pub async fn print_bitmap_with_header<S: BitmapSource>(&mut self, source: &mut S) -> Result<()> {
        let mut header = [0u8; 4];
        for (i, slot) in header.iter_mut().enumerate() {
            *slot = self.next_stream_byte(source, 4 - i).await?;
        }
        let width = u16::from_le_bytes([header[0], header[1]]);
        let height = u16::from_le_bytes([header[2], header[3]]);
        self.print_bitmap_from_stream(width, height, source).await
    }

    async fn next_stream_byte<S: BitmapSource>(
        &mut self,
        source: &mut S,
        remaining: usize,
    ) -> Result<u8> {
        loop {
            match source.read_byte()? {
                StreamByte::Byte(b) => return Ok(b),
                StreamByte::Pending => self.port.yield_now().await,
                StreamByte::Closed => {
                    warn!(remaining, "bitmap stream closed early");
                    return Err(PrinterError::StreamClosed { remaining });
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::PrinterConfig;
    use crate::transport::MockPort;
    use image::Luma;
    use pretty_assertions::assert_eq;
    use rand::Rng;

    fn printer() -> Printer<MockPort> {
        Printer::new(MockPort::new(), &PrinterConfig::default())
    }

    /// Source that reports `Pending` before every byte.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        ready: bool,
    }

    impl BitmapSource for Trickle {
        fn read_byte(&mut self) -> Result<StreamByte> {
            if !self.ready {
                self.ready = true;
                return Ok(StreamByte::Pending);
            }
            self.ready = false;
            match self.data.get(self.pos) {
                Some(&b) => {
                    self.pos += 1;
                    Ok(StreamByte::Byte(b))
                }
                None => Ok(StreamByte::Closed),
            }
        }
    }

    // ========== Chunk Plan ==========

    #[test]
    fn test_plan_geometry() {
        let plan = ChunkPlan::new(8, 300, 255);
        assert_eq!(plan.row_bytes(), 1);
        assert_eq!(plan.row_bytes_clipped(), 1);
        // 256 / 1 is capped by the ceiling.
        assert_eq!(plan.limit(), 255);
        let heights: Vec<u8> = plan.map(|c| c.height).collect();
        assert_eq!(heights, vec![255, 45]);
    }

    #[test]
    fn test_plan_clips_wide_rows() {
        let plan = ChunkPlan::new(1024, 10, 255);
        assert_eq!(plan.row_bytes(), 128);
        assert_eq!(plan.row_bytes_clipped(), 48);
        assert_eq!(plan.limit(), 5);
        assert_eq!(plan.total_bytes(), 1280);
    }

    #[test]
    fn test_plan_zero_ceiling_is_one() {
        let plan = ChunkPlan::new(16, 3, 0);
        assert_eq!(plan.limit(), 1);
        assert_eq!(plan.count(), 3);
    }

    #[test]
    fn test_plan_empty() {
        assert_eq!(ChunkPlan::new(384, 0, 255).count(), 0);
        assert_eq!(ChunkPlan::new(0, 10, 255).total_bytes(), 0);
    }

    #[test]
    fn test_plan_row_starts_are_contiguous() {
        let mut expected = 0u16;
        for chunk in ChunkPlan::new(200, 77, 8) {
            assert_eq!(chunk.row_start, expected);
            expected += u16::from(chunk.height);
        }
        assert_eq!(expected, 77);
    }

    #[test]
    fn test_plan_property() {
        let mut rng = rand::rng();
        for _ in 0..2_000 {
            let width: u16 = rng.random_range(1..=1024);
            let height: u16 = rng.random_range(0..=2000);
            let ceiling: u8 = rng.random();
            let plan = ChunkPlan::new(width, height, ceiling);
            assert!(plan.row_bytes_clipped() <= MAX_ROW_BYTES);
            assert!(plan.limit() >= 1);
            assert!(plan.limit() <= ceiling.max(1));

            let limit = plan.limit();
            let heights: Vec<u8> = plan.map(|c| c.height).collect();
            let sum: u32 = heights.iter().map(|&h| u32::from(h)).sum();
            assert_eq!(sum, u32::from(height));
            assert!(heights.iter().all(|&h| h >= 1 && h <= limit));
            if let Some((_, init)) = heights.split_last() {
                assert!(init.iter().all(|&h| h == limit));
            }
        }
    }

    // ========== Transfers ==========

    #[tokio::test]
    async fn test_small_bitmap_bytes_and_deadline() {
        let mut p = printer();
        p.print("x").await.unwrap();
        p.port_mut().clear_sent();
        p.print_bitmap(16, 2, &[0xAA, 0x55, 0xFF, 0x00]).await.unwrap();
        assert_eq!(
            p.port().sent_bytes(),
            vec![0x12, 0x2A, 2, 2, 0xAA, 0x55, 0xFF, 0x00]
        );
        assert_eq!(p.resume_at().wrapping_sub(p.port().now_micros()), 2 * 30_000);
        assert_eq!(p.state().prev_byte, LF);
    }

    #[tokio::test]
    async fn test_wide_bitmap_drops_clipped_bytes() {
        let mut p = printer();
        // 400 dots: 50 bytes per row, 48 transmitted.
        let data: Vec<u8> = (0..100u8).collect();
        p.print_bitmap(400, 2, &data).await.unwrap();
        let sent = p.port().sent_bytes();
        assert_eq!(&sent[..4], &[0x12, 0x2A, 2, 48]);
        let body = &sent[4..];
        assert_eq!(body.len(), 96);
        assert_eq!(&body[..48], &data[..48]);
        assert_eq!(&body[48..], &data[50..98]);
    }

    #[tokio::test]
    async fn test_chunks_wait_for_print_time() {
        let mut p = printer();
        p.print_bitmap(384, 6, &[0u8; 288]).await.unwrap();
        let sent = p.port().sent();
        // Second header follows 5 rows of print time.
        let first_chunk_end = sent[4 + 5 * 48 - 1].at;
        let second_header = sent[4 + 5 * 48].at;
        assert_eq!(sent[4 + 5 * 48].byte, 0x12);
        assert!(second_header.wrapping_sub(first_chunk_end) >= 5 * 30_000);
    }

    #[tokio::test]
    async fn test_short_slice_rejected_before_sending() {
        let mut p = printer();
        let err = p.print_bitmap(16, 3, &[0u8; 5]).await.unwrap_err();
        assert!(matches!(
            err,
            PrinterError::BitmapTooShort {
                expected: 6,
                actual: 5
            }
        ));
        assert!(p.port().sent().is_empty());
    }

    #[tokio::test]
    async fn test_stream_closed_early() {
        let mut p = printer();
        let data = [1u8, 2, 3];
        let mut source = SliceSource::new(&data);
        let err = p
            .print_bitmap_from_stream(16, 2, &mut source)
            .await
            .unwrap_err();
        assert!(matches!(err, PrinterError::StreamClosed { remaining: 1 }));
        // Header and the three bytes that arrived were already sent.
        assert_eq!(p.port().sent_bytes(), vec![0x12, 0x2A, 2, 2, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_pending_stream_yields() {
        let mut p = printer();
        let mut source = Trickle {
            data: vec![0xF0, 0x0F],
            pos: 0,
            ready: false,
        };
        p.print_bitmap_from_stream(8, 2, &mut source).await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![0x12, 0x2A, 2, 1, 0xF0, 0x0F]);
        assert!(p.port().yields() >= 2);
    }

    #[tokio::test]
    async fn test_header_stream() {
        let mut p = printer();
        let data = [8u8, 0, 1, 0, 0x81];
        let mut source = SliceSource::new(&data);
        p.print_bitmap_with_header(&mut source).await.unwrap();
        assert_eq!(p.port().sent_bytes(), vec![0x12, 0x2A, 1, 1, 0x81]);
    }

    #[tokio::test]
    async fn test_truncated_header() {
        let mut p = printer();
        let data = [8u8, 0];
        let mut source = SliceSource::new(&data);
        let err = p.print_bitmap_with_header(&mut source).await.unwrap_err();
        assert!(matches!(err, PrinterError::StreamClosed { remaining: 2 }));
        assert!(p.port().sent().is_empty());
    }

    #[tokio::test]
    async fn test_empty_bitmap_sends_nothing() {
        let mut p = printer();
        p.print_bitmap(384, 0, &[]).await.unwrap();
        assert!(p.port().sent().is_empty());
        assert_eq!(p.state().prev_byte, LF);
    }

    // ========== Bitmap ==========

    #[test]
    fn test_from_luma_threshold() {
        let mut img = GrayImage::from_pixel(10, 2, Luma([255]));
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(9, 0, Luma([100]));
        img.put_pixel(3, 1, Luma([127]));
        img.put_pixel(4, 1, Luma([128]));
        let bmp = Bitmap::from_luma(&img, 128).unwrap();
        assert_eq!((bmp.width, bmp.height), (10, 2));
        assert_eq!(bmp.data, vec![0x80, 0x40, 0x10, 0x00]);
    }
}
