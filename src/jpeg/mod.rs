//! JPEG compression support for the Tight JPEG subencoding.
//!
//! The encoder treats JPEG as an opaque capability: it hands over a pixel
//! buffer, its stride, the rectangle and pixel format, and receives a
//! complete JPEG stream. [`JpegEncoderBackend`] (pure Rust) is the default;
//! the `turbojpeg` feature adds [`TurboJpegEncoder`] backed by libjpeg-turbo.

mod encoder;
#[cfg(feature = "turbojpeg")]
pub mod turbojpeg;

pub use encoder::JpegEncoderBackend;
#[cfg(feature = "turbojpeg")]
pub use turbojpeg::TurboJpegEncoder;

use crate::error::Result;
use crate::protocol::{PixelFormat, Rect};
use crate::translate::rgb_from_buffer;

/// Chrominance subsampling used for JPEG rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subsampling {
    /// 4:4:4, full chroma resolution.
    #[default]
    None,
    /// 4:2:2, chroma halved horizontally.
    TwoX,
    /// 4:2:0, chroma halved in both directions.
    FourX,
    /// Luma only.
    Gray,
}

/// A JPEG compressor usable by the Tight encoder.
///
/// Implementations may keep state between calls (handles, scratch buffers)
/// but must produce a self-contained JPEG stream for every call.
pub trait JpegCompressor: Send {
    /// Compresses the `rect.width` x `rect.height` pixels found at the start
    /// of `buf`, whose rows are `stride` pixels apart, stored in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TightError::Jpeg`] if the back end fails.
    fn compress(
        &mut self,
        buf: &[u8],
        stride: usize,
        rect: &Rect,
        format: &PixelFormat,
        quality: u8,
        subsampling: Subsampling,
    ) -> Result<Vec<u8>>;
}

/// Gathers the rectangle into tightly packed 8-bit RGB triplets.
#[must_use]
pub fn rgb_rows(buf: &[u8], stride: usize, rect: &Rect, format: &PixelFormat) -> Vec<u8> {
    let bpp = format.bytes_per_pixel();
    let width = usize::from(rect.width);
    let height = usize::from(rect.height);
    let mut rgb = Vec::with_capacity(width * height * 3);

    for y in 0..height {
        let row = &buf[y * stride * bpp..(y * stride + width) * bpp];
        for pixel in row.chunks_exact(bpp) {
            rgb.extend_from_slice(&rgb_from_buffer(pixel, format));
        }
    }
    rgb
}

/// Converts RGB triplets to BT.601 luma, for grayscale JPEG.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Weighted sum stays within 0-255
pub fn luma_from_rgb(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .map(|p| {
            let y = 299 * u32::from(p[0]) + 587 * u32::from(p[1]) + 114 * u32::from(p[2]);
            ((y + 500) / 1000) as u8
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_rows_honors_stride() {
        // 3 pixels per row in memory, rectangle is 2x2
        let format = PixelFormat::rgba32();
        let mut buf = Vec::new();
        for i in 0..6u8 {
            buf.extend_from_slice(&[i, i + 10, i + 20, 0]);
        }
        let rgb = rgb_rows(&buf, 3, &Rect::new(0, 0, 2, 2), &format);
        assert_eq!(rgb, vec![0, 10, 20, 1, 11, 21, 3, 13, 23, 4, 14, 24]);
    }

    #[test]
    fn test_luma() {
        assert_eq!(luma_from_rgb(&[255, 255, 255, 0, 0, 0]), vec![255, 0]);
    }
}
