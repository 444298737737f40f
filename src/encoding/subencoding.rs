// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tight subencoding packers.
//!
//! Wire layouts (following libvncserver/TigerVNC tight.c):
//! - Solid fill:  `[0x80] [pixel]`
//! - Full-color:  `[0x00|reset] [compressed pixels]`
//! - Mono:        `[0x50|reset] [0x01] [1] [bg] [fg] [compressed bitmap]`
//! - Indexed:     `[0x60|reset] [0x01] [n-1] [colors...] [compressed indices]`
//! - JPEG:        `[0x90] [compact length] [JPEG data]`
//!
//! Pixels are TPIXELs: 3 bytes for 32-bit 8-8-8 client formats, the client's
//! own width otherwise. The mono and indexed packers rewrite the rectangle's
//! pixel buffer in place.

use bytes::{BufMut, BytesMut};

use super::pack::{pack_pixels, ShrinkInPlace};
use super::palette::Palette;
use super::pixel::{signal_mask, Pixel};
use super::stream::{write_compact_length, CompressionStreamSet};
use crate::error::{Result, TightError};
use crate::jpeg::{JpegCompressor, Subsampling};
use crate::protocol::{
    PixelFormat, Rect, STREAM_ID_FULL_COLOR, STREAM_ID_INDEXED, STREAM_ID_MONO,
    TIGHT_EXPLICIT_FILTER, TIGHT_FILL, TIGHT_FILTER_PALETTE, TIGHT_JPEG,
};

/// How pixels of the current rectangle go on the wire.
#[derive(Debug, Clone, Copy)]
pub struct Packing<'a> {
    /// Client pixel format.
    pub format: &'a PixelFormat,
    /// Pack 32-bit pixels to 3-byte TPIXELs.
    pub pack24: bool,
}

impl Packing<'_> {
    fn put_colors<P: Pixel>(&self, colors: &[u32], out: &mut BytesMut) {
        let mut buf = vec![0u8; colors.len() * P::BYTES];
        for (&color, slot) in colors.iter().zip(buf.chunks_exact_mut(P::BYTES)) {
            P::from_u32(color).store(slot);
        }
        let len = pack_pixels::<P>(&mut buf, colors.len(), self.pack24, self.format);
        out.put_slice(&buf[..len]);
    }
}

#[allow(clippy::cast_possible_truncation)] // Stream ids are 0-3
fn control_byte(stream_id: usize, explicit_filter: bool, reset: u8) -> u8 {
    let mut id = stream_id as u8;
    if explicit_filter {
        id |= TIGHT_EXPLICIT_FILTER;
    }
    (id << 4) | reset
}

/// Encode as Tight solid fill (1 color). Never compressed.
pub fn encode_solid<P: Pixel>(color: u32, packing: Packing<'_>, out: &mut BytesMut) {
    out.put_u8(TIGHT_FILL << 4); // 0x80
    packing.put_colors::<P>(&[color], out);
}

/// Encode as Tight full-color on stream 0.
///
/// `buf` holds the rectangle's translated pixels and is packed in place.
///
/// # Errors
///
/// Returns an error if compression fails.
pub fn encode_full_color<P: Pixel>(
    buf: &mut [u8],
    rect: &Rect,
    packing: Packing<'_>,
    streams: &mut CompressionStreamSet,
    level: u32,
    out: &mut BytesMut,
) -> Result<()> {
    let reset = streams.set_level(STREAM_ID_FULL_COLOR, level);
    out.put_u8(control_byte(STREAM_ID_FULL_COLOR, false, reset));

    let len = pack_pixels::<P>(buf, rect.area(), packing.pack24, packing.format);
    streams.write_compressed(STREAM_ID_FULL_COLOR, &buf[..len], out)
}

/// Encode as Tight mono rect (2 colors, 1-bit bitmap) on stream 1.
///
/// Palette entry 0 is the background. The bitmap is MSB first, each row
/// byte-aligned, with 1 marking a foreground pixel.
///
/// # Errors
///
/// Returns an error if compression fails.
pub fn encode_mono<P: Pixel>(
    buf: &mut [u8],
    rect: &Rect,
    palette: &Palette,
    packing: Packing<'_>,
    streams: &mut CompressionStreamSet,
    level: u32,
    out: &mut BytesMut,
) -> Result<()> {
    let reset = streams.set_level(STREAM_ID_MONO, level);
    out.put_u8(control_byte(STREAM_ID_MONO, true, reset)); // 0x50
    out.put_u8(TIGHT_FILTER_PALETTE);
    out.put_u8(1);
    packing.put_colors::<P>(&[palette.color(0), palette.color(1)], out);

    let bg = P::from_u32(palette.color(0));
    let mask = signal_mask::<P>(packing.format);
    let width = usize::from(rect.width);

    let mut cursor = ShrinkInPlace::new(&mut buf[..rect.area() * P::BYTES]);
    for _ in 0..rect.height {
        let mut x = 0;
        while x < width {
            let bits = (width - x).min(8);
            let mut value = 0u8;
            for bit in 0..bits {
                let pixel: P = cursor.next_pixel();
                if pixel & mask != bg {
                    value |= 0x80 >> bit;
                }
            }
            cursor.emit(value);
            x += bits;
        }
    }
    let len = cursor.written();

    streams.write_compressed(STREAM_ID_MONO, &buf[..len], out)
}

/// Encode as Tight indexed palette (3-256 colors) on stream 2.
///
/// # Errors
///
/// Returns an error if compression fails, or [`TightError::Encoding`] if a
/// pixel is missing from `palette`.
#[allow(clippy::cast_possible_truncation)] // Palette holds at most 256 colors
pub fn encode_indexed<P: Pixel>(
    buf: &mut [u8],
    rect: &Rect,
    palette: &Palette,
    packing: Packing<'_>,
    streams: &mut CompressionStreamSet,
    level: u32,
    out: &mut BytesMut,
) -> Result<()> {
    let reset = streams.set_level(STREAM_ID_INDEXED, level);
    out.put_u8(control_byte(STREAM_ID_INDEXED, true, reset)); // 0x60
    out.put_u8(TIGHT_FILTER_PALETTE);
    out.put_u8((palette.len() - 1) as u8);
    let colors: Vec<u32> = palette.entries().iter().map(|e| e.color).collect();
    packing.put_colors::<P>(&colors, out);

    let mask = signal_mask::<P>(packing.format);
    let mut cursor = ShrinkInPlace::new(&mut buf[..rect.area() * P::BYTES]);
    while let Some(pixel) = cursor.peek_pixel::<P>() {
        let color = pixel & mask;
        let mut run = 0usize;
        while cursor.peek_pixel::<P>().map(|p| p & mask) == Some(color) {
            cursor.skip_pixel::<P>();
            run += 1;
        }
        let idx = palette.lookup(color.to_u32()).ok_or_else(|| {
            TightError::Encoding(format!("pixel {:#x} is not in the palette", color.to_u32()))
        })?;
        for _ in 0..run {
            cursor.emit(idx);
        }
    }
    let len = cursor.written();

    streams.write_compressed(STREAM_ID_INDEXED, &buf[..len], out)
}

/// Encode as Tight JPEG.
///
/// `buf` holds the rectangle's pixels in `format` with rows `stride` pixels
/// apart. The JPEG stream is never zlib-compressed.
///
/// # Errors
///
/// Returns an error if the JPEG back end fails.
#[allow(clippy::too_many_arguments)]
pub fn encode_jpeg(
    compressor: &mut dyn JpegCompressor,
    buf: &[u8],
    stride: usize,
    rect: &Rect,
    format: &PixelFormat,
    quality: u8,
    subsampling: Subsampling,
    out: &mut BytesMut,
) -> Result<()> {
    let jpeg = compressor.compress(buf, stride, rect, format, quality, subsampling)?;

    out.put_u8(TIGHT_JPEG << 4); // 0x90
    write_compact_length(out, jpeg.len())?;
    out.put_slice(&jpeg);
    Ok(())
}
