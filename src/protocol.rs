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

//! RFB protocol constants and structures used by the Tight encoder.
//!
//! This module holds the pieces of the Remote Framebuffer protocol (RFC 6143)
//! that the encoder needs: the Tight control-byte layout, the encoding and
//! pseudo-encoding numbers a client uses to pick quality and compression
//! levels, pixel formats, and rectangle geometry.
//!
//! # Tight control byte
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! +---+---+---+---+---+---+---+---+
//! | kind/stream   | reset stream 3..0 |
//! +---+---+---+---+---+---+---+---+
//! ```
//!
//! The high nibble is either `0x8` (fill), `0x9` (JPEG), or a basic
//! compression nibble made of the stream id (bits 4-5) and the explicit
//! filter flag (bit 6).

use bytes::{BufMut, BytesMut};

/// Encoding type: Tight.
pub const ENCODING_TIGHT: i32 = 7;

/// Pseudo-encoding: JPEG Quality Level 0 (lowest quality, highest compression).
pub const ENCODING_QUALITY_LEVEL_0: i32 = -32;

/// Pseudo-encoding: JPEG Quality Level 9 (highest quality, lowest compression).
pub const ENCODING_QUALITY_LEVEL_9: i32 = -23;

/// Pseudo-encoding: Compression Level 0 (fastest).
pub const ENCODING_COMPRESS_LEVEL_0: i32 = -256;

/// Pseudo-encoding: Compression Level 9 (maximum compression, slowest).
pub const ENCODING_COMPRESS_LEVEL_9: i32 = -247;

// Tight control nibbles and flags

/// Tight: explicit filter flag, ORed into the stream id before shifting.
pub const TIGHT_EXPLICIT_FILTER: u8 = 0x04;

/// Tight: fill (solid color) subencoding nibble.
pub const TIGHT_FILL: u8 = 0x08;

/// Tight: JPEG subencoding nibble.
pub const TIGHT_JPEG: u8 = 0x09;

/// Tight: palette filter id, follows a control byte carrying the explicit filter flag.
pub const TIGHT_FILTER_PALETTE: u8 = 0x01;

/// Payloads shorter than this are sent raw, without a compact length.
pub const TIGHT_MIN_TO_COMPRESS: usize = 12;

/// Largest length a 3-byte compact length can express.
pub const TIGHT_MAX_COMPACT_LENGTH: usize = 0x3F_FFFF;

/// Tight stream id: full-color (basic) data.
pub const STREAM_ID_FULL_COLOR: usize = 0;

/// Tight stream id: mono rect bitmaps.
pub const STREAM_ID_MONO: usize = 1;

/// Tight stream id: indexed palette data.
pub const STREAM_ID_INDEXED: usize = 2;

/// Number of persistent zlib streams a Tight session keeps.
pub const TIGHT_STREAM_COUNT: usize = 4;

/// Largest number of colors an indexed palette may hold.
pub const TIGHT_MAX_PALETTE_SIZE: usize = 256;

/// Represents the pixel format of the VNC framebuffer.
///
/// This struct defines how pixel data is interpreted, including color depth,
/// endianness, and RGB component details.
#[derive(Debug, Clone)]
pub struct PixelFormat {
    /// Number of bits per pixel.
    pub bits_per_pixel: u8,
    /// Depth of the pixel in bits.
    pub depth: u8,
    /// Flag indicating if the pixel data is big-endian (1) or little-endian (0).
    pub big_endian_flag: u8,
    /// Flag indicating if the pixel format is true-colour (1) or colormapped (0).
    pub true_colour_flag: u8,
    /// Maximum red color value.
    pub red_max: u16,
    /// Maximum green color value.
    pub green_max: u16,
    /// Maximum blue color value.
    pub blue_max: u16,
    /// Number of shifts to apply to get the red color component.
    pub red_shift: u8,
    /// Number of shifts to apply to get the green color component.
    pub green_shift: u8,
    /// Number of shifts to apply to get the blue color component.
    pub blue_shift: u8,
}

impl PixelFormat {
    /// Creates a standard 32-bit RGBA pixel format.
    #[must_use]
    pub fn rgba32() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 0,
            green_shift: 8,
            blue_shift: 16,
        }
    }

    /// Creates a 32-bit BGRX pixel format (blue in the lowest byte).
    #[must_use]
    pub fn bgrx32() -> Self {
        Self {
            red_shift: 16,
            blue_shift: 0,
            ..Self::rgba32()
        }
    }

    /// Creates a 16-bit RGB565 pixel format.
    #[must_use]
    pub fn rgb565() -> Self {
        Self {
            bits_per_pixel: 16,
            depth: 16,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 31,   // 5 bits
            green_max: 63, // 6 bits
            blue_max: 31,  // 5 bits
            red_shift: 11,
            green_shift: 5,
            blue_shift: 0,
        }
    }

    /// Creates a 16-bit RGB555 pixel format.
    ///
    /// RGB555 uses 5 bits for each of red, green, and blue, with 1 unused bit.
    #[must_use]
    pub fn rgb555() -> Self {
        Self {
            bits_per_pixel: 16,
            depth: 15,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 31,
            green_max: 31,
            blue_max: 31,
            red_shift: 10,
            green_shift: 5,
            blue_shift: 0,
        }
    }

    /// Creates an 8-bit BGR233 pixel format.
    #[must_use]
    pub fn bgr233() -> Self {
        Self {
            bits_per_pixel: 8,
            depth: 8,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 7,   // 3 bits
            green_max: 7, // 3 bits
            blue_max: 3,  // 2 bits
            red_shift: 0,
            green_shift: 3,
            blue_shift: 6,
        }
    }

    /// Number of bytes one pixel occupies in memory.
    #[must_use]
    pub fn bytes_per_pixel(&self) -> usize {
        usize::from(self.bits_per_pixel / 8)
    }

    /// Validates that this pixel format can be handled by the encoder.
    ///
    /// Tight pixels are 8, 16 or 32 bits wide, and color components must fit
    /// within the declared depth.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if !matches!(self.bits_per_pixel, 8 | 16 | 32) {
            return false;
        }

        if self.depth == 0 || self.depth > 32 {
            return false;
        }

        if self.true_colour_flag == 0 && self.bits_per_pixel != 8 {
            return false;
        }

        if self.true_colour_flag != 0 {
            #[allow(clippy::cast_possible_truncation)]
            // leading_zeros() returns max 16, result always fits in u8
            let bits_needed = |max: u16| -> u8 { (16 - max.leading_zeros()) as u8 };

            let total = bits_needed(self.red_max)
                + bits_needed(self.green_max)
                + bits_needed(self.blue_max);
            if total > self.depth {
                return false;
            }

            if self.red_shift >= 32 || self.green_shift >= 32 || self.blue_shift >= 32 {
                return false;
            }
        }

        true
    }

    /// Returns `true` when 32-bit pixels of this format can travel as 3-byte
    /// TPIXELs: true-color, depth 24, full-range 8-bit channels, each channel
    /// sitting on a byte boundary.
    #[must_use]
    pub fn is_888(&self) -> bool {
        self.true_colour_flag != 0
            && self.bits_per_pixel == 32
            && self.depth == 24
            && self.red_max == 255
            && self.green_max == 255
            && self.blue_max == 255
            && self.red_shift % 8 == 0
            && self.green_shift % 8 == 0
            && self.blue_shift % 8 == 0
    }

    /// Checks if two pixel formats are identical, so no translation is needed.
    #[must_use]
    pub fn equal(&self, other: &Self) -> bool {
        self.bits_per_pixel == other.bits_per_pixel
            && self.depth == other.depth
            && (self.big_endian_flag == other.big_endian_flag || self.bits_per_pixel == 8)
            && self.true_colour_flag == other.true_colour_flag
            && (self.true_colour_flag == 0
                || (self.red_max == other.red_max
                    && self.green_max == other.green_max
                    && self.blue_max == other.blue_max
                    && self.red_shift == other.red_shift
                    && self.green_shift == other.green_shift
                    && self.blue_shift == other.blue_shift))
    }

    /// Pixel value with every bit that carries color set.
    ///
    /// Padding bits (the unused byte of a 32-bit pixel, the spare bit of
    /// RGB555) are clear. Colormapped formats keep every bit.
    #[must_use]
    pub fn signal_mask(&self) -> u32 {
        if self.true_colour_flag == 0 {
            return u32::MAX >> (32 - u32::from(self.bits_per_pixel));
        }
        (u32::from(self.red_max) << self.red_shift)
            | (u32::from(self.green_max) << self.green_shift)
            | (u32::from(self.blue_max) << self.blue_shift)
    }

    /// Serializes a pixel value into its in-memory byte layout.
    ///
    /// Only the first `bytes_per_pixel()` bytes of `dst` are written.
    #[allow(clippy::cast_possible_truncation)] // Truncation to the pixel width is intended
    pub fn buffer_from_pixel(&self, pixel: u32, dst: &mut [u8]) {
        match self.bits_per_pixel {
            8 => dst[0] = pixel as u8,
            16 => {
                let bytes = if self.big_endian_flag != 0 {
                    (pixel as u16).to_be_bytes()
                } else {
                    (pixel as u16).to_le_bytes()
                };
                dst[..2].copy_from_slice(&bytes);
            }
            _ => {
                let bytes = if self.big_endian_flag != 0 {
                    pixel.to_be_bytes()
                } else {
                    pixel.to_le_bytes()
                };
                dst[..4].copy_from_slice(&bytes);
            }
        }
    }

    /// Reads a pixel value from its in-memory byte layout.
    #[must_use]
    pub fn pixel_from_buffer(&self, src: &[u8]) -> u32 {
        match self.bits_per_pixel {
            8 => u32::from(src[0]),
            16 => {
                let raw = [src[0], src[1]];
                u32::from(if self.big_endian_flag != 0 {
                    u16::from_be_bytes(raw)
                } else {
                    u16::from_le_bytes(raw)
                })
            }
            _ => {
                let raw = [src[0], src[1], src[2], src[3]];
                if self.big_endian_flag != 0 {
                    u32::from_be_bytes(raw)
                } else {
                    u32::from_le_bytes(raw)
                }
            }
        }
    }
}

/// A rectangle in framebuffer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// X coordinate of the top-left corner.
    pub x: u16,
    /// Y coordinate of the top-left corner.
    pub y: u16,
    /// Width of the rectangle in pixels.
    pub width: u16,
    /// Height of the rectangle in pixels.
    pub height: u16,
}

impl Rect {
    /// Creates a rectangle from its origin and size.
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Number of pixels covered by the rectangle.
    #[must_use]
    pub fn area(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// Returns `true` for rectangles without pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }
}

/// Represents a rectangle header in a framebuffer update message.
///
/// Each framebuffer update can contain multiple rectangles, each with its own
/// encoding type. The rectangle header specifies the position, dimensions,
/// and encoding of the pixel data that follows.
#[derive(Debug)]
pub struct Rectangle {
    /// Geometry of the rectangle.
    pub rect: Rect,
    /// The encoding type used for this rectangle's pixel data.
    pub encoding: i32,
}

impl Rectangle {
    /// Writes the rectangle header to a byte buffer.
    ///
    /// The header format is:
    /// - 2 bytes: x position
    /// - 2 bytes: y position
    /// - 2 bytes: width
    /// - 2 bytes: height
    /// - 4 bytes: encoding type (signed 32-bit integer)
    pub fn write_header(&self, buf: &mut BytesMut) {
        buf.put_u16(self.rect.x);
        buf.put_u16(self.rect.y);
        buf.put_u16(self.rect.width);
        buf.put_u16(self.rect.height);
        buf.put_i32(self.encoding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_888() {
        assert!(PixelFormat::rgba32().is_888());
        assert!(PixelFormat::bgrx32().is_888());
        assert!(!PixelFormat::rgb565().is_888());

        let mut odd = PixelFormat::rgba32();
        odd.red_shift = 2;
        assert!(!odd.is_888());
    }

    #[test]
    fn test_signal_mask() {
        assert_eq!(PixelFormat::rgba32().signal_mask(), 0x00FF_FFFF);
        assert_eq!(PixelFormat::rgb565().signal_mask(), 0xFFFF);
        assert_eq!(PixelFormat::rgb555().signal_mask(), 0x7FFF);
        assert_eq!(PixelFormat::bgr233().signal_mask(), 0xFF);
    }

    #[test]
    fn test_pixel_buffer_conversion() {
        let mut pf = PixelFormat::rgb565();
        let mut buf = [0u8; 2];
        pf.buffer_from_pixel(0xF800, &mut buf);
        assert_eq!(buf, [0x00, 0xF8]);
        assert_eq!(pf.pixel_from_buffer(&buf), 0xF800);

        pf.big_endian_flag = 1;
        pf.buffer_from_pixel(0xF800, &mut buf);
        assert_eq!(buf, [0xF8, 0x00]);
        assert_eq!(pf.pixel_from_buffer(&buf), 0xF800);
    }

    #[test]
    fn test_equal_ignores_endianness_at_8bpp() {
        let a = PixelFormat::bgr233();
        let mut b = PixelFormat::bgr233();
        b.big_endian_flag = 1;
        assert!(a.equal(&b));
        assert!(!PixelFormat::rgba32().equal(&PixelFormat::bgrx32()));
    }

    #[test]
    fn test_rectangle_header() {
        let mut buf = BytesMut::new();
        Rectangle {
            rect: Rect::new(1, 2, 3, 4),
            encoding: ENCODING_TIGHT,
        }
        .write_header(&mut buf);
        assert_eq!(&buf[..], &[0, 1, 0, 2, 0, 3, 0, 4, 0, 0, 0, 7]);
    }
}
