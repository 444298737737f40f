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

//! Pixel width abstraction.
//!
//! The Tight algorithms are identical for 8, 16 and 32-bit pixels apart from
//! a few documented points: 32-bit pixels may be packed to 3 bytes, and
//! 8-bit pixels never use indexed palettes or JPEG. [`Pixel`] carries those
//! differences so a single generic implementation serves every depth.
//!
//! Pixel buffers are byte slices in the pixel format's memory layout; a pixel
//! value is their native-endian reading. Only equality of values matters to
//! the encoder, and values are written back with the same byte order.

use std::fmt::Debug;
use std::hash::Hash;
use std::ops::BitAnd;

use crate::protocol::PixelFormat;

/// A pixel of 8, 16 or 32 bits.
pub trait Pixel: Copy + Eq + Hash + Default + Debug + BitAnd<Output = Self> + 'static {
    /// Bytes per pixel in memory.
    const BYTES: usize;

    /// Whether indexed palettes (3+ colors) and JPEG are available.
    const INDEXED: bool;

    /// Reads a pixel from the first `BYTES` bytes of `src`.
    fn load(src: &[u8]) -> Self;

    /// Writes the pixel into the first `BYTES` bytes of `dst`.
    fn store(self, dst: &mut [u8]);

    /// Widens the pixel value.
    fn to_u32(self) -> u32;

    /// Narrows a value produced by [`Pixel::to_u32`].
    fn from_u32(value: u32) -> Self;
}

macro_rules! impl_pixel {
    ($ty:ty, $indexed:expr) => {
        impl Pixel for $ty {
            const BYTES: usize = std::mem::size_of::<$ty>();
            const INDEXED: bool = $indexed;

            #[inline]
            fn load(src: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&src[..Self::BYTES]);
                <$ty>::from_ne_bytes(raw)
            }

            #[inline]
            fn store(self, dst: &mut [u8]) {
                dst[..Self::BYTES].copy_from_slice(&self.to_ne_bytes());
            }

            #[inline]
            fn to_u32(self) -> u32 {
                u32::from(self)
            }

            #[inline]
            #[allow(clippy::cast_possible_truncation)] // Values originate from this pixel type
            fn from_u32(value: u32) -> Self {
                value as $ty
            }
        }
    };
}

impl_pixel!(u8, false);
impl_pixel!(u16, true);
impl_pixel!(u32, true);

/// The format's color bits as a pixel of width `P`, in the format's byte
/// layout. ANDing a pixel with it clears its padding bits.
pub fn signal_mask<P: Pixel>(format: &PixelFormat) -> P {
    let mut bytes = [0u8; 4];
    format.buffer_from_pixel(format.signal_mask(), &mut bytes);
    P::load(&bytes)
}

/// Iterates over `width` x `height` pixels of a buffer whose rows are
/// `stride` pixels apart.
pub fn strided_pixels<P: Pixel>(
    buf: &[u8],
    stride: usize,
    width: usize,
    height: usize,
) -> impl Iterator<Item = P> + '_ {
    (0..height).flat_map(move |y| {
        let start = y * stride * P::BYTES;
        buf[start..start + width * P::BYTES]
            .chunks_exact(P::BYTES)
            .map(P::load)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_store() {
        let mut buf = [0u8; 4];
        0x1234_5678u32.store(&mut buf);
        assert_eq!(u32::load(&buf), 0x1234_5678);
        assert_eq!(buf, 0x1234_5678u32.to_ne_bytes());

        0xBEEFu16.store(&mut buf);
        assert_eq!(u16::load(&buf), 0xBEEF);
        assert_eq!(u16::from_u32(0xBEEF).to_u32(), 0xBEEF);
    }

    #[test]
    fn test_depth_capabilities() {
        assert!(!u8::INDEXED);
        assert!(u16::INDEXED);
        assert_eq!(<u32 as Pixel>::BYTES, 4);
    }

    #[test]
    fn test_signal_mask_clears_padding() {
        let mask: u32 = signal_mask(&PixelFormat::rgba32());
        assert_eq!(mask.to_ne_bytes(), [0xFF, 0xFF, 0xFF, 0x00]);

        let mask: u16 = signal_mask(&PixelFormat::rgb555());
        assert_eq!(u16::from_le_bytes(mask.to_ne_bytes()), 0x7FFF);
    }

    #[test]
    fn test_strided_pixels() {
        // 3 pixels per row, 2x2 rectangle
        let buf = [1u8, 2, 3, 4, 5, 6];
        let pixels: Vec<u8> = strided_pixels(&buf, 3, 2, 2).collect();
        assert_eq!(pixels, vec![1, 2, 4, 5]);
    }
}
