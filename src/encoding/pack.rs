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

//! In-place pixel packing.
//!
//! Every transform here shrinks a buffer in place: output is written behind
//! the input that has already been consumed, so the scratch buffer holding a
//! rectangle's pixels is reused for the bytes that go on the wire.

use super::pixel::Pixel;
use crate::protocol::PixelFormat;
use crate::translate::rgb_from_buffer;

/// Packs `count` pixels at the start of `buf` to their wire width.
///
/// With `pack24` set, 32-bit pixels become 3-byte `[r, g, b]` TPIXELs using
/// `format`'s channel layout. Otherwise the buffer is left alone. Returns
/// the number of bytes that now hold the pixels.
pub fn pack_pixels<P: Pixel>(
    buf: &mut [u8],
    count: usize,
    pack24: bool,
    format: &PixelFormat,
) -> usize {
    if P::BYTES != 4 || !pack24 {
        return count * P::BYTES;
    }

    for i in 0..count {
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&buf[i * 4..i * 4 + 4]);
        buf[i * 3..i * 3 + 3].copy_from_slice(&rgb_from_buffer(&pixel, format));
    }
    count * 3
}

/// A byte buffer rewritten in place with separate read and write cursors.
///
/// The write cursor never passes the read cursor: each byte is emitted only
/// after at least as many input bytes have been consumed.
pub struct ShrinkInPlace<'a> {
    buf: &'a mut [u8],
    read: usize,
    write: usize,
}

impl<'a> ShrinkInPlace<'a> {
    /// Starts with both cursors at the beginning of `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            read: 0,
            write: 0,
        }
    }

    /// Consumes the next pixel.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `P::BYTES` unread bytes remain.
    pub fn next_pixel<P: Pixel>(&mut self) -> P {
        let pixel = P::load(&self.buf[self.read..]);
        self.read += P::BYTES;
        pixel
    }

    /// Looks at the next pixel without consuming it.
    pub fn peek_pixel<P: Pixel>(&self) -> Option<P> {
        (self.read + P::BYTES <= self.buf.len()).then(|| P::load(&self.buf[self.read..]))
    }

    /// Skips the next pixel.
    pub fn skip_pixel<P: Pixel>(&mut self) {
        self.read += P::BYTES;
    }

    /// Writes one output byte.
    pub fn emit(&mut self, byte: u8) {
        assert!(
            self.write < self.read,
            "shrink-in-place write cursor {} would pass read cursor {}",
            self.write,
            self.read
        );
        self.buf[self.write] = byte;
        self.write += 1;
    }

    /// Number of bytes emitted so far.
    pub fn written(&self) -> usize {
        self.write
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack24() {
        let format = PixelFormat::rgba32();
        let mut buf = vec![1u8, 2, 3, 0, 4, 5, 6, 0xAA, 7, 8, 9, 0];
        let len = pack_pixels::<u32>(&mut buf, 3, true, &format);
        assert_eq!(len, 9);
        assert_eq!(&buf[..9], &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_pack24_follows_channel_layout() {
        let format = PixelFormat::bgrx32();
        let mut buf = vec![0x00u8, 0xFF, 0x10, 0x00];
        assert_eq!(pack_pixels::<u32>(&mut buf, 1, true, &format), 3);
        assert_eq!(&buf[..3], &[0x10, 0xFF, 0x00]);
    }

    #[test]
    fn test_no_packing_below_32bpp() {
        let format = PixelFormat::rgb565();
        let mut buf = vec![1u8, 2, 3, 4];
        let before = buf.clone();
        assert_eq!(pack_pixels::<u16>(&mut buf, 2, true, &format), 4);
        assert_eq!(buf, before);

        let mut buf = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let before = buf.clone();
        assert_eq!(pack_pixels::<u32>(&mut buf, 2, false, &format), 8);
        assert_eq!(buf, before);
    }

    #[test]
    fn test_repack_is_stable() {
        let format = PixelFormat::rgba32();
        let mut buf = vec![9u8, 8, 7, 0, 6, 5, 4, 0];
        let len = pack_pixels::<u32>(&mut buf, 2, true, &format);
        let packed = buf[..len].to_vec();

        // Re-derive pixels from the packed bytes and pack again
        let mut rebuilt: Vec<u8> = packed
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 0])
            .collect();
        let len = pack_pixels::<u32>(&mut rebuilt, 2, true, &format);
        assert_eq!(&rebuilt[..len], &packed[..]);
    }

    #[test]
    fn test_shrink_in_place() {
        let mut buf = vec![1u8, 0, 2, 0, 3, 0];
        let mut cursor = ShrinkInPlace::new(&mut buf);
        while cursor.peek_pixel::<u16>().is_some() {
            let p: u16 = cursor.next_pixel();
            cursor.emit(p.to_ne_bytes()[0]);
        }
        assert_eq!(cursor.written(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "would pass read cursor")]
    fn test_shrink_in_place_guards_cursor() {
        let mut buf = vec![0u8; 4];
        let mut cursor = ShrinkInPlace::new(&mut buf);
        cursor.emit(1);
    }
}
