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

//! Pixel format translation and channel extraction.
//!
//! The encoder works on pixels in the client's pixel format. This module
//! converts server-format pixels into that format and extracts 8-bit color
//! channels from a pixel, which is what 24-bit TPIXEL packing and the JPEG
//! back ends need.
//!
//! Translation goes through 8-bit RGB: each component is scaled up from the
//! source range to 0-255, then down to the destination range.

use crate::protocol::PixelFormat;

/// Translates `count` pixels from `src_format` into `dst_format`.
///
/// Both buffers are tightly packed in their format's byte layout.
///
/// # Panics
///
/// Panics if either buffer is shorter than `count` pixels of its format.
pub fn translate_into(
    src: &[u8],
    dst: &mut [u8],
    count: usize,
    src_format: &PixelFormat,
    dst_format: &PixelFormat,
) {
    let src_bpp = src_format.bytes_per_pixel();
    let dst_bpp = dst_format.bytes_per_pixel();

    if src_format.equal(dst_format) {
        dst[..count * dst_bpp].copy_from_slice(&src[..count * src_bpp]);
        return;
    }

    let pixels = src[..count * src_bpp].chunks_exact(src_bpp);
    let out = dst[..count * dst_bpp].chunks_exact_mut(dst_bpp);
    for (pixel, slot) in pixels.zip(out) {
        let [r, g, b] = rgb_from_buffer(pixel, src_format);
        let value = pixel_from_rgb(r, g, b, dst_format);
        dst_format.buffer_from_pixel(value, slot);
    }
}

/// Extracts 8-bit RGB components from one pixel stored in `format`'s layout.
#[must_use]
pub fn rgb_from_buffer(pixel: &[u8], format: &PixelFormat) -> [u8; 3] {
    let value = format.pixel_from_buffer(pixel);
    rgb_from_pixel(value, format)
}

/// Extracts 8-bit RGB components from a pixel value.
#[must_use]
pub fn rgb_from_pixel(value: u32, format: &PixelFormat) -> [u8; 3] {
    let r_raw = (value >> format.red_shift) & u32::from(format.red_max);
    let g_raw = (value >> format.green_shift) & u32::from(format.green_max);
    let b_raw = (value >> format.blue_shift) & u32::from(format.blue_max);

    [
        scale_component(r_raw, format.red_max),
        scale_component(g_raw, format.green_max),
        scale_component(b_raw, format.blue_max),
    ]
}

/// Builds a pixel value of `format` from 8-bit RGB components.
#[must_use]
pub fn pixel_from_rgb(r: u8, g: u8, b: u8, format: &PixelFormat) -> u32 {
    let r_scaled = downscale_component(r, format.red_max);
    let g_scaled = downscale_component(g, format.green_max);
    let b_scaled = downscale_component(b, format.blue_max);

    (u32::from(r_scaled) << format.red_shift)
        | (u32::from(g_scaled) << format.green_shift)
        | (u32::from(b_scaled) << format.blue_shift)
}

/// Scales a color component from its format-specific range to 8-bit (0-255).
#[inline]
#[allow(clippy::cast_possible_truncation)] // Result is at most 255
fn scale_component(value: u32, max: u16) -> u8 {
    if max == 0 {
        return 0;
    }
    if max == 255 {
        return value as u8;
    }

    // Use 64-bit to avoid overflow
    ((u64::from(value) * 255) / u64::from(max)) as u8
}

/// Downscales a color component from 8-bit (0-255) to the format-specific range.
#[inline]
#[allow(clippy::cast_possible_truncation)] // Result is at most `max`
fn downscale_component(value: u8, max: u16) -> u16 {
    if max == 0 {
        return 0;
    }
    if max == 255 {
        return u16::from(value);
    }

    ((u32::from(value) * u32::from(max)) / 255) as u16
}
