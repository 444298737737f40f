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

//! Image sources feeding the encoder.
//!
//! The encoder never owns the framebuffer. It asks an [`ImageSource`] for
//! the raw (server-format) pixels of a rectangle, or for a translated,
//! tightly packed copy in the client's pixel format.

use crate::protocol::{PixelFormat, Rect};
use crate::translate::translate_into;

/// Supplies pixels for the rectangles being encoded.
pub trait ImageSource {
    /// Pixel format of the raw buffer.
    fn server_format(&self) -> &PixelFormat;

    /// Pixel format the client asked for.
    fn client_format(&self) -> &PixelFormat;

    /// Raw pixels starting at the rectangle's top-left corner, and the
    /// distance between rows in pixels (at least `rect.width`).
    fn raw_buffer(&self, rect: &Rect) -> (&[u8], usize);

    /// Copies the rectangle into `dst`, translated to the client format,
    /// rows tightly packed.
    fn get_image(&self, dst: &mut [u8], rect: &Rect);

    /// Translates `count` tightly packed server-format pixels into `dst`.
    fn translate_pixels(&self, src: &[u8], dst: &mut [u8], count: usize);

    /// Returns `true` if translation changes pixel values.
    fn will_transform(&self) -> bool;
}

/// An in-memory framebuffer translated on demand into a client format.
#[derive(Debug, Clone)]
pub struct FramebufferSource {
    data: Vec<u8>,
    width: u16,
    height: u16,
    server_format: PixelFormat,
    client_format: PixelFormat,
}

impl FramebufferSource {
    /// Creates a source over `data`, `width` x `height` pixels in
    /// `server_format`, delivering pixels in `client_format`.
    ///
    /// # Panics
    ///
    /// Panics if `data` is shorter than the framebuffer.
    #[must_use]
    pub fn new(
        data: Vec<u8>,
        width: u16,
        height: u16,
        server_format: PixelFormat,
        client_format: PixelFormat,
    ) -> Self {
        let needed = usize::from(width) * usize::from(height) * server_format.bytes_per_pixel();
        assert!(
            data.len() >= needed,
            "Framebuffer data too short: expected {needed}, got {}",
            data.len()
        );
        Self {
            data,
            width,
            height,
            server_format,
            client_format,
        }
    }

    /// Framebuffer width in pixels.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Framebuffer height in pixels.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Switches the client pixel format (SetPixelFormat).
    pub fn set_client_format(&mut self, format: PixelFormat) {
        self.client_format = format;
    }

    /// Mutable access to the raw framebuffer bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn offset(&self, x: u16, y: u16) -> usize {
        (usize::from(y) * usize::from(self.width) + usize::from(x))
            * self.server_format.bytes_per_pixel()
    }
}

impl ImageSource for FramebufferSource {
    fn server_format(&self) -> &PixelFormat {
        &self.server_format
    }

    fn client_format(&self) -> &PixelFormat {
        &self.client_format
    }

    fn raw_buffer(&self, rect: &Rect) -> (&[u8], usize) {
        (&self.data[self.offset(rect.x, rect.y)..], usize::from(self.width))
    }

    fn get_image(&self, dst: &mut [u8], rect: &Rect) {
        let width = usize::from(rect.width);
        let src_row = width * self.server_format.bytes_per_pixel();
        let dst_row = width * self.client_format.bytes_per_pixel();

        for dy in 0..rect.height {
            let start = self.offset(rect.x, rect.y + dy);
            let out_start = usize::from(dy) * dst_row;
            translate_into(
                &self.data[start..start + src_row],
                &mut dst[out_start..out_start + dst_row],
                width,
                &self.server_format,
                &self.client_format,
            );
        }
    }

    fn translate_pixels(&self, src: &[u8], dst: &mut [u8], count: usize) {
        translate_into(src, dst, count, &self.server_format, &self.client_format);
    }

    fn will_transform(&self) -> bool {
        !self.server_format.equal(&self.client_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u16, height: u16) -> Vec<u8> {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x * 10) as u8, (y * 10) as u8, 0, 0]);
            }
        }
        data
    }

    #[test]
    fn test_raw_buffer_stride() {
        let fb = FramebufferSource::new(
            gradient(4, 3),
            4,
            3,
            PixelFormat::rgba32(),
            PixelFormat::rgba32(),
        );
        let (raw, stride) = fb.raw_buffer(&Rect::new(1, 1, 2, 2));
        assert_eq!(stride, 4);
        assert_eq!(&raw[..4], &[10, 10, 0, 0]);
        assert_eq!(&raw[stride * 4..stride * 4 + 4], &[10, 20, 0, 0]);
        assert!(!fb.will_transform());
    }

    #[test]
    fn test_get_image_translates() {
        let fb = FramebufferSource::new(
            gradient(4, 3),
            4,
            3,
            PixelFormat::rgba32(),
            PixelFormat::bgrx32(),
        );
        assert!(fb.will_transform());

        let mut dst = vec![0u8; 2 * 2 * 4];
        fb.get_image(&mut dst, &Rect::new(2, 1, 2, 2));
        assert_eq!(&dst[..4], &[0, 10, 20, 0]);
        assert_eq!(&dst[12..16], &[0, 20, 30, 0]);
    }
}
