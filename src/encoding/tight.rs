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

//! VNC Tight encoding implementation.
//!
//! [`TightEncoder`] chooses a subencoding for every rectangle from the
//! number of colors it contains, following libvncserver/TigerVNC:
//! - Solid fill (1 color)
//! - Mono rect (2 colors, 1-bit bitmap)
//! - Indexed palette (3-256 colors, bounded by the compression level)
//! - Full-color zlib, or JPEG when a quality level is set (truecolor)
//!
//! One encoder is one client session: it owns the four persistent zlib
//! streams the client mirrors, so rectangles must be encoded in the order
//! they are sent.

use bytes::{BufMut, BytesMut};

use super::palette::Palette;
use super::pixel::{signal_mask, Pixel};
use super::stream::CompressionStreamSet;
use super::subencoding::{
    encode_full_color, encode_indexed, encode_jpeg, encode_mono, encode_solid, Packing,
};
use crate::config::{
    compress_level_from_encoding, quality_level_from_encoding, JpegSettings, TightConfig,
    DEFAULT_COMPRESS_LEVEL,
};
use crate::error::{Result, TightError};
use crate::jpeg::{JpegCompressor, JpegEncoderBackend, Subsampling};
use crate::protocol::{Rect, Rectangle, ENCODING_TIGHT};
use crate::source::ImageSource;

/// Tight encoder state for one client session.
pub struct TightEncoder {
    config: TightConfig,
    compress_level: u8,
    jpeg: JpegSettings,
    streams: CompressionStreamSet,
    jpeg_compressor: Box<dyn JpegCompressor>,
    image_buf: Vec<u8>,
    palette: Palette,
    pending_reset: u8,
}

impl Default for TightEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TightEncoder {
    /// Creates an encoder at the default compression level with JPEG
    /// disabled.
    #[must_use]
    pub fn new() -> Self {
        let config = TightConfig::for_level(DEFAULT_COMPRESS_LEVEL);
        Self {
            streams: CompressionStreamSet::new([
                config.raw_zlib_level,
                config.mono_zlib_level,
                config.idx_zlib_level,
                config.raw_zlib_level,
            ]),
            config,
            compress_level: DEFAULT_COMPRESS_LEVEL,
            jpeg: JpegSettings::disabled(),
            jpeg_compressor: Box::new(JpegEncoderBackend::new()),
            image_buf: Vec::new(),
            palette: Palette::new(),
            pending_reset: 0,
        }
    }

    /// Replaces the JPEG back end.
    #[must_use]
    pub fn with_jpeg_compressor(mut self, compressor: Box<dyn JpegCompressor>) -> Self {
        self.jpeg_compressor = compressor;
        self
    }

    /// Selects the compression preset (0-9, clamped).
    ///
    /// Stream levels change lazily: a stream picks up its new level the next
    /// time it is used, and the control byte of that rectangle tells the
    /// client to reset it.
    pub fn set_compress_level(&mut self, level: u8) {
        self.compress_level = level.min(9);
        self.config = TightConfig::for_level(self.compress_level);
    }

    /// Enables JPEG with an RFB quality level (0-9, clamped).
    pub fn set_quality_level(&mut self, level: u8) {
        self.jpeg = JpegSettings::from_quality_level(level);
    }

    /// Enables JPEG with an explicit quality (1-100) and subsampling.
    pub fn set_fine_quality(&mut self, quality: u8, subsampling: Subsampling) {
        self.jpeg = JpegSettings::fine(quality, subsampling);
    }

    /// Disables JPEG; truecolor rectangles use full-color zlib.
    pub fn disable_jpeg(&mut self) {
        self.jpeg = JpegSettings::disabled();
    }

    /// Applies a compression-level or quality-level pseudo-encoding.
    ///
    /// Returns `false` if `encoding` is neither.
    pub fn apply_pseudo_encoding(&mut self, encoding: i32) -> bool {
        if let Some(level) = compress_level_from_encoding(encoding) {
            self.set_compress_level(level);
            true
        } else if let Some(level) = quality_level_from_encoding(encoding) {
            self.set_quality_level(level);
            true
        } else {
            false
        }
    }

    /// Drops the dictionaries of all four zlib streams.
    ///
    /// The next rectangle's control byte carries the reset bit of every
    /// stream that had produced data, whatever its subencoding.
    pub fn reset_streams(&mut self) {
        self.pending_reset |= self.streams.reset_all();
    }

    /// Current compression preset.
    #[must_use]
    pub fn config(&self) -> &TightConfig {
        &self.config
    }

    /// Current compression level.
    #[must_use]
    pub fn compress_level(&self) -> u8 {
        self.compress_level
    }

    /// Current JPEG settings.
    #[must_use]
    pub fn jpeg_settings(&self) -> &JpegSettings {
        &self.jpeg
    }

    /// Encodes one rectangle's Tight data (without the rectangle header).
    ///
    /// `force_solid` tells the encoder the rectangle is already known to be
    /// solid, for example from [`super::check_solid_tile`]. Nothing is
    /// appended to `out` unless the whole rectangle encodes successfully.
    ///
    /// # Errors
    ///
    /// - [`TightError::InvalidRectangle`] if `rect` has no pixels, or is
    ///   larger than `max_rect_size` or wider than `max_rect_width` (use
    ///   [`Self::write_rect`] to split it)
    /// - [`TightError::InvalidPixelFormat`] if either pixel format fails
    ///   [`PixelFormat::is_valid`](crate::protocol::PixelFormat::is_valid)
    /// - compression or JPEG errors, unchanged
    pub fn encode_rect(
        &mut self,
        source: &dyn ImageSource,
        rect: &Rect,
        force_solid: bool,
        out: &mut BytesMut,
    ) -> Result<()> {
        if rect.is_empty() {
            return Err(TightError::InvalidRectangle(format!(
                "{}x{} at ({}, {}) has no pixels",
                rect.width, rect.height, rect.x, rect.y
            )));
        }
        if rect.area() > self.config.max_rect_size || rect.width > self.config.max_rect_width {
            return Err(TightError::InvalidRectangle(format!(
                "{}x{} exceeds the {} pixel / {} wide limit",
                rect.width, rect.height, self.config.max_rect_size, self.config.max_rect_width
            )));
        }
        if !source.client_format().is_valid() || !source.server_format().is_valid() {
            return Err(TightError::InvalidPixelFormat);
        }

        let mut buf = BytesMut::new();
        let result = match source.client_format().bits_per_pixel {
            8 => self.encode_pixels::<u8>(source, rect, force_solid, &mut buf),
            16 => self.encode_pixels::<u16>(source, rect, force_solid, &mut buf),
            32 => self.encode_pixels::<u32>(source, rect, force_solid, &mut buf),
            _ => Err(TightError::InvalidPixelFormat),
        };
        if let Err(e) = result {
            log::error!(
                "Tight encoding of {}x{} rectangle at ({}, {}) failed: {}",
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                e
            );
            return Err(e);
        }

        if let Some(control) = buf.first_mut() {
            *control |= self.pending_reset;
        }
        self.pending_reset = 0;
        out.put_slice(&buf);
        Ok(())
    }

    /// Splits `rect` into pieces no wider than `max_rect_width` and no larger
    /// than `max_rect_size` pixels.
    #[must_use]
    pub fn split_rect(&self, rect: &Rect) -> Vec<Rect> {
        let max_size = self.config.max_rect_size;
        let max_width = usize::from(self.config.max_rect_width);

        if rect.is_empty() {
            return Vec::new();
        }
        if rect.area() <= max_size && usize::from(rect.width) <= max_width {
            return vec![*rect];
        }

        let sub_width = usize::from(rect.width).min(max_width);
        let sub_height = (max_size / sub_width).max(1);
        let mut rects = Vec::new();

        let (width, height) = (usize::from(rect.width), usize::from(rect.height));
        let mut dy = 0;
        while dy < height {
            let h = sub_height.min(height - dy);
            let mut dx = 0;
            while dx < width {
                let w = sub_width.min(width - dx);
                rects.push(Rect::new(
                    rect.x + to_u16(dx),
                    rect.y + to_u16(dy),
                    to_u16(w),
                    to_u16(h),
                ));
                dx += w;
            }
            dy += h;
        }
        rects
    }

    /// Writes `rect` as one or more Tight rectangles, each preceded by its
    /// RFB rectangle header. Returns the number of rectangles written, which
    /// the caller counts into its FramebufferUpdate.
    ///
    /// Empty rectangles are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first encoding error. Rectangles written before it stay
    /// in `out`.
    pub fn write_rect(
        &mut self,
        source: &dyn ImageSource,
        rect: &Rect,
        out: &mut BytesMut,
    ) -> Result<usize> {
        let pieces = self.split_rect(rect);
        for piece in &pieces {
            let mut buf = BytesMut::new();
            Rectangle {
                rect: *piece,
                encoding: ENCODING_TIGHT,
            }
            .write_header(&mut buf);
            self.encode_rect(source, piece, false, &mut buf)?;
            out.put_slice(&buf);
        }
        Ok(pieces.len())
    }

    fn encode_pixels<P: Pixel>(
        &mut self,
        source: &dyn ImageSource,
        rect: &Rect,
        force_solid: bool,
        out: &mut BytesMut,
    ) -> Result<()> {
        let client_format = source.client_format();
        let packing = Packing {
            format: client_format,
            pack24: P::BYTES == 4 && client_format.is_888(),
        };
        let area = rect.area();
        let gray_jpeg = self.jpeg.is_gray();
        let mut have_image = false;

        if force_solid {
            let color = first_pixel::<P>(source, rect);
            self.palette.clear();
            self.palette.insert(color, area);
        } else {
            let max_colors = self.config.pal_max_colors(area, self.jpeg.enabled());

            if P::BYTES >= 2 && client_format.equal(source.server_format()) {
                // Count on the raw buffer so JPEG rectangles skip translation
                if gray_jpeg {
                    self.palette.clear();
                } else {
                    self.palette.fast_fill_palette::<P>(source, rect, max_colors);
                }
                if !self.palette.is_empty() || !self.jpeg.enabled() {
                    self.fetch_image::<P>(source, rect);
                    have_image = true;
                }
            } else {
                self.fetch_image::<P>(source, rect);
                have_image = true;
                if gray_jpeg {
                    self.palette.clear();
                } else {
                    self.palette.fill_palette::<P>(&self.image_buf, area, max_colors);
                }
            }
        }

        let image_len = area * P::BYTES;
        match self.palette.len() {
            0 => {
                if let (true, Some(quality)) = (P::INDEXED, self.jpeg.quality) {
                    #[cfg(feature = "debug-logging")]
                    log::debug!("Tight: {}x{} JPEG q={}", rect.width, rect.height, quality);

                    let subsampling = self.jpeg.subsampling;
                    if have_image {
                        encode_jpeg(
                            self.jpeg_compressor.as_mut(),
                            &self.image_buf[..image_len],
                            usize::from(rect.width),
                            rect,
                            client_format,
                            quality,
                            subsampling,
                            out,
                        )
                    } else {
                        let (raw, stride) = source.raw_buffer(rect);
                        encode_jpeg(
                            self.jpeg_compressor.as_mut(),
                            raw,
                            stride,
                            rect,
                            source.server_format(),
                            quality,
                            subsampling,
                            out,
                        )
                    }
                } else {
                    #[cfg(feature = "debug-logging")]
                    log::debug!("Tight: {}x{} full-color", rect.width, rect.height);

                    if !have_image {
                        self.fetch_image::<P>(source, rect);
                    }
                    encode_full_color::<P>(
                        &mut self.image_buf[..image_len],
                        rect,
                        packing,
                        &mut self.streams,
                        self.config.raw_zlib_level,
                        out,
                    )
                }
            }
            1 => {
                #[cfg(feature = "debug-logging")]
                log::debug!("Tight: {}x{} solid", rect.width, rect.height);

                encode_solid::<P>(self.palette.color(0), packing, out);
                Ok(())
            }
            2 => {
                #[cfg(feature = "debug-logging")]
                log::debug!("Tight: {}x{} mono", rect.width, rect.height);

                encode_mono::<P>(
                    &mut self.image_buf[..image_len],
                    rect,
                    &self.palette,
                    packing,
                    &mut self.streams,
                    self.config.mono_zlib_level,
                    out,
                )
            }
            _ => {
                #[cfg(feature = "debug-logging")]
                log::debug!(
                    "Tight: {}x{} indexed, {} colors",
                    rect.width,
                    rect.height,
                    self.palette.len()
                );

                encode_indexed::<P>(
                    &mut self.image_buf[..image_len],
                    rect,
                    &self.palette,
                    packing,
                    &mut self.streams,
                    self.config.idx_zlib_level,
                    out,
                )
            }
        }
    }

    /// Fills the scratch buffer with the rectangle in the client format.
    fn fetch_image<P: Pixel>(&mut self, source: &dyn ImageSource, rect: &Rect) {
        let len = rect.area() * P::BYTES;
        if self.image_buf.len() < len {
            self.image_buf.resize(len, 0);
        }
        source.get_image(&mut self.image_buf[..len], rect);
    }
}

/// The rectangle's top-left pixel translated to the client format, padding
/// bits cleared.
fn first_pixel<P: Pixel>(source: &dyn ImageSource, rect: &Rect) -> u32 {
    let (raw, _) = source.raw_buffer(rect);
    let server_bpp = source.server_format().bytes_per_pixel();
    let mut pixel = [0u8; 4];
    source.translate_pixels(&raw[..server_bpp], &mut pixel[..P::BYTES], 1);
    (P::load(&pixel) & signal_mask::<P>(source.client_format())).to_u32()
}

#[allow(clippy::cast_possible_truncation)] // Offsets stay within a u16 rectangle
fn to_u16(value: usize) -> u16 {
    value as u16
}
