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

//! Tight encoder configuration.
//!
//! A client picks a compression level (0-9) and optionally a JPEG quality
//! level (0-9) through pseudo-encodings. Each level maps to a preset of
//! tuning knobs; the presets follow the classic Tight tables.

use crate::jpeg::Subsampling;
use crate::protocol::{
    ENCODING_COMPRESS_LEVEL_0, ENCODING_COMPRESS_LEVEL_9, ENCODING_QUALITY_LEVEL_0,
    ENCODING_QUALITY_LEVEL_9,
};

/// Compression level used when the client does not ask for one.
pub const DEFAULT_COMPRESS_LEVEL: u8 = 2;

/// Tuning knobs for one compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TightConfig {
    /// Largest rectangle area encoded in one piece; also bounds scratch buffers.
    pub max_rect_size: usize,
    /// Largest rectangle width encoded in one piece.
    pub max_rect_width: u16,
    /// Rectangles at least this large always get a two-color analysis.
    pub mono_min_rect_size: usize,
    /// zlib level for indexed palette data (stream 2).
    pub idx_zlib_level: u32,
    /// zlib level for mono bitmaps (stream 1).
    pub mono_zlib_level: u32,
    /// zlib level for full-color data (stream 0).
    pub raw_zlib_level: u32,
    /// Palette cap is the rectangle area divided by this.
    pub idx_max_colors_divisor: usize,
    /// Palette cap used instead when JPEG is enabled.
    pub pal_max_colors_with_jpeg: usize,
}

const TIGHT_CONF: [TightConfig; 10] = [
    TightConfig::preset(6, 0, 0, 0, 4, 24),
    TightConfig::preset(6, 1, 1, 1, 8, 24),
    TightConfig::preset(8, 3, 3, 2, 24, 96),
    TightConfig::preset(12, 5, 5, 2, 32, 96),
    TightConfig::preset(12, 6, 6, 3, 32, 96),
    TightConfig::preset(12, 7, 7, 4, 32, 96),
    TightConfig::preset(16, 7, 7, 5, 32, 96),
    TightConfig::preset(32, 8, 8, 6, 32, 96),
    TightConfig::preset(32, 9, 9, 7, 32, 96),
    TightConfig::preset(32, 9, 9, 9, 32, 96),
];

impl TightConfig {
    const fn preset(
        mono_min_rect_size: usize,
        idx_zlib_level: u32,
        mono_zlib_level: u32,
        raw_zlib_level: u32,
        idx_max_colors_divisor: usize,
        pal_max_colors_with_jpeg: usize,
    ) -> Self {
        Self {
            max_rect_size: 65536,
            max_rect_width: 2048,
            mono_min_rect_size,
            idx_zlib_level,
            mono_zlib_level,
            raw_zlib_level,
            idx_max_colors_divisor,
            pal_max_colors_with_jpeg,
        }
    }

    /// Returns the preset for a compression level; levels above 9 clamp to 9.
    #[must_use]
    pub fn for_level(level: u8) -> Self {
        TIGHT_CONF[usize::from(level.min(9))]
    }

    /// Palette cap for a rectangle of `area` pixels.
    ///
    /// Large rectangles are always allowed two colors so that mono encoding
    /// is tried even when indexed analysis is not worth it.
    #[must_use]
    pub fn pal_max_colors(&self, area: usize, jpeg_enabled: bool) -> usize {
        let mut max_colors = if jpeg_enabled {
            self.pal_max_colors_with_jpeg
        } else {
            area / self.idx_max_colors_divisor.max(1)
        };
        if max_colors < 2 && area >= self.mono_min_rect_size {
            max_colors = 2;
        }
        max_colors
    }
}

impl Default for TightConfig {
    fn default() -> Self {
        Self::for_level(DEFAULT_COMPRESS_LEVEL)
    }
}

/// JPEG settings for a session. `quality == None` disables JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JpegSettings {
    /// JPEG quality (1-100).
    pub quality: Option<u8>,
    /// Chrominance subsampling.
    pub subsampling: Subsampling,
}

const JPEG_CONF: [(u8, Subsampling); 10] = [
    (15, Subsampling::FourX),
    (29, Subsampling::FourX),
    (41, Subsampling::FourX),
    (42, Subsampling::TwoX),
    (62, Subsampling::TwoX),
    (77, Subsampling::TwoX),
    (79, Subsampling::None),
    (86, Subsampling::None),
    (92, Subsampling::None),
    (100, Subsampling::None),
];

impl JpegSettings {
    /// JPEG switched off: truecolor rectangles use full-color zlib.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            quality: None,
            subsampling: Subsampling::None,
        }
    }

    /// Settings for an RFB quality level (0-9); levels above 9 clamp to 9.
    #[must_use]
    pub fn from_quality_level(level: u8) -> Self {
        let (quality, subsampling) = JPEG_CONF[usize::from(level.min(9))];
        Self {
            quality: Some(quality),
            subsampling,
        }
    }

    /// Explicit quality and subsampling.
    #[must_use]
    pub fn fine(quality: u8, subsampling: Subsampling) -> Self {
        Self {
            quality: Some(quality.clamp(1, 100)),
            subsampling,
        }
    }

    /// Returns `true` if truecolor rectangles should be sent as JPEG.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.quality.is_some()
    }

    /// Returns `true` for grayscale JPEG, where color counting is skipped.
    #[must_use]
    pub fn is_gray(&self) -> bool {
        self.enabled() && self.subsampling == Subsampling::Gray
    }
}

/// Maps a compression-level pseudo-encoding to its level.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Range checked
pub fn compress_level_from_encoding(encoding: i32) -> Option<u8> {
    (ENCODING_COMPRESS_LEVEL_0..=ENCODING_COMPRESS_LEVEL_9)
        .contains(&encoding)
        .then(|| (encoding - ENCODING_COMPRESS_LEVEL_0) as u8)
}

/// Maps a JPEG quality-level pseudo-encoding to its level.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Range checked
pub fn quality_level_from_encoding(encoding: i32) -> Option<u8> {
    (ENCODING_QUALITY_LEVEL_0..=ENCODING_QUALITY_LEVEL_9)
        .contains(&encoding)
        .then(|| (encoding - ENCODING_QUALITY_LEVEL_0) as u8)
}
