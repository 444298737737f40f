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

//! Color counting for Tight subencoding selection.
//!
//! A rectangle is classified by how many distinct colors it holds: one
//! (solid fill), two (mono bitmap), a few (indexed palette) or too many
//! (full-color or JPEG). The scan runs in three phases:
//!
//! 1. **First color**: count pixels equal to the first pixel.
//! 2. **Second color**: count pixels equal to either of the first two colors.
//! 3. **Runs**: track runs of identical pixels and add each finished run to
//!    the palette, giving up once the palette grows past the cap.
//!
//! Two entry points share the scan. [`Palette::fill_palette`] reads an
//! already translated, tightly packed buffer. [`Palette::fast_fill_palette`]
//! reads the raw framebuffer with its stride, masks out padding bits, and
//! translates only the colors that end up in the palette, so a rectangle
//! that goes to JPEG is never translated at all.

use std::collections::HashMap;

use super::pixel::{signal_mask, strided_pixels, Pixel};
use crate::protocol::{Rect, TIGHT_MAX_PALETTE_SIZE};
use crate::source::ImageSource;

/// A palette color and the number of pixels using it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    /// Pixel value in the client pixel format.
    pub color: u32,
    /// Number of pixels with this color.
    pub count: usize,
}

/// Colors of one rectangle in order of first insertion, at most 256.
///
/// An empty palette means the rectangle is truecolor: either too many colors
/// were found or counting was skipped.
#[derive(Debug, Clone)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
    index: HashMap<u32, u8>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl Palette {
    /// Creates an empty palette.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(TIGHT_MAX_PALETTE_SIZE),
            index: HashMap::with_capacity(TIGHT_MAX_PALETTE_SIZE),
        }
    }

    /// Removes every color.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Adds `count` pixels of `color`.
    ///
    /// Returns `false` if the color is new and the palette is already full.
    #[allow(clippy::cast_possible_truncation)] // Index is below 256
    pub fn insert(&mut self, color: u32, count: usize) -> bool {
        if let Some(&idx) = self.index.get(&color) {
            self.entries[usize::from(idx)].count += count;
            return true;
        }
        if self.entries.len() == TIGHT_MAX_PALETTE_SIZE {
            return false;
        }
        self.index.insert(color, self.entries.len() as u8);
        self.entries.push(PaletteEntry { color, count });
        true
    }

    /// Number of distinct colors; 0 means truecolor.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no colors are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    /// Color at palette index `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= len()`.
    #[must_use]
    pub fn color(&self, idx: usize) -> u32 {
        self.entries[idx].color
    }

    /// Palette index of `color`.
    #[must_use]
    pub fn lookup(&self, color: u32) -> Option<u8> {
        self.index.get(&color).copied()
    }

    fn insert_capped(&mut self, color: u32, count: usize, max_colors: usize) -> bool {
        self.insert(color, count) && self.len() <= max_colors
    }

    /// Counts the colors of `count` tightly packed pixels in `data`.
    ///
    /// At most `max_colors` colors are accepted; with `max_colors < 2` only
    /// solid rectangles are recognised. 8-bit pixels never go past two colors.
    pub fn fill_palette<P: Pixel>(&mut self, data: &[u8], count: usize, max_colors: usize) {
        let pixels = data[..count * P::BYTES].chunks_exact(P::BYTES).map(P::load);
        self.count_colors(pixels, max_colors, P::to_u32);
    }

    /// Counts the colors of `rect` directly in the source's raw buffer.
    ///
    /// Only meaningful when the client and server formats are equal. Padding
    /// bits of the server format are ignored, and colors that end up in the
    /// palette are translated when the source transforms pixel values.
    pub fn fast_fill_palette<P: Pixel>(
        &mut self,
        source: &dyn ImageSource,
        rect: &Rect,
        max_colors: usize,
    ) {
        let mask = signal_mask::<P>(source.server_format());
        let (raw, stride) = source.raw_buffer(rect);
        let pixels = strided_pixels::<P>(
            raw,
            stride,
            usize::from(rect.width),
            usize::from(rect.height),
        )
        .map(move |p| p & mask);

        if source.will_transform() {
            self.count_colors(pixels, max_colors, |c: P| translate_one(source, c));
        } else {
            self.count_colors(pixels, max_colors, P::to_u32);
        }
    }

    fn count_colors<P, I, F>(&mut self, mut pixels: I, max_colors: usize, mut translate: F)
    where
        P: Pixel,
        I: Iterator<Item = P>,
        F: FnMut(P) -> u32,
    {
        self.clear();

        let Some(c0) = pixels.next() else {
            return;
        };
        let mut n0 = 1;

        // First color
        let c1 = loop {
            match pixels.next() {
                Some(p) if p == c0 => n0 += 1,
                Some(p) => break p,
                None => {
                    self.insert(translate(c0), n0);
                    return;
                }
            }
        };

        if max_colors < 2 {
            return; // Full-color format preferred
        }

        // Second color
        let mut n1 = 1;
        let c2 = loop {
            match pixels.next() {
                Some(p) if p == c0 => n0 += 1,
                Some(p) if p == c1 => n1 += 1,
                Some(p) => break p,
                None => {
                    self.insert(translate(c0), n0);
                    self.insert(translate(c1), n1);
                    return;
                }
            }
        };

        if !P::INDEXED {
            return;
        }

        self.insert(translate(c0), n0);
        self.insert(translate(c1), n1);

        // Runs
        let mut ci = c2;
        let mut ni = 1;
        for p in pixels {
            if p == ci {
                ni += 1;
                continue;
            }
            if !self.insert_capped(translate(ci), ni, max_colors) {
                self.clear();
                return;
            }
            ci = p;
            ni = 1;
        }
        if !self.insert_capped(translate(ci), ni, max_colors) {
            self.clear();
        }
    }
}

fn translate_one<P: Pixel>(source: &dyn ImageSource, color: P) -> u32 {
    let mut src = [0u8; 4];
    let mut dst = [0u8; 4];
    color.store(&mut src);
    source.translate_pixels(&src[..P::BYTES], &mut dst[..P::BYTES], 1);
    P::load(&dst).to_u32()
}
