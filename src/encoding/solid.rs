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

//! Solid tile detection on the raw framebuffer.

use super::pixel::{strided_pixels, Pixel};
use crate::error::{Result, TightError};
use crate::protocol::Rect;
use crate::source::ImageSource;

/// Checks whether every pixel of `rect` has the same raw value.
///
/// Reads the source's raw buffer in the server pixel format. When
/// `need_color` is given, the tile only counts as solid if its color equals
/// it. Returns the raw color of a solid tile.
///
/// # Errors
///
/// Returns [`TightError::InvalidPixelFormat`] if the server format is not
/// 8, 16 or 32 bits per pixel.
pub fn check_solid_tile(
    source: &dyn ImageSource,
    rect: &Rect,
    need_color: Option<u32>,
) -> Result<Option<u32>> {
    match source.server_format().bits_per_pixel {
        8 => Ok(check_solid::<u8>(source, rect, need_color)),
        16 => Ok(check_solid::<u16>(source, rect, need_color)),
        32 => Ok(check_solid::<u32>(source, rect, need_color)),
        _ => Err(TightError::InvalidPixelFormat),
    }
}

fn check_solid<P: Pixel>(source: &dyn ImageSource, rect: &Rect, need_color: Option<u32>) -> Option<u32> {
    if rect.is_empty() {
        return None;
    }

    let (raw, stride) = source.raw_buffer(rect);
    let color = P::load(raw);
    if need_color.is_some_and(|c| c != color.to_u32()) {
        return None;
    }

    strided_pixels::<P>(raw, stride, usize::from(rect.width), usize::from(rect.height))
        .all(|p| p == color)
        .then(|| color.to_u32())
}
