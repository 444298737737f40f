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

//! Pure Rust JPEG back end built on the `jpeg-encoder` crate.

use jpeg_encoder::{ColorType, Encoder, SamplingFactor};

use super::{luma_from_rgb, rgb_rows, JpegCompressor, Subsampling};
use crate::error::{Result, TightError};
use crate::protocol::{PixelFormat, Rect};

/// Default JPEG compressor. Stateless apart from a reusable output buffer.
#[derive(Debug, Default)]
pub struct JpegEncoderBackend {
    output: Vec<u8>,
}

impl JpegEncoderBackend {
    /// Creates a new back end.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl JpegCompressor for JpegEncoderBackend {
    fn compress(
        &mut self,
        buf: &[u8],
        stride: usize,
        rect: &Rect,
        format: &PixelFormat,
        quality: u8,
        subsampling: Subsampling,
    ) -> Result<Vec<u8>> {
        let rgb = rgb_rows(buf, stride, rect, format);
        let quality = quality.clamp(1, 100);

        self.output.clear();
        let mut encoder = Encoder::new(&mut self.output, quality);
        let (data, color_type) = match subsampling {
            Subsampling::Gray => (luma_from_rgb(&rgb), ColorType::Luma),
            Subsampling::None => {
                encoder.set_sampling_factor(SamplingFactor::R_4_4_4);
                (rgb, ColorType::Rgb)
            }
            Subsampling::TwoX => {
                encoder.set_sampling_factor(SamplingFactor::R_4_2_2);
                (rgb, ColorType::Rgb)
            }
            Subsampling::FourX => {
                encoder.set_sampling_factor(SamplingFactor::R_4_2_0);
                (rgb, ColorType::Rgb)
            }
        };

        encoder
            .encode(&data, rect.width, rect.height, color_type)
            .map_err(|e| TightError::Jpeg(e.to_string()))?;

        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_produces_jpeg() {
        let mut backend = JpegEncoderBackend::new();
        let format = PixelFormat::rgba32();
        let buf: Vec<u8> = (0..16u8).flat_map(|i| [i * 16, 255 - i * 16, 128, 0]).collect();

        for subsampling in [
            Subsampling::None,
            Subsampling::TwoX,
            Subsampling::FourX,
            Subsampling::Gray,
        ] {
            let jpeg = backend
                .compress(&buf, 4, &Rect::new(0, 0, 4, 4), &format, 80, subsampling)
                .unwrap();
            // JPEG files start with 0xFF 0xD8
            assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        }
    }
}
