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

//! FFI bindings to libjpeg-turbo's `TurboJPEG` API.
//!
//! When the client format is 32-bit with byte-aligned 8-bit channels the
//! pixel buffer is handed to libjpeg-turbo directly, pitch included.
//! Any other format is gathered into packed RGB first.

use std::ffi::c_void;
use std::os::raw::{c_char, c_int, c_uchar, c_ulong};

use super::{rgb_rows, JpegCompressor, Subsampling};
use crate::error::{Result, TightError};
use crate::protocol::{PixelFormat, Rect};

// TurboJPEG pixel format constants
const TJPF_RGB: c_int = 0;
const TJPF_RGBX: c_int = 2;
const TJPF_BGRX: c_int = 3;
const TJPF_XBGR: c_int = 4;
const TJPF_XRGB: c_int = 5;

// TurboJPEG chrominance subsampling constants
const TJSAMP_444: c_int = 0;
const TJSAMP_422: c_int = 1;
const TJSAMP_420: c_int = 2;
const TJSAMP_GRAY: c_int = 3;

// Opaque TurboJPEG handle
type TjHandle = *mut c_void;

#[link(name = "turbojpeg")]
extern "C" {
    fn tjInitCompress() -> TjHandle;
    fn tjDestroy(handle: TjHandle) -> c_int;
    fn tjCompress2(
        handle: TjHandle,
        src_buf: *const c_uchar,
        width: c_int,
        pitch: c_int,
        height: c_int,
        pixel_format: c_int,
        jpeg_buf: *mut *mut c_uchar,
        jpeg_size: *mut c_ulong,
        jpeg_subsamp: c_int,
        jpeg_qual: c_int,
        flags: c_int,
    ) -> c_int;
    fn tjFree(buffer: *mut c_uchar);
    fn tjGetErrorStr2(handle: TjHandle) -> *const c_char;
}

/// Safe Rust wrapper for `TurboJPEG` compression.
pub struct TurboJpegEncoder {
    handle: TjHandle,
}

impl TurboJpegEncoder {
    /// Creates a new `TurboJPEG` encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if libjpeg-turbo cannot allocate a compressor.
    pub fn new() -> Result<Self> {
        let handle = unsafe { tjInitCompress() };
        if handle.is_null() {
            return Err(TightError::Jpeg(
                "Failed to initialize TurboJPEG compressor".to_string(),
            ));
        }
        Ok(Self { handle })
    }

    /// Maps a 32-bit pixel format to a `TurboJPEG` pixel format, when the
    /// channels can be read in place.
    fn native_format(format: &PixelFormat) -> Option<c_int> {
        if !format.is_888() {
            return None;
        }
        // Byte index of each channel in memory
        let byte_of = |shift: u8| {
            if format.big_endian_flag != 0 {
                3 - shift / 8
            } else {
                shift / 8
            }
        };
        match (
            byte_of(format.red_shift),
            byte_of(format.green_shift),
            byte_of(format.blue_shift),
        ) {
            (0, 1, 2) => Some(TJPF_RGBX),
            (2, 1, 0) => Some(TJPF_BGRX),
            (3, 2, 1) => Some(TJPF_XBGR),
            (1, 2, 3) => Some(TJPF_XRGB),
            _ => None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compress_raw(
        &mut self,
        data: &[u8],
        width: u16,
        pitch: usize,
        height: u16,
        pixel_format: c_int,
        quality: u8,
        subsampling: Subsampling,
    ) -> Result<Vec<u8>> {
        let subsamp = match subsampling {
            Subsampling::None => TJSAMP_444,
            Subsampling::TwoX => TJSAMP_422,
            Subsampling::FourX => TJSAMP_420,
            Subsampling::Gray => TJSAMP_GRAY,
        };
        let pitch = c_int::try_from(pitch)
            .map_err(|_| TightError::Jpeg(format!("Pitch {pitch} too large")))?;

        let mut jpeg_buf: *mut c_uchar = std::ptr::null_mut();
        let mut jpeg_size: c_ulong = 0;

        let result = unsafe {
            tjCompress2(
                self.handle,
                data.as_ptr(),
                c_int::from(width),
                pitch,
                c_int::from(height),
                pixel_format,
                &mut jpeg_buf,
                &mut jpeg_size,
                subsamp,
                c_int::from(quality.clamp(1, 100)),
                0, // flags
            )
        };

        if result != 0 {
            let error_msg = self.get_error_string();
            return Err(TightError::Jpeg(format!(
                "TurboJPEG compression failed: {error_msg}"
            )));
        }

        if jpeg_buf.is_null() {
            return Err(TightError::Jpeg(
                "TurboJPEG returned null buffer".to_string(),
            ));
        }

        let jpeg_data =
            unsafe { std::slice::from_raw_parts(jpeg_buf, jpeg_size as usize).to_vec() };

        unsafe {
            tjFree(jpeg_buf);
        }

        Ok(jpeg_data)
    }

    /// Gets the last error message from `TurboJPEG`.
    fn get_error_string(&self) -> String {
        unsafe {
            let c_str = tjGetErrorStr2(self.handle);
            if c_str.is_null() {
                return "Unknown error".to_string();
            }
            std::ffi::CStr::from_ptr(c_str)
                .to_string_lossy()
                .into_owned()
        }
    }
}

impl JpegCompressor for TurboJpegEncoder {
    fn compress(
        &mut self,
        buf: &[u8],
        stride: usize,
        rect: &Rect,
        format: &PixelFormat,
        quality: u8,
        subsampling: Subsampling,
    ) -> Result<Vec<u8>> {
        if let Some(native) = Self::native_format(format) {
            return self.compress_raw(
                buf,
                rect.width,
                stride * 4,
                rect.height,
                native,
                quality,
                subsampling,
            );
        }

        let rgb = rgb_rows(buf, stride, rect, format);
        self.compress_raw(
            &rgb,
            rect.width,
            usize::from(rect.width) * 3,
            rect.height,
            TJPF_RGB,
            quality,
            subsampling,
        )
    }
}

impl Drop for TurboJpegEncoder {
    fn drop(&mut self) {
        unsafe {
            tjDestroy(self.handle);
        }
    }
}

unsafe impl Send for TurboJpegEncoder {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_format() {
        assert_eq!(
            TurboJpegEncoder::native_format(&PixelFormat::rgba32()),
            Some(TJPF_RGBX)
        );
        assert_eq!(
            TurboJpegEncoder::native_format(&PixelFormat::bgrx32()),
            Some(TJPF_BGRX)
        );
        assert_eq!(TurboJpegEncoder::native_format(&PixelFormat::rgb565()), None);
    }

    #[test]
    fn test_compress_rgb565() {
        let mut encoder = TurboJpegEncoder::new().unwrap();
        let buf = vec![0x00u8, 0xF8, 0x00, 0xF8, 0x00, 0xF8, 0x00, 0xF8];

        let jpeg_data = encoder
            .compress(
                &buf,
                2,
                &Rect::new(0, 0, 2, 2),
                &PixelFormat::rgb565(),
                90,
                Subsampling::TwoX,
            )
            .unwrap();
        assert_eq!(&jpeg_data[..2], &[0xFF, 0xD8]);
    }
}
