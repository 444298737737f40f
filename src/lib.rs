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


//! # rfb-tight
//!
//! A pure Rust encoder for the RFB (VNC) Tight encoding.
//!
//! Given a rectangle of a framebuffer, the encoder counts its colors and
//! picks the cheapest Tight subencoding, producing wire bytes compatible with
//! libvncserver and TigerVNC clients.
//!
//! ## Features
//!
//! - **All 5 subencodings**: solid fill, mono rect, indexed palette,
//!   full-color zlib, JPEG
//! - **All pixel formats**: 8/16/32-bit clients, 24-bit packing for 8-8-8
//!   formats
//! - **Persistent zlib streams**: four per session, as the protocol requires
//! - **Compression presets**: the classic Tight level 0-9 table
//! - **Optional TurboJPEG**: libjpeg-turbo back end via feature flag
//!
//! ## Quick Start
//!
//! ```no_run
//! use bytes::BytesMut;
//! use rfb_tight::{FramebufferSource, PixelFormat, Rect, TightEncoder};
//!
//! let pixels = vec![0u8; 640 * 480 * 4];
//! let source = FramebufferSource::new(
//!     pixels,
//!     640,
//!     480,
//!     PixelFormat::rgba32(),
//!     PixelFormat::rgb565(),
//! );
//!
//! let mut encoder = TightEncoder::new();
//! encoder.set_compress_level(6);
//! encoder.set_quality_level(7);
//!
//! let mut out = BytesMut::new();
//! let count = encoder.write_rect(&source, &Rect::new(0, 0, 640, 480), &mut out)?;
//! # Ok::<(), rfb_tight::TightError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         TightEncoder (session)          │
//! │                                         │
//! │  • Compression / quality settings       │
//! │  • Rectangle splitting and headers      │
//! └──────────────────┬──────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Palette (color counting)         │
//! │                                         │
//! │  • Raw buffer scan (same formats)       │
//! │  • Translated buffer scan               │
//! └──────────────────┬──────────────────────┘
//!                    │
//!        ┌───────────┼───────────┐
//!        ▼           ▼           ▼
//!   ┌────────┐ ┌──────────┐ ┌────────┐
//!   │ Solid  │ │Mono/Index│ │  JPEG  │
//!   └────────┘ └──────────┘ └────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     CompressionStreamSet (zlib x4)      │
//! └─────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod encoding;
pub mod error;
pub mod jpeg;
pub mod protocol;
pub mod source;
pub mod translate;

// Re-exports
pub use config::{JpegSettings, TightConfig};
pub use encoding::{check_solid_tile, Palette, TightEncoder};
pub use error::{Result, TightError};
pub use jpeg::{JpegCompressor, JpegEncoderBackend, Subsampling};
pub use protocol::{PixelFormat, Rect};
pub use source::{FramebufferSource, ImageSource};

#[cfg(feature = "turbojpeg")]
pub use jpeg::TurboJpegEncoder;
