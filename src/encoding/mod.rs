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

//! Tight encoding implementation.
//!
//! [`TightEncoder`] is the entry point. The submodules hold the pieces it is
//! built from: color counting, in-place packing, the persistent zlib streams
//! and the byte layout of each subencoding.

pub mod pack;
pub mod palette;
pub mod pixel;
pub mod solid;
pub mod stream;
pub mod subencoding;
pub mod tight;

pub use palette::{Palette, PaletteEntry};
pub use pixel::Pixel;
pub use solid::check_solid_tile;
pub use stream::{write_compact_length, CompressionStreamSet};
pub use tight::TightEncoder;
