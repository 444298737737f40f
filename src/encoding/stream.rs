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

//! Persistent zlib streams for Tight.
//!
//! A Tight session keeps four zlib streams, one per stream id, whose
//! dictionaries carry over from rectangle to rectangle. Each rectangle's data
//! is compressed with a single `Z_SYNC_FLUSH` so the client can decode it
//! without waiting for later rectangles.

use bytes::{BufMut, BytesMut};
use flate2::{Compress, Compression, FlushCompress};

use crate::error::{Result, TightError};
use crate::protocol::{TIGHT_MAX_COMPACT_LENGTH, TIGHT_MIN_TO_COMPRESS, TIGHT_STREAM_COUNT};

struct ZlibStream {
    compressor: Compress,
    level: u32,
    used: bool,
}

impl ZlibStream {
    fn new(level: u32) -> Self {
        Self {
            compressor: Compress::new(Compression::new(level), true),
            level,
            used: false,
        }
    }
}

/// The four zlib streams of one Tight session.
pub struct CompressionStreamSet {
    streams: [ZlibStream; TIGHT_STREAM_COUNT],
}

impl CompressionStreamSet {
    /// Creates the streams with their initial compression levels.
    #[must_use]
    pub fn new(levels: [u32; TIGHT_STREAM_COUNT]) -> Self {
        Self {
            streams: levels.map(ZlibStream::new),
        }
    }

    /// Current compression level of stream `id`.
    #[must_use]
    pub fn level(&self, id: usize) -> u32 {
        self.streams[id].level
    }

    /// Sets the compression level of stream `id`.
    ///
    /// A new level needs a new zlib stream. If the old one already produced
    /// data, the client's inflater has to start over too, so the returned
    /// value holds the Tight reset bit for this stream; it is 0 otherwise.
    pub fn set_level(&mut self, id: usize, level: u32) -> u8 {
        let stream = &mut self.streams[id];
        if stream.level == level {
            return 0;
        }

        let needs_reset = stream.used;
        *stream = ZlibStream::new(level);
        if needs_reset {
            log::trace!("Tight: zlib stream {id} restarted at level {level}");
            1 << id
        } else {
            0
        }
    }

    /// Discards every stream's dictionary and returns the reset bits the
    /// next control byte has to carry.
    pub fn reset_all(&mut self) -> u8 {
        let mut bits = 0;
        for (id, stream) in self.streams.iter_mut().enumerate() {
            if stream.used {
                bits |= 1 << id;
            }
            *stream = ZlibStream::new(stream.level);
        }
        bits
    }

    /// Compresses `data` on stream `id` and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if zlib rejects the data.
    #[allow(clippy::cast_possible_truncation)] // total_in delta is bounded by data.len()
    pub fn compress(&mut self, id: usize, data: &[u8]) -> Result<Vec<u8>> {
        let stream = &mut self.streams[id];
        stream.used = true;

        // zlib bound for one deflate call plus room for the sync marker
        let mut output = Vec::with_capacity(data.len() + (data.len() + 99) / 100 + 18);
        let start_in = stream.compressor.total_in();

        loop {
            let consumed = (stream.compressor.total_in() - start_in) as usize;
            stream
                .compressor
                .compress_vec(&data[consumed..], &mut output, FlushCompress::Sync)?;

            let consumed = (stream.compressor.total_in() - start_in) as usize;
            if consumed == data.len() && output.len() < output.capacity() {
                break;
            }
            output.reserve(output.capacity().max(64));
        }

        Ok(output)
    }

    /// Writes `data` to `out` using Tight's compressed-data framing.
    ///
    /// Data shorter than [`TIGHT_MIN_TO_COMPRESS`] goes out raw with no
    /// length. Anything longer is compressed on stream `id` and prefixed with
    /// its compact length.
    ///
    /// # Errors
    ///
    /// Returns an error if zlib rejects the data or the compressed payload
    /// does not fit a compact length.
    pub fn write_compressed(&mut self, id: usize, data: &[u8], out: &mut BytesMut) -> Result<()> {
        if data.len() < TIGHT_MIN_TO_COMPRESS {
            out.put_slice(data);
            return Ok(());
        }

        let compressed = self.compress(id, data)?;
        write_compact_length(out, compressed.len())?;
        out.put_slice(&compressed);
        Ok(())
    }
}

/// Write compact length encoding (1-3 bytes).
/// - 0-127: 1 byte (0xxxxxxx)
/// - 128-16383: 2 bytes (1xxxxxxx 0yyyyyyy)
/// - 16384-4194303: 3 bytes (1xxxxxxx 1yyyyyyy zzzzzzzz)
///
/// # Errors
///
/// Returns [`TightError::Encoding`] for lengths above 4194303; nothing is
/// written in that case.
#[allow(clippy::cast_possible_truncation)] // Each byte is masked or shifted into range
pub fn write_compact_length(buf: &mut BytesMut, len: usize) -> Result<()> {
    if len > TIGHT_MAX_COMPACT_LENGTH {
        return Err(TightError::Encoding(format!(
            "length {len} does not fit a compact length"
        )));
    }

    if len < 128 {
        buf.put_u8(len as u8);
    } else if len < 16384 {
        buf.put_u8(((len & 0x7F) | 0x80) as u8);
        buf.put_u8((len >> 7) as u8);
    } else {
        buf.put_u8(((len & 0x7F) | 0x80) as u8);
        buf.put_u8((((len >> 7) & 0x7F) | 0x80) as u8);
        buf.put_u8((len >> 14) as u8);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Decompress, FlushDecompress};

    fn inflate(decompressor: &mut Decompress, data: &[u8], expected: usize) -> Vec<u8> {
        // Room for the trailing sync marker to be consumed too
        let mut out = Vec::with_capacity(expected + 64);
        decompressor
            .decompress_vec(data, &mut out, FlushDecompress::Sync)
            .unwrap();
        out
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| ((i * 37) % 251) as u8).collect()
    }

    #[test]
    fn test_compact_length() {
        let cases: [(usize, &[u8]); 6] = [
            (0, &[0x00]),
            (127, &[0x7F]),
            (128, &[0x80, 0x01]),
            (16383, &[0xFF, 0x7F]),
            (16384, &[0x80, 0x80, 0x01]),
            (4_194_303, &[0xFF, 0xFF, 0xFF]),
        ];
        for (len, expected) in cases {
            let mut buf = BytesMut::new();
            write_compact_length(&mut buf, len).unwrap();
            assert_eq!(&buf[..], expected, "length {len}");
        }
    }

    #[test]
    fn test_compact_length_overflow() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            write_compact_length(&mut buf, 4_194_304),
            Err(TightError::Encoding(_))
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_small_payload_is_raw() {
        let mut streams = CompressionStreamSet::new([6; 4]);
        let mut out = BytesMut::new();
        streams.write_compressed(0, &[1, 2, 3], &mut out).unwrap();
        assert_eq!(&out[..], &[1, 2, 3]);
    }

    #[test]
    fn test_stream_persists_across_rectangles() {
        let data = sample(4000);
        let mut streams = CompressionStreamSet::new([6; 4]);
        let mut decompressor = Decompress::new(true);

        let first = streams.compress(0, &data).unwrap();
        let second = streams.compress(0, &data).unwrap();
        assert!(second.len() < first.len());

        // A fresh stream cannot reuse the dictionary
        let fresh = CompressionStreamSet::new([6; 4]).compress(0, &data).unwrap();
        assert_eq!(fresh.len(), first.len());

        assert_eq!(inflate(&mut decompressor, &first, data.len()), data);
        assert_eq!(inflate(&mut decompressor, &second, data.len()), data);
    }

    #[test]
    fn test_streams_are_independent() {
        let data = sample(2000);
        let mut streams = CompressionStreamSet::new([6; 4]);
        let mono = streams.compress(1, &data).unwrap();
        let indexed = streams.compress(2, &data).unwrap();
        assert_eq!(mono, indexed);
    }

    #[test]
    fn test_level_change_resets_used_stream() {
        let mut streams = CompressionStreamSet::new([1, 1, 1, 1]);
        assert_eq!(streams.set_level(2, 1), 0);
        // Unused stream: no reset needed
        assert_eq!(streams.set_level(2, 9), 0);
        assert_eq!(streams.level(2), 9);

        streams.compress(2, &sample(100)).unwrap();
        assert_eq!(streams.set_level(2, 9), 0);
        assert_eq!(streams.set_level(2, 3), 1 << 2);

        // After the reset the stream behaves like a fresh one
        let data = sample(3000);
        let after_reset = streams.compress(2, &data).unwrap();
        let fresh = CompressionStreamSet::new([3; 4]).compress(2, &data).unwrap();
        assert_eq!(after_reset, fresh);
    }

    #[test]
    fn test_reset_all() {
        let mut streams = CompressionStreamSet::new([6; 4]);
        streams.compress(0, &sample(50)).unwrap();
        streams.compress(3, &sample(50)).unwrap();
        assert_eq!(streams.reset_all(), 0b1001);
        assert_eq!(streams.reset_all(), 0);
    }
}
