//! Reference Tight decoder for round-trip tests.
//!
//! Mirrors what a VNC client does: four persistent zlib streams reset on
//! request by the control byte, TPIXEL expansion for 8-8-8 formats, and
//! palette/bitmap decoding. JPEG rectangles are decoded to RGB.

#![allow(dead_code)]

use flate2::{Decompress, FlushDecompress};
use rfb_tight::translate::{pixel_from_rgb, rgb_from_buffer};
use rfb_tight::{FramebufferSource, ImageSource, PixelFormat, Rect};

/// Subencoding found in a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Fill,
    FullColor,
    Mono,
    Indexed,
    Jpeg,
}

/// A decoded rectangle.
#[derive(Debug)]
pub struct Decoded {
    pub kind: Kind,
    /// Control byte as received, including reset bits.
    pub control: u8,
    /// Pixels as 8-bit RGB triplets.
    pub rgb: Vec<u8>,
    /// Bytes of input consumed.
    pub consumed: usize,
    /// Length of the compressed payload, if the data went through zlib.
    pub compressed_len: Option<usize>,
}

/// Decoder state for one session.
pub struct TightDecoder {
    streams: [Option<Decompress>; 4],
}

impl Default for TightDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TightDecoder {
    pub fn new() -> Self {
        Self {
            streams: [None, None, None, None],
        }
    }

    pub fn decode(&mut self, data: &[u8], width: u16, height: u16, format: &PixelFormat) -> Decoded {
        let count = usize::from(width) * usize::from(height);
        let control = data[0];
        let mut offset = 1;

        for id in 0..4 {
            if control & (1 << id) != 0 {
                self.streams[id] = None;
            }
        }

        let bpp = format.bytes_per_pixel();
        let tpixel = if format.is_888() { 3 } else { bpp };

        match control >> 4 {
            0x08 => {
                let color = tpixel_rgb(&data[offset..offset + tpixel], format);
                offset += tpixel;
                Decoded {
                    kind: Kind::Fill,
                    control,
                    rgb: color.repeat(count),
                    consumed: offset,
                    compressed_len: None,
                }
            }
            0x09 => {
                let (len, used) = read_compact_len(&data[offset..]);
                offset += used;
                let jpeg = &data[offset..offset + len];
                let mut decoder = jpeg_decoder::Decoder::new(jpeg);
                let pixels = decoder.decode().expect("valid JPEG");
                let info = decoder.info().expect("JPEG info");
                assert_eq!((info.width, info.height), (width, height));
                let rgb = match info.pixel_format {
                    jpeg_decoder::PixelFormat::L8 => pixels.iter().flat_map(|&l| [l, l, l]).collect(),
                    jpeg_decoder::PixelFormat::RGB24 => pixels,
                    other => panic!("unexpected JPEG pixel format {other:?}"),
                };
                Decoded {
                    kind: Kind::Jpeg,
                    control,
                    rgb,
                    consumed: offset + len,
                    compressed_len: None,
                }
            }
            basic if basic < 0x08 => {
                let stream_id = usize::from(basic & 0x03);
                let explicit_filter = basic & 0x04 != 0;

                if !explicit_filter {
                    let (raw, used, compressed_len) = self.read_data(&data[offset..], count * tpixel, stream_id);
                    let rgb = raw.chunks_exact(tpixel).flat_map(|p| tpixel_rgb(p, format)).collect();
                    return Decoded {
                        kind: Kind::FullColor,
                        control,
                        rgb,
                        consumed: offset + used,
                        compressed_len,
                    };
                }

                assert_eq!(data[offset], 0x01, "only the palette filter is expected");
                let size = usize::from(data[offset + 1]) + 1;
                offset += 2;
                let palette: Vec<[u8; 3]> = data[offset..offset + size * tpixel]
                    .chunks_exact(tpixel)
                    .map(|p| tpixel_rgb(p, format))
                    .collect();
                offset += size * tpixel;

                let (w, h) = (usize::from(width), usize::from(height));
                if size == 2 {
                    let row_bytes = (w + 7) / 8;
                    let (bits, used, compressed_len) = self.read_data(&data[offset..], row_bytes * h, stream_id);
                    let mut rgb = Vec::with_capacity(count * 3);
                    for y in 0..h {
                        for x in 0..w {
                            let bit = (bits[y * row_bytes + x / 8] >> (7 - x % 8)) & 1;
                            rgb.extend_from_slice(&palette[usize::from(bit)]);
                        }
                    }
                    Decoded {
                        kind: Kind::Mono,
                        control,
                        rgb,
                        consumed: offset + used,
                        compressed_len,
                    }
                } else {
                    let (indices, used, compressed_len) = self.read_data(&data[offset..], count, stream_id);
                    let rgb = indices.iter().flat_map(|&i| palette[usize::from(i)]).collect();
                    Decoded {
                        kind: Kind::Indexed,
                        control,
                        rgb,
                        consumed: offset + used,
                        compressed_len,
                    }
                }
            }
            other => panic!("unsupported Tight compression type {other:#x}"),
        }
    }

    /// Reads `expected` bytes of raw or compressed data. Returns the data,
    /// the input consumed and the compressed payload length.
    fn read_data(&mut self, data: &[u8], expected: usize, stream_id: usize) -> (Vec<u8>, usize, Option<usize>) {
        if expected < 12 {
            return (data[..expected].to_vec(), expected, None);
        }

        let (len, used) = read_compact_len(data);
        let compressed = &data[used..used + len];
        let decompressor = self.streams[stream_id].get_or_insert_with(|| Decompress::new(true));

        // Spare room lets inflate also consume the trailing sync marker
        let mut output = Vec::with_capacity(expected + 64);
        let before = decompressor.total_in();
        decompressor
            .decompress_vec(compressed, &mut output, FlushDecompress::Sync)
            .expect("zlib data");
        assert_eq!((decompressor.total_in() - before) as usize, len, "whole payload consumed");
        assert_eq!(output.len(), expected);
        (output, used + len, Some(len))
    }
}

pub fn read_compact_len(data: &[u8]) -> (usize, usize) {
    let b0 = usize::from(data[0]);
    if b0 & 0x80 == 0 {
        return (b0, 1);
    }
    let b1 = usize::from(data[1]);
    if b1 & 0x80 == 0 {
        return ((b0 & 0x7F) | (b1 << 7), 2);
    }
    let b2 = usize::from(data[2]);
    ((b0 & 0x7F) | ((b1 & 0x7F) << 7) | (b2 << 14), 3)
}

fn tpixel_rgb(pixel: &[u8], format: &PixelFormat) -> [u8; 3] {
    if format.is_888() {
        // TPIXELs are R, G, B regardless of the pixel layout
        [pixel[0], pixel[1], pixel[2]]
    } else {
        rgb_from_buffer(pixel, format)
    }
}

/// RGB triplets of `rect` as the client should see it.
pub fn expected_rgb(source: &FramebufferSource, rect: &Rect) -> Vec<u8> {
    let format = source.client_format();
    let bpp = format.bytes_per_pixel();
    let mut image = vec![0u8; rect.area() * bpp];
    source.get_image(&mut image, rect);
    image.chunks_exact(bpp).flat_map(|p| rgb_from_buffer(p, format)).collect()
}

/// Builds a framebuffer from a per-pixel RGB function, stored in `server`
/// and delivered in `client`.
pub fn framebuffer(
    width: u16,
    height: u16,
    server: PixelFormat,
    client: PixelFormat,
    rgb: impl Fn(u16, u16) -> [u8; 3],
) -> FramebufferSource {
    let bpp = server.bytes_per_pixel();
    let mut data = vec![0u8; usize::from(width) * usize::from(height) * bpp];
    for y in 0..height {
        for x in 0..width {
            let [r, g, b] = rgb(x, y);
            let offset = (usize::from(y) * usize::from(width) + usize::from(x)) * bpp;
            let value = pixel_from_rgb(r, g, b, &server);
            server.buffer_from_pixel(value, &mut data[offset..offset + bpp]);
        }
    }
    FramebufferSource::new(data, width, height, server, client)
}

/// Deterministic pseudo-random bytes.
pub fn noise(seed: u32) -> impl FnMut() -> u8 {
    let mut state = seed;
    move || {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
        (state >> 16) as u8
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
