//! Minimal GIF writer for building decoder fixtures.

use weezl::{encode::Encoder, BitOrder};

/// LSB-first code packer for hand-written LZW streams.
pub(crate) struct CodeWriter {
    bytes: Vec<u8>,
    accumulator: u32,
    bits: u32,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            accumulator: 0,
            bits: 0,
        }
    }

    pub fn push(&mut self, code: u16, width: u32) {
        self.accumulator |= u32::from(code) << self.bits;
        self.bits += width;
        while self.bits >= 8 {
            self.bytes.push(self.accumulator as u8);
            self.accumulator >>= 8;
            self.bits -= 8;
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.bytes.push(self.accumulator as u8);
        }
        self.bytes
    }
}

/// Compress palette indices the way a GIF encoder does.
pub(crate) fn lzw_compress(indices: &[u8], minimum_code_size: u8) -> Vec<u8> {
    let mut encoder = Encoder::new(BitOrder::Lsb, minimum_code_size);
    let mut compressed = Vec::new();
    let result = encoder.into_stream(&mut compressed).encode_all(indices);
    assert!(result.status.is_ok(), "{:?}", result.status);
    compressed
}

/// Frame `data` as length-prefixed sub-blocks plus the zero terminator.
pub(crate) fn sub_blocks(data: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(data.len() + data.len() / 255 + 2);
    for chunk in data.chunks(255) {
        framed.push(chunk.len() as u8);
        framed.extend_from_slice(chunk);
    }
    framed.push(0);
    framed
}

/// Row order of an interlaced image of `height` rows.
pub(crate) fn interlaced_rows(height: usize) -> Vec<usize> {
    [(0, 8), (4, 8), (2, 4), (1, 2)]
        .iter()
        .flat_map(|&(start, step)| (start..height).step_by(step))
        .collect()
}

fn table_bits(table: &[[u8; 3]]) -> u8 {
    assert!(table.len().is_power_of_two() && (2..=256).contains(&table.len()));
    (table.len().trailing_zeros() - 1) as u8
}

fn push_table(bytes: &mut Vec<u8>, table: &[[u8; 3]]) {
    for rgb in table {
        bytes.extend_from_slice(rgb);
    }
}

pub(crate) struct Image<'a> {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    pub local_table: Option<&'a [[u8; 3]]>,
    pub minimum_code_size: u8,
    /// Row-major pixel grid in display order.
    pub pixels: &'a [u8],
}

impl<'a> Image<'a> {
    pub fn new(width: u16, height: u16, pixels: &'a [u8]) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
            interlaced: false,
            local_table: None,
            minimum_code_size: 2,
            pixels,
        }
    }
}

pub(crate) struct GifBuilder {
    bytes: Vec<u8>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16, global_table: Option<&[[u8; 3]]>) -> Self {
        Self::with_signature(b"GIF89a", width, height, global_table)
    }

    pub fn with_signature(
        signature: &[u8; 6],
        width: u16,
        height: u16,
        global_table: Option<&[[u8; 3]]>,
    ) -> Self {
        let mut bytes = signature.to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());

        let packed = match global_table {
            // color resolution 8 bits
            Some(table) => 0b1111_0000 | table_bits(table),
            None => 0,
        };
        bytes.push(packed);
        bytes.push(0); // background
        bytes.push(0); // aspect ratio

        if let Some(table) = global_table {
            push_table(&mut bytes, table);
        }

        Self { bytes }
    }

    pub fn raw(mut self, raw: &[u8]) -> Self {
        self.bytes.extend_from_slice(raw);
        self
    }

    pub fn graphic_control(self, packed: u8, delay: u16, transparent_index: u8) -> Self {
        let [low, high] = delay.to_le_bytes();
        self.raw(&[0x21, 0xf9, 4, packed, low, high, transparent_index, 0])
    }

    pub fn comment(self, text: &[u8]) -> Self {
        let mut raw = vec![0x21, 0xfe];
        raw.extend(sub_blocks(text));
        self.raw(&raw)
    }

    pub fn application(self, identifier: &[u8; 11], data: &[u8]) -> Self {
        let mut raw = vec![0x21, 0xff, 11];
        raw.extend_from_slice(identifier);
        raw.extend(sub_blocks(data));
        self.raw(&raw)
    }

    pub fn plain_text(self, text: &[u8]) -> Self {
        let mut raw = vec![0x21, 0x01, 12];
        raw.extend_from_slice(&[0; 12]);
        raw.extend(sub_blocks(text));
        self.raw(&raw)
    }

    pub fn image(mut self, image: &Image) -> Self {
        assert_eq!(image.pixels.len(), image.width as usize * image.height as usize);

        self.bytes.push(0x2c);
        for field in [image.left, image.top, image.width, image.height] {
            self.bytes.extend_from_slice(&field.to_le_bytes());
        }

        let mut packed = 0;
        if image.interlaced {
            packed |= 0b0100_0000;
        }
        if let Some(table) = image.local_table {
            packed |= 0b1000_0000 | table_bits(table);
        }
        self.bytes.push(packed);

        if let Some(table) = image.local_table {
            push_table(&mut self.bytes, table);
        }

        let width = image.width as usize;
        let stream: Vec<u8> = if image.interlaced {
            interlaced_rows(image.height as usize)
                .into_iter()
                .flat_map(|row| image.pixels[row * width..(row + 1) * width].iter().copied())
                .collect()
        } else {
            image.pixels.to_vec()
        };

        self.bytes.push(image.minimum_code_size);
        self.bytes
            .extend(sub_blocks(&lzw_compress(&stream, image.minimum_code_size)));
        self
    }

    pub fn trailer(self) -> Self {
        self.raw(&[0x3b])
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

#[test]
fn interlaced_row_schedule() {
    assert_eq!(interlaced_rows(10), vec![0, 8, 4, 2, 6, 1, 3, 5, 7, 9]);
    assert_eq!(interlaced_rows(1), vec![0]);
}
