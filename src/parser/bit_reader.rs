use super::io::ByteSource;
use super::io::ByteSourceExt;

use std::io;

const MAX_SUB_BLOCK: usize = 255;

/// Reads LSB-first variable width codes out of a run of length-prefixed
/// sub-blocks, pulling one sub-block at a time from the byte source.
pub(crate) struct BitReader {
    block: [u8; MAX_SUB_BLOCK],
    // index into `block` of the next unread byte
    position: usize,
    length: usize,
    accumulator: u32,
    bits: u32,
    exhausted: bool,
}

impl BitReader {
    pub fn new() -> Self {
        Self {
            block: [0; MAX_SUB_BLOCK],
            position: 0,
            length: 0,
            accumulator: 0,
            bits: 0,
            exhausted: false,
        }
    }

    /// Forget any buffered bits, ready for the sub-blocks of a new image.
    pub fn reset(&mut self) {
        self.position = 0;
        self.length = 0;
        self.accumulator = 0;
        self.bits = 0;
        self.exhausted = false;
    }

    /// Whether the zero-length terminator sub-block has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Next `count`-bit code, or `None` once the sub-block run is used up.
    pub fn next<S>(&mut self, source: &mut S, count: u32) -> io::Result<Option<u16>>
    where
        S: ByteSource + ?Sized,
    {
        while self.bits < count {
            match self.next_byte(source)? {
                Some(byte) => {
                    self.accumulator |= u32::from(byte) << self.bits;
                    self.bits += 8;
                }
                None => return Ok(None),
            }
        }

        let value = self.accumulator & ((1 << count) - 1);
        self.accumulator >>= count;
        self.bits -= count;
        Ok(Some(value as u16))
    }

    fn next_byte<S>(&mut self, source: &mut S) -> io::Result<Option<u8>>
    where
        S: ByteSource + ?Sized,
    {
        if self.position == self.length {
            if self.exhausted {
                return Ok(None);
            }

            let block_size = source.read_u8()? as usize;
            if block_size == 0 {
                self.exhausted = true;
                return Ok(None);
            }

            source.read_block(&mut self.block[..block_size])?;
            self.position = 0;
            self.length = block_size;
        }

        let byte = self.block[self.position];
        self.position += 1;
        Ok(Some(byte))
    }
}
