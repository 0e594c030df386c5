use super::bit_reader::BitReader;
use super::io::ByteSource;
use super::DecodeError;

use log::trace;

/// Widest code the GIF format allows.
pub const MAX_CODE_BITS: u8 = 12;

const NO_PREFIX: u16 = u16::MAX;

#[derive(Debug, Clone, Copy)]
struct Entry {
    prefix: u16,
    suffix: u8,
    // first index of the run this code expands to
    first: u8,
}

/// Fixed-capacity code table addressed by code value.
struct CodeTable {
    entries: Box<[Entry]>,
    population: usize,
}

impl CodeTable {
    fn new(max_bits: u8) -> Self {
        let empty = Entry {
            prefix: NO_PREFIX,
            suffix: 0,
            first: 0,
        };
        Self {
            entries: vec![empty; 1 << max_bits].into_boxed_slice(),
            population: 0,
        }
    }

    /// Literal codes, then the clear and end codes.
    fn reset(&mut self, minimum_code_size: u8) {
        let literals = 1usize << minimum_code_size;
        for (code, entry) in self.entries[..literals].iter_mut().enumerate() {
            *entry = Entry {
                prefix: NO_PREFIX,
                suffix: code as u8,
                first: code as u8,
            };
        }
        self.population = literals + 2;
    }

    fn is_full(&self) -> bool {
        self.population == self.entries.len()
    }

    fn push(&mut self, prefix: u16, suffix: u8) {
        let first = self.entries[prefix as usize].first;
        self.entries[self.population] = Entry { prefix, suffix, first };
        self.population += 1;
    }

    /// Push the run for `code` onto `stack` back to front, so popping yields
    /// it in order.
    fn expand(&self, code: u16, stack: &mut Vec<u8>) {
        let mut code = code;
        loop {
            let entry = self.entries[code as usize];
            stack.push(entry.suffix);
            if entry.prefix == NO_PREFIX {
                break;
            }
            code = entry.prefix;
        }
    }
}

/// Streaming GIF LZW decoder.
///
/// One decoder is reused for every image of a session. `init` is called with
/// the image's minimum code size, then `decode_row` is called once per row and
/// pulls just enough compressed data to fill it. Runs that straddle a row
/// boundary are kept on an internal stack until the next call.
pub(crate) struct LzwDecoder {
    reader: BitReader,
    table: CodeTable,
    // indices decoded but not yet handed out, last index on the bottom
    stack: Vec<u8>,
    max_bits: u8,
    minimum_code_size: u8,
    code_size: u8,
    clear_code: u16,
    end_code: u16,
    previous: Option<u16>,
    finished: bool,
}

impl LzwDecoder {
    pub fn new(max_bits: u8) -> Self {
        let max_bits = max_bits.clamp(1, MAX_CODE_BITS);
        Self {
            reader: BitReader::new(),
            table: CodeTable::new(max_bits),
            stack: Vec::with_capacity(1 << max_bits),
            max_bits,
            minimum_code_size: 0,
            code_size: 0,
            clear_code: 0,
            end_code: 0,
            previous: None,
            finished: true,
        }
    }

    /// Prepare for a new image whose data starts at the source's current
    /// position.
    pub fn init(&mut self, minimum_code_size: u8) -> Result<(), DecodeError> {
        if minimum_code_size == 0 || minimum_code_size > 8 || minimum_code_size >= self.max_bits {
            return Err(DecodeError::InvalidCodeSize(minimum_code_size));
        }

        self.minimum_code_size = minimum_code_size;
        self.clear_code = 1 << minimum_code_size;
        self.end_code = self.clear_code + 1;
        self.reader.reset();
        self.stack.clear();
        self.finished = false;
        self.clear();

        trace!(
            "lzw init: min code size {}, clear {}, end {}",
            minimum_code_size,
            self.clear_code,
            self.end_code
        );
        Ok(())
    }

    fn clear(&mut self) {
        self.table.reset(self.minimum_code_size);
        self.code_size = self.minimum_code_size + 1;
        self.previous = None;
    }

    pub fn code_size(&self) -> u8 {
        self.code_size
    }

    pub fn population(&self) -> usize {
        self.table.population
    }

    /// Set once the end code or the end of the sub-block run was reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fill `row` with decoded indices. Returns how many were written, which is
    /// less than `row.len()` only when the image data ran out.
    pub fn decode_row<S>(&mut self, source: &mut S, row: &mut [u8]) -> Result<usize, DecodeError>
    where
        S: ByteSource + ?Sized,
    {
        let mut written = 0;

        while written < row.len() {
            if let Some(index) = self.stack.pop() {
                row[written] = index;
                written += 1;
                continue;
            }

            if self.finished || !self.decode_code(source)? {
                break;
            }
        }

        Ok(written)
    }

    /// Read one code and push its run onto the stack. Returns false once
    /// there is nothing more to decode.
    fn decode_code<S>(&mut self, source: &mut S) -> Result<bool, DecodeError>
    where
        S: ByteSource + ?Sized,
    {
        let Some(code) = self.reader.next(source, self.code_size.into())? else {
            trace!("lzw data ran out before the end code");
            self.finished = true;
            return Ok(false);
        };

        if code == self.clear_code {
            self.clear();
            return Ok(true);
        }

        if code == self.end_code {
            self.finished = true;
            return Ok(false);
        }

        let population = self.table.population;
        let Some(previous) = self.previous else {
            // first code after a clear has to be a literal
            if code >= self.clear_code {
                return Err(DecodeError::InvalidCode { code, population });
            }
            self.table.expand(code, &mut self.stack);
            self.previous = Some(code);
            return Ok(true);
        };

        let first = if (code as usize) < population {
            self.table.expand(code, &mut self.stack);
            self.table.entries[code as usize].first
        } else if code as usize == population && !self.table.is_full() {
            // the code being defined right now: previous run plus its own first index
            let first = self.table.entries[previous as usize].first;
            self.stack.push(first);
            self.table.expand(previous, &mut self.stack);
            first
        } else {
            return Err(DecodeError::InvalidCode { code, population });
        };

        if !self.table.is_full() {
            self.table.push(previous, first);
            if self.table.population == 1 << self.code_size && self.code_size < self.max_bits {
                self.code_size += 1;
            }
        }

        self.previous = Some(code);
        Ok(true)
    }
}
