use super::io::ByteSource;

use log::debug;
use std::io;

pub const MAX_COLORS: usize = 256;

// packed field bits shared by the logical screen and image descriptors
pub(crate) const COLOR_TABLE_FLAG: u8 = 0b10000000;
pub(crate) const COLOR_TABLE_SIZE_MASK: u8 = 0b00000111;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// Entry count declared by a packed field, if its color table flag is set.
pub(crate) fn color_table_len(packed_fields: u8) -> Option<usize> {
    if packed_fields & COLOR_TABLE_FLAG != 0 {
        Some(1 << ((packed_fields & COLOR_TABLE_SIZE_MASK) + 1))
    } else {
        None
    }
}

/// The one color table in use.
///
/// Global and local tables are both loaded into the same storage from entry 0
/// up. Nothing is cleared first, so entries above a smaller table keep
/// whatever an earlier, larger table put there, and a local table stays
/// active for the frames that follow it.
#[derive(Debug, Clone)]
pub struct Palette {
    entries: [Rgb; MAX_COLORS],
    // highest entry count ever loaded, everything below it has been written
    populated: usize,
    // entry count of the most recent table
    declared: usize,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl Palette {
    pub fn new() -> Self {
        Self {
            entries: [Rgb::default(); MAX_COLORS],
            populated: 0,
            declared: 0,
        }
    }

    /// Load the table announced by `packed_fields`, if any. Returns the number
    /// of entries read.
    pub(crate) fn load<S>(&mut self, source: &mut S, packed_fields: u8) -> io::Result<usize>
    where
        S: ByteSource + ?Sized,
    {
        let Some(count) = color_table_len(packed_fields) else {
            return Ok(0);
        };

        let mut raw = [0u8; 3 * MAX_COLORS];
        let raw = &mut raw[..3 * count];
        source.read_block(raw)?;

        for (entry, rgb) in self.entries.iter_mut().zip(raw.chunks_exact(3)) {
            *entry = Rgb {
                red: rgb[0],
                green: rgb[1],
                blue: rgb[2],
            };
        }

        self.declared = count;
        self.populated = self.populated.max(count);
        debug!("loaded color table with {} entries", count);

        Ok(count)
    }

    /// Color for `index`, `None` if that entry was never loaded.
    pub fn get(&self, index: u8) -> Option<Rgb> {
        let index = index as usize;
        (index < self.populated).then(|| self.entries[index])
    }

    /// Number of addressable entries.
    pub fn len(&self) -> usize {
        self.populated
    }

    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Entry count of the table loaded last.
    pub fn declared_len(&self) -> usize {
        self.declared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn table_size_comes_from_low_bits() {
        assert_eq!(color_table_len(0b10000000), Some(2));
        assert_eq!(color_table_len(0b10000111), Some(256));
        assert_eq!(color_table_len(0b00000111), None);
    }

    #[test]
    fn absent_table_reads_nothing() {
        let mut palette = Palette::new();
        let mut source = Cursor::new(vec![1u8, 2, 3]);
        assert_eq!(palette.load(&mut source, 0).unwrap(), 0);
        assert_eq!(source.position(), 0);
        assert!(palette.is_empty());
        assert_eq!(palette.get(0), None);
    }

    #[test]
    fn smaller_table_leaves_old_entries_behind() {
        let mut palette = Palette::new();

        // four entries
        let mut source = Cursor::new((0u8..12).collect::<Vec<_>>());
        palette.load(&mut source, 0b10000001).unwrap();
        assert_eq!(palette.len(), 4);

        // two entries overwrite the bottom half only
        let mut source = Cursor::new(vec![0xffu8; 6]);
        palette.load(&mut source, 0b10000000).unwrap();

        assert_eq!(palette.declared_len(), 2);
        assert_eq!(palette.len(), 4);
        assert_eq!(palette.get(1), Some(Rgb { red: 0xff, green: 0xff, blue: 0xff }));
        assert_eq!(palette.get(2), Some(Rgb { red: 6, green: 7, blue: 8 }));
        assert_eq!(palette.get(3), Some(Rgb { red: 9, green: 10, blue: 11 }));
        assert_eq!(palette.get(4), None);
    }

    #[test]
    fn truncated_table_is_an_io_error() {
        let mut palette = Palette::new();
        let mut source = Cursor::new(vec![0u8; 5]);
        assert!(palette.load(&mut source, 0b10000000).is_err());
    }
}
