use std::io::{self, prelude::*, ErrorKind, SeekFrom};

/// The narrow set of stream operations the decoder needs.
///
/// Anything that is `Read + Seek` (a `File`, a `Cursor` over a buffer, a
/// `&mut File`, ...) gets this for free. Implement it by hand for sources that
/// don't speak `std::io`.
pub trait ByteSource {
    /// Move the cursor to an absolute byte offset.
    fn seek(&mut self, position: u64) -> io::Result<()>;

    /// Current absolute byte offset.
    fn position(&mut self) -> io::Result<u64>;

    /// Read one byte, `None` at end of stream.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Fill `buffer` completely. A short read is an error.
    fn read_block(&mut self, buffer: &mut [u8]) -> io::Result<()>;

    /// Step the cursor back by `count` bytes.
    fn back_up(&mut self, count: u64) -> io::Result<()> {
        let position = self.position()?;
        let target = position.checked_sub(count).ok_or_else(|| {
            io::Error::new(ErrorKind::InvalidInput, "cannot back up before the start of the stream")
        })?;
        self.seek(target)
    }
}

impl<R: Read + Seek> ByteSource for R {
    fn seek(&mut self, position: u64) -> io::Result<()> {
        Seek::seek(self, SeekFrom::Start(position)).map(|_| ())
    }

    fn position(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buffer: [u8; 1] = [0; 1];
        loop {
            match self.read(&mut buffer) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buffer[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn read_block(&mut self, buffer: &mut [u8]) -> io::Result<()> {
        self.read_exact(buffer)
    }
}

/// Byte-level helpers shared by the header, extension and image parsers.
pub(crate) trait ByteSourceExt: ByteSource {
    /// Like `read_byte`, but running out of data is an error.
    fn read_u8(&mut self) -> io::Result<u8> {
        self.read_byte()?
            .ok_or_else(|| io::Error::new(ErrorKind::UnexpectedEof, "stream ended mid-structure"))
    }

    // GIF89a: Unless otherwise stated, multi-byte numeric fields are ordered with the Least
    // Significant Byte first.
    fn read_u16(&mut self) -> io::Result<u16> {
        let mut buffer: [u8; 2] = [0; 2];
        self.read_block(&mut buffer)?;
        Ok(u16::from_le_bytes(buffer))
    }

    /// Read and throw away `count` bytes.
    fn skip(&mut self, count: usize) -> io::Result<()> {
        let mut scratch = [0u8; 255];
        let mut left = count;
        while left > 0 {
            let chunk = left.min(scratch.len());
            self.read_block(&mut scratch[..chunk])?;
            left -= chunk;
        }
        Ok(())
    }

    /// Consume a run of length-prefixed sub-blocks up to and including the
    /// zero-length terminator, handing each payload to `visit`.
    fn for_each_sub_block<F>(&mut self, mut visit: F) -> io::Result<()>
    where
        F: FnMut(&[u8]),
    {
        let mut buffer = [0u8; 255];
        let mut block_size = self.read_u8()?;

        while block_size != 0 {
            let payload = &mut buffer[..block_size as usize];
            self.read_block(payload)?;
            visit(payload);
            block_size = self.read_u8()?;
        }

        Ok(())
    }
}

impl<S: ByteSource + ?Sized> ByteSourceExt for S {}
