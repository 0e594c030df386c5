mod bit_reader;
mod decoder;
mod io;
mod lzw;
mod palette;

pub use decoder::{
    Decoder, DecoderConfig, DecoderState, FrameInfo, FrameStatus, ScreenDescriptor, Version,
};
pub use io::ByteSource;
pub use lzw::MAX_CODE_BITS;
pub use palette::{Palette, Rgb, MAX_COLORS};

use thiserror::Error;

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisposalMethod {
    #[default]
    Unspecified = 0,
    DoNotDispose = 1,
    RestoreToBackgroundColor = 2,
    RestoreToPrevious = 3,
}

impl DisposalMethod {
    /// Values 4-7 are reserved and read as unspecified.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => DisposalMethod::DoNotDispose,
            2 => DisposalMethod::RestoreToBackgroundColor,
            3 => DisposalMethod::RestoreToPrevious,
            _ => DisposalMethod::Unspecified,
        }
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("not a gif file, signature is neither GIF87a nor GIF89a")]
    NotAGifFile,

    #[error("encountered extension with label 0x{0:02x}, this label is not supported")]
    UnknownExtension(u8),

    #[error("i/o error while decoding: {0}")]
    Io(#[from] std::io::Error),

    #[error("{width}x{height} does not fit the configured maximum of {max_width}x{max_height}")]
    UnsupportedGeometry {
        width: u32,
        height: u32,
        max_width: u16,
        max_height: u16,
    },

    #[error("minimum lzw code size {0} is not supported")]
    InvalidCodeSize(u8),

    #[error("lzw code {code} is not in the dictionary (next free code is {population})")]
    InvalidCode { code: u16, population: usize },

    #[error("color index {index} is outside the active palette of {palette_len} entries")]
    InvalidColorIndex { index: u8, palette_len: usize },

    #[error("decode_frame called before start_decoding succeeded")]
    NotStarted,
}
