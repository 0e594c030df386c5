//! A streaming GIF decoder.
//!
//! The decoder reads from any [`ByteSource`] (every `Read + Seek` type is one)
//! and draws each frame pixel by pixel into a [`PixelSink`]. It keeps no frame
//! buffer of its own: memory use is one row, one palette and one LZW table,
//! all sized by [`DecoderConfig`].
//!
//! ```no_run
//! use std::fs::File;
//! use streamgif::{Canvas, Decoder, FrameStatus};
//!
//! # fn main() -> Result<(), streamgif::DecodeError> {
//! let file = File::open("animation.gif")?;
//! let mut decoder = Decoder::new(file, Canvas::new(512, 512));
//! decoder.start_decoding()?;
//!
//! while let FrameStatus::Frame(info) = decoder.decode_frame()? {
//!     println!("frame at {},{} shown for {}0ms", info.left, info.top, info.delay_time);
//! }
//! # Ok(())
//! # }
//! ```

pub mod parser;
pub mod sink;

#[cfg(test)]
mod test_utils;

pub use parser::{
    ByteSource, DecodeError, Decoder, DecoderConfig, DecoderState, DisposalMethod, FrameInfo,
    FrameStatus, Palette, Rgb, ScreenDescriptor, Version,
};
pub use sink::{Canvas, PixelSink};
