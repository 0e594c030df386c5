use super::io::{ByteSource, ByteSourceExt};
use super::lzw::{LzwDecoder, MAX_CODE_BITS};
use super::palette::{color_table_len, Palette};
use super::{DecodeError, DisposalMethod};
use crate::sink::PixelSink;

use log::{debug, trace, warn};

use std::fmt::Debug;

const SIGNATURE_LENGTH: usize = 6;

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_DESCRIPTOR_LABEL: u8 = 0x2c;
const TRAILER_LABEL: u8 = 0x3b;

// Extension labels
const APPLICATION_EXTENSION: u8 = 0xff;
const COMMENT_EXTENSION: u8 = 0xfe;
const GRAPHIC_CONTROL_EXTENSION: u8 = 0xf9;
const PLAIN_TEXT_EXTENSION: u8 = 0x01;

const GRAPHIC_CONTROL_BLOCK_SIZE: u8 = 4;

const INTERLACE_FLAG: u8 = 0b01000000;
const TRANSPARENT_COLOR_FLAG: u8 = 0b00000001;

// (first row, row step) of each interlace pass
const INTERLACE_PASSES: [(u16, u16); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

#[derive(Debug)]
enum ExtensionType {
    Application,
    Comment,
    GraphicControl,
    PlainText,
}

impl TryFrom<u8> for ExtensionType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ExtensionType::*;

        match value {
            APPLICATION_EXTENSION => Ok(Application),
            COMMENT_EXTENSION => Ok(Comment),
            GRAPHIC_CONTROL_EXTENSION => Ok(GraphicControl),
            PLAIN_TEXT_EXTENSION => Ok(PlainText),

            _ => Err(DecodeError::UnknownExtension(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V87a,
    V89a,
}

impl TryFrom<&[u8]> for Version {
    type Error = DecodeError;

    fn try_from(signature: &[u8]) -> Result<Self, Self::Error> {
        match signature {
            b"GIF87a" => Ok(Version::V87a),
            b"GIF89a" => Ok(Version::V89a),
            _ => Err(DecodeError::NotAGifFile),
        }
    }
}

/// Construction-time limits. Every buffer the decoder owns is sized from these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    pub max_width: u16,
    pub max_height: u16,
    /// Widest LZW code accepted, at most 12.
    pub lzw_max_bits: u8,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_width: 512,
            max_height: 512,
            lzw_max_bits: MAX_CODE_BITS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenDescriptor {
    pub screen_width: u16,
    pub screen_height: u16,
    pub global_color_table_flag: bool,
    pub color_resolution: u8,
    pub sort_flag: bool,
    /// Entry count of the global color table.
    pub global_color_table_size: Option<usize>,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
}

impl ScreenDescriptor {
    fn parse<S: ByteSource + ?Sized>(source: &mut S) -> Result<(Self, u8), DecodeError> {
        let screen_width = source.read_u16()?;
        let screen_height = source.read_u16()?;

        let packed_fields = source.read_u8()?;

        let background_color_index = source.read_u8()?;
        let pixel_aspect_ratio = source.read_u8()?;

        let descriptor = Self {
            screen_width,
            screen_height,
            global_color_table_flag: packed_fields & 0b10000000 != 0,
            color_resolution: ((packed_fields >> 4) & 0b00000111) + 1,
            sort_flag: packed_fields & 0b00001000 != 0,
            global_color_table_size: color_table_len(packed_fields),
            background_color_index,
            pixel_aspect_ratio,
        };

        Ok((descriptor, packed_fields))
    }
}

/// Graphic control extension state. Applies to the next image only, except
/// for the delay which sticks until another extension replaces it.
#[derive(Debug, Clone, Copy, Default)]
struct FrameControl {
    disposal_method: DisposalMethod,
    user_input_flag: bool,
    // hundredths of a second
    delay_time: u16,
    transparent_color_index: Option<u8>,
}

impl FrameControl {
    fn end_frame(&mut self) {
        self.disposal_method = DisposalMethod::Unspecified;
        self.user_input_flag = false;
        self.transparent_color_index = None;
    }
}

#[derive(Debug, Clone, Copy)]
struct ImageDescriptor {
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    interlace_flag: bool,
    packed_fields: u8,
}

impl ImageDescriptor {
    fn parse<S: ByteSource + ?Sized>(source: &mut S) -> Result<Self, DecodeError> {
        let left = source.read_u16()?;
        let top = source.read_u16()?;

        let width = source.read_u16()?;
        let height = source.read_u16()?;

        let packed_fields = source.read_u8()?;

        Ok(Self {
            left,
            top,
            width,
            height,
            interlace_flag: packed_fields & INTERLACE_FLAG != 0,
            packed_fields,
        })
    }
}

/// What a decoded frame looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    pub local_color_table: bool,
    /// Hundredths of a second, never 0.
    pub delay_time: u16,
    pub transparent_color_index: Option<u8>,
    pub disposal_method: DisposalMethod,
    pub user_input_flag: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// One frame was drawn to the sink.
    Frame(FrameInfo),
    /// The pass through the stream ended and the decoder rewound to the first
    /// frame. No pixels were drawn.
    Restarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Uninitialized,
    Started,
    ParsingBlock,
    FrameReady,
    Restarting,
}

#[derive(Debug)]
enum ParserState {
    DetermineNextBlock,
    ProcessExtension(u8),
    ProcessImageDescriptor,

    FrameDone(FrameInfo),
    EndOfPass,
}

/// Streaming GIF decoder.
///
/// Owns one byte source and one pixel sink for its whole life. After
/// [`start_decoding`](Self::start_decoding), every call to
/// [`decode_frame`](Self::decode_frame) draws the next frame straight into the
/// sink. Reaching the end of the stream rewinds to the first frame, so an
/// animation plays forever.
pub struct Decoder<S, P> {
    source: S,
    sink: P,
    config: DecoderConfig,
    state: DecoderState,
    version: Option<Version>,
    screen: Option<ScreenDescriptor>,
    palette: Palette,
    graphic_control: FrameControl,
    key_frame: bool,
    // one row of the widest supported canvas, indexed by absolute x
    row: Box<[u8]>,
    lzw: LzwDecoder,
}

impl<S, P> Debug for Decoder<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("version", &self.version)
            .field("screen", &self.screen)
            .field("graphic_control", &self.graphic_control)
            .field("key_frame", &self.key_frame)
            .finish_non_exhaustive()
    }
}

impl<S: ByteSource, P: PixelSink> Decoder<S, P> {
    pub fn new(source: S, sink: P) -> Self {
        Self::with_config(source, sink, DecoderConfig::default())
    }

    pub fn with_config(source: S, sink: P, config: DecoderConfig) -> Self {
        Self {
            source,
            sink,
            config,
            state: DecoderState::Uninitialized,
            version: None,
            screen: None,
            palette: Palette::new(),
            graphic_control: FrameControl::default(),
            key_frame: true,
            row: vec![0; config.max_width as usize].into_boxed_slice(),
            lzw: LzwDecoder::new(config.lzw_max_bits),
        }
    }

    /// Rewind to the start of the stream and read the header, the logical
    /// screen descriptor and the global color table.
    pub fn start_decoding(&mut self) -> Result<(), DecodeError> {
        self.key_frame = true;
        self.graphic_control.transparent_color_index = None;
        self.source.seek(0)?;

        let mut signature = [0u8; SIGNATURE_LENGTH];
        self.source.read_block(&mut signature)?;
        let version = Version::try_from(&signature[..])?;
        debug!("processed signature, got {:?}", version);

        let (screen, packed_fields) = ScreenDescriptor::parse(&mut self.source)?;
        debug!("processed logical screen descriptor, got: {:#?}", screen);

        if screen.screen_width > self.config.max_width
            || screen.screen_height > self.config.max_height
        {
            return Err(self.unsupported(screen.screen_width.into(), screen.screen_height.into()));
        }

        self.palette.load(&mut self.source, packed_fields)?;

        self.version = Some(version);
        self.screen = Some(screen);
        self.state = DecoderState::Started;
        Ok(())
    }

    /// Decode blocks up to and including the next image and draw it.
    ///
    /// When the stream has no more images the decoder restarts from the top
    /// and returns [`FrameStatus::Restarted`]; the following call yields the
    /// first frame again.
    pub fn decode_frame(&mut self) -> Result<FrameStatus, DecodeError> {
        if self.state == DecoderState::Uninitialized {
            return Err(DecodeError::NotStarted);
        }

        self.state = DecoderState::ParsingBlock;
        let mut state = ParserState::DetermineNextBlock;

        loop {
            trace!("begin parsing state {:?}", state);

            state = match self.process_next_state(state)? {
                ParserState::FrameDone(info) => {
                    self.state = DecoderState::FrameReady;
                    return Ok(FrameStatus::Frame(info));
                }
                ParserState::EndOfPass => break,
                next => next,
            };
        }

        debug!("parsing done, restarting from the first frame");
        if let Err(e) = self.start_decoding() {
            self.state = DecoderState::Uninitialized;
            return Err(e);
        }
        self.state = DecoderState::Restarting;
        Ok(FrameStatus::Restarted)
    }

    fn process_next_state(&mut self, next_state: ParserState) -> Result<ParserState, DecodeError> {
        use ParserState::*;

        match next_state {
            DetermineNextBlock => match self.source.read_byte()? {
                // extension introducer means that a label follows determining what exact type
                // of extension it is.
                Some(EXTENSION_INTRODUCER) => Ok(ProcessExtension(self.source.read_u8()?)),
                Some(IMAGE_DESCRIPTOR_LABEL) => Ok(ProcessImageDescriptor),
                Some(label) => {
                    // leave the byte where it was for whoever reads the stream next
                    self.source.back_up(1)?;
                    if label == TRAILER_LABEL {
                        debug!("reached trailer");
                    } else {
                        warn!("unexpected block label 0x{:02x}, ending pass", label);
                    }
                    Ok(EndOfPass)
                }
                None => {
                    warn!("stream ended without a trailer");
                    Ok(EndOfPass)
                }
            },
            ProcessExtension(label) => {
                self.process_extension(ExtensionType::try_from(label)?)?;
                Ok(DetermineNextBlock)
            }
            ProcessImageDescriptor => Ok(FrameDone(self.process_image()?)),
            FrameDone(_) | EndOfPass => Ok(next_state),
        }
    }

    fn process_extension(&mut self, label: ExtensionType) -> Result<(), DecodeError> {
        use ExtensionType::*;

        debug!("processing extension type: {:?}", label);
        match label {
            Application => {
                let mut identifier = None;
                self.source.for_each_sub_block(|block| {
                    identifier.get_or_insert_with(|| String::from_utf8_lossy(block).into_owned());
                })?;
                debug!("skipped application block {:?}", identifier.unwrap_or_default());
            }
            Comment => {
                // sequence of data sub-blocks
                let mut data = Vec::new();
                self.source
                    .for_each_sub_block(|block| data.extend_from_slice(block))?;
                debug!("processed comment block, got: {}", String::from_utf8_lossy(&data));
            }
            GraphicControl => {
                let block_size = self.source.read_u8()?;
                if block_size != GRAPHIC_CONTROL_BLOCK_SIZE {
                    warn!(
                        "malformed graphic control extension: block size {}, expected {}",
                        block_size, GRAPHIC_CONTROL_BLOCK_SIZE
                    );
                }

                let packed_fields = self.source.read_u8()?;
                // packed fields definition
                // XXXYYYZW
                // XXX = reserved, not needed
                // YYY = disposal method, indicates what to do with graphic after displaying
                // Z = user input flag
                // W = transparent color flag

                let delay_time = self.source.read_u16()?;
                let transparent_color_index = self.source.read_u8()?;

                // block terminator
                self.source.read_u8()?;

                self.graphic_control = FrameControl {
                    disposal_method: DisposalMethod::from_u8((packed_fields >> 2) & 0b00000111),
                    user_input_flag: packed_fields & 0b00000010 != 0,
                    delay_time,
                    transparent_color_index: (packed_fields & TRANSPARENT_COLOR_FLAG != 0)
                        .then_some(transparent_color_index),
                };

                debug!("processed GraphicControlExtension: {:#?}", self.graphic_control);
            }
            PlainText => {
                let block_size = self.source.read_u8()?;
                self.source.skip(block_size.into())?;
                self.source.for_each_sub_block(|_| {})?;
            }
        }

        Ok(())
    }

    fn process_image(&mut self) -> Result<FrameInfo, DecodeError> {
        let descriptor = ImageDescriptor::parse(&mut self.source)?;
        debug!("processed image descriptor, got: {:?}", descriptor);

        let right = u32::from(descriptor.left) + u32::from(descriptor.width);
        let bottom = u32::from(descriptor.top) + u32::from(descriptor.height);
        if right > u32::from(self.config.max_width) || bottom > u32::from(self.config.max_height) {
            return Err(self.unsupported(right, bottom));
        }

        let local_color_table = self.palette.load(&mut self.source, descriptor.packed_fields)? > 0;

        let key_frame = std::mem::replace(&mut self.key_frame, false);

        let minimum_code_size = self.source.read_u8()?;

        // Find where the image data ends before decoding it. The LZW decoder
        // may stop short of the terminator, decoding resumes from here anyway.
        let data_start = self.source.position()?;
        let data_end = self.skip_sub_blocks()?;
        self.source.seek(data_start)?;
        trace!("image data spans {}..{}", data_start, data_end);

        self.lzw.init(minimum_code_size)?;

        // Make sure there is at least some delay between frames
        if self.graphic_control.delay_time < 1 {
            self.graphic_control.delay_time = 1;
        }

        let info = FrameInfo {
            left: descriptor.left,
            top: descriptor.top,
            width: descriptor.width,
            height: descriptor.height,
            interlaced: descriptor.interlace_flag,
            local_color_table,
            delay_time: self.graphic_control.delay_time,
            transparent_color_index: self.graphic_control.transparent_color_index,
            disposal_method: self.graphic_control.disposal_method,
            user_input_flag: self.graphic_control.user_input_flag,
        };

        if key_frame {
            self.sink.clear_screen();
        }
        self.sink.start_drawing();
        for row in row_order(descriptor.height, descriptor.interlace_flag) {
            self.emit_row(&descriptor, descriptor.top + row)?;
        }
        self.sink.update_screen();

        self.source.seek(data_end)?;

        // graphic control extension is for a single frame
        self.graphic_control.end_frame();

        Ok(info)
    }

    /// Decode one row of `descriptor` and draw it at canvas row `line`.
    fn emit_row(&mut self, descriptor: &ImageDescriptor, line: u16) -> Result<(), DecodeError> {
        let left = descriptor.left as usize;
        let row = &mut self.row[left..left + descriptor.width as usize];
        let decoded = self.lzw.decode_row(&mut self.source, row)?;
        if decoded < row.len() {
            trace!("row {} cut short at {} of {} pixels", line, decoded, row.len());
        }

        let transparent = self.graphic_control.transparent_color_index;
        for (offset, &index) in self.row[left..left + decoded].iter().enumerate() {
            if Some(index) == transparent {
                continue;
            }

            let color = self.palette.get(index).ok_or(DecodeError::InvalidColorIndex {
                index,
                palette_len: self.palette.len(),
            })?;
            self.sink.draw_pixel(
                descriptor.left + offset as u16,
                line,
                color.red,
                color.green,
                color.blue,
            );
        }

        Ok(())
    }

    /// Seek over a run of sub-blocks without reading them. Returns the
    /// position just past the terminator.
    fn skip_sub_blocks(&mut self) -> Result<u64, DecodeError> {
        loop {
            let block_size = self.source.read_u8()?;
            if block_size == 0 {
                break;
            }
            let position = self.source.position()?;
            self.source.seek(position + u64::from(block_size))?;
        }

        Ok(self.source.position()?)
    }

    fn unsupported(&self, width: u32, height: u32) -> DecodeError {
        DecodeError::UnsupportedGeometry {
            width,
            height,
            max_width: self.config.max_width,
            max_height: self.config.max_height,
        }
    }
}

impl<S, P> Decoder<S, P> {
    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn version(&self) -> Option<Version> {
        self.version
    }

    pub fn screen(&self) -> Option<&ScreenDescriptor> {
        self.screen.as_ref()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// True until the first image after a (re)start has been parsed.
    pub fn is_key_frame(&self) -> bool {
        self.key_frame
    }

    /// Delay of the most recent frame in hundredths of a second.
    pub fn frame_delay(&self) -> u16 {
        self.graphic_control.delay_time
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }

    pub fn into_inner(self) -> (S, P) {
        (self.source, self.sink)
    }
}

/// Image rows, relative to the image top, in the order they are stored.
fn row_order(height: u16, interlaced: bool) -> impl Iterator<Item = u16> {
    let passes: &'static [(u16, u16)] = if interlaced {
        &INTERLACE_PASSES
    } else {
        &[(0, 1)]
    };

    passes
        .iter()
        .flat_map(move |&(start, step)| (start..height).step_by(step as usize))
}
