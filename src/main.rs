use std::fs::{self, File};
use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use log::info;

mod ppm_writer;

use streamgif::{Canvas, Decoder, DecoderConfig, FrameStatus};

const USAGE: &str = "usage: streamgif <input.gif> [output-dir] [frame-count]";

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        bail!(USAGE);
    };
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".into()));
    // by default stop when the animation loops
    let frame_limit = match args.next() {
        Some(count) => Some(count.parse::<usize>().with_context(|| USAGE)?),
        None => None,
    };

    let file = File::open(&input).with_context(|| format!("opening {}", input))?;
    fs::create_dir_all(&output_dir)?;

    let config = DecoderConfig {
        max_width: u16::MAX,
        max_height: u16::MAX,
        ..DecoderConfig::default()
    };

    // the canvas is sized once the header is known
    let mut decoder = Decoder::with_config(file, Canvas::new(0, 0), config);
    decoder.start_decoding()?;
    let screen = *decoder.screen().context("missing logical screen descriptor")?;
    let (file, _) = decoder.into_inner();

    let canvas = Canvas::new(screen.screen_width, screen.screen_height);
    let mut decoder = Decoder::with_config(file, canvas, config);
    decoder.start_decoding()?;

    let mut written = 0;
    while frame_limit.map_or(true, |limit| written < limit) {
        match decoder.decode_frame()? {
            FrameStatus::Frame(frame) => {
                let path = output_dir.join(format!("frame_{}.ppm", written));
                ppm_writer::write_ppm(&path, decoder.sink())?;
                info!(
                    "wrote {} ({}x{} at {},{}, delay {}0ms)",
                    path.display(),
                    frame.width,
                    frame.height,
                    frame.left,
                    frame.top,
                    frame.delay_time
                );
                written += 1;
            }
            FrameStatus::Restarted if frame_limit.is_none() => break,
            FrameStatus::Restarted => {
                if written == 0 {
                    bail!("{} contains no images", input);
                }
            }
        }
    }

    println!("wrote {} frames to {}", written, output_dir.display());
    Ok(())
}
