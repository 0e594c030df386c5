use std::io::{prelude::*, BufWriter};
use std::fs::File;
use std::path::Path;
use anyhow::Result;

use streamgif::Canvas;

const MAGIC_NUMBER: &[u8] = b"P3";

pub fn write_ppm(filename: &Path, canvas: &Canvas) -> Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(&file);
    write_canvas(&mut writer, canvas)?;
    writer.flush()?;
    Ok(())
}

fn write_canvas<W: Write>(writer: &mut W, canvas: &Canvas) -> Result<()> {
    let width = canvas.width() as usize;

    writer.write_all(MAGIC_NUMBER)?;
    writer.write_all(b"\n")?;
    writer.write_all(format!("{} {}", canvas.width(), canvas.height()).as_bytes())?;
    writer.write_all(b" 255")?;
    writer.write_all(b"\n")?;

    if width == 0 {
        return Ok(());
    }

    for row in canvas.pixels().chunks(width) {
        let line: Vec<String> = row
            .iter()
            .map(|pixel| format!("{: >3} {: >3} {: >3}", pixel.red, pixel.green, pixel.blue))
            .collect();
        writer.write_all(line.join(" ").as_bytes())?;
        writer.write_all(b"\n")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_canvas;
    use streamgif::{Canvas, PixelSink};

    #[test]
    fn writes_plain_ppm() {
        let mut canvas = Canvas::new(2, 1);
        canvas.draw_pixel(1, 0, 255, 16, 7);

        let mut out = Vec::new();
        write_canvas(&mut out, &canvas).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "P3\n2 1 255\n  0   0   0 255  16   7\n");
    }
}
