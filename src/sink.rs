use crate::parser::Rgb;

/// Where decoded pixels go.
///
/// `draw_pixel` is called once per visible pixel, in scan order, with
/// absolute canvas coordinates. Transparent pixels are never drawn, so
/// whatever the sink already holds at that spot stays.
pub trait PixelSink {
    fn draw_pixel(&mut self, x: u16, y: u16, red: u8, green: u8, blue: u8);

    /// Called before the first pixel of every frame.
    fn start_drawing(&mut self) {}

    /// Called after the last pixel of every frame.
    fn update_screen(&mut self) {}

    /// Called once before the first frame after a (re)start.
    fn clear_screen(&mut self) {}
}

impl<F> PixelSink for F
where
    F: FnMut(u16, u16, u8, u8, u8),
{
    fn draw_pixel(&mut self, x: u16, y: u16, red: u8, green: u8, blue: u8) {
        self(x, y, red, green, blue)
    }
}

/// An RGB framebuffer the size of the logical screen.
///
/// Pixels outside the buffer are dropped.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u16,
    height: u16,
    background: Rgb,
    pixels: Vec<Rgb>,
    frames: usize,
}

impl Canvas {
    pub fn new(width: u16, height: u16) -> Self {
        Self::with_background(width, height, Rgb::default())
    }

    pub fn with_background(width: u16, height: u16, background: Rgb) -> Self {
        Self {
            width,
            height,
            background,
            pixels: vec![background; width as usize * height as usize],
            frames: 0,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Row-major pixels.
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb> {
        if x < self.width && y < self.height {
            Some(self.pixels[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }

    /// Number of frames completed so far.
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl PixelSink for Canvas {
    fn draw_pixel(&mut self, x: u16, y: u16, red: u8, green: u8, blue: u8) {
        if x < self.width && y < self.height {
            self.pixels[y as usize * self.width as usize + x as usize] = Rgb { red, green, blue };
        }
    }

    fn update_screen(&mut self) {
        self.frames += 1;
    }

    fn clear_screen(&mut self) {
        let background = self.background;
        self.pixels.iter_mut().for_each(|pixel| *pixel = background);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_ignores_out_of_bounds_pixels() {
        let mut canvas = Canvas::new(2, 2);
        canvas.draw_pixel(1, 1, 1, 2, 3);
        canvas.draw_pixel(2, 0, 9, 9, 9);

        assert_eq!(canvas.pixel(1, 1), Some(Rgb { red: 1, green: 2, blue: 3 }));
        assert_eq!(canvas.pixel(2, 0), None);
        assert_eq!(canvas.pixels().iter().filter(|&&p| p == Rgb::default()).count(), 3);
    }

    #[test]
    fn clear_restores_background() {
        let white = Rgb { red: 255, green: 255, blue: 255 };
        let mut canvas = Canvas::with_background(1, 1, white);
        canvas.draw_pixel(0, 0, 0, 0, 0);
        canvas.clear_screen();
        assert_eq!(canvas.pixel(0, 0), Some(white));
    }

    #[test]
    fn closures_are_sinks() {
        let mut drawn = Vec::new();
        {
            let mut sink = |x: u16, y: u16, r: u8, g: u8, b: u8| drawn.push((x, y, r, g, b));
            sink.draw_pixel(3, 4, 5, 6, 7);
            sink.update_screen();
        }
        assert_eq!(drawn, vec![(3, 4, 5, 6, 7)]);
    }
}
