//! Monochrome frame buffer.
//!
//! Pixels are packed the way SH1106/SSD1306 controllers hold them in GDDRAM:
//! the frame is split into 8-pixel-high pages, each page is `width` bytes,
//! and bit `y % 8` of byte `(y / 8) * width + x` is pixel `(x, y)`.  A sink
//! driving such a controller can ship `pages()` as-is.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Size};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        let pages = height.div_ceil(8);
        Self {
            width,
            height,
            buffer: vec![0; (pages * width) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0);
    }

    /// Out-of-bounds writes are dropped.
    pub fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        let Some((idx, bit)) = self.locate(x, y) else {
            return;
        };
        if on {
            self.buffer[idx] |= bit;
        } else {
            self.buffer[idx] &= !bit;
        }
    }

    /// Out-of-bounds reads are off.
    pub fn pixel(&self, x: i32, y: i32) -> bool {
        self.locate(x, y)
            .map(|(idx, bit)| self.buffer[idx] & bit != 0)
            .unwrap_or(false)
    }

    /// Raw page buffer, `ceil(height / 8) * width` bytes.
    pub fn pages(&self) -> &[u8] {
        &self.buffer
    }

    /// Copy turned half a turn, for panels mounted upside down.
    pub fn rotated_180(&self) -> Frame {
        let mut out = Frame::new(self.width, self.height);
        let (w, h) = (self.width as i32, self.height as i32);
        for (x, y) in self.lit_pixels() {
            out.set_pixel(w - 1 - x, h - 1 - y, true);
        }
        out
    }

    /// Coordinates of every lit pixel, row-major.
    pub fn lit_pixels(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let (w, h) = (self.width as i32, self.height as i32);
        (0..h)
            .flat_map(move |y| (0..w).map(move |x| (x, y)))
            .filter(move |&(x, y)| self.pixel(x, y))
    }

    fn locate(&self, x: i32, y: i32) -> Option<(usize, u8)> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        let idx = (y / 8) * self.width as usize + x;
        Some((idx, 1 << (y % 8)))
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = std::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color.is_on());
        }
        Ok(())
    }
}
