//! Built-in mono fonts and the width measurements the title layout needs.

use embedded_graphics::mono_font::{ascii, MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, Point};
use embedded_graphics::text::{Baseline, Text};
use embedded_graphics::Drawable;
use tracing::{debug, warn};

pub const DEFAULT_FONT: &str = "6x10";

fn builtin(name: &str) -> Option<(&'static str, &'static MonoFont<'static>)> {
    let found: (&'static str, &'static MonoFont<'static>) = match name {
        "5x8" => ("5x8", &ascii::FONT_5X8),
        "6x10" => ("6x10", &ascii::FONT_6X10),
        "6x13" => ("6x13", &ascii::FONT_6X13),
        "7x13" => ("7x13", &ascii::FONT_7X13),
        "8x13" => ("8x13", &ascii::FONT_8X13),
        "9x15" => ("9x15", &ascii::FONT_9X15),
        "10x20" => ("10x20", &ascii::FONT_10X20),
        _ => return None,
    };
    Some(found)
}

/// Pixel measurements of rendered text.
pub trait FontMetrics {
    fn text_width(&self, text: &str) -> u32;
    fn line_height(&self) -> u32;
}

/// A named built-in font.
#[derive(Clone, Copy)]
pub struct Font {
    name: &'static str,
    font: &'static MonoFont<'static>,
}

impl Font {
    /// Look up a font by name, falling back to [`DEFAULT_FONT`] for unknown
    /// names.  Never fails.
    pub fn load(name: &str) -> Self {
        if let Some((name, font)) = builtin(&name.trim().to_ascii_lowercase()) {
            debug!("font: using {}", name);
            return Self { name, font };
        }
        warn!("font: unknown font {:?}, falling back to {}", name, DEFAULT_FONT);
        Self::default()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn draw<D>(&self, target: &mut D, text: &str, x: i32, y: i32) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let style = MonoTextStyle::new(self.font, BinaryColor::On);
        Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(target)?;
        Ok(())
    }
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: DEFAULT_FONT,
            font: &ascii::FONT_6X10,
        }
    }
}

impl FontMetrics for Font {
    fn text_width(&self, text: &str) -> u32 {
        // one glyph cell per char; non-ascii chars render as the replacement glyph
        let advance = self.font.character_size.width + self.font.character_spacing;
        text.chars().count() as u32 * advance
    }

    fn line_height(&self) -> u32 {
        self.font.character_size.height
    }
}
