//! TitleMarquee: the "now playing" line in the title band.
//!
//! Short titles are centred, flanked with dashes when there is room
//! (`- Title -`).  Titles wider than the band scroll right-to-left: the text
//! is padded with a gap, drawn twice back to back, and pauses for the dwell
//! duration before every pass.
//!
//! ```text
//!   set_text(new) ─► Centered                (no timer)
//!               └──► Scrolling/Dwelling ─dwell elapsed─► Scrolling/Active
//!                          ▲                                   │
//!                          └──────── offset ≥ text width ──────┘
//! ```

use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;

use crate::font::{Font, FontMetrics};

/// Appended to scrolling text so the wrap has visible space.
const SCROLL_GAP: &str = "   ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    Centered,
    Scrolling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPhase {
    /// Pinned at offset 0 until the dwell timer runs out.
    Dwelling,
    Active,
}

pub struct TitleMarquee {
    /// Pixels per tick.
    speed: f32,
    dwell: Duration,
    source_text: Option<String>,
    render_text: String,
    render_width: u32,
    width_limit: u32,
    mode: ScrollMode,
    offset: f32,
    phase: ScrollPhase,
    dwell_started_at: Instant,
}

impl TitleMarquee {
    pub fn new(speed: f32, dwell: Duration) -> Self {
        Self {
            speed,
            dwell,
            source_text: None,
            render_text: String::new(),
            render_width: 0,
            width_limit: 0,
            mode: ScrollMode::Centered,
            offset: 0.0,
            phase: ScrollPhase::Dwelling,
            dwell_started_at: Instant::now(),
        }
    }

    pub fn source_text(&self) -> Option<&str> {
        self.source_text.as_deref()
    }

    pub fn render_text(&self) -> &str {
        &self.render_text
    }

    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Assign the text to show.  Re-assigning the current text is a no-op so
    /// repeated bus pushes do not restart the animation.
    pub fn set_text(
        &mut self,
        width_limit: u32,
        metrics: &impl FontMetrics,
        text: &str,
        now: Instant,
    ) {
        if self.source_text.as_deref() == Some(text) {
            return;
        }

        self.source_text = Some(text.to_string());
        self.width_limit = width_limit;
        self.offset = 0.0;
        self.phase = ScrollPhase::Dwelling;
        self.dwell_started_at = now;

        let flanked = format!("- {} -", text);
        let flanked_width = metrics.text_width(&flanked);
        let plain_width = metrics.text_width(text);

        if flanked_width <= width_limit {
            self.render_text = flanked;
            self.render_width = flanked_width;
            self.mode = ScrollMode::Centered;
        } else if plain_width <= width_limit {
            self.render_text = text.to_string();
            self.render_width = plain_width;
            self.mode = ScrollMode::Centered;
        } else {
            self.render_text = format!("{}{}", text, SCROLL_GAP);
            self.render_width = metrics.text_width(&self.render_text);
            self.mode = ScrollMode::Scrolling;
        }
    }

    /// Forget the source text while keeping the rest of the state, so the
    /// next `set_text` counts as a change even for the same string.
    pub fn clear(&mut self) {
        self.source_text = None;
    }

    /// One animation tick.
    pub fn advance(&mut self, now: Instant) {
        if self.mode == ScrollMode::Centered {
            return;
        }

        match self.phase {
            ScrollPhase::Dwelling => {
                if now.saturating_duration_since(self.dwell_started_at) >= self.dwell {
                    self.phase = ScrollPhase::Active;
                }
            }
            ScrollPhase::Active => {
                self.offset += self.speed;
                if self.offset >= self.render_width as f32 {
                    self.offset = 0.0;
                    self.phase = ScrollPhase::Dwelling;
                    self.dwell_started_at = now;
                }
            }
        }
    }

    /// Draw into the row starting at `y`.
    pub fn draw<D>(&self, target: &mut D, font: &Font, y: i32) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        if self.render_text.is_empty() {
            return Ok(());
        }

        match self.mode {
            ScrollMode::Centered => {
                let x = (self.width_limit as i32 - self.render_width as i32) / 2;
                font.draw(target, &self.render_text, x, y)
            }
            ScrollMode::Scrolling => {
                let x = -(self.offset as i32);
                font.draw(target, &self.render_text, x, y)?;
                font.draw(target, &self.render_text, x + self.render_width as i32, y)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    /// Every char is 4px wide except in the override table.
    struct FixedMetrics;

    impl FontMetrics for FixedMetrics {
        fn text_width(&self, text: &str) -> u32 {
            match text {
                "- Yesterday -" => 58,
                _ => text.chars().count() as u32 * 4,
            }
        }

        fn line_height(&self) -> u32 {
            8
        }
    }

    const DWELL: Duration = Duration::from_secs(2);

    fn marquee() -> TitleMarquee {
        TitleMarquee::new(2.0, DWELL)
    }

    #[test]
    fn test_short_title_is_flanked() {
        let mut m = marquee();
        m.set_text(60, &FixedMetrics, "Yesterday", Instant::now());
        assert_eq!(m.mode(), ScrollMode::Centered);
        assert_eq!(m.render_text(), "- Yesterday -");
    }

    #[test]
    fn test_medium_title_drops_flanks() {
        let mut m = marquee();
        // plain: 13 * 4 = 52, flanked: 17 * 4 = 68
        m.set_text(60, &FixedMetrics, "Hey Jude Live", Instant::now());
        assert_eq!(m.mode(), ScrollMode::Centered);
        assert_eq!(m.render_text(), "Hey Jude Live");
    }

    #[test]
    fn test_centered_ignores_time() {
        let mut m = marquee();
        let t0 = Instant::now();
        m.set_text(60, &FixedMetrics, "Yesterday", t0);
        m.advance(t0 + Duration::from_secs(60));
        assert_eq!(m.offset(), 0.0);
        assert_eq!(m.phase(), ScrollPhase::Dwelling);
    }

    #[test]
    fn test_long_title_scroll_cycle() {
        let mut m = marquee();
        let t0 = Instant::now();
        m.set_text(60, &FixedMetrics, "A Very Long Song Title Indeed", t0);
        assert_eq!(m.mode(), ScrollMode::Scrolling);
        assert_eq!(m.render_text(), "A Very Long Song Title Indeed   ");
        // (29 + 3) * 4
        let width = 128.0;

        // still dwelling just before the timer
        m.advance(t0 + Duration::from_millis(1999));
        assert_eq!(m.phase(), ScrollPhase::Dwelling);
        assert_eq!(m.offset(), 0.0);

        let t1 = t0 + DWELL;
        m.advance(t1);
        assert_eq!(m.phase(), ScrollPhase::Active);
        assert_eq!(m.offset(), 0.0);

        m.advance(t1);
        assert_eq!(m.offset(), 2.0);
        m.advance(t1);
        assert_eq!(m.offset(), 4.0);

        // run to the wrap point
        let mut ticks = 2;
        while m.phase() == ScrollPhase::Active {
            m.advance(t1 + Duration::from_secs(1));
            ticks += 1;
            assert!(ticks <= 64, "never wrapped");
        }
        assert_eq!(ticks as f32, width / 2.0);
        assert_eq!(m.offset(), 0.0);
        assert_eq!(m.phase(), ScrollPhase::Dwelling);

        // dwell timer restarted at the wrap
        m.advance(t1 + Duration::from_secs(2));
        assert_eq!(m.phase(), ScrollPhase::Dwelling);
        m.advance(t1 + Duration::from_secs(3));
        assert_eq!(m.phase(), ScrollPhase::Active);
    }

    #[test]
    fn test_same_text_is_noop() {
        let mut m = marquee();
        let t0 = Instant::now();
        let text = "A Very Long Song Title Indeed";
        m.set_text(60, &FixedMetrics, text, t0);
        m.advance(t0 + DWELL);
        m.advance(t0 + DWELL);
        let (offset, phase, mode) = (m.offset(), m.phase(), m.mode());

        m.set_text(60, &FixedMetrics, text, t0 + Duration::from_secs(10));
        assert_eq!(m.offset(), offset);
        assert_eq!(m.phase(), phase);
        assert_eq!(m.mode(), mode);
    }

    #[test]
    fn test_new_text_resets() {
        let mut m = marquee();
        let t0 = Instant::now();
        m.set_text(60, &FixedMetrics, "A Very Long Song Title Indeed", t0);
        m.advance(t0 + DWELL);
        m.advance(t0 + DWELL);
        assert!(m.offset() > 0.0);

        m.set_text(60, &FixedMetrics, "Another Very Long Title Here", t0 + DWELL);
        assert_eq!(m.offset(), 0.0);
        assert_eq!(m.phase(), ScrollPhase::Dwelling);
    }

    #[test]
    fn test_clear_then_same_text_resets() {
        let mut m = marquee();
        let t0 = Instant::now();
        let text = "A Very Long Song Title Indeed";
        m.set_text(60, &FixedMetrics, text, t0);
        m.advance(t0 + DWELL);
        m.advance(t0 + DWELL);
        assert_eq!(m.phase(), ScrollPhase::Active);

        m.clear();
        assert_eq!(m.source_text(), None);
        // frozen, not reset
        assert_eq!(m.phase(), ScrollPhase::Active);

        let t2 = t0 + Duration::from_secs(30);
        m.set_text(60, &FixedMetrics, text, t2);
        assert_eq!(m.offset(), 0.0);
        assert_eq!(m.phase(), ScrollPhase::Dwelling);
        m.advance(t2 + Duration::from_secs(1));
        assert_eq!(m.phase(), ScrollPhase::Dwelling);
    }

    #[test]
    fn test_draw_centered_and_tiled() {
        let font = Font::load("6x10");
        let mut frame = Frame::new(128, 16);

        let mut m = marquee();
        m.set_text(128, &font, "Hi", Instant::now());
        m.draw(&mut frame, &font, 0).unwrap();
        // "- Hi -" is 36px wide -> starts at x = 46
        let xs: Vec<i32> = frame.lit_pixels().map(|(x, _)| x).collect();
        assert!(xs.iter().all(|&x| (46..82).contains(&x)));

        let mut frame = Frame::new(128, 16);
        let long = "Godspeed You! Black Emperor - Storm";
        m.set_text(128, &font, long, Instant::now());
        assert_eq!(m.mode(), ScrollMode::Scrolling);
        m.draw(&mut frame, &font, 0).unwrap();
        // the text overflows the band, so the right edge is lit
        assert!(frame.lit_pixels().any(|(x, _)| x >= 120));
    }
}
