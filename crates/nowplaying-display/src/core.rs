/// RenderLoop: fixed-rate frame scheduler.
///
/// Owns the starfield, the title marquee and the frame buffer; nothing else
/// touches them.  Each tick takes one snapshot of the metadata store, lays
/// out the frame from it, advances both animations, and hands the frame to
/// the sink:
///
/// ```text
///   no title:  ┌──────────────┐      title:  ┌──────────────┐
///              │              │              │ - Artist - T │ band_height
///              │   starfield  │              ├──────────────┤
///              │              │              │   starfield  │
///              └──────────────┘              └──────────────┘
/// ```
///
/// Pacing is a plain budget: sleep whatever is left of `1 / fps` after the
/// tick.  Overruns are not paid back, so an overloaded host just renders
/// fewer frames.
use std::sync::Arc;
use std::time::{Duration, Instant};

use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::primitives::Rectangle;
use nowplaying_proto::config::Config;
use nowplaying_proto::state::{MetadataSnapshot, MetadataStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::components::marquee::TitleMarquee;
use crate::components::starfield::Starfield;
use crate::font::{Font, FontMetrics};
use crate::frame::Frame;
use crate::sink::{DisplaySink, SinkError};

const STATS_INTERVAL: Duration = Duration::from_secs(10);

pub struct RenderLoop {
    store: Arc<MetadataStore>,
    starfield: Starfield,
    marquee: TitleMarquee,
    font: Font,
    frame: Frame,
    band_height: u32,
    tick_budget: Duration,
    last_rev: Option<u64>,
}

impl RenderLoop {
    pub fn new(config: &Config, store: Arc<MetadataStore>) -> Self {
        let display = &config.display;
        Self::with_starfield(
            config,
            store,
            Starfield::new(display.width, display.height, &config.stars),
        )
    }

    pub fn with_starfield(config: &Config, store: Arc<MetadataStore>, starfield: Starfield) -> Self {
        let display = &config.display;
        let band_height = config.title.band_height.min(display.height);
        Self {
            store,
            starfield,
            marquee: TitleMarquee::new(config.title.scroll_speed, config.title.dwell()),
            font: Font::load(&config.title.font),
            frame: Frame::new(display.width, display.height),
            band_height,
            tick_budget: display.tick_budget(),
            last_rev: None,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn marquee(&self) -> &TitleMarquee {
        &self.marquee
    }

    pub fn starfield(&self) -> &Starfield {
        &self.starfield
    }

    /// Tick until `cancel` fires or the sink fails.  Cancellation is checked
    /// at the top of every tick and interrupts the sleep; a tick in progress
    /// always completes.
    pub async fn run(
        &mut self,
        sink: &mut dyn DisplaySink,
        cancel: CancellationToken,
    ) -> Result<(), SinkError> {
        info!(
            "render: {}x{} at {:?}/frame, font {}",
            self.frame.width(),
            self.frame.height(),
            self.tick_budget,
            self.font.name()
        );

        let mut stats = TickStats::new(Instant::now());

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let started = Instant::now();
            let snapshot = self.store.snapshot().await;
            self.render(&snapshot, started);
            sink.present(&self.frame)?;

            let elapsed = started.elapsed();
            stats.record(elapsed > self.tick_budget);
            stats.maybe_report(started);

            let remaining = self.tick_budget.saturating_sub(elapsed);
            if remaining.is_zero() {
                continue;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(remaining) => {}
            }
        }

        info!("render: stopped after {} frames", stats.total_frames);
        Ok(())
    }

    /// Compose one frame from `snapshot`.
    pub fn render(&mut self, snapshot: &MetadataSnapshot, now: Instant) {
        if self.last_rev != Some(snapshot.rev) {
            debug!(
                "render: metadata rev {} active={} title={:?}",
                snapshot.rev, snapshot.session_active, snapshot.display_title
            );
            self.last_rev = Some(snapshot.rev);
        }

        let width = self.frame.width();
        let height = self.frame.height();

        let viewport = match snapshot.display_title.as_deref() {
            Some(title) => {
                self.marquee.set_text(width, &self.font, title, now);
                self.marquee.advance(now);
                Rectangle::new(
                    Point::new(0, self.band_height as i32),
                    Size::new(width, height - self.band_height),
                )
            }
            None => {
                self.marquee.clear();
                Rectangle::new(Point::zero(), Size::new(width, height))
            }
        };
        self.starfield.set_viewport(viewport);

        // Frame drawing is infallible
        self.frame.clear();
        self.starfield
            .advance_and_render(&mut self.frame)
            .unwrap_or_else(|never| match never {});
        if snapshot.display_title.is_some() {
            let y = (self.band_height.saturating_sub(self.font.line_height()) / 2) as i32;
            self.marquee
                .draw(&mut self.frame, &self.font, y)
                .unwrap_or_else(|never| match never {});
        }
    }
}

struct TickStats {
    window_start: Instant,
    frames: u64,
    overruns: u64,
    total_frames: u64,
}

impl TickStats {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            overruns: 0,
            total_frames: 0,
        }
    }

    fn record(&mut self, overrun: bool) {
        self.frames += 1;
        self.total_frames += 1;
        if overrun {
            self.overruns += 1;
        }
    }

    fn maybe_report(&mut self, now: Instant) {
        let window = now.saturating_duration_since(self.window_start);
        if window < STATS_INTERVAL {
            return;
        }
        let fps = self.frames as f64 / window.as_secs_f64();
        debug!(
            "render: {:.1} fps, {} of {} ticks over budget",
            fps, self.overruns, self.frames
        );
        self.window_start = now;
        self.frames = 0;
        self.overruns = 0;
    }
}
