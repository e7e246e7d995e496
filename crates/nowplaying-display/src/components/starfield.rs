//! Starfield: idle animation of stars flying toward the viewer.
//!
//! Every star lives at `(x, y)` on a plane `depth` units away.  Each tick it
//! moves `depth_step` closer and is projected with `k = projection / depth`
//! around the centre of the current viewport.  Stars reaching the viewer
//! respawn on the far plane, so the animation never ends.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, Pixel, Point, Size};
use embedded_graphics::primitives::Rectangle;
use nowplaying_proto::config::StarsConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub x: f32,
    pub y: f32,
    /// Always in `(0, max_depth]` between ticks.
    pub depth: f32,
}

pub struct Starfield {
    stars: Vec<Star>,
    max_depth: f32,
    depth_step: f32,
    spread: i32,
    projection: f32,
    viewport: Rectangle,
    rng: StdRng,
}

impl Starfield {
    /// Full-frame starfield seeded from OS entropy.
    pub fn new(width: u32, height: u32, config: &StarsConfig) -> Self {
        Self::with_rng(width, height, config, StdRng::from_entropy())
    }

    pub fn with_rng(width: u32, height: u32, config: &StarsConfig, mut rng: StdRng) -> Self {
        let max_depth = config.max_depth.max(f32::EPSILON);
        let spread = config.spread.max(1);
        let stars = (0..config.count)
            .map(|_| Star {
                x: rng.gen_range(-spread..spread) as f32,
                y: rng.gen_range(-spread..spread) as f32,
                // max_depth - [0, max_depth) keeps depth strictly positive
                depth: max_depth - rng.gen_range(0.0..max_depth),
            })
            .collect();

        Self {
            stars,
            max_depth,
            depth_step: config.depth_step,
            spread,
            projection: config.projection,
            viewport: Rectangle::new(Point::zero(), Size::new(width, height)),
            rng,
        }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn viewport(&self) -> Rectangle {
        self.viewport
    }

    /// Change the clipping rectangle and projection origin.  Stars keep
    /// their positions.
    pub fn set_viewport(&mut self, viewport: Rectangle) {
        self.viewport = viewport;
    }

    /// One simulation tick, drawn into `target`.
    pub fn advance_and_render<D>(&mut self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let origin = self.origin();
        let viewport = self.viewport;
        let mut pixels = Vec::with_capacity(self.stars.len() * 2);

        for i in 0..self.stars.len() {
            self.stars[i].depth -= self.depth_step;
            if self.stars[i].depth <= 0.0 {
                let fresh = self.respawn();
                self.stars[i] = fresh;
            }

            let star = self.stars[i];
            let k = self.projection / star.depth;
            let point = Point::new(
                (star.x * k + origin.x as f32) as i32,
                (star.y * k + origin.y as f32) as i32,
            );
            if !viewport.contains(point) {
                continue;
            }

            pixels.push(Pixel(point, BinaryColor::On));
            // closer than half the max depth: two pixels wide
            if (1.0 - star.depth / self.max_depth) * 4.0 >= 2.0 {
                let neighbour = point + Point::new(1, 0);
                if viewport.contains(neighbour) {
                    pixels.push(Pixel(neighbour, BinaryColor::On));
                }
            }
        }

        target.draw_iter(pixels)
    }

    fn respawn(&mut self) -> Star {
        Star {
            x: self.rng.gen_range(-self.spread..self.spread) as f32,
            y: self.rng.gen_range(-self.spread..self.spread) as f32,
            depth: self.max_depth,
        }
    }

    fn origin(&self) -> Point {
        let Rectangle { top_left, size } = self.viewport;
        Point::new(
            top_left.x + (size.width / 2) as i32,
            top_left.y + (size.height / 2) as i32,
        )
    }
}
