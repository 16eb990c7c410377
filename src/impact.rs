//! Crash impacts: debris shards and dust clouds
//!
//! When a headline line "lands" the page throws a ring of debris out of its
//! center together with a slow dust cloud. The motion constants are tuned
//! per reference frame (1/60 s); [`ImpactLayer::advance`] rescales them to
//! the real frame time.

use std::f64::consts::TAU;

use image::Rgba;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color::with_alpha;
use crate::surface::{BlendMode, ColorStop, DrawSurface, Rect};
use crate::theme::Theme;

/// Reference frames per second the impact constants are expressed in
pub const REFERENCE_FPS: f64 = 60.0;

pub const DEFAULT_DEBRIS: usize = 32;
pub const DEFAULT_DUST: usize = 12;

const DEBRIS_GRAVITY: f64 = 0.25;
const DEBRIS_FADE: f64 = 0.018;
const DUST_FADE: f64 = 0.012;
const DUST_GROWTH: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebrisShape {
    Round,
    Square,
}

/// One debris shard
#[derive(Debug, Clone, PartialEq)]
pub struct Debris {
    pub x: f64,
    pub y: f64,
    /// Velocity in px per reference frame
    pub vx: f64,
    pub vy: f64,
    /// Degrees
    pub rotation: f64,
    /// Degrees per reference frame
    pub rot_speed: f64,
    pub size: f64,
    pub color: Rgba<u8>,
    pub shape: DebrisShape,
    pub opacity: f64,
}

impl Debris {
    /// Shard `index` of `count`, spread evenly around the full circle.
    pub fn spawn<R: Rng + ?Sized>(
        rng: &mut R,
        theme: &Theme,
        x: f64,
        y: f64,
        index: usize,
        count: usize,
    ) -> Self {
        let normalized = if count == 0 { 0.0 } else { index as f64 / count as f64 };
        let angle = TAU * normalized + (rng.random::<f64>() * 0.4 - 0.2);
        let velocity = 2.5 + rng.random::<f64>() * 4.5;
        let size = 3.0 + rng.random::<f64>() * 7.0;
        let color = if rng.random::<f64>() > 0.4 { theme.gold } else { theme.red };
        let shape =
            if rng.random::<f64>() > 0.5 { DebrisShape::Round } else { DebrisShape::Square };
        Self {
            x,
            y,
            vx: angle.cos() * velocity,
            vy: angle.sin() * velocity,
            rotation: rng.random::<f64>() * 360.0,
            rot_speed: (rng.random::<f64>() - 0.5) * 20.0,
            size,
            color,
            shape,
            opacity: 1.0,
        }
    }

    /// Advance by `frames` reference frames; returns `false` once invisible.
    pub fn advance(&mut self, frames: f64) -> bool {
        self.x += self.vx * frames;
        self.y += self.vy * frames;
        self.vy += DEBRIS_GRAVITY * frames;
        self.rotation += self.rot_speed * frames;
        self.opacity -= DEBRIS_FADE * frames;
        self.opacity > 0.0
    }
}

/// One dust puff
#[derive(Debug, Clone, PartialEq)]
pub struct Dust {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub size: f64,
    pub scale: f64,
    pub opacity: f64,
}

impl Dust {
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, x: f64, y: f64) -> Self {
        let angle = rng.random::<f64>() * TAU;
        let velocity = 0.5 + rng.random::<f64>() * 1.5;
        Self {
            x,
            y,
            vx: angle.cos() * velocity,
            vy: angle.sin() * velocity,
            size: 20.0 + rng.random::<f64>() * 40.0,
            scale: 0.5,
            opacity: 0.6,
        }
    }

    pub fn advance(&mut self, frames: f64) -> bool {
        self.x += self.vx * frames;
        self.y += self.vy * frames;
        self.opacity -= DUST_FADE * frames;
        self.scale += DUST_GROWTH * frames;
        self.opacity > 0.0
    }
}

/// A queued impact, as configured in `[[impacts]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactSpec {
    /// Delay after the field first runs, in milliseconds
    pub delay_ms: u64,
    /// Anchor as fractions of the surface width and height
    pub at: [f64; 2],
    #[serde(default = "default_debris")]
    pub debris: usize,
    #[serde(default = "default_dust")]
    pub dust: usize,
}

fn default_debris() -> usize {
    DEFAULT_DEBRIS
}

fn default_dust() -> usize {
    DEFAULT_DUST
}

#[derive(Debug, Clone, PartialEq)]
struct Pending {
    due: f64,
    spec: ImpactSpec,
}

/// Live debris and dust plus impacts waiting for their time
#[derive(Debug, Clone, Default)]
pub struct ImpactLayer {
    pending: Vec<Pending>,
    debris: Vec<Debris>,
    dust: Vec<Dust>,
}

impl ImpactLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debris(&self) -> &[Debris] {
        &self.debris
    }

    pub fn dust(&self) -> &[Dust] {
        &self.dust
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.debris.is_empty() && self.dust.is_empty()
    }

    /// Queue `spec` to fire at field time `now + delay`.
    pub fn schedule(&mut self, now: f64, spec: ImpactSpec) {
        let due = now + spec.delay_ms as f64 / 1000.0;
        self.pending.push(Pending { due, spec });
    }

    /// Fire an impact at (x, y) immediately.
    pub fn trigger<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        theme: &Theme,
        x: f64,
        y: f64,
        debris: usize,
        dust: usize,
    ) {
        log::debug!("impact at ({:.1}, {:.1}): {} debris, {} dust", x, y, debris, dust);
        self.debris.extend((0..debris).map(|i| Debris::spawn(rng, theme, x, y, i, debris)));
        self.dust.extend((0..dust).map(|_| Dust::spawn(rng, x, y)));
    }

    /// Fire due impacts (anchored on a `width x height` surface) and advance
    /// everything alive by `dt` seconds.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        theme: &Theme,
        now: f64,
        dt: f64,
        width: f64,
        height: f64,
    ) {
        let (due, waiting): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|p| p.due <= now);
        self.pending = waiting;
        for Pending { spec, .. } in due {
            let (x, y) = (spec.at[0] * width, spec.at[1] * height);
            self.trigger(rng, theme, x, y, spec.debris, spec.dust);
        }

        let frames = dt * REFERENCE_FPS;
        self.debris.retain_mut(|d| d.advance(frames));
        self.dust.retain_mut(|d| d.advance(frames));
    }

    /// Draw debris, then dust, over whatever is already on the surface.
    pub fn render<S: DrawSurface>(&self, surface: &mut S, theme: &Theme) {
        for d in &self.debris {
            surface.save();
            surface.translate(d.x, d.y);
            surface.rotate(d.rotation.to_radians());
            surface.set_alpha(d.opacity.clamp(0.0, 1.0));

            // Glow first so the shard stays crisp on top of it
            surface.set_blend(BlendMode::Lighter);
            surface.fill_radial(
                d.size * 2.0,
                &[
                    ColorStop::new(0.0, with_alpha(d.color, 120)),
                    ColorStop::new(1.0, with_alpha(d.color, 0)),
                ],
            );
            surface.set_blend(BlendMode::SourceOver);

            match d.shape {
                DebrisShape::Round => surface.fill_circle(d.size / 2.0, d.color),
                DebrisShape::Square => {
                    surface.fill_round_rect(Rect::centered(d.size, d.size), 0.0, d.color)
                }
            }
            surface.restore();
        }

        for d in &self.dust {
            surface.save();
            surface.translate(d.x, d.y);
            surface.set_alpha(d.opacity.clamp(0.0, 1.0));
            let radius = d.size * d.scale / 2.0;
            // Transparent from 70% of the radius outward
            let cloud = with_alpha(theme.gold, 77);
            surface.fill_radial(
                radius,
                &[
                    ColorStop::new(0.0, cloud),
                    ColorStop::new(0.7, with_alpha(theme.gold, 0)),
                    ColorStop::new(1.0, with_alpha(theme.gold, 0)),
                ],
            );
            surface.restore();
        }
    }
}
