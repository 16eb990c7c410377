//! Frame rendering
//!
//! Draw order is fixed: fries, then sparks, then fumes, then impact debris
//! and dust. Sparks and fumes use additive blending so overlapping glints
//! brighten instead of stacking.

use image::Rgba;

use crate::color::with_alpha;
use crate::particle::Particle;
use crate::sim::Simulation;
use crate::sprites::Sprite;
use crate::surface::{BlendMode, ColorStop, DrawSurface, Rect};
use crate::theme::Theme;

/// Vector fry body size at scale 1.0
const FRY_WIDTH: f64 = 6.0;
const FRY_HEIGHT: f64 = 28.0;
const FRY_RADIUS: f64 = 2.0;

/// Draw one full frame of `sim` onto `surface`.
pub fn render_frame<S: DrawSurface>(
    surface: &mut S,
    sim: &Simulation,
    sprites: &[Sprite<S::Image>],
) {
    surface.clear();
    let theme = sim.theme();

    for p in sim.particles() {
        surface.save();
        surface.translate(p.x, p.y);
        surface.rotate(p.rotation);
        surface.set_alpha(p.alpha);
        match p.sprite.and_then(|id| sprites.get(id.0)) {
            Some(sprite) => draw_sprite(surface, sprite, p.scale),
            None => draw_fry(surface, theme, p),
        }
        surface.restore();
    }

    if !sim.sparks().is_empty() {
        let stops = spark_stops(theme);
        with_blend(surface, BlendMode::Lighter, |surface| {
            for s in sim.sparks() {
                surface.save();
                surface.set_alpha(s.alpha);
                surface.translate(s.x, s.y);
                surface.fill_radial(s.size, &stops);
                surface.restore();
            }
        });
    }

    if !sim.fumes().is_empty() {
        let stops = fume_stops(theme);
        with_blend(surface, BlendMode::Lighter, |surface| {
            for f in sim.fumes() {
                surface.save();
                surface.set_alpha(f.alpha * 0.8);
                surface.translate(f.x, f.y);
                surface.fill_radial(f.size, &stops);
                surface.restore();
            }
        });
    }

    sim.impacts().render(surface, theme);
}

/// Run `draw` with `mode` active, then put the previous mode back.
fn with_blend<S, F>(surface: &mut S, mode: BlendMode, draw: F)
where
    S: DrawSurface,
    F: FnOnce(&mut S),
{
    let previous = surface.blend();
    surface.set_blend(mode);
    draw(surface);
    surface.set_blend(previous);
}

fn draw_sprite<S: DrawSurface>(surface: &mut S, sprite: &Sprite<S::Image>, scale: f64) {
    let (w, h) = sprite.draw_size(scale);
    surface.draw_image(&sprite.image, Rect::centered(w, h));
}

/// A golden stick with a red tip
fn draw_fry<S: DrawSurface>(surface: &mut S, theme: &Theme, p: &Particle) {
    let body = Rect::centered(FRY_WIDTH * p.scale, FRY_HEIGHT * p.scale);
    let radius = FRY_RADIUS * p.scale;
    surface.fill_round_rect(body, radius, theme.gold);

    let tip_height = (4.0 * p.scale).min(body.height * 0.2);
    surface.fill_round_rect(Rect::new(body.x, body.y, body.width, tip_height), radius, theme.red);
}

fn spark_stops(theme: &Theme) -> [ColorStop; 3] {
    [
        ColorStop::new(0.0, Rgba([255, 255, 255, 230])),
        ColorStop::new(0.5, with_alpha(theme.gold, 0xcc)),
        ColorStop::new(1.0, with_alpha(theme.gold, 0)),
    ]
}

fn fume_stops(theme: &Theme) -> [ColorStop; 3] {
    [
        ColorStop::new(0.0, with_alpha(theme.white, 89)),
        ColorStop::new(0.7, with_alpha(theme.white, 31)),
        ColorStop::new(1.0, with_alpha(theme.white, 0)),
    ]
}
