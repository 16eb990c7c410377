//! Software [`DrawSurface`] over an RGBA image buffer
//!
//! Used by the CLI and by tests to render the field headlessly. Shapes are
//! rasterized by sampling each device pixel center inside the shape's
//! transformed bounding box, so there is no anti-aliasing; this is a preview
//! renderer, not a canvas replacement.

use image::{Rgba, RgbaImage};

use crate::surface::{gradient_at, BlendMode, ColorStop, DrawSurface, Rect};

/// 2D affine transform in canvas order: `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Affine {
    fn scale(s: f64) -> Self {
        Self { a: s, b: 0.0, c: 0.0, d: s, e: 0.0, f: 0.0 }
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    fn translated(&self, x: f64, y: f64) -> Self {
        let (e, f) = self.apply(x, y);
        Self { e, f, ..*self }
    }

    fn rotated(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            a: self.a * cos + self.c * sin,
            b: self.b * cos + self.d * sin,
            c: self.c * cos - self.a * sin,
            d: self.d * cos - self.b * sin,
            ..*self
        }
    }

    fn inverse(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-12 {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Self { a, b, c, d, e: -(a * self.e + c * self.f), f: -(b * self.e + d * self.f) })
    }
}

#[derive(Debug, Clone, Copy)]
struct State {
    transform: Affine,
    alpha: f64,
    blend: BlendMode,
}

/// Headless drawing surface
pub struct RasterSurface {
    image: RgbaImage,
    dpr: f64,
    state: State,
    stack: Vec<State>,
}

impl RasterSurface {
    /// Create a surface for a `width x height` CSS-pixel area.
    pub fn new(width: f64, height: f64, dpr: f64) -> Self {
        let mut surface = Self {
            image: RgbaImage::new(1, 1),
            dpr: 1.0,
            state: State {
                transform: Affine::scale(1.0),
                alpha: 1.0,
                blend: BlendMode::SourceOver,
            },
            stack: Vec::new(),
        };
        surface.resize(width, height, dpr);
        surface
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.dpr
    }

    /// Number of saved states not yet restored
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Visit every device pixel whose center maps (through the inverse
    /// transform) into the local-space `bounds` and let `shade` pick a color.
    fn fill_with<F>(&mut self, bounds: Rect, mut shade: F)
    where
        F: FnMut(f64, f64) -> Option<Rgba<u8>>,
    {
        let Some(inverse) = self.state.transform.inverse() else {
            return;
        };
        if self.state.alpha <= 0.0 {
            return;
        }

        let corners = [
            self.state.transform.apply(bounds.x, bounds.y),
            self.state.transform.apply(bounds.x + bounds.width, bounds.y),
            self.state.transform.apply(bounds.x, bounds.y + bounds.height),
            self.state.transform.apply(bounds.x + bounds.width, bounds.y + bounds.height),
        ];
        let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min).floor().max(0.0);
        let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min).floor().max(0.0);
        let max_x = corners
            .iter()
            .map(|c| c.0)
            .fold(f64::NEG_INFINITY, f64::max)
            .ceil()
            .min(self.image.width() as f64);
        let max_y = corners
            .iter()
            .map(|c| c.1)
            .fold(f64::NEG_INFINITY, f64::max)
            .ceil()
            .min(self.image.height() as f64);
        if min_x >= max_x || min_y >= max_y {
            return;
        }

        let (alpha, blend) = (self.state.alpha, self.state.blend);
        for py in min_y as u32..max_y as u32 {
            for px in min_x as u32..max_x as u32 {
                let (lx, ly) = inverse.apply(px as f64 + 0.5, py as f64 + 0.5);
                if let Some(src) = shade(lx, ly) {
                    let dst = self.image.get_pixel_mut(px, py);
                    *dst = composite(*dst, src, alpha, blend);
                }
            }
        }
    }
}

impl DrawSurface for RasterSurface {
    type Image = RgbaImage;

    fn resize(&mut self, width: f64, height: f64, dpr: f64) {
        let w = ((width * dpr).floor() as u32).max(1);
        let h = ((height * dpr).floor() as u32).max(1);
        self.image = RgbaImage::new(w, h);
        self.dpr = dpr;
        self.state =
            State { transform: Affine::scale(dpr), alpha: 1.0, blend: BlendMode::SourceOver };
        self.stack.clear();
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.state.transform = self.state.transform.translated(x, y);
    }

    fn rotate(&mut self, angle: f64) {
        self.state.transform = self.state.transform.rotated(angle);
    }

    fn set_alpha(&mut self, alpha: f64) {
        // Canvas ignores out-of-range globalAlpha rather than clamping it
        if (0.0..=1.0).contains(&alpha) {
            self.state.alpha = alpha;
        }
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.state.blend = mode;
    }

    fn blend(&self) -> BlendMode {
        self.state.blend
    }

    fn fill_round_rect(&mut self, rect: Rect, radius: f64, color: Rgba<u8>) {
        let r = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
        let (x0, y0) = (rect.x + r, rect.y + r);
        let (x1, y1) = (rect.x + rect.width - r, rect.y + rect.height - r);
        self.fill_with(rect, |x, y| {
            let dx = (x0 - x).max(x - x1).max(0.0);
            let dy = (y0 - y).max(y - y1).max(0.0);
            let inside_box = x >= rect.x
                && x <= rect.x + rect.width
                && y >= rect.y
                && y <= rect.y + rect.height;
            (inside_box && dx * dx + dy * dy <= r * r).then_some(color)
        });
    }

    fn fill_circle(&mut self, radius: f64, color: Rgba<u8>) {
        let bounds = Rect::new(-radius, -radius, radius * 2.0, radius * 2.0);
        self.fill_with(bounds, |x, y| (x * x + y * y <= radius * radius).then_some(color));
    }

    fn fill_radial(&mut self, radius: f64, stops: &[ColorStop]) {
        if radius <= 0.0 {
            return;
        }
        let bounds = Rect::new(-radius, -radius, radius * 2.0, radius * 2.0);
        self.fill_with(bounds, |x, y| {
            let dist = (x * x + y * y).sqrt();
            (dist <= radius).then(|| gradient_at(stops, dist / radius))
        });
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect) {
        if dest.width <= 0.0 || dest.height <= 0.0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        let (iw, ih) = (image.width() as f64, image.height() as f64);
        self.fill_with(dest, |x, y| {
            let u = (x - dest.x) / dest.width;
            let v = (y - dest.y) / dest.height;
            if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                return None;
            }
            Some(*image.get_pixel((u * iw) as u32, (v * ih) as u32))
        });
    }
}

/// Composite `src` (scaled by `alpha`) onto `dst`.
fn composite(dst: Rgba<u8>, src: Rgba<u8>, alpha: f64, mode: BlendMode) -> Rgba<u8> {
    let sa = src[3] as f64 / 255.0 * alpha;
    if sa <= 0.0 {
        return dst;
    }
    let da = dst[3] as f64 / 255.0;

    let (out_a, channel): (f64, Box<dyn Fn(u8, u8) -> f64>) = match mode {
        BlendMode::SourceOver => {
            let out_a = sa + da * (1.0 - sa);
            (out_a, Box::new(move |s, d| s as f64 * sa + d as f64 * da * (1.0 - sa)))
        }
        // Premultiplied sum, as canvas "lighter" does
        BlendMode::Lighter => {
            let out_a = (sa + da).min(1.0);
            (out_a, Box::new(move |s, d| (s as f64 * sa + d as f64 * da).min(255.0)))
        }
    };
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let unpremultiply = |s: u8, d: u8| (channel(s, d) / out_a).round().clamp(0.0, 255.0) as u8;
    Rgba([
        unpremultiply(src[0], dst[0]),
        unpremultiply(src[1], dst[1]),
        unpremultiply(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn test_resize_applies_dpr() {
        let surface = RasterSurface::new(100.5, 40.0, 2.0);
        assert_eq!(surface.image().dimensions(), (201, 80));
        assert_eq!(surface.device_pixel_ratio(), 2.0);
    }

    #[test]
    fn test_fill_round_rect_covers_center_not_corner() {
        let mut surface = RasterSurface::new(20.0, 20.0, 1.0);
        surface.fill_round_rect(Rect::new(2.0, 2.0, 16.0, 16.0), 6.0, RED);
        assert_eq!(*surface.image().get_pixel(10, 10), RED);
        assert_eq!(surface.image().get_pixel(2, 2)[3], 0, "rounded corner stays empty");
        assert_eq!(surface.image().get_pixel(0, 10)[3], 0);
    }

    #[test]
    fn test_translate_and_rotate() {
        let mut surface = RasterSurface::new(40.0, 40.0, 1.0);
        surface.save();
        surface.translate(20.0, 20.0);
        surface.rotate(FRAC_PI_2);
        // A wide flat bar becomes tall after a quarter turn
        surface.fill_round_rect(Rect::centered(30.0, 4.0), 0.0, RED);
        surface.restore();

        assert_eq!(surface.image().get_pixel(20, 6)[3], 255);
        assert_eq!(surface.image().get_pixel(6, 20)[3], 0);
        assert_eq!(surface.depth(), 0);
    }

    #[test]
    fn test_alpha_and_restore() {
        let mut surface = RasterSurface::new(4.0, 4.0, 1.0);
        surface.save();
        surface.set_alpha(0.5);
        surface.set_alpha(7.0); // ignored
        surface.translate(2.0, 2.0);
        surface.fill_circle(3.0, RED);
        surface.restore();
        assert_eq!(surface.image().get_pixel(2, 2)[3], 128);

        // restore brought the alpha back to 1.0
        surface.translate(2.0, 2.0);
        surface.fill_circle(3.0, RED);
        assert_eq!(surface.image().get_pixel(2, 2)[3], 255);
    }

    #[test]
    fn test_lighter_blend_adds() {
        let mut surface = RasterSurface::new(4.0, 4.0, 1.0);
        surface.translate(2.0, 2.0);
        surface.fill_circle(3.0, Rgba([100, 0, 0, 255]));
        surface.set_blend(BlendMode::Lighter);
        surface.fill_circle(3.0, Rgba([100, 50, 0, 255]));
        surface.fill_circle(3.0, Rgba([100, 50, 0, 255]));
        assert_eq!(*surface.image().get_pixel(2, 2), Rgba([255, 100, 0, 255]));
    }

    #[test]
    fn test_fill_radial_fades_outward() {
        let mut surface = RasterSurface::new(21.0, 21.0, 1.0);
        surface.translate(10.5, 10.5);
        surface.fill_radial(
            10.0,
            &[
                ColorStop::new(0.0, Rgba([255, 255, 255, 255])),
                ColorStop::new(1.0, Rgba([255, 255, 255, 0])),
            ],
        );
        let center = surface.image().get_pixel(10, 10)[3];
        let mid = surface.image().get_pixel(15, 10)[3];
        let outside = surface.image().get_pixel(0, 0)[3];
        assert!(center > mid && mid > 0, "center {} mid {}", center, mid);
        assert_eq!(outside, 0);
    }

    #[test]
    fn test_draw_image_scales_to_dest() {
        let mut sprite = RgbaImage::new(2, 1);
        sprite.put_pixel(0, 0, RED);
        sprite.put_pixel(1, 0, Rgba([0, 0, 255, 255]));

        let mut surface = RasterSurface::new(8.0, 4.0, 1.0);
        surface.draw_image(&sprite, Rect::new(0.0, 0.0, 8.0, 4.0));
        assert_eq!(*surface.image().get_pixel(1, 1), RED);
        assert_eq!(*surface.image().get_pixel(6, 3), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_clear() {
        let mut surface = RasterSurface::new(4.0, 4.0, 1.0);
        surface.fill_round_rect(Rect::new(0.0, 0.0, 4.0, 4.0), 0.0, RED);
        surface.clear();
        assert!(surface.image().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_affine_inverse_roundtrip() {
        let t = Affine::scale(2.0).translated(3.0, -1.0).rotated(0.7);
        let inv = t.inverse().unwrap();
        let (x, y) = t.apply(5.0, 7.0);
        let (bx, by) = inv.apply(x, y);
        assert!((bx - 5.0).abs() < 1e-9 && (by - 7.0).abs() < 1e-9);
    }
}
