//! Drawing surface abstraction
//!
//! The simulation never talks to a canvas directly. Hosts provide a
//! [`DrawSurface`] with the small subset of 2D-canvas operations the
//! renderer needs; [`crate::raster::RasterSurface`] draws into an RGBA buffer
//! and the browser host wraps a `CanvasRenderingContext2d`.
//!
//! Coordinates are CSS pixels. Surfaces apply the device pixel ratio as part
//! of their base transform, so callers never scale by it themselves.

use image::Rgba;

/// Compositing mode for subsequent fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Normal alpha compositing (`source-over`)
    #[default]
    SourceOver,
    /// Additive compositing (`lighter`)
    Lighter,
}

impl BlendMode {
    /// Name of the mode as a canvas `globalCompositeOperation`
    pub fn as_composite_op(self) -> &'static str {
        match self {
            BlendMode::SourceOver => "source-over",
            BlendMode::Lighter => "lighter",
        }
    }
}

/// One stop of a radial gradient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    /// Position along the radius, 0.0 (center) to 1.0 (edge)
    pub offset: f64,
    pub color: Rgba<u8>,
}

impl ColorStop {
    pub const fn new(offset: f64, color: Rgba<u8>) -> Self {
        Self { offset, color }
    }
}

/// Axis-aligned rectangle in the current local frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle of the given size centered on the origin
    pub fn centered(width: f64, height: f64) -> Self {
        Self::new(-width / 2.0, -height / 2.0, width, height)
    }
}

/// A 2D drawing target.
///
/// State touched by [`save`](DrawSurface::save)/[`restore`](DrawSurface::restore)
/// is the transform, the global alpha and the blend mode, mirroring the
/// canvas state stack.
pub trait DrawSurface {
    /// Sprite image type this surface can draw
    type Image;

    /// Resize the backing store to `floor(width * dpr) x floor(height * dpr)`
    /// and reset the base transform to scale by `dpr`.
    fn resize(&mut self, width: f64, height: f64, dpr: f64);

    /// Clear the whole surface to transparent.
    fn clear(&mut self);

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f64, y: f64);
    /// Rotate the local frame by `angle` radians.
    fn rotate(&mut self, angle: f64);
    /// Set the global alpha applied to every subsequent fill.
    fn set_alpha(&mut self, alpha: f64);
    fn set_blend(&mut self, mode: BlendMode);
    fn blend(&self) -> BlendMode;

    /// Fill a rounded rectangle; the radius is clamped to half the shorter side.
    fn fill_round_rect(&mut self, rect: Rect, radius: f64, color: Rgba<u8>);

    /// Fill a circle centered on the local origin.
    fn fill_circle(&mut self, radius: f64, color: Rgba<u8>);

    /// Fill a circle centered on the local origin with a radial gradient
    /// running from the center (offset 0) to `radius` (offset 1).
    fn fill_radial(&mut self, radius: f64, stops: &[ColorStop]);

    /// Draw `image` stretched over `dest`.
    fn draw_image(&mut self, image: &Self::Image, dest: Rect);
}

/// Color of a gradient at `t` (clamped to the stop range).
///
/// Stops are expected in ascending offset order, as canvas requires.
pub fn gradient_at(stops: &[ColorStop], t: f64) -> Rgba<u8> {
    let (first, last) = match (stops.first(), stops.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Rgba([0, 0, 0, 0]),
    };
    if t <= first.offset {
        return first.color;
    }
    if t >= last.offset {
        return last.color;
    }

    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let k = if span <= 0.0 { 1.0 } else { (t - a.offset) / span };
            let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * k).round() as u8;
            return Rgba([
                mix(a.color[0], b.color[0]),
                mix(a.color[1], b.color[1]),
                mix(a.color[2], b.color[2]),
                mix(a.color[3], b.color[3]),
            ]);
        }
    }
    last.color
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOPS: [ColorStop; 3] = [
        ColorStop::new(0.0, Rgba([255, 255, 255, 255])),
        ColorStop::new(0.5, Rgba([255, 0, 0, 128])),
        ColorStop::new(1.0, Rgba([255, 0, 0, 0])),
    ];

    #[test]
    fn test_gradient_endpoints() {
        assert_eq!(gradient_at(&STOPS, -1.0), Rgba([255, 255, 255, 255]));
        assert_eq!(gradient_at(&STOPS, 0.0), Rgba([255, 255, 255, 255]));
        assert_eq!(gradient_at(&STOPS, 1.0), Rgba([255, 0, 0, 0]));
        assert_eq!(gradient_at(&STOPS, 2.0), Rgba([255, 0, 0, 0]));
    }

    #[test]
    fn test_gradient_interpolates_between_stops() {
        assert_eq!(gradient_at(&STOPS, 0.5), Rgba([255, 0, 0, 128]));
        assert_eq!(gradient_at(&STOPS, 0.75), Rgba([255, 0, 0, 64]));
        let quarter = gradient_at(&STOPS, 0.25);
        assert_eq!(quarter[1], 128);
    }

    #[test]
    fn test_gradient_empty() {
        assert_eq!(gradient_at(&[], 0.3), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_rect_centered() {
        assert_eq!(Rect::centered(6.0, 28.0), Rect::new(-3.0, -14.0, 6.0, 28.0));
    }

    #[test]
    fn test_blend_composite_names() {
        assert_eq!(BlendMode::Lighter.as_composite_op(), "lighter");
        assert_eq!(BlendMode::default().as_composite_op(), "source-over");
    }
}
