//! Offscreen rendering driven by a fixed-step clock
//!
//! Runs a [`ParticleField`] over a [`RasterSurface`] the same way a page
//! would, with [`ManualClock`] standing in for the display refresh.

use std::path::Path;
use std::str::FromStr;

use image::RgbaImage;
use serde::Serialize;
use thiserror::Error;

use crate::config::FryfallConfig;
use crate::field::{FrameScheduler, Host, ManualClock, ParticleField};
use crate::hooks::PointerTrail;
use crate::raster::RasterSurface;
use crate::sim::{SimOptions, SimStats};
use crate::sprites::{load_sprites, FileSpriteLoader};
use crate::theme::{ThemeError, VariableRegistry};

/// A click injected before a given frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstAt {
    pub x: f64,
    pub y: f64,
    pub frame: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid burst '{0}': expected X,Y@FRAME (e.g. 480,120@10)")]
pub struct BurstParseError(String);

impl FromStr for BurstAt {
    type Err = BurstParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || BurstParseError(s.to_string());
        let (point, frame) = s.split_once('@').ok_or_else(bad)?;
        let (x, y) = point.split_once(',').ok_or_else(bad)?;
        let x: f64 = x.trim().parse().map_err(|_| bad())?;
        let y: f64 = y.trim().parse().map_err(|_| bad())?;
        if !x.is_finite() || !y.is_finite() {
            return Err(bad());
        }
        let frame = frame.trim().parse().map_err(|_| bad())?;
        Ok(Self { x, y, frame })
    }
}

/// Which frames to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    All,
    Last,
}

/// Summary printed by `--stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    #[serde(flatten)]
    pub sim: SimStats,
    pub frames: u64,
}

#[derive(Debug)]
pub struct Rendered {
    pub frames: Vec<RgbaImage>,
    pub stats: RenderStats,
}

struct RasterHost {
    width: f64,
    height: f64,
    dpr: f64,
}

impl Host for RasterHost {
    type Surface = RasterSurface;

    fn content_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.dpr
    }

    fn create_surface(&mut self, width: f64, height: f64, dpr: f64) -> RasterSurface {
        RasterSurface::new(width, height, dpr)
    }
}

/// Simulate `config.render.frames` frames and collect the output.
///
/// Sprite sources are resolved against `asset_root`; without one the field
/// draws vector fries. In reduced motion the field never starts and a single
/// still of the initial layout is returned.
pub fn render(
    config: &FryfallConfig,
    asset_root: Option<&Path>,
    bursts: &[BurstAt],
    capture: Capture,
) -> Result<Rendered, ThemeError> {
    let theme = config.resolve_theme(&VariableRegistry::new())?;
    let opts = &config.render;
    let options = SimOptions { wind: config.wind, theme, seed: opts.seed };

    let clock = ManualClock::new();
    let mut host =
        RasterHost { width: opts.width as f64, height: opts.height as f64, dpr: opts.dpr };
    let mut field = ParticleField::new(&mut host, Box::new(clock.clone()), options);

    if let Some(root) = asset_root {
        let mut loader = FileSpriteLoader::new(root);
        field.attach_sprites(load_sprites(&mut loader, &config.sprites.sources));
    }
    if config.pointer.trail {
        field.add_hook(Box::new(PointerTrail::new(config.pointer.trail_interval)));
    }
    for spec in &config.impacts {
        field.sim_mut().schedule_impact(spec.clone());
    }

    let mut frames = Vec::new();
    if opts.reduced_motion {
        field.set_reduced_motion(true);
        field.render();
        frames.push(field.surface().image().clone());
        let stats = RenderStats { sim: field.sim().stats(), frames: 0 };
        return Ok(Rendered { frames, stats });
    }

    let frame_ms = 1000.0 / opts.fps.max(1) as f64;
    for i in 0..opts.frames {
        for b in bursts.iter().filter(|b| b.frame == i) {
            field.pointer_down(b.x, b.y);
        }
        if i == 0 {
            field.set_visibility(1.0);
        } else {
            clock.advance(frame_ms);
            if clock.take_request() {
                field.frame(clock.now());
            }
        }
        if capture == Capture::All || i + 1 == opts.frames {
            frames.push(field.surface().image().clone());
        }
    }
    log::debug!("simulated {} frames, clock at {:.0}ms", field.frames(), clock.now());

    let stats = RenderStats { sim: field.sim().stats(), frames: field.frames() };
    Ok(Rendered { frames, stats })
}
