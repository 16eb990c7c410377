//! Headless particle field simulation
//!
//! [`Simulation`] owns every live entity (fries, sparks, fumes and impact
//! debris) and advances them once per frame. It knows nothing about drawing
//! surfaces or schedulers; [`crate::field::ParticleField`] wires it to those.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::impact::{ImpactLayer, ImpactSpec};
use crate::particle::{
    burst_velocity, trim_oldest, Fume, Particle, ParticleOverrides, Spark, SpawnRoll,
    SpriteId, FUME_CAP, SPARK_CAP,
};
use crate::theme::Theme;

/// Largest step a single update integrates, in seconds
pub const DT_MAX: f64 = 0.05;

/// Surface area (px²) per ambient particle
pub const AREA_PER_PARTICLE: f64 = 15_000.0;
pub const MIN_PARTICLES: usize = 40;
pub const MAX_PARTICLES: usize = 140;

/// Fries in one pointer burst
pub const BURST_COUNT: usize = 12;

/// Chance per particle per frame of a grease glint
const GLINT_CHANCE: f64 = 0.05;

/// Minimum |vy| for a landing to raise steam
const FUME_MIN_SPEED: f64 = 5.0;

/// Ambient particle target for a `width x height` surface.
///
/// ```
/// use fryfall::sim::target_count;
///
/// assert_eq!(target_count(800.0, 600.0), 40);
/// assert_eq!(target_count(1600.0, 900.0), 96);
/// assert_eq!(target_count(4000.0, 3000.0), 140);
/// ```
pub fn target_count(width: f64, height: f64) -> usize {
    let raw = (width * height / AREA_PER_PARTICLE).round();
    (raw.max(0.0) as usize).clamp(MIN_PARTICLES, MAX_PARTICLES)
}

/// Shared horizontal draft: two summed sinusoids
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindParams {
    /// Primary amplitude, px/s
    pub amp: f64,
    /// Secondary amplitude, px/s
    pub amp2: f64,
    /// Primary frequency, Hz
    pub freq: f64,
    /// Secondary frequency, Hz
    pub freq2: f64,
}

impl Default for WindParams {
    fn default() -> Self {
        Self { amp: 18.0, amp2: 9.0, freq: 0.25, freq2: 0.61 }
    }
}

impl WindParams {
    pub const CALM: WindParams = WindParams { amp: 0.0, amp2: 0.0, freq: 0.0, freq2: 0.0 };

    /// Wind at field time `time` for the given phase offset.
    pub fn at(&self, time: f64, phase: f64) -> f64 {
        ((time + phase) * TAU * self.freq).sin() * self.amp
            + ((time + phase * 0.7) * TAU * self.freq2).sin() * self.amp2
    }
}

/// Construction options for a [`Simulation`]
#[derive(Debug, Clone, Default)]
pub struct SimOptions {
    pub wind: WindParams,
    pub theme: Theme,
    /// Fixed RNG seed; `None` seeds from the OS
    pub seed: Option<u64>,
}

/// Counts of live entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SimStats {
    pub particles: usize,
    pub ambient: usize,
    pub ephemeral: usize,
    pub sparks: usize,
    pub fumes: usize,
    pub debris: usize,
    pub dust: usize,
}

/// The particle field state
pub struct Simulation {
    width: f64,
    height: f64,
    time: f64,
    wind: WindParams,
    wind_phase: f64,
    base_count: usize,
    particles: Vec<Particle>,
    sparks: Vec<Spark>,
    fumes: Vec<Fume>,
    impacts: ImpactLayer,
    sprite_count: usize,
    pointer: Option<(f64, f64)>,
    reduced_motion: bool,
    theme: Theme,
    rng: StdRng,
}

impl Simulation {
    /// Create a field for a `width x height` surface, already populated with
    /// its ambient particles.
    pub fn new(width: f64, height: f64, options: SimOptions) -> Self {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let wind_phase = rng.random::<f64>() * TAU;

        let mut sim = Self {
            width: 1.0,
            height: 1.0,
            time: 0.0,
            wind: options.wind,
            wind_phase,
            base_count: 0,
            particles: Vec::new(),
            sparks: Vec::new(),
            fumes: Vec::new(),
            impacts: ImpactLayer::new(),
            sprite_count: 0,
            pointer: None,
            reduced_motion: false,
            theme: options.theme,
            rng,
        };
        sim.set_size(width, height);
        sim
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Field clock in seconds (sum of clamped steps)
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn base_count(&self) -> usize {
        self.base_count
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable access for hosts and tests that need to place particles.
    pub fn particles_mut(&mut self) -> &mut Vec<Particle> {
        &mut self.particles
    }

    pub fn sparks(&self) -> &[Spark] {
        &self.sparks
    }

    pub fn fumes(&self) -> &[Fume] {
        &self.fumes
    }

    pub fn impacts(&self) -> &ImpactLayer {
        &self.impacts
    }

    pub fn ambient_count(&self) -> usize {
        self.particles.iter().filter(|p| !p.ephemeral).count()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn wind(&self) -> WindParams {
        self.wind
    }

    /// Current cursor position, if the pointer is over the surface
    pub fn pointer(&self) -> Option<(f64, f64)> {
        self.pointer
    }

    pub fn set_pointer(&mut self, pointer: Option<(f64, f64)>) {
        self.pointer = pointer;
    }

    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
    }

    /// The simulation's random source, shared with frame hooks.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn stats(&self) -> SimStats {
        let ambient = self.ambient_count();
        SimStats {
            particles: self.particles.len(),
            ambient,
            ephemeral: self.particles.len() - ambient,
            sparks: self.sparks.len(),
            fumes: self.fumes.len(),
            debris: self.impacts.debris().len(),
            dust: self.impacts.dust().len(),
        }
    }

    /// Adopt new surface dimensions and re-derive the ambient target.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
        self.base_count = target_count(self.width, self.height);
        self.ensure_particles();
    }

    /// Record how many sprites are loaded and give one to every particle
    /// still drawn as a vector fry.
    pub fn set_sprite_count(&mut self, count: usize) {
        self.sprite_count = count;
        if count == 0 {
            return;
        }
        for p in &mut self.particles {
            if p.sprite.is_none() {
                p.sprite = Some(SpriteId(self.rng.random_range(0..count)));
            }
        }
    }

    fn random_sprite(&mut self) -> Option<SpriteId> {
        (self.sprite_count > 0).then(|| SpriteId(self.rng.random_range(0..self.sprite_count)))
    }

    /// Create a particle entering from a random edge, with `overrides` applied.
    pub fn spawn_particle(&mut self, overrides: ParticleOverrides) -> Particle {
        let roll = SpawnRoll::draw(&mut self.rng);
        let mut p = Particle::from_roll(&roll, self.width, self.height);
        p.sprite = self.random_sprite();
        overrides.apply(&mut p);
        p
    }

    /// Top up or trim ambient particles to the target count. Ephemeral
    /// particles are left alone.
    pub fn ensure_particles(&mut self) {
        let mut ambient = self.ambient_count();
        while ambient < self.base_count {
            let p = self.spawn_particle(ParticleOverrides::default());
            self.particles.push(p);
            ambient += 1;
        }
        while ambient > self.base_count {
            match self.particles.iter().rposition(|p| !p.ephemeral) {
                Some(idx) => {
                    self.particles.remove(idx);
                    ambient -= 1;
                }
                None => break,
            }
        }
    }

    /// Emit one glint at (x, y).
    pub fn emit_spark(&mut self, x: f64, y: f64) {
        let spark = Spark::spawn(&mut self.rng, x, y);
        self.sparks.push(spark);
        trim_oldest(&mut self.sparks, SPARK_CAP);
    }

    /// Emit 2-3 steam puffs around (x, y).
    pub fn emit_fume(&mut self, x: f64, y: f64) {
        let count = 2 + self.rng.random_range(0..2);
        for _ in 0..count {
            let fume = Fume::spawn(&mut self.rng, x, y);
            self.fumes.push(fume);
        }
        trim_oldest(&mut self.fumes, FUME_CAP);
    }

    /// Throw a handful of ephemeral fries (and sparks) down from (x, y).
    pub fn emit_burst(&mut self, x: f64, y: f64) {
        for _ in 0..BURST_COUNT {
            let (vx, vy) = burst_velocity(self.rng.random(), self.rng.random());
            let overrides = ParticleOverrides {
                x: Some(x + (self.rng.random::<f64>() - 0.5) * 20.0),
                y: Some(y + (self.rng.random::<f64>() - 0.5) * 20.0),
                vx: Some(vx),
                vy: Some(vy),
                scale: Some(0.7 + self.rng.random::<f64>() * 0.9),
                rot_speed: Some((self.rng.random::<f64>() - 0.5) * 1.5),
                alpha: Some(0.7),
                ephemeral: Some(true),
                ..Default::default()
            };
            let p = self.spawn_particle(overrides);
            self.particles.push(p);

            self.emit_spark(x, y);
            if self.rng.random::<f64>() < 0.7 {
                self.emit_spark(x, y);
            }
        }
    }

    /// Queue an impact relative to the current field time.
    pub fn schedule_impact(&mut self, spec: ImpactSpec) {
        self.impacts.schedule(self.time, spec);
    }

    /// Fire an impact at (x, y) now.
    pub fn trigger_impact(&mut self, x: f64, y: f64, debris: usize, dust: usize) {
        self.impacts.trigger(&mut self.rng, &self.theme, x, y, debris, dust);
    }

    /// Advance fries, sparks and fumes by `dt` seconds (clamped to
    /// [`DT_MAX`]) and restore the ambient count.
    pub fn update(&mut self, dt: f64) {
        let dt = if dt.is_finite() { dt.clamp(0.0, DT_MAX) } else { 0.0 };
        self.time += dt;
        let (w, h) = (self.width, self.height);
        let wind = self.wind.at(self.time, self.wind_phase);

        let mut i = 0;
        while i < self.particles.len() {
            let p = &mut self.particles[i];
            p.advance(dt, self.time, wind);
            let (x, y, vy, scale, ephemeral) = (p.x, p.y, p.vy, p.scale, p.ephemeral);
            let exit = p.exit(w, h);

            if self.rng.random::<f64>() < GLINT_CHANCE {
                self.emit_spark(x, y - 10.0 * scale);
            }

            match exit {
                None => i += 1,
                Some(_) if ephemeral => {
                    self.particles.remove(i);
                }
                Some(_) => {
                    // any exit below the bottom edge lands, corners included
                    if y > h && vy.abs() > FUME_MIN_SPEED {
                        self.emit_fume(x, h - 4.0);
                    }
                    let mut fresh = self.spawn_particle(ParticleOverrides::default());
                    fresh.y = -20.0 - self.rng.random::<f64>() * 40.0;
                    fresh.x = self.rng.random::<f64>() * w;
                    self.particles[i] = fresh;
                    i += 1;
                }
            }
        }

        self.sparks.retain_mut(|s| s.advance(dt));
        self.fumes.retain_mut(|f| f.advance(dt));

        self.ensure_particles();
    }

    /// Fire due impacts and advance debris and dust by `dt` seconds.
    pub fn advance_impacts(&mut self, dt: f64) {
        let dt = if dt.is_finite() { dt.clamp(0.0, DT_MAX) } else { 0.0 };
        self.impacts.advance(&mut self.rng, &self.theme, self.time, dt, self.width, self.height);
    }
}
