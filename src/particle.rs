//! Particle, spark and fume entities
//!
//! Each entity is a plain fixed-shape struct with its own integration step.
//! The [`crate::sim::Simulation`] owns the collections and decides when
//! entities are spawned, recycled and dropped.
//!
//! Units are CSS pixels and seconds throughout.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use rand::Rng;

/// Maximum number of live sparks; the oldest are evicted first.
pub const SPARK_CAP: usize = 200;
/// Maximum number of live fume puffs; the oldest are evicted first.
pub const FUME_CAP: usize = 120;

/// Parallax depth range. Deeper (larger) particles fall faster and draw larger.
pub const DEPTH_MIN: f64 = 0.55;
pub const DEPTH_MAX: f64 = 1.5;

/// Vertical falling speed base for top spawns, px/s
const SPEED_BASE: f64 = 26.0;

/// Beyond these margins a particle counts as out of view.
pub const BOTTOM_MARGIN: f64 = 60.0;
pub const SIDE_MARGIN: f64 = 80.0;

/// Index of a loaded sprite in the field's sprite list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteId(pub usize);

/// Edge a particle enters from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnEdge {
    Top,
    Left,
    Right,
}

impl SpawnEdge {
    /// Weighted pick: 60% top, 20% left, 20% right.
    pub fn from_unit(u: f64) -> Self {
        if u < 0.6 {
            SpawnEdge::Top
        } else if u < 0.8 {
            SpawnEdge::Left
        } else {
            SpawnEdge::Right
        }
    }
}

/// Where a particle left the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Bottom,
    Side,
}

/// A falling fry
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Seconds since spawn
    pub t: f64,
    pub rotation: f64,
    pub rot_speed: f64,
    pub scale: f64,
    pub depth: f64,
    pub alpha: f64,
    pub sway: f64,
    pub sway_amp: f64,
    pub sway_speed: f64,
    pub gust_amp: f64,
    pub gust_freq: f64,
    pub gust_phase: f64,
    pub gravity: f64,
    pub sprite: Option<SpriteId>,
    /// Burst particles are dropped once out of view instead of respawning.
    pub ephemeral: bool,
}

/// Uniform draws in `[0, 1)` behind one spawn.
///
/// Splitting the draws from the mapping keeps [`Particle::from_roll`] a pure
/// function of its inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRoll {
    pub edge: f64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub rotation: f64,
    pub rot_speed: f64,
    pub depth: f64,
    pub scale: f64,
    pub alpha: f64,
    pub sway: f64,
    pub sway_amp: f64,
    pub sway_speed: f64,
    pub gust_amp: f64,
    pub gust_freq: f64,
    pub gust_phase: f64,
    pub gravity: f64,
}

impl SpawnRoll {
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            edge: rng.random(),
            x: rng.random(),
            y: rng.random(),
            vx: rng.random(),
            vy: rng.random(),
            rotation: rng.random(),
            rot_speed: rng.random(),
            depth: rng.random(),
            scale: rng.random(),
            alpha: rng.random(),
            sway: rng.random(),
            sway_amp: rng.random(),
            sway_speed: rng.random(),
            gust_amp: rng.random(),
            gust_freq: rng.random(),
            gust_phase: rng.random(),
            gravity: rng.random(),
        }
    }
}

impl Particle {
    /// Map a roll onto a particle entering a `width x height` view.
    pub fn from_roll(roll: &SpawnRoll, width: f64, height: f64) -> Self {
        let (x, y, vx, vy) = match SpawnEdge::from_unit(roll.edge) {
            SpawnEdge::Top => (
                roll.x * width,
                -20.0 - roll.y * 60.0,
                (roll.vx - 0.5) * 30.0,
                SPEED_BASE + roll.vy * SPEED_BASE,
            ),
            SpawnEdge::Left => (
                -20.0 - roll.x * 60.0,
                roll.y * height * 0.8,
                30.0 + roll.vx * 70.0,
                14.0 + roll.vy * 46.0,
            ),
            SpawnEdge::Right => (
                width + 20.0 + roll.x * 60.0,
                roll.y * height * 0.8,
                -(30.0 + roll.vx * 70.0),
                14.0 + roll.vy * 46.0,
            ),
        };

        let depth = DEPTH_MIN + roll.depth * (DEPTH_MAX - DEPTH_MIN);
        let scale = (0.55 + roll.scale * 1.1) * depth;

        Self {
            x,
            y,
            vx,
            vy: vy * depth,
            t: 0.0,
            rotation: roll.rotation * TAU,
            rot_speed: (roll.rot_speed - 0.5) * 1.2,
            scale,
            depth,
            alpha: 0.28 + roll.alpha * 0.45,
            sway: roll.sway * TAU,
            sway_amp: (10.0 + roll.sway_amp * 25.0) * scale,
            sway_speed: 0.8 + roll.sway_speed * 2.0,
            gust_amp: 10.0 + roll.gust_amp * 25.0,
            gust_freq: 0.2 + roll.gust_freq * 0.8,
            gust_phase: roll.gust_phase * TAU,
            gravity: 2.0 + roll.gravity * 10.0,
            sprite: None,
            ephemeral: false,
        }
    }

    /// Integrate one step. `time` is the field clock, `wind` the shared
    /// horizontal force for this frame.
    pub fn advance(&mut self, dt: f64, time: f64, wind: f64) {
        self.t += dt;
        self.sway += dt * self.sway_speed * 2.0;
        let sway_x = self.sway.sin() * self.sway_amp * dt;
        let gust = ((time + self.gust_phase) * TAU * self.gust_freq).sin() * self.gust_amp;

        self.x += (self.vx + gust + wind * self.depth) * dt + sway_x;
        self.y += self.vy * dt;
        self.vy += self.gravity * dt * 0.3;
        self.rotation += self.rot_speed * dt;
    }

    /// Classify an exit from a `width x height` view. The bottom is checked
    /// first, so a lower corner reports [`Exit::Bottom`].
    pub fn exit(&self, width: f64, height: f64) -> Option<Exit> {
        if self.y > height + BOTTOM_MARGIN {
            Some(Exit::Bottom)
        } else if self.x < -SIDE_MARGIN || self.x > width + SIDE_MARGIN {
            Some(Exit::Side)
        } else {
            None
        }
    }
}

/// Field-wise replacements applied on top of a fresh spawn
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParticleOverrides {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub vx: Option<f64>,
    pub vy: Option<f64>,
    pub rotation: Option<f64>,
    pub rot_speed: Option<f64>,
    pub scale: Option<f64>,
    pub depth: Option<f64>,
    pub alpha: Option<f64>,
    pub gravity: Option<f64>,
    pub sprite: Option<Option<SpriteId>>,
    pub ephemeral: Option<bool>,
}

impl ParticleOverrides {
    pub fn apply(&self, p: &mut Particle) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field { p.$field = v; })*
            };
        }
        take!(x, y, vx, vy, rotation, rot_speed, scale, depth, alpha, gravity, sprite, ephemeral);
    }
}

/// A short-lived glint
#[derive(Debug, Clone, PartialEq)]
pub struct Spark {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub life: f64,
    pub t: f64,
    pub size: f64,
    pub alpha: f64,
    pub start_alpha: f64,
}

impl Spark {
    /// A glint drifting mostly upward from (x, y).
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, x: f64, y: f64) -> Self {
        let speed = 15.0 + rng.random::<f64>() * 30.0;
        let angle = -FRAC_PI_2 + (rng.random::<f64>() - 0.5) * 0.8;
        let start_alpha = 0.6 + rng.random::<f64>() * 0.3;
        Self {
            x,
            y,
            vx: angle.cos() * speed,
            vy: angle.sin() * speed,
            life: 0.6 + rng.random::<f64>() * 0.5,
            t: 0.0,
            size: 2.0 + rng.random::<f64>() * 3.0,
            alpha: start_alpha,
            start_alpha,
        }
    }

    /// Integrate one step; returns `false` once the spark is spent.
    pub fn advance(&mut self, dt: f64) -> bool {
        self.t += dt;
        self.x += self.vx * dt;
        self.y += self.vy * dt;
        let ratio = self.t / self.life;
        self.alpha = (self.start_alpha * (1.0 - ratio)).max(0.0);
        self.size *= 1.0 - 0.6 * dt;
        ratio < 1.0 && self.alpha > 0.0
    }
}

/// A rising steam puff
#[derive(Debug, Clone, PartialEq)]
pub struct Fume {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub phase: f64,
    pub life: f64,
    pub t: f64,
    pub size: f64,
    pub alpha: f64,
    pub start_alpha: f64,
}

impl Fume {
    /// A puff near (x, y): within 10 px horizontally and 3 px vertically.
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, x: f64, y: f64) -> Self {
        let start_alpha = 0.35 + rng.random::<f64>() * 0.25;
        Self {
            x: x + (rng.random::<f64>() - 0.5) * 20.0,
            y: y + (rng.random::<f64>() - 0.5) * 6.0,
            vx: (rng.random::<f64>() - 0.5) * 20.0,
            vy: -(20.0 + rng.random::<f64>() * 30.0),
            phase: rng.random::<f64>() * TAU,
            life: 0.8 + rng.random::<f64>() * 0.9,
            t: 0.0,
            size: 10.0 + rng.random::<f64>() * 18.0,
            alpha: start_alpha,
            start_alpha,
        }
    }

    /// Integrate one step; returns `false` once the puff has faded.
    pub fn advance(&mut self, dt: f64) -> bool {
        self.t += dt;
        let ratio = self.t / self.life;
        self.x += self.vx * dt + ((self.t + self.phase) * 3.0).sin() * 5.0 * dt;
        self.y += self.vy * dt;
        self.alpha = (self.start_alpha * (1.0 - ratio)).max(0.0);
        self.size *= 1.0 + 0.4 * dt;
        ratio < 1.0 && self.alpha > 0.0
    }
}

/// Drop the oldest entries so that at most `cap` remain.
pub fn trim_oldest<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        items.drain(..items.len() - cap);
    }
}

/// Initial velocity for one burst fry: a cone of ±0.45 rad around straight
/// down, horizontal speed damped to a quarter.
pub fn burst_velocity(angle_unit: f64, speed_unit: f64) -> (f64, f64) {
    let angle = PI / 2.0 + (angle_unit - 0.5) * 0.9;
    let speed = 120.0 + speed_unit * 160.0;
    (angle.cos() * speed * 0.25, angle.sin() * speed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn roll(value: f64) -> SpawnRoll {
        SpawnRoll {
            edge: value,
            x: value,
            y: value,
            vx: value,
            vy: value,
            rotation: value,
            rot_speed: value,
            depth: value,
            scale: value,
            alpha: value,
            sway: value,
            sway_amp: value,
            sway_speed: value,
            gust_amp: value,
            gust_freq: value,
            gust_phase: value,
            gravity: value,
        }
    }

    #[test]
    fn test_spawn_edge_weights() {
        assert_eq!(SpawnEdge::from_unit(0.0), SpawnEdge::Top);
        assert_eq!(SpawnEdge::from_unit(0.599), SpawnEdge::Top);
        assert_eq!(SpawnEdge::from_unit(0.6), SpawnEdge::Left);
        assert_eq!(SpawnEdge::from_unit(0.799), SpawnEdge::Left);
        assert_eq!(SpawnEdge::from_unit(0.8), SpawnEdge::Right);
        assert_eq!(SpawnEdge::from_unit(0.999), SpawnEdge::Right);
    }

    #[test]
    fn test_top_spawn_ranges() {
        let p = Particle::from_roll(&roll(0.25), 800.0, 600.0);
        assert_eq!(p.x, 200.0);
        assert_eq!(p.y, -35.0);
        assert!(p.vy > 0.0);
        assert!(!p.ephemeral);
        assert!(p.sprite.is_none());
    }

    #[test]
    fn test_side_spawns_move_inward() {
        let left = Particle::from_roll(&roll(0.7), 800.0, 600.0);
        assert!(left.x <= -20.0 && left.vx > 0.0);
        assert!(left.y < 600.0 * 0.8);

        let right = Particle::from_roll(&roll(0.9), 800.0, 600.0);
        assert!(right.x >= 820.0 && right.vx < 0.0);
    }

    #[test]
    fn test_scale_and_fall_speed_grow_with_depth() {
        let mut last: Option<Particle> = None;
        for step in 0..=10 {
            let mut r = roll(0.3);
            r.depth = step as f64 / 10.0 * 0.999;
            let p = Particle::from_roll(&r, 800.0, 600.0);
            assert!(p.depth >= DEPTH_MIN && p.depth <= DEPTH_MAX);
            if let Some(prev) = &last {
                assert!(p.depth > prev.depth);
                assert!(p.scale > prev.scale, "scale must grow with depth");
                assert!(p.vy > prev.vy, "fall speed must grow with depth");
            }
            last = Some(p);
        }
    }

    #[test]
    fn test_random_spawns_stay_in_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let p = Particle::from_roll(&SpawnRoll::draw(&mut rng), 1024.0, 768.0);
            assert!((DEPTH_MIN..=DEPTH_MAX).contains(&p.depth));
            assert!((0.28..=0.73).contains(&p.alpha));
            assert!((2.0..=12.0).contains(&p.gravity));
            assert!((0.2..=1.0).contains(&p.gust_freq));
            assert!(p.rot_speed.abs() <= 0.6);
        }
    }

    #[test]
    fn test_overrides_apply() {
        let mut p = Particle::from_roll(&roll(0.1), 100.0, 100.0);
        let overrides = ParticleOverrides {
            x: Some(5.0),
            alpha: Some(0.7),
            sprite: Some(Some(SpriteId(1))),
            ephemeral: Some(true),
            ..Default::default()
        };
        let before_vy = p.vy;
        overrides.apply(&mut p);
        assert_eq!(p.x, 5.0);
        assert_eq!(p.alpha, 0.7);
        assert_eq!(p.sprite, Some(SpriteId(1)));
        assert!(p.ephemeral);
        assert_eq!(p.vy, before_vy);
    }

    #[test]
    fn test_advance_falls_and_accelerates() {
        let mut p = Particle::from_roll(&roll(0.1), 100.0, 100.0);
        p.sway_amp = 0.0;
        p.gust_amp = 0.0;
        p.vx = 0.0;
        let (x0, y0, vy0) = (p.x, p.y, p.vy);
        p.advance(0.05, 0.0, 0.0);
        assert_eq!(p.x, x0);
        assert!((p.y - (y0 + vy0 * 0.05)).abs() < 1e-9);
        assert!(p.vy > vy0);
    }

    #[test]
    fn test_exit_prefers_bottom() {
        let mut p = Particle::from_roll(&roll(0.1), 100.0, 100.0);
        p.x = 50.0;
        p.y = 100.0 + BOTTOM_MARGIN;
        assert_eq!(p.exit(100.0, 100.0), None);
        p.y += 1.0;
        assert_eq!(p.exit(100.0, 100.0), Some(Exit::Bottom));
        p.x = -500.0;
        assert_eq!(p.exit(100.0, 100.0), Some(Exit::Bottom));
        p.y = 10.0;
        assert_eq!(p.exit(100.0, 100.0), Some(Exit::Side));
    }

    #[test]
    fn test_spark_fades_out_within_life() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let mut s = Spark::spawn(&mut rng, 0.0, 0.0);
            let life = s.life;
            let mut elapsed = 0.0;
            let dt = 1.0 / 60.0;
            while s.advance(dt) {
                elapsed += dt;
                assert!(elapsed < life);
            }
            assert!(s.t >= life || s.alpha <= 0.0);
            assert!(s.alpha <= s.start_alpha);
        }
    }

    #[test]
    fn test_spark_heads_upward() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let s = Spark::spawn(&mut rng, 0.0, 0.0);
            assert!(s.vy < 0.0);
            assert!((2.0..=5.0).contains(&s.size));
        }
    }

    #[test]
    fn test_fume_rises_and_grows() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut f = Fume::spawn(&mut rng, 100.0, 200.0);
        assert!((f.x - 100.0).abs() <= 10.0);
        assert!((f.y - 200.0).abs() <= 3.0);
        let (y0, size0) = (f.y, f.size);
        assert!(f.advance(0.1));
        assert!(f.y < y0);
        assert!(f.size > size0);
    }

    #[test]
    fn test_trim_oldest() {
        let mut items: Vec<u32> = (0..10).collect();
        trim_oldest(&mut items, 4);
        assert_eq!(items, vec![6, 7, 8, 9]);
        trim_oldest(&mut items, 10);
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn test_burst_velocity_points_down() {
        for (a, s) in [(0.0, 0.0), (0.5, 0.5), (0.999, 0.999)] {
            let (vx, vy) = burst_velocity(a, s);
            assert!(vy > 0.0);
            assert!(vx.abs() < vy);
        }
        let (vx, vy) = burst_velocity(0.5, 0.0);
        assert!(vx.abs() < 1e-9);
        assert!((vy - 120.0).abs() < 1e-9);
    }
}
