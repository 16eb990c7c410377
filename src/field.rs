//! The particle field component
//!
//! [`ParticleField`] couples a [`Simulation`] to a drawing surface and a
//! frame scheduler, and implements the run state machine:
//!
//! ```text
//!            start()  (ignored while reduced motion is on)
//!   stopped ─────────► running
//!      ▲                  │
//!      └──────────────────┘
//!            stop()
//! ```
//!
//! While running, every [`frame`](ParticleField::frame) call updates,
//! renders and asks the scheduler for the next frame. Once stopped, the next
//! scheduled frame is the last one. At most one frame request is outstanding:
//! a restart while the last request is still pending picks that request up
//! instead of opening a second loop.

use std::cell::Cell;
use std::rc::Rc;

use crate::hooks::FrameHook;
use crate::particle::{Particle, ParticleOverrides};
use crate::render::render_frame;
use crate::sim::{SimOptions, Simulation, DT_MAX};
use crate::sprites::Sprite;
use crate::surface::DrawSurface;

/// Share of the host that must be on screen for the field to run
pub const VISIBILITY_THRESHOLD: f64 = 0.05;

/// Redraw scheduling and the clock it runs on
pub trait FrameScheduler {
    /// Monotonic time in milliseconds
    fn now(&self) -> f64;

    /// Ask for one more [`ParticleField::frame`] call at the next refresh.
    fn request_frame(&mut self);
}

/// The element the field lives in
pub trait Host {
    type Surface: DrawSurface;

    /// Content box size in CSS pixels
    fn content_size(&self) -> (f64, f64);

    fn device_pixel_ratio(&self) -> f64;

    /// Create and attach a surface for the given size.
    fn create_surface(&mut self, width: f64, height: f64, dpr: f64) -> Self::Surface;
}

/// Clamp a reported device pixel ratio to `[1, 2]`.
pub fn clamp_dpr(dpr: f64) -> f64 {
    if dpr.is_finite() {
        dpr.clamp(1.0, 2.0)
    } else {
        1.0
    }
}

/// Falling fries, glints and steam drawn onto one surface
pub struct ParticleField<S: DrawSurface> {
    sim: Simulation,
    surface: S,
    sprites: Vec<Sprite<S::Image>>,
    hooks: Vec<Box<dyn FrameHook>>,
    scheduler: Box<dyn FrameScheduler>,
    dpr: f64,
    running: bool,
    frame_pending: bool,
    last_time: f64,
    frames: u64,
}

impl<S: DrawSurface> ParticleField<S> {
    /// Build a stopped field sized to `host`.
    pub fn new<H>(host: &mut H, scheduler: Box<dyn FrameScheduler>, options: SimOptions) -> Self
    where
        H: Host<Surface = S>,
    {
        let dpr = clamp_dpr(host.device_pixel_ratio());
        let (w, h) = host.content_size();
        let (w, h) = (w.max(1.0), h.max(1.0));
        let surface = host.create_surface(w, h, dpr);
        let sim = Simulation::new(w, h, options);
        log::debug!("particle field {}x{} @{}x, {} fries", w, h, dpr, sim.base_count());

        Self {
            sim,
            surface,
            sprites: Vec::new(),
            hooks: Vec::new(),
            scheduler,
            dpr,
            running: false,
            frame_pending: false,
            last_time: 0.0,
            frames: 0,
        }
    }

    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn sprites(&self) -> &[Sprite<S::Image>] {
        &self.sprites
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.dpr
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames rendered through [`frame`](Self::frame)
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Merge freshly loaded sprites; fries without one pick one up.
    pub fn attach_sprites(&mut self, sprites: Vec<Sprite<S::Image>>) {
        if sprites.is_empty() {
            return;
        }
        self.sprites.extend(sprites);
        log::info!("{} fry sprite(s) ready", self.sprites.len());
        self.sim.set_sprite_count(self.sprites.len());
    }

    pub fn add_hook(&mut self, hook: Box<dyn FrameHook>) {
        self.hooks.push(hook);
    }

    /// Follow a container resize. Run state is untouched.
    pub fn resize(&mut self, width: f64, height: f64) {
        let (w, h) = (width.max(1.0), height.max(1.0));
        self.surface.resize(w, h, self.dpr);
        self.sim.set_size(w, h);
        log::debug!("resized to {}x{}, {} fries", w, h, self.sim.base_count());
    }

    /// Re-read the host's size and pixel ratio.
    pub fn resize_to_host<H: Host<Surface = S>>(&mut self, host: &H) {
        self.dpr = clamp_dpr(host.device_pixel_ratio());
        let (w, h) = host.content_size();
        self.resize(w, h);
    }

    pub fn start(&mut self) {
        if self.running || self.sim.reduced_motion() {
            return;
        }
        self.running = true;
        self.last_time = self.scheduler.now();
        log::info!("particle field started");
        if !self.frame_pending {
            self.frame(self.last_time);
        }
    }

    pub fn stop(&mut self) {
        if self.running {
            log::info!("particle field stopped");
        }
        self.running = false;
    }

    /// Reduced motion forces a stop and blocks starts until it is lifted.
    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.sim.set_reduced_motion(reduced);
        if reduced {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Report how much of the host is on screen, from 0.0 to 1.0.
    pub fn set_visibility(&mut self, ratio: f64) {
        if ratio >= VISIBILITY_THRESHOLD {
            self.start();
        } else {
            self.stop();
        }
    }

    /// Scheduler callback. Returns whether another frame was requested.
    pub fn frame(&mut self, now: f64) -> bool {
        self.frame_pending = false;
        if !self.running {
            return false;
        }
        let dt = ((now - self.last_time) / 1000.0).min(DT_MAX);
        self.last_time = now;
        self.update(dt);
        self.render();
        self.frames += 1;
        self.scheduler.request_frame();
        self.frame_pending = true;
        true
    }

    /// Advance the simulation, run hooks, then advance impacts.
    pub fn update(&mut self, dt: f64) {
        self.sim.update(dt);
        let dt = if dt.is_finite() { dt.clamp(0.0, DT_MAX) } else { 0.0 };
        for hook in &mut self.hooks {
            hook.after_update(&mut self.sim, dt);
        }
        self.sim.advance_impacts(dt);
    }

    pub fn render(&mut self) {
        render_frame(&mut self.surface, &self.sim, &self.sprites);
    }

    pub fn spawn_particle(&mut self, overrides: ParticleOverrides) -> Particle {
        self.sim.spawn_particle(overrides)
    }

    pub fn emit_burst(&mut self, x: f64, y: f64) {
        self.sim.emit_burst(x, y);
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.sim.emit_burst(x, y);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.sim.set_pointer(Some((x, y)));
    }

    pub fn pointer_leave(&mut self) {
        self.sim.set_pointer(None);
    }
}

#[derive(Debug, Default)]
struct ClockState {
    now: Cell<f64>,
    pending: Cell<bool>,
    requests: Cell<u64>,
}

/// A hand-driven clock for headless hosts and tests.
///
/// Clones share state, so a host can keep one handle while the field owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Rc<ClockState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `ms` milliseconds.
    pub fn advance(&self, ms: f64) {
        self.state.now.set(self.state.now.get() + ms);
    }

    /// Consume the outstanding frame request, if any.
    pub fn take_request(&self) -> bool {
        self.state.pending.replace(false)
    }

    /// Total frame requests seen
    pub fn requests(&self) -> u64 {
        self.state.requests.get()
    }
}

impl FrameScheduler for ManualClock {
    fn now(&self) -> f64 {
        self.state.now.get()
    }

    fn request_frame(&mut self) {
        self.state.pending.set(true);
        self.state.requests.set(self.state.requests.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::PointerTrail;
    use crate::raster::RasterSurface;

    struct TestHost {
        size: (f64, f64),
        dpr: f64,
    }

    impl Host for TestHost {
        type Surface = RasterSurface;

        fn content_size(&self) -> (f64, f64) {
            self.size
        }

        fn device_pixel_ratio(&self) -> f64 {
            self.dpr
        }

        fn create_surface(&mut self, width: f64, height: f64, dpr: f64) -> RasterSurface {
            RasterSurface::new(width, height, dpr)
        }
    }

    fn field(w: f64, h: f64, dpr: f64) -> (ParticleField<RasterSurface>, ManualClock) {
        let clock = ManualClock::new();
        let mut host = TestHost { size: (w, h), dpr };
        let field = ParticleField::new(
            &mut host,
            Box::new(clock.clone()),
            SimOptions { seed: Some(5), ..Default::default() },
        );
        (field, clock)
    }

    #[test]
    fn test_init_clamps_dpr_and_sizes_surface() {
        let (f, _) = field(800.0, 600.0, 3.0);
        assert_eq!(f.device_pixel_ratio(), 2.0);
        assert_eq!(f.surface().image().dimensions(), (1600, 1200));
        assert_eq!(f.sim().particles().len(), 40);
        assert!(!f.is_running());

        let (f, _) = field(100.0, 100.0, 0.5);
        assert_eq!(f.device_pixel_ratio(), 1.0);
        assert_eq!(clamp_dpr(f64::NAN), 1.0);
    }

    #[test]
    fn test_start_runs_a_frame_and_schedules() {
        let (mut f, clock) = field(800.0, 600.0, 1.0);
        f.start();
        assert!(f.is_running());
        assert_eq!(f.frames(), 1);
        assert!(clock.take_request());

        clock.advance(16.0);
        assert!(f.frame(clock.now()));
        assert_eq!(f.frames(), 2);
        assert!((f.sim().time() - 0.016).abs() < 1e-9);
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let (mut f, clock) = field(800.0, 600.0, 1.0);
        f.stop();
        assert!(!f.is_running());
        assert_eq!(clock.requests(), 0);

        f.start();
        f.start();
        assert_eq!(f.frames(), 1);
        assert_eq!(clock.requests(), 1);

        f.stop();
        f.stop();
        assert!(!f.is_running());
    }

    #[test]
    fn test_stopped_frame_does_not_reschedule() {
        let (mut f, clock) = field(800.0, 600.0, 1.0);
        f.start();
        clock.take_request();
        f.stop();
        clock.advance(16.0);
        assert!(!f.frame(clock.now()));
        assert!(!clock.take_request());
        assert_eq!(f.frames(), 1);
    }

    #[test]
    fn test_reduced_motion_stops_and_blocks_start() {
        let (mut f, clock) = field(800.0, 600.0, 1.0);
        f.start();
        clock.take_request();

        f.set_reduced_motion(true);
        assert!(!f.is_running());
        clock.advance(16.0);
        assert!(!f.frame(clock.now()));
        assert!(!clock.take_request());

        let before = (f.frames(), f.sim().time());
        f.start();
        f.set_visibility(1.0);
        assert!(!f.is_running());
        assert_eq!((f.frames(), f.sim().time()), before);

        f.set_reduced_motion(false);
        assert!(f.is_running());
    }

    /// Scheduler that keeps every request, like a browser queueing
    /// animation-frame callbacks.
    #[derive(Clone, Default)]
    struct QueuedFrames {
        queued: Rc<Cell<u32>>,
    }

    impl FrameScheduler for QueuedFrames {
        fn now(&self) -> f64 {
            0.0
        }

        fn request_frame(&mut self) {
            self.queued.set(self.queued.get() + 1);
        }
    }

    #[test]
    fn test_restart_before_pending_frame_keeps_one_loop() {
        let queue = QueuedFrames::default();
        let mut host = TestHost { size: (800.0, 600.0), dpr: 1.0 };
        let mut f: ParticleField<RasterSurface> =
            ParticleField::new(&mut host, Box::new(queue.clone()), SimOptions::default());

        f.set_visibility(1.0);
        f.set_visibility(0.0);
        f.set_visibility(1.0);
        assert_eq!(queue.queued.get(), 1);

        for refresh in 0..5 {
            let callbacks = queue.queued.replace(0);
            assert_eq!(callbacks, 1, "refresh {}", refresh);
            for _ in 0..callbacks {
                f.frame(16.0 * (refresh + 1) as f64);
            }
        }
        assert_eq!(f.frames(), 6);
        assert!(f.is_running());
    }

    #[test]
    fn test_visibility_threshold() {
        let (mut f, _) = field(800.0, 600.0, 1.0);
        f.set_visibility(0.04);
        assert!(!f.is_running());
        f.set_visibility(0.05);
        assert!(f.is_running());
        f.set_visibility(0.0);
        assert!(!f.is_running());
    }

    #[test]
    fn test_long_pause_is_clamped() {
        let (mut f, clock) = field(800.0, 600.0, 1.0);
        f.start();
        clock.advance(60_000.0);
        f.frame(clock.now());
        assert!((f.sim().time() - DT_MAX).abs() < 1e-9);
    }

    #[test]
    fn test_resize_keeps_run_state() {
        let (mut f, _) = field(800.0, 600.0, 2.0);
        f.start();
        f.resize(1920.0, 1080.0);
        assert!(f.is_running());
        assert_eq!(f.surface().image().dimensions(), (3840, 2160));
        assert_eq!(f.sim().base_count(), 138);
        f.update(0.016);
        assert_eq!(f.sim().ambient_count(), 138);

        let host = TestHost { size: (400.0, 300.0), dpr: 1.0 };
        f.resize_to_host(&host);
        assert_eq!(f.surface().image().dimensions(), (400, 300));
        assert_eq!(f.sim().base_count(), 40);
    }

    #[test]
    fn test_pointer_hooks_through_field() {
        let (mut f, _) = field(800.0, 600.0, 1.0);
        f.add_hook(Box::new(PointerTrail::default()));
        f.sim_mut().particles_mut().clear();
        f.pointer_move(100.0, 100.0);
        f.update(0.04);
        assert!(!f.sim().sparks().is_empty());

        f.pointer_leave();
        assert_eq!(f.sim().pointer(), None);

        let before = f.sim().particles().len();
        f.pointer_down(300.0, 200.0);
        assert_eq!(f.sim().particles().len(), before + 12);
    }

    #[test]
    fn test_attach_sprites_fills_in_missing() {
        let (mut f, _) = field(800.0, 600.0, 1.0);
        f.attach_sprites(Vec::new());
        assert!(f.sim().particles().iter().all(|p| p.sprite.is_none()));

        let sprite = Sprite::new(image::RgbaImage::new(6, 28), 6.0, 28.0);
        f.attach_sprites(vec![sprite]);
        assert_eq!(f.sprites().len(), 1);
        assert!(f.sim().particles().iter().all(|p| p.sprite.is_some()));
    }
}
