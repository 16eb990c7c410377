//! Per-frame extension points
//!
//! A [`FrameHook`] runs after every simulation update and may emit extra
//! effects. Hooks are registered on [`crate::field::ParticleField`] and run
//! in registration order.

use rand::Rng;

use crate::sim::Simulation;

/// Default spacing of pointer trail sparks, in seconds (~25 per second)
pub const TRAIL_INTERVAL: f64 = 0.04;

pub trait FrameHook {
    /// Called once per frame after fries, sparks and fumes have advanced.
    fn after_update(&mut self, sim: &mut Simulation, dt: f64);
}

impl<F> FrameHook for F
where
    F: FnMut(&mut Simulation, f64),
{
    fn after_update(&mut self, sim: &mut Simulation, dt: f64) {
        self(sim, dt)
    }
}

/// Leaves a shimmer of sparks under the cursor while it is over the field.
#[derive(Debug, Clone)]
pub struct PointerTrail {
    interval: f64,
    accumulated: f64,
}

impl Default for PointerTrail {
    fn default() -> Self {
        Self::new(TRAIL_INTERVAL)
    }
}

impl PointerTrail {
    pub fn new(interval: f64) -> Self {
        Self { interval: interval.max(1e-3), accumulated: 0.0 }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }
}

impl FrameHook for PointerTrail {
    fn after_update(&mut self, sim: &mut Simulation, dt: f64) {
        let Some((x, y)) = sim.pointer() else {
            return;
        };
        if sim.reduced_motion() {
            return;
        }

        self.accumulated += dt;
        while self.accumulated >= self.interval {
            self.accumulated -= self.interval;
            let jx = (sim.rng().random::<f64>() - 0.5) * 6.0;
            let jy = (sim.rng().random::<f64>() - 0.5) * 6.0;
            sim.emit_spark(x + jx, y - 4.0 + jy);
        }
    }
}
