use crate::math::Vec3;
use crate::scheduler::Scheduler;
use crate::state::{ParticleSet, RigidBody};

/// The simulation world: global clock, gravity, state containers, and the
/// scheduler that advances them.
///
/// The caller owns the world and mutates its containers directly between
/// ticks; during a tick the scheduler hands each system the same mutable
/// borrow in registration order.
#[derive(Debug)]
pub struct World {
    /// Simulation time; advances by exactly the caller's `dt` per `step`.
    pub time: f64,
    pub gravity: Vec3,
    pub rigid_bodies: Vec<RigidBody>,
    pub md_particles: ParticleSet,
    pub scheduler: Scheduler,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Empty world at `time = 0` with standard gravity along `-Y`.
    pub fn new() -> Self {
        Self {
            time: 0.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            rigid_bodies: Vec::new(),
            md_particles: ParticleSet::new(),
            scheduler: Scheduler::new(),
        }
    }

    /// Advance the world by one tick of duration `dt`.
    ///
    /// The clock moves first, so systems observe the post-tick time; the
    /// registered systems then run to completion in order. `dt` must be
    /// positive (checked in debug builds only; the tick itself cannot fail).
    pub fn step(&mut self, dt: f64) {
        debug_assert!(dt > 0.0, "tick duration must be positive, got {dt}");

        self.time += dt;

        // The scheduler is detached for the duration of the tick so systems
        // and scheduler never alias; systems do not introspect it.
        let mut scheduler = std::mem::take(&mut self.scheduler);
        scheduler.tick(self, dt);
        self.scheduler = scheduler;
    }
}
