use crate::error::{Error, Result};
use crate::math::Vec3;
use crate::scheduler::System;
use crate::state::RigidBody;
use crate::world::World;
use std::collections::HashMap;

/// Tangential damping applied when a body lands on the ground plane.
const GROUND_TANGENTIAL_DAMP: f64 = 0.98;
/// Scalar velocity damping applied to both bodies after a pair impulse;
/// drains energy from dense stacks.
const PAIR_VELOCITY_DAMP: f64 = 0.999;
/// Contact-normal y-threshold for the grounded push-down classification.
const PUSH_DOWN_NORMAL_Y: f64 = 0.2;
/// Tolerance on the grounded test.
const GROUNDED_EPS: f64 = 1e-6;
/// Minimum center distance used when forming contact normals.
const MIN_CONTACT_DIST: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct RigidBodySystemConfig {
    /// Normal coefficient of restitution: 0 sticks, 1 is elastic.
    pub restitution: f64,
    /// Height of the infinite ground plane with normal `+Y`.
    pub ground_y: f64,
    /// Internal substeps per scheduler call.
    pub substeps: u32,
    /// Positional/impulse iterations per substep.
    pub pair_iterations: u32,
    /// Acceptable residual overlap; early-out tolerance.
    pub penetration_slop: f64,
    /// Target extra separation beyond geometric touch.
    pub contact_offset: f64,
    /// Fraction of penetration corrected per iteration, in `(0, 1]`.
    pub baumgarte: f64,
}

impl Default for RigidBodySystemConfig {
    fn default() -> Self {
        Self {
            restitution: 0.5,
            ground_y: 0.0,
            substeps: 4,
            pair_iterations: 32,
            penetration_slop: 1e-5,
            contact_offset: 1e-3,
            baumgarte: 0.8,
        }
    }
}

/// Impulse-based contact solver for rigid spheres.
///
/// Each substep integrates semi-implicit Euler under gravity, clamps bodies
/// against the ground plane, then runs a Gauss-Seidel pass over candidate
/// pairs from a uniform hash grid: Baumgarte positional correction plus a
/// normal impulse, iterated until residual penetration falls below the slop
/// or the iteration budget runs out. Leftover penetration is not an error;
/// it is retained as a diagnostic.
pub struct RigidBodySystem {
    cfg: RigidBodySystemConfig,
    // Broad-phase hash grid, keyed by floored cell coordinates. Kept across
    // substeps so the table allocation is reused.
    grid: HashMap<(i64, i64, i64), Vec<usize>>,
    last_residual: f64,
}

impl RigidBodySystem {
    /// Errors with `InvalidParam` on zero `substeps` or `pair_iterations`,
    /// negative restitution/slop/offset, `baumgarte` outside `(0, 1]`, or
    /// non-finite values.
    pub fn new(cfg: RigidBodySystemConfig) -> Result<Self> {
        if cfg.substeps == 0 {
            return Err(Error::InvalidParam("substeps must be >= 1".into()));
        }
        if cfg.pair_iterations == 0 {
            return Err(Error::InvalidParam("pair_iterations must be >= 1".into()));
        }
        if !cfg.restitution.is_finite() || cfg.restitution < 0.0 {
            return Err(Error::InvalidParam(
                "restitution must be finite and >= 0".into(),
            ));
        }
        if !cfg.ground_y.is_finite() {
            return Err(Error::InvalidParam("ground_y must be finite".into()));
        }
        if !cfg.penetration_slop.is_finite() || cfg.penetration_slop < 0.0 {
            return Err(Error::InvalidParam(
                "penetration_slop must be finite and >= 0".into(),
            ));
        }
        if !cfg.contact_offset.is_finite() || cfg.contact_offset < 0.0 {
            return Err(Error::InvalidParam(
                "contact_offset must be finite and >= 0".into(),
            ));
        }
        if !cfg.baumgarte.is_finite() || cfg.baumgarte <= 0.0 || cfg.baumgarte > 1.0 {
            return Err(Error::InvalidParam(
                "baumgarte must lie in (0, 1]".into(),
            ));
        }
        Ok(Self {
            cfg,
            grid: HashMap::new(),
            last_residual: 0.0,
        })
    }

    pub fn config(&self) -> &RigidBodySystemConfig {
        &self.cfg
    }

    /// Largest penetration left after the final pair iteration of the most
    /// recent step.
    pub fn residual_penetration(&self) -> f64 {
        self.last_residual
    }

    fn substep(&mut self, world: &mut World, h: f64) -> f64 {
        let gravity = world.gravity;
        let bodies = &mut world.rigid_bodies;

        // 1. Integrate and ground-clamp.
        for rb in bodies.iter_mut() {
            if !rb.is_dynamic() {
                continue;
            }
            rb.velocity += gravity * h;
            rb.position += rb.velocity * h;
            clamp_to_ground(rb, &self.cfg);
        }

        let mut residual = 0.0;
        if bodies.len() >= 2 {
            // 2. Broad-phase cell size from the largest radius.
            let r_max = bodies.iter().map(|b| b.radius).fold(0.0, f64::max);
            let cell = (2.0 * r_max).max(1e-6);

            // 3. Iterative pair resolution.
            for _ in 0..self.cfg.pair_iterations {
                self.grid.clear();
                for (i, rb) in bodies.iter().enumerate() {
                    self.grid
                        .entry(cell_key(rb.position, cell))
                        .or_default()
                        .push(i);
                }

                let mut max_pen: f64 = 0.0;
                for i in 0..bodies.len() {
                    let (cx, cy, cz) = cell_key(bodies[i].position, cell);
                    for dz in -1..=1 {
                        for dy in -1..=1 {
                            for dx in -1..=1 {
                                let Some(candidates) =
                                    self.grid.get(&(cx + dx, cy + dy, cz + dz))
                                else {
                                    continue;
                                };
                                for &j in candidates {
                                    if j <= i {
                                        continue;
                                    }
                                    let pen = resolve_pair(&self.cfg, bodies, i, j);
                                    max_pen = max_pen.max(pen);
                                }
                            }
                        }
                    }
                }

                residual = max_pen;
                if max_pen < self.cfg.penetration_slop {
                    break;
                }
            }
        }

        // 4. Final ground clamp absorbs downward nudges from pair
        // corrections.
        for rb in bodies.iter_mut() {
            if rb.is_dynamic() {
                clamp_to_ground(rb, &self.cfg);
            }
        }

        residual
    }
}

impl System for RigidBodySystem {
    fn name(&self) -> &str {
        "rigid_body"
    }

    fn step(&mut self, world: &mut World, dt: f64) {
        debug_assert!(
            world.rigid_bodies.iter().all(|b| b.radius > 0.0),
            "rigid body radii must be strictly positive"
        );

        let h = dt / f64::from(self.cfg.substeps);
        let mut residual: f64 = 0.0;
        for _ in 0..self.cfg.substeps {
            residual = residual.max(self.substep(world, h));
        }
        self.last_residual = residual;
        if residual >= self.cfg.penetration_slop {
            log::debug!("rigid body residual penetration {residual:.3e} after pair iterations");
        }
    }
}

#[inline]
fn cell_key(p: Vec3, cell: f64) -> (i64, i64, i64) {
    (
        (p.x / cell).floor() as i64,
        (p.y / cell).floor() as i64,
        (p.z / cell).floor() as i64,
    )
}

fn clamp_to_ground(rb: &mut RigidBody, cfg: &RigidBodySystemConfig) {
    let target = cfg.ground_y + rb.radius + cfg.contact_offset;
    if rb.position.y < target {
        rb.position.y = target;
        if rb.velocity.y < 0.0 {
            rb.velocity.y = -cfg.restitution * rb.velocity.y;
            rb.velocity.x *= GROUND_TANGENTIAL_DAMP;
            rb.velocity.z *= GROUND_TANGENTIAL_DAMP;
        }
    }
}

/// Resolve one candidate pair; returns the penetration observed, or zero
/// when the pair is separated or immovable.
fn resolve_pair(cfg: &RigidBodySystemConfig, bodies: &mut [RigidBody], i: usize, j: usize) -> f64 {
    debug_assert!(i < j);
    let (head, tail) = bodies.split_at_mut(j);
    let a = &mut head[i];
    let b = &mut tail[0];

    let d = b.position - a.position;
    let target = a.radius + b.radius + cfg.contact_offset;
    if d.norm2() >= target * target {
        return 0.0;
    }

    let dist_raw = d.norm();
    let dist = dist_raw.max(MIN_CONTACT_DIST);
    // Coincident centers get an arbitrary +X normal; the next iteration
    // separates them properly.
    let n = if dist_raw > MIN_CONTACT_DIST {
        d / dist
    } else {
        Vec3::unit_x()
    };
    let pen = (target - dist).max(0.0);

    // A grounded body pushed toward the floor by this contact acts as
    // static, so settled stacks are not corrected through the ground.
    let grounded_a = a.position.y - a.radius <= cfg.ground_y + cfg.contact_offset + GROUNDED_EPS;
    let grounded_b = b.position.y - b.radius <= cfg.ground_y + cfg.contact_offset + GROUNDED_EPS;
    let a_static = a.kinematic || a.mass <= 0.0 || (grounded_a && n.y > PUSH_DOWN_NORMAL_Y);
    let b_static = b.kinematic || b.mass <= 0.0 || (grounded_b && n.y < -PUSH_DOWN_NORMAL_Y);

    let inv_ma = if a_static { 0.0 } else { 1.0 / a.mass };
    let inv_mb = if b_static { 0.0 } else { 1.0 / b.mass };
    let inv_sum = inv_ma + inv_mb;
    if inv_sum == 0.0 {
        return 0.0;
    }

    // Baumgarte positional correction, split by inverse mass.
    let corr = cfg.baumgarte * pen / inv_sum;
    a.position -= n * (corr * inv_ma);
    b.position += n * (corr * inv_mb);

    // Normal impulse on approaching contacts only.
    let v_n = (b.velocity - a.velocity).dot(n);
    if v_n < 0.0 {
        let impulse = -(1.0 + cfg.restitution) * v_n / inv_sum;
        a.velocity -= n * (impulse * inv_ma);
        b.velocity += n * (impulse * inv_mb);
        a.velocity *= PAIR_VELOCITY_DAMP;
        b.velocity *= PAIR_VELOCITY_DAMP;
    }

    pen
}
