use crate::error::{Error, Result};
use crate::math::Vec3;
use crate::scheduler::System;
use crate::spatial::{NeighborList, NeighborListConfig, NeighborListStats, NeighborPair};
use crate::state::ParticleSet;
use crate::world::World;
use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct MdConfig {
    /// Lennard-Jones well depth.
    pub epsilon: f64,
    /// Lennard-Jones zero-crossing distance.
    pub sigma: f64,
    /// Cutoff in units of sigma.
    pub rcut_sigma: f64,
    /// Enable the Berendsen thermostat.
    pub nvt: bool,
    /// Thermostat target temperature (k_B = 1).
    pub temp: f64,
    /// Berendsen coupling time constant.
    pub tau_thermo: f64,
    /// Drive force evaluation from the cell-list neighbor structure.
    pub use_neighbor_list: bool,
    /// Verlet skin added to the cutoff.
    pub nlist_skin: f64,
    /// Steps between displacement checks.
    pub nlist_check_interval: u32,
}

impl Default for MdConfig {
    fn default() -> Self {
        Self {
            epsilon: 1.0,
            sigma: 1.0,
            rcut_sigma: 2.5,
            nvt: false,
            temp: 1.0,
            tau_thermo: 1.0,
            use_neighbor_list: true,
            nlist_skin: 0.3,
            nlist_check_interval: 10,
        }
    }
}

/// Velocity-Verlet integrator for Lennard-Jones particles.
///
/// Forces come from the neighbor list when enabled (falling back to an
/// all-pairs sweep otherwise); the list is checked for staleness every
/// `nlist_check_interval` steps and rebuilt over the current bounding box
/// plus margin when any particle has outrun half the skin.
pub struct MdSystem {
    cfg: MdConfig,
    nlist: Option<NeighborList>,
    forces: Vec<Vec3>,
    positions: Vec<Vec3>,
    steps_since_check: u32,
    rebuilds: usize,
}

impl MdSystem {
    /// Errors with `InvalidParam` on non-positive `epsilon`/`sigma`/
    /// `rcut_sigma`, negative skin, zero check interval, or (with `nvt`)
    /// non-positive `temp`/`tau_thermo`.
    pub fn new(cfg: MdConfig) -> Result<Self> {
        if !cfg.epsilon.is_finite() || cfg.epsilon <= 0.0 {
            return Err(Error::InvalidParam("epsilon must be finite and > 0".into()));
        }
        if !cfg.sigma.is_finite() || cfg.sigma <= 0.0 {
            return Err(Error::InvalidParam("sigma must be finite and > 0".into()));
        }
        if !cfg.rcut_sigma.is_finite() || cfg.rcut_sigma <= 0.0 {
            return Err(Error::InvalidParam(
                "rcut_sigma must be finite and > 0".into(),
            ));
        }
        if !cfg.nlist_skin.is_finite() || cfg.nlist_skin < 0.0 {
            return Err(Error::InvalidParam(
                "nlist_skin must be finite and >= 0".into(),
            ));
        }
        if cfg.nlist_check_interval == 0 {
            return Err(Error::InvalidParam(
                "nlist_check_interval must be >= 1".into(),
            ));
        }
        if cfg.nvt {
            if !cfg.temp.is_finite() || cfg.temp <= 0.0 {
                return Err(Error::InvalidParam(
                    "thermostat temp must be finite and > 0".into(),
                ));
            }
            if !cfg.tau_thermo.is_finite() || cfg.tau_thermo <= 0.0 {
                return Err(Error::InvalidParam(
                    "tau_thermo must be finite and > 0".into(),
                ));
            }
        }
        Ok(Self {
            cfg,
            nlist: None,
            forces: Vec::new(),
            positions: Vec::new(),
            steps_since_check: 0,
            rebuilds: 0,
        })
    }

    pub fn config(&self) -> &MdConfig {
        &self.cfg
    }

    /// Interaction cutoff distance, `rcut_sigma * sigma`.
    #[inline]
    pub fn cutoff(&self) -> f64 {
        self.cfg.rcut_sigma * self.cfg.sigma
    }

    /// Neighbor-list rebuilds performed so far.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Statistics of the current neighbor list, if one has been built.
    pub fn neighbor_stats(&self) -> Option<&NeighborListStats> {
        self.nlist.as_ref().map(NeighborList::stats)
    }

    /// Pairs of the current neighbor list (empty before the first build).
    pub fn neighbor_pairs(&self) -> &[NeighborPair] {
        self.nlist.as_ref().map_or(&[], NeighborList::pairs)
    }

    /// Build a fresh list over the bounding box of `positions`, expanded by
    /// `2 * (cutoff + skin)` on every face.
    fn rebuild_list(&mut self, positions: &[Vec3]) {
        let mut lo = positions.first().copied().unwrap_or(Vec3::zero());
        let mut hi = lo;
        for p in positions {
            lo.x = lo.x.min(p.x);
            lo.y = lo.y.min(p.y);
            lo.z = lo.z.min(p.z);
            hi.x = hi.x.max(p.x);
            hi.y = hi.y.max(p.y);
            hi.z = hi.z.max(p.z);
        }
        let margin = 2.0 * (self.cutoff() + self.cfg.nlist_skin);

        let nl_cfg = NeighborListConfig {
            cutoff: self.cutoff(),
            skin: self.cfg.nlist_skin,
            cell_size_factor: 1.0,
            domain_min: lo - Vec3::new(margin, margin, margin),
            domain_max: hi + Vec3::new(margin, margin, margin),
            enable_stats: true,
        };
        // The MD constructor validated cutoff and skin, and the margin keeps
        // the domain extent positive even for a single particle.
        let mut list = NeighborList::new(nl_cfg).expect("neighbor config validated at MD construction");
        list.build(positions);
        self.rebuilds += 1;
        self.nlist = Some(list);
    }

    fn maintain_neighbor_list(&mut self, particles: &ParticleSet) {
        particles.positions_into(&mut self.positions);

        if self.nlist.is_none() {
            let positions = std::mem::take(&mut self.positions);
            self.rebuild_list(&positions);
            self.positions = positions;
            self.steps_since_check = 0;
            return;
        }

        self.steps_since_check += 1;
        if self.steps_since_check >= self.cfg.nlist_check_interval {
            let stale = self
                .nlist
                .as_mut()
                .map_or(true, |list| list.needs_rebuild(&self.positions));
            if stale {
                let positions = std::mem::take(&mut self.positions);
                self.rebuild_list(&positions);
                self.positions = positions;
            }
            self.steps_since_check = 0;
        }
    }
}

impl System for MdSystem {
    fn name(&self) -> &str {
        "molecular_dynamics"
    }

    fn step(&mut self, world: &mut World, dt: f64) {
        let particles = &mut world.md_particles;
        let n = particles.len();
        if n == 0 {
            return;
        }

        // 1. Neighbor-list maintenance.
        if self.cfg.use_neighbor_list {
            self.maintain_neighbor_list(particles);
        }

        self.forces.resize(n, Vec3::zero());

        // 2. Forces at t.
        let pairs = active_pairs(&self.cfg, self.nlist.as_ref());
        lj_forces(&self.cfg, particles, pairs, &mut self.forces);

        // 3. Half kick + drift.
        for (p, f) in particles.iter_mut().zip(&self.forces) {
            p.velocity += *f * (0.5 * dt / p.mass);
            p.position += p.velocity * dt;
        }

        // 4. Forces at t + dt. The list is not rebuilt between half-steps;
        // the skin absorbs one substep of drift.
        let pairs = active_pairs(&self.cfg, self.nlist.as_ref());
        lj_forces(&self.cfg, particles, pairs, &mut self.forces);

        // 5. Half kick.
        for (p, f) in particles.iter_mut().zip(&self.forces) {
            p.velocity += *f * (0.5 * dt / p.mass);
        }

        // 6. Berendsen thermostat; undefined below two particles or at zero
        // temperature, so silently bypassed there.
        if self.cfg.nvt && n >= 2 {
            let ke = particles.kinetic_energy();
            let t_inst = (2.0 / 3.0) * ke / n as f64;
            if t_inst > 0.0 {
                let lambda =
                    (1.0 + (dt / self.cfg.tau_thermo) * (self.cfg.temp / t_inst - 1.0)).sqrt();
                for p in particles.iter_mut() {
                    p.velocity *= lambda;
                }
            }
        }
    }
}

/// The pair list to drive force evaluation with, or `None` for the all-pairs
/// fallback (list disabled, never built, or empty).
fn active_pairs<'a>(cfg: &MdConfig, nlist: Option<&'a NeighborList>) -> Option<&'a [NeighborPair]> {
    if !cfg.use_neighbor_list {
        return None;
    }
    nlist.map(NeighborList::pairs).filter(|p| !p.is_empty())
}

/// Accumulate Lennard-Jones 12-6 forces over `pairs`, or over all pairs when
/// `None`.
fn lj_forces(
    cfg: &MdConfig,
    particles: &ParticleSet,
    pairs: Option<&[NeighborPair]>,
    forces: &mut [Vec3],
) {
    let rc = cfg.rcut_sigma * cfg.sigma;
    let rc2 = rc * rc;
    let sig2 = cfg.sigma * cfg.sigma;
    let sig6 = sig2 * sig2 * sig2;
    let sig12 = sig6 * sig6;

    forces.fill(Vec3::zero());

    let mut accumulate = |i: usize, j: usize| {
        let rij = particles[j].position - particles[i].position;
        let r2 = rij.norm2();
        // Coincident particles contribute nothing; the guard also avoids the
        // division below.
        if r2 > rc2 || r2 == 0.0 {
            return;
        }
        let inv_r2 = 1.0 / r2;
        let inv_r6 = inv_r2 * inv_r2 * inv_r2;
        // |F|/r factorization: the direction vector is unnormalized.
        let mag = 24.0 * cfg.epsilon * inv_r2 * (2.0 * sig12 * inv_r6 * inv_r6 - sig6 * inv_r6);
        let fij = rij * mag;
        forces[i] -= fij;
        forces[j] += fij;
    };

    match pairs {
        Some(pairs) => {
            for p in pairs {
                accumulate(p.i, p.j);
            }
        }
        None => {
            let n = particles.len();
            for i in 0..n {
                for j in (i + 1)..n {
                    accumulate(i, j);
                }
            }
        }
    }
}

/// Seed particle velocities from a zero-mean symmetric distribution whose
/// per-component variance matches kinetic temperature `temp` (k_B = 1), then
/// remove the residual center-of-mass drift.
pub fn assign_thermal_velocities(particles: &mut ParticleSet, temp: f64, seed: u64) {
    if particles.is_empty() || temp <= 0.0 {
        return;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for p in particles.iter_mut() {
        // Uniform on [-a, a] has variance a^2 / 3; match <v_k^2> = T / m.
        let a = (3.0 * temp / p.mass).sqrt();
        p.velocity = Vec3::new(
            rng.random_range(-a..=a),
            rng.random_range(-a..=a),
            rng.random_range(-a..=a),
        );
    }

    let mut momentum = Vec3::zero();
    let mut total_mass = 0.0;
    for p in particles.iter() {
        momentum += p.velocity * p.mass;
        total_mass += p.mass;
    }
    let drift = momentum / total_mass;
    for p in particles.iter_mut() {
        p.velocity -= drift;
    }
}
