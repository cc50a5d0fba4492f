use crate::error::{Error, Result};
use crate::math::Vec3;

/// Pair of particle indices for neighbor interactions, with `i < j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborPair {
    pub i: usize,
    pub j: usize,
}

/// Configuration for neighbor list construction.
#[derive(Debug, Clone)]
pub struct NeighborListConfig {
    /// Interaction cutoff distance.
    pub cutoff: f64,
    /// Extra distance for the Verlet list (reduces rebuilds).
    pub skin: f64,
    /// Minimum cell edge = `(cutoff + skin) * cell_size_factor`.
    pub cell_size_factor: f64,
    /// Lower corner of the cell-partitioned domain.
    pub domain_min: Vec3,
    /// Upper corner; must exceed `domain_min` on every axis.
    pub domain_max: Vec3,
    /// Track rebuild statistics.
    pub enable_stats: bool,
}

impl Default for NeighborListConfig {
    fn default() -> Self {
        Self {
            cutoff: 2.5,
            skin: 0.3,
            cell_size_factor: 1.0,
            domain_min: Vec3::new(-10.0, -10.0, -10.0),
            domain_max: Vec3::new(10.0, 10.0, 10.0),
            enable_stats: false,
        }
    }
}

/// Build/check statistics, updated when `enable_stats` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeighborListStats {
    pub total_builds: usize,
    pub total_checks: usize,
    pub max_displacement: f64,
    pub num_pairs: usize,
}

impl NeighborListStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Cell-list based neighbor list with a Verlet skin.
///
/// `build` snapshots particle positions and emits every pair within
/// `cutoff + skin`; `needs_rebuild` reports when any particle has drifted
/// more than `skin / 2` from its snapshot, at which point the pair list can
/// no longer be trusted to cover the bare cutoff.
#[derive(Debug)]
pub struct NeighborList {
    cfg: NeighborListConfig,
    stats: NeighborListStats,
    pairs: Vec<NeighborPair>,
    ref_positions: Vec<Vec3>,
    cell_size: Vec3,
    nx: i32,
    ny: i32,
    nz: i32,
    cells: Vec<Vec<usize>>,
    valid: bool,
}

impl NeighborList {
    /// Create a list over the configured domain.
    ///
    /// Errors with `InvalidParam` on non-positive `cutoff` or
    /// `cell_size_factor`, negative `skin`, non-finite values, or a domain
    /// that is not strictly positive in extent on every axis.
    pub fn new(cfg: NeighborListConfig) -> Result<Self> {
        if !cfg.cutoff.is_finite() || cfg.cutoff <= 0.0 {
            return Err(Error::InvalidParam("cutoff must be finite and > 0".into()));
        }
        if !cfg.skin.is_finite() || cfg.skin < 0.0 {
            return Err(Error::InvalidParam("skin must be finite and >= 0".into()));
        }
        if !cfg.cell_size_factor.is_finite() || cfg.cell_size_factor <= 0.0 {
            return Err(Error::InvalidParam(
                "cell_size_factor must be finite and > 0".into(),
            ));
        }
        let extent = cfg.domain_max - cfg.domain_min;
        if !(extent.x > 0.0 && extent.y > 0.0 && extent.z > 0.0) {
            return Err(Error::InvalidParam(
                "domain_max must exceed domain_min on every axis".into(),
            ));
        }

        let mut list = Self {
            cfg,
            stats: NeighborListStats::default(),
            pairs: Vec::new(),
            ref_positions: Vec::new(),
            cell_size: Vec3::zero(),
            nx: 0,
            ny: 0,
            nz: 0,
            cells: Vec::new(),
            valid: false,
        };
        list.setup_grid();
        Ok(list)
    }

    /// The configuration this list was built with.
    pub fn config(&self) -> &NeighborListConfig {
        &self.cfg
    }

    /// The pair list from the most recent `build`.
    pub fn pairs(&self) -> &[NeighborPair] {
        &self.pairs
    }

    pub fn stats(&self) -> &NeighborListStats {
        &self.stats
    }

    /// Force a rebuild on the next check.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    fn setup_grid(&mut self) {
        let min_cell_size = (self.cfg.cutoff + self.cfg.skin) * self.cfg.cell_size_factor;
        let extent = self.cfg.domain_max - self.cfg.domain_min;

        // Cells exactly tile the domain; each edge is >= min_cell_size
        // unless a whole axis is shorter than one cell.
        self.nx = ((extent.x / min_cell_size) as i32).max(1);
        self.ny = ((extent.y / min_cell_size) as i32).max(1);
        self.nz = ((extent.z / min_cell_size) as i32).max(1);

        self.cell_size = Vec3::new(
            extent.x / f64::from(self.nx),
            extent.y / f64::from(self.ny),
            extent.z / f64::from(self.nz),
        );

        let total = (self.nx * self.ny * self.nz) as usize;
        self.cells.clear();
        self.cells.resize(total, Vec::new());

        log::debug!(
            "neighbor list grid {}x{}x{} ({} cells), cell_size=({:.3},{:.3},{:.3})",
            self.nx,
            self.ny,
            self.nz,
            total,
            self.cell_size.x,
            self.cell_size.y,
            self.cell_size.z
        );
    }

    fn cell_coords(&self, pos: Vec3) -> (i32, i32, i32) {
        let rel = pos - self.cfg.domain_min;
        // Positions outside the domain clamp into the boundary cells.
        let ix = ((rel.x / self.cell_size.x) as i32).clamp(0, self.nx - 1);
        let iy = ((rel.y / self.cell_size.y) as i32).clamp(0, self.ny - 1);
        let iz = ((rel.z / self.cell_size.z) as i32).clamp(0, self.nz - 1);
        (ix, iy, iz)
    }

    #[inline]
    fn cell_index(&self, ix: i32, iy: i32, iz: i32) -> usize {
        (ix + self.nx * (iy + self.ny * iz)) as usize
    }

    /// Rebuild the pair list from a position snapshot.
    ///
    /// Afterwards `pairs()` contains every `(i, j)` with `i < j` and
    /// separation strictly within `cutoff + skin`, each exactly once.
    pub fn build(&mut self, positions: &[Vec3]) {
        self.pairs.clear();
        for cell in &mut self.cells {
            cell.clear();
        }

        for (i, &p) in positions.iter().enumerate() {
            let (ix, iy, iz) = self.cell_coords(p);
            let idx = self.cell_index(ix, iy, iz);
            self.cells[idx].push(i);
        }

        self.build_pairs(positions);

        self.ref_positions.clear();
        self.ref_positions.extend_from_slice(positions);
        self.valid = true;

        if self.cfg.enable_stats {
            self.stats.total_builds += 1;
            self.stats.num_pairs = self.pairs.len();
        }

        log::debug!(
            "neighbor list rebuilt with {} pairs for {} particles",
            self.pairs.len(),
            positions.len()
        );
    }

    fn build_pairs(&mut self, positions: &[Vec3]) {
        let r_list = self.cfg.cutoff + self.cfg.skin;
        let r_list_sq = r_list * r_list;

        for iz in 0..self.nz {
            for iy in 0..self.ny {
                for ix in 0..self.nx {
                    let cell = &self.cells[self.cell_index(ix, iy, iz)];

                    // Intra-cell pairs. Cells are filled in index order, so
                    // a < b already implies i < j.
                    for (a, &i) in cell.iter().enumerate() {
                        for &j in &cell[a + 1..] {
                            let r2 = (positions[j] - positions[i]).norm2();
                            if r2 < r_list_sq {
                                self.pairs.push(NeighborPair { i, j });
                            }
                        }
                    }

                    // Half-shell of 13 neighbor offsets: each unordered pair
                    // of distinct cells is visited exactly once.
                    for dz in 0..=1 {
                        for dy in -1..=1 {
                            for dx in -1..=1 {
                                if dz == 0 && dy == 0 && dx == 0 {
                                    continue;
                                }
                                if dz == 0 && (dy < 0 || (dy == 0 && dx < 0)) {
                                    continue;
                                }

                                let (jx, jy, jz) = (ix + dx, iy + dy, iz + dz);
                                if jx < 0
                                    || jx >= self.nx
                                    || jy < 0
                                    || jy >= self.ny
                                    || jz < 0
                                    || jz >= self.nz
                                {
                                    continue;
                                }

                                let other = &self.cells[self.cell_index(jx, jy, jz)];
                                for &i in cell {
                                    for &j in other {
                                        let r2 = (positions[j] - positions[i]).norm2();
                                        if r2 < r_list_sq {
                                            // Cross-cell candidates arrive in
                                            // cell order; store index-ordered.
                                            let (i, j) = if i < j { (i, j) } else { (j, i) };
                                            self.pairs.push(NeighborPair { i, j });
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Whether the list must be rebuilt before the next force evaluation.
    ///
    /// True when the list was never built (or invalidated), the particle
    /// count changed, or any particle has moved more than `skin / 2` from
    /// its reference position.
    pub fn needs_rebuild(&mut self, positions: &[Vec3]) -> bool {
        if !self.valid {
            return true;
        }
        if self.ref_positions.len() != positions.len() {
            return true;
        }

        let mut max_disp_sq: f64 = 0.0;
        for (p, r) in positions.iter().zip(&self.ref_positions) {
            max_disp_sq = max_disp_sq.max((*p - *r).norm2());
        }

        if self.cfg.enable_stats {
            self.stats.total_checks += 1;
            self.stats.max_displacement = max_disp_sq.sqrt();
        }

        let threshold = self.cfg.skin * 0.5;
        max_disp_sq > threshold * threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_cloud(n: usize, half_extent: f64, seed: u64) -> Vec<Vec3> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                Vec3::new(
                    rng.random_range(-half_extent..=half_extent),
                    rng.random_range(-half_extent..=half_extent),
                    rng.random_range(-half_extent..=half_extent),
                )
            })
            .collect()
    }

    fn brute_force_pairs(positions: &[Vec3], radius: f64) -> Vec<(usize, usize)> {
        let r2 = radius * radius;
        let mut out = Vec::new();
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                if (positions[j] - positions[i]).norm2() < r2 {
                    out.push((i, j));
                }
            }
        }
        out
    }

    #[test]
    fn rejects_bad_config() {
        let bad = NeighborListConfig {
            cutoff: 0.0,
            ..Default::default()
        };
        assert!(NeighborList::new(bad).is_err());

        let bad = NeighborListConfig {
            skin: -0.1,
            ..Default::default()
        };
        assert!(NeighborList::new(bad).is_err());

        let bad = NeighborListConfig {
            domain_min: Vec3::new(1.0, 0.0, 0.0),
            domain_max: Vec3::new(1.0, 5.0, 5.0),
            ..Default::default()
        };
        assert!(NeighborList::new(bad).is_err());
    }

    #[test]
    fn pairs_are_ordered_unique_and_in_range() -> crate::error::Result<()> {
        let positions = random_cloud(200, 6.0, 91);
        let cfg = NeighborListConfig {
            cutoff: 2.0,
            skin: 0.4,
            ..Default::default()
        };
        let mut list = NeighborList::new(cfg)?;
        list.build(&positions);

        let r_list_sq = 2.4 * 2.4;
        let mut seen = std::collections::HashSet::new();
        for p in list.pairs() {
            assert!(p.i < p.j, "pair ({}, {}) is not ordered", p.i, p.j);
            assert!(
                seen.insert((p.i, p.j)),
                "duplicate pair ({}, {})",
                p.i,
                p.j
            );
            let r2 = (positions[p.j] - positions[p.i]).norm2();
            assert!(
                r2 < r_list_sq,
                "pair ({}, {}) separation^2 {} exceeds list range",
                p.i,
                p.j,
                r2
            );
        }
        Ok(())
    }

    #[test]
    fn matches_brute_force_at_list_radius() -> crate::error::Result<()> {
        let positions = random_cloud(300, 5.0, 1234);
        let cfg = NeighborListConfig {
            cutoff: 1.5,
            skin: 0.3,
            ..Default::default()
        };
        let mut list = NeighborList::new(cfg)?;
        list.build(&positions);

        let mut got: Vec<(usize, usize)> =
            list.pairs().iter().map(|p| (p.i, p.j)).collect();
        got.sort_unstable();
        let mut want = brute_force_pairs(&positions, 1.8);
        want.sort_unstable();
        assert_eq!(got, want, "cell-list pairs differ from all-pairs reference");
        Ok(())
    }

    #[test]
    fn covers_cutoff_even_for_out_of_domain_particles() -> crate::error::Result<()> {
        // Two particles well outside the configured domain still clamp into
        // boundary cells and pair up.
        let cfg = NeighborListConfig {
            cutoff: 1.0,
            skin: 0.2,
            domain_min: Vec3::new(-2.0, -2.0, -2.0),
            domain_max: Vec3::new(2.0, 2.0, 2.0),
            ..Default::default()
        };
        let mut list = NeighborList::new(cfg)?;
        let positions = vec![Vec3::new(10.0, 10.0, 10.0), Vec3::new(10.5, 10.0, 10.0)];
        list.build(&positions);
        assert_eq!(list.pairs(), &[NeighborPair { i: 0, j: 1 }]);
        Ok(())
    }

    #[test]
    fn rebuild_triggers_on_half_skin_displacement() -> crate::error::Result<()> {
        let cfg = NeighborListConfig {
            cutoff: 1.0,
            skin: 0.4,
            ..Default::default()
        };
        let mut list = NeighborList::new(cfg)?;
        let mut positions = vec![Vec3::zero(), Vec3::new(0.5, 0.0, 0.0)];
        list.build(&positions);
        assert!(!list.needs_rebuild(&positions));

        // Displacement just under skin/2 = 0.2: still valid.
        positions[1].x += 0.19;
        assert!(!list.needs_rebuild(&positions));

        // Past skin/2: stale.
        positions[1].x += 0.02;
        assert!(list.needs_rebuild(&positions));

        // Count change always forces a rebuild.
        list.build(&positions);
        positions.push(Vec3::new(5.0, 5.0, 5.0));
        assert!(list.needs_rebuild(&positions));
        Ok(())
    }

    #[test]
    fn invalidate_forces_rebuild() -> crate::error::Result<()> {
        let mut list = NeighborList::new(NeighborListConfig::default())?;
        let positions = vec![Vec3::zero()];
        list.build(&positions);
        assert!(!list.needs_rebuild(&positions));
        list.invalidate();
        assert!(list.needs_rebuild(&positions));
        Ok(())
    }

    #[test]
    fn rebuild_on_identical_positions_is_idempotent() -> crate::error::Result<()> {
        let positions = random_cloud(150, 4.0, 77);
        let cfg = NeighborListConfig {
            cutoff: 1.2,
            skin: 0.3,
            ..Default::default()
        };
        let mut list = NeighborList::new(cfg)?;
        list.build(&positions);
        let mut first: Vec<(usize, usize)> =
            list.pairs().iter().map(|p| (p.i, p.j)).collect();
        list.build(&positions);
        let mut second: Vec<(usize, usize)> =
            list.pairs().iter().map(|p| (p.i, p.j)).collect();
        first.sort_unstable();
        second.sort_unstable();
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn stats_track_builds_and_checks() -> crate::error::Result<()> {
        let cfg = NeighborListConfig {
            enable_stats: true,
            ..Default::default()
        };
        let mut list = NeighborList::new(cfg)?;
        let positions = vec![Vec3::zero(), Vec3::new(1.0, 0.0, 0.0)];
        list.build(&positions);
        list.build(&positions);
        let _ = list.needs_rebuild(&positions);
        assert_eq!(list.stats().total_builds, 2);
        assert_eq!(list.stats().total_checks, 1);
        assert_eq!(list.stats().num_pairs, 1);
        Ok(())
    }
}
