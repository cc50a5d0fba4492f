//! Scene overlap pre-pass.
//!
//! The contact solver assumes scenes start close to non-overlapping; deeply
//! interpenetrating initial placements produce expanding stacks. Scene
//! builders run this pass once before the first tick.

use crate::state::RigidBody;

/// Extra separation targeted when pushing bodies apart.
const SEPARATION_BUFFER: f64 = 1e-3;
/// Convergence threshold on the largest overlap in a pass.
const CONVERGENCE_TOL: f64 = 1e-6;

/// Count sphere pairs overlapping by more than `tolerance`.
///
/// Logs a warning with the worst offender; overlapping starts are legal but
/// produce visibly poor dynamics.
pub fn count_overlaps(bodies: &[RigidBody], tolerance: f64) -> usize {
    let mut count = 0;
    let mut max_overlap: f64 = 0.0;

    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            let (a, b) = (&bodies[i], &bodies[j]);
            let dist = (b.position - a.position).norm();
            let overlap = a.radius + b.radius - dist;
            if overlap > tolerance {
                count += 1;
                max_overlap = max_overlap.max(overlap);
            }
        }
    }

    if count > 0 {
        log::warn!("found {count} overlapping sphere pairs (max overlap {max_overlap:.6})");
    }
    count
}

/// Iteratively push overlapping spheres apart along their center line.
///
/// Both sides move by half the overlap when both are dynamic; the sole
/// dynamic side moves by the full overlap when the other is immovable.
/// Stops when the largest overlap in a pass drops below `1e-6` or after
/// `max_iterations` passes. Returns the number of passes executed.
pub fn resolve_overlaps(bodies: &mut [RigidBody], max_iterations: usize) -> usize {
    for iter in 0..max_iterations {
        let mut max_overlap: f64 = 0.0;

        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let (head, tail) = bodies.split_at_mut(j);
                let a = &mut head[i];
                let b = &mut tail[0];

                let d = b.position - a.position;
                let dist = d.norm2().max(1e-16).sqrt();
                let min_dist = a.radius + b.radius + SEPARATION_BUFFER;
                let overlap = min_dist - dist;
                if overlap <= CONVERGENCE_TOL {
                    continue;
                }
                max_overlap = max_overlap.max(overlap);

                let n = d / dist;
                match (a.is_dynamic(), b.is_dynamic()) {
                    (true, true) => {
                        let correction = n * (overlap * 0.5);
                        a.position -= correction;
                        b.position += correction;
                    }
                    (true, false) => a.position -= n * overlap,
                    (false, true) => b.position += n * overlap,
                    (false, false) => {}
                }
            }
        }

        if max_overlap < CONVERGENCE_TOL {
            log::debug!("overlap pre-pass converged in {} passes", iter + 1);
            return iter + 1;
        }
    }

    log::warn!("overlap pre-pass did not converge after {max_iterations} passes");
    max_iterations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn sphere(x: f64, y: f64, radius: f64) -> RigidBody {
        let mut rb = RigidBody::at(Vec3::new(x, y, 0.0));
        rb.radius = radius;
        rb
    }

    #[test]
    fn counts_overlapping_pairs() {
        let bodies = vec![sphere(0.0, 0.0, 0.5), sphere(0.6, 0.0, 0.5), sphere(5.0, 0.0, 0.5)];
        assert_eq!(count_overlaps(&bodies, 1e-6), 1);
    }

    #[test]
    fn resolves_a_cluster() {
        let mut bodies = vec![
            sphere(0.0, 0.0, 0.5),
            sphere(0.2, 0.0, 0.5),
            sphere(0.0, 0.3, 0.5),
        ];
        resolve_overlaps(&mut bodies, 100);
        assert_eq!(count_overlaps(&bodies, 1e-6), 0);
    }

    #[test]
    fn clean_scene_is_a_no_op() {
        let mut bodies = vec![sphere(0.0, 0.0, 0.5), sphere(3.0, 0.0, 0.5)];
        let before: Vec<Vec3> = bodies.iter().map(|b| b.position).collect();
        let passes = resolve_overlaps(&mut bodies, 100);
        assert_eq!(passes, 1);
        for (rb, p) in bodies.iter().zip(&before) {
            assert!((rb.position - *p).norm() <= 1e-9, "clean scene moved a body");
        }
    }

    #[test]
    fn kinematic_side_stays_put() {
        let mut anchor = sphere(0.0, 0.0, 0.5);
        anchor.kinematic = true;
        let mut bodies = vec![anchor, sphere(0.4, 0.0, 0.5)];
        resolve_overlaps(&mut bodies, 100);
        assert_eq!(bodies[0].position, Vec3::zero());
        assert!(count_overlaps(&bodies, 1e-6) == 0);
        // The dynamic body absorbed the full correction.
        assert!(bodies[1].position.x >= 1.0);
    }
}
