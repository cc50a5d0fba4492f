//! Minerva: a deterministic multi-physics engine for rigid sphere bodies and
//! Lennard-Jones point particles.
//!
//! The engine centers on a [`World`] holding the global clock, gravity, and
//! the state containers, plus a [`Scheduler`](scheduler::Scheduler) that
//! drives registered [`System`](scheduler::System)s in order with per-system
//! substep counts. Two systems form the core: an impulse-based rigid sphere
//! contact solver and a velocity-Verlet molecular-dynamics integrator backed
//! by a cell-list neighbor structure.

pub mod error;
pub mod io;
pub mod math;
pub mod overlap;
pub mod scheduler;
pub mod spatial;
pub mod state;
pub mod systems;
pub mod world;

pub use error::{Error, Result};
pub use math::Vec3;
pub use scheduler::{Scheduler, System};
pub use spatial::{NeighborList, NeighborListConfig, NeighborListStats, NeighborPair};
pub use state::{Particle, ParticleSet, RigidBody};
pub use systems::{MdConfig, MdSystem, RigidBodySystem, RigidBodySystemConfig};
pub use world::World;

#[cfg(feature = "python")]
mod python {
    use crate::systems::{MdConfig, MdSystem, RigidBodySystem, RigidBodySystemConfig};
    use crate::{Particle, RigidBody, Vec3, World};
    use numpy::ndarray::Array2;
    use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    fn py_err<E: ToString>(e: E) -> PyErr {
        PyValueError::new_err(e.to_string())
    }

    fn vec3_from(v: [f64; 3]) -> Vec3 {
        Vec3::new(v[0], v[1], v[2])
    }

    fn array_from<'a, I: Iterator<Item = &'a Vec3>>(n: usize, it: I) -> Array2<f64> {
        let mut arr = Array2::<f64>::zeros((n, 3));
        for (i, v) in it.enumerate() {
            arr[[i, 0]] = v.x;
            arr[[i, 1]] = v.y;
            arr[[i, 2]] = v.z;
        }
        arr
    }

    /// Minerva Python-facing wrapper around the Rust world.
    ///
    /// Scene builders append bodies and particles, register the built-in
    /// systems, and step the clock; state comes back as NumPy arrays.
    #[pyclass(name = "World")]
    pub struct PyWorld {
        world: World,
    }

    #[pymethods]
    impl PyWorld {
        /// Empty world at time zero with standard gravity along -Y.
        #[new]
        fn new() -> Self {
            Self {
                world: World::new(),
            }
        }

        /// Current simulation time.
        fn time(&self) -> f64 {
            self.world.time
        }

        /// Set the gravity vector [gx, gy, gz].
        fn set_gravity(&mut self, g: [f64; 3]) {
            self.world.gravity = vec3_from(g);
        }

        /// Append a rigid sphere; returns its index.
        #[pyo3(signature = (position, velocity=[0.0, 0.0, 0.0], mass=1.0, radius=0.5, kinematic=false))]
        fn add_rigid_body(
            &mut self,
            position: [f64; 3],
            velocity: [f64; 3],
            mass: f64,
            radius: f64,
            kinematic: bool,
        ) -> usize {
            self.world.rigid_bodies.push(RigidBody {
                position: vec3_from(position),
                velocity: vec3_from(velocity),
                mass,
                radius,
                kinematic,
            });
            self.world.rigid_bodies.len() - 1
        }

        /// Append a point particle; returns its index.
        #[pyo3(signature = (position, velocity=[0.0, 0.0, 0.0], mass=1.0))]
        fn add_particle(&mut self, position: [f64; 3], velocity: [f64; 3], mass: f64) -> usize {
            self.world.md_particles.push(Particle {
                position: vec3_from(position),
                velocity: vec3_from(velocity),
                mass,
            });
            self.world.md_particles.len() - 1
        }

        /// Register the rigid-body contact solver.
        #[pyo3(signature = (substeps=1, restitution=0.5, ground_y=0.0))]
        fn add_rigid_body_system(
            &mut self,
            substeps: u32,
            restitution: f64,
            ground_y: f64,
        ) -> PyResult<()> {
            let cfg = RigidBodySystemConfig {
                restitution,
                ground_y,
                ..Default::default()
            };
            let system = RigidBodySystem::new(cfg).map_err(py_err)?;
            self.world
                .scheduler
                .register(Box::new(system), substeps)
                .map_err(py_err)
        }

        /// Register the molecular-dynamics integrator.
        #[pyo3(signature = (substeps=1, epsilon=1.0, sigma=1.0, rcut_sigma=2.5, nvt=false, temp=1.0, tau_thermo=1.0))]
        #[allow(clippy::too_many_arguments)]
        fn add_md_system(
            &mut self,
            substeps: u32,
            epsilon: f64,
            sigma: f64,
            rcut_sigma: f64,
            nvt: bool,
            temp: f64,
            tau_thermo: f64,
        ) -> PyResult<()> {
            let cfg = MdConfig {
                epsilon,
                sigma,
                rcut_sigma,
                nvt,
                temp,
                tau_thermo,
                ..Default::default()
            };
            let system = MdSystem::new(cfg).map_err(py_err)?;
            self.world
                .scheduler
                .register(Box::new(system), substeps)
                .map_err(py_err)
        }

        /// Advance the world by one tick (releases the GIL during
        /// computation).
        fn step(&mut self, py: Python<'_>, dt: f64) -> PyResult<()> {
            if !dt.is_finite() || dt <= 0.0 {
                return Err(py_err("dt must be finite and > 0"));
            }
            py.detach(|| self.world.step(dt));
            Ok(())
        }

        /// Rigid body positions as an (N, 3) float64 array.
        fn get_body_positions<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
            let n = self.world.rigid_bodies.len();
            let arr = array_from(n, self.world.rigid_bodies.iter().map(|b| &b.position));
            Ok(arr.into_pyarray(py).to_owned().into())
        }

        /// Rigid body velocities as an (N, 3) float64 array.
        fn get_body_velocities<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
            let n = self.world.rigid_bodies.len();
            let arr = array_from(n, self.world.rigid_bodies.iter().map(|b| &b.velocity));
            Ok(arr.into_pyarray(py).to_owned().into())
        }

        /// Particle positions as an (N, 3) float64 array.
        fn get_particle_positions<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
            let n = self.world.md_particles.len();
            let arr = array_from(n, self.world.md_particles.iter().map(|p| &p.position));
            Ok(arr.into_pyarray(py).to_owned().into())
        }

        /// Particle velocities as an (N, 3) float64 array.
        fn get_particle_velocities<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
            let n = self.world.md_particles.len();
            let arr = array_from(n, self.world.md_particles.iter().map(|p| &p.velocity));
            Ok(arr.into_pyarray(py).to_owned().into())
        }

        /// Set all particle velocities from an (N, 3) float64 array.
        fn set_particle_velocities<'py>(
            &mut self,
            velocities: PyReadonlyArray2<'py, f64>,
        ) -> PyResult<()> {
            let arr = velocities.as_array();
            let n = self.world.md_particles.len();
            if arr.shape() != [n, 3] {
                return Err(py_err(format!(
                    "velocities must have shape ({n}, 3), got {:?}",
                    arr.shape()
                )));
            }
            for (i, p) in self.world.md_particles.iter_mut().enumerate() {
                let v = Vec3::new(arr[[i, 0]], arr[[i, 1]], arr[[i, 2]]);
                if !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()) {
                    return Err(py_err("velocity values must be finite"));
                }
                p.velocity = v;
            }
            Ok(())
        }

        /// Run the overlap pre-pass on the rigid bodies.
        #[pyo3(signature = (max_iterations=100))]
        fn resolve_overlaps(&mut self, max_iterations: usize) -> usize {
            crate::overlap::resolve_overlaps(&mut self.world.rigid_bodies, max_iterations)
        }
    }

    /// The minerva Python module entry point.
    #[pymodule]
    fn minerva(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<PyWorld>()?;
        Ok(())
    }
}
