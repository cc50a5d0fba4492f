//! Simulation state containers shared by all systems.

pub mod particle;
pub mod rigid_body;

pub use particle::{Particle, ParticleSet};
pub use rigid_body::RigidBody;
