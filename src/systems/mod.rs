//! Physics modules driven by the scheduler.

pub mod md;
pub mod rigid_body;

pub use md::{assign_thermal_velocities, MdConfig, MdSystem};
pub use rigid_body::{RigidBodySystem, RigidBodySystemConfig};
