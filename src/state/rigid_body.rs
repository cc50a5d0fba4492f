use crate::math::Vec3;

/// A rigid sphere body.
///
/// Kinematic bodies are externally scripted: the solver treats them as
/// infinite mass and never integrates or corrects them. Bodies with
/// non-positive mass are likewise immovable.
#[derive(Debug, Clone, Copy)]
pub struct RigidBody {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Mass; non-positive means immovable.
    pub mass: f64,
    /// Sphere radius; must be strictly positive when stepped.
    pub radius: f64,
    /// Externally scripted body, ignored by dynamics.
    pub kinematic: bool,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            position: Vec3::zero(),
            velocity: Vec3::zero(),
            mass: 1.0,
            radius: 0.5,
            kinematic: false,
        }
    }
}

impl RigidBody {
    /// Dynamic body of unit mass at `position`, at rest.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// True when collision response may move this body.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        !self.kinematic && self.mass > 0.0
    }
}
