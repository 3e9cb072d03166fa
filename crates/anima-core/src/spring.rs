//! Spring Simulator - damped harmonic oscillator for secondary jiggle
//!
//! Hooke's law toward a target plus velocity damping, integrated with
//! semi-implicit Euler (velocity first, then position).

use crate::Vec3;

/// 3D damped spring
#[derive(Debug, Clone)]
pub struct SpringSimulator {
    position: Vec3,
    velocity: Vec3,
    target: Vec3,

    /// Restoring force per unit displacement
    pub stiffness: f32,

    /// Velocity damping coefficient
    pub damping: f32,

    pub mass: f32,
}

impl Default for SpringSimulator {
    fn default() -> Self {
        Self::new(120.0, 10.0, 1.0)
    }
}

impl SpringSimulator {
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            target: Vec3::ZERO,
            stiffness,
            damping,
            mass: mass.max(1e-4),
        }
    }

    /// Advance by `dt` with an external force acting on the mass
    pub fn update(&mut self, dt: f32, input_force: Vec3) {
        // F = -k (x - target) - c v + input
        let displacement = self.position - self.target;
        let spring_force = displacement * -self.stiffness;
        let damping_force = self.velocity * -self.damping;
        let force = spring_force + damping_force + input_force;

        let acceleration = force * (1.0 / self.mass);
        self.velocity += acceleration * dt;
        self.position += self.velocity * dt;
    }

    /// Move the rest point and advance with no external force
    pub fn update_toward(&mut self, dt: f32, target: Vec3) {
        self.target = target;
        self.update(dt, Vec3::ZERO);
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn offset(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn reset(&mut self) {
        self.position = Vec3::ZERO;
        self.velocity = Vec3::ZERO;
        self.target = Vec3::ZERO;
    }
}
