//! Random directions and rigid rotations.

use std::f64::consts::TAU;

use glam::{DMat3, DVec3};
use rand::Rng;

/// Direction drawn uniformly from the unit sphere.
///
/// Uses Archimedes' hat-box theorem: `z` uniform in [-1, 1] and azimuth
/// uniform in [0, 2π) give a uniform point on the sphere.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> DVec3 {
    let z: f64 = rng.gen_range(-1.0..=1.0);
    let phi: f64 = rng.gen_range(0.0..TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    DVec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Angle drawn uniformly from [0, 2π).
pub fn random_angle<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..TAU)
}

/// Rotation by `angle` (radians) about unit `axis`, pivoting on `pivot`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub axis: DVec3,
    pub angle: f64,
    pub pivot: DVec3,
    matrix: DMat3,
}

impl Rotation {
    pub fn new(axis: DVec3, angle: f64, pivot: DVec3) -> Self {
        let axis = axis.normalize();
        Self {
            axis,
            angle,
            pivot,
            matrix: DMat3::from_axis_angle(axis, angle),
        }
    }

    pub fn apply(&self, point: DVec3) -> DVec3 {
        self.pivot + self.matrix * (point - self.pivot)
    }
}
