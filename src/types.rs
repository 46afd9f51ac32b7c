//! Core math types shared across all modules.
//!
//! Frame convention: right-handed, Z up.  Angles are radians, lengths are
//! scene units.  Rotations use Euler XYZ order (the one three.js-style scene
//! graphs apply by default).

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

// ---------------------------------------------------------------------------
// Vec3
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Unit vector along `axis` scaled by `amount`.
    pub fn along(axis: Axis, amount: f32) -> Self {
        match axis {
            Axis::X => Self::new(amount, 0.0, 0.0),
            Axis::Y => Self::new(0.0, amount, 0.0),
            Axis::Z => Self::new(0.0, 0.0, amount),
        }
    }

    pub fn component(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn component_mut(&mut self, axis: Axis) -> &mut f32 {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn distance(&self, other: Vec3) -> f32 {
        let d = *self - other;
        (d.x * d.x + d.y * d.y + d.z * d.z).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Axis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

// ---------------------------------------------------------------------------
// Rotation matrix
// ---------------------------------------------------------------------------

/// Row-major 3x3 rotation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis(pub [[f32; 3]; 3]);

impl Basis {
    pub const IDENTITY: Basis = Basis([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub fn about(axis: Axis, angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        match axis {
            Axis::X => Basis([[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]),
            Axis::Y => Basis([[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]]),
            Axis::Z => Basis([[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]),
        }
    }

    /// Euler XYZ: `R = Rx * Ry * Rz`.
    pub fn from_euler(euler: Vec3) -> Self {
        Basis::about(Axis::X, euler.x) * Basis::about(Axis::Y, euler.y) * Basis::about(Axis::Z, euler.z)
    }

    pub fn transform(&self, v: Vec3) -> Vec3 {
        let m = &self.0;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }
}

impl Mul for Basis {
    type Output = Basis;

    fn mul(self, rhs: Basis) -> Basis {
        let mut out = [[0.0f32; 3]; 3];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.0[r][k] * rhs.0[k][c]).sum();
            }
        }
        Basis(out)
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// Parent-relative transform of one scene node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalTransform {
    pub translation: Vec3,
    /// Euler XYZ angles in radians.
    pub rotation: Vec3,
}

impl LocalTransform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Vec3::zero(),
        }
    }

    pub fn basis(&self) -> Basis {
        Basis::from_euler(self.rotation)
    }
}

/// Transform of a node relative to the scene root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform {
    pub position: Vec3,
    pub basis: Basis,
}

impl GlobalTransform {
    pub const IDENTITY: GlobalTransform = GlobalTransform {
        position: Vec3::zero(),
        basis: Basis::IDENTITY,
    };

    /// Compose `self` (parent) with a child's local transform.
    pub fn then(&self, local: &LocalTransform) -> GlobalTransform {
        GlobalTransform {
            position: self.position + self.basis.transform(local.translation),
            basis: self.basis * local.basis(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
