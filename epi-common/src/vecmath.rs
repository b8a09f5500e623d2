use serde::{Deserialize, Serialize};
use std::ops::Add;

/// A point or displacement in domain coordinates.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline(always)]
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn zero() -> Self {
        Vec2 { x: 0.0, y: 0.0 }
    }

    /// Component-wise product, used to turn a displacement in cells into
    /// physical units.
    #[inline]
    pub fn hadamard(&self, other: Vec2) -> Self {
        Vec2 { x: self.x * other.x, y: self.y * other.y }
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}
