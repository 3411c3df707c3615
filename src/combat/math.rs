//! 2D vector math for the combat arena

use std::f32::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Squared speed above which a unit counts as moving
pub const MOVING_EPSILON_SQ: f32 = 0.001;

/// Position or direction in arena space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const RIGHT: Vec2 = Vec2 { x: 1.0, y: 0.0 };
    pub const LEFT: Vec2 = Vec2 { x: -1.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Unit vector in the same direction, or zero for a zero vector
    pub fn normalize(self) -> Vec2 {
        let len = self.length();
        if len == 0.0 || !len.is_finite() {
            return Vec2::ZERO;
        }
        Vec2::new(self.x / len, self.y / len)
    }

    pub fn distance_sq(self, other: Vec2) -> f32 {
        (self - other).length_sq()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        self.distance_sq(other).sqrt()
    }

    /// Angle of the vector in radians, measured from +x
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Rotate counter-clockwise by `radians`
    pub fn rotate(self, radians: f32) -> Vec2 {
        let (sin, cos) = radians.sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Wrap an angle into (-π, π]
pub fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped += TAU;
    }
    wrapped
}

/// Signed angle from `from` to `to`, wrapped into (-π, π]
pub fn angle_between(from: Vec2, to: Vec2) -> f32 {
    wrap_angle(to.angle() - from.angle())
}

/// Check overlap of two circles (inclusive)
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    let combined = radius_a + radius_b;
    a.distance_sq(b) <= combined * combined
}

/// Axis-aligned arena rectangle anchored at the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaBounds {
    pub width: f32,
    pub height: f32,
}

impl ArenaBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Clamp a circle of `radius` so it stays fully inside the arena
    pub fn clamp_circle(&self, position: Vec2, radius: f32) -> Vec2 {
        let max_x = (self.width - radius).max(radius);
        let max_y = (self.height - radius).max(radius);
        Vec2::new(position.x.clamp(radius, max_x), position.y.clamp(radius, max_y))
    }

    /// Whether a point lies inside the arena (edges included)
    pub fn contains(&self, position: Vec2) -> bool {
        position.x >= 0.0 && position.x <= self.width && position.y >= 0.0 && position.y <= self.height
    }
}

impl Default for ArenaBounds {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 400.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn normalize_zero_stays_zero() {
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
        let n = Vec2::new(3.0, 4.0).normalize();
        assert!(approx(n.x, 0.6) && approx(n.y, 0.8));
    }

    #[test]
    fn wrap_angle_range() {
        assert!(approx(wrap_angle(PI), PI));
        assert!(approx(wrap_angle(-PI), PI));
        assert!(approx(wrap_angle(3.0 * PI / 2.0), -PI / 2.0));
        assert!(approx(wrap_angle(0.25), 0.25));
    }

    #[test]
    fn angle_between_behind_is_pi() {
        let delta = angle_between(Vec2::RIGHT, Vec2::LEFT);
        assert!(approx(delta.abs(), PI));
        let quarter = angle_between(Vec2::RIGHT, Vec2::new(0.0, 1.0));
        assert!(approx(quarter, PI / 2.0));
    }

    #[test]
    fn rotate_quarter_turn() {
        let r = Vec2::RIGHT.rotate(PI / 2.0);
        assert!(approx(r.x, 0.0) && approx(r.y, 1.0));
    }

    #[test]
    fn clamp_keeps_hitbox_inside() {
        let bounds = ArenaBounds::new(600.0, 400.0);
        let clamped = bounds.clamp_circle(Vec2::new(-50.0, 1000.0), 10.0);
        assert_eq!(clamped, Vec2::new(10.0, 390.0));
    }

    #[test]
    fn circle_overlap_is_inclusive() {
        assert!(circles_overlap(Vec2::ZERO, 5.0, Vec2::new(15.0, 0.0), 10.0));
        assert!(!circles_overlap(Vec2::ZERO, 5.0, Vec2::new(15.1, 0.0), 10.0));
    }
}
