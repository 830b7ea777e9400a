use serde::{Deserialize, Serialize};
use std::ops::Sub;

/// 2D position on the sky map
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    #[inline]
    pub fn length_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn distance_to(&self, other: Vec2) -> f32 {
        (*self - other).length()
    }

    #[inline]
    pub fn distance_sq_to(&self, other: Vec2) -> f32 {
        (*self - other).length_sq()
    }

    /// Clamp both components into `[min, max]`.
    ///
    /// Non-finite components collapse to `min` so a bad oracle or save file
    /// can never place a body off the map.
    pub fn clamp_components(&self, min: f32, max: f32) -> Self {
        let clamp = |v: f32| if v.is_finite() { v.clamp(min, max) } else { min };
        Self {
            x: clamp(self.x),
            y: clamp(self.y),
        }
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-3;

    #[test]
    fn test_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(50.0, 50.0);
        assert!((a.distance_to(b) - 70.710_68).abs() < EPSILON);
        assert!((a.distance_sq_to(b) - 5000.0).abs() < EPSILON);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Vec2::new(12.5, 900.0);
        let b = Vec2::new(640.0, 3.25);
        assert_eq!(a.distance_sq_to(b), b.distance_sq_to(a));
    }

    #[test]
    fn test_clamp_components() {
        let v = Vec2::new(-20.0, 1200.0).clamp_components(0.0, 1000.0);
        assert_eq!(v, Vec2::new(0.0, 1000.0));

        let inside = Vec2::new(10.0, 20.0);
        assert_eq!(inside.clamp_components(0.0, 1000.0), inside);
    }

    #[test]
    fn test_clamp_non_finite() {
        let v = Vec2::new(f32::NAN, f32::INFINITY).clamp_components(0.0, 1000.0);
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn test_sub() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(3.0, 5.0);
        assert_eq!(b - a, Vec2::new(2.0, 3.0));
        assert_eq!(a - a, Vec2::ZERO);
    }
}
