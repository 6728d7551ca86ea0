use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// 2D point or vector in device pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    #[inline]
    pub fn dot(self, rhs: Vec2) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// Z component of the 3D cross product (perp-dot).
    #[inline]
    pub fn cross(self, rhs: Vec2) -> f32 {
        self.x * rhs.y - self.y * rhs.x
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Rescales to length `len`. The zero vector stays zero.
    #[inline]
    pub fn with_length(self, len: f32) -> Vec2 {
        let d = self.length();
        if d == 0.0 {
            return Vec2::zero();
        }
        self * (len / d)
    }

    /// Rotation by 90° clockwise in a y-down space.
    #[inline]
    pub fn rot90_cw(self) -> Vec2 {
        Vec2::new(self.y, -self.x)
    }

    /// Rotation by 90° counter-clockwise in a y-down space.
    #[inline]
    pub fn rot90_ccw(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    /// Rotation by `angle` radians about the origin.
    #[inline]
    pub fn rotate(self, angle: f32) -> Vec2 {
        let (sin, cos) = angle.sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Cosine of the angle between `self` and `rhs`.
    #[inline]
    pub fn cos_angle(self, rhs: Vec2) -> f32 {
        let n = self.length() * rhs.length();
        if n == 0.0 {
            return 1.0;
        }
        (self.dot(rhs) / n).clamp(-1.0, 1.0)
    }

    #[inline]
    pub fn lerp(self, rhs: Vec2, t: f32) -> Vec2 {
        Vec2::new(
            (1.0 - t) * self.x + t * rhs.x,
            (1.0 - t) * self.y + t * rhs.y,
        )
    }

    #[inline]
    pub fn min(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x.min(rhs.x), self.y.min(rhs.y))
    }

    #[inline]
    pub fn max(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x.max(rhs.x), self.y.max(rhs.y))
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotations_are_inverse() {
        let v = Vec2::new(3.0, -2.0);
        assert_eq!(v.rot90_cw().rot90_ccw(), v);
        assert_eq!(v.rot90_cw().dot(v), 0.0);
    }

    #[test]
    fn with_length_keeps_zero() {
        assert_eq!(Vec2::zero().with_length(5.0), Vec2::zero());
        let v = Vec2::new(3.0, 4.0).with_length(10.0);
        assert!((v.x - 6.0).abs() < 1e-5 && (v.y - 8.0).abs() < 1e-5);
    }

    #[test]
    fn rotate_quarter_turn_matches_rot90_ccw() {
        let v = Vec2::new(1.0, 0.0).rotate(core::f32::consts::FRAC_PI_2);
        assert!((v.x - 0.0).abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }
}
