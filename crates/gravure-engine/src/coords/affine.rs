use core::ops::Mul;

use super::{IVec2, Rect, Vec2};

/// 2D affine transform.
///
/// Maps `(x, y)` to `(sx·x + hx·y + ox, hy·x + sy·y + oy)`.
///
/// Composition follows matrix order: `a * b` applies `b` first, then `a`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine2D {
    pub sx: f32,
    pub hx: f32,
    pub ox: f32,
    pub hy: f32,
    pub sy: f32,
    pub oy: f32,
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2D {
    pub const IDENTITY: Affine2D = Affine2D::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);

    #[inline]
    pub const fn new(sx: f32, hx: f32, ox: f32, hy: f32, sy: f32, oy: f32) -> Self {
        Self { sx, hx, ox, hy, sy, oy }
    }

    #[inline]
    pub const fn translation(v: Vec2) -> Self {
        Self::new(1.0, 0.0, v.x, 0.0, 1.0, v.y)
    }

    /// Scaling by `factor` about `origin`.
    pub fn scaling(origin: Vec2, factor: Vec2) -> Self {
        Self::new(
            factor.x,
            0.0,
            origin.x - origin.x * factor.x,
            0.0,
            factor.y,
            origin.y - origin.y * factor.y,
        )
    }

    /// Rotation by `radians` about `origin`.
    pub fn rotation(origin: Vec2, radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::translation(origin)
            * Self::new(cos, -sin, 0.0, sin, cos, 0.0)
            * Self::translation(-origin)
    }

    /// Appends a translation applied after `self`.
    #[inline]
    pub fn offset(self, v: Vec2) -> Self {
        Self { ox: self.ox + v.x, oy: self.oy + v.y, ..self }
    }

    #[inline]
    pub fn is_identity(self) -> bool {
        self == Self::IDENTITY
    }

    #[inline]
    pub fn transform_point(self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.sx * p.x + self.hx * p.y + self.ox,
            self.hy * p.x + self.sy * p.y + self.oy,
        )
    }

    /// Transforms a direction, ignoring translation.
    #[inline]
    pub fn transform_vector(self, v: Vec2) -> Vec2 {
        Vec2::new(self.sx * v.x + self.hx * v.y, self.hy * v.x + self.sy * v.y)
    }

    #[inline]
    pub fn determinant(self) -> f32 {
        self.sx * self.sy - self.hx * self.hy
    }

    /// False for a singular matrix, whose `invert` is meaningless.
    #[inline]
    pub fn is_invertible(self) -> bool {
        let det = self.determinant();
        det != 0.0 && det.is_finite()
    }

    /// Inverse transform. A singular matrix inverts to the identity; callers
    /// that test geometry against the result check `is_invertible` first.
    pub fn invert(self) -> Self {
        if self.hx == 0.0 && self.hy == 0.0 && self.sx != 0.0 && self.sy != 0.0 {
            let sx = 1.0 / self.sx;
            let sy = 1.0 / self.sy;
            return Self::new(sx, 0.0, -self.ox * sx, 0.0, sy, -self.oy * sy);
        }
        let det = self.determinant();
        if det == 0.0 {
            return Self::IDENTITY;
        }
        let inv = 1.0 / det;
        let sx = self.sy * inv;
        let hx = -self.hx * inv;
        let hy = -self.hy * inv;
        let sy = self.sx * inv;
        Self::new(
            sx,
            hx,
            -(sx * self.ox + hx * self.oy),
            hy,
            sy,
            -(hy * self.ox + sy * self.oy),
        )
    }

    /// Axis-aligned bounds of the transformed rectangle.
    pub fn transform_rect(self, r: Rect) -> Rect {
        let [a, b, c, d] = r.corners().map(|p| self.transform_point(p));
        Rect::from_min_max(a.min(b).min(c).min(d), a.max(b).max(c).max(d))
    }

    /// Splits the translation into a whole-pixel part and the remainder.
    ///
    /// The returned transform keeps the linear part and has offsets in `[0, 1)`.
    pub fn split_offset(self) -> (Self, IVec2) {
        let ix = self.ox.floor();
        let iy = self.oy.floor();
        let frac = Self { ox: self.ox - ix, oy: self.oy - iy, ..self };
        (frac, IVec2::new(ix as i32, iy as i32))
    }

    /// Raw bit patterns, suitable as a hash key.
    #[inline]
    pub fn to_bits(self) -> [u32; 6] {
        [self.sx, self.hx, self.ox, self.hy, self.sy, self.oy].map(f32::to_bits)
    }
}

impl Mul for Affine2D {
    type Output = Affine2D;

    fn mul(self, b: Affine2D) -> Affine2D {
        let a = self;
        Affine2D::new(
            a.sx * b.sx + a.hx * b.hy,
            a.sx * b.hx + a.hx * b.sy,
            a.sx * b.ox + a.hx * b.oy + a.ox,
            a.hy * b.sx + a.sy * b.hy,
            a.hy * b.hx + a.sy * b.sy,
            a.hy * b.ox + a.sy * b.oy + a.oy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn mul_applies_right_operand_first() {
        let scale = Affine2D::scaling(Vec2::zero(), Vec2::new(2.0, 2.0));
        let shift = Affine2D::translation(Vec2::new(10.0, 0.0));
        let p = Vec2::new(1.0, 1.0);
        assert_eq!((shift * scale).transform_point(p), Vec2::new(12.0, 2.0));
        assert_eq!((scale * shift).transform_point(p), Vec2::new(22.0, 2.0));
    }

    #[test]
    fn invert_round_trips_general_matrix() {
        let t = Affine2D::rotation(Vec2::new(3.0, 4.0), 0.7).offset(Vec2::new(-5.0, 2.5));
        let p = Vec2::new(7.0, -1.0);
        assert!(approx(t.invert().transform_point(t.transform_point(p)), p));
        assert!(approx((t * t.invert()).transform_point(p), p));
    }

    #[test]
    fn singular_inverts_to_identity() {
        let t = Affine2D::new(0.0, 0.0, 3.0, 0.0, 0.0, 4.0);
        assert!(t.invert().is_identity());
        assert!(!t.is_invertible());
        assert!(Affine2D::rotation(Vec2::new(3.0, 1.0), 0.7).is_invertible());
    }

    #[test]
    fn split_offset_keeps_fraction_in_unit_range() {
        let (frac, whole) = Affine2D::translation(Vec2::new(-2.25, 7.5)).split_offset();
        assert_eq!(whole, IVec2::new(-3, 7));
        assert_eq!(frac.ox, 0.75);
        assert_eq!(frac.oy, 0.5);
    }

    #[test]
    fn transform_rect_bounds_rotated_square() {
        let t = Affine2D::rotation(Vec2::zero(), core::f32::consts::FRAC_PI_4);
        let b = t.transform_rect(Rect::new(-1.0, -1.0, 1.0, 1.0));
        let s = core::f32::consts::SQRT_2;
        assert!(approx(b.min, Vec2::new(-s, -s)));
        assert!(approx(b.max, Vec2::new(s, s)));
    }
}
