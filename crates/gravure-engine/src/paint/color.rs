/// Straight-alpha sRGB color with 8-bit channels.
///
/// This is the form colors take in an operation list.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Srgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Srgba {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    #[inline]
    pub fn is_opaque(self) -> bool {
        self.a == 0xff
    }
}

/// Linear premultiplied RGBA color.
///
/// Invariant:
/// - `rgb` components are multiplied by `a`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32, // premultiplied
    pub g: f32, // premultiplied
    pub b: f32, // premultiplied
    pub a: f32,
}

impl Color {
    #[inline]
    pub const fn transparent() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 }
    }

    /// Creates a premultiplied linear color from straight sRGB bytes.
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        let a = a as f32 / 255.0;
        Self {
            r: srgb_to_linear(r as f32 / 255.0) * a,
            g: srgb_to_linear(g as f32 / 255.0) * a,
            b: srgb_to_linear(b as f32 / 255.0) * a,
            a,
        }
    }

    #[inline]
    pub fn from_srgba(c: Srgba) -> Self {
        Self::from_srgb_u8(c.r, c.g, c.b, c.a)
    }

    /// Creates a color from premultiplied linear components.
    #[inline]
    pub const fn from_premul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Returns a straight-alpha representation. For `a == 0`, RGB is 0.
    #[inline]
    pub fn to_straight(self) -> (f32, f32, f32, f32) {
        if self.a <= 0.0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let inv = 1.0 / self.a;
            (self.r * inv, self.g * inv, self.b * inv, self.a)
        }
    }

    /// Converts back to straight-alpha sRGB bytes.
    pub fn to_srgba(self) -> Srgba {
        let (r, g, b, a) = self.to_straight();
        Srgba {
            r: unit_to_u8(linear_to_srgb(r)),
            g: unit_to_u8(linear_to_srgb(g)),
            b: unit_to_u8(linear_to_srgb(b)),
            a: unit_to_u8(a),
        }
    }

    /// Same hue with alpha forced to 1.
    #[inline]
    pub fn opaque(self) -> Self {
        let (r, g, b, _) = self.to_straight();
        Self { r, g, b, a: 1.0 }
    }

    /// Packs into linear premultiplied 8-bit channels, `[r, g, b, a]`.
    ///
    /// Color channels never exceed alpha after rounding.
    pub fn to_premul_u8(self) -> [u8; 4] {
        let a = unit_to_u8(self.a);
        let ch = |c: f32| unit_to_u8(c).min(a);
        [ch(self.r), ch(self.g), ch(self.b), a]
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    /// Debug-only validation that RGB channels do not exceed alpha.
    #[inline]
    pub fn debug_assert_premul(self) {
        debug_assert!(
            self.r <= self.a + f32::EPSILON
                && self.g <= self.a + f32::EPSILON
                && self.b <= self.a + f32::EPSILON,
            "Color::debug_assert_premul: {self:?} looks like straight alpha"
        );
    }
}

impl From<Srgba> for Color {
    #[inline]
    fn from(c: Srgba) -> Self {
        Color::from_srgba(c)
    }
}

/// sRGB transfer function, decode direction.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB transfer function, encode direction.
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premul_bytes_never_exceed_alpha() {
        for c in 0..=255u8 {
            for a in 0..=255u8 {
                let p = Color::from_srgb_u8(c, 0, 0, a).to_premul_u8();
                assert_eq!(p[3], a);
                assert!(p[0] <= p[3], "r={c} a={a}: {p:?}");
            }
        }
    }

    #[test]
    fn srgba_round_trips_through_linear() {
        for c in 0..=255u8 {
            for a in [0u8, 1, 0x50, 0x80, 0xfe, 0xff] {
                let want = if a == 0 { Srgba::new(0, 0, 0, 0) } else { Srgba::new(c, 0, 0, a) };
                let got = Color::from_srgb_u8(c, 0, 0, a).to_srgba();
                assert_eq!(got, want);
            }
        }
    }

    #[test]
    fn opaque_unpremultiplies() {
        let c = Color::from_srgb_u8(255, 0, 0, 128).opaque();
        assert_eq!(c.a, 1.0);
        assert!((c.r - 1.0).abs() < 1e-5);
    }
}
