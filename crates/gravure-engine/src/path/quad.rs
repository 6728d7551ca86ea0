//! Quadratic Bézier helpers shared by path building, stroking and dashing.

use crate::coords::Vec2;

/// Quadratic Bézier segment. Straight lines put `ctrl` at the midpoint.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct QuadSegment {
    pub from: Vec2,
    pub ctrl: Vec2,
    pub to: Vec2,
}

impl QuadSegment {
    #[inline]
    pub const fn new(from: Vec2, ctrl: Vec2, to: Vec2) -> Self {
        Self { from, ctrl, to }
    }

    #[inline]
    pub fn line(from: Vec2, to: Vec2) -> Self {
        Self { from, ctrl: (from + to) * 0.5, to }
    }

    /// Point at parameter `t`: `(1-t)²·P0 + 2(1-t)t·P1 + t²·P2`.
    pub fn sample(&self, t: f32) -> Vec2 {
        let t1 = 1.0 - t;
        self.from * (t1 * t1) + self.ctrl * (2.0 * t1 * t) + self.to * (t * t)
    }

    /// First derivative: `2(1-t)(P1-P0) + 2t(P2-P1)`.
    pub fn d1(&self, t: f32) -> Vec2 {
        (self.ctrl - self.from) * (2.0 * (1.0 - t)) + (self.to - self.ctrl) * (2.0 * t)
    }

    /// Second derivative, constant along the curve: `2(P2 - 2P1 + P0)`.
    pub fn d2(&self) -> Vec2 {
        (self.to - self.ctrl * 2.0 + self.from) * 2.0
    }

    /// Signed curvature radius at `t`, or NaN where the segment is line-like.
    ///
    /// Negative when the curve bends clockwise.
    pub fn curvature(&self, t: f32) -> f32 {
        let d1 = self.d1(t);
        let a = d1.cross(self.d2()) as f64;
        if a.abs() < 1e-10 {
            return f32::NAN;
        }
        ((d1.dot(d1) as f64).powf(1.5) / a) as f32
    }

    /// Splits at `t` into the part before and the part after.
    pub fn split(&self, t: f32) -> (QuadSegment, QuadSegment) {
        let mid = self.sample(t);
        (
            QuadSegment::new(self.from, self.from.lerp(self.ctrl, t), mid),
            QuadSegment::new(mid, self.ctrl.lerp(self.to, t), self.to),
        )
    }

    /// Sub-curve between parameters `t0 < t1`.
    pub fn sub(&self, t0: f32, t1: f32) -> QuadSegment {
        let (_, tail) = self.split(t0);
        if t0 >= 1.0 {
            return tail;
        }
        let (head, _) = tail.split((t1 - t0) / (1.0 - t0));
        head
    }

    /// Reversed direction.
    #[inline]
    pub fn reversed(&self) -> QuadSegment {
        QuadSegment::new(self.to, self.ctrl, self.from)
    }

    /// Arc length, in closed form.
    pub fn length(&self) -> f32 {
        let a = self.from - self.ctrl * 2.0 + self.to;
        let b = self.ctrl * 2.0 - self.from * 2.0;
        let aa = 4.0 * a.dot(a) as f64;
        let bb = 4.0 * a.dot(b) as f64;
        let cc = b.dot(b) as f64;
        if aa.abs() < 1e-12 {
            // Control point sits on the chord.
            return (self.to - self.from).length();
        }
        let sabc = 2.0 * (aa + bb + cc).sqrt();
        let a2 = aa.sqrt();
        let a32 = 2.0 * aa * a2;
        let c2 = 2.0 * cc.sqrt();
        let ba = bb / a2;
        let log_arg = (2.0 * a2 + ba + sabc) / (ba + c2);
        if !log_arg.is_finite() || log_arg <= 0.0 {
            // Cusp: the curve folds back on itself. Fall back to the polygon.
            return (self.ctrl - self.from).length() + (self.to - self.ctrl).length();
        }
        ((a32 * sabc + a2 * bb * (sabc - c2) + (4.0 * cc * aa - bb * bb) * log_arg.ln())
            / (4.0 * a32)) as f32
    }

    /// Parameter at which the arc length from the start reaches `len`.
    pub fn t_at_length(&self, len: f32) -> f32 {
        let total = self.length();
        if total <= 0.0 || len <= 0.0 {
            return 0.0;
        }
        if len >= total {
            return 1.0;
        }
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        for _ in 0..24 {
            let mid = 0.5 * (lo + hi);
            if self.sub(0.0, mid).length() < len {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }
}

/// Approximates a cubic Bézier with quadratic segments within `tolerance`.
pub fn cubic_to_quads(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, tolerance: f32, out: &mut Vec<QuadSegment>) {
    // Error of the midpoint quad approximation shrinks with the cube of the split count.
    let err = (p3 - p2 * 3.0 + p1 * 3.0 - p0).length() * (3f32.sqrt() / 36.0);
    let n = ((err / tolerance).cbrt().ceil() as usize).clamp(1, 64);
    for i in 0..n {
        let t0 = i as f32 / n as f32;
        let t1 = (i + 1) as f32 / n as f32;
        let [q0, q1, q2, q3] = cubic_sub(p0, p1, p2, p3, t0, t1);
        let ctrl = ((q1 + q2) * 3.0 - q0 - q3) * 0.25;
        out.push(QuadSegment::new(q0, ctrl, q3));
    }
}

fn cubic_sub(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t0: f32, t1: f32) -> [Vec2; 4] {
    let eval = |t: f32| {
        let u = 1.0 - t;
        p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
    };
    let deriv = |t: f32| {
        let u = 1.0 - t;
        (p1 - p0) * (3.0 * u * u) + (p2 - p1) * (6.0 * u * t) + (p3 - p2) * (3.0 * t * t)
    };
    let dt = (t1 - t0) / 3.0;
    let a = eval(t0);
    let d = eval(t1);
    [a, a + deriv(t0) * dt, d - deriv(t1) * dt, d]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_length_is_chord() {
        let q = QuadSegment::line(Vec2::new(0.0, 0.0), Vec2::new(3.0, 4.0));
        assert!((q.length() - 5.0).abs() < 1e-4);
        assert!(q.curvature(0.0).is_nan());
    }

    #[test]
    fn split_halves_share_midpoint() {
        let q = QuadSegment::new(Vec2::new(0.0, 0.0), Vec2::new(5.0, 10.0), Vec2::new(10.0, 0.0));
        let (a, b) = q.split(0.5);
        assert_eq!(a.to, b.from);
        assert_eq!(a.to, q.sample(0.5));
        assert!((a.length() + b.length() - q.length()).abs() < 1e-3);
    }

    #[test]
    fn t_at_length_finds_midpoint_of_line() {
        let q = QuadSegment::line(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        assert!((q.t_at_length(5.0) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn cubic_split_is_continuous() {
        let mut out = Vec::new();
        cubic_to_quads(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 100.0),
            Vec2::new(100.0, 100.0),
            Vec2::new(100.0, 0.0),
            0.01,
            &mut out,
        );
        assert!(out.len() > 1);
        for w in out.windows(2) {
            assert!((w[0].to - w[1].from).length() < 1e-3);
        }
        assert_eq!(out.last().map(|q| q.to), Some(Vec2::new(100.0, 0.0)));
    }
}
