use crate::coords::Vec2;
use crate::path::{arc_quads, QuadSegment};

use super::dash::dash;
use super::{split_contours, StrokeJoin, StrokeQuad, StrokeStyle};

/// Maximum distance between an offset chord and the true offset curve.
const OFFSET_TOLERANCE: f32 = 0.01;
/// Bisection limit for the offset approximation.
const MAX_OFFSET_DEPTH: u32 = 10;

/// Converts the outline described by `quads` into fill geometry covering the
/// stroke.
///
/// Open contours produce one closed ring (right side, end cap, left side
/// reversed, start cap). Closed contours produce an outer and an inner ring
/// wound in opposite directions so that a nonzero fill leaves the interior
/// open. Output rings are numbered from 1.
pub fn stroke(quads: &[StrokeQuad], style: &StrokeStyle) -> Vec<StrokeQuad> {
    if !style.is_stroke() {
        return Vec::new();
    }

    let dashed;
    let input = match style.dashes.as_ref().filter(|_| style.is_dashed()) {
        Some(pattern) => {
            dashed = dash(quads, pattern);
            &dashed[..]
        }
        None => quads,
    };

    let hw = 0.5 * style.width;
    let mut out = Vec::new();
    let mut contour = 0u32;
    for part in split_contours(input) {
        let segs: Vec<QuadSegment> = part
            .iter()
            .map(|s| s.quad)
            .filter(|q| !is_point(q))
            .collect();
        if segs.is_empty() {
            continue;
        }
        for ring in stroke_contour(&segs, style, hw) {
            contour += 1;
            out.extend(ring.quads.into_iter().map(|quad| StrokeQuad { contour, quad }));
        }
    }
    out
}

/// Twice the signed Shoelace area of the polygon through the segment end
/// points. Non-positive means counter-clockwise.
pub fn signed_area(quads: &[QuadSegment]) -> f32 {
    let n = quads.len();
    (0..n)
        .map(|i| {
            let pi = quads[i].to;
            let pj = quads[(i + n - 1) % n].to;
            (pi.x - pj.x) * (pi.y + pj.y)
        })
        .sum()
}

fn stroke_contour(segs: &[QuadSegment], style: &StrokeStyle, hw: f32) -> Vec<Ring> {
    let first = segs[0];
    let last = segs[segs.len() - 1];
    let closed = first.from == last.to;

    let start_n = normal(&first, 0.0, hw);
    let mut rhs = Ring::new(first.from + start_n);
    let mut lhs = Ring::new(first.from - start_n);

    for (i, q) in segs.iter().enumerate() {
        offset_quad(q, hw, &mut rhs, 0);
        offset_quad(q, -hw, &mut lhs, 0);

        let next = match segs.get(i + 1) {
            Some(next) => next,
            None if closed => &first,
            None => break,
        };
        let n0 = normal(q, 1.0, hw);
        let n1 = normal(next, 0.0, hw);
        if !is_smooth(q, next, n0, n1, hw) {
            join(&mut rhs, &mut lhs, style, hw, q.to, n0, n1);
        }
    }

    if closed {
        rhs.close();
        lhs.close();
        return if signed_area(segs) <= 0.0 {
            vec![rhs, lhs.reversed()]
        } else {
            vec![lhs, rhs.reversed()]
        };
    }

    let end_n = normal(&last, 1.0, hw);
    cap(&mut rhs, style, last.to, end_n);
    rhs.append(lhs.reversed());
    cap(&mut rhs, style, first.from, start_n * -1.0);
    rhs.close();
    vec![rhs]
}

// ── offsetting ───────────────────────────────────────────────────────────

/// Appends the curve offset by `d` along its normal as a polyline, bisecting
/// until every chord is within tolerance of the true offset curve.
fn offset_quad(q: &QuadSegment, d: f32, ring: &mut Ring, depth: u32) {
    let a = q.from + normal(q, 0.0, d);
    let b = q.to + normal(q, 1.0, d);
    ring.line_to(a);

    if !is_line(q) && depth < MAX_OFFSET_DEPTH {
        let want = q.sample(0.5) + normal(q, 0.5, d);
        if (want - (a + b) * 0.5).length() > OFFSET_TOLERANCE {
            let (head, tail) = q.split(0.5);
            offset_quad(&head, d, ring, depth + 1);
            offset_quad(&tail, d, ring, depth + 1);
            return;
        }
    }
    ring.line_to(b);
}

/// Offset vector of length `hw` pointing to the right-hand side. Zero where
/// the derivative vanishes (control point on an end point).
fn normal(q: &QuadSegment, t: f32, hw: f32) -> Vec2 {
    q.d1(t).rot90_cw().with_length(hw)
}

/// True when the end of `q` continues into `next` without a corner: equal
/// normals, or line-like ends whose normals agree within rounding.
fn is_smooth(q: &QuadSegment, next: &QuadSegment, n0: Vec2, n1: Vec2, hw: f32) -> bool {
    if n0 == n1 {
        return true;
    }
    q.curvature(1.0).is_nan() && next.curvature(0.0).is_nan() && (n0 - n1).length() <= 1e-6 * hw.abs()
}

fn is_point(q: &QuadSegment) -> bool {
    q.from == q.to && q.from == q.ctrl
}

fn is_line(q: &QuadSegment) -> bool {
    let chord = q.to - q.from;
    let c = q.ctrl - q.from;
    if chord.is_zero() {
        return c.is_zero();
    }
    chord.cross(c).abs() <= 1e-6 * chord.length() * c.length()
}

// ── joins and caps ───────────────────────────────────────────────────────

fn join(rhs: &mut Ring, lhs: &mut Ring, style: &StrokeStyle, hw: f32, pivot: Vec2, n0: Vec2, n1: Vec2) {
    if is_reversal(n0, n1, hw) {
        bevel_join(rhs, lhs, pivot, n1);
        return;
    }
    if style.miter > 0.0 && miter_join(rhs, lhs, style.miter, hw, pivot, n0, n1) {
        return;
    }
    match style.join {
        StrokeJoin::Bevel => bevel_join(rhs, lhs, pivot, n1),
        StrokeJoin::Round => round_join(rhs, lhs, pivot, n0, n1),
    }
}

fn bevel_join(rhs: &mut Ring, lhs: &mut Ring, pivot: Vec2, n1: Vec2) {
    rhs.line_to(pivot + n1);
    lhs.line_to(pivot - n1);
}

fn round_join(rhs: &mut Ring, lhs: &mut Ring, pivot: Vec2, n0: Vec2, n1: Vec2) {
    let angle = n0.cross(n1).atan2(n0.dot(n1));
    if angle.abs() < 0.05 {
        bevel_join(rhs, lhs, pivot, n1);
        return;
    }
    // The outer side gets the arc; the inner side folds under the stroke.
    if lhs_outer(n0, n1) {
        lhs.arc(pivot, angle);
    } else {
        rhs.arc(pivot, angle);
    }
    bevel_join(rhs, lhs, pivot, n1);
}

/// Emits a miter and returns true, or returns false when the miter would
/// exceed `limit` half widths.
fn miter_join(rhs: &mut Ring, lhs: &mut Ring, limit: f32, hw: f32, pivot: Vec2, n0: Vec2, n1: Vec2) -> bool {
    let limit = limit.max(1.001);
    let outer_lhs = lhs_outer(n0, n1);
    let hw = if outer_lhs { -hw } else { hw };
    let cos = (0.5 * (1.0 + n0.cos_angle(n1))).sqrt();
    let d = hw / cos;
    if (limit * hw).abs() < d.abs() {
        return false;
    }
    let mid = pivot + (n0 + n1).with_length(d);
    if outer_lhs {
        lhs.line_to(mid);
    } else {
        rhs.line_to(mid);
    }
    bevel_join(rhs, lhs, pivot, n1);
    true
}

/// The path turns back on itself; no join shape applies.
#[inline]
fn is_reversal(n0: Vec2, n1: Vec2, hw: f32) -> bool {
    !n0.is_zero() && (n0 + n1).length() <= 1e-6 * hw.abs()
}

/// True when the turn from `n0` to `n1` puts the left-hand side on the
/// outside of the corner.
#[inline]
fn lhs_outer(n0: Vec2, n1: Vec2) -> bool {
    n0.rot90_cw().dot(n1) >= 0.0
}

/// Caps the ring whose pen sits at `pivot + n`, ending at `pivot - n`.
fn cap(ring: &mut Ring, style: &StrokeStyle, pivot: Vec2, n: Vec2) {
    use super::StrokeCap;
    match style.cap {
        StrokeCap::Flat => {}
        StrokeCap::Square => {
            let e = pivot + n.rot90_ccw();
            ring.line_to(e + n);
            ring.line_to(e - n);
        }
        StrokeCap::Round => ring.arc(pivot, core::f32::consts::PI),
    }
    ring.line_to(pivot - n);
}

// ── ring ─────────────────────────────────────────────────────────────────

/// Continuous chain of quads under construction.
#[derive(Debug)]
struct Ring {
    quads: Vec<QuadSegment>,
    start: Vec2,
    pen: Vec2,
}

impl Ring {
    fn new(start: Vec2) -> Self {
        Self { quads: Vec::new(), start, pen: start }
    }

    fn line_to(&mut self, to: Vec2) {
        if to != self.pen {
            self.quads.push(QuadSegment::line(self.pen, to));
            self.pen = to;
        }
    }

    fn arc(&mut self, center: Vec2, angle: f32) {
        arc_quads(self.pen, center, angle, &mut self.quads);
        if let Some(q) = self.quads.last() {
            self.pen = q.to;
        }
    }

    fn close(&mut self) {
        let start = self.start;
        self.line_to(start);
    }

    fn reversed(self) -> Ring {
        Ring {
            quads: self.quads.iter().rev().map(QuadSegment::reversed).collect(),
            start: self.pen,
            pen: self.start,
        }
    }

    /// Joins `other` onto the end of this ring with a connecting line.
    fn append(&mut self, other: Ring) {
        self.line_to(other.start);
        self.quads.extend(other.quads);
        self.pen = other.pen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::StrokeCap;

    fn contour(points: &[(f32, f32)]) -> Vec<StrokeQuad> {
        points
            .windows(2)
            .map(|w| StrokeQuad {
                contour: 1,
                quad: QuadSegment::line(Vec2::new(w[0].0, w[0].1), Vec2::new(w[1].0, w[1].1)),
            })
            .collect()
    }

    fn rings(out: &[StrokeQuad]) -> Vec<Vec<QuadSegment>> {
        split_contours(out)
            .map(|c| c.iter().map(|s| s.quad).collect())
            .collect()
    }

    fn assert_closed_chain(ring: &[QuadSegment]) {
        for w in ring.windows(2) {
            assert!((w[0].to - w[1].from).length() < 1e-3, "gap in ring: {w:?}");
        }
        let gap = ring[0].from - ring[ring.len() - 1].to;
        assert!(gap.length() < 1e-3, "ring not closed");
    }

    // ── open contours ──

    #[test]
    fn open_line_is_one_closed_ring() {
        let out = stroke(&contour(&[(0.0, 0.0), (10.0, 0.0)]), &StrokeStyle::new(2.0));
        let rings = rings(&out);
        assert_eq!(rings.len(), 1);
        assert_closed_chain(&rings[0]);
        // Flat caps: the ring is the rectangle [0,10] x [-1,1].
        for q in &rings[0] {
            assert!(q.from.x >= -1e-4 && q.from.x <= 10.0 + 1e-4);
            assert!(q.from.y.abs() <= 1.0 + 1e-4);
        }
        assert!((signed_area(&rings[0]).abs() - 2.0 * 20.0).abs() < 1e-2);
    }

    #[test]
    fn square_cap_extends_past_ends() {
        let style = StrokeStyle::new(2.0).with_cap(StrokeCap::Square);
        let out = stroke(&contour(&[(0.0, 0.0), (10.0, 0.0)]), &style);
        let xs: Vec<f32> = out.iter().map(|s| s.quad.from.x).collect();
        let min = xs.iter().cloned().fold(f32::MAX, f32::min);
        let max = xs.iter().cloned().fold(f32::MIN, f32::max);
        assert!((min + 1.0).abs() < 1e-4);
        assert!((max - 11.0).abs() < 1e-4);
    }

    #[test]
    fn round_cap_bulges_by_half_width() {
        let style = StrokeStyle::new(4.0).with_cap(StrokeCap::Round);
        let out = stroke(&contour(&[(0.0, 0.0), (10.0, 0.0)]), &style);
        let max = out.iter().map(|s| s.quad.to.x).fold(f32::MIN, f32::max);
        assert!((max - 12.0).abs() < 1e-3);
        assert_closed_chain(&rings(&out)[0]);
    }

    // ── closed contours ──

    #[test]
    fn closed_square_has_opposite_rings() {
        let sq = contour(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let out = stroke(&sq, &StrokeStyle::new(2.0));
        let rings = rings(&out);
        assert_eq!(rings.len(), 2);
        for r in &rings {
            assert_closed_chain(r);
        }
        let a0 = signed_area(&rings[0]);
        let a1 = signed_area(&rings[1]);
        assert!(a0 * a1 < 0.0, "rings wound the same way: {a0} {a1}");
    }

    #[test]
    fn miter_join_reaches_the_corner() {
        let sq = contour(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let style = StrokeStyle::new(2.0).with_miter(4.0);
        let out = stroke(&sq, &style);
        let hit = out
            .iter()
            .any(|s| (s.quad.to - Vec2::new(11.0, -1.0)).length() < 1e-3);
        assert!(hit, "outer miter corner missing");
    }

    #[test]
    fn miter_over_limit_falls_back() {
        // Acute turn whose miter is far longer than the limit.
        let pts = contour(&[(0.0, 0.0), (10.0, 0.0), (0.0, 0.5)]);
        let style = StrokeStyle::new(2.0).with_miter(1.5);
        let out = stroke(&pts, &style);
        let max = out.iter().map(|s| s.quad.to.x).fold(f32::MIN, f32::max);
        assert!(max < 12.0, "miter not limited: {max}");
    }

    // ── degenerate input ──

    #[test]
    fn reversal_and_points_stay_finite() {
        let mut q = contour(&[(0.0, 0.0), (10.0, 0.0), (0.0, 0.0)]);
        q.push(StrokeQuad {
            contour: 1,
            quad: QuadSegment::line(Vec2::zero(), Vec2::zero()),
        });
        for join in [StrokeJoin::Bevel, StrokeJoin::Round] {
            let style = StrokeStyle::new(2.0).with_join(join).with_miter(4.0);
            let out = stroke(&q, &style);
            assert!(!out.is_empty());
            assert!(out.iter().all(|s| s.quad.from.is_finite() && s.quad.ctrl.is_finite()));
        }
    }

    #[test]
    fn coincident_control_point_has_no_offset() {
        let q = [StrokeQuad {
            contour: 1,
            quad: QuadSegment::new(Vec2::zero(), Vec2::zero(), Vec2::new(10.0, 0.0)),
        }];
        let out = stroke(&q, &StrokeStyle::new(2.0));
        assert_eq!(out[0].quad.from, Vec2::zero());
        assert_eq!(normal(&q[0].quad, 0.0, 1.0), Vec2::zero());
        assert_eq!(normal(&q[0].quad, 1.0, 1.0), Vec2::new(0.0, -1.0));
    }

    #[test]
    fn reversal_joins_are_bevels() {
        let back = contour(&[(0.0, 0.0), (10.0, 0.0), (0.0, 0.0)]);
        let bevel = stroke(&back, &StrokeStyle::new(2.0));
        let round = stroke(&back, &StrokeStyle::new(2.0).with_join(StrokeJoin::Round));
        assert_eq!(round, bevel);
        // Nothing reaches past the turning point.
        let max = round.iter().map(|s| s.quad.to.x.max(s.quad.ctrl.x)).fold(f32::MIN, f32::max);
        assert!(max <= 10.0 + 1e-4, "join bulges to {max}");
    }

    #[test]
    fn collinear_segments_need_no_join() {
        let a = QuadSegment::line(Vec2::zero(), Vec2::new(10.0, 0.0));
        let b = QuadSegment::line(Vec2::new(10.0, 0.0), Vec2::new(20.0, 1e-7));
        let (n0, n1) = (normal(&a, 1.0, 1.0), normal(&b, 0.0, 1.0));
        assert_ne!(n0, n1);
        assert!(is_smooth(&a, &b, n0, n1, 1.0));

        // Same near-equal normals, but the next segment bends away.
        let bend = QuadSegment::new(Vec2::new(10.0, 0.0), Vec2::new(15.0, 1e-7), Vec2::new(20.0, 5.0));
        let n2 = normal(&bend, 0.0, 1.0);
        assert_ne!(n0, n2);
        assert!(!bend.curvature(0.0).is_nan());
        assert!(!is_smooth(&a, &bend, n0, n2, 1.0));
    }

    #[test]
    fn curved_offset_stays_at_half_width() {
        let q = [StrokeQuad {
            contour: 1,
            quad: QuadSegment::new(Vec2::new(0.0, 0.0), Vec2::new(50.0, 80.0), Vec2::new(100.0, 0.0)),
        }];
        let out = stroke(&q, &StrokeStyle::new(4.0));
        assert!(out.len() > 4);
        assert!(out.iter().all(|s| s.quad.to.is_finite()));
    }

    #[test]
    fn zero_width_is_empty() {
        let out = stroke(&contour(&[(0.0, 0.0), (10.0, 0.0)]), &StrokeStyle::new(0.0));
        assert!(out.is_empty());
    }
}
