use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

use crate::coords::{Rect, Vec2};

use super::quad::{cubic_to_quads, QuadSegment};

/// Cubic segments are approximated by quads within this distance.
const CUBIC_TOLERANCE: f32 = 0.01;

/// One quadratic segment tagged with the contour it belongs to.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PathSegment {
    pub contour: u32,
    pub quad: QuadSegment,
}

/// Compact content key of a path: a hash of the segment bits plus the count.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PathKey {
    hash: u64,
    len: u32,
}

/// Immutable path geometry.
#[derive(Debug, Clone)]
pub struct Path {
    segments: Arc<[PathSegment]>,
    bounds: Rect,
    key: PathKey,
}

impl Path {
    #[inline]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Bounds of all points and control points.
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline]
    pub fn key(&self) -> PathKey {
        self.key
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Closed rectangle outline, wound min → (max.x, min.y) → max → (min.x, max.y).
    pub fn rect(r: Rect) -> Path {
        let [a, b, c, d] = r.corners();
        let mut p = PathBuilder::new();
        p.move_to(a);
        p.line_to(b);
        p.line_to(c);
        p.line_to(d);
        p.close();
        p.build()
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.segments == other.segments
    }
}

/// Incremental path construction.
///
/// Every segment is stored as a quadratic; lines use a midpoint control point
/// and cubics are split into quads.
#[derive(Debug, Default)]
pub struct PathBuilder {
    segments: Vec<PathSegment>,
    contour: u32,
    pen: Vec2,
    start: Vec2,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn pen(&self) -> Vec2 {
        self.pen
    }

    /// Starts a new contour at `p`.
    pub fn move_to(&mut self, p: Vec2) {
        self.contour += 1;
        self.pen = p;
        self.start = p;
    }

    pub fn line_to(&mut self, to: Vec2) {
        self.push(QuadSegment::line(self.pen, to));
    }

    pub fn quad_to(&mut self, ctrl: Vec2, to: Vec2) {
        self.push(QuadSegment::new(self.pen, ctrl, to));
    }

    pub fn cube_to(&mut self, ctrl0: Vec2, ctrl1: Vec2, to: Vec2) {
        let mut quads = Vec::new();
        cubic_to_quads(self.pen, ctrl0, ctrl1, to, CUBIC_TOLERANCE, &mut quads);
        for q in quads {
            self.push(q);
        }
    }

    /// Circular arc around `center`, starting at the pen, sweeping `angle`
    /// radians (positive turns from +X towards +Y).
    pub fn arc(&mut self, center: Vec2, angle: f32) {
        let mut quads = Vec::new();
        arc_quads(self.pen, center, angle, &mut quads);
        for q in quads {
            self.push(q);
        }
    }

    /// Closes the current contour with a line back to its start.
    pub fn close(&mut self) {
        if self.pen != self.start {
            self.line_to(self.start);
        }
    }

    pub fn build(self) -> Path {
        let mut bounds: Option<Rect> = None;
        let mut hasher = FxHasher::default();
        for s in &self.segments {
            s.contour.hash(&mut hasher);
            for p in [s.quad.from, s.quad.ctrl, s.quad.to] {
                p.x.to_bits().hash(&mut hasher);
                p.y.to_bits().hash(&mut hasher);
                let pt = Rect::from_min_max(p, p);
                bounds = Some(match bounds {
                    Some(b) => Rect::from_min_max(b.min.min(p), b.max.max(p)),
                    None => pt,
                });
            }
        }
        Path {
            key: PathKey {
                hash: hasher.finish(),
                len: self.segments.len() as u32,
            },
            bounds: bounds.unwrap_or_default(),
            segments: self.segments.into(),
        }
    }

    fn push(&mut self, quad: QuadSegment) {
        if self.contour == 0 {
            // Drawing without a move_to starts an implicit contour at the pen.
            self.contour = 1;
            self.start = self.pen;
        }
        self.pen = quad.to;
        self.segments.push(PathSegment { contour: self.contour, quad });
    }
}

/// Appends quads approximating a circular arc around `center` that starts at
/// `from` and sweeps `angle` radians.
pub(crate) fn arc_quads(from: Vec2, center: Vec2, angle: f32, out: &mut Vec<QuadSegment>) {
    if angle == 0.0 {
        return;
    }
    let n = (angle.abs() / core::f32::consts::FRAC_PI_4).ceil().max(1.0) as usize;
    let step = angle / n as f32;
    let ctrl_scale = 1.0 / (0.5 * step).cos();
    let r0 = from - center;
    let mut p = from;
    for i in 0..n {
        let r = r0.rotate(step * i as f32);
        let next = center + r0.rotate(step * (i + 1) as f32);
        let ctrl = center + r.rotate(0.5 * step) * ctrl_scale;
        out.push(QuadSegment::new(p, ctrl, next));
        p = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contours_are_numbered_per_move_to() {
        let mut p = PathBuilder::new();
        p.move_to(Vec2::new(0.0, 0.0));
        p.line_to(Vec2::new(1.0, 0.0));
        p.move_to(Vec2::new(5.0, 5.0));
        p.line_to(Vec2::new(6.0, 5.0));
        let path = p.build();
        let ids: Vec<u32> = path.segments().iter().map(|s| s.contour).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn close_returns_to_start() {
        let path = Path::rect(Rect::new(0.0, 0.0, 4.0, 3.0));
        assert_eq!(path.segments().len(), 4);
        let first = path.segments()[0].quad.from;
        let last = path.segments()[3].quad.to;
        assert_eq!(first, last);
        assert_eq!(path.bounds(), Rect::new(0.0, 0.0, 4.0, 3.0));
    }

    #[test]
    fn equal_geometry_has_equal_keys() {
        let a = Path::rect(Rect::new(0.0, 0.0, 4.0, 3.0));
        let b = Path::rect(Rect::new(0.0, 0.0, 4.0, 3.0));
        let c = Path::rect(Rect::new(0.0, 0.0, 4.0, 3.5));
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn half_circle_arc_ends_opposite() {
        let mut p = PathBuilder::new();
        p.move_to(Vec2::new(10.0, 0.0));
        p.arc(Vec2::zero(), core::f32::consts::PI);
        let end = p.pen();
        assert!((end.x + 10.0).abs() < 1e-3 && end.y.abs() < 1e-3);
        // Positive sweep passes through +Y.
        let path = p.build();
        assert!(path.bounds().max.y > 9.0);
    }
}
