use super::{IRect, IVec2, Vec2};

/// Axis-aligned rectangle in device pixels, stored as min/max corners.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            min: Vec2::new(x0, y0),
            max: Vec2::new(x1, y1),
        }
    }

    #[inline]
    pub const fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { min: origin, max: origin + size }
    }

    /// Rectangle anchored at the origin.
    #[inline]
    pub const fn from_size(w: f32, h: f32) -> Self {
        Self::new(0.0, 0.0, w, h)
    }

    #[inline]
    pub fn width(self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn size(self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Swaps corners so that `min <= max` on both axes.
    #[inline]
    pub fn normalized(self) -> Self {
        Rect::from_min_max(self.min.min(self.max), self.min.max(self.max))
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        p.x >= self.min.x && p.y >= self.min.y && p.x < self.max.x && p.y < self.max.y
    }

    /// Closed containment of a point, used for clip culling.
    #[inline]
    pub fn covers(self, p: Vec2) -> bool {
        p.x >= self.min.x && p.y >= self.min.y && p.x <= self.max.x && p.y <= self.max.y
    }

    #[inline]
    pub fn contains_rect(self, other: Rect) -> bool {
        self.covers(other.min) && self.covers(other.max)
    }

    #[inline]
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let r = Rect::from_min_max(self.min.max(other.min), self.max.min(other.max));
        if r.is_empty() { None } else { Some(r) }
    }

    /// Smallest rectangle enclosing both. Empty operands are ignored.
    #[inline]
    pub fn union(self, other: Rect) -> Rect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Rect::from_min_max(self.min.min(other.min), self.max.max(other.max))
    }

    #[inline]
    pub fn translate(self, v: Vec2) -> Rect {
        Rect::from_min_max(self.min + v, self.max + v)
    }

    /// Corners in winding order: min, (max.x, min.y), max, (min.x, max.y).
    #[inline]
    pub fn corners(self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Smallest integer rectangle that covers `self`.
    #[inline]
    pub fn round_out(self) -> IRect {
        IRect::from_min_max(
            IVec2::new(self.min.x.floor() as i32, self.min.y.floor() as i32),
            IVec2::new(self.max.x.ceil() as i32, self.max.y.ceil() as i32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x0: f32, y0: f32, x1: f32, y1: f32) -> Rect { Rect::new(x0, y0, x1, y1) }

    // ── normalized ────────────────────────────────────────────────────────

    #[test]
    fn normalized_ordered_is_identity() {
        let rect = r(1.0, 2.0, 11.0, 22.0);
        assert_eq!(rect.normalized(), rect);
    }

    #[test]
    fn normalized_swaps_inverted_axes() {
        let n = r(10.0, 10.0, 6.0, 7.0).normalized();
        assert_eq!(n, r(6.0, 7.0, 10.0, 10.0));
    }

    // ── contains ──────────────────────────────────────────────────────────

    #[test]
    fn contains_top_left_inclusive() {
        assert!(r(0.0, 0.0, 10.0, 10.0).contains(Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn contains_bottom_right_exclusive() {
        assert!(!r(0.0, 0.0, 10.0, 10.0).contains(Vec2::new(10.0, 10.0)));
        assert!(r(0.0, 0.0, 10.0, 10.0).covers(Vec2::new(10.0, 10.0)));
    }

    #[test]
    fn contains_rect_edges_count_as_inside() {
        let outer = r(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains_rect(outer));
        assert!(outer.contains_rect(r(10.0, 10.0, 100.0, 20.0)));
        assert!(!outer.contains_rect(r(-1.0, 10.0, 50.0, 20.0)));
    }

    // ── intersect / union ─────────────────────────────────────────────────

    #[test]
    fn intersect_overlapping() {
        let i = r(0.0, 0.0, 10.0, 10.0).intersect(r(5.0, 5.0, 15.0, 15.0));
        assert_eq!(i, Some(r(5.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn intersect_touching_edge_returns_none() {
        assert!(r(0.0, 0.0, 10.0, 10.0).intersect(r(10.0, 0.0, 20.0, 10.0)).is_none());
    }

    #[test]
    fn union_ignores_empty() {
        let a = r(1.0, 1.0, 2.0, 2.0);
        assert_eq!(Rect::default().union(a), a);
        assert_eq!(a.union(r(4.0, 0.0, 5.0, 1.0)), r(1.0, 0.0, 5.0, 2.0));
    }

    // ── round_out ─────────────────────────────────────────────────────────

    #[test]
    fn round_out_covers_fractional_edges() {
        let ir = r(0.5, -0.5, 9.1, 3.0).round_out();
        assert_eq!(ir, IRect::new(0, -1, 10, 3));
    }
}
