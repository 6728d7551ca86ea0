use core::ops::{Add, Sub};

use super::Vec2;

/// Integer point or size, used for atlas placements and texture extents.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct IVec2 {
    pub x: i32,
    pub y: i32,
}

impl IVec2 {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn splat(v: i32) -> Self {
        Self { x: v, y: v }
    }

    #[inline]
    pub fn to_f32(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    #[inline]
    pub fn max(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x.max(rhs.x), self.y.max(rhs.y))
    }

    #[inline]
    pub fn min(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x.min(rhs.x), self.y.min(rhs.y))
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }
}

impl Add for IVec2 {
    type Output = IVec2;
    #[inline]
    fn add(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for IVec2 {
    type Output = IVec2;
    #[inline]
    fn sub(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Integer rectangle, min inclusive, max exclusive.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct IRect {
    pub min: IVec2,
    pub max: IVec2,
}

impl IRect {
    #[inline]
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            min: IVec2::new(x0, y0),
            max: IVec2::new(x1, y1),
        }
    }

    #[inline]
    pub const fn from_min_max(min: IVec2, max: IVec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_pos_size(pos: IVec2, size: IVec2) -> Self {
        Self { min: pos, max: pos + size }
    }

    #[inline]
    pub fn size(self) -> IVec2 {
        self.max - self.min
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    #[inline]
    pub fn overlaps(self, other: IRect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    #[inline]
    pub fn contains_rect(self, other: IRect) -> bool {
        other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    #[inline]
    pub fn translate(self, v: IVec2) -> IRect {
        IRect::from_min_max(self.min + v, self.max + v)
    }

    /// Smallest rectangle covering both; an empty side is ignored.
    pub fn union(self, other: IRect) -> IRect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        IRect::from_min_max(self.min.min(other.min), self.max.max(other.max))
    }
}
