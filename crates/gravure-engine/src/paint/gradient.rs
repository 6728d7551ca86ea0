use crate::coords::Vec2;

use super::Srgba;

/// A single gradient stop.
///
/// `t` is expected in [0, 1]; stops are not sorted or clamped here.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorStop {
    pub t: f32,
    pub color: Srgba,
}

impl ColorStop {
    #[inline]
    pub const fn new(t: f32, color: Srgba) -> Self {
        Self { t, color }
    }
}

/// Linear gradient definition in the paint's local space.
///
/// The compute pipeline renders gradients as a flat fill of the first stop.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub start: Vec2,
    pub end: Vec2,
    pub stops: Vec<ColorStop>,
}

impl LinearGradient {
    pub fn new(start: Vec2, end: Vec2, stops: Vec<ColorStop>) -> Self {
        Self { start, end, stops }
    }

    /// Two-stop gradient between `start` and `end`.
    pub fn two_stop(start: Vec2, from: Srgba, end: Vec2, to: Srgba) -> Self {
        Self::new(start, end, vec![ColorStop::new(0.0, from), ColorStop::new(1.0, to)])
    }

    /// Color of the first stop, or transparent when there are none.
    pub fn first_color(&self) -> Srgba {
        self.stops.first().map_or(Srgba::default(), |s| s.color)
    }

    /// Returns true when the gradient definition is structurally usable.
    pub fn is_valid(&self) -> bool {
        self.start.is_finite()
            && self.end.is_finite()
            && self.stops.iter().all(|s| s.t.is_finite())
            && self.stops.len() >= 2
            && self.start != self.end
    }
}
