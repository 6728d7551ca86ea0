use crate::coords::{Affine2D, Rect};
use crate::paint::{ImageHandle, LinearGradient, Srgba};
use crate::path::Path;
use crate::stroke::StrokeStyle;

/// Slot in the collector's state table, assigned by [`OpList`](super::OpList).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StateId(pub u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Selects which parts of a saved state a `Load` restores.
///
/// `TRANSFORM` alone restores only the transform; any other bit restores the
/// whole state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LoadMask(u8);

impl LoadMask {
    pub const TRANSFORM: LoadMask = LoadMask(1);
    pub const ALL: LoadMask = LoadMask(0xff);

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn transform_only(self) -> bool {
        self == Self::TRANSFORM
    }
}

/// A clip push: local-space bounds plus optional outline.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipOp {
    pub bounds: Rect,
    /// `None` clips to `bounds` itself.
    pub path: Option<Path>,
    /// With a non-zero width the clip area is the stroke of `path`.
    pub stroke: Option<StrokeStyle>,
}

impl ClipOp {
    pub fn rect(bounds: Rect) -> Self {
        Self { bounds, path: None, stroke: None }
    }

    /// Fill of `path`, bounded by its control points.
    pub fn path(path: Path) -> Self {
        Self { bounds: path.bounds(), path: Some(path), stroke: None }
    }

    /// Stroke of `path`. Bounds grow by the farthest a join or cap can reach.
    pub fn stroke(path: Path, style: StrokeStyle) -> Self {
        let reach = 0.5 * style.width * style.miter.max(core::f32::consts::SQRT_2);
        let b = path.bounds();
        let bounds = Rect::new(b.min.x - reach, b.min.y - reach, b.max.x + reach, b.max.y + reach);
        Self { bounds, path: Some(path), stroke: Some(style) }
    }

    /// True for a clip that only restricts to `bounds`.
    #[inline]
    pub fn is_rect(&self) -> bool {
        self.path.is_none()
    }
}

/// One record of an operation list.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Composes onto the current transform.
    Transform(Affine2D),
    Save(StateId),
    Load(StateId, LoadMask),
    Clip(ClipOp),
    Color(Srgba),
    LinearGradient(LinearGradient),
    Image(ImageHandle),
    /// Fills the current clip with the current material.
    Paint,
    /// Requests GPU timings for this frame.
    Profile,
}
