use crate::coords::{Affine2D, IVec2, Rect, Vec2};
use crate::paint::Material;
use crate::path::Path;
use crate::stroke::StrokeStyle;

/// Index into the collector's clip arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ClipId(pub(crate) u32);

impl ClipId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One accepted clip push. Parents form the clip ancestry.
#[derive(Debug, Clone)]
pub struct ClipState {
    /// Bounds in the clip's local space.
    pub bounds: Rect,
    /// Device-space bounds of `bounds`.
    pub abs_bounds: Rect,
    /// Local space relative to the parent clip (or the device for a root clip).
    pub rel_trans: Affine2D,
    /// Absolute transform at the time of the push.
    pub transform: Affine2D,
    pub path: Option<Path>,
    pub stroke: Option<StrokeStyle>,
    pub parent: Option<ClipId>,
}

/// Graphics state tracked while walking an operation list.
#[derive(Debug, Clone)]
pub struct EncoderState {
    /// Absolute transform.
    pub t: Affine2D,
    /// Transform accumulated since the active clip was pushed.
    pub rel_trans: Affine2D,
    /// Device-space intersection of every active clip.
    pub intersect: Rect,
    pub material: Material,
    pub clip: Option<ClipId>,
}

impl EncoderState {
    pub(crate) fn root(root: Affine2D, viewport: Rect) -> Self {
        Self {
            t: root,
            rel_trans: root,
            intersect: viewport,
            material: Material::default(),
            clip: None,
        }
    }
}

/// A clip level flattened into a paint's clip stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipCmd {
    pub bounds: Rect,
    pub rel_trans: Affine2D,
    pub abs_bounds: Rect,
    pub path: Option<Path>,
    pub stroke: Option<StrokeStyle>,
}

impl ClipCmd {
    #[inline]
    pub fn is_rect(&self) -> bool {
        self.path.is_none()
    }
}

/// A paint ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintOp {
    pub material: Material,
    /// Absolute transform at the paint minus `offset`, used to place image
    /// materials.
    pub transform: Affine2D,
    /// Innermost clip first.
    pub clip_stack: Vec<ClipCmd>,
    pub intersect: Rect,
    /// Whole-pixel translation split off the outermost clip. Ops differing
    /// only here render to the same pixels, shifted.
    pub offset: IVec2,
    /// Content hash, blind to `offset`.
    pub hash: u64,
    /// Index of the layer holding the op.
    pub layer: usize,
}

/// Four corners of a transformed rectangle, in corner order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Corners(pub [Vec2; 4]);

impl Corners {
    pub fn of(t: Affine2D, r: Rect) -> Self {
        Corners(r.corners().map(|p| t.transform_point(p)))
    }

    pub fn transform(self, t: Affine2D) -> Self {
        Corners(self.0.map(|p| t.transform_point(p)))
    }

    /// True when every corner lies inside `b`, edges included.
    pub fn within(&self, b: Rect) -> bool {
        self.0.iter().all(|&p| b.covers(p))
    }

    pub fn bounds(&self) -> Rect {
        let [a, b, c, d] = self.0;
        Rect::from_min_max(a.min(b).min(c).min(d), a.max(b).max(c).max(d))
    }
}
