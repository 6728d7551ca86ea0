//! Stroke-to-fill conversion.
//!
//! Strokes are expanded on the CPU into closed rings that the fill pipeline
//! renders with the nonzero rule.

mod dash;
mod offset;
mod style;

use crate::path::{Path, QuadSegment};

pub use offset::{signed_area, stroke};
pub use style::{DashPattern, StrokeCap, StrokeJoin, StrokeStyle};

/// Quad tagged with the contour it belongs to. Contour ids only need to
/// change between contours; consecutive equal ids form one contour.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StrokeQuad {
    pub contour: u32,
    pub quad: QuadSegment,
}

impl StrokeQuad {
    /// Segments of `path` in stroke form.
    pub fn from_path(path: &Path) -> Vec<StrokeQuad> {
        path.segments()
            .iter()
            .map(|s| StrokeQuad { contour: s.contour, quad: s.quad })
            .collect()
    }
}

/// Runs of consecutive quads sharing a contour id.
pub(crate) fn split_contours(quads: &[StrokeQuad]) -> impl Iterator<Item = &[StrokeQuad]> {
    quads.chunk_by(|a, b| a.contour == b.contour)
}
