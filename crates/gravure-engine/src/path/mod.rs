//! Path geometry: quadratic segments grouped into contours.

mod builder;
pub mod quad;

pub use builder::{Path, PathBuilder, PathKey, PathSegment};
pub(crate) use builder::arc_quads;
pub use quad::QuadSegment;
