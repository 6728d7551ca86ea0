//! Coordinate and geometry types shared by the collector, encoder and atlases.
//!
//! Canonical space:
//! - Physical pixels
//! - Origin top-left
//! - +X right, +Y down

mod affine;
mod ivec;
mod rect;
mod vec2;
mod viewport;

pub use affine::Affine2D;
pub use ivec::{IRect, IVec2};
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
