//! Gravure engine crate.
//!
//! Renders 2D vector operation lists on the GPU. Paths are encoded into a
//! command stream that a chain of compute kernels rasterizes into tiles;
//! images reach the kernels through a transformed material atlas.
//!
//! Frame flow:
//! `OpList` -> `Collector` (layers) -> `SceneEncoder` (per layer batch) ->
//! `ComputeRenderer` (layer atlases) -> target.

pub mod logging;

pub mod coords;
pub mod paint;
pub mod path;
pub mod stroke;
pub mod ops;

pub mod atlas;
pub mod cache;
pub mod collect;
pub mod scene;

pub mod compute;
pub mod device;

pub use compute::{ComputeRenderer, RenderError, RendererConfig};
pub use coords::{Affine2D, Rect, Vec2, Viewport};
pub use ops::{ClipOp, OpList};
pub use paint::{Color, ImageHandle, LinearGradient, Srgba};
pub use path::{Path, PathBuilder};
pub use stroke::StrokeStyle;
