//! Paint model: colors, gradients, images and the material sum type.
//!
//! Operation lists carry straight-alpha sRGB (`Srgba`); the pipeline works in
//! linear premultiplied space (`Color`).

pub mod color;
pub mod gradient;
mod image;
mod material;

pub use color::{Color, Srgba};
pub use gradient::{ColorStop, LinearGradient};
pub use image::{ImageData, ImageHandle, ImageId};
pub use material::Material;
