//! The compute renderer: atlases, scratch memory and the kernel chain.
//!
//! Responsibilities:
//! - image and material atlas upkeep (`atlases`)
//! - layer atlases, compaction and the layer blit (`layers`)
//! - scratch memory layout and allocator protocol (`memory`)
//! - frame orchestration (`renderer`)

mod atlases;
mod buffer;
mod config;
mod error;
mod layers;
mod memory;
mod renderer;

pub use config::RendererConfig;
pub use error::RenderError;
pub use memory::{
    Config, MemAlloc, MemError, MemoryHeader, TileDims, HEADER_SIZE, MAX_BINS, TILE_HEIGHT_PX, TILE_WIDTH_PX,
};
pub use renderer::ComputeRenderer;
