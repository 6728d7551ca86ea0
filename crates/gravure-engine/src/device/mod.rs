//! GPU device abstraction consumed by the compute renderer.
//!
//! This module is responsible for:
//! - the `Device` trait: buffers, textures, kernel dispatch, barriers,
//!   the material-atlas draw, layer copies, the layer blit and timers
//! - a wgpu implementation (`gpu`)
//! - a recording fake for tests (`fake`)

mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod gpu;

use std::time::Duration;

use bytemuck::{Pod, Zeroable};

use crate::coords::IVec2;
use crate::paint::Color;

pub use error::DeviceError;

/// What the device can do. Queried once by the renderer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Caps {
    /// Largest 2D texture side in pixels.
    pub max_texture_size: i32,
    /// Largest storage buffer binding in bytes.
    pub max_buffer_size: u64,
    /// Image atlas textures decode sRGB on sampling.
    pub srgb: bool,
    /// GPU timestamp queries are available.
    pub timers: bool,
}

/// Texture roles. Each maps to one format and usage set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// Rendered layers: linear premultiplied RGBA written by kernel4.
    LayerAtlas,
    /// Source images, premultiplied.
    ImageAtlas,
    /// Transformed images, rendered by `draw_materials` and read by kernel4.
    MaterialAtlas,
}

/// The seven compute stages, in dispatch order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Kernel {
    Elements,
    TileAlloc,
    PathCoarse,
    Backdrop,
    Binning,
    Coarse,
    Kernel4,
}

impl Kernel {
    pub const ALL: [Kernel; 7] = [
        Kernel::Elements,
        Kernel::TileAlloc,
        Kernel::PathCoarse,
        Kernel::Backdrop,
        Kernel::Binning,
        Kernel::Coarse,
        Kernel::Kernel4,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kernel::Elements => "elements",
            Kernel::TileAlloc => "tile_alloc",
            Kernel::PathCoarse => "path_coarse",
            Kernel::Backdrop => "backdrop",
            Kernel::Binning => "binning",
            Kernel::Coarse => "coarse",
            Kernel::Kernel4 => "kernel4",
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Resources bound to the kernels for the following dispatches.
///
/// Binding slots: `memory` 0 and `config` 1 for every kernel; `scene` 2 and
/// `state` 3 for elements; `output` 2 and `atlas` 3 for kernel4. The output
/// is the layer atlas being rendered.
pub struct KernelBindings<'a, D: Device + ?Sized> {
    pub memory: &'a D::Buffer,
    pub config: &'a D::Buffer,
    pub scene: &'a D::Buffer,
    pub state: &'a D::Buffer,
    pub output: &'a D::Texture,
    /// Material atlas; a placeholder is bound when absent.
    pub atlas: Option<&'a D::Texture>,
}

/// One material-atlas vertex: target position in atlas pixels and the
/// normalized source coordinate in the image atlas.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MaterialVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

/// One corner of a layer quad: target position in viewport pixels and the
/// matching layer-atlas texel.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LayerVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

/// Layer quads read from one layer atlas.
pub struct BlitBatch<'a, D: Device + ?Sized> {
    pub atlas: &'a D::Texture,
    /// Two triangles per layer.
    pub vertices: &'a [LayerVertex],
}

/// A GPU backend. Resources are released by dropping them.
///
/// Dispatches and barriers may be recorded lazily; every call that reads
/// results back (`download_buffer`, `timer_elapsed`), copies textures
/// (`copy_texture`) or writes a render target (`draw_materials`, `blit`)
/// observes all work recorded before it.
pub trait Device {
    type Buffer;
    type Texture;
    /// Destination of the layer blit.
    type Target;
    type Timer;

    fn caps(&self) -> Caps;

    /// Creates a zeroed storage buffer of `size` bytes.
    fn new_buffer(&mut self, what: &'static str, size: u64) -> Result<Self::Buffer, DeviceError>;
    fn upload_buffer(&mut self, buf: &Self::Buffer, data: &[u8]);
    /// Blocks until `dst.len()` bytes from the start of `buf` are read back.
    fn download_buffer(&mut self, buf: &Self::Buffer, dst: &mut [u8]) -> Result<(), DeviceError>;

    fn new_texture(&mut self, kind: TextureKind, size: IVec2) -> Result<Self::Texture, DeviceError>;
    /// Writes tightly packed RGBA8 `pixels` into the `size` region at `pos`.
    fn upload_texture(&mut self, tex: &Self::Texture, pos: IVec2, size: IVec2, pixels: &[u8]);

    fn bind_kernels(&mut self, bindings: KernelBindings<'_, Self>);
    fn dispatch(&mut self, kernel: Kernel, groups: [u32; 3]);
    /// Orders storage writes of earlier dispatches before later ones.
    fn memory_barrier(&mut self);

    /// Draws textured triangles from `images` into `atlas`. Clears the atlas
    /// first when `clear` is set.
    fn draw_materials(&mut self, atlas: &Self::Texture, images: &Self::Texture, vertices: &[MaterialVertex], clear: bool);

    /// Copies the `size` texels at `src_pos` in `src` to `dst_pos` in `dst`.
    /// Both are layer atlases.
    fn copy_texture(&mut self, src: &Self::Texture, src_pos: IVec2, dst: &Self::Texture, dst_pos: IVec2, size: IVec2);

    /// Blends every batch over the `viewport`-sized `target`, after clearing
    /// it to `clear` when given. With no batches only the clear runs.
    fn blit(&mut self, target: &Self::Target, viewport: IVec2, clear: Option<Color>, batches: &[BlitBatch<'_, Self>]);

    /// `None` when the device has no timers.
    fn new_timer(&mut self) -> Option<Self::Timer>;
    fn begin_timer(&mut self, timer: &mut Self::Timer);
    fn end_timer(&mut self, timer: &mut Self::Timer);
    /// Elapsed GPU time, or `None` while the result is not ready.
    fn timer_elapsed(&mut self, timer: &mut Self::Timer) -> Option<Duration>;
}
