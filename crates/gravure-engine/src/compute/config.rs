/// Renderer configuration.
///
/// Keep this structure stable and minimal. The defaults match what the
/// kernels were tuned for.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Side of the image and material atlases before any growth.
    pub initial_atlas_dim: i32,

    /// Amount an atlas side grows by when a soft reclaim was not enough.
    pub atlas_growth_step: i32,

    /// Upper bound on atlas sides, applied on top of the device limit.
    ///
    /// Large atlases lose precision in the kernels.
    pub max_atlas_dim: i32,

    /// Dynamic allocation space added when the memory buffer must grow to
    /// hold the static regions.
    pub scratch_headroom: u64,

    /// Stroke solid outlines in the kernels instead of expanding them on
    /// the CPU. Dashed strokes are always expanded on the CPU.
    pub gpu_strokes: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            initial_atlas_dim: 256,
            atlas_growth_step: 256,
            max_atlas_dim: 8192,
            scratch_headroom: 4 * 1024 * 1024,
            gpu_strokes: false,
        }
    }
}
