use std::path::Path;

use anyhow::{Context, Result};

use crate::device::Kernel;

/// WGSL sources of the seven compute kernels.
///
/// Each kernel has a `main` entry point and declares its resources in group
/// 0, using exactly these bindings:
///
/// | kernel    | 0            | 1           | 2                     | 3                 |
/// |-----------|--------------|-------------|-----------------------|-------------------|
/// | elements  | memory (rw)  | config (ro) | scene (ro)            | state (rw)        |
/// | kernel4   | memory (rw)  | config (ro) | output `rgba8unorm` storage texture | material atlas `texture_2d<f32>` |
/// | the rest  | memory (rw)  | config (ro) |                       |                   |
#[derive(Debug, Clone)]
pub struct KernelSources {
    sources: [String; 7],
}

impl KernelSources {
    /// Sources in `Kernel::ALL` order.
    pub fn new(sources: [String; 7]) -> Self {
        Self { sources }
    }

    /// Reads `<name>.wgsl` for every kernel from `dir`, e.g. `kernel4.wgsl`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut sources: [String; 7] = Default::default();
        for (kernel, src) in Kernel::ALL.into_iter().zip(sources.iter_mut()) {
            let path = dir.join(format!("{}.wgsl", kernel.name()));
            *src = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read kernel {}", path.display()))?;
        }
        Ok(Self { sources })
    }

    pub fn source(&self, kernel: Kernel) -> &str {
        &self.sources[kernel.index()]
    }

    /// Compiles every kernel with an automatic bind group layout.
    pub(crate) fn compile(&self, device: &wgpu::Device) -> Vec<wgpu::ComputePipeline> {
        Kernel::ALL
            .into_iter()
            .map(|kernel| {
                let label = format!("gravure {} kernel", kernel.name());
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&label),
                    source: wgpu::ShaderSource::Wgsl(self.source(kernel).into()),
                });
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(&label),
                    layout: None,
                    module: &module,
                    entry_point: Some("main"),
                    compilation_options: Default::default(),
                    cache: None,
                })
            })
            .collect()
    }
}
