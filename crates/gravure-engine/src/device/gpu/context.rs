use anyhow::{Context, Result};

use super::init::TIMER_FEATURES;
use super::GpuInit;

/// Owns the wgpu core objects for offscreen rendering.
///
/// No surface is created; callers render into their own textures and hand
/// them to the blit as `WgpuTarget`s.
pub struct GpuContext {
    /// wgpu instance used to create the adapter.
    instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Creates a context without a surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn headless(init: GpuInit) -> Result<Self> {
        let GpuInit {
            power_preference,
            force_fallback_adapter,
            mut required_features,
            required_limits,
            timers,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?}, {:?})", info.name, info.device_type, info.backend);

        if timers {
            if adapter.features().contains(TIMER_FEATURES) {
                required_features |= TIMER_FEATURES;
            } else {
                log::debug!("adapter lacks timestamp queries; profiling disabled");
            }
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("gravure device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Blocking variant of [`GpuContext::headless`].
    pub fn headless_blocking(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::headless(init))
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Splits the context into its device and queue.
    pub fn into_parts(self) -> (wgpu::Device, wgpu::Queue) {
        (self.device, self.queue)
    }
}
