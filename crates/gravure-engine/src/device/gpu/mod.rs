//! wgpu backend.
//!
//! This module is responsible for:
//! - creating a headless Instance/Adapter/Device/Queue (`GpuContext`)
//! - compiling the caller-supplied compute kernels (`KernelSources`)
//! - implementing `Device` with queued compute passes, the material draw,
//!   the output blit and timestamp timers (`WgpuDevice`)

mod context;
mod device;
mod init;
mod kernels;
mod pipelines;
mod timer;

pub use context::GpuContext;
pub use device::{WgpuBuffer, WgpuDevice, WgpuTarget, WgpuTexture};
pub use init::GpuInit;
pub use kernels::KernelSources;
pub use timer::WgpuTimer;
