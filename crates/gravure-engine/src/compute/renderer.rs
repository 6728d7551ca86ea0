use std::time::Duration;

use crate::cache::{ImageCache, PathCache};
use crate::collect::Collector;
use crate::coords::{Affine2D, IVec2, Viewport};
use crate::device::{Caps, Device, DeviceError, Kernel, KernelBindings};
use crate::ops::OpList;
use crate::paint::Color;
use crate::scene::{EncodeOptions, SceneEncoder, COMMAND_SIZE, PARTITION_SIZE};

use super::atlases::{ImageAtlas, Ladder, MaterialAtlas};
use super::buffer::SizedBuffer;
use super::layers::{Batch, LayerAtlases};
use super::memory::{self, Config, MemError, MemoryHeader, TileDims, HEADER_SIZE, MAX_BINS, WG_SIZE};
use super::{RenderError, RendererConfig};

/// Scratch and input buffers bound to the kernels.
struct Buffers<D: Device> {
    config: SizedBuffer<D>,
    scene: SizedBuffer<D>,
    state: SizedBuffer<D>,
    memory: SizedBuffer<D>,
}

impl<D: Device> Buffers<D> {
    fn new() -> Self {
        Self {
            config: SizedBuffer::new("config"),
            scene: SizedBuffer::new("scene"),
            state: SizedBuffer::new("state"),
            memory: SizedBuffer::new("memory"),
        }
    }
}

/// A device timer and its last reading.
struct Stopwatch<D: Device> {
    timer: D::Timer,
    elapsed: Option<Duration>,
}

struct Timers<D: Device> {
    upload: Stopwatch<D>,
    render: Stopwatch<D>,
    blit: Stopwatch<D>,
}

impl<D: Device> Timers<D> {
    fn new(device: &mut D) -> Option<Self> {
        let mut watch = || Some(Stopwatch { timer: device.new_timer()?, elapsed: None });
        Some(Self { upload: watch()?, render: watch()?, blit: watch()? })
    }

    /// Collects finished readings; returns a summary once all three are in.
    fn poll(&mut self, device: &mut D) -> Option<String> {
        for sw in [&mut self.upload, &mut self.render, &mut self.blit] {
            if let Some(d) = device.timer_elapsed(&mut sw.timer) {
                sw.elapsed = Some(d);
            }
        }
        let upl = self.upload.elapsed?;
        let ren = self.render.elapsed?;
        let blit = self.blit.elapsed?;
        self.upload.elapsed = None;
        self.render.elapsed = None;
        self.blit.elapsed = None;
        Some(format!(
            "ft:{:>9} upl:{:>9} ren:{:>9} blit:{:>9}",
            fmt_duration(upl + ren + blit),
            fmt_duration(upl),
            fmt_duration(ren),
            fmt_duration(blit),
        ))
    }
}

fn fmt_duration(d: Duration) -> String {
    format!("{:.2?}", d)
}

/// Renders operation lists with the compute kernels.
///
/// A frame runs in a fixed order: collect the ops into layers, copy the
/// layers kept from the previous frame together, render the others in
/// batches, then blit every layer. Rendering a batch encodes its layers,
/// uploads images and materials, allocates scratch memory and dispatches the
/// kernels, retrying with more memory while they report a failed allocation.
pub struct ComputeRenderer<D: Device> {
    device: D,
    config: RendererConfig,
    caps: Caps,
    ladder: Ladder,

    collector: Collector,
    enc: SceneEncoder,
    viewport: Viewport,

    images: ImageAtlas<D>,
    materials: MaterialAtlas<D>,
    image_cache: ImageCache,
    path_cache: PathCache,

    buffers: Buffers<D>,
    layers: LayerAtlases<D>,
    scene_bytes: Vec<u8>,
    zeros: Vec<u8>,

    timers: Option<Timers<D>>,
    profile: Option<String>,
}

impl<D: Device> ComputeRenderer<D> {
    pub fn new(mut device: D, config: RendererConfig) -> Result<Self, RenderError> {
        let caps = device.caps();
        let cap = caps.max_texture_size.min(config.max_atlas_dim);
        let initial = config.initial_atlas_dim.clamp(1, cap.max(1));
        let ladder = Ladder { step: config.atlas_growth_step, cap };
        log::debug!("compute renderer: atlas {initial} (cap {cap}), caps {caps:?}");

        let mut buffers = Buffers::new();
        buffers
            .config
            .ensure_capacity(&mut device, std::mem::size_of::<Config>() as u64)?;

        Ok(Self {
            device,
            config,
            caps,
            ladder,
            collector: Collector::new(),
            enc: SceneEncoder::new(),
            viewport: Viewport::new(0, 0),
            images: ImageAtlas::new(initial),
            materials: MaterialAtlas::new(initial),
            image_cache: ImageCache::new(),
            path_cache: PathCache::new(),
            buffers,
            layers: LayerAtlases::new(caps.max_texture_size),
            scene_bytes: Vec::new(),
            zeros: Vec::new(),
            timers: None,
            profile: None,
        })
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[inline]
    pub fn encoder(&self) -> &SceneEncoder {
        &self.enc
    }

    #[inline]
    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Texture of layer atlas `index`, holding linear premultiplied pixels.
    pub fn layer_atlas(&self, index: usize) -> Option<&D::Texture> {
        self.layers.texture(index)
    }

    /// Last GPU timing summary, when the op list asked for profiling.
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Collects `ops` and splits the resulting paints into layers.
    pub fn collect(&mut self, ops: &OpList, viewport: Viewport) {
        self.viewport = viewport;
        self.collector.collect(ops, Affine2D::IDENTITY, viewport);
        self.layers.recount(self.collector.layers());
        log::trace!(
            "collected {} paints in {} layers",
            self.collector.paint_ops().len(),
            self.collector.layers().len()
        );
    }

    /// Compacts the kept layers and renders the rest. On failure every layer
    /// is forgotten, so the next frame renders from scratch.
    pub fn render(&mut self) -> Result<(), RenderError> {
        if self.collector.profile_requested() && self.timers.is_none() && self.caps.timers {
            self.timers = Timers::new(&mut self.device);
        }
        let result = self.render_layers();
        if result.is_err() {
            self.collector.forget_layer_places();
        }
        result
    }

    fn render_layers(&mut self) -> Result<(), RenderError> {
        if let Some(t) = &mut self.timers {
            self.device.begin_timer(&mut t.upload.timer);
        }
        self.layers.compact(&mut self.device, &mut self.collector)?;
        if let Some(t) = &mut self.timers {
            self.device.end_timer(&mut t.upload.timer);
            self.device.begin_timer(&mut t.render.timer);
        }

        let mut from = 0;
        while let Some(batch) = self.layers.next_batch(&mut self.collector, from)? {
            from = batch.next;
            self.encode_batch(&batch);
            self.images
                .upload(&mut self.device, self.enc.tex_ops(), &mut self.image_cache, self.ladder)?;
            self.materials
                .render(&mut self.device, &mut self.enc, &self.images, self.ladder)?;
            self.dispatch_kernels(batch.atlas)?;
        }

        if let Some(t) = &mut self.timers {
            self.device.end_timer(&mut t.render.timer);
        }
        Ok(())
    }

    fn encode_batch(&mut self, batch: &Batch) {
        let options = EncodeOptions { gpu_strokes: self.config.gpu_strokes };
        self.enc.reset();
        let layers = self.collector.layers();
        for &(index, shift) in &batch.layers {
            let ops = &self.collector.paint_ops()[layers[index].ops.clone()];
            self.enc
                .encode_layer(self.viewport, ops, shift, &mut self.path_cache, options);
        }
        log::trace!(
            "atlas {}: {} layers, {} commands ({} paths, {} segments)",
            batch.atlas,
            batch.layers.len(),
            self.enc.scene().len(),
            self.enc.npath(),
            self.enc.npathseg()
        );
    }

    /// Clears the target if the collector found a full-viewport clear, then
    /// blends every layer over it.
    pub fn blit(&mut self, target: &D::Target) {
        let clear = self.collector.clear_color();
        let layers = self.collector.layers();
        if layers.is_empty() && clear.is_none() {
            return;
        }
        if let Some(t) = &mut self.timers {
            self.device.begin_timer(&mut t.blit.timer);
        }
        self.layers
            .blit(&mut self.device, layers, target, self.viewport.size(), clear);
        if let Some(t) = &mut self.timers {
            self.device.end_timer(&mut t.blit.timer);
            if let Some(profile) = t.poll(&mut self.device) {
                log::debug!("{profile}");
                self.profile = Some(profile);
            }
        }
    }

    /// Collects, renders and blits one frame, then evicts cache entries the
    /// frame did not use.
    pub fn frame(&mut self, ops: &OpList, viewport: Viewport, target: &D::Target) -> Result<(), RenderError> {
        self.collect(ops, viewport);
        self.render()?;
        self.blit(target);
        self.end_frame();
        Ok(())
    }

    /// Evicts cache entries not referenced since the previous call.
    pub fn end_frame(&mut self) {
        self.image_cache.frame();
        self.path_cache.frame();
    }

    /// Drops every device resource and cached entry.
    pub fn release(&mut self) {
        self.image_cache.release();
        self.path_cache.release();
        self.images.release();
        self.materials.release();
        self.buffers.scene.release();
        self.buffers.state.release();
        self.buffers.memory.release();
        self.layers.release();
        self.collector.forget_layer_places();
        self.timers = None;
    }

    /// The output color a clear-only frame resolves to.
    pub fn clear_color(&self) -> Option<Color> {
        self.collector.clear_color()
    }

    /// Runs the kernels over the encoded batch, rendering into `atlas`.
    fn dispatch_kernels(&mut self, atlas: usize) -> Result<(), RenderError> {
        let extent = self.layers.batch_extent();
        let tiles = TileDims::covering(extent.x as u32, extent.y as u32);
        let (width_in_bins, height_in_bins) = tiles.bins();
        let (width, height) = tiles.pixels();
        if width_in_bins * height_in_bins > MAX_BINS {
            return Err(RenderError::OutputTooLarge { width, height });
        }
        self.layers
            .prepare(&mut self.device, atlas, IVec2::new(width as i32, height as i32))?;

        let enc = &self.enc;
        let padded = enc.padded_len();
        self.scene_bytes.clear();
        self.scene_bytes.extend_from_slice(bytemuck::cast_slice(enc.scene()));
        self.scene_bytes.resize(padded * COMMAND_SIZE, 0);
        self.buffers
            .scene
            .reserve(&mut self.device, self.scene_bytes.len() as u64)?;
        self.buffers.scene.upload(&mut self.device, &self.scene_bytes);

        let (npath, npathseg) = (enc.npath(), enc.npathseg());
        let (config, alloc) = Config::layout(npath, npathseg, enc.ntrans(), tiles);
        let partitions = (padded / PARTITION_SIZE) as u32;
        let clear_size = memory::state_clear_size(partitions);
        self.buffers.state.reserve(&mut self.device, clear_size)?;
        if self.zeros.len() < clear_size as usize {
            self.zeros.resize(clear_size as usize, 0);
        }
        self.buffers
            .config
            .upload(&mut self.device, bytemuck::bytes_of(&config));

        let min_size = HEADER_SIZE + alloc as u64;
        if min_size > self.buffers.memory.size() {
            self.grow_memory(min_size + self.config.scratch_headroom)?;
        }

        let path_groups = npath.div_ceil(WG_SIZE);
        let mut lost = false;
        let mut attempt = 0;
        loop {
            attempt += 1;
            log::trace!(
                "dispatch attempt {attempt}: {} bytes scratch, {}x{} tiles",
                self.buffers.memory.size(),
                tiles.x,
                tiles.y
            );
            let header = MemoryHeader { mem_offset: alloc, mem_error: 0 };
            self.buffers
                .memory
                .upload(&mut self.device, bytemuck::bytes_of(&header));
            self.buffers
                .state
                .upload(&mut self.device, &self.zeros[..clear_size as usize]);
            self.bind(atlas)?;

            let d = &mut self.device;
            d.memory_barrier();
            d.dispatch(Kernel::Elements, [partitions, 1, 1]);
            d.memory_barrier();
            d.dispatch(Kernel::TileAlloc, [path_groups, 1, 1]);
            d.memory_barrier();
            d.dispatch(Kernel::PathCoarse, [npathseg.div_ceil(32), 1, 1]);
            d.memory_barrier();
            d.dispatch(Kernel::Backdrop, [path_groups, 1, 1]);
            // Binning does not read what backdrop writes.
            d.dispatch(Kernel::Binning, [path_groups, 1, 1]);
            d.memory_barrier();
            d.dispatch(Kernel::Coarse, [width_in_bins, height_in_bins, 1]);
            d.memory_barrier();
            d.dispatch(Kernel::Kernel4, [tiles.x, tiles.y, 1]);
            d.memory_barrier();

            let mut header = MemoryHeader::default();
            match self
                .buffers
                .memory
                .download(&mut self.device, bytemuck::bytes_of_mut(&mut header))
            {
                Ok(()) => {}
                Err(DeviceError::ContentLost) if !lost => {
                    log::warn!("device content lost during readback; retrying");
                    lost = true;
                    continue;
                }
                Err(err) => return Err(err.into()),
            }

            match MemError::from(header.mem_error) {
                MemError::NoError => return Ok(()),
                MemError::MallocFailed => {
                    let size = self.buffers.memory.size() * 15 / 10;
                    self.grow_memory(size)?;
                }
                MemError::Other(code) => return Err(RenderError::Kernel { code }),
            }
        }
    }

    fn grow_memory(&mut self, size: u64) -> Result<(), RenderError> {
        if size > self.caps.max_buffer_size {
            return Err(RenderError::ScratchExhausted { size });
        }
        log::debug!("growing scratch memory to {size} bytes");
        self.buffers.memory.ensure_capacity(&mut self.device, size)?;
        Ok(())
    }

    fn bind(&mut self, atlas: usize) -> Result<(), RenderError> {
        let b = &self.buffers;
        let (Some(memory), Some(config), Some(scene), Some(state), Some(output)) = (
            b.memory.buffer(),
            b.config.buffer(),
            b.scene.buffer(),
            b.state.buffer(),
            self.layers.texture(atlas),
        ) else {
            return Err(RenderError::Device(DeviceError::Backend(
                "kernel resources are not allocated".into(),
            )));
        };
        self.device.bind_kernels(KernelBindings {
            memory,
            config,
            scene,
            state,
            output,
            atlas: self.materials.texture(),
        });
        Ok(())
    }
}
