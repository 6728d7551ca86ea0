use std::sync::mpsc;
use std::time::Duration;

use wgpu::util::DeviceExt;

use crate::coords::IVec2;
use crate::device::{BlitBatch, Caps, Device, DeviceError, Kernel, KernelBindings, MaterialVertex, TextureKind};
use crate::paint::color::linear_to_srgb;
use crate::paint::Color;

use super::init::TIMER_FEATURES;
use super::pipelines::{BlitParams, BlitPipeline, MaterialPipeline, MaterialUniform, MATERIAL_FORMAT};
use super::timer::WgpuTimer;
use super::{GpuContext, KernelSources};

/// Storage buffer with its byte size.
pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

impl WgpuBuffer {
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    kind: TextureKind,
}

impl WgpuTexture {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }
}

/// A render attachment the layers are blitted onto.
pub struct WgpuTarget {
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub size: IVec2,
}

impl WgpuTarget {
    pub fn new(texture: &wgpu::Texture) -> Self {
        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            format: texture.format(),
            size: IVec2::new(texture.width() as i32, texture.height() as i32),
        }
    }
}

/// Work recorded but not yet encoded.
enum Pending {
    Dispatch {
        kernel: Kernel,
        groups: [u32; 3],
        bind_group: wgpu::BindGroup,
    },
    Barrier,
    Timestamp(wgpu::QuerySet, u32),
}

/// `Device` implementation on top of wgpu.
///
/// Dispatches are queued and encoded on the next call that needs their
/// results. Every barrier closes the current compute pass.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    caps: Caps,
    kernels: Vec<wgpu::ComputePipeline>,
    bind_groups: Option<Vec<wgpu::BindGroup>>,
    pending: Vec<Pending>,
    material: Option<MaterialPipeline>,
    blit: Option<BlitPipeline>,
    /// Bound in place of a missing material atlas.
    placeholder: WgpuTexture,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, kernels: &KernelSources) -> Self {
        let limits = device.limits();
        let caps = Caps {
            max_texture_size: limits.max_texture_dimension_2d as i32,
            max_buffer_size: u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size),
            srgb: true,
            timers: device.features().contains(TIMER_FEATURES),
        };
        log::debug!("device caps: {caps:?}");

        let pipelines = kernels.compile(&device);
        let placeholder = create_texture(&device, TextureKind::MaterialAtlas, IVec2::splat(1));

        Self {
            device,
            queue,
            caps,
            kernels: pipelines,
            bind_groups: None,
            pending: Vec::new(),
            material: None,
            blit: None,
            placeholder,
        }
    }

    pub fn from_context(ctx: GpuContext, kernels: &KernelSources) -> Self {
        let (device, queue) = ctx.into_parts();
        Self::new(device, queue, kernels)
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Reads an RGBA8 texture back into tightly packed rows.
    pub fn read_texture(&mut self, texture: &wgpu::Texture) -> Result<Vec<u8>, DeviceError> {
        let (width, height) = (texture.width(), texture.height());
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = (width * 4).div_ceil(align) * align;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gravure texture readback"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.record_pending();
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        self.map_blocking(&staging, |data| {
            for row in data.chunks_exact(padded_row as usize) {
                pixels.extend_from_slice(&row[..(width * 4) as usize]);
            }
        })?;
        Ok(pixels)
    }

    /// Encodes queued work into a fresh command encoder.
    fn record_pending(&mut self) -> wgpu::CommandEncoder {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gravure encoder"),
        });

        let pending = std::mem::take(&mut self.pending);
        let mut ops = pending.iter().peekable();
        while let Some(op) = ops.next() {
            match op {
                Pending::Barrier => {}
                Pending::Timestamp(query_set, index) => encoder.write_timestamp(query_set, *index),
                Pending::Dispatch { .. } => {
                    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                        label: Some("gravure kernels"),
                        timestamp_writes: None,
                    });
                    let mut next = Some(op);
                    while let Some(Pending::Dispatch { kernel, groups, bind_group }) = next {
                        log::trace!("dispatch {} {:?}", kernel.name(), groups);
                        pass.set_pipeline(&self.kernels[kernel.index()]);
                        pass.set_bind_group(0, bind_group, &[]);
                        pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
                        next = ops.next_if(|op| matches!(op, Pending::Dispatch { .. }));
                    }
                }
            }
        }
        encoder
    }

    fn map_blocking(&self, buffer: &wgpu::Buffer, read: impl FnOnce(&[u8])) -> Result<(), DeviceError> {
        let slice = buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|err| DeviceError::Backend(err.to_string()))?;
        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::warn!("buffer mapping failed: {err}");
                return Err(DeviceError::ContentLost);
            }
            Err(_) => return Err(DeviceError::ContentLost),
        }
        read(&slice.get_mapped_range());
        buffer.unmap();
        Ok(())
    }

    fn kernel_bind_group(&self, kernel: Kernel, b: &KernelBindings<'_, Self>) -> wgpu::BindGroup {
        let atlas = b.atlas.unwrap_or(&self.placeholder);
        let mut entries = vec![
            wgpu::BindGroupEntry { binding: 0, resource: b.memory.buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: b.config.buffer.as_entire_binding() },
        ];
        match kernel {
            Kernel::Elements => {
                entries.push(wgpu::BindGroupEntry { binding: 2, resource: b.scene.buffer.as_entire_binding() });
                entries.push(wgpu::BindGroupEntry { binding: 3, resource: b.state.buffer.as_entire_binding() });
            }
            Kernel::Kernel4 => {
                entries.push(wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&b.output.view),
                });
                entries.push(wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&atlas.view),
                });
            }
            _ => {}
        }
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.name()),
            layout: &self.kernels[kernel.index()].get_bind_group_layout(0),
            entries: &entries,
        })
    }
}

impl Device for WgpuDevice {
    type Buffer = WgpuBuffer;
    type Texture = WgpuTexture;
    type Target = WgpuTarget;
    type Timer = WgpuTimer;

    fn caps(&self) -> Caps {
        self.caps
    }

    fn new_buffer(&mut self, what: &'static str, size: u64) -> Result<WgpuBuffer, DeviceError> {
        if size > self.caps.max_buffer_size {
            return Err(DeviceError::OutOfMemory { what, size });
        }
        let size = size.max(4).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(what),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        Ok(WgpuBuffer { buffer, size })
    }

    fn upload_buffer(&mut self, buf: &WgpuBuffer, data: &[u8]) {
        self.queue.write_buffer(&buf.buffer, 0, data);
    }

    fn download_buffer(&mut self, buf: &WgpuBuffer, dst: &mut [u8]) -> Result<(), DeviceError> {
        let size = (dst.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gravure download"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self.record_pending();
        encoder.copy_buffer_to_buffer(&buf.buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));
        self.map_blocking(&staging, |data| dst.copy_from_slice(&data[..dst.len()]))
    }

    fn new_texture(&mut self, kind: TextureKind, size: IVec2) -> Result<WgpuTexture, DeviceError> {
        let max = self.caps.max_texture_size;
        if size.x > max || size.y > max {
            return Err(DeviceError::OutOfMemory {
                what: "texture",
                size: size.x as u64 * size.y as u64 * 4,
            });
        }
        Ok(create_texture(&self.device, kind, size))
    }

    fn upload_texture(&mut self, tex: &WgpuTexture, pos: IVec2, size: IVec2, pixels: &[u8]) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: pos.x as u32, y: pos.y as u32, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.x as u32 * 4),
                rows_per_image: Some(size.y as u32),
            },
            wgpu::Extent3d {
                width: size.x as u32,
                height: size.y as u32,
                depth_or_array_layers: 1,
            },
        );
    }

    fn bind_kernels(&mut self, bindings: KernelBindings<'_, Self>) {
        let groups = Kernel::ALL
            .into_iter()
            .map(|kernel| self.kernel_bind_group(kernel, &bindings))
            .collect();
        self.bind_groups = Some(groups);
    }

    fn dispatch(&mut self, kernel: Kernel, groups: [u32; 3]) {
        let Some(bind_groups) = &self.bind_groups else {
            log::error!("dispatch of {} without bound resources", kernel.name());
            return;
        };
        let bind_group = bind_groups[kernel.index()].clone();
        self.pending.push(Pending::Dispatch { kernel, groups, bind_group });
    }

    fn memory_barrier(&mut self) {
        self.pending.push(Pending::Barrier);
    }

    fn draw_materials(&mut self, atlas: &WgpuTexture, images: &WgpuTexture, vertices: &[MaterialVertex], clear: bool) {
        if vertices.is_empty() && !clear {
            return;
        }
        let material = self.material.get_or_insert_with(|| MaterialPipeline::new(&self.device));
        let uniform = MaterialUniform::for_atlas(atlas.texture.width(), atlas.texture.height());
        self.queue.write_buffer(&material.uniforms, 0, bytemuck::bytes_of(&uniform));
        let bind_group = material.bind_group(&self.device, &images.view);
        let vbo = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("gravure material vbo"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let mut encoder = self.record_pending();
        {
            let load = if clear {
                wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
            } else {
                wgpu::LoadOp::Load
            };
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("gravure material pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &atlas.view,
                    resolve_target: None,
                    ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            if let Some(material) = &self.material {
                rpass.set_pipeline(&material.pipeline);
                rpass.set_bind_group(0, &bind_group, &[]);
                rpass.set_vertex_buffer(0, vbo.slice(..));
                rpass.draw(0..vertices.len() as u32, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn copy_texture(&mut self, src: &WgpuTexture, src_pos: IVec2, dst: &WgpuTexture, dst_pos: IVec2, size: IVec2) {
        let mut encoder = self.record_pending();
        encoder.copy_texture_to_texture(
            texel_at(src, src_pos),
            texel_at(dst, dst_pos),
            wgpu::Extent3d {
                width: size.x as u32,
                height: size.y as u32,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn blit(&mut self, target: &WgpuTarget, viewport: IVec2, clear: Option<Color>, batches: &[BlitBatch<'_, Self>]) {
        if self.blit.as_ref().map(|b| b.format) != Some(target.format) {
            self.blit = Some(BlitPipeline::new(&self.device, target.format));
        }
        let mut encoder = self.record_pending();
        let Some(blit) = &self.blit else { return };
        let params = BlitParams::new(viewport.x.max(1) as u32, viewport.y.max(1) as u32, target.format);
        self.queue.write_buffer(&blit.params, 0, bytemuck::bytes_of(&params));
        let load = match clear {
            Some(c) => wgpu::LoadOp::Clear(clear_value(c, target.format.is_srgb())),
            None => wgpu::LoadOp::Load,
        };
        let width = viewport.x.min(target.size.x).max(0) as u32;
        let height = viewport.y.min(target.size.y).max(0) as u32;

        let draws: Vec<_> = batches
            .iter()
            .filter(|b| !b.vertices.is_empty())
            .map(|b| {
                let vbo = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("gravure blit vbo"),
                    contents: bytemuck::cast_slice(b.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                (blit.bind_group(&self.device, &b.atlas.view), vbo, b.vertices.len() as u32)
            })
            .collect();
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("gravure blit pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            if width > 0 && height > 0 && !draws.is_empty() {
                rpass.set_scissor_rect(0, 0, width, height);
                rpass.set_pipeline(&blit.pipeline);
                for (bind_group, vbo, count) in &draws {
                    rpass.set_bind_group(0, bind_group, &[]);
                    rpass.set_vertex_buffer(0, vbo.slice(..));
                    rpass.draw(0..*count, 0..1);
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn new_timer(&mut self) -> Option<WgpuTimer> {
        self.caps.timers.then(|| WgpuTimer::new(&self.device))
    }

    fn begin_timer(&mut self, timer: &mut WgpuTimer) {
        if timer.busy() {
            return;
        }
        timer.armed = true;
        self.pending.push(Pending::Timestamp(timer.query_set.clone(), 0));
    }

    fn end_timer(&mut self, timer: &mut WgpuTimer) {
        if !timer.armed {
            return;
        }
        timer.armed = false;
        self.pending.push(Pending::Timestamp(timer.query_set.clone(), 1));
        let mut encoder = self.record_pending();
        timer.resolve(&mut encoder);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn timer_elapsed(&mut self, timer: &mut WgpuTimer) -> Option<Duration> {
        timer.poll(&self.device, self.queue.get_timestamp_period())
    }
}

fn create_texture(device: &wgpu::Device, kind: TextureKind, size: IVec2) -> WgpuTexture {
    let (label, format, usage) = match kind {
        TextureKind::LayerAtlas => (
            "gravure layer atlas",
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
        ),
        TextureKind::ImageAtlas => (
            "gravure image atlas",
            wgpu::TextureFormat::Rgba8UnormSrgb,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        ),
        TextureKind::MaterialAtlas => (
            "gravure material atlas",
            MATERIAL_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        ),
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.x.max(1) as u32,
            height: size.y.max(1) as u32,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    WgpuTexture { texture, view, kind }
}

fn texel_at(tex: &WgpuTexture, pos: IVec2) -> wgpu::TexelCopyTextureInfo<'_> {
    wgpu::TexelCopyTextureInfo {
        texture: &tex.texture,
        mip_level: 0,
        origin: wgpu::Origin3d { x: pos.x as u32, y: pos.y as u32, z: 0 },
        aspect: wgpu::TextureAspect::All,
    }
}

/// Clear color in the numeric space of the target.
fn clear_value(c: Color, srgb_target: bool) -> wgpu::Color {
    if srgb_target {
        return wgpu::Color { r: c.r as f64, g: c.g as f64, b: c.b as f64, a: c.a as f64 };
    }
    let (r, g, b, a) = c.to_straight();
    let enc = |v: f32| (linear_to_srgb(v) * a) as f64;
    wgpu::Color { r: enc(r), g: enc(g), b: enc(b), a: a as f64 }
}
