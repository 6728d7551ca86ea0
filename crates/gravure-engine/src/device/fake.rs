//! Recording device for renderer tests.
//!
//! Nothing is executed. Dispatches are logged, and reading back the memory
//! header reports what the GPU allocator would: `MallocFailed` while the
//! bound memory buffer is smaller than `required_memory`.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::coords::{IVec2, Rect, Vec2};
use crate::paint::Color;

use super::{BlitBatch, Caps, Device, DeviceError, Kernel, KernelBindings, MaterialVertex, TextureKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    NewBuffer(&'static str, u64),
    Upload(&'static str),
    Download(&'static str),
    NewTexture(TextureKind, IVec2),
    UploadTexture(TextureKind, IVec2),
    Bind,
    Dispatch(Kernel, [u32; 3]),
    Barrier,
    DrawMaterials { vertices: usize, clear: bool },
    CopyTexture { from: IVec2, to: IVec2, size: IVec2 },
    /// Target rectangles of the blitted layer quads, in batch order.
    Blit { quads: Vec<Rect>, clear: Option<Color> },
}

#[derive(Debug, Clone)]
pub struct FakeBuffer {
    id: u32,
    what: &'static str,
    size: u64,
    data: Rc<RefCell<Vec<u8>>>,
}

#[derive(Debug, Clone)]
pub struct FakeTexture {
    pub kind: TextureKind,
    pub size: IVec2,
}

#[derive(Debug, Default)]
pub struct FakeTimer {
    ended: bool,
}

pub struct FakeDevice {
    pub caps: Caps,
    pub events: Vec<Event>,
    /// Memory buffer size below which kernels report `MallocFailed`.
    pub required_memory: u64,
    /// Error code reported instead of success once memory suffices.
    pub kernel_error: Option<u32>,
    /// Number of upcoming downloads that fail with `ContentLost`.
    pub lose_content: u32,
    bound_memory: Option<u32>,
    next_id: u32,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self {
            caps: Caps {
                max_texture_size: 8192,
                max_buffer_size: 1 << 30,
                srgb: true,
                timers: false,
            },
            events: Vec::new(),
            required_memory: 0,
            kernel_error: None,
            lose_content: 0,
            bound_memory: None,
            next_id: 0,
        }
    }

    pub fn dispatches(&self) -> Vec<Kernel> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Dispatch(k, _) => Some(*k),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl Device for FakeDevice {
    type Buffer = FakeBuffer;
    type Texture = FakeTexture;
    type Target = ();
    type Timer = FakeTimer;

    fn caps(&self) -> Caps {
        self.caps
    }

    fn new_buffer(&mut self, what: &'static str, size: u64) -> Result<FakeBuffer, DeviceError> {
        if size > self.caps.max_buffer_size {
            return Err(DeviceError::OutOfMemory { what, size });
        }
        self.events.push(Event::NewBuffer(what, size));
        self.next_id += 1;
        Ok(FakeBuffer {
            id: self.next_id,
            what,
            size,
            data: Rc::new(RefCell::new(vec![0; size as usize])),
        })
    }

    fn upload_buffer(&mut self, buf: &FakeBuffer, data: &[u8]) {
        assert!(data.len() as u64 <= buf.size, "upload past the end of {}", buf.what);
        buf.data.borrow_mut()[..data.len()].copy_from_slice(data);
        self.events.push(Event::Upload(buf.what));
    }

    fn download_buffer(&mut self, buf: &FakeBuffer, dst: &mut [u8]) -> Result<(), DeviceError> {
        self.events.push(Event::Download(buf.what));
        if self.lose_content > 0 {
            self.lose_content -= 1;
            return Err(DeviceError::ContentLost);
        }
        let data = buf.data.borrow();
        dst.copy_from_slice(&data[..dst.len()]);
        if self.bound_memory == Some(buf.id) && dst.len() >= 8 {
            let error = if buf.size < self.required_memory {
                1
            } else {
                self.kernel_error.unwrap_or(0)
            };
            dst[4..8].copy_from_slice(&error.to_ne_bytes());
        }
        Ok(())
    }

    fn new_texture(&mut self, kind: TextureKind, size: IVec2) -> Result<FakeTexture, DeviceError> {
        if size.x > self.caps.max_texture_size || size.y > self.caps.max_texture_size {
            return Err(DeviceError::OutOfMemory { what: "texture", size: (size.x * size.y * 4) as u64 });
        }
        self.events.push(Event::NewTexture(kind, size));
        Ok(FakeTexture { kind, size })
    }

    fn upload_texture(&mut self, tex: &FakeTexture, pos: IVec2, size: IVec2, pixels: &[u8]) {
        assert_eq!(pixels.len(), (size.x * size.y * 4) as usize);
        assert!(pos.x + size.x <= tex.size.x && pos.y + size.y <= tex.size.y, "upload outside texture");
        self.events.push(Event::UploadTexture(tex.kind, pos));
    }

    fn bind_kernels(&mut self, bindings: KernelBindings<'_, Self>) {
        assert_eq!(bindings.output.kind, TextureKind::LayerAtlas);
        self.bound_memory = Some(bindings.memory.id);
        self.events.push(Event::Bind);
    }

    fn dispatch(&mut self, kernel: Kernel, groups: [u32; 3]) {
        self.events.push(Event::Dispatch(kernel, groups));
    }

    fn memory_barrier(&mut self) {
        self.events.push(Event::Barrier);
    }

    fn draw_materials(&mut self, _atlas: &FakeTexture, _images: &FakeTexture, vertices: &[MaterialVertex], clear: bool) {
        self.events.push(Event::DrawMaterials { vertices: vertices.len(), clear });
    }

    fn copy_texture(&mut self, src: &FakeTexture, src_pos: IVec2, dst: &FakeTexture, dst_pos: IVec2, size: IVec2) {
        for (tex, pos) in [(src, src_pos), (dst, dst_pos)] {
            assert_eq!(tex.kind, TextureKind::LayerAtlas);
            assert!(pos.x + size.x <= tex.size.x && pos.y + size.y <= tex.size.y, "copy outside texture");
        }
        self.events.push(Event::CopyTexture { from: src_pos, to: dst_pos, size });
    }

    fn blit(&mut self, _target: &(), _viewport: IVec2, clear: Option<Color>, batches: &[BlitBatch<'_, Self>]) {
        let mut quads = Vec::new();
        for batch in batches {
            assert_eq!(batch.atlas.kind, TextureKind::LayerAtlas);
            for tri in batch.vertices.chunks(6) {
                let pos = tri.iter().map(|v| Vec2::new(v.pos[0], v.pos[1]));
                let min = pos.clone().fold(Vec2::new(f32::MAX, f32::MAX), Vec2::min);
                let max = pos.fold(Vec2::new(f32::MIN, f32::MIN), Vec2::max);
                quads.push(Rect::from_min_max(min, max));
            }
        }
        self.events.push(Event::Blit { quads, clear });
    }

    fn new_timer(&mut self) -> Option<FakeTimer> {
        self.caps.timers.then(FakeTimer::default)
    }

    fn begin_timer(&mut self, timer: &mut FakeTimer) {
        timer.ended = false;
    }

    fn end_timer(&mut self, timer: &mut FakeTimer) {
        timer.ended = true;
    }

    fn timer_elapsed(&mut self, timer: &mut FakeTimer) -> Option<Duration> {
        timer.ended.then(|| Duration::from_micros(250))
    }
}
