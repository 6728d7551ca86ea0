//! Layer atlases: kernel4 renders layers into them and the blit reads them.
//!
//! Every frame, layers kept from the previous frame are first copied
//! together into a free atlas, so the atlases they leave become free for the
//! layers rendered this frame.

use crate::atlas::Packer;
use crate::collect::{Collector, Layer, LayerPlace};
use crate::coords::{IRect, IVec2};
use crate::device::{BlitBatch, Device, LayerVertex, TextureKind};
use crate::paint::Color;

use super::RenderError;

/// Largest layer atlas side; 4096 pixels fit the coarse stage's bin limit.
const MAX_LAYER_DIM: i32 = 4096;

/// Layers rendered together into one atlas.
pub(crate) struct Batch {
    pub atlas: usize,
    /// Layer index and its shift from device pixels to atlas texels.
    pub layers: Vec<(usize, IVec2)>,
    /// Where the next batch starts looking.
    pub next: usize,
}

struct LayerAtlas<D: Device> {
    tex: Option<(D::Texture, IVec2)>,
    /// Layers of the current frame placed here.
    layers: usize,
}

pub(crate) struct LayerAtlases<D: Device> {
    atlases: Vec<LayerAtlas<D>>,
    packer: Packer,
    vertices: Vec<LayerVertex>,
    /// `(atlas, end)` ranges of `vertices`.
    batches: Vec<(usize, usize)>,
}

impl<D: Device> LayerAtlases<D> {
    pub fn new(max_texture_size: i32) -> Self {
        Self {
            atlases: Vec::new(),
            packer: Packer::new(MAX_LAYER_DIM.min(max_texture_size)),
            vertices: Vec::new(),
            batches: Vec::new(),
        }
    }

    #[inline]
    pub fn texture(&self, atlas: usize) -> Option<&D::Texture> {
        self.atlases.get(atlas)?.tex.as_ref().map(|(tex, _)| tex)
    }

    /// Counts the layers each atlas holds for the freshly collected frame.
    pub fn recount(&mut self, layers: &[Layer]) {
        for a in &mut self.atlases {
            a.layers = 0;
        }
        for place in layers.iter().filter_map(|l| l.place) {
            if let Some(a) = self.atlases.get_mut(place.atlas) {
                a.layers += 1;
            }
        }
    }

    /// An atlas holding no layer, created when every atlas is in use.
    fn free_atlas(&mut self) -> usize {
        if let Some(i) = self.atlases.iter().position(|a| a.layers == 0) {
            return i;
        }
        self.atlases.push(LayerAtlas { tex: None, layers: 0 });
        self.atlases.len() - 1
    }

    /// Starts packing a new batch into a free atlas.
    fn begin_batch(&mut self) -> usize {
        self.packer.clear();
        self.packer.new_page();
        self.free_atlas()
    }

    /// Makes the texture of `atlas` at least `size`, rounded up to powers of
    /// two. A smaller texture is replaced, dropping its contents.
    fn ensure_size(&mut self, device: &mut D, atlas: usize, size: IVec2) -> Result<(), RenderError> {
        let a = &mut self.atlases[atlas];
        if let Some((_, cur)) = &a.tex {
            if cur.x >= size.x && cur.y >= size.y {
                return Ok(());
            }
        }
        let size = IVec2::new(pow2_ceil(size.x), pow2_ceil(size.y));
        log::debug!("layer atlas {atlas}: {}x{}", size.x, size.y);
        a.tex = None;
        a.tex = Some((device.new_texture(TextureKind::LayerAtlas, size)?, size));
        Ok(())
    }

    /// Moves every retained layer into free atlases, packed from the origin.
    pub fn compact(&mut self, device: &mut D, collector: &mut Collector) -> Result<(), RenderError> {
        let mut moves: Vec<(usize, LayerPlace)> = Vec::new();
        let layers = collector.layers();
        let mut idx = 0;
        while idx < layers.len() {
            let mut atlas = None;
            let mut added = false;
            let mut end = idx;
            let mut batch = Vec::new();
            while end < layers.len() {
                let l = &layers[end];
                let Some(place) = l.place else {
                    end += 1;
                    continue;
                };
                let dst = *atlas.get_or_insert_with(|| self.begin_batch());
                let Some(p) = self.packer.try_add(l.rect.size() + IVec2::splat(1)) else {
                    if !added {
                        return Err(too_large(l.rect));
                    }
                    break;
                };
                added = true;
                self.atlases[dst].layers += 1;
                batch.push((end, place, LayerPlace { atlas: dst, pos: p.pos }));
                end += 1;
            }
            if let Some(dst) = atlas.filter(|_| added) {
                let extent = self.packer.extent(0);
                self.ensure_size(device, dst, extent)?;
                for (i, from, to) in batch {
                    let size = layers[i].rect.size();
                    if let (Some(src), Some(dst)) = (self.texture(from.atlas), self.texture(to.atlas)) {
                        device.copy_texture(src, from.pos, dst, to.pos, size);
                    }
                    if let Some(a) = self.atlases.get_mut(from.atlas) {
                        a.layers = a.layers.saturating_sub(1);
                    }
                    moves.push((i, to));
                }
            }
            idx = end;
        }
        for (i, place) in moves {
            collector.set_layer_place(i, place);
        }
        Ok(())
    }

    /// Places the next batch of unrendered layers, starting at `from`, in
    /// one free atlas. `None` once every layer has a place.
    pub fn next_batch(&mut self, collector: &mut Collector, from: usize) -> Result<Option<Batch>, RenderError> {
        let mut idx = from;
        let mut atlas = None;
        let mut layers = Vec::new();
        while idx < collector.layers().len() {
            let l = &collector.layers()[idx];
            if l.place.is_some() {
                idx += 1;
                continue;
            }
            let rect = l.rect;
            let dst = *atlas.get_or_insert_with(|| self.begin_batch());
            let Some(p) = self.packer.try_add(rect.size() + IVec2::splat(1)) else {
                if layers.is_empty() {
                    return Err(too_large(rect));
                }
                break;
            };
            self.atlases[dst].layers += 1;
            collector.set_layer_place(idx, LayerPlace { atlas: dst, pos: p.pos });
            layers.push((idx, p.pos - rect.min));
            idx += 1;
        }
        Ok(atlas
            .filter(|_| !layers.is_empty())
            .map(|atlas| Batch { atlas, layers, next: idx }))
    }

    /// Texels the current batch covers.
    #[inline]
    pub fn batch_extent(&self) -> IVec2 {
        self.packer.extent(0)
    }

    /// Allocates the texture kernel4 renders the current batch into.
    pub fn prepare(&mut self, device: &mut D, atlas: usize, size: IVec2) -> Result<(), RenderError> {
        self.ensure_size(device, atlas, size)
    }

    /// Blends every placed layer over `target`, one batch per run of layers
    /// sharing an atlas.
    pub fn blit(&mut self, device: &mut D, layers: &[Layer], target: &D::Target, viewport: IVec2, clear: Option<Color>) {
        self.vertices.clear();
        self.batches.clear();
        for l in layers {
            let Some(place) = l.place else { continue };
            if self.batches.last().map(|&(a, _)| a) != Some(place.atlas) {
                self.batches.push((place.atlas, self.vertices.len()));
            }
            let [q0, q1, q2, q3] = layer_quad(l.rect, place.pos);
            self.vertices.extend_from_slice(&[q0, q1, q3, q3, q2, q1]);
            if let Some(last) = self.batches.last_mut() {
                last.1 = self.vertices.len();
            }
        }

        let mut start = 0;
        let mut batches = Vec::with_capacity(self.batches.len());
        for &(atlas, end) in &self.batches {
            let vertices = &self.vertices[start..end];
            start = end;
            let Some(atlas) = self.atlases.get(atlas).and_then(|a| a.tex.as_ref()) else {
                log::warn!("layer atlas {atlas} has no texture");
                continue;
            };
            batches.push(BlitBatch { atlas: &atlas.0, vertices });
        }
        device.blit(target, viewport, clear, &batches);
    }

    pub fn release(&mut self) {
        self.atlases.clear();
        self.packer.clear();
    }
}

fn too_large(rect: IRect) -> RenderError {
    let size = rect.size();
    RenderError::OutputTooLarge { width: size.x as u32, height: size.y as u32 }
}

/// Corners of `rect` in the order min, (max.x, min.y), max, (min.x, max.y),
/// mapped onto the atlas texels starting at `pos`.
fn layer_quad(rect: IRect, pos: IVec2) -> [LayerVertex; 4] {
    let (min, max) = (rect.min.to_f32(), rect.max.to_f32());
    let uv = pos.to_f32();
    let size = rect.size().to_f32();
    let v = |x: f32, y: f32, u: f32, w: f32| LayerVertex { pos: [x, y], uv: [u, w] };
    [
        v(min.x, min.y, uv.x, uv.y),
        v(max.x, min.y, uv.x + size.x, uv.y),
        v(max.x, max.y, uv.x + size.x, uv.y + size.y),
        v(min.x, max.y, uv.x, uv.y + size.y),
    ]
}

fn pow2_ceil(v: i32) -> i32 {
    (v.max(1) as u32).next_power_of_two() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── quads ──

    #[test]
    fn quad_maps_rect_onto_place() {
        let q = layer_quad(IRect::new(10, 20, 40, 30), IVec2::new(100, 0));
        assert_eq!(q[0].pos, [10.0, 20.0]);
        assert_eq!(q[0].uv, [100.0, 0.0]);
        assert_eq!(q[2].pos, [40.0, 30.0]);
        assert_eq!(q[2].uv, [130.0, 10.0]);
    }

    #[test]
    fn sizes_round_up_to_powers_of_two() {
        assert_eq!(pow2_ceil(0), 1);
        assert_eq!(pow2_ceil(64), 64);
        assert_eq!(pow2_ceil(65), 128);
        assert_eq!(pow2_ceil(601), 1024);
    }
}
