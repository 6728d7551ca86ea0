//! Image and material atlases, refilled through the retry ladder.

use rustc_hash::FxHashMap;

use crate::atlas::{AtlasKind, Packer, RetryLadder};
use crate::cache::{ImageCache, ImageSource};
use crate::coords::{Affine2D, IRect, IVec2, Rect, Vec2};
use crate::device::{Device, MaterialVertex, TextureKind};
use crate::paint::{ImageHandle, ImageId};
use crate::scene::{SceneEncoder, TextureKey, TextureOp};

use super::RenderError;

/// Zero texels right of and below every image, so filtering at its edges
/// never picks up a neighbour.
const PADDING: i32 = 1;

/// Growth parameters shared by both atlases.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Ladder {
    pub step: i32,
    pub cap: i32,
}

/// Source images packed into one texture.
pub(crate) struct ImageAtlas<D: Device> {
    packer: Packer,
    positions: FxHashMap<ImageId, IVec2>,
    tex: Option<D::Texture>,
    zeros: Vec<u8>,
}

impl<D: Device> ImageAtlas<D> {
    pub fn new(dim: i32) -> Self {
        Self {
            packer: Packer::new(dim),
            positions: FxHashMap::default(),
            tex: None,
            zeros: Vec::new(),
        }
    }

    #[inline]
    pub fn max_dim(&self) -> i32 {
        self.packer.max_dim
    }

    #[inline]
    pub fn texture(&self) -> Option<&D::Texture> {
        self.tex.as_ref()
    }

    #[inline]
    pub fn position(&self, id: ImageId) -> Option<IVec2> {
        self.positions.get(&id).copied()
    }

    /// Places every image used by `tex_ops` and uploads the ones that were
    /// not already in the atlas.
    pub fn upload(
        &mut self,
        device: &mut D,
        tex_ops: &[TextureOp],
        cache: &mut ImageCache,
        ladder: Ladder,
    ) -> Result<(), RenderError> {
        for op in tex_ops {
            let id = op.image.id();
            if cache.get(&id).is_none() {
                cache.put(id, image_source(&op.image));
            }
        }

        let mut retry = RetryLadder::new(AtlasKind::Image, ladder.step, ladder.cap);
        let mut uploads: Vec<ImageId> = Vec::new();
        'restart: loop {
            for op in tex_ops {
                let id = op.image.id();
                if self.positions.contains_key(&id) {
                    continue;
                }
                let size = op.image.size() + IVec2::splat(PADDING);
                match self.packer.try_add(size) {
                    Some(place) => {
                        self.positions.insert(id, place.pos);
                        uploads.push(id);
                    }
                    None => {
                        // Some images may no longer be in use.
                        self.positions.clear();
                        uploads.clear();
                        if !retry.climb(&mut self.packer) {
                            return Err(RenderError::AtlasExhausted { atlas: AtlasKind::Image });
                        }
                        continue 'restart;
                    }
                }
            }
            break;
        }
        if uploads.is_empty() {
            return Ok(());
        }

        if retry.grown() || self.tex.is_none() {
            let dim = self.packer.max_dim;
            self.tex = Some(device.new_texture(TextureKind::ImageAtlas, IVec2::splat(dim))?);
        }
        let Some(tex) = &self.tex else {
            return Ok(());
        };
        for id in uploads {
            let (Some(src), Some(pos)) = (cache.get(&id), self.positions.get(&id)) else {
                continue;
            };
            let (pos, size) = (*pos, src.size);
            device.upload_texture(tex, pos, size, &src.pixels);

            let right = IVec2::new(PADDING, size.y);
            let bottom = IVec2::new(size.x, PADDING);
            let n = (size.x.max(size.y) * PADDING * 4) as usize;
            if self.zeros.len() < n {
                self.zeros.resize(n, 0);
            }
            device.upload_texture(tex, IVec2::new(pos.x + size.x, pos.y), right, &self.zeros[..(size.y * PADDING * 4) as usize]);
            device.upload_texture(tex, IVec2::new(pos.x, pos.y + size.y), bottom, &self.zeros[..(size.x * PADDING * 4) as usize]);
        }
        Ok(())
    }

    pub fn release(&mut self) {
        self.packer.clear();
        self.positions.clear();
        self.tex = None;
    }
}

fn image_source(img: &ImageHandle) -> ImageSource {
    ImageSource {
        size: img.size(),
        pixels: img.data().premultiplied().into(),
    }
}

/// Transformed images, rendered once per `TextureKey` and read by kernel4.
pub(crate) struct MaterialAtlas<D: Device> {
    packer: Packer,
    offsets: FxHashMap<TextureKey, IVec2>,
    tex: Option<D::Texture>,
    quads: Vec<MaterialVertex>,
}

impl<D: Device> MaterialAtlas<D> {
    pub fn new(dim: i32) -> Self {
        Self {
            packer: Packer::new(dim),
            offsets: FxHashMap::default(),
            tex: None,
            quads: Vec::new(),
        }
    }

    #[inline]
    pub fn max_dim(&self) -> i32 {
        self.packer.max_dim
    }

    #[inline]
    pub fn texture(&self) -> Option<&D::Texture> {
        self.tex.as_ref()
    }

    /// Renders the materials missing from the atlas and patches every
    /// `FillImage` command with its atlas offset.
    pub fn render(
        &mut self,
        device: &mut D,
        enc: &mut SceneEncoder,
        images: &ImageAtlas<D>,
        ladder: Ladder,
    ) -> Result<(), RenderError> {
        self.quads.clear();
        let mut retry = RetryLadder::new(AtlasKind::Material, ladder.step, ladder.cap);
        'restart: loop {
            for op in enc.tex_ops() {
                if self.offsets.contains_key(&op.key) {
                    continue;
                }
                let Some(uv_pos) = images.position(op.image.id()) else {
                    continue;
                };
                let (mut quad, bounds) = material_quad(op.key.transform, op.image.size(), uv_pos, images.max_dim());

                // Clipping imprecision may overflow the bounds by a pixel.
                let size = bounds.size() + IVec2::splat(1);
                let Some(place) = self.packer.try_add(size) else {
                    self.offsets.clear();
                    self.quads.clear();
                    if !retry.climb(&mut self.packer) {
                        return Err(RenderError::AtlasExhausted { atlas: AtlasKind::Material });
                    }
                    continue 'restart;
                };
                let offset = place.pos - bounds.min;
                let shift = offset.to_f32();
                for v in &mut quad {
                    v.pos[0] += shift.x;
                    v.pos[1] += shift.y;
                }
                let [q0, q1, q2, q3] = quad;
                self.quads.extend_from_slice(&[q0, q1, q3, q3, q1, q2]);
                self.offsets.insert(op.key, offset);
            }
            break;
        }

        let patches: Vec<(usize, IVec2)> = enc
            .tex_ops()
            .iter()
            .filter_map(|op| Some((op.scene_index, *self.offsets.get(&op.key)? - op.offset)))
            .collect();
        for (index, offset) in patches {
            enc.set_fill_image_offset(index, offset);
        }

        if self.quads.is_empty() {
            return Ok(());
        }
        if retry.grown() || self.tex.is_none() {
            let dim = self.packer.max_dim;
            self.tex = Some(device.new_texture(TextureKind::MaterialAtlas, IVec2::splat(dim))?);
        }
        if let (Some(atlas), Some(src)) = (&self.tex, images.texture()) {
            device.draw_materials(atlas, src, &self.quads, retry.reclaimed());
        }
        Ok(())
    }

    pub fn release(&mut self) {
        self.packer.clear();
        self.offsets.clear();
        self.tex = None;
    }
}

/// The image rectangle under `m`, as a quad in corner order
/// (0,0), (0,h), (w,h), (w,0), with its pixel bounds.
fn material_quad(m: Affine2D, img_size: IVec2, uv_pos: IVec2, atlas_dim: i32) -> ([MaterialVertex; 4], IRect) {
    let size = img_size.to_f32();
    let off = Vec2::new(m.ox, m.oy);
    let q0 = off;
    let q1 = Vec2::new(m.hx * size.y, m.sy * size.y) + off;
    let q3 = Vec2::new(m.sx * size.x, m.hy * size.x) + off;
    let q2 = q1 + q3 - off;

    let bounds = Rect::from_min_max(q0.min(q1).min(q2).min(q3), q0.max(q1).max(q2).max(q3)).round_out();

    let scale = 1.0 / atlas_dim as f32;
    let uv_min = uv_pos.to_f32() * scale;
    let uv_max = (uv_pos.to_f32() + size) * scale;
    let v = |p: Vec2, u: f32, w: f32| MaterialVertex { pos: [p.x, p.y], uv: [u, w] };
    let quad = [
        v(q0, uv_min.x, uv_min.y),
        v(q1, uv_min.x, uv_max.y),
        v(q2, uv_max.x, uv_max.y),
        v(q3, uv_max.x, uv_min.y),
    ];
    (quad, bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── material quad ──

    #[test]
    fn identity_quad_covers_the_image() {
        let (quad, bounds) = material_quad(Affine2D::IDENTITY, IVec2::new(4, 2), IVec2::new(8, 0), 16);
        assert_eq!(bounds, IRect::new(0, 0, 4, 2));
        assert_eq!(quad[2].pos, [4.0, 2.0]);
        assert_eq!(quad[0].uv, [0.5, 0.0]);
        assert_eq!(quad[2].uv, [0.75, 0.125]);
    }

    #[test]
    fn fractional_offset_widens_bounds() {
        let m = Affine2D::translation(Vec2::new(0.5, 0.25));
        let (quad, bounds) = material_quad(m, IVec2::new(4, 4), IVec2::splat(0), 16);
        assert_eq!(bounds, IRect::new(0, 0, 5, 5));
        assert_eq!(quad[0].pos, [0.5, 0.25]);
    }

    #[test]
    fn rotated_quad_bounds_contain_every_corner() {
        let m = Affine2D::rotation(Vec2::zero(), core::f32::consts::FRAC_PI_4);
        let (quad, bounds) = material_quad(m, IVec2::new(10, 10), IVec2::splat(0), 64);
        for v in quad {
            assert!(v.pos[0] >= bounds.min.x as f32 && v.pos[0] <= bounds.max.x as f32);
            assert!(v.pos[1] >= bounds.min.y as f32 && v.pos[1] <= bounds.max.y as f32);
        }
    }
}
