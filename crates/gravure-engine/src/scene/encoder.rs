use std::hash::{Hash, Hasher};

use crate::cache::{FlatPath, PathCache, StrokeKey};
use crate::collect::{ClipCmd, PaintOp};
use crate::coords::{Affine2D, IVec2, Rect, Vec2, Viewport};
use crate::paint::{Color, ImageHandle, ImageId, Material};
use crate::path::QuadSegment;
use crate::stroke::{stroke, StrokeQuad};

use super::cmd::{Command, FillMode, Tag};

/// Elements processed per workgroup by the elements kernel.
pub const PARTITION_SIZE: usize = 128;

/// Encoding switches.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Emit solid strokes as raw paths in stroke fill mode instead of
    /// expanding them on the CPU.
    pub gpu_strokes: bool,
}

/// Material atlas key: an image under a transform whose offset is in `[0, 1)`.
#[derive(Debug, Copy, Clone)]
pub struct TextureKey {
    pub image: ImageId,
    pub transform: Affine2D,
}

impl PartialEq for TextureKey {
    fn eq(&self, other: &Self) -> bool {
        self.image == other.image && self.transform.to_bits() == other.transform.to_bits()
    }
}

impl Eq for TextureKey {}

impl Hash for TextureKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.image.hash(state);
        self.transform.to_bits().hash(state);
    }
}

/// An image fill waiting for its material atlas position.
#[derive(Debug, Clone)]
pub struct TextureOp {
    /// Index of the `FillImage` command to patch.
    pub scene_index: usize,
    pub image: ImageHandle,
    pub key: TextureKey,
    /// Whole-pixel part of the paint's offset.
    pub offset: IVec2,
}

/// Builds the scene command stream for one frame.
#[derive(Debug, Default)]
pub struct SceneEncoder {
    scene: Vec<Command>,
    npath: u32,
    npathseg: u32,
    ntrans: u32,
    tex_ops: Vec<TextureOp>,
}

impl SceneEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the stream, keeping capacity.
    pub fn reset(&mut self) {
        self.scene.clear();
        self.npath = 0;
        self.npathseg = 0;
        self.ntrans = 0;
        self.tex_ops.clear();
    }

    #[inline]
    pub fn scene(&self) -> &[Command] {
        &self.scene
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scene.is_empty()
    }

    /// Fill, image and clip elements.
    #[inline]
    pub fn npath(&self) -> u32 {
        self.npath
    }

    #[inline]
    pub fn npathseg(&self) -> u32 {
        self.npathseg
    }

    #[inline]
    pub fn ntrans(&self) -> u32 {
        self.ntrans
    }

    #[inline]
    pub fn tex_ops(&self) -> &[TextureOp] {
        &self.tex_ops
    }

    /// Command count after padding with `Nop`s to a whole partition.
    pub fn padded_len(&self) -> usize {
        self.scene.len() + PARTITION_SIZE - self.scene.len() % PARTITION_SIZE
    }

    /// Encodes `ops` from scratch. Stroke expansions are looked up in and
    /// stored into `paths`.
    pub fn encode(&mut self, viewport: Viewport, ops: &[PaintOp], paths: &mut PathCache, options: EncodeOptions) {
        self.reset();
        self.encode_layer(viewport, ops, IVec2::default(), paths, options);
    }

    /// Appends `ops` shifted by `offset` pixels.
    pub fn encode_layer(
        &mut self,
        viewport: Viewport,
        ops: &[PaintOp],
        offset: IVec2,
        paths: &mut PathCache,
        options: EncodeOptions,
    ) {
        let shift = offset.to_f32();
        if !offset.is_zero() {
            self.transform(Affine2D::translation(shift));
        }
        for op in ops {
            self.encode_op(viewport, op, offset, paths, options);
        }
        if !offset.is_zero() {
            self.transform(Affine2D::translation(-shift));
        }
    }

    /// Patches the atlas offset of the `FillImage` at `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a `FillImage` command.
    pub fn set_fill_image_offset(&mut self, index: usize, offset: IVec2) {
        let cmd = &mut self.scene[index];
        assert_eq!(cmd.tag(), Some(Tag::FillImage), "set_fill_image_offset: not a FillImage");
        let x = offset.x as i16 as u16 as u32;
        let y = offset.y as i16 as u16 as u32;
        cmd.0[2] = x | (y << 16);
    }

    fn encode_op(
        &mut self,
        viewport: Viewport,
        op: &PaintOp,
        layer_off: IVec2,
        paths: &mut PathCache,
        options: EncodeOptions,
    ) {
        // Clip bounds carry the union of everything they affect, in the
        // layer's pixels.
        let shift = layer_off.to_f32();
        let mut unions = Vec::with_capacity(op.clip_stack.len());
        let mut union = Rect::default();
        for cl in &op.clip_stack {
            union = union.union(cl.abs_bounds);
            unions.push(union.translate(shift));
        }

        let mut fill_mode = FillMode::Nonzero;
        let mut inv = Affine2D::IDENTITY;
        if !op.offset.is_zero() {
            inv = Affine2D::translation(op.offset.to_f32());
            self.transform(inv);
        }
        for (i, cl) in op.clip_stack.iter().enumerate().rev() {
            let gpu_stroke = cl
                .stroke
                .as_ref()
                .filter(|s| options.gpu_strokes && !s.is_dashed());
            if let Some(style) = gpu_stroke {
                self.push(Command::fill_mode(FillMode::Stroke));
                self.push(Command::line_width(style.width));
                fill_mode = FillMode::Stroke;
            } else if fill_mode != FillMode::Nonzero {
                self.push(Command::fill_mode(FillMode::Nonzero));
                fill_mode = FillMode::Nonzero;
            }

            self.transform(cl.rel_trans);
            inv = inv * cl.rel_trans;
            self.clip_geometry(cl, gpu_stroke.is_some(), paths);

            if i != 0 {
                self.push(Command::begin_clip(unions[i]));
                self.npath += 1;
            }
        }
        if op.clip_stack.is_empty() {
            self.rect(viewport.rect());
        }

        match &op.material {
            Material::Color(c) => self.fill_color(Color::from_srgba(*c)),
            // Gradients fill with their first stop.
            Material::LinearGradient(g) => self.fill_color(Color::from_srgba(g.first_color())),
            Material::Image(img) => {
                let scene_index = self.scene.len();
                self.push(Command::fill_image(0));
                self.npath += 1;
                let (transform, offset) = op.transform.offset((op.offset + layer_off).to_f32()).split_offset();
                self.tex_ops.push(TextureOp {
                    scene_index,
                    image: img.clone(),
                    key: TextureKey { image: img.id(), transform },
                    offset,
                });
            }
        }

        self.transform(inv.invert());
        for u in unions.iter().skip(1) {
            self.push(Command::end_clip(*u));
            self.npath += 1;
        }
        if fill_mode != FillMode::Nonzero {
            self.push(Command::fill_mode(FillMode::Nonzero));
        }
    }

    fn clip_geometry(&mut self, cl: &ClipCmd, raw_stroke: bool, paths: &mut PathCache) {
        let Some(path) = &cl.path else {
            self.rect(cl.bounds);
            return;
        };
        match cl.stroke.as_ref().filter(|_| !raw_stroke) {
            Some(style) => {
                let key = StrokeKey { path: path.key(), style: style.fingerprint() };
                let flat = match paths.get(&key) {
                    Some(flat) => flat.clone(),
                    None => {
                        let flat = FlatPath {
                            quads: stroke(&StrokeQuad::from_path(path), style).into(),
                        };
                        paths.put(key, flat.clone());
                        flat
                    }
                };
                for sq in flat.quads.iter() {
                    self.segment(&sq.quad);
                }
            }
            None => {
                for s in path.segments() {
                    self.segment(&s.quad);
                }
            }
        }
    }

    /// Rectangle as four lines, clockwise from `min`.
    fn rect(&mut self, r: Rect) {
        let c0 = r.min;
        let c1 = Vec2::new(r.min.x, r.max.y);
        let c2 = r.max;
        let c3 = Vec2::new(r.max.x, r.min.y);
        self.line(c0, c1);
        self.line(c1, c2);
        self.line(c2, c3);
        self.line(c3, c0);
    }

    fn segment(&mut self, q: &QuadSegment) {
        if q.ctrl == (q.from + q.to) * 0.5 {
            self.line(q.from, q.to);
        } else {
            self.push(Command::quad(q.from, q.ctrl, q.to));
            self.npathseg += 1;
        }
    }

    fn line(&mut self, from: Vec2, to: Vec2) {
        self.push(Command::line(from, to));
        self.npathseg += 1;
    }

    fn transform(&mut self, t: Affine2D) {
        self.push(Command::transform(t));
        self.ntrans += 1;
    }

    fn fill_color(&mut self, c: Color) {
        self.push(Command::fill_color(c.to_premul_u8()));
        self.npath += 1;
    }

    #[inline]
    fn push(&mut self, cmd: Command) {
        self.scene.push(cmd);
    }
}
