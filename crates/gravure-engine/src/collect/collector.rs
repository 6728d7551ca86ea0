use crate::coords::{Affine2D, IVec2, Rect, Viewport};
use crate::ops::{ClipOp, Op, OpList};
use crate::paint::{Color, Material};

use super::layers::{hash_op, Layer, LayerHistory, LayerPlace};
use super::state::{ClipCmd, ClipId, ClipState, Corners, EncoderState, PaintOp};

/// Flattens an operation list into paint operations with explicit clip stacks
/// and groups them into layers.
///
/// Buffers are kept across frames. Every `collect` starts from scratch except
/// for layer matching, which compares against the previous `collect`.
#[derive(Debug, Default)]
pub struct Collector {
    clips: Vec<ClipState>,
    states: Vec<EncoderState>,
    paint_ops: Vec<PaintOp>,
    layers: Vec<Layer>,
    history: LayerHistory,
    clear: Option<Color>,
    profile: bool,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn paint_ops(&self) -> &[PaintOp] {
        &self.paint_ops
    }

    /// The frame's layers in painting order. Together they cover every paint op.
    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Records where the pixels of layer `index` were rendered.
    pub fn set_layer_place(&mut self, index: usize, place: LayerPlace) {
        if let Some(l) = self.layers.get_mut(index) {
            l.place = Some(place);
        }
    }

    /// Forgets every rendered layer, so the next frame renders from scratch.
    pub fn forget_layer_places(&mut self) {
        for l in self.layers.iter_mut().chain(self.history.prev_layers.iter_mut()) {
            l.place = None;
        }
    }

    /// Opaque color covering everything before the first kept paint.
    #[inline]
    pub fn clear_color(&self) -> Option<Color> {
        self.clear
    }

    #[inline]
    pub fn clips(&self) -> &[ClipState] {
        &self.clips
    }

    /// The list asked for GPU timings.
    #[inline]
    pub fn profile_requested(&self) -> bool {
        self.profile
    }

    /// Walks `ops` once. `root` maps the list's coordinates to device pixels.
    ///
    /// # Panics
    /// Panics on a `Load` of a state id that was never saved.
    pub fn collect(&mut self, ops: &OpList, root: Affine2D, viewport: Viewport) {
        std::mem::swap(&mut self.paint_ops, &mut self.history.prev_ops);
        std::mem::swap(&mut self.layers, &mut self.history.prev_layers);
        self.clips.clear();
        self.states.clear();
        self.paint_ops.clear();
        self.clear = None;
        self.profile = false;

        let view = viewport.rect();
        let mut state = EncoderState::root(root, view);

        for op in ops.ops() {
            match op {
                Op::Profile => self.profile = true,
                Op::Transform(t) => {
                    state.t = state.t * *t;
                    state.rel_trans = state.rel_trans * *t;
                }
                Op::Clip(clip) => self.add_clip(&mut state, view, clip),
                Op::Color(c) => state.material = Material::Color(*c),
                Op::LinearGradient(g) => state.material = Material::LinearGradient(g.clone()),
                Op::Image(img) => state.material = Material::Image(img.clone()),
                Op::Paint => self.paint(&state, view),
                Op::Save(id) => self.save(id.index(), &state),
                Op::Load(id, mask) => {
                    let Some(saved) = self.states.get(id.index()) else {
                        panic!("Collector::collect: load of unknown state {}", id.0);
                    };
                    if mask.transform_only() {
                        state.t = saved.t;
                        state.rel_trans = self.rel_trans_for(state.clip, saved);
                    } else {
                        state = saved.clone();
                    }
                }
            }
        }

        for op in &mut self.paint_ops {
            cull_covering_clips(&mut op.clip_stack);
            split_offset(op);
            op.hash = hash_op(op);
        }
        self.history.split(&mut self.paint_ops, &mut self.layers);
    }

    fn save(&mut self, id: usize, state: &EncoderState) {
        if id >= self.states.len() {
            self.states.resize(id + 1, state.clone());
        }
        self.states[id] = state.clone();
    }

    /// Relative transform after restoring only the absolute transform of `saved`.
    fn rel_trans_for(&self, clip: Option<ClipId>, saved: &EncoderState) -> Affine2D {
        if clip == saved.clip {
            return saved.rel_trans;
        }
        match clip {
            Some(id) => self.clips[id.index()].transform.invert() * saved.t,
            None => saved.t,
        }
    }

    fn add_clip(&mut self, state: &mut EncoderState, view: Rect, clip: &ClipOp) {
        // Under a singular transform the clip collapses; keep it so the
        // paint's intersection empties.
        if clip.is_rect() && state.t.is_invertible() && state.rel_trans.is_invertible() {
            // A rectangle containing the whole viewport restricts nothing.
            if Corners::of(state.t.invert(), view).within(clip.bounds) {
                return;
            }
            // Nor does one containing an open ancestor.
            let mut t = state.rel_trans.invert();
            let mut p = state.clip;
            while let Some(id) = p {
                let parent = &self.clips[id.index()];
                if !parent.rel_trans.is_invertible() {
                    break;
                }
                if Corners::of(t, parent.bounds).within(clip.bounds) {
                    return;
                }
                t = t * parent.rel_trans.invert();
                p = parent.parent;
            }
        }
        self.push_clip(state, clip.bounds, clip);
    }

    fn push_clip(&mut self, state: &mut EncoderState, bounds: Rect, clip: &ClipOp) {
        let abs_bounds = Corners::of(state.t, bounds).bounds();
        let id = ClipId(self.clips.len() as u32);
        self.clips.push(ClipState {
            bounds,
            abs_bounds,
            rel_trans: state.rel_trans,
            transform: state.t,
            path: clip.path.clone(),
            stroke: clip.stroke.clone().filter(|s| s.is_stroke()),
            parent: state.clip,
        });
        state.intersect = state.intersect.intersect(abs_bounds).unwrap_or_default();
        state.clip = Some(id);
        state.rel_trans = Affine2D::IDENTITY;
    }

    fn paint(&mut self, state: &EncoderState, view: Rect) {
        let mut state = state.clone();
        if let Some(size) = state.material.image().map(|img| img.size().to_f32()) {
            // Keep neighbouring atlas entries out of the fill.
            let bounds = Rect::from_size(size.x, size.y);
            self.add_clip(&mut state, view, &ClipOp::rect(bounds));
        }
        if state.intersect.is_empty() {
            return;
        }

        // An unclipped opaque fill hides everything painted so far.
        if state.clip.is_none() {
            if let Material::Color(c) = state.material {
                if c.is_opaque() {
                    self.clear = Some(Color::from_srgba(c).opaque());
                    self.paint_ops.clear();
                    return;
                }
            }
        }

        let mut clip_stack = Vec::new();
        let mut p = state.clip;
        while let Some(id) = p {
            let c = &self.clips[id.index()];
            clip_stack.push(ClipCmd {
                bounds: c.bounds,
                rel_trans: c.rel_trans,
                abs_bounds: c.abs_bounds,
                path: c.path.clone(),
                stroke: c.stroke.clone(),
            });
            p = c.parent;
        }
        self.paint_ops.push(PaintOp {
            material: state.material,
            transform: state.t,
            clip_stack,
            intersect: state.intersect,
            offset: IVec2::default(),
            hash: 0,
            layer: 0,
        });
    }
}

/// Moves the whole-pixel translation of the outermost clip into `op.offset`.
fn split_offset(op: &mut PaintOp) {
    let Some(outer) = op.clip_stack.last_mut() else {
        return;
    };
    let (t, off) = outer.rel_trans.split_offset();
    outer.rel_trans = t;
    op.offset = off;
    op.transform = op.transform.offset(-off.to_f32());
}

/// Removes outer rectangle clips that contain an inner clip's bounds, folding
/// their transform into the inner neighbour.
fn cull_covering_clips(stack: &mut Vec<ClipCmd>) {
    let mut j = 0;
    while j + 1 < stack.len() {
        let mut r = Corners::of(stack[j].rel_trans, stack[j].bounds);
        let mut k = j + 1;
        while k < stack.len() {
            let outer_rel = stack[k].rel_trans;
            if stack[k].is_rect() && r.within(stack[k].bounds) {
                stack.remove(k);
                stack[k - 1].rel_trans = outer_rel * stack[k - 1].rel_trans;
            } else {
                k += 1;
            }
            r = r.transform(outer_rel);
        }
        j += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{IRect, Vec2};
    use crate::ops::{LoadMask, StateId};
    use crate::paint::{ImageHandle, LinearGradient, Srgba};
    use crate::path::Path;

    const VIEW: Viewport = Viewport::new(100, 100);

    fn collect(ops: &OpList) -> Collector {
        let mut c = Collector::new();
        c.collect(ops, Affine2D::IDENTITY, VIEW);
        c
    }

    fn blue() -> Srgba {
        Srgba::opaque(0, 0, 255)
    }

    // ── overpaint ──

    #[test]
    fn full_opaque_paint_becomes_clear() {
        let mut ops = OpList::new();
        ops.fill_rect(Rect::new(0.0, 0.0, 50.0, 100.0), blue());
        ops.fill_rect(Rect::new(0.0, 0.0, 100.0, 100.0), Srgba::opaque(255, 0, 0));
        let c = collect(&ops);
        assert!(c.paint_ops().is_empty());
        assert_eq!(c.clear_color(), Some(Color::from_srgba(Srgba::opaque(255, 0, 0))));
    }

    #[test]
    fn translucent_full_paint_is_kept() {
        let mut ops = OpList::new();
        ops.fill_rect(Rect::new(0.0, 0.0, 50.0, 100.0), blue());
        ops.color(Srgba::new(255, 0, 0, 128));
        ops.paint();
        let c = collect(&ops);
        assert_eq!(c.paint_ops().len(), 2);
        assert_eq!(c.clear_color(), None);
        assert!(c.paint_ops()[1].clip_stack.is_empty());
    }

    #[test]
    fn opaque_gradient_is_never_a_clear() {
        let mut ops = OpList::new();
        ops.fill_rect(Rect::new(0.0, 0.0, 50.0, 100.0), blue());
        ops.linear_gradient(LinearGradient::two_stop(
            Vec2::zero(),
            Srgba::opaque(255, 0, 0),
            Vec2::new(100.0, 0.0),
            Srgba::opaque(0, 255, 0),
        ));
        ops.paint();
        let c = collect(&ops);
        assert_eq!(c.clear_color(), None);
        assert_eq!(c.paint_ops().len(), 2);
        assert!(matches!(c.paint_ops()[1].material, Material::LinearGradient(_)));
    }

    #[test]
    fn paint_outside_viewport_is_dropped() {
        let mut ops = OpList::new();
        ops.fill_rect(Rect::new(200.0, 200.0, 300.0, 300.0), blue());
        assert!(collect(&ops).paint_ops().is_empty());
    }

    // ── clip culling ──

    #[test]
    fn containing_outer_rect_is_skipped() {
        let mut ops = OpList::new();
        ops.push_clip(ClipOp::rect(Rect::new(10.0, 10.0, 90.0, 90.0)));
        ops.push_clip(ClipOp::rect(Rect::new(20.0, 20.0, 40.0, 40.0)));
        ops.push_clip(ClipOp::rect(Rect::new(0.0, 0.0, 60.0, 60.0)));
        ops.color(blue());
        ops.paint();
        let c = collect(&ops);
        // The third clip contains the second and is never allocated.
        assert_eq!(c.clips().len(), 2);
        // The post pass drops the first: it contains the second.
        let stack = &c.paint_ops()[0].clip_stack;
        assert_eq!(stack.len(), 1);
        assert_eq!(stack[0].bounds, Rect::new(20.0, 20.0, 40.0, 40.0));
    }

    #[test]
    fn post_pass_folds_transforms_inward() {
        let mut ops = OpList::new();
        ops.push_clip(ClipOp::rect(Rect::new(0.0, 0.0, 50.0, 50.0)));
        ops.push_transform(Affine2D::translation(Vec2::new(10.0, 10.0)));
        ops.push_clip(ClipOp::rect(Rect::new(0.0, 0.0, 20.0, 20.0)));
        ops.color(blue());
        ops.paint();
        let c = collect(&ops);
        let stack = &c.paint_ops()[0].clip_stack;
        assert_eq!(stack.len(), 1);
        // The folded translation is whole pixels and moves into the offset.
        assert_eq!(stack[0].rel_trans, Affine2D::IDENTITY);
        assert_eq!(c.paint_ops()[0].offset, IVec2::new(10, 10));
        assert_eq!(stack[0].abs_bounds, Rect::new(10.0, 10.0, 30.0, 30.0));
    }

    #[test]
    fn path_clips_are_never_culled() {
        let mut ops = OpList::new();
        ops.push_clip(ClipOp::path(Path::rect(Rect::new(10.0, 10.0, 90.0, 90.0))));
        ops.push_clip(ClipOp::rect(Rect::new(20.0, 20.0, 40.0, 40.0)));
        ops.color(blue());
        ops.paint();
        let c = collect(&ops);
        assert_eq!(c.paint_ops()[0].clip_stack.len(), 2);
        assert!(!c.paint_ops()[0].clip_stack[1].is_rect());
    }

    #[test]
    fn intersection_tracks_clips() {
        let mut ops = OpList::new();
        ops.push_clip(ClipOp::rect(Rect::new(10.0, 10.0, 60.0, 60.0)));
        ops.push_clip(ClipOp::path(Path::rect(Rect::new(40.0, 40.0, 80.0, 80.0))));
        ops.color(blue());
        ops.paint();
        let c = collect(&ops);
        assert_eq!(c.paint_ops()[0].intersect, Rect::new(40.0, 40.0, 60.0, 60.0));
    }

    #[test]
    fn collapsed_transform_keeps_the_clip() {
        let mut ops = OpList::new();
        ops.push_transform(Affine2D::scaling(Vec2::zero(), Vec2::zero()));
        ops.push_clip(ClipOp::rect(Rect::new(0.0, 0.0, 100.0, 100.0)));
        ops.color(Srgba::opaque(255, 0, 0));
        ops.paint();
        let c = collect(&ops);
        assert_eq!(c.clips().len(), 1);
        assert_eq!(c.clear_color(), None);
        assert!(c.paint_ops().is_empty());
    }

    // ── state table ──

    #[test]
    fn pop_restores_material_and_clip() {
        let mut ops = OpList::new();
        ops.push_clip(ClipOp::rect(Rect::new(10.0, 10.0, 20.0, 20.0)));
        ops.color(Srgba::new(0, 255, 0, 100));
        ops.pop();
        ops.paint();
        let c = collect(&ops);
        // Back to the default opaque black with no clip: a clear.
        assert!(c.paint_ops().is_empty());
        assert_eq!(c.clear_color(), Some(Color::from_srgba(Srgba::opaque(0, 0, 0))));
    }

    #[test]
    fn transform_pop_keeps_clip() {
        let mut ops = OpList::new();
        let before = ops.save();
        ops.transform(Affine2D::translation(Vec2::new(5.0, 0.0)));
        ops.push_clip(ClipOp::rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
        ops.load(before, LoadMask::TRANSFORM);
        ops.push_clip(ClipOp::path(Path::rect(Rect::new(0.0, 0.0, 10.0, 10.0))));
        ops.color(blue());
        ops.paint();
        let c = collect(&ops);
        let stack = &c.paint_ops()[0].clip_stack;
        // The path clip sits back in the untranslated space.
        assert_eq!(stack[0].abs_bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(stack[0].rel_trans, Affine2D::translation(Vec2::new(-5.0, 0.0)));
    }

    #[test]
    #[should_panic]
    fn unknown_load_panics() {
        let mut ops = OpList::new();
        ops.load(StateId(3), LoadMask::ALL);
        collect(&ops);
    }

    // ── images ──

    #[test]
    fn image_paint_is_clipped_to_image_bounds() {
        let mut ops = OpList::new();
        ops.image(ImageHandle::filled(8, 4, [255, 255, 255, 255]));
        ops.paint();
        let c = collect(&ops);
        let op = &c.paint_ops()[0];
        assert_eq!(op.clip_stack.len(), 1);
        assert_eq!(op.intersect, Rect::new(0.0, 0.0, 8.0, 4.0));
    }

    // ── layers ──

    fn shape_at(ops: &mut OpList, at: Vec2, c: Srgba) {
        ops.push_transform(Affine2D::translation(at));
        ops.push_clip(ClipOp::path(Path::rect(Rect::new(0.0, 0.0, 20.0, 10.0))));
        ops.color(c);
        ops.paint();
        ops.pop();
        ops.pop();
    }

    fn two_shapes(second: Srgba) -> OpList {
        let mut ops = OpList::new();
        shape_at(&mut ops, Vec2::new(5.0, 5.0), blue());
        shape_at(&mut ops, Vec2::new(40.0, 5.0), second);
        ops
    }

    fn placed() -> LayerPlace {
        LayerPlace { atlas: 0, pos: IVec2::new(4, 4) }
    }

    #[test]
    fn first_frame_is_one_layer() {
        let c = collect(&two_shapes(Srgba::opaque(255, 0, 0)));
        assert_eq!(c.layers().len(), 1);
        let l = &c.layers()[0];
        assert_eq!(l.ops, 0..2);
        assert_eq!(l.rect, IRect::new(5, 5, 60, 15));
        assert_eq!(l.place, None);
        assert!(c.paint_ops().iter().all(|op| op.layer == 0));
    }

    #[test]
    fn whole_pixel_shifts_keep_the_hash() {
        let at = |x: f32| {
            let mut ops = OpList::new();
            shape_at(&mut ops, Vec2::new(x, 5.0), blue());
            collect(&ops).paint_ops()[0].clone()
        };
        let (a, b, frac) = (at(3.0), at(11.0), at(3.5));
        assert_eq!(a.hash, b.hash);
        assert_eq!(b.offset - a.offset, IVec2::new(8, 0));
        assert_ne!(a.hash, frac.hash);
    }

    #[test]
    fn repeated_frame_keeps_the_place() {
        let ops = two_shapes(Srgba::opaque(255, 0, 0));
        let mut c = Collector::new();
        c.collect(&ops, Affine2D::IDENTITY, VIEW);
        c.set_layer_place(0, placed());
        c.collect(&ops, Affine2D::IDENTITY, VIEW);
        assert_eq!(c.layers().len(), 1);
        assert_eq!(c.layers()[0].place, Some(placed()));
    }

    #[test]
    fn shifted_frame_keeps_the_place() {
        let mut c = Collector::new();
        let mut ops = OpList::new();
        shape_at(&mut ops, Vec2::new(5.0, 5.0), blue());
        c.collect(&ops, Affine2D::IDENTITY, VIEW);
        c.set_layer_place(0, placed());

        let mut ops = OpList::new();
        shape_at(&mut ops, Vec2::new(12.0, 7.0), blue());
        c.collect(&ops, Affine2D::IDENTITY, VIEW);
        assert_eq!(c.layers()[0].place, Some(placed()));
        assert_eq!(c.layers()[0].rect, IRect::new(12, 7, 32, 17));
    }

    #[test]
    fn changed_tail_splits_the_layer() {
        let mut c = Collector::new();
        c.collect(&two_shapes(Srgba::opaque(255, 0, 0)), Affine2D::IDENTITY, VIEW);
        c.set_layer_place(0, placed());
        c.collect(&two_shapes(Srgba::opaque(0, 255, 0)), Affine2D::IDENTITY, VIEW);

        let layers = c.layers();
        assert_eq!(layers.len(), 2);
        assert_eq!((layers[0].ops.clone(), layers[1].ops.clone()), (0..1, 1..2));
        // Only part of the old layer repeats, so its pixels are useless.
        assert!(layers.iter().all(|l| l.place.is_none()));
        assert_eq!(c.paint_ops()[1].layer, 1);
    }

    #[test]
    fn run_clipped_by_the_viewport_is_rerendered() {
        let mut c = Collector::new();
        let mut ops = OpList::new();
        shape_at(&mut ops, Vec2::new(5.0, 5.0), blue());
        c.collect(&ops, Affine2D::IDENTITY, VIEW);
        c.set_layer_place(0, placed());

        let mut ops = OpList::new();
        shape_at(&mut ops, Vec2::new(-10.0, 5.0), blue());
        c.collect(&ops, Affine2D::IDENTITY, VIEW);
        assert_eq!(c.layers()[0].rect, IRect::new(0, 5, 10, 15));
        assert_eq!(c.layers()[0].place, None);
    }

    #[test]
    fn forgotten_places_are_not_inherited() {
        let ops = two_shapes(Srgba::opaque(255, 0, 0));
        let mut c = Collector::new();
        c.collect(&ops, Affine2D::IDENTITY, VIEW);
        c.set_layer_place(0, placed());
        c.forget_layer_places();
        c.collect(&ops, Affine2D::IDENTITY, VIEW);
        assert_eq!(c.layers()[0].place, None);
    }

    #[test]
    fn clear_drops_earlier_layers() {
        let mut ops = two_shapes(Srgba::opaque(255, 0, 0));
        ops.color(Srgba::opaque(9, 9, 9));
        ops.paint();
        shape_at(&mut ops, Vec2::new(5.0, 5.0), blue());
        let c = collect(&ops);
        assert_eq!(c.layers().len(), 1);
        assert_eq!(c.layers()[0].ops, 0..1);
    }

    #[test]
    fn profile_flag_is_recorded() {
        let mut ops = OpList::new();
        ops.profile();
        assert!(collect(&ops).profile_requested());
        assert!(!collect(&OpList::new()).profile_requested());
    }
}
