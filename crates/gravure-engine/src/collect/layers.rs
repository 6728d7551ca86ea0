//! Frame-to-frame layer matching.
//!
//! A layer is a run of consecutive paint ops rendered into a layer atlas and
//! blitted as one image. A run that repeats a whole layer of the previous
//! frame keeps its pixels, even when shifted by whole pixels.

use std::hash::{Hash, Hasher};
use std::ops::Range;

use rustc_hash::FxHasher;

use crate::coords::{IRect, IVec2, Rect};
use crate::paint::Material;

use super::state::{ClipCmd, PaintOp};

/// Layer atlas slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LayerPlace {
    /// Index of the renderer's layer atlas.
    pub atlas: usize,
    /// Top-left texel of the layer's pixels.
    pub pos: IVec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Indices into the frame's paint ops.
    pub ops: Range<usize>,
    /// Device pixels the ops cover.
    pub rect: IRect,
    /// Where the pixels live; `None` until rendered.
    pub place: Option<LayerPlace>,
}

/// Reusable scratch and the previous frame, kept by the collector.
#[derive(Debug, Default)]
pub(crate) struct LayerHistory {
    pub prev_ops: Vec<PaintOp>,
    pub prev_layers: Vec<Layer>,
    /// `(hash, index)` of every previous op, sorted.
    order: Vec<(u64, usize)>,
}

impl LayerHistory {
    /// Splits `ops` into `layers`.
    ///
    /// Runs repeating part of a previous layer become layers of their own.
    /// One repeating a whole previous layer with the same shifted bounds
    /// inherits its place.
    pub fn split(&mut self, ops: &mut [PaintOp], layers: &mut Vec<Layer>) {
        layers.clear();
        self.order.clear();
        self.order
            .extend(self.prev_ops.iter().enumerate().map(|(i, op)| (op.hash, i)));
        self.order.sort_unstable();

        let mut start = 0;
        let mut idx = 0;
        while idx < ops.len() {
            let from = self.order.partition_point(|&(h, _)| h < ops[idx].hash);
            let (len, matched) = longest_layer(&self.prev_ops, &self.order[from..], &ops[idx..]);
            if len == 0 {
                idx += 1;
                continue;
            }
            if idx > start {
                push_layer(ops, layers, start..idx, None);
            }

            let run = idx..idx + len;
            let rect = bounds(&ops[run.clone()]);
            let place = self.prev_layers.get(matched).and_then(|prior| {
                let shift = ops[idx].offset - self.prev_ops[prior.ops.start].offset;
                let whole = prior.ops.len() == len && prior.rect.translate(shift) == rect;
                prior.place.filter(|_| whole)
            });
            push_layer(ops, layers, run, place);
            idx += len;
            start = idx;
        }
        if start < ops.len() {
            push_layer(ops, layers, start..ops.len(), None);
        }
    }
}

fn push_layer(ops: &mut [PaintOp], layers: &mut Vec<Layer>, range: Range<usize>, place: Option<LayerPlace>) {
    let index = layers.len();
    for op in &mut ops[range.clone()] {
        op.layer = index;
    }
    let rect = bounds(&ops[range.clone()]);
    layers.push(Layer { ops: range, rect, place });
}

fn bounds(ops: &[PaintOp]) -> IRect {
    ops.iter()
        .fold(IRect::default(), |r, op| r.union(op.intersect.round_out()))
}

/// Length of the longest run at the head of `ops` that repeats previous ops
/// inside a single layer, and that layer's index. `order` starts at the
/// first entry whose hash is not below the head's.
fn longest_layer(prev: &[PaintOp], order: &[(u64, usize)], ops: &[PaintOp]) -> (usize, usize) {
    let Some(head) = ops.first() else {
        return (0, 0);
    };
    let mut best = (0, 0);
    for &(hash, i) in order {
        if hash != head.hash {
            break;
        }
        let run = &prev[i..];
        let layer = run[0].layer;
        let off = run[0].offset - head.offset;
        let len = run
            .iter()
            .zip(ops)
            .take_while(|(m, o)| m.layer == layer && m.hash == o.hash && op_equal(off, m, o))
            .count();
        if len > best.0 {
            best = (len, layer);
        }
    }
    best
}

/// True when `prev` and `op` paint the same pixels `off` apart.
pub(crate) fn op_equal(off: IVec2, prev: &PaintOp, op: &PaintOp) -> bool {
    prev.offset - op.offset == off
        && prev.material == op.material
        && prev.transform == op.transform
        && prev.clip_stack.len() == op.clip_stack.len()
        && prev.clip_stack.iter().zip(&op.clip_stack).all(|(a, b)| clip_equal(a, b))
}

fn clip_equal(a: &ClipCmd, b: &ClipCmd) -> bool {
    a.bounds == b.bounds && a.rel_trans == b.rel_trans && a.stroke == b.stroke && a.path == b.path
}

/// Hash of everything `op_equal` compares except the offset.
pub(crate) fn hash_op(op: &PaintOp) -> u64 {
    let mut h = FxHasher::default();
    for cl in &op.clip_stack {
        hash_rect(cl.bounds, &mut h);
        cl.rel_trans.to_bits().hash(&mut h);
        cl.stroke.as_ref().map(|s| s.fingerprint()).hash(&mut h);
        cl.path.as_ref().map(|p| p.key()).hash(&mut h);
    }
    match &op.material {
        Material::Color(c) => {
            0u8.hash(&mut h);
            c.hash(&mut h);
        }
        Material::LinearGradient(g) => {
            1u8.hash(&mut h);
            [g.start.x, g.start.y, g.end.x, g.end.y].map(f32::to_bits).hash(&mut h);
            for stop in &g.stops {
                stop.t.to_bits().hash(&mut h);
                stop.color.hash(&mut h);
            }
        }
        Material::Image(img) => {
            2u8.hash(&mut h);
            img.id().hash(&mut h);
        }
    }
    op.transform.to_bits().hash(&mut h);
    h.finish()
}

fn hash_rect(r: Rect, h: &mut FxHasher) {
    [r.min.x, r.min.y, r.max.x, r.max.y].map(f32::to_bits).hash(h);
}
