use crate::coords::{Affine2D, Rect};
use crate::paint::{ImageHandle, LinearGradient, Material, Srgba};

use super::{ClipOp, LoadMask, Op, StateId};

/// Recorded operation stream for a frame.
///
/// Clip and transform scopes are expressed as `Save`/`Load` pairs:
///
/// ```ignore
/// ops.push_clip(ClipOp::rect(panel));
/// ops.color(Srgba::opaque(40, 40, 48));
/// ops.paint();
/// ops.pop();
/// ```
#[derive(Debug, Default, Clone)]
pub struct OpList {
    ops: Vec<Op>,
    next_state: u32,

    /// Saves made by `push_*`, paired with the mask their `pop` loads with.
    scopes: Vec<(StateId, LoadMask)>,
}

impl OpList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears recorded ops. Keeps allocated capacity for reuse.
    pub fn reset(&mut self) {
        self.ops.clear();
        self.next_state = 0;
        self.scopes.clear();
    }

    #[inline]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    #[inline]
    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    /// Number of state slots handed out so far.
    #[inline]
    pub fn state_count(&self) -> usize {
        self.next_state as usize
    }

    /// Records a snapshot of the current state.
    pub fn save(&mut self) -> StateId {
        let id = StateId(self.next_state);
        self.next_state += 1;
        self.ops.push(Op::Save(id));
        id
    }

    pub fn load(&mut self, id: StateId, mask: LoadMask) {
        self.ops.push(Op::Load(id, mask));
    }

    pub fn transform(&mut self, t: Affine2D) {
        self.ops.push(Op::Transform(t));
    }

    /// Composes `t` until the matching [`pop`](Self::pop).
    pub fn push_transform(&mut self, t: Affine2D) {
        let id = self.save();
        self.scopes.push((id, LoadMask::TRANSFORM));
        self.transform(t);
    }

    /// Restricts painting to `clip` until the matching [`pop`](Self::pop).
    pub fn push_clip(&mut self, clip: ClipOp) {
        let id = self.save();
        self.scopes.push((id, LoadMask::ALL));
        self.ops.push(Op::Clip(clip));
    }

    /// Ends the innermost `push_clip` or `push_transform` scope.
    ///
    /// # Panics
    /// Panics when there is no open scope.
    pub fn pop(&mut self) {
        let Some((id, mask)) = self.scopes.pop() else {
            panic!("OpList::pop: no open clip or transform scope");
        };
        self.load(id, mask);
    }

    pub fn color(&mut self, c: Srgba) {
        self.ops.push(Op::Color(c));
    }

    pub fn linear_gradient(&mut self, g: LinearGradient) {
        self.ops.push(Op::LinearGradient(g));
    }

    pub fn image(&mut self, img: ImageHandle) {
        self.ops.push(Op::Image(img));
    }

    pub fn material(&mut self, m: Material) {
        match m {
            Material::Color(c) => self.color(c),
            Material::LinearGradient(g) => self.linear_gradient(g),
            Material::Image(img) => self.image(img),
        }
    }

    pub fn paint(&mut self) {
        self.ops.push(Op::Paint);
    }

    pub fn profile(&mut self) {
        self.ops.push(Op::Profile);
    }

    /// Fills `rect` with `c`, scoped so the clip does not leak.
    pub fn fill_rect(&mut self, rect: Rect, c: Srgba) {
        self.push_clip(ClipOp::rect(rect));
        self.color(c);
        self.paint();
        self.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_pair_saves_with_loads() {
        let mut ops = OpList::new();
        ops.push_transform(Affine2D::IDENTITY);
        ops.push_clip(ClipOp::rect(Rect::new(0.0, 0.0, 1.0, 1.0)));
        ops.pop();
        ops.pop();

        assert_eq!(ops.state_count(), 2);
        assert_eq!(
            ops.ops()[4..],
            [
                Op::Load(StateId(1), LoadMask::ALL),
                Op::Load(StateId(0), LoadMask::TRANSFORM),
            ]
        );
    }

    #[test]
    #[should_panic]
    fn unbalanced_pop_panics() {
        OpList::new().pop();
    }

    #[test]
    fn reset_restarts_state_ids() {
        let mut ops = OpList::new();
        ops.save();
        ops.reset();
        assert!(ops.ops().is_empty());
        assert_eq!(ops.save(), StateId(0));
    }
}
