use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

/// End-of-contour cap shape for open strokes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum StrokeCap {
    /// Ends exactly at the end point.
    #[default]
    Flat,
    /// Extends half the stroke width past the end point.
    Square,
    /// Half circle centered on the end point.
    Round,
}

/// Join shape used where a miter is not requested or exceeds its limit.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum StrokeJoin {
    #[default]
    Bevel,
    Round,
}

/// Alternating on/off dash lengths, measured along the path.
#[derive(Debug, Clone, PartialEq)]
pub struct DashPattern {
    /// Distance into the pattern at which each contour starts.
    pub phase: f32,
    pub lengths: Arc<[f32]>,
}

impl DashPattern {
    pub fn new(phase: f32, lengths: impl Into<Arc<[f32]>>) -> Self {
        Self { phase, lengths: lengths.into() }
    }

    /// True when the pattern never turns the stroke off.
    pub fn is_solid(&self) -> bool {
        let total: f32 = self.lengths.iter().sum();
        self.lengths.is_empty()
            || total.is_nan()
            || total <= 0.0
            || self.normalized().iter().skip(1).step_by(2).all(|&off| off <= 0.0)
    }

    /// Even-length version of the pattern; odd patterns repeat once.
    pub(crate) fn normalized(&self) -> Vec<f32> {
        let mut v: Vec<f32> = self.lengths.iter().map(|l| l.max(0.0)).collect();
        if v.len() % 2 == 1 {
            v.extend_from_within(..);
        }
        v
    }
}

/// Stroke parameters attached to a clip path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeStyle {
    /// Full stroke width. Zero means the path is filled, not stroked.
    pub width: f32,
    /// Miter limit as a multiple of the half width. Zero disables miters.
    pub miter: f32,
    pub cap: StrokeCap,
    pub join: StrokeJoin,
    pub dashes: Option<DashPattern>,
}

impl StrokeStyle {
    pub fn new(width: f32) -> Self {
        Self { width, ..Self::default() }
    }

    pub fn with_cap(mut self, cap: StrokeCap) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_join(mut self, join: StrokeJoin) -> Self {
        self.join = join;
        self
    }

    pub fn with_miter(mut self, miter: f32) -> Self {
        self.miter = miter;
        self
    }

    pub fn with_dashes(mut self, dashes: DashPattern) -> Self {
        self.dashes = Some(dashes);
        self
    }

    #[inline]
    pub fn is_stroke(&self) -> bool {
        self.width > 0.0
    }

    /// True when dashing changes the geometry.
    pub fn is_dashed(&self) -> bool {
        self.dashes.as_ref().is_some_and(|d| !d.is_solid())
    }

    /// Hash of every field, used to key cached stroke output.
    pub fn fingerprint(&self) -> u64 {
        let mut h = FxHasher::default();
        self.width.to_bits().hash(&mut h);
        self.miter.to_bits().hash(&mut h);
        self.cap.hash(&mut h);
        self.join.hash(&mut h);
        if let Some(d) = &self.dashes {
            d.phase.to_bits().hash(&mut h);
            for l in d.lengths.iter() {
                l.to_bits().hash(&mut h);
            }
        }
        h.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_patterns() {
        assert!(DashPattern::new(0.0, Vec::<f32>::new()).is_solid());
        assert!(DashPattern::new(0.0, vec![5.0, 0.0]).is_solid());
        assert!(DashPattern::new(0.0, vec![0.0, 0.0]).is_solid());
        assert!(!DashPattern::new(0.0, vec![5.0, 2.0]).is_solid());
        // [3] repeats as [3, 3]: on 3, off 3.
        assert!(!DashPattern::new(0.0, vec![3.0]).is_solid());
    }

    #[test]
    fn fingerprint_tracks_style_changes() {
        let a = StrokeStyle::new(2.0);
        assert_eq!(a.fingerprint(), StrokeStyle::new(2.0).fingerprint());
        assert_ne!(a.fingerprint(), a.clone().with_cap(StrokeCap::Round).fingerprint());
        assert_ne!(
            a.fingerprint(),
            a.clone().with_dashes(DashPattern::new(0.0, vec![1.0, 1.0])).fingerprint()
        );
    }
}
