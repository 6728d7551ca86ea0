//! Texture atlas packing and the retry ladder shared by the image and
//! material atlases.

mod packer;

pub use packer::{Packer, Placement};

/// Which atlas a ladder belongs to, for error reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AtlasKind {
    Image,
    Material,
}

impl core::fmt::Display for AtlasKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AtlasKind::Image => f.write_str("image atlas"),
            AtlasKind::Material => f.write_str("material atlas"),
        }
    }
}

/// Recovery state for one packing pass over an atlas.
///
/// The first failure clears the packer and retries with the same page size.
/// Every later failure grows the page by `step`, up to `cap`.
#[derive(Debug)]
pub struct RetryLadder {
    kind: AtlasKind,
    step: i32,
    cap: i32,
    reclaimed: bool,
    grown: bool,
}

impl RetryLadder {
    pub fn new(kind: AtlasKind, step: i32, cap: i32) -> Self {
        Self { kind, step, cap, reclaimed: false, grown: false }
    }

    /// Climbs one rung after a failed placement and leaves the packer on a
    /// fresh page. Returns false when the page cannot grow any further.
    pub fn climb(&mut self, packer: &mut Packer) -> bool {
        packer.clear();
        if !self.reclaimed {
            self.reclaimed = true;
            log::debug!("{}: reclaiming at {}x{}", self.kind, packer.max_dim, packer.max_dim);
        } else {
            let next = packer.max_dim + self.step;
            if next > self.cap {
                return false;
            }
            packer.max_dim = next;
            self.grown = true;
            log::debug!("{}: growing to {next}x{next}", self.kind);
        }
        packer.new_page();
        true
    }

    #[inline]
    pub fn kind(&self) -> AtlasKind {
        self.kind
    }

    /// The atlas contents were discarded during this pass.
    #[inline]
    pub fn reclaimed(&self) -> bool {
        self.reclaimed
    }

    /// The page grew during this pass, so its texture must be recreated.
    #[inline]
    pub fn grown(&self) -> bool {
        self.grown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::IVec2;

    // ── ladder ──

    #[test]
    fn reclaims_once_then_grows_in_steps() {
        let mut p = Packer::new(256);
        let mut ladder = RetryLadder::new(AtlasKind::Material, 256, 1024);

        assert!(ladder.climb(&mut p));
        assert!(ladder.reclaimed() && !ladder.grown());
        assert_eq!(p.max_dim, 256);

        assert!(ladder.climb(&mut p));
        assert_eq!(p.max_dim, 512);
        assert!(ladder.climb(&mut p));
        assert_eq!(p.max_dim, 768);
        assert!(ladder.climb(&mut p));
        assert_eq!(p.max_dim, 1024);
        assert!(ladder.grown());

        assert!(!ladder.climb(&mut p));
        assert_eq!(p.max_dim, 1024);
    }

    #[test]
    fn repack_after_growth_is_overlap_free() {
        // 600x600 never fits a 256 page; the ladder must grow it to 768.
        let sizes = [IVec2::new(600, 100), IVec2::new(300, 300), IVec2::new(300, 300)];
        let mut p = Packer::new(256);
        let mut ladder = RetryLadder::new(AtlasKind::Image, 256, 8192);

        let placed = 'pack: loop {
            let mut out = Vec::new();
            for &s in &sizes {
                match p.try_add(s) {
                    Some(pl) => out.push(crate::coords::IRect::from_pos_size(pl.pos, s)),
                    None => {
                        assert!(ladder.climb(&mut p));
                        continue 'pack;
                    }
                }
            }
            break out;
        };

        assert_eq!(p.max_dim, 768);
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                assert!(!a.overlaps(*b));
            }
        }
    }
}
