//! Frame-scoped resource caches with two-generation mark-and-sweep eviction.

use std::hash::Hash;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::coords::IVec2;
use crate::paint::ImageId;
use crate::path::PathKey;
use crate::stroke::StrokeQuad;

/// Keeps resources alive for as long as they are used every frame.
///
/// `get` and `put` mark an entry as referenced; `frame` drops everything that
/// was not referenced since the previous `frame`. Dropping a value releases
/// whatever it owns.
#[derive(Debug)]
pub struct ResourceCache<K, V> {
    res: FxHashMap<K, V>,
    referenced: FxHashSet<K>,
}

impl<K, V> Default for ResourceCache<K, V> {
    fn default() -> Self {
        Self {
            res: FxHashMap::default(),
            referenced: FxHashSet::default(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> ResourceCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `key` and marks it referenced for this frame.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let v = self.res.get(key)?;
        if !self.referenced.contains(key) {
            self.referenced.insert(key.clone());
        }
        Some(v)
    }

    /// Inserts `value` and marks it referenced.
    ///
    /// Panics if `key` was already referenced this frame.
    pub fn put(&mut self, key: K, value: V) {
        assert!(
            !self.referenced.contains(&key),
            "ResourceCache::put: key inserted twice in one frame"
        );
        self.referenced.insert(key.clone());
        self.res.insert(key, value);
    }

    /// Drops every entry not referenced since the last call and starts a new
    /// marking generation.
    pub fn frame(&mut self) {
        let referenced = &self.referenced;
        self.res.retain(|k, _| referenced.contains(k));
        self.referenced.clear();
    }

    /// Drops every entry.
    pub fn release(&mut self) {
        self.res.clear();
        self.referenced.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.res.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.res.is_empty()
    }
}

// ── instantiations ─────────────────────────────────────────────────────────

/// Premultiplied RGBA8 pixels ready for the image atlas.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub size: IVec2,
    pub pixels: Arc<[u8]>,
}

/// Content key of a stroked path: geometry key plus style fingerprint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StrokeKey {
    pub path: PathKey,
    pub style: u64,
}

/// Stroke-engine output for one path.
#[derive(Debug, Clone)]
pub struct FlatPath {
    pub quads: Arc<[StrokeQuad]>,
}

pub type ImageCache = ResourceCache<ImageId, ImageSource>;
pub type PathCache = ResourceCache<StrokeKey, FlatPath>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Tracked(Rc<Cell<u32>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn sweep_releases_unreferenced_entries_once() {
        let drops = Rc::new(Cell::new(0));
        let mut c: ResourceCache<u32, Tracked> = ResourceCache::new();
        c.put(1, Tracked(drops.clone()));
        c.put(2, Tracked(drops.clone()));
        c.frame();
        assert_eq!(drops.get(), 0);

        // Frame 2 only touches key 1.
        assert!(c.get(&1).is_some());
        c.frame();
        assert_eq!(drops.get(), 1);
        assert!(c.get(&2).is_none());
        assert!(c.get(&1).is_some());

        // Frame 3 touches nothing but key 1 was referenced above.
        c.frame();
        assert_eq!(drops.get(), 1);
        c.frame();
        assert_eq!(drops.get(), 2);
        assert!(c.is_empty());
    }

    #[test]
    fn release_drops_everything() {
        let drops = Rc::new(Cell::new(0));
        let mut c: ResourceCache<u32, Tracked> = ResourceCache::new();
        for k in 0..3 {
            c.put(k, Tracked(drops.clone()));
        }
        c.release();
        assert_eq!(drops.get(), 3);
        assert!(c.is_empty());
    }

    #[test]
    fn put_after_sweep_is_allowed() {
        let mut c: ResourceCache<u32, u32> = ResourceCache::new();
        c.put(7, 1);
        c.frame();
        c.put(7, 2);
        assert_eq!(c.get(&7), Some(&2));
    }

    #[test]
    #[should_panic]
    fn double_put_panics() {
        let mut c: ResourceCache<u32, u32> = ResourceCache::new();
        c.put(7, 1);
        c.put(7, 2);
    }
}
