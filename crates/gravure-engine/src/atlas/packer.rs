use crate::coords::IVec2;

/// Where an item landed: page index and top-left texel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Placement {
    pub page: usize,
    pub pos: IVec2,
}

#[derive(Debug, Default, Clone)]
struct Page {
    cursor: IVec2,
    row_height: i32,
    extent: IVec2,
}

/// Shelf packer over square pages of side `max_dim`.
///
/// Items are placed left to right on the current shelf; an item that does not
/// fit the remaining width opens a new shelf under the tallest item so far.
#[derive(Debug, Clone)]
pub struct Packer {
    /// Page side in texels. Only grows; growth invalidates every placement.
    pub max_dim: i32,
    pages: Vec<Page>,
}

impl Packer {
    pub fn new(max_dim: i32) -> Self {
        Self { max_dim, pages: Vec::new() }
    }

    /// Drops every page and placement. `max_dim` is kept.
    pub fn clear(&mut self) {
        self.pages.clear();
    }

    /// Starts a fresh page at the current `max_dim`.
    pub fn new_page(&mut self) {
        self.pages.push(Page::default());
    }

    #[inline]
    pub fn pages(&self) -> usize {
        self.pages.len()
    }

    /// Texels used on `page`, measured from the origin.
    pub fn extent(&self, page: usize) -> IVec2 {
        self.pages.get(page).map(|p| p.extent).unwrap_or_default()
    }

    /// Places `size` on the current page, or returns `None` when it does not fit.
    ///
    /// Panics on non-positive sizes.
    pub fn try_add(&mut self, size: IVec2) -> Option<Placement> {
        assert!(
            size.x > 0 && size.y > 0,
            "Packer::try_add: non-positive size {size:?}"
        );
        if size.x > self.max_dim || size.y > self.max_dim {
            return None;
        }
        if self.pages.is_empty() {
            self.new_page();
        }
        let max_dim = self.max_dim;
        let page_idx = self.pages.len() - 1;
        let page = &mut self.pages[page_idx];

        if page.cursor.x + size.x > max_dim {
            page.cursor = IVec2::new(0, page.cursor.y + page.row_height);
            page.row_height = 0;
        }
        if page.cursor.y + size.y > max_dim {
            return None;
        }

        let pos = page.cursor;
        page.cursor.x += size.x;
        page.row_height = page.row_height.max(size.y);
        page.extent = page.extent.max(pos + size);
        Some(Placement { page: page_idx, pos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::IRect;

    fn xy(v: i32) -> IVec2 {
        IVec2::new(((v / 16) % 16) + 8, (v % 16) + 8)
    }

    #[test]
    fn placements_never_overlap() {
        let mut p = Packer::new(512);
        let mut placed: Vec<IRect> = Vec::new();
        for k in 0..500 {
            let size = xy(k);
            let Some(place) = p.try_add(size) else { break };
            let r = IRect::from_pos_size(place.pos, size);
            assert!(IRect::new(0, 0, 512, 512).contains_rect(r), "{r:?} out of page");
            for other in &placed {
                assert!(!other.overlaps(r), "{other:?} overlaps {r:?}");
            }
            placed.push(r);
        }
        assert!(placed.len() > 100);
    }

    #[test]
    fn full_page_rejects_until_cleared() {
        let mut p = Packer::new(64);
        for _ in 0..4 {
            assert!(p.try_add(IVec2::splat(32)).is_some());
        }
        assert_eq!(p.try_add(IVec2::splat(32)), None);
        assert_eq!(p.extent(0), IVec2::splat(64));

        p.clear();
        assert_eq!(p.max_dim, 64);
        assert_eq!(p.try_add(IVec2::splat(32)).map(|pl| pl.pos), Some(IVec2::new(0, 0)));
    }

    #[test]
    fn new_page_restarts_at_origin() {
        let mut p = Packer::new(64);
        p.try_add(IVec2::splat(40)).unwrap();
        p.new_page();
        let place = p.try_add(IVec2::splat(40)).unwrap();
        assert_eq!(place, Placement { page: 1, pos: IVec2::new(0, 0) });
    }

    #[test]
    fn oversize_items_never_fit() {
        let mut p = Packer::new(64);
        assert_eq!(p.try_add(IVec2::new(65, 1)), None);
    }

    #[test]
    #[should_panic]
    fn zero_size_panics() {
        Packer::new(64).try_add(IVec2::new(0, 4));
    }
}
