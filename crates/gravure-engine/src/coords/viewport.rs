use super::{IVec2, Rect};

/// Output size in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// The full viewport as a float rectangle anchored at the origin.
    #[inline]
    pub fn rect(self) -> Rect {
        Rect::from_size(self.width as f32, self.height as f32)
    }

    #[inline]
    pub fn size(self) -> IVec2 {
        IVec2::new(self.width as i32, self.height as i32)
    }
}
