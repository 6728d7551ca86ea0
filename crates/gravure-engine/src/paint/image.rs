use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::coords::IVec2;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of an image, stable for the lifetime of its handle.
///
/// Atlas placements and cached upload data are keyed by this id, so cloning a
/// handle shares them while constructing a new one never does.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(u64);

/// Straight-alpha sRGB RGBA8 pixels, row-major and tightly packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Shared reference to image pixels plus their identity.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    id: ImageId,
    data: Arc<ImageData>,
}

impl ImageHandle {
    /// Wraps RGBA8 pixels.
    ///
    /// # Panics
    /// If either dimension is zero or `pixels.len() != width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert!(width > 0 && height > 0, "image has zero size ({width}x{height})");
        assert_eq!(
            pixels.len(),
            width as usize * height as usize * 4,
            "pixel buffer does not match {width}x{height} RGBA8"
        );
        Self {
            id: ImageId(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed)),
            data: Arc::new(ImageData { width, height, pixels }),
        }
    }

    /// Single-color image, mostly useful for tests and demos.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba.repeat(width as usize * height as usize);
        Self::new(width, height, pixels)
    }

    #[inline]
    pub fn id(&self) -> ImageId {
        self.id
    }

    #[inline]
    pub fn data(&self) -> &ImageData {
        &self.data
    }

    #[inline]
    pub fn size(&self) -> IVec2 {
        IVec2::new(self.data.width as i32, self.data.height as i32)
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl ImageData {
    /// Pixels with color multiplied by alpha in sRGB space, ready for upload.
    pub fn premultiplied(&self) -> Vec<u8> {
        let mut out = self.pixels.clone();
        for px in out.chunks_exact_mut(4) {
            let a = px[3] as u32;
            for c in &mut px[..3] {
                *c = ((*c as u32 * a + 127) / 255) as u8;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_get_distinct_ids_and_clones_share() {
        let a = ImageHandle::filled(2, 2, [1, 2, 3, 4]);
        let b = ImageHandle::filled(2, 2, [1, 2, 3, 4]);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn premultiplied_scales_by_alpha() {
        let img = ImageHandle::new(2, 1, vec![255, 128, 0, 128, 10, 20, 30, 255]);
        assert_eq!(img.data().premultiplied(), vec![128, 64, 0, 128, 10, 20, 30, 255]);
    }

    #[test]
    #[should_panic]
    fn mismatched_pixel_length_panics() {
        let _ = ImageHandle::new(2, 2, vec![0; 4]);
    }
}
