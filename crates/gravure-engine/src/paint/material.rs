use super::{ImageHandle, LinearGradient, Srgba};

/// Fill source for a paint.
///
/// The set of kinds is closed; the encoder and the atlas uploader match on it
/// exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Color(Srgba),
    LinearGradient(LinearGradient),
    Image(ImageHandle),
}

impl Default for Material {
    /// Opaque black, the state every operation list starts from.
    fn default() -> Self {
        Material::Color(Srgba::opaque(0, 0, 0))
    }
}

impl Material {
    /// True for a flat color with full alpha.
    #[inline]
    pub fn is_opaque_color(&self) -> bool {
        matches!(self, Material::Color(c) if c.is_opaque())
    }

    #[inline]
    pub fn image(&self) -> Option<&ImageHandle> {
        match self {
            Material::Image(img) => Some(img),
            _ => None,
        }
    }
}
