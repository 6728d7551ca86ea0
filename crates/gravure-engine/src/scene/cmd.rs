use bytemuck::{Pod, Zeroable};

use crate::coords::{Affine2D, Rect, Vec2};

/// Words per scene command.
pub const COMMAND_WORDS: usize = 9;
/// Bytes per scene command.
pub const COMMAND_SIZE: usize = COMMAND_WORDS * 4;

/// Command tags as read by the elements kernel. Tag 3 is unused.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tag {
    Nop = 0,
    Line = 1,
    Quad = 2,
    FillColor = 4,
    FillImage = 5,
    LineWidth = 6,
    Transform = 7,
    BeginClip = 8,
    EndClip = 9,
    FillMode = 10,
}

impl Tag {
    pub fn from_u32(v: u32) -> Option<Tag> {
        Some(match v {
            0 => Tag::Nop,
            1 => Tag::Line,
            2 => Tag::Quad,
            4 => Tag::FillColor,
            5 => Tag::FillImage,
            6 => Tag::LineWidth,
            7 => Tag::Transform,
            8 => Tag::BeginClip,
            9 => Tag::EndClip,
            10 => Tag::FillMode,
            _ => return None,
        })
    }
}

/// How the following path segments are turned into coverage.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FillMode {
    Nonzero = 0,
    /// Segments are stroked on the GPU with the current line width.
    Stroke = 1,
}

/// One fixed-size scene record. Word 0 is the tag.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct Command(pub [u32; COMMAND_WORDS]);

impl Command {
    #[inline]
    pub const fn nop() -> Self {
        Command([0; COMMAND_WORDS])
    }

    #[inline]
    pub fn tag(&self) -> Option<Tag> {
        Tag::from_u32(self.0[0])
    }

    pub fn line(from: Vec2, to: Vec2) -> Self {
        Self::with(Tag::Line, &[from.x, from.y, to.x, to.y].map(f32::to_bits))
    }

    pub fn quad(from: Vec2, ctrl: Vec2, to: Vec2) -> Self {
        Self::with(
            Tag::Quad,
            &[from.x, from.y, ctrl.x, ctrl.y, to.x, to.y].map(f32::to_bits),
        )
    }

    /// Fill with a premultiplied linear RGBA8 color.
    pub fn fill_color(rgba: [u8; 4]) -> Self {
        Self::with(Tag::FillColor, &[u32::from_be_bytes(rgba)])
    }

    /// Fill from the material atlas. The offset word is patched later.
    pub fn fill_image(index: u32) -> Self {
        Self::with(Tag::FillImage, &[index, 0])
    }

    pub fn line_width(width: f32) -> Self {
        Self::with(Tag::LineWidth, &[width.to_bits()])
    }

    /// Words in element order: sx, hy, hx, sy, ox, oy.
    pub fn transform(t: Affine2D) -> Self {
        Self::with(
            Tag::Transform,
            &[t.sx, t.hy, t.hx, t.sy, t.ox, t.oy].map(f32::to_bits),
        )
    }

    pub fn begin_clip(bbox: Rect) -> Self {
        Self::with(Tag::BeginClip, &rect_words(bbox))
    }

    pub fn end_clip(bbox: Rect) -> Self {
        Self::with(Tag::EndClip, &rect_words(bbox))
    }

    pub fn fill_mode(mode: FillMode) -> Self {
        Self::with(Tag::FillMode, &[mode as u32])
    }

    fn with(tag: Tag, words: &[u32]) -> Self {
        let mut c = [0u32; COMMAND_WORDS];
        c[0] = tag as u32;
        c[1..1 + words.len()].copy_from_slice(words);
        Command(c)
    }
}

fn rect_words(r: Rect) -> [u32; 4] {
    [r.min.x, r.min.y, r.max.x, r.max.y].map(f32::to_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_nine_words() {
        assert_eq!(core::mem::size_of::<Command>(), COMMAND_SIZE);
        assert_eq!(bytemuck::bytes_of(&Command::nop()), &[0u8; COMMAND_SIZE][..]);
    }

    #[test]
    fn color_packs_red_in_high_byte() {
        let c = Command::fill_color([0x11, 0x22, 0x33, 0x44]);
        assert_eq!(c.tag(), Some(Tag::FillColor));
        assert_eq!(c.0[1], 0x1122_3344);
    }

    #[test]
    fn transform_word_order() {
        let c = Command::transform(Affine2D::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
        let words: Vec<f32> = c.0[1..7].iter().map(|w| f32::from_bits(*w)).collect();
        assert_eq!(words, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }
}
