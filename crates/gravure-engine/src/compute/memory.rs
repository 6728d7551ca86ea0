//! GPU-side layout of the scratch memory buffer and the kernel config.

use bytemuck::{Pod, Zeroable};

/// Output tile size in pixels.
pub const TILE_WIDTH_PX: u32 = 32;
pub const TILE_HEIGHT_PX: u32 = 32;

/// Bins are 16x8 tiles; coarse rasterization handles at most this many.
pub const MAX_BINS: u32 = 128;
const BIN_WIDTH_TILES: u32 = 16;
const BIN_HEIGHT_TILES: u32 = 8;

/// Largest and most common workgroup size.
pub const WG_SIZE: u32 = 128;

// Per-element record sizes in bytes.
const PATH_SIZE: u32 = 12;
const BIN_SIZE: u32 = 8;
const PTCL_INITIAL_ALLOC: u32 = 1024;
const PATHSEG_SIZE: u32 = 52;
const ANNO_SIZE: u32 = 32;
const TRANS_SIZE: u32 = 24;

/// Partition flag plus two 60-byte monoid states.
const STATE_STRIDE: u32 = 4 + 2 * 60;

/// Offset of a region inside the memory buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct MemAlloc {
    pub offset: u32,
}

/// Kernel configuration, read by every stage.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Config {
    pub n_elements: u32,
    pub n_pathseg: u32,
    pub width_in_tiles: u32,
    pub height_in_tiles: u32,
    pub tile_alloc: MemAlloc,
    pub bin_alloc: MemAlloc,
    pub ptcl_alloc: MemAlloc,
    pub pathseg_alloc: MemAlloc,
    pub anno_alloc: MemAlloc,
    pub trans_alloc: MemAlloc,
}

/// First words of the memory buffer: the bump pointer and the error flag.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct MemoryHeader {
    pub mem_offset: u32,
    pub mem_error: u32,
}

pub const HEADER_SIZE: u64 = std::mem::size_of::<MemoryHeader>() as u64;

/// Outcome reported by the kernels in `MemoryHeader::mem_error`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemError {
    NoError,
    MallocFailed,
    Other(u32),
}

impl From<u32> for MemError {
    fn from(code: u32) -> Self {
        match code {
            0 => MemError::NoError,
            1 => MemError::MallocFailed,
            n => MemError::Other(n),
        }
    }
}

/// Tile grid covering a `width` x `height` pixel output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TileDims {
    pub x: u32,
    pub y: u32,
}

impl TileDims {
    pub fn covering(width: u32, height: u32) -> Self {
        Self {
            x: width.div_ceil(TILE_WIDTH_PX),
            y: height.div_ceil(TILE_HEIGHT_PX),
        }
    }

    /// Bin grid for the coarse stage.
    pub fn bins(self) -> (u32, u32) {
        (self.x.div_ceil(BIN_WIDTH_TILES), self.y.div_ceil(BIN_HEIGHT_TILES))
    }

    /// Output size in pixels, a whole number of tiles.
    pub fn pixels(self) -> (u32, u32) {
        (self.x * TILE_WIDTH_PX, self.y * TILE_HEIGHT_PX)
    }
}

/// Bump allocator over the static part of the memory buffer. Offsets are
/// relative to the end of the header.
#[derive(Debug, Default)]
struct Bump {
    alloc: u32,
}

impl Bump {
    fn malloc(&mut self, size: u32) -> MemAlloc {
        let offset = self.alloc;
        self.alloc += size.next_multiple_of(4);
        MemAlloc { offset }
    }
}

impl Config {
    /// Lays out the static regions. Returns the config and the number of
    /// bytes it allocates.
    pub fn layout(npath: u32, npathseg: u32, ntrans: u32, tiles: TileDims) -> (Config, u32) {
        let mut bump = Bump::default();
        let config = Config {
            n_elements: npath,
            n_pathseg: npathseg,
            width_in_tiles: tiles.x,
            height_in_tiles: tiles.y,
            tile_alloc: bump.malloc(npath * PATH_SIZE),
            bin_alloc: bump.malloc(npath.next_multiple_of(WG_SIZE) * BIN_SIZE),
            ptcl_alloc: bump.malloc(tiles.x * tiles.y * PTCL_INITIAL_ALLOC),
            pathseg_alloc: bump.malloc(npathseg * PATHSEG_SIZE),
            anno_alloc: bump.malloc(npath * ANNO_SIZE),
            trans_alloc: bump.malloc(ntrans * TRANS_SIZE),
        };
        (config, bump.alloc)
    }
}

/// Bytes of the state buffer the elements kernel expects zeroed: the
/// partition counter plus per-partition state.
pub fn state_clear_size(partitions: u32) -> u64 {
    4 + partitions as u64 * STATE_STRIDE as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_are_laid_out_back_to_back() {
        let (c, alloc) = Config::layout(3, 10, 2, TileDims { x: 2, y: 1 });
        assert_eq!(c.tile_alloc.offset, 0);
        assert_eq!(c.bin_alloc.offset, 36);
        assert_eq!(c.ptcl_alloc.offset, 36 + 128 * 8);
        assert_eq!(c.pathseg_alloc.offset, c.ptcl_alloc.offset + 2 * 1024);
        assert_eq!(c.anno_alloc.offset, c.pathseg_alloc.offset + 520);
        assert_eq!(c.trans_alloc.offset, c.anno_alloc.offset + 96);
        assert_eq!(alloc, c.trans_alloc.offset + 48);
    }

    #[test]
    fn tiles_and_bins_round_up() {
        let t = TileDims::covering(100, 33);
        assert_eq!(t, TileDims { x: 4, y: 2 });
        assert_eq!(t.bins(), (1, 1));
        assert_eq!(t.pixels(), (128, 64));
        assert_eq!(TileDims::covering(8192, 8192).bins(), (16, 32));
    }

    #[test]
    fn error_codes() {
        assert_eq!(MemError::from(0), MemError::NoError);
        assert_eq!(MemError::from(1), MemError::MallocFailed);
        assert_eq!(MemError::from(7), MemError::Other(7));
    }

    #[test]
    fn header_is_two_words() {
        assert_eq!(HEADER_SIZE, 8);
        assert_eq!(std::mem::size_of::<Config>(), 40);
    }
}
