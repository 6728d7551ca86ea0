use std::fmt;

use crate::atlas::AtlasKind;
use crate::device::DeviceError;

/// Why a frame could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The atlas could not grow past the texture size limit.
    AtlasExhausted { atlas: AtlasKind },
    /// The memory buffer would exceed the device's buffer limit.
    ScratchExhausted { size: u64 },
    /// The output needs more bins than coarse rasterization supports.
    OutputTooLarge { width: u32, height: u32 },
    /// A kernel reported an error other than a failed allocation.
    Kernel { code: u32 },
    /// Device contents were lost twice in a row.
    ContentLost,
    Device(DeviceError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::AtlasExhausted { atlas } => write!(f, "no space left in {atlas}"),
            RenderError::ScratchExhausted { size } => {
                write!(f, "scratch memory of {size} bytes exceeds the device limit")
            }
            RenderError::OutputTooLarge { width, height } => {
                write!(f, "output too large ({width}x{height})")
            }
            RenderError::Kernel { code } => write!(f, "shader program failed with error {code}"),
            RenderError::ContentLost => f.write_str("device content lost during readback"),
            RenderError::Device(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeviceError> for RenderError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::ContentLost => RenderError::ContentLost,
            err => RenderError::Device(err),
        }
    }
}
