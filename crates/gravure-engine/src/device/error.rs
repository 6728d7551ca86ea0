use std::fmt;

/// Failures reported by a `Device`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Buffer contents were lost (device reset or mapping failure).
    ContentLost,
    /// The device refused an allocation.
    OutOfMemory { what: &'static str, size: u64 },
    Backend(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::ContentLost => f.write_str("device content lost"),
            DeviceError::OutOfMemory { what, size } => {
                write!(f, "out of device memory allocating {what} ({size} bytes)")
            }
            DeviceError::Backend(msg) => write!(f, "device error: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}
