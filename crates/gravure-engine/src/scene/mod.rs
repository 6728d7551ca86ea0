//! Scene command stream consumed by the compute kernels.
//!
//! Responsibilities:
//! - fixed-size command records (`cmd`)
//! - turning collected paint operations into commands (`encoder`)

mod cmd;
mod encoder;

pub use cmd::{Command, FillMode, Tag, COMMAND_SIZE, COMMAND_WORDS};
pub use encoder::{EncodeOptions, SceneEncoder, TextureKey, TextureOp, PARTITION_SIZE};
