//! Operation-list collection: state tracking, clip culling, overpaint
//! elimination and layer matching.

mod collector;
mod layers;
mod state;

pub use collector::Collector;
pub use layers::{Layer, LayerPlace};
pub use state::{ClipCmd, ClipId, ClipState, EncoderState, PaintOp};
