//! Operation lists: the recorded drawing input consumed by the collector.

mod list;
mod op;

pub use list::OpList;
pub use op::{ClipOp, LoadMask, Op, StateId};
