//! AT command channel: line indexing, reply classification, and the
//! request/reply correlator that everything above rides on.

pub mod engine;
pub mod lines;
pub mod reply;

pub use engine::{AtEngine, ShutdownHandle, RAW_TERMINATOR};
pub use lines::LineIndex;
pub use reply::{Reply, ReplyClass};
