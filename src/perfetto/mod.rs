//! The subset of the Perfetto trace wire format this converter produces.

pub mod emitter;
pub mod proto;

pub use emitter::PacketEmitter;
pub use proto::{Trace, TrackEventType};
