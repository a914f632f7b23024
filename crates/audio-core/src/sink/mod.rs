//! Reference [`StreamSink`](crate::StreamSink) implementations
//!
//! - [`WavSink`]: encodes every buffer into a WAV file
//! - [`MemorySink`]: keeps copies of every buffer in memory
//!
//! Both accept an optional buffer limit and hand out a [`StopHandle`] for
//! ending the session from another thread.

mod control;
mod memory;
mod wav;

pub use control::StopHandle;
pub use memory::MemorySink;
pub use wav::WavSink;
