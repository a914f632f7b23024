//! Streaming capture core for taperec
//!
//! A [`CaptureDevice`] opens the default input stream of an [`AudioBackend`],
//! reads one fixed-size buffer at a time and hands each buffer to a
//! [`StreamSink`] until the sink asks to stop, the owner stops an async
//! session, or the backend fails.

mod buffer;
mod capture;
mod config;
mod error;
mod sample;
mod session;
mod state;
mod traits;

pub mod sink;

#[cfg(test)]
mod testing;

pub use buffer::SampleBuffer;
pub use capture::{CaptureDevice, SessionEnd, SessionReport};
pub use config::{CaptureConfig, SUPPORTED_BIT_DEPTHS};
pub use error::{BackendError, CaptureError, CaptureErrorKind, ConfigError, SinkError};
pub use sample::{widen_into, Sample};
pub use session::{CaptureSession, CAPTURE_THREAD_NAME};
pub use sink::{MemorySink, StopHandle, WavSink};
pub use state::SessionState;
pub use traits::{AudioBackend, InputStream, StreamSink};
