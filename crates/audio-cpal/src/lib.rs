//! Native audio backend for taperec built on cpal
//!
//! cpal delivers input through a callback; [`CpalInputStream`] turns that
//! into the blocking, fill-this-buffer `read` the capture loop expects.

mod backend;
mod device;
mod format;
mod stream;

pub use backend::CpalBackend;
pub use device::{default_input_device, default_input_device_name};
pub use format::CaptureSample;
pub use stream::CpalInputStream;
