use crate::config::CaptureConfig;
use crate::sample::Sample;

/// Fixed-length sample buffer reused across every read of a session
///
/// The capture loop owns it; the backend overwrites it in place and sinks
/// only ever see a shared slice for the duration of one `write` call.
#[derive(Debug)]
pub struct SampleBuffer<T> {
    data: Vec<T>,
}

impl<T: Sample> SampleBuffer<T> {
    /// Allocate `frames_per_buffer x channels` zeroed samples
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            data: vec![T::default(); config.samples_per_buffer()],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
