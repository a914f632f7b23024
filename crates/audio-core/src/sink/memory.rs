use super::control::{Continuation, StopHandle};
use crate::error::SinkError;
use crate::sample::Sample;
use crate::traits::StreamSink;

/// Sink that keeps a copy of every delivered buffer
#[derive(Debug)]
pub struct MemorySink<T> {
    buffers: Vec<Vec<T>>,
    continuation: Continuation,
    opened: usize,
    closed: usize,
}

impl<T> Default for MemorySink<T> {
    fn default() -> Self {
        Self {
            buffers: Vec::new(),
            continuation: Continuation::default(),
            opened: 0,
            closed: 0,
        }
    }
}

impl<T: Sample> MemorySink<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_limit(mut self, buffers: u64) -> Self {
        self.continuation.set_limit(buffers);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.continuation.stop_handle()
    }

    pub fn buffers(&self) -> &[Vec<T>] {
        &self.buffers
    }

    /// All delivered samples, concatenated in delivery order
    pub fn samples(&self) -> Vec<T> {
        self.buffers.concat()
    }

    pub fn open_count(&self) -> usize {
        self.opened
    }

    pub fn close_count(&self) -> usize {
        self.closed
    }
}

impl<T: Sample> StreamSink<T> for MemorySink<T> {
    fn open(&mut self) -> Result<(), SinkError> {
        self.opened += 1;
        Ok(())
    }

    fn write(&mut self, buffer: &[T]) -> bool {
        self.buffers.push(buffer.to_vec());
        self.continuation.record()
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.closed += 1;
        Ok(())
    }
}
