use crate::config::CaptureConfig;
use crate::error::{BackendError, SinkError};
use crate::sample::Sample;

/// Native audio backend capable of opening the default input stream
///
/// `initialize` and `terminate` are process-wide and always paired by the
/// capture loop, including on error paths.
pub trait AudioBackend {
    /// Integer sample type the backend's streams produce
    type Sample: Sample;
    type Stream: InputStream<Sample = Self::Sample>;

    fn initialize(&self) -> Result<(), BackendError>;

    fn terminate(&self);

    /// Open the default input device with the channel count, sample rate and
    /// frames-per-buffer of `config`
    fn open_default_input_stream(&self, config: &CaptureConfig)
        -> Result<Self::Stream, BackendError>;
}

/// An opened input stream
pub trait InputStream {
    type Sample: Sample;

    fn start(&mut self) -> Result<(), BackendError>;

    /// Block until `buffer` has been completely overwritten with new samples
    fn read(&mut self, buffer: &mut [Self::Sample]) -> Result<(), BackendError>;

    fn stop(&mut self) -> Result<(), BackendError>;

    fn close(self) -> Result<(), BackendError>;
}

/// Consumer of captured audio
///
/// The capture loop calls `open` once, `write` once per buffer, then `close`
/// once. The slice given to `write` is overwritten by the next read; a sink
/// that needs the data afterwards must copy it.
pub trait StreamSink<T: Sample> {
    fn open(&mut self) -> Result<(), SinkError>;

    /// Consume one buffer; return `false` to end the session
    ///
    /// There is no error channel here: a sink that cannot persist the buffer
    /// should log and return `false`.
    fn write(&mut self, buffer: &[T]) -> bool;

    /// Flush and release the destination. Must tolerate a failed `open`.
    fn close(&mut self) -> Result<(), SinkError>;
}

impl<T: Sample, S: StreamSink<T> + ?Sized> StreamSink<T> for Box<S> {
    fn open(&mut self) -> Result<(), SinkError> {
        (**self).open()
    }

    fn write(&mut self, buffer: &[T]) -> bool {
        (**self).write(buffer)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}
