//! Scripted backend and recording sink for exercising the capture loop

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::CaptureConfig;
use crate::error::{BackendError, SinkError};
use crate::traits::{AudioBackend, InputStream, StreamSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Initialize,
    Terminate,
    OpenStream,
    StartStream,
    Read,
    StopStream,
    CloseStream,
    SinkOpen,
    SinkWrite,
    SinkClose,
}

/// Shared, ordered log of backend and sink calls
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub(crate) fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, call: &Call) -> usize {
        self.0.lock().unwrap().iter().filter(|c| *c == call).count()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedBackend {
    journal: Journal,
    fail_initialize: bool,
    fail_open: bool,
    fail_start: bool,
    fail_read_at: Option<u64>,
    read_delay: Option<Duration>,
}

impl ScriptedBackend {
    pub(crate) fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub(crate) fn fail_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub(crate) fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub(crate) fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Fail the `n`th read (1-based)
    pub(crate) fn fail_read_at(mut self, n: u64) -> Self {
        self.fail_read_at = Some(n);
        self
    }

    /// Make every read block for `delay`
    pub(crate) fn read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }
}

impl AudioBackend for ScriptedBackend {
    type Sample = i16;
    type Stream = ScriptedStream;

    fn initialize(&self) -> Result<(), BackendError> {
        self.journal.push(Call::Initialize);
        if self.fail_initialize {
            return Err(BackendError::Device("scripted init failure".to_string()));
        }
        Ok(())
    }

    fn terminate(&self) {
        self.journal.push(Call::Terminate);
    }

    fn open_default_input_stream(
        &self,
        _config: &CaptureConfig,
    ) -> Result<ScriptedStream, BackendError> {
        self.journal.push(Call::OpenStream);
        if self.fail_open {
            return Err(BackendError::NoDeviceFound);
        }
        Ok(ScriptedStream {
            journal: self.journal.clone(),
            fail_start: self.fail_start,
            fail_read_at: self.fail_read_at,
            read_delay: self.read_delay,
            reads: 0,
        })
    }
}

pub(crate) struct ScriptedStream {
    journal: Journal,
    fail_start: bool,
    fail_read_at: Option<u64>,
    read_delay: Option<Duration>,
    reads: u64,
}

impl InputStream for ScriptedStream {
    type Sample = i16;

    fn start(&mut self) -> Result<(), BackendError> {
        self.journal.push(Call::StartStream);
        if self.fail_start {
            return Err(BackendError::Stream("scripted start failure".to_string()));
        }
        Ok(())
    }

    /// Fill the buffer with the 1-based read number
    fn read(&mut self, buffer: &mut [i16]) -> Result<(), BackendError> {
        self.journal.push(Call::Read);
        self.reads += 1;
        if let Some(delay) = self.read_delay {
            thread::sleep(delay);
        }
        if self.fail_read_at == Some(self.reads) {
            return Err(BackendError::Stream("scripted read failure".to_string()));
        }
        buffer.fill(self.reads as i16);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.journal.push(Call::StopStream);
        Ok(())
    }

    fn close(self) -> Result<(), BackendError> {
        self.journal.push(Call::CloseStream);
        Ok(())
    }
}

/// Sink that copies every buffer and journals its calls
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    journal: Journal,
    stop_after: Option<usize>,
    fail_open: bool,
    fail_close: bool,
    panic_on_write: bool,
    pub(crate) received: Vec<Vec<i16>>,
}

impl RecordingSink {
    pub(crate) fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub(crate) fn stop_after(mut self, buffers: usize) -> Self {
        self.stop_after = Some(buffers);
        self
    }

    pub(crate) fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub(crate) fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub(crate) fn panic_on_write(mut self) -> Self {
        self.panic_on_write = true;
        self
    }
}

impl StreamSink<i16> for RecordingSink {
    fn open(&mut self) -> Result<(), SinkError> {
        self.journal.push(Call::SinkOpen);
        if self.fail_open {
            return Err(SinkError::Io(std::io::Error::other("scripted open failure")));
        }
        Ok(())
    }

    fn write(&mut self, buffer: &[i16]) -> bool {
        self.journal.push(Call::SinkWrite);
        if self.panic_on_write {
            panic!("scripted sink panic");
        }
        self.received.push(buffer.to_vec());
        self.stop_after.map_or(true, |n| self.received.len() < n)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.journal.push(Call::SinkClose);
        if self.fail_close {
            return Err(SinkError::Io(std::io::Error::other("scripted close failure")));
        }
        Ok(())
    }
}
