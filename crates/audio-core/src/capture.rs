//! Synchronous capture loop
//!
//! One session acquires, in order: the backend, the sink, the input stream.
//! Teardown always runs in reverse order (stream stop, stream close, sink
//! close, backend terminate) whichever way the loop exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::buffer::SampleBuffer;
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::sample::Sample;
use crate::state::{SessionState, SessionStateCell};
use crate::traits::{AudioBackend, InputStream, StreamSink};

/// Why a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The sink returned `false` from `write`
    SinkRequested,
    /// The async session was stopped by its owner
    StopRequested,
}

/// Summary of a completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// Buffers delivered to the sink
    pub buffers: u64,
    /// Frames delivered to the sink
    pub frames: u64,
    pub end: SessionEnd,
}

/// Drives a backend input stream into a [`StreamSink`]
///
/// A device runs at most one session at a time. [`CaptureDevice::start`]
/// blocks the caller for the whole session; see
/// [`CaptureDevice::start_async`] for the background form.
pub struct CaptureDevice<B> {
    pub(crate) config: CaptureConfig,
    pub(crate) backend: Arc<B>,
    pub(crate) state: Arc<SessionStateCell>,
}

impl<B: AudioBackend> CaptureDevice<B> {
    /// No I/O happens until a session starts.
    pub fn new(config: CaptureConfig, backend: B) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
            state: Arc::new(SessionStateCell::default()),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    /// Run one session on the calling thread until the sink asks to stop or
    /// the backend fails
    pub fn start<S>(&self, sink: &mut S) -> Result<SessionReport, CaptureError>
    where
        S: StreamSink<B::Sample> + ?Sized,
    {
        if !self.state.begin() {
            return Err(CaptureError::SessionActive);
        }

        // Nothing else can set it; the sink is the only way out.
        let stop_signal = AtomicBool::new(false);
        run_session(&self.config, &*self.backend, sink, &stop_signal, &self.state)
    }
}

/// Run one complete session and leave `state` at `Closed`
pub(crate) fn run_session<B, S>(
    config: &CaptureConfig,
    backend: &B,
    sink: &mut S,
    stop_signal: &AtomicBool,
    state: &SessionStateCell,
) -> Result<SessionReport, CaptureError>
where
    B: AudioBackend + ?Sized,
    S: StreamSink<B::Sample> + ?Sized,
{
    tracing::info!(
        channels = config.channels(),
        sample_rate = config.sample_rate(),
        frames_per_buffer = config.frames_per_buffer(),
        "Capture session starting"
    );

    let result = {
        let _closed = ClosedOnDrop(state);
        drive(config, backend, sink, stop_signal, state)
    };

    match &result {
        Ok(report) => tracing::info!(
            buffers = report.buffers,
            frames = report.frames,
            end = ?report.end,
            "Capture session ended"
        ),
        Err(e) => tracing::error!(kind = ?e.kind(), "Capture session failed: {}", e),
    }

    result
}

/// Leaves the session `Closed` even if a sink panics mid-session
struct ClosedOnDrop<'a>(&'a SessionStateCell);

impl Drop for ClosedOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(SessionState::Closed);
    }
}

/// Calls `terminate` when dropped, so it runs after every later resource
struct BackendGuard<'a, B: AudioBackend + ?Sized>(&'a B);

impl<B: AudioBackend + ?Sized> Drop for BackendGuard<'_, B> {
    fn drop(&mut self) {
        self.0.terminate();
        tracing::debug!("Audio backend terminated");
    }
}

fn drive<B, S>(
    config: &CaptureConfig,
    backend: &B,
    sink: &mut S,
    stop_signal: &AtomicBool,
    state: &SessionStateCell,
) -> Result<SessionReport, CaptureError>
where
    B: AudioBackend + ?Sized,
    S: StreamSink<B::Sample> + ?Sized,
{
    backend.initialize().map_err(CaptureError::BackendInit)?;
    let _backend = BackendGuard(backend);
    tracing::debug!("Audio backend initialized");

    let result = match sink.open() {
        Ok(()) => stream_into(config, backend, sink, stop_signal),
        Err(e) => Err(CaptureError::SinkOpen(e)),
    };

    state.transition(SessionState::Streaming, SessionState::Stopping);
    close_sink::<B::Sample, S>(sink, result)
}

fn stream_into<B, S>(
    config: &CaptureConfig,
    backend: &B,
    sink: &mut S,
    stop_signal: &AtomicBool,
) -> Result<SessionReport, CaptureError>
where
    B: AudioBackend + ?Sized,
    S: StreamSink<B::Sample> + ?Sized,
{
    let mut stream = backend
        .open_default_input_stream(config)
        .map_err(CaptureError::StreamOpen)?;
    tracing::debug!("Default input stream opened");

    if let Err(e) = stream.start() {
        close_stream(stream);
        return Err(CaptureError::StreamStart(e));
    }
    tracing::debug!("Input stream started");

    let result = pump(config, &mut stream, sink, stop_signal);

    if let Err(e) = stream.stop() {
        tracing::warn!("Failed to stop input stream: {}", e);
    }
    close_stream(stream);

    result
}

/// The read/write loop proper
fn pump<St, S>(
    config: &CaptureConfig,
    stream: &mut St,
    sink: &mut S,
    stop_signal: &AtomicBool,
) -> Result<SessionReport, CaptureError>
where
    St: InputStream,
    S: StreamSink<St::Sample> + ?Sized,
{
    let mut buffer = SampleBuffer::<St::Sample>::new(config);
    let mut buffers = 0u64;

    let end = loop {
        if stop_signal.load(Ordering::SeqCst) {
            break SessionEnd::StopRequested;
        }

        stream
            .read(buffer.as_mut_slice())
            .map_err(CaptureError::StreamRead)?;
        buffers += 1;

        let keep_going = sink.write(buffer.as_slice());
        tracing::trace!(buffers, keep_going, "Buffer delivered to sink");

        if !keep_going {
            break SessionEnd::SinkRequested;
        }
    };

    Ok(SessionReport {
        buffers,
        frames: buffers * u64::from(config.frames_per_buffer()),
        end,
    })
}

fn close_stream<St: InputStream>(stream: St) {
    match stream.close() {
        Ok(()) => tracing::debug!("Input stream closed"),
        Err(e) => tracing::warn!("Failed to close input stream: {}", e),
    }
}

/// Close the sink; a close failure only surfaces when nothing failed earlier
fn close_sink<T, S>(
    sink: &mut S,
    result: Result<SessionReport, CaptureError>,
) -> Result<SessionReport, CaptureError>
where
    T: Sample,
    S: StreamSink<T> + ?Sized,
{
    match (result, sink.close()) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(e)) => Err(CaptureError::SinkClose(e)),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            tracing::warn!("Failed to close sink after an earlier error: {}", close_err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;
    use crate::error::CaptureErrorKind;
    use crate::testing::{Call, Journal, RecordingSink, ScriptedBackend};

    fn config() -> CaptureConfig {
        CaptureConfig::new(2, 44_100, 64, 16).unwrap()
    }

    #[test]
    fn test_sink_stop_on_third_buffer() {
        let journal = Journal::default();
        let device = CaptureDevice::new(config(), ScriptedBackend::new(journal.clone()));
        let mut sink = RecordingSink::new(journal.clone()).stop_after(3);

        let report = device.start(&mut sink).unwrap();

        assert_eq!(report.buffers, 3);
        assert_eq!(report.frames, 192);
        assert_eq!(report.end, SessionEnd::SinkRequested);
        assert_eq!(sink.received.len(), 3);
        assert!(sink.received.iter().all(|b| b.len() == 128));
        assert_eq!(journal.count(&Call::SinkOpen), 1);
        assert_eq!(journal.count(&Call::SinkClose), 1);
        assert_eq!(device.state(), SessionState::Closed);
    }

    #[test]
    fn test_teardown_runs_in_reverse_order() {
        let journal = Journal::default();
        let device = CaptureDevice::new(config(), ScriptedBackend::new(journal.clone()));
        let mut sink = RecordingSink::new(journal.clone()).stop_after(1);

        device.start(&mut sink).unwrap();

        assert_eq!(
            journal.calls(),
            vec![
                Call::Initialize,
                Call::SinkOpen,
                Call::OpenStream,
                Call::StartStream,
                Call::Read,
                Call::SinkWrite,
                Call::StopStream,
                Call::CloseStream,
                Call::SinkClose,
                Call::Terminate,
            ]
        );
    }

    #[test]
    fn test_sink_sees_fresh_data_each_read() {
        let journal = Journal::default();
        let device = CaptureDevice::new(config(), ScriptedBackend::new(journal.clone()));
        let mut sink = RecordingSink::new(journal).stop_after(3);

        device.start(&mut sink).unwrap();

        let firsts: Vec<i16> = sink.received.iter().map(|b| b[0]).collect();
        assert_eq!(firsts, vec![1, 2, 3]);
    }

    #[test]
    fn test_read_failure_on_kth_read() {
        let journal = Journal::default();
        let backend = ScriptedBackend::new(journal.clone()).fail_read_at(4);
        let device = CaptureDevice::new(config(), backend);
        let mut sink = RecordingSink::new(journal.clone());

        let err = device.start(&mut sink).unwrap_err();

        assert_eq!(err.kind(), CaptureErrorKind::StreamReadFailure);
        assert_eq!(sink.received.len(), 3);
        assert_eq!(journal.count(&Call::SinkClose), 1);
        assert_eq!(journal.count(&Call::StopStream), 1);
        assert_eq!(journal.count(&Call::CloseStream), 1);
        assert_eq!(journal.calls().last(), Some(&Call::Terminate));
    }

    #[test]
    fn test_stream_open_failure() {
        let journal = Journal::default();
        let backend = ScriptedBackend::new(journal.clone()).fail_open();
        let device = CaptureDevice::new(config(), backend);
        let mut sink = RecordingSink::new(journal.clone());

        let err = device.start(&mut sink).unwrap_err();

        assert_eq!(err.kind(), CaptureErrorKind::StreamOpenFailure);
        assert_eq!(
            journal.calls(),
            vec![
                Call::Initialize,
                Call::SinkOpen,
                Call::OpenStream,
                Call::SinkClose,
                Call::Terminate,
            ]
        );
    }

    #[test]
    fn test_stream_start_failure_closes_stream() {
        let journal = Journal::default();
        let backend = ScriptedBackend::new(journal.clone()).fail_start();
        let device = CaptureDevice::new(config(), backend);
        let mut sink = RecordingSink::new(journal.clone());

        let err = device.start(&mut sink).unwrap_err();

        assert_eq!(err.kind(), CaptureErrorKind::StreamStartFailure);
        assert_eq!(journal.count(&Call::Read), 0);
        assert_eq!(journal.count(&Call::StopStream), 0);
        assert_eq!(journal.count(&Call::CloseStream), 1);
        assert_eq!(journal.count(&Call::SinkClose), 1);
        assert_eq!(journal.count(&Call::Terminate), 1);
    }

    #[test]
    fn test_sink_open_failure_still_terminates_backend() {
        let journal = Journal::default();
        let device = CaptureDevice::new(config(), ScriptedBackend::new(journal.clone()));
        let mut sink = RecordingSink::new(journal.clone()).fail_open();

        let err = device.start(&mut sink).unwrap_err();

        assert_eq!(err.kind(), CaptureErrorKind::SinkOpenFailure);
        assert_eq!(journal.count(&Call::OpenStream), 0);
        assert_eq!(journal.count(&Call::SinkClose), 1);
        assert_eq!(journal.calls().last(), Some(&Call::Terminate));
    }

    #[test]
    fn test_backend_init_failure_touches_nothing_else() {
        let journal = Journal::default();
        let backend = ScriptedBackend::new(journal.clone()).fail_initialize();
        let device = CaptureDevice::new(config(), backend);
        let mut sink = RecordingSink::new(journal.clone());

        let err = device.start(&mut sink).unwrap_err();

        assert_eq!(err.kind(), CaptureErrorKind::BackendInitFailure);
        assert_eq!(journal.calls(), vec![Call::Initialize]);
        assert_eq!(device.state(), SessionState::Closed);
    }

    #[test]
    fn test_close_failure_reported_after_clean_stop() {
        let journal = Journal::default();
        let device = CaptureDevice::new(config(), ScriptedBackend::new(journal.clone()));
        let mut sink = RecordingSink::new(journal).stop_after(2).fail_close();

        let err = device.start(&mut sink).unwrap_err();
        assert_eq!(err.kind(), CaptureErrorKind::SinkCloseFailure);
    }

    #[test]
    fn test_close_failure_does_not_mask_read_failure() {
        let journal = Journal::default();
        let backend = ScriptedBackend::new(journal.clone()).fail_read_at(1);
        let device = CaptureDevice::new(config(), backend);
        let mut sink = RecordingSink::new(journal).fail_close();

        let err = device.start(&mut sink).unwrap_err();
        assert_eq!(err.kind(), CaptureErrorKind::StreamReadFailure);
        assert!(sink.received.is_empty());
    }

    #[test]
    fn test_device_accepts_a_second_session_after_close() {
        let journal = Journal::default();
        let device = CaptureDevice::new(config(), ScriptedBackend::new(journal.clone()));

        let mut first = RecordingSink::new(journal.clone()).stop_after(1);
        device.start(&mut first).unwrap();
        let mut second = RecordingSink::new(journal.clone()).stop_after(2);
        let report = device.start(&mut second).unwrap();

        assert_eq!(report.buffers, 2);
        assert_eq!(journal.count(&Call::Initialize), 2);
        assert_eq!(journal.count(&Call::Terminate), 2);
    }

    #[test]
    fn test_panicking_sink_releases_the_device() {
        let journal = Journal::default();
        let device = CaptureDevice::new(config(), ScriptedBackend::new(journal.clone()));
        let mut sink = RecordingSink::new(journal.clone()).panic_on_write();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| device.start(&mut sink)));
        assert!(outcome.is_err());
        assert_eq!(device.state(), SessionState::Closed);
        assert_eq!(journal.calls().last(), Some(&Call::Terminate));

        let mut next = RecordingSink::new(journal).stop_after(1);
        assert_eq!(device.start(&mut next).unwrap().buffers, 1);
    }

    #[test]
    fn test_boxed_sink_is_a_sink() {
        let journal = Journal::default();
        let device = CaptureDevice::new(config(), ScriptedBackend::new(journal.clone()));
        let mut sink: Box<dyn StreamSink<i16>> =
            Box::new(RecordingSink::new(journal.clone()).stop_after(2));

        let report = device.start(&mut sink).unwrap();
        assert_eq!(report.buffers, 2);
        assert_eq!(journal.count(&Call::SinkWrite), 2);
    }
}
