//! Background capture sessions
//!
//! The loop runs on a dedicated thread. Backend streams are often not `Send`
//! (`cpal::Stream` is not), so the stream is opened on that thread and never
//! leaves it; only the backend handle and the sink cross over.
//!
//! Cancellation is cooperative. [`CaptureSession::stop`] raises an atomic
//! flag that the loop checks before each read, then joins the thread. A read
//! already in flight is never interrupted, so `stop` can block for up to one
//! buffer, or indefinitely if the backend stalls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::capture::{run_session, CaptureDevice, SessionReport};
use crate::error::CaptureError;
use crate::state::{SessionState, SessionStateCell};
use crate::traits::{AudioBackend, StreamSink};

/// Name given to capture threads
pub const CAPTURE_THREAD_NAME: &str = "taperec-capture";

type Worker<S> = JoinHandle<(S, Result<SessionReport, CaptureError>)>;

impl<B> CaptureDevice<B>
where
    B: AudioBackend + Send + Sync + 'static,
{
    /// Run one session on a background thread and return immediately
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::SessionActive`] if a session is already in
    /// flight on this device. Backend and sink failures are reported by
    /// [`CaptureSession::stop`] or [`CaptureSession::wait`].
    pub fn start_async<S>(&self, sink: S) -> Result<CaptureSession<S>, CaptureError>
    where
        S: StreamSink<B::Sample> + Send + 'static,
    {
        if !self.state.begin() {
            return Err(CaptureError::SessionActive);
        }

        let stop_signal = Arc::new(AtomicBool::new(false));

        let config = self.config;
        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let signal = Arc::clone(&stop_signal);

        let spawned = thread::Builder::new()
            .name(CAPTURE_THREAD_NAME.to_string())
            .spawn(move || {
                let mut sink = sink;
                let result = run_session(&config, &*backend, &mut sink, &signal, &state);
                (sink, result)
            });

        match spawned {
            Ok(worker) => Ok(CaptureSession {
                stop_signal,
                state: Arc::clone(&self.state),
                worker: Some(worker),
                sink: None,
            }),
            Err(e) => {
                self.state.store(SessionState::Idle);
                Err(CaptureError::Spawn(e))
            }
        }
    }
}

/// Handle to a session running on a background thread
///
/// Dropping a session that has not been joined stops and joins it, so no
/// session resource outlives its handle.
pub struct CaptureSession<S> {
    stop_signal: Arc<AtomicBool>,
    state: Arc<SessionStateCell>,
    worker: Option<Worker<S>>,
    sink: Option<S>,
}

impl<S> CaptureSession<S> {
    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    /// Whether the capture thread has exited (or was already joined)
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// Request cancellation and block until the capture thread has torn
    /// everything down
    ///
    /// Returns `Ok(Some(report))` from the call that joined the thread and
    /// `Ok(None)` from any later call.
    pub fn stop(&mut self) -> Result<Option<SessionReport>, CaptureError> {
        let Some(worker) = self.worker.take() else {
            tracing::debug!("Capture session already joined");
            return Ok(None);
        };

        self.stop_signal.store(true, Ordering::SeqCst);
        if self.state.transition(SessionState::Streaming, SessionState::Stopping) {
            tracing::info!("Capture stop requested");
        }

        self.join(worker).map(Some)
    }

    /// Block until the session ends on its own (sink stop or failure)
    pub fn wait(&mut self) -> Result<Option<SessionReport>, CaptureError> {
        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };
        self.join(worker).map(Some)
    }

    /// The sink, once the session has been joined
    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    /// Take the sink back, once the session has been joined
    pub fn into_sink(mut self) -> Option<S> {
        self.sink.take()
    }

    fn join(&mut self, worker: Worker<S>) -> Result<SessionReport, CaptureError> {
        match worker.join() {
            Ok((sink, result)) => {
                self.sink = Some(sink);
                result
            }
            Err(_) => {
                self.state.store(SessionState::Closed);
                Err(CaptureError::WorkerPanicked)
            }
        }
    }
}

impl<S> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        if self.worker.is_none() {
            return;
        }

        tracing::warn!("Capture session dropped while running, stopping it");
        if let Err(e) = self.stop() {
            tracing::error!("Capture session failed during drop: {}", e);
        }
    }
}
