use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag that makes a sink ask the capture loop to stop
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Continuation decision shared by the reference sinks
#[derive(Debug, Default)]
pub(crate) struct Continuation {
    limit: Option<u64>,
    delivered: u64,
    stop: StopHandle,
}

impl Continuation {
    pub(crate) fn set_limit(&mut self, buffers: u64) {
        self.limit = Some(buffers);
    }

    pub(crate) fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub(crate) fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Count one delivered buffer and decide whether to ask for another
    pub(crate) fn record(&mut self) -> bool {
        self.delivered += 1;
        if self.stop.is_stop_requested() {
            return false;
        }
        self.limit.map_or(true, |limit| self.delivered < limit)
    }
}
