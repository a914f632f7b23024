//! Capture session state machine
//!
//! ```text
//! Idle --start--> Streaming --(read error | sink stop | stop observed)--> Stopping --> Closed
//! ```
//!
//! The state is shared between the caller and the capture thread, so it
//! lives in an atomic. `SeqCst` is used throughout, matching the stop signal.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Streaming = 1,
    Stopping = 2,
    Closed = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Streaming,
            2 => Self::Stopping,
            _ => Self::Closed,
        }
    }

    /// Whether a session occupies the device in this state
    pub fn is_active(self) -> bool {
        matches!(self, Self::Streaming | Self::Stopping)
    }
}

#[derive(Debug)]
pub(crate) struct SessionStateCell(AtomicU8);

impl Default for SessionStateCell {
    fn default() -> Self {
        Self(AtomicU8::new(SessionState::Idle as u8))
    }
}

impl SessionStateCell {
    pub(crate) fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn store(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Atomically move `from -> to`, returning whether the move happened
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Claim the device for a new session
    ///
    /// Succeeds from `Idle`, or from `Closed` once a previous session has
    /// fully torn down.
    pub(crate) fn begin(&self) -> bool {
        self.transition(SessionState::Idle, SessionState::Streaming)
            || self.transition(SessionState::Closed, SessionState::Streaming)
    }
}
