use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{clone_without_source, ConnectionError};

/// Lifecycle states from spec §4.3: `New -> Handshaking -> Ready -> Closing
/// -> Closed`, with `Failed` reachable from any state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    New = 0,
    Handshaking = 1,
    Ready = 2,
    Closing = 3,
    Closed = 4,
    Failed = 5,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::New,
            1 => Self::Handshaking,
            2 => Self::Ready,
            3 => Self::Closing,
            4 => Self::Closed,
            _ => Self::Failed,
        }
    }
}

/// An atomically-readable slot holding the current `ConnectionState`, plus
/// the error that caused a `Failed` transition (if any).
#[derive(Debug)]
pub struct StateCell {
    value: AtomicU8,
    failure: std::sync::Mutex<Option<ConnectionError>>,
}

impl StateCell {
    pub fn new(initial: ConnectionState) -> Self {
        Self {
            value: AtomicU8::new(initial as u8),
            failure: std::sync::Mutex::new(None),
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.value.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        self.value.store(state as u8, Ordering::Release);
    }

    /// Transitions to `Failed`, recording `error` the first time this is
    /// called; subsequent calls are no-ops so the first failure wins.
    pub fn fail(&self, error: ConnectionError) {
        let mut failure = self.failure.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if failure.is_none() {
            *failure = Some(error);
            self.set(ConnectionState::Failed);
        }
    }

    pub fn failure(&self) -> Option<ConnectionError> {
        self.failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(clone_without_source)
    }
}
