//! Session lifecycle states and playback flags

use std::sync::atomic::{AtomicBool, Ordering};

/// Per-session lifecycle state
///
/// Derived from transport progress, never stored independently: the
/// negotiation phases exist only while `start_session` is in flight, the
/// post-commit states are read off the registered transport's connection
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Negotiating,
    GatheringCandidates,
    Signaling,
    Connecting,
    Connected,
    Playing,
    Failed,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Negotiating => write!(f, "negotiating"),
            SessionState::GatheringCandidates => write!(f, "gathering-candidates"),
            SessionState::Signaling => write!(f, "signaling"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Playing => write!(f, "playing"),
            SessionState::Failed => write!(f, "failed"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Process-wide playback flags
///
/// Coarse by design: `started` means some session reached negotiation
/// commit, `playing` means some sink received media. Per-mount visibility
/// goes through `SessionManager::session_state` instead.
#[derive(Debug, Default)]
pub struct PlaybackFlags {
    started: AtomicBool,
    playing: AtomicBool,
}

impl PlaybackFlags {
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub(crate) fn set_started(&self, value: bool) {
        self.started.store(value, Ordering::SeqCst);
    }

    pub(crate) fn set_playing(&self, value: bool) {
        self.playing.store(value, Ordering::SeqCst);
    }

    pub(crate) fn clear(&self) {
        self.set_started(false);
        self.set_playing(false);
    }
}
