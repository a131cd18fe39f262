//! WHEP session lifecycle
//!
//! One playback session per mount point: offer creation, bounded candidate
//! gathering, signaling exchange, remote description application, connection
//! monitoring and teardown, all owned by [`SessionManager`].

mod manager;
mod state;

pub use manager::{SessionManager, StreamInfo};
pub use state::{PlaybackFlags, SessionState};
