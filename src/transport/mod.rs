//! Media transport collaborator contract
//!
//! The session manager drives a peer-connection primitive through this trait
//! instead of a concrete WebRTC stack: offer/description calls are async
//! methods, and the primitive's events (ICE gathering, connection state,
//! track arrival) are exposed as channel subscriptions rather than callbacks
//! so the manager can drop them deterministically on teardown.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::config::IceServer;
use crate::error::Result;

pub mod rtc;

pub use rtc::{RtcTransport, RtcTransportFactory};

/// Media kind for receive-only transceivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// ICE candidate gathering state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatheringState {
    New,
    Gathering,
    Complete,
}

/// ICE connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

impl IceConnectionState {
    /// States that trigger automatic session teardown
    pub fn is_broken(self) -> bool {
        matches!(self, Self::Failed | Self::Disconnected)
    }
}

impl std::fmt::Display for IceConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IceConnectionState::New => write!(f, "new"),
            IceConnectionState::Checking => write!(f, "checking"),
            IceConnectionState::Connected => write!(f, "connected"),
            IceConnectionState::Completed => write!(f, "completed"),
            IceConnectionState::Disconnected => write!(f, "disconnected"),
            IceConnectionState::Failed => write!(f, "failed"),
            IceConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Opaque handle to a remote media track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: String,
    pub kind: MediaKind,
}

/// Remote media stream handle, bound to a video sink on arrival
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

impl MediaStream {
    /// Wrap a lone track when the transport did not group it into a stream
    pub fn from_track(track: MediaTrack) -> Self {
        Self {
            id: track.id.clone(),
            tracks: vec![track],
        }
    }
}

/// Track-received notification
#[derive(Debug, Clone)]
pub struct TrackEvent {
    /// Stream the track belongs to, when the transport provides one
    pub stream: Option<MediaStream>,
    pub track: MediaTrack,
}

/// Peer-connection primitive driven by the session manager
///
/// One handle per session, exclusively owned: created at session start,
/// closed at session end, never shared across mounts.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Add a receive-only transceiver for the given media kind
    async fn add_recv_transceiver(&self, kind: MediaKind) -> Result<()>;

    /// Create an SDP offer
    async fn create_offer(&self) -> Result<String>;

    /// Set the local description from offer SDP
    async fn set_local_description(&self, sdp: String) -> Result<()>;

    /// Local description text, including candidates gathered so far
    async fn local_description(&self) -> Option<String>;

    /// Apply the remote answer description
    async fn set_remote_description(&self, sdp: String) -> Result<()>;

    /// Current ICE gathering state
    fn gathering_state(&self) -> GatheringState;

    /// Subscribe to ICE gathering state changes
    fn subscribe_gathering(&self) -> watch::Receiver<GatheringState>;

    /// Subscribe to ICE connection state changes
    fn subscribe_connection(&self) -> watch::Receiver<IceConnectionState>;

    /// Single-consumer stream of track arrivals; later calls return a
    /// channel that yields nothing
    fn take_track_events(&self) -> mpsc::UnboundedReceiver<TrackEvent>;

    /// Best-effort stop of all outbound send tracks
    async fn stop_senders(&self);

    /// Close the transport and release its network resources
    async fn close(&self) -> Result<()>;
}

/// Creates transport handles for new sessions
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self, ice_servers: &[IceServer]) -> Result<Arc<dyn MediaTransport>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_track_stream_fallback() {
        let track = MediaTrack {
            id: "trk-7".into(),
            kind: MediaKind::Video,
        };
        let stream = MediaStream::from_track(track.clone());
        assert_eq!(stream.id, "trk-7");
        assert_eq!(stream.tracks, vec![track]);
    }

    #[test]
    fn broken_connection_states() {
        assert!(IceConnectionState::Failed.is_broken());
        assert!(IceConnectionState::Disconnected.is_broken());
        assert!(!IceConnectionState::Connected.is_broken());
        assert!(!IceConnectionState::Closed.is_broken());
    }
}
