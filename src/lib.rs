//! whep-player - WHEP playback session management
//!
//! This crate drives the client side of WHEP (WebRTC-HTTP Egress Protocol)
//! playback against a media server such as MediaMTX: one session per mount
//! point, covering offer creation, bounded ICE candidate gathering, the
//! signaling exchange, remote description application, connection monitoring
//! with automatic teardown, and an epoch-guarded session registry.
//!
//! The media transport, signaling client and video sink are trait
//! collaborators; production implementations back them with the `webrtc`
//! crate and `reqwest`.

pub mod config;
pub mod error;
pub mod session;
pub mod signaling;
pub mod sink;
pub mod transport;

pub use config::{IceServer, PlayerConfig, TurnServer};
pub use error::{AppError, Result};
pub use session::{PlaybackFlags, SessionManager, SessionState, StreamInfo};
pub use signaling::{HttpSignalingClient, SignalingClient};
pub use sink::{LogSinkRegistry, SinkRegistry, VideoSink};
pub use transport::{MediaTransport, RtcTransportFactory, TransportFactory};
