//! webrtc-rs backed media transport
//!
//! Receive-only peer connection configured for WHEP playback. Gathering and
//! connection state changes are bridged into watch channels, track arrivals
//! into an mpsc channel, so the session manager never installs callbacks of
//! its own on the underlying peer connection.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::debug;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_remote::TrackRemote;

use super::{
    GatheringState, IceConnectionState, MediaKind, MediaStream, MediaTrack, MediaTransport,
    TrackEvent, TransportFactory,
};
use crate::config::IceServer;
use crate::error::{AppError, Result};

/// Media transport over a webrtc-rs peer connection
pub struct RtcTransport {
    pc: Arc<RTCPeerConnection>,
    gathering_rx: watch::Receiver<GatheringState>,
    connection_rx: watch::Receiver<IceConnectionState>,
    track_rx: Mutex<Option<mpsc::UnboundedReceiver<TrackEvent>>>,
}

impl RtcTransport {
    pub async fn new(ice_servers: &[IceServer]) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| AppError::Transport(format!("Failed to register codecs: {e}")))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| AppError::Transport(format!("Failed to register interceptors: {e}")))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|s| RTCIceServer {
                    urls: s.urls.clone(),
                    username: s.username.clone(),
                    credential: s.credential.clone(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let pc = api
            .new_peer_connection(rtc_config)
            .await
            .map_err(|e| AppError::Transport(format!("Failed to create peer connection: {e}")))?;
        let pc = Arc::new(pc);

        let (gathering_tx, gathering_rx) = watch::channel(GatheringState::New);
        pc.on_ice_gathering_state_change(Box::new(move |state: RTCIceGathererState| {
            let mapped = match state {
                RTCIceGathererState::Gathering => GatheringState::Gathering,
                RTCIceGathererState::Complete => GatheringState::Complete,
                _ => GatheringState::New,
            };
            let _ = gathering_tx.send(mapped);
            Box::pin(async {})
        }));

        let (connection_tx, connection_rx) = watch::channel(IceConnectionState::New);
        pc.on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
            let mapped = match state {
                RTCIceConnectionState::Checking => IceConnectionState::Checking,
                RTCIceConnectionState::Connected => IceConnectionState::Connected,
                RTCIceConnectionState::Completed => IceConnectionState::Completed,
                RTCIceConnectionState::Disconnected => IceConnectionState::Disconnected,
                RTCIceConnectionState::Failed => IceConnectionState::Failed,
                RTCIceConnectionState::Closed => IceConnectionState::Closed,
                _ => IceConnectionState::New,
            };
            debug!(state = %mapped, "ICE connection state changed");
            let _ = connection_tx.send(mapped);
            Box::pin(async {})
        }));

        let (track_tx, track_rx) = mpsc::unbounded_channel();
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let media_track = MediaTrack {
                    id: track.id(),
                    kind: match track.kind() {
                        RTPCodecType::Video => MediaKind::Video,
                        _ => MediaKind::Audio,
                    },
                };
                let stream_id = track.stream_id();
                let stream = if stream_id.is_empty() {
                    None
                } else {
                    Some(MediaStream {
                        id: stream_id,
                        tracks: vec![media_track.clone()],
                    })
                };
                let _ = track_tx.send(TrackEvent {
                    stream,
                    track: media_track,
                });
                Box::pin(async {})
            },
        ));

        Ok(Self {
            pc,
            gathering_rx,
            connection_rx,
            track_rx: Mutex::new(Some(track_rx)),
        })
    }
}

#[async_trait]
impl MediaTransport for RtcTransport {
    async fn add_recv_transceiver(&self, kind: MediaKind) -> Result<()> {
        let codec_type = match kind {
            MediaKind::Video => RTPCodecType::Video,
            MediaKind::Audio => RTPCodecType::Audio,
        };
        self.pc
            .add_transceiver_from_kind(
                codec_type,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await
            .map_err(|e| AppError::Negotiation(format!("Failed to add {kind} transceiver: {e}")))?;
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(|e| AppError::Negotiation(format!("Failed to create offer: {e}")))?;
        Ok(offer.sdp)
    }

    async fn set_local_description(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::offer(sdp)
            .map_err(|e| AppError::Negotiation(format!("Invalid offer SDP: {e}")))?;
        self.pc
            .set_local_description(desc)
            .await
            .map_err(|e| AppError::Negotiation(format!("Failed to set local description: {e}")))
    }

    async fn local_description(&self) -> Option<String> {
        self.pc.local_description().await.map(|d| d.sdp)
    }

    async fn set_remote_description(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::answer(sdp)
            .map_err(|e| AppError::Negotiation(format!("Invalid answer SDP: {e}")))?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(|e| AppError::Negotiation(format!("Failed to set remote description: {e}")))
    }

    fn gathering_state(&self) -> GatheringState {
        *self.gathering_rx.borrow()
    }

    fn subscribe_gathering(&self) -> watch::Receiver<GatheringState> {
        self.gathering_rx.clone()
    }

    fn subscribe_connection(&self) -> watch::Receiver<IceConnectionState> {
        self.connection_rx.clone()
    }

    fn take_track_events(&self) -> mpsc::UnboundedReceiver<TrackEvent> {
        self.track_rx.lock().take().unwrap_or_else(|| {
            let (_tx, rx) = mpsc::unbounded_channel();
            rx
        })
    }

    async fn stop_senders(&self) {
        for sender in self.pc.get_senders().await {
            if let Err(e) = sender.stop().await {
                debug!(error = %e, "failed to stop sender track");
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.pc
            .close()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to close peer connection: {e}")))
    }
}

/// Factory producing [`RtcTransport`] handles
pub struct RtcTransportFactory;

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn create(&self, ice_servers: &[IceServer]) -> Result<Arc<dyn MediaTransport>> {
        Ok(Arc::new(RtcTransport::new(ice_servers).await?))
    }
}
