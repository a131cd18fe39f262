//! WHEP playback session manager
//!
//! Owns the session registry, the per-mount epoch counters and the playback
//! flags; no module-level state. A `start_session` call walks the whole
//! negotiation (transport allocation, recv-only transceivers, offer, bounded
//! candidate-gathering wait, WHEP POST, remote answer) and commits the
//! transport into the registry only if no stop intervened in the meantime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;
use crate::error::{AppError, Result};
use crate::signaling::{whep_endpoint, SignalingClient};
use crate::sink::SinkRegistry;
use crate::transport::{
    GatheringState, IceConnectionState, MediaKind, MediaStream, MediaTransport, TransportFactory,
};

use super::state::{PlaybackFlags, SessionState};

/// Stream metadata recorded by `attach_request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub kind: String,
    pub device_id: String,
    pub username: String,
}

/// A session committed to the registry
struct ActiveSession {
    transport: Arc<dyn MediaTransport>,
    sink_id: String,
    connection_rx: watch::Receiver<IceConnectionState>,
    watchers: Vec<JoinHandle<()>>,
}

/// Owns the lifecycle of WHEP playback sessions, one per mount point
pub struct SessionManager {
    config: PlayerConfig,
    media_base: ArcSwapOption<String>,
    transports: Arc<dyn TransportFactory>,
    signaling: Arc<dyn SignalingClient>,
    sinks: Arc<dyn SinkRegistry>,
    sessions: RwLock<HashMap<String, ActiveSession>>,
    // Bumped by every stop; a negotiation that outlives the epoch it was
    // started under must not commit its transport.
    epochs: RwLock<HashMap<String, u64>>,
    flags: PlaybackFlags,
    streams: parking_lot::RwLock<HashMap<String, StreamInfo>>,
}

impl SessionManager {
    pub fn new(
        config: PlayerConfig,
        transports: Arc<dyn TransportFactory>,
        signaling: Arc<dyn SignalingClient>,
        sinks: Arc<dyn SinkRegistry>,
    ) -> Arc<Self> {
        let media_base = ArcSwapOption::from(config.media_base.clone().map(Arc::new));
        Arc::new(Self {
            config,
            media_base,
            transports,
            signaling,
            sinks,
            sessions: RwLock::new(HashMap::new()),
            epochs: RwLock::new(HashMap::new()),
            flags: PlaybackFlags::default(),
            streams: parking_lot::RwLock::new(HashMap::new()),
        })
    }

    /// Set or replace the WHEP signaling origin; empty input is ignored
    pub fn set_media_base(&self, base: impl Into<String>) {
        let base = base.into();
        if base.is_empty() {
            return;
        }
        self.media_base.store(Some(Arc::new(base)));
    }

    /// Whether a signaling origin has been configured
    pub fn is_initialized(&self) -> bool {
        self.media_base.load().is_some()
    }

    pub fn stream_started(&self) -> bool {
        self.flags.started()
    }

    pub fn stream_is_playing(&self) -> bool {
        self.flags.playing()
    }

    /// Start playing `mount` into the sink identified by `sink_id`.
    ///
    /// An already-active mount is stopped first; the silent registry
    /// overwrite (and leaked transport) is deliberately not supported.
    pub async fn start_session(self: &Arc<Self>, mount: &str, sink_id: &str) -> Result<()> {
        let base = self.media_base.load_full().ok_or(AppError::NotInitialized)?;

        let prior_sink = self
            .sessions
            .read()
            .await
            .get(mount)
            .map(|s| s.sink_id.clone());
        if let Some(prior_sink) = prior_sink {
            info!(mount, "restarting active session");
            self.stop_session(mount, &prior_sink).await;
        }

        let epoch = self.current_epoch(mount).await;
        let endpoint = whep_endpoint(&base, mount);

        debug!(mount, state = %SessionState::Negotiating, "creating media transport");
        let transport = self.transports.create(&self.config.ice_servers()).await?;

        let connection_rx = transport.subscribe_connection();
        let mut watchers = vec![
            self.spawn_track_watcher(&transport, sink_id),
            self.spawn_connection_watcher(connection_rx.clone(), mount, sink_id),
        ];

        if let Err(err) = self.negotiate(&transport, &endpoint, mount).await {
            warn!(mount, error = %err, "session start failed");
            abort_watchers(&mut watchers);
            if let Err(close_err) = transport.close().await {
                debug!(mount, error = %close_err, "transport close after failed start");
            }
            return Err(err);
        }

        // Commit only if no stop invalidated this negotiation.
        let mut sessions = self.sessions.write().await;
        if self.current_epoch(mount).await != epoch {
            drop(sessions);
            debug!(mount, "session stopped during negotiation, discarding transport");
            abort_watchers(&mut watchers);
            if let Err(close_err) = transport.close().await {
                debug!(mount, error = %close_err, "stale transport close");
            }
            return Err(AppError::SessionInterrupted(mount.to_string()));
        }
        let displaced = sessions.insert(
            mount.to_string(),
            ActiveSession {
                transport,
                sink_id: sink_id.to_string(),
                connection_rx,
                watchers,
            },
        );
        // Raised before the lock drops: a stop serialized behind this commit
        // clears it afterwards, never the other way round.
        self.flags.set_started(true);
        drop(sessions);

        // Two starts for the same mount can both pass the duplicate check
        // before either commits; the displaced entry still owns a live
        // transport and running watchers.
        if let Some(displaced) = displaced {
            debug!(mount, "closing transport displaced by concurrent start");
            displaced.transport.stop_senders().await;
            if let Err(close_err) = displaced.transport.close().await {
                debug!(mount, error = %close_err, "displaced transport close");
            }
            for watcher in &displaced.watchers {
                watcher.abort();
            }
            if displaced.sink_id != sink_id {
                if let Some(sink) = self.sinks.lookup(&displaced.sink_id) {
                    sink.set_stream(None);
                }
            }
        }

        info!(mount, sink = sink_id, "WHEP session established");
        Ok(())
    }

    /// Tear down the session for `mount`.
    ///
    /// Safe to call when no session exists; every substep is independently
    /// best-effort and the playback flags are cleared unconditionally.
    pub async fn stop_session(&self, mount: &str, sink_id: &str) {
        {
            let mut epochs = self.epochs.write().await;
            *epochs.entry(mount.to_string()).or_insert(0) += 1;
        }

        let entry = self.sessions.write().await.remove(mount);
        if let Some(session) = entry {
            session.transport.stop_senders().await;
            if let Err(err) = session.transport.close().await {
                debug!(mount, error = %err, "transport close during stop");
            }
            info!(mount, "session stopped");
            // Last, and followed only by synchronous steps: a connection
            // watcher may be the caller and must not cancel its own teardown.
            for watcher in &session.watchers {
                watcher.abort();
            }
        }

        if let Some(sink) = self.sinks.lookup(sink_id) {
            sink.set_stream(None);
        }

        self.flags.clear();
    }

    /// Record stream metadata for a sink, then start playback on it
    pub async fn attach_request(
        self: &Arc<Self>,
        id: &str,
        mount: &str,
        info: StreamInfo,
    ) -> Result<()> {
        self.streams.write().insert(id.to_string(), info);
        self.start_session(mount, id).await
    }

    /// Start watching `mount` on the sink identified by `id`
    pub async fn request_to_watch(self: &Arc<Self>, mount: &str, id: &str) -> Result<()> {
        self.start_session(mount, id).await
    }

    /// Metadata recorded for a sink by `attach_request`
    pub fn stream_info(&self, id: &str) -> Option<StreamInfo> {
        self.streams.read().get(id).cloned()
    }

    pub fn remove_stream(&self, id: &str) {
        self.streams.write().remove(id);
    }

    /// Lifecycle state derived from the registered transport
    pub async fn session_state(&self, mount: &str) -> SessionState {
        let sessions = self.sessions.read().await;
        match sessions.get(mount) {
            None => SessionState::Idle,
            Some(session) => match *session.connection_rx.borrow() {
                IceConnectionState::Failed | IceConnectionState::Disconnected => {
                    SessionState::Failed
                }
                IceConnectionState::Closed => SessionState::Closed,
                IceConnectionState::Connected | IceConnectionState::Completed => {
                    if self.flags.playing() {
                        SessionState::Playing
                    } else {
                        SessionState::Connected
                    }
                }
                _ => SessionState::Connecting,
            },
        }
    }

    /// Mount points with a committed session
    pub async fn active_mounts(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    async fn current_epoch(&self, mount: &str) -> u64 {
        self.epochs.read().await.get(mount).copied().unwrap_or(0)
    }

    /// Offer, gathering wait, WHEP exchange and remote answer, in order
    async fn negotiate(
        &self,
        transport: &Arc<dyn MediaTransport>,
        endpoint: &str,
        mount: &str,
    ) -> Result<()> {
        transport.add_recv_transceiver(MediaKind::Video).await?;
        transport.add_recv_transceiver(MediaKind::Audio).await?;

        let offer = transport.create_offer().await?;
        transport.set_local_description(offer).await?;

        debug!(mount, state = %SessionState::GatheringCandidates, "waiting for ICE candidates");
        self.wait_for_gathering(transport.as_ref()).await;

        // Re-read the description: it carries candidates gathered meanwhile.
        let local_sdp = transport.local_description().await.ok_or_else(|| {
            AppError::Negotiation("local description missing after gathering".into())
        })?;

        debug!(mount, state = %SessionState::Signaling, endpoint, "posting WHEP offer");
        let answer = self.signaling.post_offer(endpoint, &local_sdp).await?;
        if answer.is_empty() {
            warn!(mount, "empty answer SDP from WHEP endpoint");
            return Err(AppError::EmptyAnswer);
        }

        debug!(mount, state = %SessionState::Connecting, "applying remote answer");
        transport.set_remote_description(answer).await?;
        Ok(())
    }

    /// Best-effort trickle-ICE wait: returns on gathering completion or
    /// after the configured timeout, whichever comes first.
    async fn wait_for_gathering(&self, transport: &dyn MediaTransport) {
        if transport.gathering_state() == GatheringState::Complete {
            return;
        }

        let mut rx = transport.subscribe_gathering();
        let complete = async {
            loop {
                if *rx.borrow_and_update() == GatheringState::Complete {
                    break;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        };

        let timeout = Duration::from_millis(self.config.gathering_timeout_ms);
        if tokio::time::timeout(timeout, complete).await.is_err() {
            debug!(
                timeout_ms = self.config.gathering_timeout_ms,
                "candidate gathering timed out, continuing"
            );
        }
    }

    /// Bind arriving tracks to the sink and raise the playing flag
    fn spawn_track_watcher(
        self: &Arc<Self>,
        transport: &Arc<dyn MediaTransport>,
        sink_id: &str,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let sink_id = sink_id.to_string();
        let mut tracks = transport.take_track_events();
        tokio::spawn(async move {
            while let Some(event) = tracks.recv().await {
                let Some(sink) = manager.sinks.lookup(&sink_id) else {
                    debug!(sink = %sink_id, "track received but sink not found");
                    continue;
                };
                let stream = event
                    .stream
                    .unwrap_or_else(|| MediaStream::from_track(event.track.clone()));
                info!(sink = %sink_id, stream = %stream.id, kind = %event.track.kind, "binding remote stream");
                sink.set_stream(Some(stream));
                if let Err(err) = sink.play() {
                    // Autoplay-style rejection, non-fatal.
                    debug!(sink = %sink_id, error = %err, "sink playback start failed");
                }
                manager.flags.set_playing(true);
            }
        })
    }

    /// Stop the session once on the first failed/disconnected transition
    fn spawn_connection_watcher(
        self: &Arc<Self>,
        mut rx: watch::Receiver<IceConnectionState>,
        mount: &str,
        sink_id: &str,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mount = mount.to_string();
        let sink_id = sink_id.to_string();
        tokio::spawn(async move {
            loop {
                let state = *rx.borrow_and_update();
                if state.is_broken() {
                    warn!(mount, %state, "connection lost, tearing session down");
                    tokio::spawn(async move {
                        manager.stop_session(&mount, &sink_id).await;
                    });
                    // Exactly one teardown per session: a later transition
                    // into the other broken state must not fire again.
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        })
    }
}

fn abort_watchers(watchers: &mut Vec<JoinHandle<()>>) {
    for watcher in watchers.drain(..) {
        watcher.abort();
    }
}
