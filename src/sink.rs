//! Video sink collaborator
//!
//! A sink is an addressable element that receives the remote media stream
//! handle once negotiation delivers tracks. Sinks are looked up by identifier
//! at bind time, never held by the session manager.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::error::Result;
use crate::transport::MediaStream;

/// Addressable element that receives a media stream handle
pub trait VideoSink: Send + Sync {
    /// Bind a stream source, or clear it with `None`
    fn set_stream(&self, stream: Option<MediaStream>);

    /// Start playback; a failure here is non-fatal for the session
    fn play(&self) -> Result<()>;
}

/// Looks up video sinks by identifier
pub trait SinkRegistry: Send + Sync {
    fn lookup(&self, id: &str) -> Option<Arc<dyn VideoSink>>;
}

/// Sink registry for headless use: creates logging sinks on demand
#[derive(Default)]
pub struct LogSinkRegistry {
    sinks: Mutex<HashMap<String, Arc<LogSink>>>,
}

impl LogSinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SinkRegistry for LogSinkRegistry {
    fn lookup(&self, id: &str) -> Option<Arc<dyn VideoSink>> {
        let mut sinks = self.sinks.lock();
        let sink = sinks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(LogSink::new(id)))
            .clone();
        Some(sink)
    }
}

/// Video sink that logs stream bindings instead of rendering
pub struct LogSink {
    id: String,
    stream: Mutex<Option<MediaStream>>,
}

impl LogSink {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            stream: Mutex::new(None),
        }
    }

    /// Stream currently bound to this sink
    pub fn current_stream(&self) -> Option<MediaStream> {
        self.stream.lock().clone()
    }
}

impl VideoSink for LogSink {
    fn set_stream(&self, stream: Option<MediaStream>) {
        match &stream {
            Some(s) => info!(sink = %self.id, stream = %s.id, tracks = s.tracks.len(), "stream bound"),
            None => info!(sink = %self.id, "stream cleared"),
        }
        *self.stream.lock() = stream;
    }

    fn play(&self) -> Result<()> {
        info!(sink = %self.id, "playback started");
        Ok(())
    }
}
