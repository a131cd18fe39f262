//! Player configuration

use serde::{Deserialize, Serialize};

/// Default ICE candidate gathering wait in milliseconds
pub const DEFAULT_GATHERING_TIMEOUT_MS: u64 = 5000;

/// WHEP player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// WHEP signaling origin, e.g. "http://mediamtx.local:8889"
    pub media_base: Option<String>,
    /// STUN server URLs
    pub stun_servers: Vec<String>,
    /// TURN server configuration
    pub turn_servers: Vec<TurnServer>,
    /// ICE candidate gathering timeout (ms); the wait is best-effort and the
    /// session proceeds when it expires
    pub gathering_timeout_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            media_base: None,
            stun_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            turn_servers: vec![],
            gathering_timeout_ms: DEFAULT_GATHERING_TIMEOUT_MS,
        }
    }
}

impl PlayerConfig {
    /// Flatten STUN and TURN entries into transport-facing ICE servers
    pub fn ice_servers(&self) -> Vec<IceServer> {
        let mut servers: Vec<IceServer> = self
            .stun_servers
            .iter()
            .map(|url| IceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .collect();

        for turn in &self.turn_servers {
            servers.push(IceServer {
                urls: turn.urls.clone(),
                username: turn.username.clone(),
                credential: turn.credential.clone(),
            });
        }

        servers
    }
}

/// TURN server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnServer {
    /// TURN server URLs (multiple URLs allow UDP/TCP transport fallback)
    pub urls: Vec<String>,
    /// Username for TURN authentication
    pub username: String,
    /// Credential for TURN authentication
    pub credential: String,
}

/// ICE server entry handed to the transport factory
#[derive(Debug, Clone, Default)]
pub struct IceServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gathering_timeout() {
        let config = PlayerConfig::default();
        assert_eq!(config.gathering_timeout_ms, 5000);
        assert!(config.media_base.is_none());
    }

    #[test]
    fn ice_servers_flatten_stun_and_turn() {
        let config = PlayerConfig {
            stun_servers: vec!["stun:stun.example.com:3478".into()],
            turn_servers: vec![TurnServer {
                urls: vec!["turn:turn.example.com:3478".into()],
                username: "user".into(),
                credential: "pass".into(),
            }],
            ..Default::default()
        };

        let servers = config.ice_servers();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].urls, vec!["stun:stun.example.com:3478"]);
        assert!(servers[0].username.is_empty());
        assert_eq!(servers[1].username, "user");
        assert_eq!(servers[1].credential, "pass");
    }

    #[test]
    fn config_survives_json_round_trip() {
        let config = PlayerConfig {
            media_base: Some("http://media.local:8889".into()),
            turn_servers: vec![TurnServer {
                urls: vec!["turn:turn.example.com:3478".into()],
                username: "user".into(),
                credential: "pass".into(),
            }],
            gathering_timeout_ms: 1500,
            ..Default::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let back: PlayerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.media_base.as_deref(), Some("http://media.local:8889"));
        assert_eq!(back.stun_servers, config.stun_servers);
        assert_eq!(back.gathering_timeout_ms, 1500);
        assert_eq!(back.turn_servers[0].urls, config.turn_servers[0].urls);
        assert_eq!(back.turn_servers[0].username, "user");
    }
}
