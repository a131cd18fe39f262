//! WHEP signaling over HTTP
//!
//! The WHEP exchange is a single POST: offer SDP out, answer SDP back.
//! Non-2xx statuses and transport-level failures surface as
//! [`AppError::Signaling`]; the empty-answer check lives in the session
//! manager so mock clients exercise it too.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::error;

use crate::error::{AppError, Result};

/// Build the WHEP endpoint URL for a mount point
pub fn whep_endpoint(base: &str, mount: &str) -> String {
    format!(
        "{}/{}/whep",
        base.trim_end_matches('/'),
        urlencoding::encode(mount)
    )
}

/// Posts SDP offers to a WHEP endpoint
#[async_trait]
pub trait SignalingClient: Send + Sync {
    /// POST the offer, returning the answer SDP text
    async fn post_offer(&self, endpoint: &str, sdp: &str) -> Result<String>;
}

/// reqwest-backed WHEP signaling client
pub struct HttpSignalingClient {
    client: reqwest::Client,
}

impl HttpSignalingClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpSignalingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalingClient for HttpSignalingClient {
    async fn post_offer(&self, endpoint: &str, sdp: &str) -> Result<String> {
        let res = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/sdp")
            .body(sdp.to_string())
            .send()
            .await
            .map_err(|e| AppError::Signaling {
                status: 0,
                body: e.to_string(),
            })?;

        let status = res.status();
        if !status.is_success() {
            // Body read is best-effort: the status alone is enough to fail.
            let body = res.text().await.unwrap_or_default();
            error!(%status, body, endpoint, "WHEP offer rejected");
            return Err(AppError::Signaling {
                status: status.as_u16(),
                body,
            });
        }

        res.text().await.map_err(|e| AppError::Signaling {
            status: status.as_u16(),
            body: e.to_string(),
        })
    }
}
