use thiserror::Error;

/// Library-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Media base URL not configured")]
    NotInitialized,

    #[error("Session for mount '{0}' was stopped during negotiation")]
    SessionInterrupted(String),

    #[error("WHEP signaling failed (status {status}): {body}")]
    Signaling { status: u16, body: String },

    #[error("WHEP endpoint returned an empty answer SDP")]
    EmptyAnswer,

    #[error("Negotiation failed: {0}")]
    Negotiation(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, AppError>;
