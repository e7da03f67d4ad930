use thiserror::Error;

/// Failure to open the microphone. Fatal to `start()`; no session is created.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no audio input device available")]
    NoDevice,

    #[error("input device does not support 16 kHz mono capture")]
    UnsupportedFormat,

    #[error("audio capture unavailable: {0}")]
    Unavailable(String),
}

/// Credential problems. The engine never retries a failed refresh.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("bearer token is not a well-formed JWT")]
    MalformedToken,

    #[error("refresh token expired")]
    RefreshTokenExpired,

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

/// Transport-level failures on the message channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel handshake failed: {0}")]
    Handshake(String),

    #[error("channel closed unexpectedly")]
    Closed,
}

/// Errors returned by `SessionController::start`.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("a recording session is already active")]
    AlreadyActive,

    #[error("audio capture unavailable")]
    CaptureUnavailable(#[source] CaptureError),

    #[error("channel did not open within the connect timeout")]
    ConnectTimeout,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Errors returned by `SessionController::stop`.
///
/// Stopping is bounded and best-effort; the only reportable failure is a
/// capture backend that refuses to release the device.
#[derive(Debug, Error)]
pub enum StopError {
    #[error("failed to release audio capture")]
    Capture(#[source] CaptureError),
}
