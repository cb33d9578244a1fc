use thiserror::Error;

/// Top-level error type for the `waymark-api` crate.
///
/// Covers every failure mode across both API surfaces: the realtime
/// feed socket and the device-lookup HTTP endpoint. `waymark-core`
/// maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Feed socket ─────────────────────────────────────────────────
    /// Socket connection failed.
    #[error("Feed socket connection failed: {0}")]
    SocketConnect(String),

    /// Socket closed unexpectedly.
    #[error("Feed socket closed (code {code}): {reason}")]
    SocketClosed { code: u16, reason: String },

    /// The outbound request channel is gone (socket task has exited).
    #[error("Feed socket is shut down")]
    SocketGone,

    // ── Lookup endpoint ─────────────────────────────────────────────
    /// Structured error from the lookup endpoint.
    #[error("Lookup error (HTTP {status}): {message}")]
    Lookup { message: String, status: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::SocketConnect(_) => true,
            _ => false,
        }
    }
}
