//! Realtime feed socket with auto-reconnect.
//!
//! Connects to the backend's event socket and streams parsed
//! [`FeedEvent`]s through a [`tokio::sync::broadcast`] channel while
//! accepting outbound [`FeedRequest`]s over an mpsc channel. Handles
//! reconnection with exponential backoff + jitter automatically and
//! publishes connection transitions on a `watch` channel so consumers
//! can await readiness instead of polling.
//!
//! # Example
//!
//! ```rust,ignore
//! use waymark_api::socket::{SocketHandle, ReconnectConfig};
//! use waymark_api::wire::FeedRequest;
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let ws_url = Url::parse("ws://localhost:5000/feed")?;
//!
//! let handle = SocketHandle::connect(ws_url, ReconnectConfig::default(), cancel.clone());
//! handle.ready().await?;
//! handle.send(FeedRequest::Latest { device_id: None })?;
//!
//! let mut rx = handle.subscribe();
//! while let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::wire::{FeedEvent, FeedRequest, parse_frame};

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── ChannelState ─────────────────────────────────────────────────────

/// Observable connection state of the feed socket.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connected,
    Reconnecting {
        attempt: u32,
    },
}

impl ChannelState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for socket reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 5s — the backend is
    /// expected on the local network, long waits just feel broken.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            max_retries: None,
        }
    }
}

// ── SocketHandle ─────────────────────────────────────────────────────

/// Handle to a running feed socket.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`connect`](Self::connect)) to tear down the background task.
pub struct SocketHandle {
    event_rx: broadcast::Receiver<Arc<FeedEvent>>,
    request_tx: mpsc::UnboundedSender<FeedRequest>,
    state_rx: watch::Receiver<ChannelState>,
    cancel: CancellationToken,
}

impl SocketHandle {
    /// Spawn the reconnection loop and return immediately.
    ///
    /// The first connection attempt happens asynchronously — await
    /// [`ready`](Self::ready) before issuing the initial fetch.
    pub fn connect(ws_url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            socket_loop(
                ws_url, event_tx, request_rx, state_tx, reconnect, task_cancel,
            )
            .await;
        });

        Self {
            event_rx,
            request_tx,
            state_rx,
            cancel,
        }
    }

    /// Get a new broadcast receiver for the inbound event stream.
    ///
    /// Multiple consumers can subscribe concurrently. A consumer that
    /// falls behind receives [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<FeedEvent>> {
        self.event_rx.resubscribe()
    }

    /// Watch connection-state transitions.
    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Wait until the socket reports [`ChannelState::Connected`].
    ///
    /// This replaces the readiness polling of older clients: one
    /// await, resolved the instant the connection is up.
    pub async fn ready(&self) -> Result<(), Error> {
        let mut state = self.state_rx.clone();
        state
            .wait_for(ChannelState::is_connected)
            .await
            .map_err(|_| Error::SocketGone)?;
        Ok(())
    }

    /// Queue an outbound request. Requests issued while disconnected
    /// are flushed in order once the socket reconnects.
    pub fn send(&self, request: FeedRequest) -> Result<(), Error> {
        self.request_tx
            .send(request)
            .map_err(|_| Error::SocketGone)
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → run → on error, backoff → reconnect.
async fn socket_loop(
    ws_url: Url,
    event_tx: broadcast::Sender<Arc<FeedEvent>>,
    mut request_rx: mpsc::UnboundedReceiver<FeedRequest>,
    state_tx: watch::Sender<ChannelState>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = run_connection(&ws_url, &event_tx, &mut request_rx, &state_tx, &cancel) => {
                let _ = state_tx.send(ChannelState::Disconnected);
                match result {
                    // Clean disconnect (server close frame or stream ended).
                    // Reset the attempt counter and reconnect immediately.
                    Ok(()) => {
                        tracing::info!("feed socket disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "feed socket error");

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "feed socket reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        let _ = state_tx.send(ChannelState::Reconnecting { attempt });
                        tracing::info!(
                            delay_ms = delay.as_millis() as u64,
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }

                        attempt += 1;
                    }
                }
            }
        }
    }

    let _ = state_tx.send(ChannelState::Disconnected);
    tracing::debug!("feed socket loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one socket connection and pump frames both ways until it
/// drops.
async fn run_connection(
    url: &Url,
    event_tx: &broadcast::Sender<Arc<FeedEvent>>,
    request_rx: &mut mpsc::UnboundedReceiver<FeedRequest>,
    state_tx: &watch::Sender<ChannelState>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to feed socket");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::SocketConnect(e.to_string()))?;

    tracing::info!("feed socket connected");
    let _ = state_tx.send(ChannelState::Connected);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),

            Some(request) = request_rx.recv() => {
                tracing::debug!(event = request.event_name(), "sending feed request");
                write
                    .send(tungstenite::Message::text(request.to_frame()))
                    .await
                    .map_err(|e| Error::SocketConnect(e.to_string()))?;
            }

            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        if let Some(event) = parse_frame(&text) {
                            // Send errors just mean no subscribers right now.
                            let _ = event_tx.send(Arc::new(event));
                        }
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite replies with pong automatically
                        tracing::trace!("feed socket ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "feed socket close frame received"
                            );
                        } else {
                            tracing::info!("feed socket close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::SocketConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!("feed socket stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame — ignore
                    }
                }
            }
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(attempt as i32);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    // Not cryptographically random, but good enough for backoff spread.
    let jitter_factor = 1.0 + 0.25 * ((attempt as f64 * 7.3).sin());
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(5));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(30),
            ..ReconnectConfig::default()
        };

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        // Each step should roughly double (within jitter bounds)
        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn channel_state_connected_predicate() {
        assert!(ChannelState::Connected.is_connected());
        assert!(!ChannelState::Disconnected.is_connected());
        assert!(!ChannelState::Reconnecting { attempt: 3 }.is_connected());
    }
}
