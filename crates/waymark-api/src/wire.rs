//! Wire types for the realtime feed channel.
//!
//! The channel speaks one-line JSON envelopes in both directions:
//! `{"event": "<name>", "data": <payload>}`. Inbound data payloads are
//! either an array of [`GeoSample`]s or an error marker object
//! (`{"error": ...}`) — the backend reports "no rows" and database
//! failures the same way, so the marker carries no machine-readable code.

use serde::{Deserialize, Serialize};

// ── Inbound samples ──────────────────────────────────────────────────

/// One per-device row from a `latest_data_response` or
/// `history_data_response` payload.
///
/// `status` and `timestamp` are present on latest responses only;
/// history rows carry coordinates (and elevation) alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    /// Stable external device key.
    pub device_id: String,

    pub latitude: f64,
    pub longitude: f64,

    /// Meters above sea level, when the fix had one.
    #[serde(default)]
    pub elevation: Option<f64>,

    /// ISO-ish local timestamp (`YYYY-MM-DDTHH:MM:SS`).
    #[serde(default)]
    pub timestamp: Option<String>,

    /// Raw status string: `online`, `pending`, or `offline`.
    #[serde(default)]
    pub status: Option<String>,
}

/// A feed payload: either device rows or an error marker.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedPayload {
    Samples(Vec<GeoSample>),
    /// The backend signalled `{"error": ...}`. Downstream treats this
    /// as "no data", never as a user-facing failure.
    Error(String),
}

impl FeedPayload {
    /// Parse a `data` value that is either an array or an error object.
    pub fn from_value(data: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if let Some(obj) = data.as_object() {
            if let Some(err) = obj.get("error") {
                let message = err
                    .as_str()
                    .map_or_else(|| err.to_string(), ToOwned::to_owned);
                return Ok(Self::Error(message));
            }
        }
        let samples: Vec<GeoSample> = serde_json::from_value(data.clone())?;
        Ok(Self::Samples(samples))
    }
}

// ── Inbound events ───────────────────────────────────────────────────

/// A parsed inbound event from the feed socket.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// `latest_data_response` — current snapshot, one row per device.
    Latest(FeedPayload),
    /// `history_data_response` — position samples over a day range.
    History(FeedPayload),
    /// `server_status` — informational only, never stored.
    ServerStatus(String),
}

// ── Outbound requests ────────────────────────────────────────────────

/// An outbound fetch request on the feed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedRequest {
    /// `get_latest_data` — one device, or all when `device_id` is `None`.
    Latest { device_id: Option<String> },
    /// `get_history_data` — samples for one device over `days` days.
    /// Callers guarantee `days >= 1`; a zero-day request is a latest
    /// fetch and must never reach the wire as history.
    History { device_id: String, days: u8 },
}

impl FeedRequest {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Latest { .. } => "get_latest_data",
            Self::History { .. } => "get_history_data",
        }
    }

    /// Serialize to the one-line JSON frame sent over the socket.
    pub fn to_frame(&self) -> String {
        let data = match self {
            Self::Latest { device_id: Some(id) } => serde_json::json!({ "device_id": id }),
            Self::Latest { device_id: None } => serde_json::json!({ "all": true }),
            Self::History { device_id, days } => {
                serde_json::json!({ "days": days, "device_id": device_id })
            }
        };
        serde_json::json!({ "event": self.event_name(), "data": data }).to_string()
    }
}

// ── Inbound envelope ─────────────────────────────────────────────────

/// Raw envelope shape for inbound frames.
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parse one inbound text frame into a [`FeedEvent`].
///
/// Returns `None` for frames that are not valid envelopes or carry an
/// event name we do not consume — the feed is shared and unknown
/// events are expected, not errors.
pub fn parse_frame(text: &str) -> Option<FeedEvent> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable feed frame");
            return None;
        }
    };

    match envelope.event.as_str() {
        "latest_data_response" => payload_event(&envelope.data, FeedEvent::Latest),
        "history_data_response" => payload_event(&envelope.data, FeedEvent::History),
        "server_status" => {
            let message = envelope.data["message"].as_str().unwrap_or("").to_owned();
            Some(FeedEvent::ServerStatus(message))
        }
        other => {
            tracing::trace!(event = other, "ignoring feed event");
            None
        }
    }
}

fn payload_event(
    data: &serde_json::Value,
    wrap: impl FnOnce(FeedPayload) -> FeedEvent,
) -> Option<FeedEvent> {
    match FeedPayload::from_value(data) {
        Ok(payload) => Some(wrap(payload)),
        Err(e) => {
            tracing::debug!(error = %e, "malformed feed payload");
            None
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn latest_request_for_one_device() {
        let req = FeedRequest::Latest {
            device_id: Some("pico-7".into()),
        };
        let frame: serde_json::Value = serde_json::from_str(&req.to_frame()).unwrap();
        assert_eq!(frame["event"], "get_latest_data");
        assert_eq!(frame["data"]["device_id"], "pico-7");
    }

    #[test]
    fn latest_request_for_all_devices() {
        let req = FeedRequest::Latest { device_id: None };
        let frame: serde_json::Value = serde_json::from_str(&req.to_frame()).unwrap();
        assert_eq!(frame["data"]["all"], true);
    }

    #[test]
    fn history_request_carries_days_and_device() {
        let req = FeedRequest::History {
            device_id: "pico-7".into(),
            days: 3,
        };
        let frame: serde_json::Value = serde_json::from_str(&req.to_frame()).unwrap();
        assert_eq!(frame["event"], "get_history_data");
        assert_eq!(frame["data"]["days"], 3);
        assert_eq!(frame["data"]["device_id"], "pico-7");
    }

    #[test]
    fn parse_latest_response_with_samples() {
        let text = serde_json::json!({
            "event": "latest_data_response",
            "data": [{
                "device_id": "pico-7",
                "latitude": 40.955,
                "longitude": -76.885,
                "elevation": 152.4,
                "timestamp": "2026-02-10T12:00:00",
                "status": "online"
            }]
        })
        .to_string();

        let Some(FeedEvent::Latest(FeedPayload::Samples(samples))) = parse_frame(&text) else {
            panic!("expected latest samples");
        };
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].device_id, "pico-7");
        assert_eq!(samples[0].status.as_deref(), Some("online"));
    }

    #[test]
    fn parse_history_response_without_status() {
        let text = serde_json::json!({
            "event": "history_data_response",
            "data": [
                { "device_id": "pico-7", "latitude": 40.0, "longitude": -76.0 },
                { "device_id": "pico-7", "latitude": 40.1, "longitude": -76.1 }
            ]
        })
        .to_string();

        let Some(FeedEvent::History(FeedPayload::Samples(samples))) = parse_frame(&text) else {
            panic!("expected history samples");
        };
        assert_eq!(samples.len(), 2);
        assert!(samples[0].status.is_none());
        assert!(samples[0].timestamp.is_none());
    }

    #[test]
    fn parse_error_marker() {
        let text = serde_json::json!({
            "event": "latest_data_response",
            "data": { "error": "No data found" }
        })
        .to_string();

        let Some(FeedEvent::Latest(FeedPayload::Error(message))) = parse_frame(&text) else {
            panic!("expected error marker");
        };
        assert_eq!(message, "No data found");
    }

    #[test]
    fn parse_boolean_error_marker() {
        // Some backends send `{"error": true}` with no message.
        let text = r#"{"event": "history_data_response", "data": {"error": true}}"#;
        let Some(FeedEvent::History(FeedPayload::Error(message))) = parse_frame(text) else {
            panic!("expected error marker");
        };
        assert_eq!(message, "true");
    }

    #[test]
    fn parse_server_status() {
        let text = r#"{"event": "server_status", "data": {"message": "Server is running."}}"#;
        assert_eq!(
            parse_frame(text),
            Some(FeedEvent::ServerStatus("Server is running.".into()))
        );
    }

    #[test]
    fn parse_unknown_event_is_none() {
        assert_eq!(parse_frame(r#"{"event": "ping", "data": {}}"#), None);
    }

    #[test]
    fn parse_malformed_frame_is_none() {
        assert_eq!(parse_frame("not json at all"), None);
    }
}
