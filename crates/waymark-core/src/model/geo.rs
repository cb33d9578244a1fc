// ── Geospatial value types ──

use serde::{Deserialize, Serialize};

use super::accessory::DeviceId;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// One normalized feed record: the latest known fix and status for a
/// device. Transient — produced per feed event, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationAndStatus {
    pub id: DeviceId,
    /// Absent when the feed had no fix for this device.
    pub location: Option<GeoPoint>,
    /// Raw status string as sent by the backend.
    pub status: String,
    /// ISO-ish local timestamp of the fix.
    pub timestamp: String,
}

/// A plottable marker position, derived from feed records that carry a
/// fix. Drives marker placement only.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPosition {
    pub id: DeviceId,
    pub lat: f64,
    pub lng: f64,
}

impl MarkerPosition {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// The minimal (color, icon) pair needed to draw one custom marker.
/// A pure projection of an [`Accessory`](super::Accessory) — recomputed
/// on every registry change, never mutated independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPayload {
    pub id: DeviceId,
    pub color: String,
    /// Serialized vector markup of the accessory's icon.
    pub icon_svg: String,
}
