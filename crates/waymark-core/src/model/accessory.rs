// ── Accessory domain types ──
//
// DeviceId and Accessory form the foundation of the registry. Ids are
// opaque external keys assigned by the tracker hardware; the dashboard
// never interprets them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::icon::{IconKey, default_color};

/// Sentinel shown when a device has no known position.
pub const NO_LOCATION: &str = "No location found";

/// Fallback display name for freshly added (or blank-renamed) accessories.
pub const DEFAULT_NAME: &str = "New Accessory";

// ── DeviceId ────────────────────────────────────────────────────────

/// Stable external key identifying one tracked device.
///
/// Surrounding whitespace is trimmed on construction; beyond that the
/// string is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ── AccessoryStatus ─────────────────────────────────────────────────

/// Reachability of a tracked device, derived server-side from the age
/// of its last fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessoryStatus {
    #[default]
    Offline,
    Pending,
    Online,
}

impl AccessoryStatus {
    /// Parse the raw feed string. Anything unrecognized is `Offline`.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "online" => Self::Online,
            "pending" => Self::Pending,
            _ => Self::Offline,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

// ── Accessory ───────────────────────────────────────────────────────

/// One tracked device as the user sees it in the sidebar.
///
/// `location` holds the pre-formatted coordinate + time string (or the
/// [`NO_LOCATION`] sentinel) — formatting happens once, at
/// reconciliation time, not at render time. Persisted across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accessory {
    pub id: DeviceId,
    pub name: String,
    pub location: String,
    pub icon: IconKey,
    /// CSS color (named or `#rrggbb`) for the custom marker ring.
    pub color: String,
    pub status: AccessoryStatus,
}

impl Accessory {
    /// A fresh accessory with default display metadata. The color is
    /// picked deterministically from the id so re-adding a deleted
    /// device looks the same.
    pub fn new(id: DeviceId) -> Self {
        let color = default_color(id.as_str()).to_owned();
        Self {
            id,
            name: DEFAULT_NAME.to_owned(),
            location: NO_LOCATION.to_owned(),
            icon: IconKey::Pin,
            color,
            status: AccessoryStatus::Offline,
        }
    }

    pub fn has_location(&self) -> bool {
        self.location != NO_LOCATION
    }
}
