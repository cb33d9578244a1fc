//! Canonical domain types for the waymark dashboard.

pub mod accessory;
pub mod geo;
pub mod icon;

pub use accessory::{Accessory, AccessoryStatus, DEFAULT_NAME, DeviceId, NO_LOCATION};
pub use geo::{GeoPoint, LocationAndStatus, MarkerPosition, RenderPayload};
pub use icon::{COLOR_PALETTE, IconKey, default_color};
