//! Reactive data layer between `waymark-api` and the TUI.
//!
//! This crate owns the business logic and domain model for the waymark
//! workspace:
//!
//! - **[`Tracker`]** — Central facade managing the full lifecycle:
//!   [`connect()`](Tracker::connect) loads the persisted registry,
//!   opens the feed socket, then spawns a background pump that folds
//!   feed events into the registry and the position channel.
//!
//! - **[`AccessoryRegistry`]** — Ordered, persistent accessory storage
//!   (`IndexMap` + `tokio::sync::watch` channels). Every mutation
//!   persists synchronously and republishes the snapshot, the render
//!   payloads, and a monotonic version counter.
//!
//! - **[`MarkerManager`]** — Synchronous map presentation state: the
//!   selection lifecycle (`Idle → Selecting → Zoomed`), the one-shot
//!   camera latch, history day ranges, and marker-set derivation.
//!
//! - **[`reconcile`]** — Pure merge of feed records into accessory
//!   state, including the DMS + clock location formatting.
//!
//! - **Domain model** ([`model`]) — Canonical types (`Accessory`,
//!   `DeviceId`, `GeoPoint`, `IconKey`, etc.) shared across the
//!   workspace.

pub mod error;
pub mod feed;
pub mod marker;
pub mod model;
pub mod persist;
pub mod reconcile;
pub mod registry;
pub mod tracker;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use marker::{
    Bounds, CameraAction, CustomMarker, FetchPlan, MarkerManager, MarkerSet, SelectionPhase,
    DEFAULT_CENTER, DEFAULT_ZOOM, FOCUS_ZOOM, ICON_ZOOM, MAX_DAY_RANGE,
};
pub use persist::{JsonFileStore, MemoryStore, RegistryStore};
pub use registry::AccessoryRegistry;
pub use tracker::{AddStatus, Tracker, TrackerConfig};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Accessory, AccessoryStatus, DeviceId, GeoPoint, IconKey, LocationAndStatus, MarkerPosition,
    RenderPayload, COLOR_PALETTE, DEFAULT_NAME, NO_LOCATION,
};

// Re-export the channel state so UI crates need not depend on
// `waymark-api` directly for connectivity display.
pub use waymark_api::socket::ChannelState;
