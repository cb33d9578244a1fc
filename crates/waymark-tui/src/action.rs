//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use waymark_core::{Accessory, AddStatus, CameraAction, DeviceId, MarkerPosition};

/// Notification severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A toast notification, shown for a couple of seconds.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }
}

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Data events (from the tracker) ─────────────────────────────
    AccessoriesUpdated(Arc<Vec<Accessory>>),
    PositionsUpdated(Arc<Vec<MarkerPosition>>),
    Camera(CameraAction),

    // ── Connection status ──────────────────────────────────────────
    Connected,
    Disconnected,
    Reconnecting,

    // ── Selection ──────────────────────────────────────────────────
    /// Commit the cursor row as the active selection.
    Activate,
    /// Clear the active selection.
    Deselect,

    // ── Accessory commands ─────────────────────────────────────────
    OpenAddDialog,
    SubmitAdd(String),
    /// Lookup finished for an add attempt.
    AddResolved(AddStatus),
    OpenRename(DeviceId),
    SubmitRename(DeviceId, String),
    DeleteSelected,
    CopyId,
    CopyCoordinates,
    CycleColor,
    CycleIcon,

    // ── Map controls ───────────────────────────────────────────────
    DayRangeUp,
    DayRangeDown,
    ToggleSatellite,
    Refresh,

    // ── Overlays ───────────────────────────────────────────────────
    CloseOverlay,
    ToggleHelp,

    // ── Notifications ──────────────────────────────────────────────
    Notify(Notification),
}
