//! Map presentation state: selection, camera, marker sets, day range.
//!
//! All synchronous and side-effect free. The manager owns an explicit
//! selection state machine (Idle → Selecting → Zoomed) instead of
//! inferring intent from a pile of booleans: the camera moves exactly
//! once per selection, when the first positions for that selection
//! arrive, and then stays put until the user changes something.

use crate::model::{DeviceId, GeoPoint, MarkerPosition, RenderPayload};

// ── Map constants ───────────────────────────────────────────────────

/// Zoom level at or above which custom (icon + color) markers replace
/// plain pins.
pub const ICON_ZOOM: u8 = 20;

/// Default camera zoom at startup and on reset.
pub const DEFAULT_ZOOM: u8 = 16;

/// Zoom applied when the camera focuses a selected device.
pub const FOCUS_ZOOM: u8 = ICON_ZOOM;

/// Default map center at startup and on reset.
pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
    lat: 40.954_991_020_715_86,
    lng: -76.885_047_838_413_14,
};

/// History fetches cover at most this many days back.
pub const MAX_DAY_RANGE: u8 = 5;

// ── Selection state machine ─────────────────────────────────────────

/// Where the camera is in the selection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPhase {
    /// Nothing selected.
    #[default]
    Idle,
    /// A device was just selected; the camera will focus it as soon as
    /// a position for it arrives.
    Selecting,
    /// The camera has focused the selection once. It will not move
    /// again for this selection, whatever the feed sends.
    Zoomed,
}

// ── Camera directives ───────────────────────────────────────────────

/// Axis-aligned bounding box for camera focus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl Bounds {
    /// Degenerate box around a single point.
    pub fn around(point: GeoPoint) -> Self {
        Self {
            south_west: point,
            north_east: point,
        }
    }
}

/// What the map view should do with the camera after an update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CameraAction {
    /// Leave the camera where the user put it.
    #[default]
    None,
    /// Fit the given bounds and zoom to the focus level.
    FocusSelection { bounds: Bounds, zoom: u8 },
    /// Return to the configured home view.
    ResetToDefault { center: GeoPoint, zoom: u8 },
}

// ── Marker sets ─────────────────────────────────────────────────────

/// One fully-styled marker ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomMarker {
    pub position: MarkerPosition,
    pub color: String,
    pub icon_svg: String,
}

/// The complete set of markers to show, in one of two mutually
/// exclusive modes. Switching modes replaces the whole set.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerSet {
    /// Plain pins tracing a device's history trail.
    HistoryPins(Vec<MarkerPosition>),
    /// Styled per-device markers for the latest snapshot.
    Custom(Vec<CustomMarker>),
}

impl MarkerSet {
    pub fn len(&self) -> usize {
        match self {
            Self::HistoryPins(pins) => pins.len(),
            Self::Custom(markers) => markers.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Fetch planning ──────────────────────────────────────────────────

/// The next feed request implied by the current view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// Latest snapshot; `None` means all devices.
    Latest { device_id: Option<DeviceId> },
    /// History trail for one device. `days` is always `1..=MAX_DAY_RANGE`.
    History { device_id: DeviceId, days: u8 },
}

// ── MarkerManager ───────────────────────────────────────────────────

/// Presentation state for the map pane.
#[derive(Debug, Clone)]
pub struct MarkerManager {
    selection: Option<DeviceId>,
    phase: SelectionPhase,
    day_range: u8,
    history_mode: bool,
    satellite: bool,
    reset_camera_on_deselect: bool,
}

impl MarkerManager {
    pub fn new(reset_camera_on_deselect: bool) -> Self {
        Self {
            selection: None,
            phase: SelectionPhase::Idle,
            day_range: 0,
            history_mode: false,
            satellite: false,
            reset_camera_on_deselect,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn selection(&self) -> Option<&DeviceId> {
        self.selection.as_ref()
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn day_range(&self) -> u8 {
        self.day_range
    }

    pub fn history_mode(&self) -> bool {
        self.history_mode
    }

    pub fn satellite(&self) -> bool {
        self.satellite
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Select a device. Re-selecting the current device is a no-op;
    /// switching devices re-arms the camera and resets the day range.
    pub fn select(&mut self, id: DeviceId) {
        if self.selection.as_ref() == Some(&id) {
            return;
        }
        self.selection = Some(id);
        self.phase = SelectionPhase::Selecting;
        self.day_range = 0;
        self.history_mode = false;
    }

    /// Clear the selection. The camera resets to the home view only
    /// when configured to; by default it stays where it is.
    pub fn deselect(&mut self) -> CameraAction {
        self.selection = None;
        self.phase = SelectionPhase::Idle;
        self.day_range = 0;
        self.history_mode = false;

        if self.reset_camera_on_deselect {
            CameraAction::ResetToDefault {
                center: DEFAULT_CENTER,
                zoom: DEFAULT_ZOOM,
            }
        } else {
            CameraAction::None
        }
    }

    /// Set the history day range, clamped to `0..=MAX_DAY_RANGE`.
    /// Zero means "latest only" — history mode disengages.
    pub fn set_day_range(&mut self, days: u8) {
        self.day_range = days.min(MAX_DAY_RANGE);
        if self.day_range == 0 {
            self.history_mode = false;
        } else if self.selection.is_some() {
            self.history_mode = true;
        }
    }

    pub fn toggle_satellite(&mut self) {
        self.satellite = !self.satellite;
    }

    // ── Derivations ─────────────────────────────────────────────────

    /// Decide the camera move for a batch of freshly arrived positions.
    ///
    /// Focuses at most once per selection: only in the `Selecting`
    /// phase, only when the batch actually contains the selected
    /// device, and never while viewing history. Advances the phase to
    /// `Zoomed` when it fires.
    pub fn camera_action(&mut self, positions: &[MarkerPosition]) -> CameraAction {
        if self.phase != SelectionPhase::Selecting || self.history_mode {
            return CameraAction::None;
        }
        let Some(selected) = self.selection.as_ref() else {
            return CameraAction::None;
        };
        let Some(position) = positions.iter().find(|p| &p.id == selected) else {
            return CameraAction::None;
        };

        self.phase = SelectionPhase::Zoomed;
        CameraAction::FocusSelection {
            bounds: Bounds::around(position.point()),
            zoom: FOCUS_ZOOM,
        }
    }

    /// Build the marker set for the current mode.
    ///
    /// History pins require an active selection with a nonzero day
    /// range; in every other state the latest positions are styled
    /// through their render payloads. Positions without a payload
    /// (device deleted between fetch and render) are dropped.
    pub fn marker_set(
        &self,
        positions: &[MarkerPosition],
        payloads: &[RenderPayload],
    ) -> MarkerSet {
        if self.history_mode && self.day_range >= 1 && self.selection.is_some() {
            return MarkerSet::HistoryPins(positions.to_vec());
        }

        let markers = positions
            .iter()
            .filter_map(|position| {
                payloads
                    .iter()
                    .find(|p| p.id == position.id)
                    .map(|payload| CustomMarker {
                        position: position.clone(),
                        color: payload.color.clone(),
                        icon_svg: payload.icon_svg.clone(),
                    })
            })
            .collect();
        MarkerSet::Custom(markers)
    }

    /// The feed request the current view state calls for. A zero day
    /// range is always a latest fetch, never a zero-day history fetch.
    pub fn next_fetch(&self) -> FetchPlan {
        match (&self.selection, self.day_range) {
            (Some(id), days) if days >= 1 => FetchPlan::History {
                device_id: id.clone(),
                days,
            },
            (selection, _) => FetchPlan::Latest {
                device_id: selection.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn position(id: &str, lat: f64, lng: f64) -> MarkerPosition {
        MarkerPosition {
            id: DeviceId::new(id),
            lat,
            lng,
        }
    }

    fn payload(id: &str, color: &str) -> RenderPayload {
        RenderPayload {
            id: DeviceId::new(id),
            color: color.to_owned(),
            icon_svg: "<svg/>".to_owned(),
        }
    }

    #[test]
    fn camera_focuses_exactly_once_per_selection() {
        let mut mgr = MarkerManager::new(false);
        mgr.select(DeviceId::new("pico-7"));

        let positions = vec![position("pico-7", 40.955, -76.885)];
        let first = mgr.camera_action(&positions);
        assert!(matches!(first, CameraAction::FocusSelection { zoom, .. } if zoom == FOCUS_ZOOM));
        assert_eq!(mgr.phase(), SelectionPhase::Zoomed);

        // Later batches for the same selection leave the camera alone.
        assert_eq!(mgr.camera_action(&positions), CameraAction::None);
    }

    #[test]
    fn camera_waits_for_the_selected_device() {
        let mut mgr = MarkerManager::new(false);
        mgr.select(DeviceId::new("pico-7"));

        let others = vec![position("pico-9", 41.0, -77.0)];
        assert_eq!(mgr.camera_action(&others), CameraAction::None);
        assert_eq!(mgr.phase(), SelectionPhase::Selecting);
    }

    #[test]
    fn reselecting_another_device_rearms_the_camera() {
        let mut mgr = MarkerManager::new(false);
        mgr.select(DeviceId::new("a"));
        mgr.camera_action(&[position("a", 40.0, -76.0)]);
        assert_eq!(mgr.phase(), SelectionPhase::Zoomed);

        mgr.select(DeviceId::new("b"));
        assert_eq!(mgr.phase(), SelectionPhase::Selecting);
        let action = mgr.camera_action(&[position("b", 41.0, -77.0)]);
        assert!(matches!(action, CameraAction::FocusSelection { .. }));
    }

    #[test]
    fn deselect_leaves_camera_alone_by_default() {
        let mut mgr = MarkerManager::new(false);
        mgr.select(DeviceId::new("pico-7"));
        assert_eq!(mgr.deselect(), CameraAction::None);
        assert_eq!(mgr.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn deselect_resets_camera_when_configured() {
        let mut mgr = MarkerManager::new(true);
        mgr.select(DeviceId::new("pico-7"));
        let action = mgr.deselect();
        assert_eq!(
            action,
            CameraAction::ResetToDefault {
                center: DEFAULT_CENTER,
                zoom: DEFAULT_ZOOM,
            }
        );
    }

    #[test]
    fn day_range_clamps_and_gates_history_mode() {
        let mut mgr = MarkerManager::new(false);
        mgr.select(DeviceId::new("pico-7"));

        mgr.set_day_range(9);
        assert_eq!(mgr.day_range(), MAX_DAY_RANGE);
        assert!(mgr.history_mode());

        mgr.set_day_range(0);
        assert!(!mgr.history_mode());
    }

    #[test]
    fn day_range_without_selection_never_enters_history() {
        let mut mgr = MarkerManager::new(false);
        mgr.set_day_range(3);
        assert!(!mgr.history_mode());
        assert_eq!(mgr.next_fetch(), FetchPlan::Latest { device_id: None });
    }

    #[test]
    fn zero_day_range_plans_a_latest_fetch() {
        let mut mgr = MarkerManager::new(false);
        mgr.select(DeviceId::new("pico-7"));
        assert_eq!(
            mgr.next_fetch(),
            FetchPlan::Latest {
                device_id: Some(DeviceId::new("pico-7"))
            }
        );

        mgr.set_day_range(3);
        assert_eq!(
            mgr.next_fetch(),
            FetchPlan::History {
                device_id: DeviceId::new("pico-7"),
                days: 3,
            }
        );
    }

    #[test]
    fn history_mode_yields_plain_pins() {
        let mut mgr = MarkerManager::new(false);
        mgr.select(DeviceId::new("pico-7"));
        mgr.set_day_range(2);

        let positions = vec![
            position("pico-7", 40.0, -76.0),
            position("pico-7", 40.1, -76.1),
        ];
        let set = mgr.marker_set(&positions, &[payload("pico-7", "red")]);
        assert_eq!(set, MarkerSet::HistoryPins(positions));
    }

    #[test]
    fn latest_mode_styles_markers_from_payloads() {
        let mgr = MarkerManager::new(false);
        let positions = vec![position("a", 40.0, -76.0), position("b", 41.0, -77.0)];
        let payloads = vec![payload("a", "red"), payload("b", "blue")];

        let MarkerSet::Custom(markers) = mgr.marker_set(&positions, &payloads) else {
            panic!("expected custom markers");
        };
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].color, "red");
        assert_eq!(markers[1].color, "blue");
    }

    #[test]
    fn positions_without_payloads_are_dropped() {
        let mgr = MarkerManager::new(false);
        let positions = vec![position("a", 40.0, -76.0), position("ghost", 41.0, -77.0)];
        let payloads = vec![payload("a", "red")];

        let set = mgr.marker_set(&positions, &payloads);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn selection_resets_day_range() {
        let mut mgr = MarkerManager::new(false);
        mgr.select(DeviceId::new("a"));
        mgr.set_day_range(4);

        mgr.select(DeviceId::new("b"));
        assert_eq!(mgr.day_range(), 0);
        assert!(!mgr.history_mode());
    }
}
