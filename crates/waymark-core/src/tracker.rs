//! The tracker facade: one handle tying the feed, the registry, and
//! the map state together.
//!
//! [`Tracker`] is a cheap clone (an `Arc` around the shared state).
//! A background task consumes feed events and drives the registry and
//! position channel; the UI reads through `watch` receivers and calls
//! the command methods below. Nothing here blocks on the network except
//! [`Tracker::add_accessory`], which performs one explicit lookup.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

use waymark_api::socket::{ChannelState, ReconnectConfig, SocketHandle};
use waymark_api::wire::{FeedEvent, FeedRequest};
use waymark_api::LookupClient;

use crate::error::CoreError;
use crate::feed;
use crate::marker::{CameraAction, FetchPlan, MarkerManager, MarkerSet};
use crate::model::{Accessory, DeviceId, IconKey, MarkerPosition, NO_LOCATION};
use crate::persist::RegistryStore;
use crate::registry::AccessoryRegistry;

// ── Configuration ───────────────────────────────────────────────────

/// Runtime configuration for a [`Tracker`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// WebSocket URL of the realtime feed.
    pub feed_url: Url,
    /// Base URL of the backend HTTP API.
    pub api_url: Url,
    /// Timeout for lookup requests.
    pub request_timeout: Duration,
    pub reconnect: ReconnectConfig,
    /// Whether deselecting a device snaps the camera back home.
    pub reset_camera_on_deselect: bool,
    /// Quiet period before a day-range change triggers a fetch, so
    /// holding the key repeat does not fire one request per step.
    pub day_range_debounce: Duration,
}

impl TrackerConfig {
    pub fn new(feed_url: Url, api_url: Url) -> Self {
        Self {
            feed_url,
            api_url,
            request_timeout: Duration::from_secs(5),
            reconnect: ReconnectConfig::default(),
            reset_camera_on_deselect: false,
            day_range_debounce: Duration::from_millis(150),
        }
    }
}

// ── Add outcome ─────────────────────────────────────────────────────

/// Outcome of an add-accessory attempt, also the status line of the
/// add dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum AddStatus {
    /// Dialog open, nothing submitted yet.
    #[default]
    #[strum(serialize = "New")]
    New,
    #[strum(serialize = "Added")]
    Added,
    #[strum(serialize = "Already Displayed")]
    AlreadyDisplayed,
    /// The backend could not be reached to verify the device.
    #[strum(serialize = "Offline")]
    Offline,
    #[strum(serialize = "Not Found")]
    NotFound,
}

// ── Tracker ─────────────────────────────────────────────────────────

struct TrackerInner {
    config: TrackerConfig,
    registry: AccessoryRegistry,
    lookup: LookupClient,
    markers: Mutex<MarkerManager>,
    socket: SocketHandle,
    positions: watch::Sender<Arc<Vec<MarkerPosition>>>,
    camera: watch::Sender<CameraAction>,
    cancel: CancellationToken,
    /// Generation counter for day-range debouncing: only the newest
    /// pending change dispatches a fetch.
    debounce_generation: AtomicU64,
    /// Running count of feed requests sent this session.
    fetches: AtomicU64,
}

/// Shared handle to the running tracker session.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

impl Tracker {
    /// Start a tracker session: load the registry, open the feed
    /// socket, and spawn the event pump. Returns immediately; the
    /// initial all-devices fetch fires as soon as the socket is up.
    pub fn connect(config: TrackerConfig, store: Box<dyn RegistryStore>) -> Result<Self, CoreError> {
        let lookup = LookupClient::new(config.api_url.clone(), config.request_timeout)
            .map_err(|e| CoreError::Config {
                message: e.to_string(),
            })?;

        let registry = AccessoryRegistry::load(store);
        let cancel = CancellationToken::new();
        let socket = SocketHandle::connect(
            config.feed_url.clone(),
            config.reconnect.clone(),
            cancel.child_token(),
        );

        let (positions, _) = watch::channel(Arc::new(Vec::new()));
        let (camera, _) = watch::channel(CameraAction::None);
        let markers = Mutex::new(MarkerManager::new(config.reset_camera_on_deselect));

        let inner = Arc::new(TrackerInner {
            config,
            registry,
            lookup,
            markers,
            socket,
            positions,
            camera,
            cancel,
            debounce_generation: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        });

        tokio::spawn(event_pump(inner.clone()));
        tokio::spawn(initial_fetch(inner.clone()));

        Ok(Self { inner })
    }

    // ── Observation ─────────────────────────────────────────────────

    pub fn accessories(&self) -> Arc<Vec<Accessory>> {
        self.inner.registry.snapshot()
    }

    pub fn watch_accessories(&self) -> watch::Receiver<Arc<Vec<Accessory>>> {
        self.inner.registry.watch_snapshot()
    }

    pub fn watch_positions(&self) -> watch::Receiver<Arc<Vec<MarkerPosition>>> {
        self.inner.positions.subscribe()
    }

    /// Camera directives, published at most once per selection.
    pub fn watch_camera(&self) -> watch::Receiver<CameraAction> {
        self.inner.camera.subscribe()
    }

    pub fn channel_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.socket.state()
    }

    /// Markers to draw right now, styled per the current view mode.
    pub fn marker_set(&self) -> MarkerSet {
        let positions = self.inner.positions.borrow().clone();
        let payloads = self.inner.registry.payloads();
        self.inner.lock_markers().marker_set(&positions, &payloads)
    }

    pub fn selection(&self) -> Option<DeviceId> {
        self.inner.lock_markers().selection().cloned()
    }

    pub fn day_range(&self) -> u8 {
        self.inner.lock_markers().day_range()
    }

    pub fn history_mode(&self) -> bool {
        self.inner.lock_markers().history_mode()
    }

    pub fn satellite(&self) -> bool {
        self.inner.lock_markers().satellite()
    }

    /// How many feed requests this session has dispatched. Diagnostic
    /// counter; debounced day-range changes bump it once per window.
    pub fn dispatched_fetches(&self) -> u64 {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Select a device and fetch its latest fix.
    pub fn select(&self, id: DeviceId) {
        self.inner.lock_markers().select(id);
        self.inner.dispatch_fetch();
    }

    /// Clear the selection and go back to the all-devices view.
    pub fn deselect(&self) {
        let action = self.inner.lock_markers().deselect();
        if action != CameraAction::None {
            self.inner.camera.send_replace(action);
        }
        self.inner.dispatch_fetch();
    }

    /// Change the history day range. The view state updates at once;
    /// the fetch waits out the debounce window so rapid stepping
    /// through the range sends a single request.
    pub fn set_day_range(&self, days: u8) {
        self.inner.lock_markers().set_day_range(days);

        let generation = self
            .inner
            .debounce_generation
            .fetch_add(1, Ordering::SeqCst)
            + 1;
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.config.day_range_debounce).await;
            if inner.debounce_generation.load(Ordering::SeqCst) == generation {
                inner.dispatch_fetch();
            }
        });
    }

    pub fn toggle_satellite(&self) {
        self.inner.lock_markers().toggle_satellite();
    }

    /// Re-issue the fetch implied by the current view state.
    pub fn refresh(&self) {
        self.inner.dispatch_fetch();
    }

    /// Verify a device against the backend and, if it exists, admit it
    /// to the registry.
    pub async fn add_accessory(&self, raw_id: &str) -> AddStatus {
        let id = DeviceId::new(raw_id);
        if id.is_empty() {
            return AddStatus::NotFound;
        }
        if self.inner.registry.contains(&id) {
            return AddStatus::AlreadyDisplayed;
        }

        match self.inner.lookup.device_exists(id.as_str()).await {
            Ok(true) => match self.inner.registry.add(id) {
                Ok(true) => {
                    self.inner.dispatch_fetch();
                    AddStatus::Added
                }
                // Raced another add of the same id.
                Ok(false) => AddStatus::AlreadyDisplayed,
                Err(e) => {
                    tracing::warn!(error = %e, "accessory rejected");
                    AddStatus::NotFound
                }
            },
            Ok(false) => AddStatus::NotFound,
            Err(e) => {
                tracing::warn!(error = %e, "device lookup failed");
                AddStatus::Offline
            }
        }
    }

    pub fn rename(&self, id: &DeviceId, name: &str) -> Result<(), CoreError> {
        self.inner.registry.rename(id, name)
    }

    pub fn recolor(&self, id: &DeviceId, color: &str) -> Result<(), CoreError> {
        self.inner.registry.recolor(id, color)
    }

    pub fn set_icon(&self, id: &DeviceId, icon: IconKey) -> Result<(), CoreError> {
        self.inner.registry.set_icon(id, icon)
    }

    /// Delete an accessory; if it was selected, the view falls back to
    /// all devices.
    pub fn remove(&self, id: &DeviceId) -> Result<(), CoreError> {
        self.inner.registry.remove(id)?;
        let selected = self.inner.lock_markers().selection() == Some(id);
        if selected {
            self.deselect();
        } else {
            self.inner.dispatch_fetch();
        }
        Ok(())
    }

    /// Clipboard text for a device id.
    pub fn id_text(&self, id: &DeviceId) -> Result<String, CoreError> {
        if !self.inner.registry.contains(id) {
            return Err(CoreError::AccessoryNotFound { id: id.clone() });
        }
        Ok(id.to_string())
    }

    /// Clipboard text for a device's current coordinates, or a
    /// validation error when it has no fix on screen.
    pub fn coordinates_text(&self, id: &DeviceId) -> Result<String, CoreError> {
        if !self.inner.registry.contains(id) {
            return Err(CoreError::AccessoryNotFound { id: id.clone() });
        }
        let positions = self.inner.positions.borrow().clone();
        positions
            .iter()
            .find(|p| &p.id == id)
            .map(|p| coordinates_text(p.lat, p.lng))
            .ok_or_else(|| CoreError::ValidationFailed {
                message: NO_LOCATION.to_owned(),
            })
    }

    /// Tear down the socket and background tasks.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }
}

/// Decimal clipboard format for a coordinate pair.
pub fn coordinates_text(lat: f64, lng: f64) -> String {
    format!("Latitude: {lat:.2}, Longitude: {lng:.2}")
}

// ── Inner helpers ───────────────────────────────────────────────────

impl TrackerInner {
    fn lock_markers(&self) -> std::sync::MutexGuard<'_, MarkerManager> {
        self.markers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Send the feed request implied by the current view state.
    fn dispatch_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let plan = self.lock_markers().next_fetch();
        let request = match plan {
            FetchPlan::Latest { device_id } => FeedRequest::Latest {
                device_id: device_id.map(|id| id.to_string()),
            },
            FetchPlan::History { device_id, days } => FeedRequest::History {
                device_id: device_id.to_string(),
                days,
            },
        };

        if let Err(e) = self.socket.send(request) {
            tracing::warn!(error = %e, "feed request dropped");
        }
    }

    /// Publish new positions and whatever camera move they earn.
    fn publish_positions(&self, positions: Vec<MarkerPosition>) {
        let action = self.lock_markers().camera_action(&positions);
        self.positions.send_replace(Arc::new(positions));
        if action != CameraAction::None {
            self.camera.send_replace(action);
        }
    }
}

// ── Background tasks ────────────────────────────────────────────────

/// Wait for the socket, then request the first all-devices snapshot.
async fn initial_fetch(inner: Arc<TrackerInner>) {
    tokio::select! {
        _ = inner.cancel.cancelled() => {}
        result = inner.socket.ready() => {
            if result.is_ok() {
                inner.dispatch_fetch();
            }
        }
    }
}

/// Consume feed events until cancellation.
async fn event_pump(inner: Arc<TrackerInner>) {
    let mut events = inner.socket.subscribe();

    loop {
        let event = tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(event) => handle_event(&inner, &event),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                // Skipped snapshots are superseded by the next one.
                tracing::warn!(skipped, "feed consumer lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    tracing::debug!("tracker event pump exiting");
}

fn handle_event(inner: &TrackerInner, event: &FeedEvent) {
    match event {
        FeedEvent::Latest(payload) => match feed::latest_records(payload) {
            Some(records) => {
                inner.registry.apply_feed(Some(&records));
                if let Some(positions) = feed::positions(payload) {
                    inner.publish_positions(positions);
                }
            }
            // Error marker: registry locations clear, but the last
            // plotted markers stay up rather than blanking the map.
            None => {
                inner.registry.apply_feed(None);
            }
        },
        FeedEvent::History(payload) => {
            if let Some(positions) = feed::positions(payload) {
                inner.publish_positions(positions);
            }
        }
        FeedEvent::ServerStatus(message) => {
            tracing::debug!(message, "feed server status");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn add_status_labels() {
        assert_eq!(AddStatus::New.to_string(), "New");
        assert_eq!(AddStatus::Added.to_string(), "Added");
        assert_eq!(AddStatus::AlreadyDisplayed.to_string(), "Already Displayed");
        assert_eq!(AddStatus::Offline.to_string(), "Offline");
        assert_eq!(AddStatus::NotFound.to_string(), "Not Found");
    }

    #[test]
    fn coordinates_text_two_decimals() {
        assert_eq!(
            coordinates_text(40.954_991, -76.885_047),
            "Latitude: 40.95, Longitude: -76.89"
        );
    }

    #[test]
    fn config_defaults() {
        let config = TrackerConfig::new(
            "ws://localhost:5000/feed".parse().unwrap(),
            "http://localhost:5000/".parse().unwrap(),
        );
        assert_eq!(config.day_range_debounce, Duration::from_millis(150));
        assert!(!config.reset_camera_on_deselect);
    }

    // The backend here is unreachable on purpose: these add paths must
    // resolve before any lookup goes out.
    fn offline_tracker() -> Tracker {
        let config = TrackerConfig::new(
            "ws://127.0.0.1:9/feed".parse().unwrap(),
            "http://127.0.0.1:9/".parse().unwrap(),
        );
        Tracker::connect(config, Box::new(MemoryStore::new())).unwrap()
    }

    // Feed socket still unreachable; only the HTTP lookup is mocked.
    fn tracker_against(server: &MockServer) -> Tracker {
        let config = TrackerConfig::new(
            "ws://127.0.0.1:9/feed".parse().unwrap(),
            server.uri().parse().unwrap(),
        );
        Tracker::connect(config, Box::new(MemoryStore::new())).unwrap()
    }

    fn existence_mock(exists: bool) -> Mock {
        Mock::given(method("POST"))
            .and(path("/api/check_device_existence"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "exists": exists
            })))
    }

    #[tokio::test]
    async fn blank_id_add_is_not_found() {
        let tracker = offline_tracker();
        assert_eq!(tracker.add_accessory("   ").await, AddStatus::NotFound);
        tracker.shutdown();
    }

    #[tokio::test]
    async fn duplicate_add_reports_already_displayed() {
        let tracker = offline_tracker();
        tracker.inner.registry.add(DeviceId::new("pico-7")).unwrap();

        assert_eq!(
            tracker.add_accessory("pico-7").await,
            AddStatus::AlreadyDisplayed
        );
        assert_eq!(tracker.accessories().len(), 1);
        tracker.shutdown();
    }

    #[tokio::test]
    async fn known_device_is_added() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/check_device_existence"))
            .and(body_json(serde_json::json!({ "device_id": "pico-7" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "exists": true
            })))
            .mount(&server)
            .await;

        let tracker = tracker_against(&server);
        assert_eq!(tracker.add_accessory(" pico-7 ").await, AddStatus::Added);

        let accessories = tracker.accessories();
        assert_eq!(accessories.len(), 1);
        assert_eq!(accessories[0].id, DeviceId::new("pico-7"));
        tracker.shutdown();
    }

    #[tokio::test]
    async fn unknown_device_is_not_found() {
        let server = MockServer::start().await;
        existence_mock(false).mount(&server).await;

        let tracker = tracker_against(&server);
        assert_eq!(tracker.add_accessory("ghost-1").await, AddStatus::NotFound);
        assert!(tracker.accessories().is_empty());
        tracker.shutdown();
    }

    #[tokio::test]
    async fn backend_error_reports_offline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/check_device_existence"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({ "error": "Database error" })),
            )
            .mount(&server)
            .await;

        let tracker = tracker_against(&server);
        assert_eq!(tracker.add_accessory("pico-7").await, AddStatus::Offline);
        assert!(tracker.accessories().is_empty());
        tracker.shutdown();
    }

    #[tokio::test]
    async fn unreachable_backend_reports_offline() {
        let tracker = offline_tracker();
        assert_eq!(tracker.add_accessory("pico-7").await, AddStatus::Offline);
        assert!(tracker.accessories().is_empty());
        tracker.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn day_range_fetch_waits_out_the_debounce() {
        let tracker = offline_tracker();
        let before = tracker.dispatched_fetches();

        tracker.set_day_range(2);
        assert_eq!(tracker.day_range(), 2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tracker.dispatched_fetches(), before);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tracker.dispatched_fetches(), before + 1);
        tracker.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_day_range_steps_send_one_fetch() {
        let tracker = offline_tracker();
        let before = tracker.dispatched_fetches();

        for days in 1..=5 {
            tracker.set_day_range(days);
        }
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(tracker.dispatched_fetches(), before + 1);
        assert_eq!(tracker.day_range(), 5);
        tracker.shutdown();
    }
}
