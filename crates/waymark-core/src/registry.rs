//! The accessory registry: canonical, ordered device state.
//!
//! Insertion order is display order — the sidebar shows devices in the
//! order the user added them. Every mutation runs the same tail:
//! persist synchronously, republish the snapshot and render payloads,
//! bump the version counter. Consumers watch the channels instead of
//! holding references into the map.
//!
//! Concurrent writers are serialized by the inner mutex; within one
//! mutation the reconcile/persist/publish sequence is atomic. Between
//! mutations the rule is last-write-wins, which is the honest
//! description of what a feed update racing a user edit should do.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::model::{Accessory, DEFAULT_NAME, DeviceId, IconKey, LocationAndStatus, RenderPayload};
use crate::persist::RegistryStore;
use crate::reconcile;

/// Ordered accessory collection with change broadcasting and durable
/// persistence.
pub struct AccessoryRegistry {
    inner: Mutex<IndexMap<DeviceId, Accessory>>,
    store: Box<dyn RegistryStore>,
    version: watch::Sender<u64>,
    snapshot: watch::Sender<Arc<Vec<Accessory>>>,
    payloads: watch::Sender<Arc<Vec<RenderPayload>>>,
}

impl AccessoryRegistry {
    /// Load persisted accessories from `store` and publish the initial
    /// snapshot.
    pub fn load(store: Box<dyn RegistryStore>) -> Self {
        let accessories = store.load();
        tracing::info!(count = accessories.len(), "loaded accessory registry");

        let map: IndexMap<DeviceId, Accessory> = accessories
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();

        let list: Vec<Accessory> = map.values().cloned().collect();
        let (snapshot, _) = watch::channel(Arc::new(list.clone()));
        let (payloads, _) = watch::channel(Arc::new(reconcile::render_payloads(&list)));
        let (version, _) = watch::channel(0);

        Self {
            inner: Mutex::new(map),
            store,
            version,
            snapshot,
            payloads,
        }
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Current accessory list, in display order.
    pub fn snapshot(&self) -> Arc<Vec<Accessory>> {
        self.snapshot.borrow().clone()
    }

    /// Current render payloads, 1:1 with the snapshot.
    pub fn payloads(&self) -> Arc<Vec<RenderPayload>> {
        self.payloads.borrow().clone()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<Arc<Vec<Accessory>>> {
        self.snapshot.subscribe()
    }

    pub fn watch_payloads(&self) -> watch::Receiver<Arc<Vec<RenderPayload>>> {
        self.payloads.subscribe()
    }

    /// Monotonic change counter, bumped on every published mutation.
    pub fn watch_version(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn get(&self, id: &DeviceId) -> Option<Accessory> {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Register a new accessory. `Ok(false)` when the id is already
    /// present (no change is made), `Ok(true)` when it was added.
    pub fn add(&self, id: DeviceId) -> Result<bool, CoreError> {
        if id.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "device id must not be blank".to_owned(),
            });
        }

        let mut map = self.lock();
        if map.contains_key(&id) {
            return Ok(false);
        }

        tracing::info!(%id, "adding accessory");
        map.insert(id.clone(), Accessory::new(id));
        self.publish(&map);
        Ok(true)
    }

    /// Rename an accessory. Whitespace is trimmed; a blank result falls
    /// back to [`DEFAULT_NAME`].
    pub fn rename(&self, id: &DeviceId, name: &str) -> Result<(), CoreError> {
        let name = name.trim();
        let name = if name.is_empty() { DEFAULT_NAME } else { name };

        let mut map = self.lock();
        let accessory = map
            .get_mut(id)
            .ok_or_else(|| CoreError::AccessoryNotFound { id: id.clone() })?;

        if accessory.name == name {
            return Ok(());
        }
        accessory.name = name.to_owned();
        self.publish(&map);
        Ok(())
    }

    /// Set the marker color of an accessory.
    pub fn recolor(&self, id: &DeviceId, color: &str) -> Result<(), CoreError> {
        let mut map = self.lock();
        let accessory = map
            .get_mut(id)
            .ok_or_else(|| CoreError::AccessoryNotFound { id: id.clone() })?;

        if accessory.color == color {
            return Ok(());
        }
        accessory.color = color.to_owned();
        self.publish(&map);
        Ok(())
    }

    /// Set the marker icon of an accessory.
    pub fn set_icon(&self, id: &DeviceId, icon: IconKey) -> Result<(), CoreError> {
        let mut map = self.lock();
        let accessory = map
            .get_mut(id)
            .ok_or_else(|| CoreError::AccessoryNotFound { id: id.clone() })?;

        if accessory.icon == icon {
            return Ok(());
        }
        accessory.icon = icon;
        self.publish(&map);
        Ok(())
    }

    /// Delete an accessory. Removing the last one leaves an empty
    /// registry and an empty payload set — nothing lingers.
    pub fn remove(&self, id: &DeviceId) -> Result<(), CoreError> {
        let mut map = self.lock();
        if map.shift_remove(id).is_none() {
            return Err(CoreError::AccessoryNotFound { id: id.clone() });
        }
        tracing::info!(%id, "removed accessory");
        self.publish(&map);
        Ok(())
    }

    /// Merge a batch of feed records (or, for `None`, the feed's error
    /// marker) into the registry. Returns whether anything changed; a
    /// repeat of the same batch is a published no-op.
    pub fn apply_feed(&self, records: Option<&[LocationAndStatus]>) -> bool {
        let mut map = self.lock();
        let current: Vec<Accessory> = map.values().cloned().collect();
        let (merged, changed) = reconcile::reconcile(&current, records);
        if !changed {
            return false;
        }

        *map = merged.into_iter().map(|a| (a.id.clone(), a)).collect();
        self.publish(&map);
        true
    }

    // ── Internals ───────────────────────────────────────────────────

    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<DeviceId, Accessory>> {
        // A poisoned registry mutex means a panic mid-mutation; the
        // map itself is still structurally sound, so keep going.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Mutation tail: persist, republish, bump the version. Called with
    /// the lock held so observers never see a half-applied change.
    fn publish(&self, map: &IndexMap<DeviceId, Accessory>) {
        let list: Vec<Accessory> = map.values().cloned().collect();

        if let Err(e) = self.store.save(&list) {
            // Persistence failure degrades durability, not the session.
            tracing::warn!(error = %e, "failed to persist accessory registry");
        }

        let payloads = reconcile::render_payloads(&list);
        self.snapshot.send_replace(Arc::new(list));
        self.payloads.send_replace(Arc::new(payloads));
        self.version.send_modify(|v| *v += 1);
    }
}

impl std::fmt::Debug for AccessoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessoryRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{AccessoryStatus, GeoPoint, NO_LOCATION};
    use crate::persist::MemoryStore;
    use pretty_assertions::assert_eq;

    fn registry() -> AccessoryRegistry {
        AccessoryRegistry::load(Box::new(MemoryStore::new()))
    }

    fn record(id: &str, lat: f64, lng: f64) -> LocationAndStatus {
        LocationAndStatus {
            id: DeviceId::new(id),
            location: Some(GeoPoint { lat, lng }),
            status: "online".to_owned(),
            timestamp: "2026-02-10T14:05:00".to_owned(),
        }
    }

    #[test]
    fn add_preserves_insertion_order() {
        let reg = registry();
        for id in ["c", "a", "b"] {
            assert!(reg.add(DeviceId::new(id)).unwrap());
        }

        let snapshot = reg.snapshot();
        let order: Vec<&str> = snapshot.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn duplicate_add_is_a_no_op() {
        let reg = registry();
        assert!(reg.add(DeviceId::new("pico-7")).unwrap());

        let version = *reg.watch_version().borrow();
        assert!(!reg.add(DeviceId::new("pico-7")).unwrap());
        assert_eq!(reg.len(), 1);
        assert_eq!(*reg.watch_version().borrow(), version);
    }

    #[test]
    fn blank_id_is_rejected() {
        let reg = registry();
        let err = reg.add(DeviceId::new("   ")).unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
    }

    #[test]
    fn rename_trims_and_defaults_blank() {
        let reg = registry();
        reg.add(DeviceId::new("pico-7")).unwrap();
        let id = DeviceId::new("pico-7");

        reg.rename(&id, "  Backpack Tag  ").unwrap();
        assert_eq!(reg.get(&id).unwrap().name, "Backpack Tag");

        reg.rename(&id, "   ").unwrap();
        assert_eq!(reg.get(&id).unwrap().name, DEFAULT_NAME);
    }

    #[test]
    fn rename_unknown_id_fails() {
        let reg = registry();
        let err = reg.rename(&DeviceId::new("ghost"), "x").unwrap_err();
        assert!(matches!(err, CoreError::AccessoryNotFound { .. }));
    }

    #[test]
    fn removing_every_accessory_leaves_nothing() {
        let reg = registry();
        reg.add(DeviceId::new("a")).unwrap();
        reg.add(DeviceId::new("b")).unwrap();

        reg.remove(&DeviceId::new("a")).unwrap();
        reg.remove(&DeviceId::new("b")).unwrap();

        assert!(reg.is_empty());
        assert!(reg.snapshot().is_empty());
        assert!(reg.payloads().is_empty());
    }

    #[test]
    fn payloads_track_color_and_icon_edits() {
        let reg = registry();
        let id = DeviceId::new("pico-7");
        reg.add(id.clone()).unwrap();

        reg.recolor(&id, "blue").unwrap();
        reg.set_icon(&id, IconKey::Bicycle).unwrap();

        let payloads = reg.payloads();
        assert_eq!(payloads[0].color, "blue");
        assert_eq!(payloads[0].icon_svg, IconKey::Bicycle.svg());
    }

    #[test]
    fn apply_feed_updates_and_is_idempotent() {
        let reg = registry();
        reg.add(DeviceId::new("pico-7")).unwrap();

        let records = vec![record("pico-7", 40.955, -76.885)];
        assert!(reg.apply_feed(Some(&records)));

        let acc = reg.get(&DeviceId::new("pico-7")).unwrap();
        assert!(acc.location.ends_with("14:05"));
        assert_eq!(acc.status, AccessoryStatus::Online);

        let version = *reg.watch_version().borrow();
        assert!(!reg.apply_feed(Some(&records)), "repeat batch must not change anything");
        assert_eq!(*reg.watch_version().borrow(), version);
    }

    #[test]
    fn feed_error_clears_locations() {
        let reg = registry();
        reg.add(DeviceId::new("pico-7")).unwrap();
        reg.apply_feed(Some(&[record("pico-7", 40.955, -76.885)]));

        assert!(reg.apply_feed(None));
        assert_eq!(
            reg.get(&DeviceId::new("pico-7")).unwrap().location,
            NO_LOCATION
        );
    }

    #[test]
    fn mutations_persist_through_the_store() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let reg = AccessoryRegistry::load(Box::new(store.clone()));
        reg.add(DeviceId::new("pico-7")).unwrap();
        reg.rename(&DeviceId::new("pico-7"), "Keys").unwrap();

        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].name, "Keys");

        // A fresh registry over the same store sees the same state.
        let reloaded = AccessoryRegistry::load(Box::new(store));
        assert_eq!(reloaded.get(&DeviceId::new("pico-7")).unwrap().name, "Keys");
    }

    #[test]
    fn version_counter_is_monotonic() {
        let reg = registry();
        let mut last = *reg.watch_version().borrow();
        for id in ["a", "b", "c"] {
            reg.add(DeviceId::new(id)).unwrap();
            let now = *reg.watch_version().borrow();
            assert!(now > last);
            last = now;
        }
    }
}
