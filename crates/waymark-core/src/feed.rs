//! Normalization of raw feed payloads into domain records.
//!
//! The socket crate hands us [`FeedPayload`]s verbatim; this module is
//! the single place where wire shapes become domain types. Error
//! markers collapse to `None` — "the database had nothing" and "the
//! database broke" both mean "no data" to the dashboard.

use waymark_api::wire::{FeedPayload, GeoSample};

use crate::model::{DeviceId, GeoPoint, LocationAndStatus, MarkerPosition};

/// Normalize a latest-data payload into per-device records.
///
/// `None` for an error marker; callers treat that as "clear all
/// locations", never as a user-visible failure.
pub fn latest_records(payload: &FeedPayload) -> Option<Vec<LocationAndStatus>> {
    match payload {
        FeedPayload::Samples(samples) => Some(samples.iter().map(normalize_sample).collect()),
        FeedPayload::Error(message) => {
            tracing::debug!(message, "latest feed payload carried an error marker");
            None
        }
    }
}

/// Extract plottable positions from a payload (latest or history).
///
/// Error markers yield `None`, which leaves the previous marker set in
/// place — a transient backend hiccup must not blank the map.
pub fn positions(payload: &FeedPayload) -> Option<Vec<MarkerPosition>> {
    match payload {
        FeedPayload::Samples(samples) => Some(
            samples
                .iter()
                .map(|s| MarkerPosition {
                    id: DeviceId::new(&s.device_id),
                    lat: s.latitude,
                    lng: s.longitude,
                })
                .collect(),
        ),
        FeedPayload::Error(message) => {
            tracing::debug!(message, "positions payload carried an error marker");
            None
        }
    }
}

fn normalize_sample(sample: &GeoSample) -> LocationAndStatus {
    LocationAndStatus {
        id: DeviceId::new(&sample.device_id),
        location: Some(GeoPoint {
            lat: sample.latitude,
            lng: sample.longitude,
        }),
        status: sample.status.clone().unwrap_or_default(),
        timestamp: sample.timestamp.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(id: &str, lat: f64, lng: f64) -> GeoSample {
        GeoSample {
            device_id: id.to_owned(),
            latitude: lat,
            longitude: lng,
            elevation: None,
            timestamp: Some("2026-02-10T12:00:00".to_owned()),
            status: Some("online".to_owned()),
        }
    }

    #[test]
    fn latest_records_from_samples() {
        let payload = FeedPayload::Samples(vec![sample("pico-7", 40.955, -76.885)]);
        let records = latest_records(&payload).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, DeviceId::new("pico-7"));
        assert_eq!(records[0].status, "online");
        assert_eq!(
            records[0].location,
            Some(GeoPoint {
                lat: 40.955,
                lng: -76.885
            })
        );
    }

    #[test]
    fn missing_status_and_timestamp_become_empty() {
        let payload = FeedPayload::Samples(vec![GeoSample {
            device_id: "pico-7".to_owned(),
            latitude: 40.0,
            longitude: -76.0,
            elevation: None,
            timestamp: None,
            status: None,
        }]);
        let records = latest_records(&payload).unwrap();
        assert_eq!(records[0].status, "");
        assert_eq!(records[0].timestamp, "");
    }

    #[test]
    fn error_marker_yields_none() {
        let payload = FeedPayload::Error("No data found".to_owned());
        assert!(latest_records(&payload).is_none());
        assert!(positions(&payload).is_none());
    }

    #[test]
    fn positions_carry_raw_coordinates() {
        let payload = FeedPayload::Samples(vec![
            sample("a", 40.0, -76.0),
            sample("a", 40.1, -76.1),
        ]);
        let positions = positions(&payload).unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[1].point(), GeoPoint { lat: 40.1, lng: -76.1 });
    }
}
