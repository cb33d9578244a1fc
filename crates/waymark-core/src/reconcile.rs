//! Pure reconciliation of feed records into accessory state.
//!
//! Everything here is a plain function from inputs to outputs: no
//! channels, no interior mutability, no clock reads. The registry calls
//! these at its mutation points, which keeps causality auditable —
//! there is no reactive graph recomputing derived state behind the
//! scenes. All functions are idempotent: applying the same input twice
//! yields the same output and reports no change the second time.

use chrono::{DateTime, Local, NaiveDateTime};

use crate::model::{
    Accessory, AccessoryStatus, GeoPoint, LocationAndStatus, NO_LOCATION, RenderPayload,
};

// ── Formatting ──────────────────────────────────────────────────────

/// One coordinate component as degrees-minutes-seconds with one decimal
/// on the seconds, e.g. `40° 57' 18.0" N`.
///
/// Works in tenths of arc-seconds throughout so that rounding a seconds
/// value up to `60.0` carries into minutes (and degrees) instead of
/// printing an out-of-range component.
fn dms_component(value: f64, positive: char, negative: char) -> String {
    let hemisphere = if value < 0.0 { negative } else { positive };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total_tenths = (value.abs() * 36_000.0).round() as u64;

    let degrees = total_tenths / 36_000;
    let remainder = total_tenths % 36_000;
    let minutes = remainder / 600;
    let second_tenths = remainder % 600;

    format!(
        "{degrees}\u{b0} {minutes}' {}.{}\" {hemisphere}",
        second_tenths / 10,
        second_tenths % 10
    )
}

/// Format a coordinate pair as comma-separated DMS:
/// `40° 57' 18.0" N, 76° 53' 6.0" W`.
pub fn format_coordinates(point: GeoPoint) -> String {
    format!(
        "{}, {}",
        dms_component(point.lat, 'N', 'S'),
        dms_component(point.lng, 'E', 'W')
    )
}

/// Extract a `HH:MM` 24-hour clock from an ISO-ish timestamp.
///
/// The backend sends naive local timestamps (`2024-01-01T14:05:00`);
/// offset-carrying timestamps are converted to local time first.
pub fn format_timestamp(timestamp: &str) -> Option<String> {
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(timestamp, pattern) {
            return Some(naive.format("%H:%M").to_string());
        }
    }
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.with_timezone(&Local).format("%H:%M").to_string())
}

/// The full display string for a located accessory: DMS coordinates
/// suffixed with the fix time.
pub fn format_location(point: GeoPoint, timestamp: &str) -> String {
    let clock = format_timestamp(timestamp).unwrap_or_else(|| "--:--".to_owned());
    format!("{}, {clock}", format_coordinates(point))
}

// ── Reconciliation ──────────────────────────────────────────────────

/// Merge feed records into an accessory list.
///
/// `None` means the feed reported an error (or went away): every
/// accessory falls back to [`NO_LOCATION`]. Otherwise records are
/// matched by id — accessories without a record are left untouched, and
/// records for unknown ids are ignored. Returns the merged list and
/// whether anything actually changed (field-level equality check, so
/// callers can skip persistence and downstream recompute).
pub fn reconcile(
    accessories: &[Accessory],
    records: Option<&[LocationAndStatus]>,
) -> (Vec<Accessory>, bool) {
    let mut merged = accessories.to_vec();
    let mut changed = false;

    let Some(records) = records else {
        for accessory in &mut merged {
            if accessory.location != NO_LOCATION {
                accessory.location = NO_LOCATION.to_owned();
                changed = true;
            }
        }
        return (merged, changed);
    };

    for record in records {
        let Some(accessory) = merged.iter_mut().find(|a| a.id == record.id) else {
            continue;
        };

        let location = record.location.map_or_else(
            || NO_LOCATION.to_owned(),
            |point| format_location(point, &record.timestamp),
        );
        let status = AccessoryStatus::from_raw(&record.status);

        if accessory.location != location || accessory.status != status {
            accessory.location = location;
            accessory.status = status;
            changed = true;
        }
    }

    (merged, changed)
}

/// Derive the render payload set from the current accessory set.
///
/// Always a 1:1 projection — no payload survives its accessory.
pub fn render_payloads(accessories: &[Accessory]) -> Vec<RenderPayload> {
    accessories
        .iter()
        .map(|a| RenderPayload {
            id: a.id.clone(),
            color: a.color.clone(),
            icon_svg: a.icon.svg().to_owned(),
        })
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceId;
    use pretty_assertions::assert_eq;

    fn accessory(id: &str) -> Accessory {
        Accessory::new(DeviceId::new(id))
    }

    fn record(id: &str, point: Option<GeoPoint>, status: &str, ts: &str) -> LocationAndStatus {
        LocationAndStatus {
            id: DeviceId::new(id),
            location: point,
            status: status.to_owned(),
            timestamp: ts.to_owned(),
        }
    }

    const SAMPLE_POINT: GeoPoint = GeoPoint {
        lat: 40.955,
        lng: -76.885,
    };

    #[test]
    fn dms_formatting_matches_reference() {
        assert_eq!(
            format_coordinates(SAMPLE_POINT),
            "40\u{b0} 57' 18.0\" N, 76\u{b0} 53' 6.0\" W"
        );
    }

    #[test]
    fn dms_seconds_rounding_carries_into_minutes() {
        // 59.97" rounds to 60.0" which must carry: 10° 0' 59.97" -> 10° 1' 0.0"
        let value = 10.0 + 59.97 / 3600.0;
        assert_eq!(dms_component(value, 'N', 'S'), "10\u{b0} 1' 0.0\" N");
    }

    #[test]
    fn southern_and_western_hemispheres() {
        let point = GeoPoint {
            lat: -33.8568,
            lng: 151.2153,
        };
        let formatted = format_coordinates(point);
        assert!(formatted.contains("\" S"), "{formatted}");
        assert!(formatted.ends_with("\" E"), "{formatted}");
    }

    #[test]
    fn formatted_location_begins_with_dms_and_ends_with_clock() {
        let formatted = format_location(SAMPLE_POINT, "2024-01-01T14:05:00");
        assert!(
            formatted.starts_with("40\u{b0} 57' 18.0\" N, 76\u{b0} 53' 6.0\" W"),
            "{formatted}"
        );
        assert!(formatted.ends_with("14:05"), "{formatted}");
    }

    #[test]
    fn timestamp_with_space_separator() {
        assert_eq!(format_timestamp("2024-01-01 09:30:15").as_deref(), Some("09:30"));
    }

    #[test]
    fn unparseable_timestamp_yields_placeholder() {
        let formatted = format_location(SAMPLE_POINT, "garbage");
        assert!(formatted.ends_with("--:--"), "{formatted}");
    }

    #[test]
    fn reconcile_updates_location_and_status() {
        let accessories = vec![accessory("a")];
        let records = vec![record(
            "a",
            Some(SAMPLE_POINT),
            "online",
            "2024-01-01T14:05:00",
        )];

        let (merged, changed) = reconcile(&accessories, Some(&records));
        assert!(changed);
        assert!(merged[0].location.ends_with("14:05"));
        assert_eq!(merged[0].status, AccessoryStatus::Online);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let accessories = vec![accessory("a"), accessory("b")];
        let records = vec![
            record("a", Some(SAMPLE_POINT), "online", "2024-01-01T14:05:00"),
            record("b", None, "offline", ""),
        ];

        let (once, changed_once) = reconcile(&accessories, Some(&records));
        assert!(changed_once);

        let (twice, changed_twice) = reconcile(&once, Some(&records));
        assert_eq!(once, twice);
        assert!(!changed_twice, "second application must be a no-op");
    }

    #[test]
    fn null_feed_marks_everything_no_location() {
        let mut accessories = vec![accessory("a")];
        accessories[0].location = "somewhere, 12:00".to_owned();

        let (merged, changed) = reconcile(&accessories, None);
        assert!(changed);
        assert_eq!(merged[0].location, NO_LOCATION);

        // And again: nothing left to change.
        let (_, changed_again) = reconcile(&merged, None);
        assert!(!changed_again);
    }

    #[test]
    fn absent_location_in_record_is_no_location() {
        let mut accessories = vec![accessory("a")];
        accessories[0].location = "somewhere, 12:00".to_owned();

        let records = vec![record("a", None, "offline", "2024-01-01T14:05:00")];
        let (merged, changed) = reconcile(&accessories, Some(&records));
        assert!(changed);
        assert_eq!(merged[0].location, NO_LOCATION);
    }

    #[test]
    fn records_for_unknown_ids_are_ignored() {
        let accessories = vec![accessory("a")];
        let records = vec![record(
            "ghost",
            Some(SAMPLE_POINT),
            "online",
            "2024-01-01T14:05:00",
        )];

        let (merged, changed) = reconcile(&accessories, Some(&records));
        assert!(!changed);
        assert_eq!(merged, accessories);
    }

    #[test]
    fn render_payloads_are_one_to_one() {
        let accessories = vec![accessory("a"), accessory("b")];
        let payloads = render_payloads(&accessories);
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].id, accessories[0].id);
        assert_eq!(payloads[0].color, accessories[0].color);
        assert!(payloads[0].icon_svg.starts_with("<svg"));
    }

    #[test]
    fn render_payloads_of_empty_set_is_empty() {
        assert!(render_payloads(&[]).is_empty());
    }
}
