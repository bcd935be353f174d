use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The struct used for storing attendance data on the disk. One row covers a single user
/// for a single calendar day, so the `(username, date)` pair is the unique key of the
/// collection. Everything past the key stays optional because a row is created by the
/// first punch of the day and filled in by later ones.
///
/// Field names are serialized in camel case so collections written by earlier versions of
/// the tool keep loading unchanged.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub username: String,
    pub date: NaiveDate,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub check_in_photo: Option<String>,
    pub check_out_photo: Option<String>,
    pub check_in_loc: Option<GeoPoint>,
    pub check_out_loc: Option<GeoPoint>,
}

impl AttendanceRecord {
    pub fn new(username: String, date: NaiveDate) -> Self {
        Self {
            username,
            date,
            check_in_at: None,
            check_out_at: None,
            check_in_photo: None,
            check_out_photo: None,
            check_in_loc: None,
            check_out_loc: None,
        }
    }

    pub fn matches_key(&self, username: &str, date: NaiveDate) -> bool {
        self.username == username && self.date == date
    }

    /// A record whose check-in has not been closed by a check-out yet.
    pub fn is_open(&self) -> bool {
        self.check_in_at.is_some() && self.check_out_at.is_none()
    }

    /// Shallow merge: every filled field of the patch overwrites the stored value, empty
    /// ones leave it untouched. A patch can set a field but never clear it.
    pub fn apply(&mut self, patch: RecordPatch) {
        let RecordPatch {
            check_in_at,
            check_out_at,
            check_in_photo,
            check_out_photo,
            check_in_loc,
            check_out_loc,
        } = patch;
        if let Some(v) = check_in_at {
            self.check_in_at = Some(v);
        }
        if let Some(v) = check_out_at {
            self.check_out_at = Some(v);
        }
        if let Some(v) = check_in_photo {
            self.check_in_photo = Some(v);
        }
        if let Some(v) = check_out_photo {
            self.check_out_photo = Some(v);
        }
        if let Some(v) = check_in_loc {
            self.check_in_loc = Some(v);
        }
        if let Some(v) = check_out_loc {
            self.check_out_loc = Some(v);
        }
    }
}

/// A captured device location that survived sanitization. The accuracy and timestamp keys
/// are left out of the JSON entirely when absent, matching how browsers report partial
/// geolocation data.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl GeoPoint {
    /// Accepts a captured location only when both coordinates are finite numbers. A
    /// non-finite accuracy is dropped without rejecting the whole point. The timestamp is
    /// opaque and carried verbatim.
    pub fn sanitize(raw: RawLocation) -> Option<GeoPoint> {
        if !raw.lat.is_finite() || !raw.lng.is_finite() {
            return None;
        }
        Some(GeoPoint {
            lat: raw.lat,
            lng: raw.lng,
            accuracy: raw.accuracy.filter(|v| v.is_finite()),
            timestamp: raw.timestamp,
        })
    }
}

/// Location input exactly as an external device reported it, before any validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLocation {
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
    pub timestamp: Option<String>,
}

/// Partial update applied to one attendance row, see [AttendanceRecord::apply]. The key
/// fields are not part of the patch since a row never moves between users or days.
#[derive(Debug, Default, Clone)]
pub struct RecordPatch {
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub check_in_photo: Option<String>,
    pub check_out_photo: Option<String>,
    pub check_in_loc: Option<GeoPoint>,
    pub check_out_loc: Option<GeoPoint>,
}

/// Composite key identifying one attendance row, used by bulk deletes. Deserializable from
/// the `[{"username": ..., "date": ...}]` file form.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RecordKey {
    pub username: String,
    pub date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, NaiveDate, Utc};

    use super::{AttendanceRecord, GeoPoint, RawLocation, RecordPatch};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

    fn raw_point(lat: f64, lng: f64) -> RawLocation {
        RawLocation {
            lat,
            lng,
            accuracy: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_sanitize_accepts_finite_coordinates() {
        let cleaned = GeoPoint::sanitize(RawLocation {
            lat: 47.3769,
            lng: 8.5417,
            accuracy: Some(12.5),
            timestamp: Some("2025-03-14T08:30:00.000Z".into()),
        });

        assert_eq!(
            cleaned,
            Some(GeoPoint {
                lat: 47.3769,
                lng: 8.5417,
                accuracy: Some(12.5),
                timestamp: Some("2025-03-14T08:30:00.000Z".into()),
            })
        );
    }

    #[test]
    fn test_sanitize_rejects_non_finite_coordinates() {
        assert_eq!(GeoPoint::sanitize(raw_point(f64::NAN, 8.5417)), None);
        assert_eq!(GeoPoint::sanitize(raw_point(47.3769, f64::INFINITY)), None);
        assert_eq!(
            GeoPoint::sanitize(raw_point(f64::NEG_INFINITY, f64::NAN)),
            None
        );
    }

    #[test]
    fn test_sanitize_drops_only_the_broken_accuracy() {
        let cleaned = GeoPoint::sanitize(RawLocation {
            lat: 1.0,
            lng: 2.0,
            accuracy: Some(f64::NAN),
            timestamp: None,
        });

        assert_eq!(
            cleaned,
            Some(GeoPoint {
                lat: 1.0,
                lng: 2.0,
                accuracy: None,
                timestamp: None,
            })
        );
    }

    #[test]
    fn test_apply_overwrites_only_patched_fields() {
        let mut record = AttendanceRecord::new("ann".into(), TEST_DATE);
        record.check_in_photo = Some("/uploads/morning.png".into());

        let punched_at = "2025-03-14T08:30:00Z".parse::<DateTime<Utc>>().unwrap();
        record.apply(RecordPatch {
            check_in_at: Some(punched_at),
            ..Default::default()
        });

        assert_eq!(record.check_in_at, Some(punched_at));
        assert_eq!(record.check_in_photo.as_deref(), Some("/uploads/morning.png"));
        assert_eq!(record.check_out_at, None);
    }

    #[test]
    fn test_json_shape_stays_compatible() -> Result<()> {
        let mut record = AttendanceRecord::new("ann".into(), TEST_DATE);
        record.check_in_at = Some("2025-03-14T08:30:00Z".parse()?);
        record.check_in_loc = Some(GeoPoint {
            lat: 1.5,
            lng: 2.5,
            accuracy: None,
            timestamp: None,
        });

        let json = serde_json::to_value(&record)?;
        assert_eq!(json["checkInAt"], "2025-03-14T08:30:00Z");
        assert_eq!(json["checkOutAt"], serde_json::Value::Null);
        assert!(json["checkInLoc"].get("accuracy").is_none());

        // Rows written by older versions may leave keys out entirely.
        let parsed: AttendanceRecord = serde_json::from_str(
            r#"{"username":"bob","date":"2025-03-14","checkInAt":"2025-03-14T08:30:00.000Z"}"#,
        )?;
        assert_eq!(parsed.username, "bob");
        assert_eq!(parsed.date, TEST_DATE);
        assert_eq!(parsed.check_out_at, None);
        assert_eq!(parsed.check_in_loc, None);
        Ok(())
    }
}
