//! Attendance rules on top of [store](crate::store): punches, keyed upserts, deletes and
//! the read-side queries. Policies live up here, the store below only knows how to load
//! and persist the collection.

pub mod error;
pub mod export;
pub mod query;

use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::{
    store::{
        entities::{AttendanceRecord, GeoPoint, RawLocation, RecordKey, RecordPatch},
        record_store::{RecordStore, Update},
    },
    utils::clock::Clock,
};

use self::{
    error::AttendanceError,
    query::{ListFilter, ListedRecord},
};

/// Optional evidence attached to a punch. The photo is a reference to an image some
/// external step already stored, the location is taken exactly as the device captured it
/// and sanitized before it lands in the record.
#[derive(Debug, Default, Clone)]
pub struct PunchOptions {
    pub photo: Option<String>,
    pub location: Option<RawLocation>,
}

/// Coordinates attendance rules over a [RecordStore]. Every mutation runs as one locked
/// load-modify-persist cycle, so concurrent punches against the same data directory can
/// not overwrite each other.
pub struct AttendanceTracker<S: RecordStore> {
    store: S,
    clock: Box<dyn Clock>,
}

impl<S: RecordStore> AttendanceTracker<S> {
    pub fn new(store: S, clock: Box<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Current local calendar day, the key punch operations default to.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Exact lookup by the `(username, date)` key.
    pub async fn get_record(
        &self,
        username: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let records = self.store.load_all().await?;
        Ok(records.into_iter().find(|r| r.matches_key(username, date)))
    }

    /// Today's record of the user, if any punch happened yet.
    pub async fn today_record(
        &self,
        username: &str,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        self.get_record(username, self.clock.today()).await
    }

    /// All records of one user, newest day first, truncated to `limit`.
    pub async fn history(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let records = self.store.load_all().await?;
        Ok(query::history(records, username, limit))
    }

    /// Filtered view over every user's records, annotated with computed durations.
    pub async fn list(&self, filter: ListFilter) -> Result<Vec<ListedRecord>, AttendanceError> {
        let records = self.store.load_all().await?;
        Ok(query::list_all(records, &filter, self.clock.time()))
    }

    /// Records the start of the day. Rejected while an earlier check-in of the same day is
    /// still open; a new check-in after a completed day overwrites the morning punch and
    /// keeps the rest of the row.
    #[instrument(skip(self))]
    pub async fn check_in(
        &self,
        username: &str,
        punch: PunchOptions,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let date = self.clock.today();
        let now = self.clock.time();
        let username = username.to_owned();
        let photo = punch.photo;
        let location = punch.location.and_then(GeoPoint::sanitize);

        let record = self
            .store
            .update(move |records| -> Result<Update<AttendanceRecord>, AttendanceError> {
                let existing = records.iter().find(|r| r.matches_key(&username, date));
                if existing.is_some_and(AttendanceRecord::is_open) {
                    return Err(AttendanceError::AlreadyCheckedIn);
                }
                let patch = RecordPatch {
                    check_in_at: Some(now),
                    check_in_photo: photo,
                    check_in_loc: location,
                    ..Default::default()
                };
                Ok(Update::changed(upsert_into(records, &username, date, patch)))
            })
            .await??;
        info!("{} checked in on {}", record.username, record.date);
        Ok(record)
    }

    /// Records the end of the day. Requires an open check-in of the same day.
    #[instrument(skip(self))]
    pub async fn check_out(
        &self,
        username: &str,
        punch: PunchOptions,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let date = self.clock.today();
        let now = self.clock.time();
        let username = username.to_owned();
        let photo = punch.photo;
        let location = punch.location.and_then(GeoPoint::sanitize);

        let record = self
            .store
            .update(move |records| -> Result<Update<AttendanceRecord>, AttendanceError> {
                let Some(existing) = records.iter().find(|r| r.matches_key(&username, date))
                else {
                    return Err(AttendanceError::NotCheckedIn);
                };
                if existing.check_in_at.is_none() {
                    return Err(AttendanceError::NotCheckedIn);
                }
                if existing.check_out_at.is_some() {
                    return Err(AttendanceError::AlreadyCheckedOut);
                }
                let patch = RecordPatch {
                    check_out_at: Some(now),
                    check_out_photo: photo,
                    check_out_loc: location,
                    ..Default::default()
                };
                Ok(Update::changed(upsert_into(records, &username, date, patch)))
            })
            .await??;
        info!("{} checked out on {}", record.username, record.date);
        Ok(record)
    }

    /// Merges the patch into the row under `(username, date)`, appending a fresh row when
    /// none exists yet. The collection is persisted either way.
    pub async fn upsert_record(
        &self,
        username: &str,
        date: NaiveDate,
        patch: RecordPatch,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let owner = username.to_owned();
        let record = self
            .store
            .update(move |records| -> Result<Update<AttendanceRecord>, AttendanceError> {
                Ok(Update::changed(upsert_into(records, &owner, date, patch)))
            })
            .await??;
        debug!("Upserted record of {username} on {date}");
        Ok(record)
    }

    /// Removes the row under `(username, date)`.
    pub async fn delete_record(
        &self,
        username: &str,
        date: NaiveDate,
    ) -> Result<(), AttendanceError> {
        let owner = username.to_owned();
        self.store
            .update(move |records| -> Result<Update<()>, AttendanceError> {
                let Some(index) = records.iter().position(|r| r.matches_key(&owner, date)) else {
                    return Err(AttendanceError::NotFound {
                        username: owner,
                        date,
                    });
                };
                records.remove(index);
                Ok(Update::changed(()))
            })
            .await??;
        info!("Deleted record of {username} on {date}");
        Ok(())
    }

    /// Removes every listed row in one pass and reports how many were found. Unknown keys
    /// are skipped silently, so replaying the same set is harmless.
    pub async fn bulk_delete(&self, keys: Vec<RecordKey>) -> Result<usize, AttendanceError> {
        let deleted = self
            .store
            .update(move |records| -> Result<Update<usize>, AttendanceError> {
                let mut deleted = 0;
                for key in &keys {
                    if let Some(index) = records
                        .iter()
                        .position(|r| r.matches_key(&key.username, key.date))
                    {
                        records.remove(index);
                        deleted += 1;
                    }
                }
                if deleted > 0 {
                    Ok(Update::changed(deleted))
                } else {
                    Ok(Update::unchanged(deleted))
                }
            })
            .await??;
        info!("Bulk delete removed {deleted} records");
        Ok(deleted)
    }
}

/// Insert-or-merge primitive shared by the punches and the raw upsert: merges the patch
/// into the row under the key, appending a new row when the key is unknown.
fn upsert_into(
    records: &mut Vec<AttendanceRecord>,
    username: &str,
    date: NaiveDate,
    patch: RecordPatch,
) -> AttendanceRecord {
    let record = match records.iter().position(|r| r.matches_key(username, date)) {
        Some(existing) => &mut records[existing],
        None => {
            records.push(AttendanceRecord::new(username.to_owned(), date));
            records.last_mut().expect("record was just appended")
        }
    };
    record.apply(patch);
    record.clone()
}
