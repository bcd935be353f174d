//! Read-side aggregation over loaded collections. Everything here is pure so the same
//! helpers serve the tracker, the terminal renderer and the CSV export.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{store::entities::AttendanceRecord, utils::time::hms};

/// Filter applied by [list_all]. Every part is optional, an empty filter keeps the whole
/// collection. Both ends of the date range are inclusive.
#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub username: Option<String>,
}

impl ListFilter {
    fn matches(&self, record: &AttendanceRecord) -> bool {
        if let Some(username) = &self.username {
            if record.username != *username {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.date > to {
                return false;
            }
        }
        true
    }
}

/// One listing row: the stored record together with its computed duration.
#[derive(Debug, Clone)]
pub struct ListedRecord {
    pub record: AttendanceRecord,
    pub duration_seconds: i64,
    pub duration_human: String,
}

/// Roll-up totals over one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSummary {
    pub days: usize,
    pub completed: usize,
    pub open: usize,
    pub total_seconds: i64,
}

/// Elapsed seconds between the punches of a record. An open record is measured against
/// `now`, so its duration keeps growing until the check-out freezes it. Without a check-in
/// the duration is zero, and it never goes negative even for odd hand-edited rows.
pub fn duration_seconds(record: &AttendanceRecord, now: DateTime<Utc>) -> i64 {
    let Some(start) = record.check_in_at else {
        return 0;
    };
    let end = record.check_out_at.unwrap_or(now);
    (end - start).num_seconds().max(0)
}

/// All records of one user, newest day first, truncated to `limit`.
pub fn history(mut records: Vec<AttendanceRecord>, username: &str, limit: usize) -> Vec<AttendanceRecord> {
    records.retain(|r| r.username == username);
    records.sort_by(|a, b| b.date.cmp(&a.date));
    records.truncate(limit);
    records
}

/// Filtered listing across users, annotated with durations. Rows come out newest day
/// first with an ascending username tie-break inside one day, so the order is stable no
/// matter how the collection grew.
pub fn list_all(
    records: Vec<AttendanceRecord>,
    filter: &ListFilter,
    now: DateTime<Utc>,
) -> Vec<ListedRecord> {
    let mut rows: Vec<_> = records.into_iter().filter(|r| filter.matches(r)).collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.username.cmp(&b.username)));
    annotate(rows, now)
}

/// Attaches the computed duration fields to already filtered rows.
pub fn annotate(records: Vec<AttendanceRecord>, now: DateTime<Utc>) -> Vec<ListedRecord> {
    records
        .into_iter()
        .map(|record| {
            let seconds = duration_seconds(&record, now);
            ListedRecord {
                duration_seconds: seconds,
                duration_human: hms(seconds),
                record,
            }
        })
        .collect()
}

pub fn summarize(rows: &[ListedRecord]) -> ListSummary {
    let mut summary = ListSummary {
        days: rows.len(),
        completed: 0,
        open: 0,
        total_seconds: 0,
    };
    for row in rows {
        if row.record.check_out_at.is_some() {
            summary.completed += 1;
        } else if row.record.is_open() {
            summary.open += 1;
        }
        summary.total_seconds += row.duration_seconds;
    }
    summary
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use crate::store::entities::AttendanceRecord;

    use super::{annotate, duration_seconds, history, list_all, summarize, ListFilter, ListSummary};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    const TEST_MIDNIGHT: NaiveDateTime = NaiveDateTime::new(TEST_DATE, NaiveTime::MIN);

    fn test_time(offset_seconds: i64) -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_MIDNIGHT) + Duration::seconds(offset_seconds)
    }

    fn record(
        username: &str,
        date: NaiveDate,
        in_offset: Option<i64>,
        out_offset: Option<i64>,
    ) -> AttendanceRecord {
        let mut record = AttendanceRecord::new(username.to_owned(), date);
        record.check_in_at = in_offset.map(test_time);
        record.check_out_at = out_offset.map(test_time);
        record
    }

    #[test]
    fn test_list_all_sorts_by_date_desc_then_username_asc() {
        let next_day = TEST_DATE + Duration::days(1);
        let records = vec![
            record("bob", TEST_DATE, Some(0), Some(60)),
            record("ann", next_day, Some(0), Some(60)),
            record("ann", TEST_DATE, Some(0), Some(60)),
            record("bob", next_day, Some(0), Some(60)),
        ];

        let rows = list_all(records, &ListFilter::default(), test_time(0));

        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.record.date, r.record.username.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (next_day, "ann"),
                (next_day, "bob"),
                (TEST_DATE, "ann"),
                (TEST_DATE, "bob"),
            ]
        );
    }

    #[test]
    fn test_list_all_filters_by_inclusive_range_and_username() {
        let mut records: Vec<_> = (0..4)
            .map(|i| record("ann", TEST_DATE + Duration::days(i), Some(0), None))
            .collect();
        records.push(record("bob", TEST_DATE + Duration::days(1), Some(0), None));

        let filter = ListFilter {
            from: Some(TEST_DATE + Duration::days(1)),
            to: Some(TEST_DATE + Duration::days(2)),
            username: Some("ann".into()),
        };
        let rows = list_all(records, &filter, test_time(0));

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.record.username == "ann"));
        assert_eq!(rows[0].record.date, TEST_DATE + Duration::days(2));
        assert_eq!(rows[1].record.date, TEST_DATE + Duration::days(1));
    }

    #[test]
    fn test_duration_measures_open_records_against_now() {
        let open = record("ann", TEST_DATE, Some(0), None);

        assert_eq!(duration_seconds(&open, test_time(90)), 90);
        assert_eq!(duration_seconds(&open, test_time(120)), 120);
    }

    #[test]
    fn test_duration_is_zero_without_check_in() {
        let empty = record("ann", TEST_DATE, None, None);

        assert_eq!(duration_seconds(&empty, test_time(50)), 0);
    }

    #[test]
    fn test_duration_clamps_check_out_before_check_in() {
        let odd = record("ann", TEST_DATE, Some(100), Some(40));

        assert_eq!(duration_seconds(&odd, test_time(500)), 0);
    }

    #[test]
    fn test_annotation_renders_human_duration() {
        let rows = annotate(vec![record("ann", TEST_DATE, Some(0), Some(3661))], test_time(9000));

        assert_eq!(rows[0].duration_seconds, 3661);
        assert_eq!(rows[0].duration_human, "01:01:01");
    }

    #[test]
    fn test_history_returns_newest_first_and_truncates() {
        let mut records: Vec<_> = (0..5)
            .map(|i| record("ann", TEST_DATE + Duration::days(i), Some(0), None))
            .collect();
        records.push(record("bob", TEST_DATE + Duration::days(9), Some(0), None));

        let items = history(records, "ann", 3);

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].date, TEST_DATE + Duration::days(4));
        assert_eq!(items[2].date, TEST_DATE + Duration::days(2));
    }

    #[test]
    fn test_summarize_counts_days_and_open_records() {
        let rows = annotate(
            vec![
                record("ann", TEST_DATE, Some(0), Some(3600)),
                record("bob", TEST_DATE, Some(0), None),
                record("cat", TEST_DATE, None, None),
            ],
            test_time(1800),
        );

        let summary = summarize(&rows);

        assert_eq!(
            summary,
            ListSummary {
                days: 3,
                completed: 1,
                open: 1,
                total_seconds: 3600 + 1800,
            }
        );
    }
}
