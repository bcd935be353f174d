use chrono::NaiveDate;
use thiserror::Error;

/// Failures surfaced by attendance operations. Punch rejections get their own variants so
/// callers can tell an expected refusal apart from a broken store.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("already checked in today, check out first")]
    AlreadyCheckedIn,
    #[error("already checked out today")]
    AlreadyCheckedOut,
    #[error("no check-in recorded today, check in first")]
    NotCheckedIn,
    #[error("no record found for {username} on {date}")]
    NotFound { username: String, date: NaiveDate },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
