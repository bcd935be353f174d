//! CSV rendering of annotated listings, one line per attendance row.

use chrono::{DateTime, SecondsFormat, Utc};

use super::query::ListedRecord;

const CSV_HEADER: &str = "User,Date,CheckIn,CheckOut,Duration,PhotoIn,PhotoOut,InLat,InLng,OutLat,OutLng";

/// Renders the rows as a CSV document with a fixed header. Absent punches, photos and
/// coordinates stay as empty cells so every line has the same column count.
pub fn to_csv(rows: &[ListedRecord]) -> String {
    let mut document = String::from(CSV_HEADER);
    document.push('\n');

    for row in rows {
        let record = &row.record;
        let fields = [
            record.username.clone(),
            record.date.to_string(),
            record.check_in_at.map(format_timestamp).unwrap_or_default(),
            record.check_out_at.map(format_timestamp).unwrap_or_default(),
            row.duration_human.clone(),
            record.check_in_photo.clone().unwrap_or_default(),
            record.check_out_photo.clone().unwrap_or_default(),
            record
                .check_in_loc
                .as_ref()
                .map(|v| v.lat.to_string())
                .unwrap_or_default(),
            record
                .check_in_loc
                .as_ref()
                .map(|v| v.lng.to_string())
                .unwrap_or_default(),
            record
                .check_out_loc
                .as_ref()
                .map(|v| v.lat.to_string())
                .unwrap_or_default(),
            record
                .check_out_loc
                .as_ref()
                .map(|v| v.lng.to_string())
                .unwrap_or_default(),
        ];
        let line = fields.into_iter().map(escape_field).collect::<Vec<_>>().join(",");
        document.push_str(&line);
        document.push('\n');
    }

    document
}

/// Millisecond precision with a `Z` suffix, the form spreadsheet tools already expect from
/// exports of the earlier versions.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A field gets wrapped in quotes when it contains a comma, a quote or a line break, with
/// every embedded quote doubled.
fn escape_field(field: String) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}
