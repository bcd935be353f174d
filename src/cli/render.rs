//! Terminal rendering of records and listings.

use ansi_term::{Colour, Style};
use chrono::{DateTime, Local, Utc};

use crate::{
    attendance::query::{duration_seconds, ListSummary, ListedRecord},
    store::entities::{AttendanceRecord, GeoPoint},
    utils::time::hms,
};

/// Prints one record in a multi-line form, with the live duration for open records.
pub fn print_record(record: &AttendanceRecord, now: DateTime<Utc>) {
    let bold = Style::new().bold();
    println!(
        "{} {}",
        bold.paint(record.date.to_string()),
        record.username
    );
    println!(
        "  in   {}",
        format_punch(
            record.check_in_at,
            record.check_in_photo.as_deref(),
            record.check_in_loc.as_ref(),
        )
    );
    println!(
        "  out  {}",
        format_punch(
            record.check_out_at,
            record.check_out_photo.as_deref(),
            record.check_out_loc.as_ref(),
        )
    );
    let duration = hms(duration_seconds(record, now));
    if record.is_open() {
        println!("  took {duration} {}", Colour::Yellow.paint("open"));
    } else {
        println!("  took {duration}");
    }
}

/// Prints listing rows as a table, one line per record. The user column only makes sense
/// for multi-user listings and is dropped from single-user history output.
pub fn print_listing(rows: &[ListedRecord], show_user: bool) {
    if rows.is_empty() {
        println!("No records found");
        return;
    }

    let mut header = format!("{:<12}", "Date");
    if show_user {
        header.push_str(&format!("{:<18}", "User"));
    }
    header.push_str(&format!("{:<10}{:<10}{}", "In", "Out", "Duration"));
    println!("{}", Style::new().bold().paint(header));

    for row in rows {
        let record = &row.record;
        let mut line = format!("{:<12}", record.date.to_string());
        if show_user {
            line.push_str(&format!("{:<18}", record.username));
        }
        line.push_str(&format!(
            "{:<10}{:<10}{}",
            format_time(record.check_in_at),
            format_time(record.check_out_at),
            row.duration_human,
        ));
        if record.is_open() {
            println!("{line} {}", Colour::Yellow.paint("open"));
        } else {
            println!("{line}");
        }
    }
}

/// Prints the roll-up footer under a listing.
pub fn print_summary(summary: &ListSummary) {
    println!();
    println!(
        "{} days, {} completed, {} open, {} logged",
        summary.days,
        summary.completed,
        summary.open,
        hms(summary.total_seconds),
    );
}

fn format_punch(at: Option<DateTime<Utc>>, photo: Option<&str>, loc: Option<&GeoPoint>) -> String {
    let Some(at) = at else {
        return "-".to_owned();
    };
    let mut line = at.with_timezone(&Local).format("%H:%M:%S").to_string();
    if let Some(photo) = photo {
        line.push_str(&format!("  photo {photo}"));
    }
    if let Some(loc) = loc {
        line.push_str(&format!("  at {}", format_location(loc)));
    }
    line
}

fn format_location(loc: &GeoPoint) -> String {
    match loc.accuracy {
        Some(accuracy) => format!("{},{} (accuracy {accuracy}m)", loc.lat, loc.lng),
        None => format!("{},{}", loc.lat, loc.lng),
    }
}

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|v| v.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_owned())
}
