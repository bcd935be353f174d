pub mod range;
pub mod render;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use range::RangeArgs;
use tracing::level_filters::LevelFilter;

use crate::{
    attendance::{
        export::to_csv,
        query::{self, ListFilter},
        AttendanceTracker, PunchOptions,
    },
    store::{
        entities::{RawLocation, RecordKey},
        record_store::JsonFileStore,
    },
    utils::{
        clock::DefaultClock, dir::create_application_default_path, logging::enable_logging,
    },
};

#[derive(Parser, Debug)]
#[command(name = "Punchclock", version, long_about = None)]
#[command(about = "Local-first punch clock for tracking daily attendance", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Record the start of today's shift")]
    CheckIn {
        #[arg(long, short, help = "User the punch belongs to")]
        user: String,
        #[command(flatten)]
        punch: PunchArgs,
    },
    #[command(about = "Record the end of today's shift")]
    CheckOut {
        #[arg(long, short, help = "User the punch belongs to")]
        user: String,
        #[command(flatten)]
        punch: PunchArgs,
    },
    #[command(about = "Show today's record of a user")]
    Today {
        #[arg(long, short, help = "User to look up")]
        user: String,
    },
    #[command(about = "Show the most recent records of a user")]
    History {
        #[arg(long, short, help = "User to look up")]
        user: String,
        #[arg(long, default_value_t = 60, help = "Number of days to show")]
        limit: usize,
    },
    #[command(about = "List records across all users, newest first")]
    List {
        #[arg(long, short, help = "Only show records of this user")]
        user: Option<String>,
        #[command(flatten)]
        range: RangeArgs,
    },
    #[command(about = "Export records as a CSV document")]
    Export {
        #[arg(long, short, help = "Only export records of this user")]
        user: Option<String>,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(
            long,
            short,
            help = "Write into a file instead of stdout, for example attendance.csv"
        )]
        output: Option<PathBuf>,
    },
    #[command(about = "Delete a single record")]
    Delete {
        #[arg(long, short, help = "Owner of the record")]
        user: String,
        #[arg(long, help = "Day of the record, for example 2025-03-14")]
        date: NaiveDate,
    },
    #[command(about = "Delete many records in one pass")]
    BulkDelete {
        #[arg(value_name = "USER:DATE", help = "Records to delete, for example ann:2025-03-14")]
        keys: Vec<String>,
        #[arg(
            long,
            help = "JSON file with [{\"username\": \"ann\", \"date\": \"2025-03-14\"}] entries"
        )]
        file: Option<PathBuf>,
    },
}

/// Evidence flags shared by both punch commands.
#[derive(Debug, clap::Args)]
struct PunchArgs {
    #[arg(long, help = "Reference to an already stored photo, for example a path or URL")]
    photo: Option<String>,
    #[arg(long, requires = "lng", help = "Latitude of the device")]
    lat: Option<f64>,
    #[arg(long, requires = "lat", help = "Longitude of the device")]
    lng: Option<f64>,
    #[arg(long, requires = "lat", help = "Reported accuracy of the coordinates in meters")]
    accuracy: Option<f64>,
}

impl From<PunchArgs> for PunchOptions {
    fn from(args: PunchArgs) -> Self {
        let location = match (args.lat, args.lng) {
            (Some(lat), Some(lng)) => Some(RawLocation {
                lat,
                lng,
                accuracy: args.accuracy,
                timestamp: None,
            }),
            _ => None,
        };
        PunchOptions {
            photo: args.photo,
            location,
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let app_dir = args
        .dir
        .clone()
        .map_or_else(create_application_default_path, Ok)?;
    enable_logging(&app_dir, logging_level, args.log)?;

    let store = JsonFileStore::new(app_dir.join("data"))?;
    let tracker = AttendanceTracker::new(store, Box::new(DefaultClock));

    match args.commands {
        Commands::CheckIn { user, punch } => {
            let record = tracker.check_in(&user, punch.into()).await?;
            println!("Checked in");
            render::print_record(&record, Utc::now());
            Ok(())
        }
        Commands::CheckOut { user, punch } => {
            let record = tracker.check_out(&user, punch.into()).await?;
            println!("Checked out");
            render::print_record(&record, Utc::now());
            Ok(())
        }
        Commands::Today { user } => {
            match tracker.today_record(&user).await? {
                Some(record) => render::print_record(&record, Utc::now()),
                None => println!("No record of {user} on {}", tracker.today()),
            }
            Ok(())
        }
        Commands::History { user, limit } => {
            let records = tracker.history(&user, limit).await?;
            let rows = query::annotate(records, Utc::now());
            render::print_listing(&rows, false);
            render::print_summary(&query::summarize(&rows));
            Ok(())
        }
        Commands::List { user, range } => {
            let rows = tracker.list(build_filter(user, range)?).await?;
            render::print_listing(&rows, true);
            render::print_summary(&query::summarize(&rows));
            Ok(())
        }
        Commands::Export { user, range, output } => {
            let rows = tracker.list(build_filter(user, range)?).await?;
            let document = to_csv(&rows);
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &document).await?;
                    println!("Exported {} records into {}", rows.len(), path.display());
                }
                None => print!("{document}"),
            }
            Ok(())
        }
        Commands::Delete { user, date } => {
            tracker.delete_record(&user, date).await?;
            println!("Deleted record of {user} on {date}");
            Ok(())
        }
        Commands::BulkDelete { keys, file } => {
            let keys = collect_delete_keys(keys, file).await?;
            let deleted = tracker.bulk_delete(keys).await?;
            println!("Deleted {deleted} records");
            Ok(())
        }
    }
}

fn build_filter(username: Option<String>, range: RangeArgs) -> Result<ListFilter> {
    let (from, to) = range.resolve()?;
    Ok(ListFilter { from, to, username })
}

async fn collect_delete_keys(keys: Vec<String>, file: Option<PathBuf>) -> Result<Vec<RecordKey>> {
    let mut parsed = keys
        .iter()
        .map(|raw| parse_delete_key(raw))
        .collect::<Result<Vec<_>>>()?;
    if let Some(path) = file {
        let body = tokio::fs::read_to_string(&path).await?;
        let mut from_file: Vec<RecordKey> = serde_json::from_str(&body)?;
        parsed.append(&mut from_file);
    }
    if parsed.is_empty() {
        return Err(Args::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "Provide USER:DATE keys or --file",
            )
            .into());
    }
    Ok(parsed)
}

fn parse_delete_key(raw: &str) -> Result<RecordKey> {
    let parts = raw
        .split_once(':')
        .map(|(username, date)| (username, date.parse::<NaiveDate>()));
    match parts {
        Some((username, Ok(date))) => Ok(RecordKey {
            username: username.to_owned(),
            date,
        }),
        _ => Err(Args::command()
            .error(
                ErrorKind::ValueValidation,
                format!("Expected USER:YYYY-MM-DD, got \"{raw}\""),
            )
            .into()),
    }
}
