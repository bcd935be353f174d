//! Shared `--from`/`--to` options of the listing commands.

use std::fmt::Display;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use chrono_english::Dialect;
use clap::{error::ErrorKind, CommandFactory, ValueEnum};

use crate::utils::time::parse_day_arg;

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Dialect::Uk,
            DateStyle::Us => Dialect::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct RangeArgs {
    #[arg(
        long,
        help = "Start of the range, inclusive. Examples are \"2025-03-14\", \"yesterday\", \"last friday\""
    )]
    from: Option<String>,
    #[arg(
        long,
        help = "End of the range, inclusive. Examples are \"2025-03-14\", \"today\""
    )]
    to: Option<String>,
    #[arg(
        long,
        default_value_t = DateStyle::Uk,
        help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year"
    )]
    date_style: DateStyle,
}

impl RangeArgs {
    /// Resolves both ends of the range into calendar days, reporting unparseable input the
    /// same way clap reports a broken argument.
    pub fn resolve(self) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        let now = Local::now();
        let dialect: Dialect = self.date_style.into();

        let from = match self.from.map(|v| parse_day_arg(&v, now, dialect)) {
            Some(Ok(v)) => Some(v),
            Some(Err(e)) => {
                return Err(Args::command()
                    .error(
                        ErrorKind::ValueValidation,
                        format!("Failed to validate from date {e}"),
                    )
                    .into());
            }
            None => None,
        };
        let to = match self.to.map(|v| parse_day_arg(&v, now, dialect)) {
            Some(Ok(v)) => Some(v),
            Some(Err(e)) => {
                return Err(Args::command()
                    .error(
                        ErrorKind::ValueValidation,
                        format!("Failed to validate to date {e}"),
                    )
                    .into());
            }
            None => None,
        };
        Ok((from, to))
    }
}
