/// Temporal field derivation
///
/// Parses each row's start timestamp and derives a `month` (1-12) and a
/// `weekday` (canonical capitalised name) column. Derivation returns a new
/// table sharing the source columns; the source table is left untouched.

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{Result, TripError};
use crate::table::{parse_datetime, Table};
use chrono::{Datelike, NaiveDateTime, Timelike};
use log::debug;

pub const START_TIME: &str = "Start Time";
pub const MONTH_COLUMN: &str = "month";
pub const WEEKDAY_COLUMN: &str = "weekday";

/// Month names used when reporting a month number back to the user.
pub const MONTH_NAMES: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

/// Months accepted as filter selections. The datasets only span January to
/// June, so the filter table stops there.
pub const FILTER_MONTHS: [&str; 6] = ["january", "february", "march", "april", "may", "june"];

/// Canonical weekday names, Monday first.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// Month number (1-12) to lower-case name.
pub fn month_name(month: i64) -> Option<&'static str> {
    usize::try_from(month)
        .ok()
        .and_then(|m| m.checked_sub(1))
        .and_then(|i| MONTH_NAMES.get(i).copied())
}

/// Filterable month name (case-insensitive) to its ordinal, january = 1.
pub fn filter_month_number(name: &str) -> Option<i64> {
    FILTER_MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name.trim()))
        .map(|i| i as i64 + 1)
}

/// Case-insensitive weekday name to its canonical capitalisation.
pub fn canonical_weekday(name: &str) -> Option<&'static str> {
    WEEKDAY_NAMES
        .iter()
        .find(|d| d.eq_ignore_ascii_case(name.trim()))
        .copied()
}

pub fn weekday_name(ts: &NaiveDateTime) -> &'static str {
    WEEKDAY_NAMES[ts.weekday().num_days_from_monday() as usize]
}

pub fn hour_of_day(ts: &NaiveDateTime) -> i64 {
    ts.hour() as i64
}

/// Read the start timestamp of `row`, accepting either a DATETIME column or a
/// STRING column holding timestamp text.
pub fn start_time(table: &Table, row: usize) -> Result<NaiveDateTime> {
    let col = table
        .column(START_TIME)
        .map_err(|_| TripError::malformed(0, START_TIME, "column missing"))?;

    if let Some(ts) = col.get_datetime(row) {
        return Ok(ts);
    }

    // Tables not loaded from text count the header as line 1
    let line = table.source_line(row).unwrap_or(row + 2);
    match col.get(row)? {
        ColumnValue::DateTime(ts) => Ok(ts),
        ColumnValue::String(s) => parse_datetime(&s)
            .ok_or_else(|| TripError::malformed(line, START_TIME, format!("cannot parse '{}' as a timestamp", s))),
        ColumnValue::Null => Err(TripError::malformed(line, START_TIME, "missing timestamp")),
        other => Err(TripError::malformed(line, START_TIME, format!("not a timestamp: {}", other))),
    }
}

/// Derive `month` and `weekday` columns from the start timestamp.
///
/// Fails on the first row whose timestamp is missing or unparsable; no row is
/// ever dropped silently.
pub fn derive(table: &Table) -> Result<Table> {
    let mut months = Column::new(MONTH_COLUMN, ColumnType::Int64, false);
    let mut weekdays = Column::new(WEEKDAY_COLUMN, ColumnType::String, false);

    for row in 0..table.len() {
        let ts = start_time(table, row)?;
        months.append(ColumnValue::Int64(ts.month() as i64))?;
        weekdays.append(ColumnValue::String(weekday_name(&ts).to_string()))?;
    }

    debug!("{}: derived month/weekday for {} rows", table.name(), table.len());
    table.with_columns(vec![months, weekdays])
}
