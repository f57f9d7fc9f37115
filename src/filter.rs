/// Filter Engine
///
/// Reduces a derived city table to the rows matching a month and/or weekday
/// selection. Selections are parsed from user tokens ("all", a month name, a
/// weekday name; case-insensitive) and applied conjunctively. The result is a
/// `View`; the table itself is never modified.
///
/// Only January to June can be selected as a month. The datasets span those
/// six months and the month table deliberately stops there.

use crate::error::{Result, TripError};
use crate::temporal::{self, MONTH_COLUMN, WEEKDAY_COLUMN};
use crate::table::Table;
use crate::view::View;
use log::debug;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const ALL: &str = "all";

/// Month selection: every month, or one month number from the filter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonthFilter {
    All,
    Month(i64),
}

impl MonthFilter {
    pub fn is_all(&self) -> bool {
        matches!(self, MonthFilter::All)
    }

    /// Reject month numbers outside the filterable range.
    pub fn validate(self) -> Result<Self> {
        match self {
            MonthFilter::Month(m) if !(1..=temporal::FILTER_MONTHS.len() as i64).contains(&m) => {
                Err(TripError::InvalidSelection {
                    field: "month",
                    value: m.to_string(),
                })
            }
            valid => Ok(valid),
        }
    }
}

impl FromStr for MonthFilter {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case(ALL) {
            return Ok(MonthFilter::All);
        }
        temporal::filter_month_number(s)
            .map(MonthFilter::Month)
            .ok_or_else(|| TripError::InvalidSelection {
                field: "month",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthFilter::All => f.write_str(ALL),
            MonthFilter::Month(m) => match temporal::month_name(*m) {
                Some(name) => f.write_str(name),
                None => write!(f, "{}", m),
            },
        }
    }
}

/// Day selection: every day, or one canonical weekday name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DayFilter {
    All,
    Day(&'static str),
}

impl DayFilter {
    pub fn is_all(&self) -> bool {
        matches!(self, DayFilter::All)
    }
}

impl FromStr for DayFilter {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case(ALL) {
            return Ok(DayFilter::All);
        }
        temporal::canonical_weekday(s)
            .map(DayFilter::Day)
            .ok_or_else(|| TripError::InvalidSelection {
                field: "day",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for DayFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayFilter::All => f.write_str(ALL),
            DayFilter::Day(d) => f.write_str(d),
        }
    }
}

/// Apply month and day selections to a table carrying derived `month` and
/// `weekday` columns.
pub fn apply(table: &Table, month: MonthFilter, day: DayFilter) -> Result<View<'_>> {
    let months = match month.validate()? {
        MonthFilter::All => None,
        MonthFilter::Month(m) => Some((table.column(MONTH_COLUMN)?, m)),
    };

    // Compare interned IDs instead of strings; an unseen weekday matches nothing
    let days = match day {
        DayFilter::All => None,
        DayFilter::Day(d) => {
            let col = table.column(WEEKDAY_COLUMN)?;
            let id = col
                .interner()
                .and_then(|interner| interner.borrow().lookup(d));
            Some((col, id))
        }
    };

    let view = View::filtered(table, |i| {
        if let Some((col, m)) = months {
            if col.get_i64(i) != Some(m) {
                return Ok(false);
            }
        }
        if let Some((col, id)) = days {
            if id.is_none() || col.string_id(i) != id {
                return Ok(false);
            }
        }
        Ok(true)
    })?;

    debug!(
        "{}: filter month={} day={} kept {} of {} rows",
        table.name(),
        month,
        day,
        view.len(),
        table.len()
    );
    Ok(view)
}

/// Parse `month` and `day` tokens and apply them.
pub fn filter<'a>(table: &'a Table, month: &str, day: &str) -> Result<View<'a>> {
    apply(table, month.parse()?, day.parse()?)
}
