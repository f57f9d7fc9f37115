/// Statistics Aggregator
///
/// Four independent statistic groups over a (possibly filtered) `View`:
///
/// - time: most common month, weekday and start hour
/// - station: most common start station, end station and trip
/// - duration: total and mean trip duration
/// - user: user type, gender and birth year distributions
///
/// Every group returns its own `Result` wrapped in `Timed`, so a failure in one
/// group does not prevent the others from being computed. Results are plain
/// data (and `Serialize`); rendering is left to the caller.
///
/// # Mode
///
/// The mode of a column is its most frequent non-null value. Ties go to the
/// value that appears first in the view.
///
/// ```
/// use tripstats::FrequencyResult;
///
/// let freq = FrequencyResult::from_values(["A", "B", "A", "B"].map(Some));
/// assert_eq!(freq.mode(), Some(&"A"));
/// assert_eq!(freq.count(&"B"), 2);
/// ```

use crate::city::{BIRTH_YEAR, END_STATION, GENDER, START_STATION, TRIP_DURATION, USER_TYPE};
use crate::column::{ColumnType, ColumnValue};
use crate::error::Result;
use crate::filter::{DayFilter, MonthFilter};
use crate::interner::StringId;
use crate::temporal::{self, MONTH_COLUMN, WEEKDAY_COLUMN};
use crate::view::View;
use log::warn;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Joins start and end station into a trip label.
pub const TRIP_SEPARATOR: &str = "   >>   ";

pub const HOUR_COLUMN: &str = "hour";
pub const TRIP_COLUMN: &str = "trip";

// ============================================================================
// Frequency counting
// ============================================================================

/// Occurrence counts of distinct values, in first-encountered order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyResult<T> {
    entries: Vec<(T, usize)>,
    /// Null cells skipped while counting
    missing: usize,
}

impl<T: Eq + Hash + Clone> FrequencyResult<T> {
    /// Count values; `None` items are tallied as missing.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<T>>,
    {
        let mut positions: HashMap<T, usize> = HashMap::new();
        let mut entries: Vec<(T, usize)> = Vec::new();
        let mut missing = 0;

        for value in values {
            let Some(value) = value else {
                missing += 1;
                continue;
            };
            match positions.get(&value) {
                Some(&pos) => entries[pos].1 += 1,
                None => {
                    positions.insert(value.clone(), entries.len());
                    entries.push((value, 1));
                }
            }
        }

        FrequencyResult { entries, missing }
    }
}

impl<T> FrequencyResult<T> {
    /// Most frequent value; ties go to the first encountered.
    pub fn mode(&self) -> Option<&T> {
        self.mode_entry().map(|(value, _)| value)
    }

    fn mode_entry(&self) -> Option<&(T, usize)> {
        self.entries
            .iter()
            .fold(None, |best: Option<&(T, usize)>, entry| match best {
                Some(b) if b.1 >= entry.1 => Some(b),
                _ => Some(entry),
            })
    }

    /// Distinct values and their counts in first-encountered order.
    pub fn entries(&self) -> &[(T, usize)] {
        &self.entries
    }

    /// Entries sorted by descending count; equal counts keep first-encountered order.
    pub fn by_count(&self) -> Vec<(&T, usize)> {
        let mut sorted: Vec<(&T, usize)> = self.entries.iter().map(|(v, c)| (v, *c)).collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }

    /// Number of non-null values counted.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    pub fn missing(&self) -> usize {
        self.missing
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn map<U>(self, mut f: impl FnMut(T) -> U) -> FrequencyResult<U> {
        FrequencyResult {
            entries: self.entries.into_iter().map(|(v, c)| (f(v), c)).collect(),
            missing: self.missing,
        }
    }
}

impl<T: PartialEq> FrequencyResult<T> {
    pub fn count(&self, value: &T) -> usize {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }
}

/// Count a string column over the view's rows, working on interned IDs.
fn string_frequencies(view: &View<'_>, column: &str) -> Result<FrequencyResult<String>> {
    let col = view.table().column(column)?;
    let ids = FrequencyResult::<StringId>::from_values(view.indices().iter().map(|&i| col.string_id(i)));
    Ok(ids.map(|id| col.resolve(id).unwrap_or_default()))
}

/// Count an integer-valued column (INT64, or FLOAT64 holding whole numbers).
///
/// Non-finite floats have no integer value and are tallied as missing.
fn integer_frequencies(view: &View<'_>, column: &str) -> Result<FrequencyResult<i64>> {
    let col = view.table().column(column)?;
    Ok(FrequencyResult::from_values(view.indices().iter().map(|&i| {
        col.get_f64(i)
            .filter(|v| v.is_finite())
            .map(|v| v as i64)
    })))
}

// ============================================================================
// Result types
// ============================================================================

/// A most-frequent value together with its count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mode<T> {
    pub value: T,
    pub count: usize,
}

impl<T: Clone> Mode<T> {
    fn of(freq: &FrequencyResult<T>) -> FieldStat<Mode<T>> {
        match freq.mode_entry() {
            Some((value, count)) => FieldStat::Available(Mode {
                value: value.clone(),
                count: *count,
            }),
            None => FieldStat::NoData,
        }
    }
}

/// Outcome for a single reported field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum FieldStat<T> {
    Available(T),
    /// The city's schema has no such column
    Unavailable,
    /// The column exists but the view holds no non-null values
    NoData,
}

impl<T> FieldStat<T> {
    pub fn available(&self) -> Option<&T> {
        match self {
            FieldStat::Available(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FieldStat::Unavailable)
    }
}

/// A statistic group's result and the wall-clock time it took.
#[derive(Debug, Clone, Serialize)]
pub struct Timed<T> {
    pub result: T,
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

fn timed<T>(compute: impl FnOnce() -> Result<T>) -> Result<Timed<T>> {
    let start = Instant::now();
    let result = compute()?;
    Ok(Timed {
        result,
        elapsed: start.elapsed(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeStats {
    /// Month name; `None` when the month was fixed by the filter
    pub month: Option<FieldStat<Mode<String>>>,
    /// Weekday name; `None` when the day was fixed by the filter
    pub day: Option<FieldStat<Mode<String>>>,
    pub hour: FieldStat<Mode<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationStats {
    pub start_station: FieldStat<Mode<String>>,
    pub end_station: FieldStat<Mode<String>>,
    /// Label is `start + TRIP_SEPARATOR + end`
    pub trip: FieldStat<Mode<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IntegrityIssue {
    MissingDuration,
    NegativeDuration(f64),
    NonFiniteDuration,
}

/// A row excluded from duration totals, identified by its table row index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataIntegrityWarning {
    pub row: usize,
    pub issue: IntegrityIssue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationStats {
    pub total_seconds: f64,
    /// Rows contributing to the total
    pub count: usize,
    /// `None` when no row contributed
    pub mean_seconds: Option<f64>,
    /// Rows left out of the total, one warning each
    pub warnings: Vec<DataIntegrityWarning>,
}

impl DurationStats {
    pub fn excluded(&self) -> usize {
        self.warnings.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BirthYearStats {
    pub earliest: i64,
    pub most_recent: i64,
    pub most_common: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub user_types: FrequencyResult<String>,
    pub gender: FieldStat<FrequencyResult<String>>,
    pub birth_year: FieldStat<BirthYearStats>,
}

// ============================================================================
// Statistic groups
// ============================================================================

/// Most common month, weekday and start hour.
///
/// Month and weekday are only reported when the filter left them open;
/// the hour is always reported.
pub fn time_stats(view: &View<'_>, month: MonthFilter, day: DayFilter) -> Result<Timed<TimeStats>> {
    timed(|| {
        let month = if month.is_all() {
            let freq = integer_frequencies(view, MONTH_COLUMN)?;
            let named = freq.map(|m| {
                temporal::month_name(m)
                    .map(str::to_string)
                    .unwrap_or_else(|| m.to_string())
            });
            Some(Mode::of(&named))
        } else {
            None
        };

        let day = if day.is_all() {
            Some(Mode::of(&string_frequencies(view, WEEKDAY_COLUMN)?))
        } else {
            None
        };

        let table = view.table();
        let hours = view.computed_column(HOUR_COLUMN, ColumnType::Int64, |i| {
            temporal::start_time(table, i).map(|ts| ColumnValue::Int64(temporal::hour_of_day(&ts)))
        })?;
        let hour_freq = FrequencyResult::from_values((0..hours.len()).map(|i| hours.get_i64(i)));

        Ok(TimeStats {
            month,
            day,
            hour: Mode::of(&hour_freq),
        })
    })
}

/// Most common start station, end station and start/end combination.
pub fn station_stats(view: &View<'_>) -> Result<Timed<StationStats>> {
    timed(|| {
        let table = view.table();
        let start = table.column(START_STATION)?;
        let end = table.column(END_STATION)?;

        let trips = view.computed_column(TRIP_COLUMN, ColumnType::String, |i| {
            Ok(match (start.get(i)?, end.get(i)?) {
                (ColumnValue::String(s), ColumnValue::String(e)) => {
                    ColumnValue::String(format!("{}{}{}", s, TRIP_SEPARATOR, e))
                }
                _ => ColumnValue::Null,
            })
        })?;
        let trip_freq = FrequencyResult::<StringId>::from_values((0..trips.len()).map(|i| trips.string_id(i)))
            .map(|id| trips.resolve(id).unwrap_or_default());

        Ok(StationStats {
            start_station: Mode::of(&string_frequencies(view, START_STATION)?),
            end_station: Mode::of(&string_frequencies(view, END_STATION)?),
            trip: Mode::of(&trip_freq),
        })
    })
}

/// Total and mean trip duration in seconds.
///
/// Missing, negative or non-finite durations are left out of both numbers and
/// reported as `DataIntegrityWarning`s.
pub fn duration_stats(view: &View<'_>) -> Result<Timed<DurationStats>> {
    timed(|| {
        let col = view.table().column(TRIP_DURATION)?;
        let mut total_seconds = 0.0;
        let mut count = 0;
        let mut warnings = Vec::new();

        for &row in view.indices() {
            let issue = match col.get_f64(row) {
                None => Some(IntegrityIssue::MissingDuration),
                Some(d) if !d.is_finite() => Some(IntegrityIssue::NonFiniteDuration),
                Some(d) if d < 0.0 => Some(IntegrityIssue::NegativeDuration(d)),
                Some(d) => {
                    total_seconds += d;
                    count += 1;
                    None
                }
            };
            if let Some(issue) = issue {
                warnings.push(DataIntegrityWarning { row, issue });
            }
        }

        if !warnings.is_empty() {
            warn!(
                "{}: {} trip duration(s) excluded from totals",
                view.table().name(),
                warnings.len()
            );
        }

        Ok(DurationStats {
            total_seconds,
            count,
            mean_seconds: (count > 0).then(|| total_seconds / count as f64),
            warnings,
        })
    })
}

/// User type counts, plus gender counts and birth year extremes where the
/// city records them.
pub fn user_stats(view: &View<'_>) -> Result<Timed<UserStats>> {
    timed(|| {
        let table = view.table();

        let gender = if table.has_column(GENDER) {
            FieldStat::Available(string_frequencies(view, GENDER)?)
        } else {
            FieldStat::Unavailable
        };

        let birth_year = if table.has_column(BIRTH_YEAR) {
            let years = integer_frequencies(view, BIRTH_YEAR)?;
            let earliest = years.entries().iter().map(|(y, _)| *y).min();
            let most_recent = years.entries().iter().map(|(y, _)| *y).max();
            match (earliest, most_recent, years.mode()) {
                (Some(earliest), Some(most_recent), Some(&most_common)) => FieldStat::Available(BirthYearStats {
                    earliest,
                    most_recent,
                    most_common,
                }),
                _ => FieldStat::NoData,
            }
        } else {
            FieldStat::Unavailable
        };

        Ok(UserStats {
            user_types: string_frequencies(view, USER_TYPE)?,
            gender,
            birth_year,
        })
    })
}
