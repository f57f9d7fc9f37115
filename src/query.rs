/// One query cycle: load a city, derive temporal fields, filter, and compute
/// the four statistic groups.
///
/// Loading and derivation failures abort the cycle. Each statistic group keeps
/// its own `Result`, so a failure in one group leaves the others reportable.

use crate::city::{City, RecordStore};
use crate::error::{Result, TripError};
use crate::filter::{self, DayFilter, MonthFilter};
use crate::stats::{self, DurationStats, StationStats, TimeStats, Timed, UserStats};
use crate::table::Table;
use crate::temporal;
use log::debug;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt::Display;

/// A validated (city, month, day) selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Selection {
    #[serde(serialize_with = "display")]
    pub city: City,
    #[serde(serialize_with = "display")]
    pub month: MonthFilter,
    #[serde(serialize_with = "display")]
    pub day: DayFilter,
}

impl Selection {
    pub fn new(city: City, month: MonthFilter, day: DayFilter) -> Self {
        Selection { city, month, day }
    }

    /// Parse user tokens, e.g. `("chicago", "march", "all")`.
    pub fn parse(city: &str, month: &str, day: &str) -> Result<Self> {
        let city = city.parse().map_err(|_| TripError::InvalidSelection {
            field: "city",
            value: city.to_string(),
        })?;
        Ok(Selection::new(city, month.parse()?, day.parse()?))
    }
}

fn display<T: Display, S: Serializer>(value: &T, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// Statistics for one selection.
#[derive(Debug, serde::Serialize)]
pub struct QueryReport {
    pub selection: Selection,
    /// Rows in the city dataset
    pub total_rows: usize,
    /// Rows left after filtering
    pub matched_rows: usize,
    #[serde(serialize_with = "group")]
    pub time: Result<Timed<TimeStats>>,
    #[serde(serialize_with = "group")]
    pub stations: Result<Timed<StationStats>>,
    #[serde(serialize_with = "group")]
    pub durations: Result<Timed<DurationStats>>,
    #[serde(serialize_with = "group")]
    pub users: Result<Timed<UserStats>>,
}

fn group<T: Serialize, S: Serializer>(result: &Result<Timed<T>>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match result {
        Ok(timed) => timed.serialize(s),
        Err(e) => {
            let mut map = s.serialize_map(Some(1))?;
            map.serialize_entry("error", &e.to_string())?;
            map.end()
        }
    }
}

/// The loaded city table together with the report computed from it.
///
/// `table` is the unfiltered dataset, as browsed by the raw row paginator.
#[derive(Debug)]
pub struct QueryCycle {
    pub table: Table,
    pub report: QueryReport,
}

/// Run a full query cycle against the record store.
pub fn run_query(store: &RecordStore, selection: &Selection) -> Result<QueryCycle> {
    let table = store.load(selection.city)?;
    let report = analyze(&table, selection)?;
    Ok(QueryCycle { table, report })
}

/// Derive, filter and aggregate an already loaded table.
pub fn analyze(table: &Table, selection: &Selection) -> Result<QueryReport> {
    let derived = temporal::derive(table)?;
    let view = filter::apply(&derived, selection.month, selection.day)?;

    let report = QueryReport {
        selection: *selection,
        total_rows: table.len(),
        matched_rows: view.len(),
        time: stats::time_stats(&view, selection.month, selection.day),
        stations: stats::station_stats(&view),
        durations: stats::duration_stats(&view),
        users: stats::user_stats(&view),
    };

    debug!(
        "{}: query {} / {} matched {} of {} rows",
        table.name(),
        selection.month,
        selection.day,
        report.matched_rows,
        report.total_rows
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;
    use crate::stats::FieldStat;
    use crate::table::Schema;
    use std::fs;

    const NEW_YORK: &str = "\
,Start Time,End Time,Trip Duration,Start Station,End Station,User Type,Gender,Birth Year
5688089,2017-06-11 14:55:05,2017-06-11 15:08:21,795,Suffolk St & Stanton St,W Broadway & Spring St,Subscriber,Male,1998.0
4096714,2017-05-11 15:30:11,2017-05-11 15:41:43,692,Lexington Ave & E 63 St,1 Ave & E 78 St,Subscriber,Male,1981.0
2173887,2017-03-29 13:26:26,2017-03-29 13:48:31,1325,1 Pl & Clinton St,Henry St & Degraw St,Subscriber,Male,1987.0
3945638,2017-05-08 19:47:18,2017-05-08 19:59:01,703,Barrow St & Hudson St,W 20 St & 8 Ave,Subscriber,Female,1986.0
6208972,2017-06-21 07:49:16,2017-06-21 07:53:00,224,1 Ave & E 18 St,E 24 St & Park Ave S,Customer,,
";

    const WASHINGTON: &str = "\
,Start Time,End Time,Trip Duration,Start Station,End Station,User Type
1621326,2017-06-21 08:36:34,2017-06-21 08:44:43,489.066,14th & Belmont St NW,15th & K St NW,Subscriber
482740,2017-03-11 10:40:00,2017-03-11 10:46:00,402.549,Yuma St & Tenley Circle NW,Connecticut Ave & Yuma St NW,Subscriber
";

    fn store() -> (tempfile::TempDir, RecordStore) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("new_york_city.csv"), NEW_YORK).unwrap();
        fs::write(dir.path().join("washington.csv"), WASHINGTON).unwrap();
        let store = RecordStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_selection_parse() {
        let selection = Selection::parse("New York City", "JUNE", "all").unwrap();
        assert_eq!(selection.city, City::NewYorkCity);
        assert_eq!(selection.month, MonthFilter::Month(6));
        assert_eq!(selection.day, DayFilter::All);

        assert!(matches!(
            Selection::parse("boston", "all", "all"),
            Err(TripError::InvalidSelection { field: "city", .. })
        ));
        assert!(matches!(
            Selection::parse("chicago", "july", "all"),
            Err(TripError::InvalidSelection { field: "month", .. })
        ));
    }

    #[test]
    fn test_run_query() {
        let (_dir, store) = store();
        let selection = Selection::parse("new york city", "june", "all").unwrap();
        let cycle = run_query(&store, &selection).unwrap();
        let report = &cycle.report;

        assert_eq!(cycle.table.len(), 5);
        assert_eq!(report.total_rows, 5);
        assert_eq!(report.matched_rows, 2);

        let time = &report.time.as_ref().unwrap().result;
        assert!(time.month.is_none());
        assert!(time.day.is_some());

        let durations = &report.durations.as_ref().unwrap().result;
        assert_eq!(durations.total_seconds, 1019.0);
        assert_eq!(durations.count, 2);

        let users = &report.users.as_ref().unwrap().result;
        assert_eq!(users.user_types.count(&"Customer".to_string()), 1);
        assert_eq!(users.gender.available().unwrap().missing(), 1);
    }

    #[test]
    fn test_unfiltered_table_is_not_derived() {
        let (_dir, store) = store();
        let selection = Selection::parse("washington", "march", "saturday").unwrap();
        let cycle = run_query(&store, &selection).unwrap();
        assert!(!cycle.table.has_column(temporal::MONTH_COLUMN));
        assert_eq!(cycle.report.matched_rows, 1);
    }

    #[test]
    fn test_washington_reports_unavailable_demographics() {
        let (_dir, store) = store();
        let selection = Selection::parse("washington", "all", "all").unwrap();
        let report = run_query(&store, &selection).unwrap().report;

        let users = &report.users.as_ref().unwrap().result;
        assert_eq!(users.gender, FieldStat::Unavailable);
        assert_eq!(users.birth_year, FieldStat::Unavailable);
    }

    #[test]
    fn test_repeated_queries_agree() {
        let (_dir, store) = store();
        let selection = Selection::parse("new york city", "all", "all").unwrap();
        let first = run_query(&store, &selection).unwrap().report;
        let second = run_query(&store, &selection).unwrap().report;

        assert_eq!(first.time.unwrap().result, second.time.unwrap().result);
        assert_eq!(first.stations.unwrap().result, second.stations.unwrap().result);
        assert_eq!(first.durations.unwrap().result, second.durations.unwrap().result);
        assert_eq!(first.users.unwrap().result, second.users.unwrap().result);
    }

    #[test]
    fn test_missing_dataset_aborts_cycle() {
        let (_dir, store) = store();
        let selection = Selection::parse("chicago", "all", "all").unwrap();
        assert!(matches!(
            run_query(&store, &selection),
            Err(TripError::DatasetNotFound { .. })
        ));
    }

    #[test]
    fn test_failing_group_does_not_hide_others() {
        // No station columns: the station group fails, the rest still report
        let schema = Schema::new(vec![
            (temporal::START_TIME.to_string(), ColumnType::DateTime, false),
            ("Trip Duration".to_string(), ColumnType::Float64, true),
            ("User Type".to_string(), ColumnType::String, true),
        ]);
        let csv = "Start Time,Trip Duration,User Type\n2017-01-02 08:00:00,60,Subscriber\n";
        let table = Table::from_csv("partial", csv, &schema).unwrap();
        let selection = Selection::parse("washington", "all", "all").unwrap();

        let report = analyze(&table, &selection).unwrap();
        assert!(matches!(report.stations, Err(TripError::ColumnNotFound(_))));
        assert!(report.time.is_ok());
        assert_eq!(report.durations.as_ref().unwrap().result.total_seconds, 60.0);
        assert!(report.users.is_ok());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["stations"]["error"].as_str().unwrap().contains("Start Station"));
        assert_eq!(json["selection"]["city"], "washington");
        assert_eq!(json["matched_rows"], 1);
    }
}
