/// TripStats - per-city bike-share trip statistics
///
/// An in-memory columnar table engine specialised for trip records: a fixed
/// schema CSV loader, derived temporal fields, month/weekday filtering through
/// index views, four independent statistic groups, and a paged raw row browser.
///
/// A query cycle is `city::RecordStore::load` → `temporal::derive` →
/// `filter::apply` → `stats::*`, wrapped up by `query::run_query`.

pub mod error;
pub mod interner;
pub mod column;
pub mod table;
pub mod city;
pub mod temporal;
pub mod view;
pub mod filter;
pub mod stats;
pub mod paginator;
pub mod query;
pub mod config;

pub use error::{Result, TripError};
pub use interner::{InternerStats, StringId, StringInterner};
pub use column::{Column, ColumnType, ColumnValue};
pub use table::{Row, Schema, Table};
pub use city::{City, RecordStore};
pub use view::View;
pub use filter::{DayFilter, MonthFilter};
pub use stats::{
    BirthYearStats, DataIntegrityWarning, DurationStats, FieldStat, FrequencyResult, IntegrityIssue, Mode,
    StationStats, TimeStats, Timed, UserStats,
};
pub use paginator::{Page, PageResponse, Paginator, PaginatorState, PAGE_SIZE};
pub use query::{analyze, run_query, QueryCycle, QueryReport, Selection};
pub use config::Config;
