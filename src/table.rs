/// TripStats Table Implementation
///
/// A Table is an immutable collection of equally long, typed columns with a
/// schema. Tables are built once (usually by parsing a city's CSV file against
/// a fixed schema) and never modified afterwards. Adding derived data produces
/// a new Table that shares the existing columns through `Rc`.
///
/// # Examples
///
/// ```
/// use tripstats::{ColumnType, Schema, Table};
///
/// let schema = Schema::new(vec![
///     ("Start Station".to_string(), ColumnType::String, false),
///     ("Trip Duration".to_string(), ColumnType::Float64, true),
/// ]);
///
/// let csv = "Start Station,Trip Duration\nCanal St,300\nClark St,\n";
/// let table = Table::from_csv("trips", csv, &schema).unwrap();
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.get_value(0, "Start Station").unwrap().as_string(), Some("Canal St"));
/// assert!(table.get_value(1, "Trip Duration").unwrap().is_null());
/// ```

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{Result, TripError};
use crate::interner::{InternerStats, StringInterner};
use chrono::NaiveDateTime;
use log::debug;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::cell::RefCell;
use std::rc::Rc;

/// Schema definition with column names and types.
///
/// Each entry is `(name, type, nullable)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<(String, ColumnType, bool)>,
}

impl Schema {
    pub fn new(columns: Vec<(String, ColumnType, bool)>) -> Self {
        Schema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _, _)| name.as_str()).collect()
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _, _)| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_column_index(name).is_some()
    }
}

/// One record, with values in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<(String, ColumnValue)>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Root table owning (or sharing) its column data.
pub struct Table {
    name: String,
    schema: Schema,
    columns: Vec<Rc<Column>>,
    row_count: usize,
    /// String interner shared across the string columns built by this table
    interner: Option<Rc<RefCell<StringInterner>>>,
    /// 1-based source line each row started on
    source_lines: Rc<Vec<usize>>,
}

impl Table {
    fn assemble(
        name: String,
        columns: Vec<Rc<Column>>,
        interner: Option<Rc<RefCell<StringInterner>>>,
        source_lines: Rc<Vec<usize>>,
    ) -> Result<Table> {
        let row_count = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut schema_cols: Vec<(String, ColumnType, bool)> = Vec::with_capacity(columns.len());

        for col in &columns {
            if col.len() != row_count {
                return Err(TripError::malformed(
                    0,
                    col.name(),
                    format!("column has {} rows, expected {}", col.len(), row_count),
                ));
            }
            if schema_cols.iter().any(|(n, _, _)| n == col.name()) {
                return Err(TripError::malformed(0, col.name(), "duplicate column"));
            }
            schema_cols.push((col.name().to_string(), col.column_type(), col.is_nullable()));
        }

        Ok(Table {
            name,
            schema: Schema::new(schema_cols),
            columns,
            row_count,
            interner,
            source_lines,
        })
    }

    /// Returns a new table with `extra` columns appended.
    ///
    /// Existing columns are shared with `self`, never copied or modified.
    pub fn with_columns(&self, extra: Vec<Column>) -> Result<Table> {
        let mut columns = self.columns.clone();
        columns.extend(extra.into_iter().map(Rc::new));
        Self::assemble(
            self.name.clone(),
            columns,
            self.interner.clone(),
            self.source_lines.clone(),
        )
    }

    /// Line of the source text that row `row` started on.
    pub fn source_line(&self, row: usize) -> Option<usize> {
        self.source_lines.get(row).copied()
    }

    pub fn interner_stats(&self) -> Option<InternerStats> {
        self.interner.as_ref().map(|i| i.borrow().stats())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        let col_idx = self
            .schema
            .get_column_index(name)
            .ok_or_else(|| TripError::ColumnNotFound(name.to_string()))?;
        Ok(&self.columns[col_idx])
    }

    pub fn get_value(&self, row: usize, column: &str) -> Result<ColumnValue> {
        self.column(column)?.get(row)
    }

    pub fn get_row(&self, row: usize) -> Result<Row> {
        if row >= self.row_count {
            return Err(TripError::RowOutOfRange {
                index: row,
                len: self.row_count,
            });
        }

        let values = self
            .columns
            .iter()
            .map(|col| Ok((col.name().to_string(), col.get(row)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Row { values })
    }

    // ========================================================================
    // CSV loading
    // ========================================================================

    /// Create a table from CSV text using a fixed schema.
    ///
    /// The first record is the header. Every schema column must be present in
    /// the header; header columns the schema does not know are ignored. Every
    /// record must have as many fields as the header. Empty and `NaN` cells
    /// become NULL and are rejected for non-nullable columns. No type
    /// inference is performed: each cell is parsed as its schema type.
    pub fn from_csv(name: &str, csv: &str, schema: &Schema) -> Result<Table> {
        let mut records = parse_csv_rows(csv).into_iter();

        let (_, header) = records
            .next()
            .ok_or_else(|| TripError::malformed(0, "", "CSV is empty"))?;

        // Map each schema column to its position in the header
        let mut positions = Vec::with_capacity(schema.len());
        for (col_name, _, _) in &schema.columns {
            let pos = header
                .iter()
                .position(|h| h.trim() == col_name)
                .ok_or_else(|| TripError::malformed(1, col_name, "required column missing from header"))?;
            positions.push(pos);
        }
        for h in header.iter().filter(|h| !schema.contains(h.trim())) {
            debug!("{}: ignoring column '{}' not in schema", name, h);
        }

        let interner = Rc::new(RefCell::new(StringInterner::with_capacity(1024)));
        let mut columns: Vec<Column> = schema
            .columns
            .iter()
            .map(|(col_name, col_type, nullable)| {
                Column::new_with_interner(col_name.clone(), *col_type, *nullable, Some(interner.clone()))
            })
            .collect();

        let mut source_lines = Vec::new();
        for (line, record) in records {
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            if record.len() != header.len() {
                let column = header.get(record.len()).map(|h| h.trim()).unwrap_or("");
                return Err(TripError::malformed(
                    line,
                    column,
                    format!("record has {} fields, header has {}", record.len(), header.len()),
                ));
            }
            for ((col, &pos), (col_name, col_type, nullable)) in
                columns.iter_mut().zip(&positions).zip(&schema.columns)
            {
                let raw = record[pos].as_str();
                let value = parse_csv_value(raw, *col_type)
                    .map_err(|reason| TripError::malformed(line, col_name, reason))?;
                if value.is_null() && !nullable {
                    return Err(TripError::malformed(line, col_name, "missing value"));
                }
                col.append(value)?;
            }
            source_lines.push(line);
        }

        let columns = columns.into_iter().map(Rc::new).collect();
        let table = Self::assemble(name.to_string(), columns, Some(interner), Rc::new(source_lines))?;
        debug!("{}: parsed {} rows", name, table.len());
        Ok(table)
    }
}

/// Parse a timestamp cell.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`, with optional
/// fractional seconds.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
    let s = s.trim().trim_end_matches('Z');
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parse a CSV string into records, handling quoted fields with embedded
/// newlines. Each record is paired with the 1-based line it starts on.
fn parse_csv_rows(csv: &str) -> Vec<(usize, Vec<String>)> {
    let mut rows = Vec::new();
    let mut current_row = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = csv.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                // Doubled quote is an escaped quote
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current_field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
            }
            '\n' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
                rows.push((record_line, std::mem::take(&mut current_row)));
                line += 1;
                record_line = line;
            }
            '\n' => {
                current_field.push(c);
                line += 1;
            }
            // \r\n line endings
            '\r' if !in_quotes => {}
            _ => current_field.push(c),
        }
    }

    if !current_field.is_empty() || !current_row.is_empty() {
        current_row.push(current_field);
        rows.push((record_line, current_row));
    }

    rows
}

/// Parse a CSV cell into a ColumnValue of the expected type
fn parse_csv_value(value: &str, col_type: ColumnType) -> std::result::Result<ColumnValue, String> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Ok(ColumnValue::Null);
    }

    match col_type {
        ColumnType::Int64 => trimmed
            .parse::<i64>()
            .map(ColumnValue::Int64)
            .map_err(|_| format!("cannot parse '{}' as INT64", trimmed)),
        ColumnType::Float64 => match trimmed.parse::<f64>() {
            // NaN marks a missing value
            Ok(v) if v.is_nan() => Ok(ColumnValue::Null),
            Ok(v) if v.is_infinite() => Err(format!("'{}' is not a finite FLOAT64", trimmed)),
            Ok(v) => Ok(ColumnValue::Float64(v)),
            Err(_) => Err(format!("cannot parse '{}' as FLOAT64", trimmed)),
        },
        ColumnType::String => Ok(ColumnValue::String(trimmed.to_string())),
        ColumnType::DateTime => parse_datetime(trimmed)
            .map(ColumnValue::DateTime)
            .ok_or_else(|| format!("cannot parse '{}' as DATETIME (expected YYYY-MM-DD HH:MM:SS)", trimmed)),
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Table {{ name: '{}', columns: {}, rows: {} }}",
            self.name,
            self.schema.len(),
            self.row_count
        )
    }
}
