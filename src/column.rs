/// TripStats Column Implementation
///
/// A Column is an array-like random-access data container indexed by integer.
/// Each Column has a type specifying the type of every value stored. Columns are
/// append-only: once a table has been loaded its columns are never rewritten,
/// and derived data is added as new columns.
///
/// # String Interning
///
/// String columns store `StringId`s from a `StringInterner`, usually one shared
/// by every string column of the table. Aggregations can count IDs directly and
/// resolve only the winning strings.

use crate::error::{Result, TripError};
use crate::interner::{StringId, StringInterner};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Format used when timestamps are rendered back to text.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Int64,
    Float64,
    String,
    DateTime,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Int64 => "INT64",
            ColumnType::Float64 => "FLOAT64",
            ColumnType::String => "STRING",
            ColumnType::DateTime => "DATETIME",
        };
        f.write_str(name)
    }
}

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Int64(i64),
    Float64(f64),
    String(String),
    DateTime(NaiveDateTime),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Float64(v) => Some(*v),
            ColumnValue::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// The column type this value belongs to, or None for Null.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            ColumnValue::Int64(_) => Some(ColumnType::Int64),
            ColumnValue::Float64(_) => Some(ColumnType::Float64),
            ColumnValue::String(_) => Some(ColumnType::String),
            ColumnValue::DateTime(_) => Some(ColumnType::DateTime),
            ColumnValue::Null => None,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Int64(v) => write!(f, "{}", v),
            ColumnValue::Float64(v) => write!(f, "{}", v),
            ColumnValue::String(v) => f.write_str(v),
            ColumnValue::DateTime(v) => write!(f, "{}", v.format(DATETIME_FORMAT)),
            ColumnValue::Null => f.write_str("NaN"),
        }
    }
}

/// Typed backing storage. Null cells hold a placeholder and are tracked in
/// the column's null flags.
#[derive(Debug, Clone)]
enum ColumnData {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    String(Vec<StringId>),
    DateTime(Vec<NaiveDateTime>),
}

impl ColumnData {
    fn new(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Int64 => ColumnData::Int64(Vec::new()),
            ColumnType::Float64 => ColumnData::Float64(Vec::new()),
            ColumnType::String => ColumnData::String(Vec::new()),
            ColumnType::DateTime => ColumnData::DateTime(Vec::new()),
        }
    }

    fn len(&self) -> usize {
        match self {
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::String(v) => v.len(),
            ColumnData::DateTime(v) => v.len(),
        }
    }
}

fn mismatch(column: &str, expected: ColumnType, value: &ColumnValue) -> TripError {
    TripError::TypeMismatch {
        column: column.to_string(),
        expected: expected.to_string(),
        found: value
            .column_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "NULL".to_string()),
    }
}

pub struct Column {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    data: ColumnData,
    null_flags: Option<Vec<bool>>,
    /// Interner backing String columns (shared across the table when given)
    interner: Option<Rc<RefCell<StringInterner>>>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType, nullable: bool) -> Self {
        Self::new_with_interner(name, column_type, nullable, None)
    }

    /// Create a new column with an optional shared string interner.
    ///
    /// String columns created without one get a private interner, so every
    /// String column stores IDs.
    pub fn new_with_interner(
        name: impl Into<String>,
        column_type: ColumnType,
        nullable: bool,
        interner: Option<Rc<RefCell<StringInterner>>>,
    ) -> Self {
        let interner = match column_type {
            ColumnType::String => {
                Some(interner.unwrap_or_else(|| Rc::new(RefCell::new(StringInterner::new()))))
            }
            _ => None,
        };

        Column {
            name: name.into(),
            column_type,
            nullable,
            data: ColumnData::new(column_type),
            null_flags: if nullable { Some(Vec::new()) } else { None },
            interner,
        }
    }

    /// Build a column from an iterator of values, validating each one.
    pub fn from_values<I>(
        name: impl Into<String>,
        column_type: ColumnType,
        nullable: bool,
        values: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = ColumnValue>,
    {
        let mut column = Column::new(name, column_type, nullable);
        for value in values {
            column.append(value)?;
        }
        Ok(column)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn interner(&self) -> Option<&Rc<RefCell<StringInterner>>> {
        self.interner.as_ref()
    }

    fn type_mismatch(&self, value: &ColumnValue) -> TripError {
        mismatch(&self.name, self.column_type, value)
    }

    pub fn append(&mut self, value: ColumnValue) -> Result<()> {
        if value.is_null() {
            let Some(ref mut null_flags) = self.null_flags else {
                return Err(self.type_mismatch(&value));
            };
            null_flags.push(true);
            match &mut self.data {
                ColumnData::Int64(v) => v.push(0),
                ColumnData::Float64(v) => v.push(0.0),
                ColumnData::String(v) => v.push(0),
                ColumnData::DateTime(v) => v.push(NaiveDateTime::default()),
            }
            return Ok(());
        }

        match (&mut self.data, value) {
            (ColumnData::Int64(v), ColumnValue::Int64(n)) => v.push(n),
            (ColumnData::Float64(v), ColumnValue::Float64(n)) => v.push(n),
            (ColumnData::DateTime(v), ColumnValue::DateTime(t)) => v.push(t),
            (ColumnData::String(v), ColumnValue::String(s)) => {
                let interner = self
                    .interner
                    .as_ref()
                    .ok_or_else(|| TripError::ColumnNotFound(self.name.clone()))?;
                v.push(interner.borrow_mut().intern(&s));
            }
            (_, other) => return Err(mismatch(&self.name, self.column_type, &other)),
        }

        if let Some(ref mut null_flags) = self.null_flags {
            null_flags.push(false);
        }
        Ok(())
    }

    /// Check if a value at index is null (fast path without cloning).
    #[inline]
    pub fn is_null_at(&self, index: usize) -> bool {
        self.null_flags
            .as_ref()
            .and_then(|flags| flags.get(index).copied())
            .unwrap_or(false)
    }

    pub fn get(&self, index: usize) -> Result<ColumnValue> {
        if index >= self.len() {
            return Err(TripError::RowOutOfRange {
                index,
                len: self.len(),
            });
        }
        if self.is_null_at(index) {
            return Ok(ColumnValue::Null);
        }

        let value = match &self.data {
            ColumnData::Int64(v) => ColumnValue::Int64(v[index]),
            ColumnData::Float64(v) => ColumnValue::Float64(v[index]),
            ColumnData::DateTime(v) => ColumnValue::DateTime(v[index]),
            ColumnData::String(v) => self
                .resolve(v[index])
                .map(ColumnValue::String)
                .ok_or_else(|| self.type_mismatch(&ColumnValue::Null))?,
        };
        Ok(value)
    }

    /// Fast numeric access. Returns None if the value is null, not numeric,
    /// or the index is out of bounds.
    #[inline]
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        if self.is_null_at(index) {
            return None;
        }
        match &self.data {
            ColumnData::Int64(v) => v.get(index).map(|n| *n as f64),
            ColumnData::Float64(v) => v.get(index).copied(),
            _ => None,
        }
    }

    #[inline]
    pub fn get_i64(&self, index: usize) -> Option<i64> {
        if self.is_null_at(index) {
            return None;
        }
        match &self.data {
            ColumnData::Int64(v) => v.get(index).copied(),
            _ => None,
        }
    }

    #[inline]
    pub fn get_datetime(&self, index: usize) -> Option<NaiveDateTime> {
        if self.is_null_at(index) {
            return None;
        }
        match &self.data {
            ColumnData::DateTime(v) => v.get(index).copied(),
            _ => None,
        }
    }

    /// Interned ID of a string cell, without resolving it.
    #[inline]
    pub fn string_id(&self, index: usize) -> Option<StringId> {
        if self.is_null_at(index) {
            return None;
        }
        match &self.data {
            ColumnData::String(v) => v.get(index).copied(),
            _ => None,
        }
    }

    /// Resolve an ID produced by `string_id` back to its string.
    pub fn resolve(&self, id: StringId) -> Option<String> {
        self.interner
            .as_ref()
            .and_then(|interner| interner.borrow().resolve(id).map(str::to_string))
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Column {{ name: '{}', type: {:?}, nullable: {}, len: {} }}",
            self.name,
            self.column_type,
            self.nullable,
            self.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_column_basic() {
        let mut col = Column::new("Birth Year", ColumnType::Int64, false);
        col.append(ColumnValue::Int64(1980)).unwrap();
        col.append(ColumnValue::Int64(1992)).unwrap();

        assert_eq!(col.len(), 2);
        assert_eq!(col.get(0).unwrap().as_i64(), Some(1980));
        assert_eq!(col.get_i64(1), Some(1992));
        assert_eq!(col.get_f64(1), Some(1992.0));
    }

    #[test]
    fn test_column_nullable() {
        let mut col = Column::new("Trip Duration", ColumnType::Float64, true);
        col.append(ColumnValue::Float64(300.0)).unwrap();
        col.append(ColumnValue::Null).unwrap();
        col.append(ColumnValue::Float64(45.5)).unwrap();

        assert_eq!(col.len(), 3);
        assert!(col.get(1).unwrap().is_null());
        assert!(col.is_null_at(1));
        assert_eq!(col.get_f64(1), None);
        assert_eq!(col.get_f64(2), Some(45.5));
    }

    #[test]
    fn test_column_rejects_null_when_not_nullable() {
        let mut col = Column::new("Start Time", ColumnType::DateTime, false);
        assert!(matches!(
            col.append(ColumnValue::Null),
            Err(TripError::TypeMismatch { .. })
        ));
        assert!(col.is_empty());
    }

    #[test]
    fn test_column_type_mismatch() {
        let mut col = Column::new("Trip Duration", ColumnType::Float64, false);
        let err = col
            .append(ColumnValue::String("ten".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("FLOAT64"));
    }

    #[test]
    fn test_column_datetime() {
        let ts = NaiveDate::from_ymd_opt(2017, 6, 23)
            .unwrap()
            .and_hms_opt(15, 9, 32)
            .unwrap();
        let mut col = Column::new("Start Time", ColumnType::DateTime, false);
        col.append(ColumnValue::DateTime(ts)).unwrap();

        assert_eq!(col.get_datetime(0), Some(ts));
        assert_eq!(col.get(0).unwrap().to_string(), "2017-06-23 15:09:32");
    }

    #[test]
    fn test_column_string_interning() {
        let interner = Rc::new(RefCell::new(StringInterner::new()));
        let mut col = Column::new_with_interner(
            "Start Station",
            ColumnType::String,
            false,
            Some(interner.clone()),
        );

        for name in ["Alpha", "Beta", "Alpha", "Gamma", "Alpha"] {
            col.append(ColumnValue::String(name.to_string())).unwrap();
        }

        assert_eq!(col.get(0).unwrap().as_string(), Some("Alpha"));
        assert_eq!(col.get(3).unwrap().as_string(), Some("Gamma"));
        assert_eq!(col.string_id(0), col.string_id(4));
        assert_eq!(interner.borrow().len(), 3);
    }

    #[test]
    fn test_column_private_interner() {
        let mut col = Column::new("User Type", ColumnType::String, true);
        col.append(ColumnValue::String("Customer".to_string())).unwrap();
        col.append(ColumnValue::Null).unwrap();

        assert!(col.interner().is_some());
        assert_eq!(col.string_id(1), None);
        assert_eq!(col.resolve(col.string_id(0).unwrap()).as_deref(), Some("Customer"));
    }

    #[test]
    fn test_column_from_values() {
        let col = Column::from_values(
            "month",
            ColumnType::Int64,
            false,
            vec![ColumnValue::Int64(1), ColumnValue::Int64(6)],
        )
        .unwrap();
        assert_eq!(col.get_i64(1), Some(6));
        assert!(Column::from_values("month", ColumnType::Int64, false, vec![ColumnValue::Null]).is_err());
    }

    #[test]
    fn test_get_out_of_range() {
        let col = Column::new("x", ColumnType::Int64, false);
        assert!(matches!(col.get(0), Err(TripError::RowOutOfRange { index: 0, len: 0 })));
    }
}
