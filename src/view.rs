/// TripStats View Implementation
///
/// A View is a read-only subset of a Table's rows. It stores only the parent
/// row indices (in ascending order) and borrows the table, so a view can never
/// outlive its table and never copies row data.
///
/// Views can also carry computed columns (hour of day, trip label, ...). A
/// computed column is evaluated once over the view's rows and cached for the
/// lifetime of the view.

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{Result, TripError};
use crate::table::Table;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub struct View<'a> {
    table: &'a Table,
    view_to_parent: Vec<usize>,
    /// Computed columns, indexed by view position
    computed: RefCell<HashMap<String, Rc<Column>>>,
}

impl<'a> View<'a> {
    /// A view over every row of `table`.
    pub fn all(table: &'a Table) -> Self {
        Self::from_sorted(table, (0..table.len()).collect())
    }

    /// A view over the rows for which `predicate(parent_index)` returns true.
    pub fn filtered<F>(table: &'a Table, mut predicate: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<bool>,
    {
        let mut view_to_parent = Vec::new();
        for i in 0..table.len() {
            if predicate(i)? {
                view_to_parent.push(i);
            }
        }
        Ok(Self::from_sorted(table, view_to_parent))
    }

    /// A view over an explicit set of parent indices. Duplicates are removed
    /// and the indices are kept in table order.
    pub fn from_indices(table: &'a Table, mut indices: Vec<usize>) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= table.len()) {
            return Err(TripError::RowOutOfRange {
                index: bad,
                len: table.len(),
            });
        }
        indices.sort_unstable();
        indices.dedup();
        Ok(Self::from_sorted(table, indices))
    }

    fn from_sorted(table: &'a Table, view_to_parent: Vec<usize>) -> Self {
        View {
            table,
            view_to_parent,
            computed: RefCell::new(HashMap::new()),
        }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn len(&self) -> usize {
        self.view_to_parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view_to_parent.is_empty()
    }

    /// Parent row indices, ascending.
    pub fn indices(&self) -> &[usize] {
        &self.view_to_parent
    }

    pub fn get_parent_index(&self, view_index: usize) -> Option<usize> {
        self.view_to_parent.get(view_index).copied()
    }

    fn parent_index(&self, row: usize) -> Result<usize> {
        self.get_parent_index(row).ok_or(TripError::RowOutOfRange {
            index: row,
            len: self.len(),
        })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.table.has_column(column) || self.computed.borrow().contains_key(column)
    }

    pub fn get_value(&self, row: usize, column: &str) -> Result<ColumnValue> {
        if let Some(col) = self.computed.borrow().get(column) {
            return col.get(row);
        }
        self.table.get_value(self.parent_index(row)?, column)
    }

    /// Return the computed column `name`, evaluating `compute` for each row of
    /// the view on first use. `compute` receives the parent row index.
    ///
    /// Later calls with the same name return the cached column without
    /// evaluating `compute` again.
    pub fn computed_column<F>(&self, name: &str, column_type: ColumnType, mut compute: F) -> Result<Rc<Column>>
    where
        F: FnMut(usize) -> Result<ColumnValue>,
    {
        if let Some(col) = self.computed.borrow().get(name) {
            return Ok(col.clone());
        }
        if self.table.has_column(name) {
            return Err(TripError::malformed(0, name, "computed column shadows a table column"));
        }

        let mut column = Column::new(name, column_type, true);
        for &i in &self.view_to_parent {
            column.append(compute(i)?)?;
        }

        let column = Rc::new(column);
        self.computed
            .borrow_mut()
            .insert(name.to_string(), column.clone());
        Ok(column)
    }

    pub fn computed_column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.computed.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "View {{ table: '{}', rows: {} of {} }}",
            self.table.name(),
            self.len(),
            self.table.len()
        )
    }
}
