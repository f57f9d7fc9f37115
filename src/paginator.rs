/// Raw Row Paginator
///
/// Serves the rows of one (unfiltered) table in pages of `PAGE_SIZE`. The
/// paginator owns only its cursor; the table is borrowed and never modified.
///
/// ```
/// use tripstats::{ColumnType, PageResponse, Paginator, Schema, Table};
///
/// let schema = Schema::new(vec![("n".to_string(), ColumnType::Int64, false)]);
/// let csv = (0..7).fold("n\n".to_string(), |acc, i| format!("{acc}{i}\n"));
/// let table = Table::from_csv("numbers", &csv, &schema).unwrap();
///
/// let mut pages = Paginator::new(&table);
/// assert!(matches!(pages.next_page().unwrap(), PageResponse::Page(p) if p.rows.len() == 5));
/// assert!(matches!(pages.next_page().unwrap(), PageResponse::Page(p) if p.rows.len() == 2));
/// assert_eq!(pages.next_page().unwrap(), PageResponse::Exhausted);
/// ```

use crate::error::Result;
use crate::table::{Row, Table};
use log::debug;
use serde::Serialize;

pub const PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "cursor", rename_all = "snake_case")]
pub enum PaginatorState {
    Browsing(usize),
    Exhausted,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Table index of the first row in `rows`
    pub start: usize,
    pub rows: Vec<Row>,
    /// True when no rows follow this page
    pub is_last: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageResponse {
    Page(Page),
    Exhausted,
    Stopped,
}

pub struct Paginator<'a> {
    table: &'a Table,
    page_size: usize,
    state: PaginatorState,
}

impl<'a> Paginator<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self::with_page_size(table, PAGE_SIZE)
    }

    /// A page size of zero is treated as one.
    pub fn with_page_size(table: &'a Table, page_size: usize) -> Self {
        Paginator {
            table,
            page_size: page_size.max(1),
            state: PaginatorState::Browsing(0),
        }
    }

    pub fn state(&self) -> PaginatorState {
        self.state
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Rows not yet emitted.
    pub fn remaining(&self) -> usize {
        match self.state {
            PaginatorState::Browsing(cursor) => self.table.len().saturating_sub(cursor),
            _ => 0,
        }
    }

    /// Handle a "continue" request.
    ///
    /// Once the cursor has passed the last row the next request yields
    /// `Exhausted`; after that, and after `stop`, requests are no-ops.
    pub fn next_page(&mut self) -> Result<PageResponse> {
        let cursor = match self.state {
            PaginatorState::Browsing(cursor) => cursor,
            PaginatorState::Exhausted => return Ok(PageResponse::Exhausted),
            PaginatorState::Stopped => return Ok(PageResponse::Stopped),
        };

        let len = self.table.len();
        if cursor >= len {
            debug!("{}: paginator exhausted at row {}", self.table.name(), len);
            self.state = PaginatorState::Exhausted;
            return Ok(PageResponse::Exhausted);
        }

        let end = (cursor + self.page_size).min(len);
        let rows = (cursor..end)
            .map(|i| self.table.get_row(i))
            .collect::<Result<Vec<_>>>()?;
        self.state = PaginatorState::Browsing(cursor + self.page_size);

        Ok(PageResponse::Page(Page {
            start: cursor,
            rows,
            is_last: end >= len,
        }))
    }

    /// Handle a "stop" request. Terminal from any state.
    pub fn stop(&mut self) {
        self.state = PaginatorState::Stopped;
    }
}

impl Iterator for Paginator<'_> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_page() {
            Ok(PageResponse::Page(page)) => Some(Ok(page)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;
    use crate::table::Schema;

    fn numbers(n: usize) -> Table {
        let schema = Schema::new(vec![("n".to_string(), ColumnType::Int64, false)]);
        let mut csv = String::from("n\n");
        for i in 0..n {
            csv.push_str(&format!("{}\n", i));
        }
        Table::from_csv("numbers", &csv, &schema).unwrap()
    }

    fn page_len(response: PageResponse) -> usize {
        match response {
            PageResponse::Page(page) => page.rows.len(),
            other => panic!("expected a page, got {other:?}"),
        }
    }

    #[test]
    fn test_twelve_rows() {
        let table = numbers(12);
        let mut pages = Paginator::new(&table);

        assert_eq!(page_len(pages.next_page().unwrap()), 5);
        assert_eq!(page_len(pages.next_page().unwrap()), 5);
        assert_eq!(pages.remaining(), 2);
        assert_eq!(page_len(pages.next_page().unwrap()), 2);
        assert_eq!(pages.next_page().unwrap(), PageResponse::Exhausted);
        assert_eq!(pages.state(), PaginatorState::Exhausted);

        // Continue after exhaustion is a no-op
        assert_eq!(pages.next_page().unwrap(), PageResponse::Exhausted);
    }

    #[test]
    fn test_page_contents() {
        let table = numbers(7);
        let mut pages = Paginator::new(&table);

        let PageResponse::Page(first) = pages.next_page().unwrap() else {
            panic!("expected a page");
        };
        assert_eq!(first.start, 0);
        assert!(!first.is_last);
        assert_eq!(first.rows[4].get("n").unwrap().as_i64(), Some(4));

        let PageResponse::Page(second) = pages.next_page().unwrap() else {
            panic!("expected a page");
        };
        assert_eq!(second.start, 5);
        assert!(second.is_last);
        assert_eq!(second.rows[1].get("n").unwrap().as_i64(), Some(6));
    }

    #[test]
    fn test_exact_multiple_of_page_size() {
        let table = numbers(10);
        let mut pages = Paginator::new(&table);
        assert_eq!(page_len(pages.next_page().unwrap()), 5);
        let PageResponse::Page(last) = pages.next_page().unwrap() else {
            panic!("expected a page");
        };
        assert!(last.is_last);
        assert_eq!(pages.next_page().unwrap(), PageResponse::Exhausted);
    }

    #[test]
    fn test_empty_table() {
        let table = numbers(0);
        let mut pages = Paginator::new(&table);
        assert_eq!(pages.next_page().unwrap(), PageResponse::Exhausted);
    }

    #[test]
    fn test_stop_is_terminal() {
        let table = numbers(12);
        let mut pages = Paginator::new(&table);
        assert_eq!(page_len(pages.next_page().unwrap()), 5);

        pages.stop();
        assert_eq!(pages.state(), PaginatorState::Stopped);
        assert_eq!(pages.remaining(), 0);
        assert_eq!(pages.next_page().unwrap(), PageResponse::Stopped);
        assert_eq!(pages.next_page().unwrap(), PageResponse::Stopped);

        // Stop also applies after exhaustion
        let mut pages = Paginator::new(&table);
        while pages.next_page().unwrap() != PageResponse::Exhausted {}
        pages.stop();
        assert_eq!(pages.state(), PaginatorState::Stopped);
    }

    #[test]
    fn test_iterator_and_table_untouched() {
        let table = numbers(12);
        let sizes: Vec<usize> = Paginator::new(&table)
            .map(|page| page.unwrap().rows.len())
            .collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        assert_eq!(table.len(), 12);

        let sizes: Vec<usize> = Paginator::with_page_size(&table, 0)
            .map(|page| page.unwrap().rows.len())
            .collect();
        assert_eq!(sizes.len(), 12);
    }
}
