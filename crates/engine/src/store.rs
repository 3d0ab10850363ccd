use serde::{Deserialize, Serialize};

use crate::cell::CellChange;

/// Rectangular case × variable grid of raw string values.
///
/// Every row always has `cols` entries. Writes outside the current bounds grow
/// the grid instead of failing; newly materialized cells are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellStore {
    rows: Vec<Vec<String>>,
    cols: usize,
}

/// How much a write grew the store, if at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Growth {
    pub added_rows: usize,
    pub added_cols: usize,
}

impl Growth {
    pub fn is_empty(&self) -> bool {
        self.added_rows == 0 && self.added_cols == 0
    }
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from row-major data, padding short rows with empty values.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut store = Self { rows, cols };
        for row in &mut store.rows {
            row.resize(cols, String::new());
        }
        store
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Value at (col, row), or the empty string for never-written addresses.
    pub fn get_cell(&self, col: usize, row: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn set_cell(&mut self, col: usize, row: usize, value: &str) -> Growth {
        let growth = self.ensure_size(col + 1, row + 1);
        self.rows[row][col] = value.to_string();
        growth
    }

    /// Apply a batch of writes in order. Later writes to the same address win.
    pub fn bulk_set(&mut self, changes: &[CellChange]) -> Growth {
        let max_col = changes.iter().map(|c| c.col + 1).max().unwrap_or(0);
        let max_row = changes.iter().map(|c| c.row + 1).max().unwrap_or(0);
        let growth = self.ensure_size(max_col, max_row);
        for change in changes {
            self.rows[change.row][change.col] = change.value.clone();
        }
        growth
    }

    /// Grow to at least `cols` × `rows`, backfilling with empty values.
    pub fn ensure_size(&mut self, cols: usize, rows: usize) -> Growth {
        let mut growth = Growth::default();

        if cols > self.cols {
            growth.added_cols = cols - self.cols;
            self.cols = cols;
            for row in &mut self.rows {
                row.resize(cols, String::new());
            }
        }

        if rows > self.rows.len() {
            growth.added_rows = rows - self.rows.len();
            let width = self.cols;
            self.rows.resize_with(rows, || vec![String::new(); width]);
        }

        growth
    }

    /// Insert an empty column at `at`, shifting later columns right.
    pub fn insert_column(&mut self, at: usize) {
        let at = at.min(self.cols);
        for row in &mut self.rows {
            row.insert(at, String::new());
        }
        self.cols += 1;
    }

    /// Remove the column at `at`, shifting later columns left. Returns false if out of range.
    pub fn remove_column(&mut self, at: usize) -> bool {
        if at >= self.cols {
            return false;
        }
        for row in &mut self.rows {
            row.remove(at);
        }
        self.cols -= 1;
        true
    }

    /// Move a column from `from` to `to`, keeping every row aligned.
    pub fn move_column(&mut self, from: usize, to: usize) -> bool {
        if from >= self.cols || to >= self.cols {
            return false;
        }
        for row in &mut self.rows {
            let value = row.remove(from);
            row.insert(to, value);
        }
        true
    }

    /// Whole column as owned values, top to bottom.
    pub fn column(&self, col: usize) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.get(col).cloned().unwrap_or_default())
            .collect()
    }
}
