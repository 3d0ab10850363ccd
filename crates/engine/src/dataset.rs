//! Dataset: the cell store and variable registry kept in lockstep.
//!
//! All structural edits (insert/remove/move of a column) go through here so
//! `Variable::column_index` always matches the physical column position.

use std::collections::BTreeMap;

use crate::cell::CellChange;
use crate::error::DatasetError;
use crate::events::{DatasetEvent, EventCollector, StoreGrownEvent, VariableDeclaredEvent};
use crate::slice::{self, SlicedData};
use crate::store::{CellStore, Growth};
use crate::value_label::ValueLabel;
use crate::variable::{Variable, VariableRegistry, VariableUpdate};

/// Selected columns with their metadata, in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slice {
    pub rows: Vec<Vec<String>>,
    pub variables: Vec<Variable>,
    pub omitted: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Dataset {
    store: CellStore,
    registry: VariableRegistry,
    events: EventCollector,
}

impl Dataset {
    pub fn new() -> Self {
        Self {
            store: CellStore::new(),
            registry: VariableRegistry::new(),
            events: EventCollector::new(),
        }
    }

    /// Reassemble a dataset from persisted parts. Columns without a variable
    /// get defaults; variables without a column get an empty column.
    pub fn from_parts(
        store: CellStore,
        variables: Vec<Variable>,
        labels: Vec<ValueLabel>,
    ) -> Result<Self, DatasetError> {
        let mut dataset = Self {
            store,
            registry: VariableRegistry::from_variables(variables, labels)?,
            events: EventCollector::new(),
        };
        let cols = dataset.store.column_count().max(dataset.registry.len());
        let rows = dataset.store.row_count();
        dataset.store.ensure_size(cols, rows);
        dataset.registry.load_variables(cols);
        Ok(dataset)
    }

    pub fn store(&self) -> &CellStore {
        &self.store
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn variables(&self) -> &[Variable] {
        self.registry.variables()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        self.store.rows()
    }

    pub fn get_cell(&self, col: usize, row: usize) -> &str {
        self.store.get_cell(col, row)
    }

    pub fn set_cell(&mut self, col: usize, row: usize, value: &str) {
        let growth = self.store.set_cell(col, row, value);
        self.after_write(growth, &[(col, value)]);
    }

    pub fn bulk_set(&mut self, changes: &[CellChange]) {
        let growth = self.store.bulk_set(changes);
        let written: Vec<(usize, &str)> = changes.iter().map(|c| (c.col, c.value.as_str())).collect();
        self.after_write(growth, &written);
    }

    /// Record growth and declare variables for newly written columns. The
    /// first value written to an undeclared column decides its type; within
    /// one batch columns are declared left to right, so a later column never
    /// turns an earlier written one into a default gap variable.
    fn after_write(&mut self, growth: Growth, written: &[(usize, &str)]) {
        if !growth.is_empty() {
            log::debug!(
                "Cell store grew by {} rows, {} cols",
                growth.added_rows,
                growth.added_cols
            );
            self.events.push(DatasetEvent::StoreGrown(StoreGrownEvent {
                added_rows: growth.added_rows,
                added_cols: growth.added_cols,
                rows: self.store.row_count(),
                cols: self.store.column_count(),
            }));
        }

        let mut first_values: BTreeMap<usize, &str> = BTreeMap::new();
        for &(col, value) in written {
            first_values.entry(col).or_insert(value);
        }

        for (col, value) in first_values {
            if let Some(v) = self.registry.auto_declare(col, value) {
                log::debug!("Auto-declared {} at column {} as {}", v.name, col, v.var_type);
                let event = VariableDeclaredEvent {
                    column: col,
                    name: v.name.clone(),
                    var_type: v.var_type,
                };
                self.events.push(DatasetEvent::VariableAutoDeclared(event));
            }
        }
    }

    /// Append a variable and its (empty) column.
    pub fn add_variable(&mut self, variable: Variable) -> Result<&Variable, DatasetError> {
        let at = self.registry.len();
        self.insert_variable(at, variable)
    }

    /// Insert a variable at `at`; existing rows get an empty value there.
    pub fn insert_variable(&mut self, at: usize, variable: Variable) -> Result<&Variable, DatasetError> {
        // Declare any trailing undeclared columns first so positions line up
        self.registry.load_variables(self.store.column_count());
        let rows = self.store.row_count();
        self.registry.insert_variable(at, variable)?;
        if at < self.store.column_count() {
            self.store.insert_column(at);
        } else {
            self.store.ensure_size(at + 1, rows);
        }
        Ok(&self.registry.variables()[at])
    }

    /// Remove a variable together with its column.
    pub fn remove_variable(&mut self, index: usize) -> Result<Variable, DatasetError> {
        let removed = self.registry.remove_variable(index)?;
        self.store.remove_column(index);
        Ok(removed)
    }

    /// Reorder a variable and its column together.
    pub fn move_variable(&mut self, from: usize, to: usize) -> Result<(), DatasetError> {
        self.registry.move_variable(from, to)?;
        self.store.move_column(from, to);
        Ok(())
    }

    pub fn update_variable(&mut self, index: usize, update: VariableUpdate) -> Result<(), DatasetError> {
        self.registry.update_variable(index, update)
    }

    pub fn variable_by_column(&self, index: usize) -> Option<&Variable> {
        self.registry.variable_by_column(index)
    }

    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.registry.variable_by_name(name)
    }

    /// Declare default variables for every column up to `total_columns`,
    /// growing the store to match.
    pub fn load_variables(&mut self, total_columns: usize) -> usize {
        let rows = self.store.row_count();
        self.store.ensure_size(total_columns, rows);
        self.registry.load_variables(total_columns)
    }

    pub fn set_value_labels(&mut self, name: &str, labels: Vec<(String, String)>) -> Result<(), DatasetError> {
        self.registry.set_value_labels(name, labels)
    }

    /// Project the named variables, in the given order. Unmatched names are
    /// skipped and recorded as diagnostics.
    pub fn slice(&mut self, selected: &[String]) -> Slice {
        let SlicedData { rows, omitted } =
            slice::get_sliced_data(self.store.rows(), self.registry.variables(), selected);
        let variables = slice::get_var_defs(self.registry.variables(), selected);
        for name in &omitted {
            self.events.push(DatasetEvent::SelectionOmitted { name: name.clone() });
        }
        Slice { rows, variables, omitted }
    }

    pub fn events(&self) -> &EventCollector {
        &self.events
    }

    /// Drain accumulated diagnostics.
    pub fn take_events(&mut self) -> Vec<DatasetEvent> {
        self.events.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{Align, Measure, VariableType};

    fn sample() -> Dataset {
        let mut ds = Dataset::new();
        ds.bulk_set(&[
            CellChange::new(0, 0, "1"),
            CellChange::new(1, 0, "2"),
            CellChange::new(0, 1, "3"),
            CellChange::new(1, 1, "4"),
        ]);
        ds.update_variable(0, VariableUpdate::Name("A".into())).unwrap();
        ds.update_variable(1, VariableUpdate::Name("B".into())).unwrap();
        ds
    }

    fn column_indices(ds: &Dataset) -> Vec<usize> {
        ds.variables().iter().map(|v| v.column_index).collect()
    }

    #[test]
    fn test_write_auto_declares_variable() {
        let mut ds = Dataset::new();
        ds.set_cell(0, 0, "12.5");

        let v = ds.variable_by_column(0).unwrap();
        assert_eq!(v.name, "Var1");
        assert_eq!(v.var_type, VariableType::Numeric);
        assert_eq!(v.align, Align::Right);
        assert_eq!(v.measure, Measure::Scale);
        assert_eq!(ds.events().declared().len(), 1);
        assert_eq!(ds.events().grown().len(), 1);
    }

    #[test]
    fn test_first_write_decides_type_forever() {
        // A blank first entry makes the column a string variable; later
        // numeric entries do not change that.
        let mut ds = Dataset::new();
        ds.set_cell(0, 0, "");
        ds.set_cell(0, 1, "42");
        ds.set_cell(0, 2, "7");

        let v = ds.variable_by_column(0).unwrap();
        assert_eq!(v.var_type, VariableType::String);
        assert_eq!(v.align, Align::Left);
        assert_eq!(ds.events().declared().len(), 1);
    }

    #[test]
    fn test_write_far_out_declares_gap_columns() {
        let mut ds = Dataset::new();
        ds.set_cell(3, 2, "x");

        assert_eq!(ds.variables().len(), 4);
        assert_eq!(column_indices(&ds), vec![0, 1, 2, 3]);
        assert_eq!(ds.variable_by_column(3).unwrap().var_type, VariableType::String);
        assert_eq!(ds.store().row_count(), 3);
    }

    #[test]
    fn test_bulk_set_types_columns_independent_of_order() {
        let mut ds = Dataset::new();
        ds.bulk_set(&[CellChange::new(1, 0, "5"), CellChange::new(0, 0, "x")]);

        assert_eq!(ds.variable_by_column(0).unwrap().var_type, VariableType::String);
        assert_eq!(ds.variable_by_column(1).unwrap().var_type, VariableType::Numeric);
        assert_eq!(column_indices(&ds), vec![0, 1]);
        assert_eq!(ds.events().declared().len(), 2);
    }

    #[test]
    fn test_insert_variable_backfills_rows() {
        let mut ds = sample();
        ds.insert_variable(1, Variable::new("Mid")).unwrap();

        assert_eq!(ds.rows()[0], vec!["1", "", "2"]);
        assert_eq!(ds.rows()[1], vec!["3", "", "4"]);
        assert_eq!(ds.variable_by_name("B").unwrap().column_index, 2);
        assert_eq!(column_indices(&ds), vec![0, 1, 2]);
    }

    #[test]
    fn test_add_variable_extends_columns() {
        let mut ds = sample();
        ds.add_variable(Variable::new("C")).unwrap();
        assert_eq!(ds.store().column_count(), 3);
        assert_eq!(ds.get_cell(2, 1), "");
        assert_eq!(ds.variable_by_name("C").unwrap().column_index, 2);
    }

    #[test]
    fn test_remove_and_move_keep_columns_in_sync() {
        let mut ds = sample();
        ds.add_variable(Variable::new("C")).unwrap();
        ds.set_cell(2, 0, "c0");

        ds.move_variable(2, 0).unwrap();
        assert_eq!(ds.rows()[0], vec!["c0", "1", "2"]);
        assert_eq!(ds.variable_by_name("C").unwrap().column_index, 0);

        ds.remove_variable(1).unwrap();
        assert_eq!(ds.rows()[0], vec!["c0", "2"]);
        assert_eq!(ds.variable_by_name("B").unwrap().column_index, 1);
        assert!(ds.variable_by_name("A").is_none());
    }

    #[test]
    fn test_slice_follows_selection_order() {
        let mut ds = sample();
        let slice = ds.slice(&["B".to_string(), "A".to_string()]);
        assert_eq!(slice.rows, vec![vec!["2", "1"], vec!["4", "3"]]);
        let names: Vec<_> = slice.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_slice_unknown_name_is_observable() {
        let mut ds = sample();
        ds.take_events();
        let slice = ds.slice(&["A".to_string(), "missing".to_string()]);
        assert_eq!(slice.omitted, vec!["missing"]);
        assert_eq!(ds.events().omitted(), vec!["missing"]);
    }

    #[test]
    fn test_load_variables_declares_defaults() {
        let mut ds = Dataset::new();
        assert_eq!(ds.load_variables(3), 3);
        assert_eq!(ds.store().column_count(), 3);
        assert_eq!(ds.variable_by_column(2).unwrap().name, "Var3");
        assert_eq!(ds.load_variables(2), 0);
    }
}
