//! Diagnostic events emitted by the dataset.
//!
//! The dataset degrades permissively (out-of-range writes grow the grid,
//! unknown selection names are skipped). Each degrade path records an event
//! here so callers and tests can observe that it happened.

use crate::variable::VariableType;

#[derive(Debug, Clone, PartialEq)]
pub enum DatasetEvent {
    /// A write landed outside the current bounds and the grid grew.
    StoreGrown(StoreGrownEvent),

    /// A variable was declared because its column received data.
    VariableAutoDeclared(VariableDeclaredEvent),

    /// A selected variable name did not match any variable and was skipped.
    SelectionOmitted { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreGrownEvent {
    pub added_rows: usize,
    pub added_cols: usize,
    /// Size after growth.
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaredEvent {
    pub column: usize,
    pub name: String,
    pub var_type: VariableType,
}

/// Accumulates events until the owner drains them.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<DatasetEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: DatasetEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[DatasetEvent] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<DatasetEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn grown(&self) -> Vec<&StoreGrownEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DatasetEvent::StoreGrown(g) => Some(g),
                _ => None,
            })
            .collect()
    }

    pub fn declared(&self) -> Vec<&VariableDeclaredEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DatasetEvent::VariableAutoDeclared(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn omitted(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DatasetEvent::SelectionOmitted { name } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}
