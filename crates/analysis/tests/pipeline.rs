//! End-to-end runs: dataset → compute pool → result tables → audit store.

use std::thread;
use std::time::Duration;

use serde_json::Value;
use tempfile::tempdir;

use statgrid_analysis::analyses::{Crosstabs, Descriptives, Frequencies};
use statgrid_analysis::{
    Analysis, AnalysisError, AnalyticOutput, ColumnHeader, Pipeline, PipelineState, ResultRow, ResultTable,
    StatisticOutput, TableValue,
};
use statgrid_compute::{
    CancelToken, ComputeError, ComputeModule, ComputePool, ModuleRegistry, PoolConfig, TransportError,
};
use statgrid_engine::{CellChange, Dataset, VariableUpdate};
use statgrid_io::AuditStore;
use statgrid_protocol::{AnalysisRole, TaskPayload};

/// Returns its payload untouched.
struct EchoModule;

impl ComputeModule for EchoModule {
    fn action(&self) -> &'static str {
        "echo"
    }

    fn compute(&self, data: &Value, _cancel: &CancelToken) -> Result<Value, ComputeError> {
        Ok(data.clone())
    }
}

/// Runs until cancelled.
struct SpinModule;

impl ComputeModule for SpinModule {
    fn action(&self) -> &'static str {
        "spin"
    }

    fn compute(&self, _data: &Value, cancel: &CancelToken) -> Result<Value, ComputeError> {
        loop {
            cancel.check()?;
            thread::sleep(Duration::from_millis(2));
        }
    }
}

/// Puts the sliced rows it receives back into a table.
struct Echo {
    action: &'static str,
    names: Vec<String>,
    title: String,
}

impl Echo {
    fn new(names: &[&str]) -> Self {
        Self {
            action: "echo",
            names: names.iter().map(|n| n.to_string()).collect(),
            title: "Echo".into(),
        }
    }
}

impl Analysis for Echo {
    fn action(&self) -> &'static str {
        self.action
    }

    fn title(&self) -> String {
        "Echo".into()
    }

    fn log_text(&self) -> String {
        format!("ECHO {}.", self.names.join(" "))
    }

    fn selections(&self) -> Vec<(AnalysisRole, Vec<String>)> {
        vec![(AnalysisRole::Variables, self.names.clone())]
    }

    fn map_result(&self, raw: Value) -> Result<AnalyticOutput, AnalysisError> {
        let payload: TaskPayload = serde_json::from_value(raw)?;
        let role = &payload.roles[0];
        let headers = role
            .variables
            .iter()
            .enumerate()
            .map(|(i, v)| ColumnHeader::leaf(v.name.clone(), format!("v{i}")))
            .collect();
        let mut table = ResultTable::new(self.title.clone(), headers);
        for (n, row) in role.data.iter().enumerate() {
            let mut r = ResultRow::new([Some(format!("{}", n + 1))]);
            for (i, value) in row.iter().enumerate() {
                r = r.with(format!("v{i}"), TableValue::text(value.clone()));
            }
            table.push(r);
        }
        Ok(AnalyticOutput {
            statistics: vec![StatisticOutput::new(table, self.names.clone())],
        })
    }
}

fn pipeline(timeout: Option<Duration>) -> Pipeline {
    let mut registry = ModuleRegistry::with_defaults();
    registry.register(EchoModule);
    registry.register(SpinModule);
    let pool = ComputePool::start(PoolConfig { workers: 2 }, registry).unwrap();
    Pipeline::with_pool(pool, timeout)
}

fn two_by_two() -> Dataset {
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

fn survey() -> Dataset {
    let mut ds = Dataset::new();
    let rows = [["1", "m", "20"], ["2", "f", "31"], ["2", "f", "45"], ["1", "m", "38"], ["", "f", "27"]];
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            ds.set_cell(c, r, value);
        }
    }
    for (i, name) in ["group", "sex", "age"].iter().enumerate() {
        ds.update_variable(i, VariableUpdate::Name(name.to_string())).unwrap();
    }
    ds.set_value_labels("group", vec![("1".into(), "Control".into()), ("2".into(), "Treatment".into())])
        .unwrap();
    ds
}

fn texts(table: &ResultTable) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|r| {
            r.values
                .values()
                .map(|v| match v {
                    TableValue::Text(t) => t.clone(),
                    TableValue::Number(n) => n.to_string(),
                })
                .collect()
        })
        .collect()
}

#[test]
fn selection_order_reaches_the_compute_module() {
    let pipeline = pipeline(None);
    let mut ds = two_by_two();

    let output = pipeline
        .dispatch(&mut ds, Box::new(Echo::new(&["B", "A"])))
        .unwrap()
        .wait()
        .unwrap();

    let table = &output.statistics[0].table;
    assert_eq!(texts(table), vec![vec!["2", "1"], vec!["4", "3"]]);
    assert_eq!(table.column_headers[0].header, "B");
}

#[test]
fn unknown_selection_is_omitted_and_recorded() {
    let pipeline = pipeline(None);
    let mut ds = two_by_two();

    let output = pipeline
        .dispatch(&mut ds, Box::new(Echo::new(&["B", "Z"])))
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(texts(&output.statistics[0].table), vec![vec!["2"], vec!["4"]]);
    assert!(ds
        .take_events()
        .iter()
        .any(|e| matches!(e, statgrid_engine::DatasetEvent::SelectionOmitted { name } if name == "Z")));
}

#[test]
fn frequencies_run_records_one_chain() {
    let dir = tempdir().unwrap();
    let mut audit = AuditStore::open(&dir.path().join("audit.sgrid")).unwrap();
    let pipeline = pipeline(Some(Duration::from_secs(10)));
    let mut ds = survey();

    let report = pipeline
        .run(&mut ds, Box::new(Frequencies::new(vec!["group".into()])), &mut audit)
        .unwrap();

    assert_eq!(report.title, "Frequencies");
    let logs = audit.logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].text, "FREQUENCIES VARIABLES=group.");

    let analytics = audit.analytics_for(report.chain.log).unwrap();
    assert_eq!(analytics.len(), 1);
    let stats = audit.statistics_for(report.chain.analytic).unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[1].components.as_deref(), Some(r#"["group"]"#));

    let table: ResultTable = serde_json::from_str(&stats[1].output_data).unwrap();
    let control = &table.rows[0];
    assert_eq!(control.row_header[1].as_deref(), Some("Control"));
    assert_eq!(control.values["frequency"], TableValue::Number(2.0));
    assert_eq!(control.values["validPercent"], TableValue::Number(50.0));
    assert_eq!(control.values["percent"], TableValue::Number(40.0));
}

#[test]
fn concurrent_analyses_complete_in_any_order() {
    let dir = tempdir().unwrap();
    let mut audit = AuditStore::open(&dir.path().join("audit.sgrid")).unwrap();
    let pipeline = pipeline(None);
    let mut ds = survey();

    let first = pipeline
        .dispatch(&mut ds, Box::new(Descriptives::new(vec!["age".into()])))
        .unwrap();
    let second = pipeline
        .dispatch(&mut ds, Box::new(Crosstabs::new("sex", "group")))
        .unwrap();
    assert!(second.request_id() > first.request_id());
    assert_eq!(first.state(), PipelineState::Dispatched);

    let crosstab = second.complete(&mut audit).unwrap();
    let descriptives = first.complete(&mut audit).unwrap();

    assert_eq!(crosstab.title, "Crosstabs");
    assert_eq!(
        crosstab.output.statistics[1].table.title,
        "sex * group Crosstabulation"
    );
    let row = &descriptives.output.statistics[0].table.rows[0];
    assert_eq!(row.values["n"], TableValue::Number(5.0));
    assert_eq!(row.values["mean"], TableValue::Number(32.2));
    assert_eq!(audit.logs().unwrap().len(), 2);
}

#[test]
fn all_missing_crosstab_is_recorded() {
    let mut audit = AuditStore::open_in_memory().unwrap();
    let pipeline = pipeline(None);
    // Every case is blank in one of the two variables
    let mut ds = Dataset::new();
    ds.set_cell(0, 0, "1");
    ds.set_cell(1, 1, "x");
    ds.set_cell(0, 2, "2");
    ds.update_variable(0, VariableUpdate::Name("a".into())).unwrap();
    ds.update_variable(1, VariableUpdate::Name("b".into())).unwrap();

    let report = pipeline
        .run(&mut ds, Box::new(Crosstabs::new("a", "b")), &mut audit)
        .unwrap();

    let counts = &report.output.statistics[1].table;
    assert_eq!(counts.leaf_keys(), vec!["total"]);
    assert_eq!(audit.statistics_for(report.chain.analytic).unwrap().len(), 2);
}

#[test]
fn repeated_frequencies_selection_runs_once() {
    let mut audit = AuditStore::open_in_memory().unwrap();
    let pipeline = pipeline(None);
    let mut ds = survey();

    let report = pipeline
        .run(
            &mut ds,
            Box::new(Frequencies::new(vec!["group".into(), "group".into()])),
            &mut audit,
        )
        .unwrap();

    assert_eq!(report.output.statistics.len(), 2);
    assert_eq!(audit.logs().unwrap()[0].text, "FREQUENCIES VARIABLES=group.");
}

#[test]
fn compute_failure_persists_nothing() {
    let mut audit = AuditStore::open_in_memory().unwrap();
    let pipeline = pipeline(None);
    let mut ds = survey();

    // String variables are rejected by descriptives
    let err = pipeline
        .run(&mut ds, Box::new(Descriptives::new(vec!["sex".into()])), &mut audit)
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Compute(msg) if msg.contains("numeric")));
    assert!(audit.logs().unwrap().is_empty());
    assert_eq!(audit.analytic_count().unwrap(), 0);
}

#[test]
fn malformed_table_persists_nothing() {
    let mut audit = AuditStore::open_in_memory().unwrap();
    let pipeline = pipeline(None);
    let mut ds = two_by_two();
    let mut echo = Echo::new(&["A"]);
    echo.title = String::new();

    let err = pipeline.run(&mut ds, Box::new(echo), &mut audit).unwrap_err();

    assert!(matches!(err, AnalysisError::Mapping(_)));
    assert!(audit.logs().unwrap().is_empty());
}

#[test]
fn cancel_stops_a_running_analysis() {
    let mut audit = AuditStore::open_in_memory().unwrap();
    let pipeline = pipeline(None);
    let mut ds = two_by_two();
    let mut spin = Echo::new(&["A"]);
    spin.action = "spin";

    let pending = pipeline.dispatch(&mut ds, Box::new(spin)).unwrap();
    let canceller = pending.canceller();
    let id = pending.request_id();
    let waiter = thread::spawn(move || pending.complete(&mut audit).map(|_| ()).map_err(|e| (e, audit)));

    // Retry until the worker has registered the request
    let mut cancelled = false;
    for _ in 0..500 {
        if canceller.send(statgrid_protocol::CancelMessage { id }) {
            cancelled = true;
            break;
        }
        thread::sleep(Duration::from_millis(2));
    }
    assert!(cancelled);

    let (err, audit) = waiter.join().unwrap().unwrap_err();
    assert_eq!(err, AnalysisError::Transport(TransportError::Cancelled { id }));
    assert!(audit.logs().unwrap().is_empty());
}

#[test]
fn timeout_fails_the_analysis() {
    let pipeline = pipeline(Some(Duration::from_millis(50)));
    let mut ds = two_by_two();
    let mut spin = Echo::new(&["A"]);
    spin.action = "spin";

    let err = pipeline.dispatch(&mut ds, Box::new(spin)).unwrap().wait().unwrap_err();
    assert!(matches!(err, AnalysisError::Transport(TransportError::Timeout { .. })));
}

#[test]
fn unknown_action_is_a_compute_failure() {
    let pipeline = pipeline(None);
    let mut ds = two_by_two();
    let mut echo = Echo::new(&["A"]);
    echo.action = "regression";

    let err = pipeline.dispatch(&mut ds, Box::new(echo)).unwrap().wait().unwrap_err();
    assert!(matches!(err, AnalysisError::Compute(msg) if msg.contains("unknown action")));

    // Pool is still usable afterwards
    let ok = pipeline.dispatch(&mut ds, Box::new(Echo::new(&["A"]))).unwrap().wait();
    assert!(ok.is_ok());
}
