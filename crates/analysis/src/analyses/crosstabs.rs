use serde_json::Value;

use statgrid_protocol::results::CrosstabOutput;
use statgrid_protocol::AnalysisRole;

use super::decode;
use crate::error::AnalysisError;
use crate::pipeline::{Analysis, AnalyticOutput, StatisticOutput};
use crate::table::{ColumnHeader, Precision, ResultRow, ResultTable, TableValue};

/// Count table of one row variable against one column variable.
#[derive(Debug, Clone)]
pub struct Crosstabs {
    row: String,
    column: String,
}

impl Crosstabs {
    pub fn new(row: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            column: column.into(),
        }
    }
}

impl Analysis for Crosstabs {
    fn action(&self) -> &'static str {
        "crosstabs"
    }

    fn title(&self) -> String {
        "Crosstabs".to_string()
    }

    fn log_text(&self) -> String {
        format!("CROSSTABS /TABLES={} BY {}.", self.row, self.column)
    }

    fn selections(&self) -> Vec<(AnalysisRole, Vec<String>)> {
        vec![
            (AnalysisRole::Dependent, vec![self.row.clone()]),
            (AnalysisRole::Independent, vec![self.column.clone()]),
        ]
    }

    fn map_result(&self, raw: Value) -> Result<AnalyticOutput, AnalysisError> {
        let out: CrosstabOutput = decode(self.action(), raw)?;
        if out.counts.len() != out.row_categories.len()
            || out.counts.iter().any(|r| r.len() != out.column_categories.len())
        {
            return Err(AnalysisError::Mapping("crosstabs: count matrix does not match categories".into()));
        }

        let components = vec![out.row_variable.clone(), out.column_variable.clone()];
        Ok(AnalyticOutput {
            statistics: vec![
                StatisticOutput::new(case_summary(&out), components.clone()),
                StatisticOutput::new(count_table(&out), components),
            ],
        })
    }
}

fn case_summary(out: &CrosstabOutput) -> ResultTable {
    let pair = |label: &str, key: &str| {
        ColumnHeader::group(
            label,
            vec![
                ColumnHeader::leaf("N", format!("{key}N")),
                ColumnHeader::leaf("Percent", format!("{key}Percent")),
            ],
        )
    };
    let mut table = ResultTable::new(
        "Case Processing Summary",
        vec![pair("Valid", "valid"), pair("Missing", "missing"), pair("Total", "total")],
    );

    let cases = out.total + out.missing;
    let share = |n: usize| if cases == 0 { 0.0 } else { n as f64 / cases as f64 * 100.0 };
    table.push(
        ResultRow::new([Some(format!("{} * {}", out.row_variable, out.column_variable))])
            .with("validN", TableValue::count(out.total))
            .with("validPercent", TableValue::number(share(out.total), Precision::PERCENT))
            .with("missingN", TableValue::count(out.missing))
            .with("missingPercent", TableValue::number(share(out.missing), Precision::PERCENT))
            .with("totalN", TableValue::count(cases))
            .with("totalPercent", TableValue::number(share(cases), Precision::PERCENT)),
    );
    table
}

fn count_table(out: &CrosstabOutput) -> ResultTable {
    let category_headers = out
        .column_categories
        .iter()
        .enumerate()
        .map(|(i, c)| ColumnHeader::leaf(c.clone(), format!("c{i}")))
        .collect();
    // With every case missing there are no categories to group
    let mut headers = Vec::with_capacity(2);
    if !out.column_categories.is_empty() {
        headers.push(ColumnHeader::group(out.column_variable.clone(), category_headers));
    }
    headers.push(ColumnHeader::leaf("Total", "total"));
    let mut table = ResultTable::new(
        format!("{} * {} Crosstabulation", out.row_variable, out.column_variable),
        headers,
    );

    for (r, category) in out.row_categories.iter().enumerate() {
        let mut row = ResultRow::new([Some(out.row_variable.clone()), Some(category.clone())]);
        for (c, count) in out.counts[r].iter().enumerate() {
            row = row.with(format!("c{c}"), TableValue::count(*count));
        }
        table.push(row.with("total", TableValue::count(out.row_totals.get(r).copied().unwrap_or(0))));
    }

    let mut totals = ResultRow::new([Some("Total"), None]);
    for (c, count) in out.column_totals.iter().enumerate() {
        totals = totals.with(format!("c{c}"), TableValue::count(*count));
    }
    table.push(totals.with("total", TableValue::count(out.total)));
    table
}
