use serde_json::Value;

use statgrid_protocol::results::{FrequenciesOutput, FrequencyTable};
use statgrid_protocol::AnalysisRole;

use super::{decode, display_name};
use crate::error::AnalysisError;
use crate::pipeline::{Analysis, AnalyticOutput, StatisticOutput};
use crate::table::{ColumnHeader, Precision, ResultRow, ResultTable, TableValue};

/// Frequency tables for one or more variables.
#[derive(Debug, Clone)]
pub struct Frequencies {
    variables: Vec<String>,
}

impl Frequencies {
    /// Repeated names are kept once, at their first position.
    pub fn new(variables: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(variables.len());
        for name in variables {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self { variables: unique }
    }
}

impl Analysis for Frequencies {
    fn action(&self) -> &'static str {
        "frequencies"
    }

    fn title(&self) -> String {
        "Frequencies".to_string()
    }

    fn log_text(&self) -> String {
        format!("FREQUENCIES VARIABLES={}.", self.variables.join(" "))
    }

    fn selections(&self) -> Vec<(AnalysisRole, Vec<String>)> {
        vec![(AnalysisRole::Variables, self.variables.clone())]
    }

    fn map_result(&self, raw: Value) -> Result<AnalyticOutput, AnalysisError> {
        let out: FrequenciesOutput = decode(self.action(), raw)?;

        let mut statistics = vec![StatisticOutput::new(
            summary_table(&out.variables),
            out.variables.iter().map(|t| t.variable.clone()).collect(),
        )];
        for table in &out.variables {
            statistics.push(StatisticOutput::new(frequency_table(table), vec![table.variable.clone()]));
        }
        Ok(AnalyticOutput { statistics })
    }
}

/// Valid and missing N, one column per variable.
fn summary_table(tables: &[FrequencyTable]) -> ResultTable {
    let headers = tables
        .iter()
        .map(|t| ColumnHeader::leaf(display_name(&t.variable, &t.label), t.variable.clone()))
        .collect();
    let mut result = ResultTable::new("Statistics", headers);

    let mut valid = ResultRow::new([Some("N"), Some("Valid")]);
    let mut missing = ResultRow::new([Some("N"), Some("Missing")]);
    for t in tables {
        valid = valid.with(t.variable.clone(), TableValue::count(t.valid));
        missing = missing.with(t.variable.clone(), TableValue::count(t.missing));
    }
    result.push(valid);
    result.push(missing);
    result
}

fn frequency_table(table: &FrequencyTable) -> ResultTable {
    let mut result = ResultTable::new(
        display_name(&table.variable, &table.label),
        vec![
            ColumnHeader::leaf("Frequency", "frequency"),
            ColumnHeader::leaf("Percent", "percent"),
            ColumnHeader::leaf("Valid Percent", "validPercent"),
            ColumnHeader::leaf("Cumulative Percent", "cumulativePercent"),
        ],
    );
    let share = |n: usize| {
        if table.total == 0 {
            0.0
        } else {
            n as f64 / table.total as f64 * 100.0
        }
    };

    for row in &table.rows {
        let shown = row.label.clone().unwrap_or_else(|| row.value.clone());
        result.push(
            ResultRow::new([Some("Valid".to_string()), Some(shown)])
                .with("frequency", TableValue::count(row.frequency))
                .with("percent", TableValue::number(row.percent, Precision::PERCENT))
                .with("validPercent", TableValue::number(row.valid_percent, Precision::PERCENT))
                .with("cumulativePercent", TableValue::number(row.cumulative_percent, Precision::PERCENT)),
        );
    }
    if table.valid > 0 {
        result.push(
            ResultRow::new([Some("Valid"), Some("Total")])
                .with("frequency", TableValue::count(table.valid))
                .with("percent", TableValue::number(share(table.valid), Precision::PERCENT))
                .with("validPercent", TableValue::number(100.0, Precision::PERCENT)),
        );
    }

    for row in &table.missing_rows {
        let shown = row.value.clone().unwrap_or_else(|| "System".to_string());
        result.push(
            ResultRow::new([Some("Missing".to_string()), Some(shown)])
                .with("frequency", TableValue::count(row.frequency))
                .with("percent", TableValue::number(row.percent, Precision::PERCENT)),
        );
    }
    if table.missing_rows.len() > 1 {
        result.push(
            ResultRow::new([Some("Missing"), Some("Total")])
                .with("frequency", TableValue::count(table.missing))
                .with("percent", TableValue::number(share(table.missing), Precision::PERCENT)),
        );
    }

    result.push(
        ResultRow::new([Some("Total"), None])
            .with("frequency", TableValue::count(table.total))
            .with("percent", TableValue::number(share(table.total), Precision::PERCENT)),
    );
    result
}
