use serde_json::Value;

use statgrid_protocol::results::DescriptivesOutput;
use statgrid_protocol::AnalysisRole;

use super::{decode, display_name};
use crate::error::AnalysisError;
use crate::pipeline::{Analysis, AnalyticOutput, StatisticOutput};
use crate::table::{ColumnHeader, Precision, ResultRow, ResultTable, TableValue};

/// N, minimum, maximum, sum, mean, standard deviation and variance.
#[derive(Debug, Clone)]
pub struct Descriptives {
    variables: Vec<String>,
}

impl Descriptives {
    pub fn new(variables: Vec<String>) -> Self {
        Self { variables }
    }
}

impl Analysis for Descriptives {
    fn action(&self) -> &'static str {
        "descriptives"
    }

    fn title(&self) -> String {
        "Descriptives".to_string()
    }

    fn log_text(&self) -> String {
        format!("DESCRIPTIVES VARIABLES={}.", self.variables.join(" "))
    }

    fn selections(&self) -> Vec<(AnalysisRole, Vec<String>)> {
        vec![(AnalysisRole::Variables, self.variables.clone())]
    }

    fn map_result(&self, raw: Value) -> Result<AnalyticOutput, AnalysisError> {
        let out: DescriptivesOutput = decode(self.action(), raw)?;

        let mut table = ResultTable::new(
            "Descriptive Statistics",
            vec![
                ColumnHeader::leaf("N", "n"),
                ColumnHeader::leaf("Minimum", "minimum"),
                ColumnHeader::leaf("Maximum", "maximum"),
                ColumnHeader::leaf("Sum", "sum"),
                ColumnHeader::leaf("Mean", "mean"),
                ColumnHeader::leaf("Std. Deviation", "stdDev"),
                ColumnHeader::leaf("Variance", "variance"),
            ],
        );

        for s in &out.variables {
            table.push(
                ResultRow::new([Some(display_name(&s.variable, &s.label))])
                    .with("n", TableValue::count(s.n))
                    .with_number("minimum", s.minimum, Precision::COEFFICIENT)
                    .with_number("maximum", s.maximum, Precision::COEFFICIENT)
                    .with_number("sum", s.sum, Precision::COEFFICIENT)
                    .with_number("mean", s.mean, Precision::COEFFICIENT)
                    .with_number("stdDev", s.std_dev, Precision::STD_DEV)
                    .with_number("variance", s.variance, Precision::COEFFICIENT),
            );
        }
        table.push(ResultRow::new([Some("Valid N (listwise)")]).with("n", TableValue::count(out.valid_listwise)));

        let components = out.variables.iter().map(|s| s.variable.clone()).collect();
        Ok(AnalyticOutput {
            statistics: vec![StatisticOutput::new(table, components)],
        })
    }
}
