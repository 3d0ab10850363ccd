use serde_json::Value;

use statgrid_engine::cell::parse_number;
use statgrid_protocol::results::{DescriptiveStats, DescriptivesOutput};
use statgrid_protocol::{AnalysisRole, TaskPayload};

use super::CANCEL_CHECK_INTERVAL;
use crate::error::ComputeError;
use crate::module::{decode_payload, CancelToken, ComputeModule};

/// N, range, mean and dispersion per numeric variable.
pub struct Descriptives;

impl ComputeModule for Descriptives {
    fn action(&self) -> &'static str {
        "descriptives"
    }

    fn compute(&self, data: &Value, cancel: &CancelToken) -> Result<Value, ComputeError> {
        let payload: TaskPayload = decode_payload(data)?;
        let role = payload
            .role(AnalysisRole::Variables)
            .filter(|r| !r.variables.is_empty())
            .ok_or_else(|| ComputeError::Validation("descriptives requires at least one variable".into()))?;

        if let Some(v) = role.variables.iter().find(|v| !v.var_type.is_numeric()) {
            return Err(ComputeError::Validation(format!(
                "descriptives requires numeric variables; '{}' is {}",
                v.name, v.var_type
            )));
        }

        let mut accumulators = vec![Moments::default(); role.variables.len()];
        let mut valid_listwise = 0usize;

        for (n, row) in role.data.iter().enumerate() {
            if n % CANCEL_CHECK_INTERVAL == 0 {
                cancel.check()?;
            }
            let mut all_valid = true;
            for (index, variable) in role.variables.iter().enumerate() {
                let value = row.get(index).map(String::as_str).unwrap_or("");
                match parse_number(value).filter(|_| !variable.is_missing(value)) {
                    Some(x) => accumulators[index].push(x),
                    None => all_valid = false,
                }
            }
            if all_valid {
                valid_listwise += 1;
            }
        }

        let variables = role
            .variables
            .iter()
            .zip(&accumulators)
            .map(|(variable, m)| DescriptiveStats {
                variable: variable.name.clone(),
                label: variable.label.clone(),
                n: m.n,
                minimum: m.min,
                maximum: m.max,
                sum: (m.n > 0).then_some(m.sum),
                mean: (m.n > 0).then_some(m.mean),
                std_dev: m.variance().map(f64::sqrt),
                variance: m.variance(),
            })
            .collect();

        serde_json::to_value(DescriptivesOutput { variables, valid_listwise })
            .map_err(|e| ComputeError::Internal(e.to_string()))
    }
}

/// Running moments (Welford).
#[derive(Debug, Clone, Default)]
struct Moments {
    n: usize,
    mean: f64,
    m2: f64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Moments {
    fn push(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
        self.min = Some(self.min.map_or(x, |m| m.min(x)));
        self.max = Some(self.max.map_or(x, |m| m.max(x)));
    }

    /// Sample variance; undefined below two observations.
    fn variance(&self) -> Option<f64> {
        (self.n > 1).then(|| self.m2 / (self.n - 1) as f64)
    }
}
