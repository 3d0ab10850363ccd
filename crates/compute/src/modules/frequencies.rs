use std::collections::BTreeMap;

use serde_json::Value;

use statgrid_protocol::results::{FrequenciesOutput, FrequencyRow, FrequencyTable, MissingRow};
use statgrid_protocol::{AnalysisRole, RoleData, TaskPayload};

use super::{label_for, CategoryKey, CANCEL_CHECK_INTERVAL};
use crate::error::ComputeError;
use crate::module::{decode_payload, CancelToken, ComputeModule};

/// Counts of distinct values per variable.
pub struct Frequencies;

impl ComputeModule for Frequencies {
    fn action(&self) -> &'static str {
        "frequencies"
    }

    fn compute(&self, data: &Value, cancel: &CancelToken) -> Result<Value, ComputeError> {
        let payload: TaskPayload = decode_payload(data)?;
        let role = payload
            .role(AnalysisRole::Variables)
            .filter(|r| !r.variables.is_empty())
            .ok_or_else(|| ComputeError::Validation("frequencies requires at least one variable".into()))?;

        let mut tables = Vec::with_capacity(role.variables.len());
        for index in 0..role.variables.len() {
            tables.push(frequency_table(role, index, cancel)?);
        }

        serde_json::to_value(FrequenciesOutput { variables: tables })
            .map_err(|e| ComputeError::Internal(e.to_string()))
    }
}

fn frequency_table(role: &RoleData, index: usize, cancel: &CancelToken) -> Result<FrequencyTable, ComputeError> {
    let variable = &role.variables[index];
    let mut valid: BTreeMap<CategoryKey, usize> = BTreeMap::new();
    let mut user_missing: BTreeMap<CategoryKey, usize> = BTreeMap::new();
    let mut system_missing = 0usize;
    let mut total = 0usize;

    for (n, value) in role.column(index).enumerate() {
        if n % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }
        total += 1;
        if variable.is_system_missing(value) {
            system_missing += 1;
        } else if variable.missing.is_user_missing(value) {
            *user_missing.entry(CategoryKey::of(variable, value)).or_insert(0) += 1;
        } else {
            *valid.entry(CategoryKey::of(variable, value)).or_insert(0) += 1;
        }
    }

    let valid_count: usize = valid.values().sum();
    let percent_of = |count: usize, base: usize| {
        if base == 0 {
            0.0
        } else {
            count as f64 / base as f64 * 100.0
        }
    };

    let mut cumulative = 0usize;
    let rows = valid
        .into_iter()
        .map(|(key, frequency)| {
            cumulative += frequency;
            let value = key.display();
            FrequencyRow {
                label: label_for(&role.value_labels, variable, &value),
                value,
                frequency,
                percent: percent_of(frequency, total),
                valid_percent: percent_of(frequency, valid_count),
                // From counts, so the last row is exactly 100
                cumulative_percent: percent_of(cumulative, valid_count),
            }
        })
        .collect();

    let mut missing_rows: Vec<MissingRow> = user_missing
        .into_iter()
        .map(|(key, frequency)| MissingRow {
            value: Some(key.display()),
            frequency,
            percent: percent_of(frequency, total),
        })
        .collect();
    if system_missing > 0 {
        missing_rows.push(MissingRow {
            value: None,
            frequency: system_missing,
            percent: percent_of(system_missing, total),
        });
    }

    Ok(FrequencyTable {
        variable: variable.name.clone(),
        label: variable.label.clone(),
        rows,
        missing_rows,
        valid: valid_count,
        missing: total - valid_count,
        total,
    })
}
