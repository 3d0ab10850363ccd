use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use statgrid_protocol::results::CrosstabOutput;
use statgrid_protocol::{AnalysisRole, RoleData, TaskPayload};

use super::{CategoryKey, CANCEL_CHECK_INTERVAL};
use crate::error::ComputeError;
use crate::module::{decode_payload, CancelToken, ComputeModule};

/// Two-way count table: the dependent variable down the rows, the
/// independent variable across the columns.
pub struct Crosstabs;

fn single(payload: &TaskPayload, role: AnalysisRole) -> Result<&RoleData, ComputeError> {
    match payload.role(role) {
        Some(r) if r.variables.len() == 1 => Ok(r),
        Some(r) => Err(ComputeError::Validation(format!(
            "crosstabs takes exactly one {} variable, got {}",
            role.as_str(),
            r.variables.len()
        ))),
        None => Err(ComputeError::Validation(format!(
            "crosstabs requires a {} variable",
            role.as_str()
        ))),
    }
}

impl ComputeModule for Crosstabs {
    fn action(&self) -> &'static str {
        "crosstabs"
    }

    fn compute(&self, data: &Value, cancel: &CancelToken) -> Result<Value, ComputeError> {
        let payload: TaskPayload = decode_payload(data)?;
        let rows_role = single(&payload, AnalysisRole::Dependent)?;
        let cols_role = single(&payload, AnalysisRole::Independent)?;
        if rows_role.data.len() != cols_role.data.len() {
            return Err(ComputeError::Validation(format!(
                "role slices disagree on case count ({} vs {})",
                rows_role.data.len(),
                cols_role.data.len()
            )));
        }

        let row_var = &rows_role.variables[0];
        let col_var = &cols_role.variables[0];
        let mut cells: BTreeMap<(CategoryKey, CategoryKey), usize> = BTreeMap::new();
        let mut row_keys = BTreeSet::new();
        let mut col_keys = BTreeSet::new();
        let mut missing = 0usize;

        for (n, (r, c)) in rows_role.column(0).zip(cols_role.column(0)).enumerate() {
            if n % CANCEL_CHECK_INTERVAL == 0 {
                cancel.check()?;
            }
            if row_var.is_missing(r) || col_var.is_missing(c) {
                missing += 1;
                continue;
            }
            let rk = CategoryKey::of(row_var, r);
            let ck = CategoryKey::of(col_var, c);
            row_keys.insert(rk.clone());
            col_keys.insert(ck.clone());
            *cells.entry((rk, ck)).or_insert(0) += 1;
        }

        let counts: Vec<Vec<usize>> = row_keys
            .iter()
            .map(|rk| {
                col_keys
                    .iter()
                    .map(|ck| cells.get(&(rk.clone(), ck.clone())).copied().unwrap_or(0))
                    .collect()
            })
            .collect();
        let row_totals: Vec<usize> = counts.iter().map(|r| r.iter().sum()).collect();
        let column_totals: Vec<usize> = (0..col_keys.len())
            .map(|c| counts.iter().map(|r| r[c]).sum())
            .collect();

        let output = CrosstabOutput {
            row_variable: row_var.name.clone(),
            column_variable: col_var.name.clone(),
            row_categories: row_keys.iter().map(CategoryKey::display).collect(),
            column_categories: col_keys.iter().map(CategoryKey::display).collect(),
            total: row_totals.iter().sum(),
            counts,
            row_totals,
            column_totals,
            missing,
        };
        serde_json::to_value(output).map_err(|e| ComputeError::Internal(e.to_string()))
    }
}
