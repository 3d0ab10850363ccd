//! Reference compute modules.
//!
//! The math is deliberately elementary. These modules exist to drive the
//! boundary end to end; heavier procedures plug in through the same
//! [`ComputeModule`](crate::module::ComputeModule) trait.

mod crosstabs;
mod descriptives;
mod frequencies;

pub use crosstabs::Crosstabs;
pub use descriptives::Descriptives;
pub use frequencies::Frequencies;

use ordered_float::OrderedFloat;

use statgrid_engine::cell::parse_number;
use statgrid_engine::{ValueLabel, Variable};

/// Rows between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 4096;

/// Sort key for category values: numbers in numeric order, then text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum CategoryKey {
    Number(OrderedFloat<f64>),
    Text(String),
}

impl CategoryKey {
    fn of(variable: &Variable, value: &str) -> Self {
        if variable.var_type.is_numeric() {
            if let Some(n) = parse_number(value) {
                return Self::Number(OrderedFloat(n));
            }
        }
        Self::Text(value.trim().to_string())
    }

    fn display(&self) -> String {
        match self {
            Self::Number(n) => format_number(n.0),
            Self::Text(s) => s.clone(),
        }
    }
}

/// Canonical text for a numeric category: integers without a fraction.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Value label for `value` of `variable`, comparing numerically when both sides parse.
fn label_for(labels: &[ValueLabel], variable: &Variable, value: &str) -> Option<String> {
    labels
        .iter()
        .filter(|l| l.variable_name == variable.name)
        .find(|l| match (parse_number(&l.value), parse_number(value)) {
            (Some(a), Some(b)) => a == b,
            _ => l.value.trim() == value.trim(),
        })
        .map(|l| l.label.clone())
}
