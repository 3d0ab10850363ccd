//! Variable metadata and the registry that keeps it aligned with columns.
//!
//! # Invariants
//!
//! 1. `variables[i].column_index == i` for every declared variable, so indices
//!    are unique, contiguous and inside `[0, len)`.
//! 2. Names are non-empty and unique (case-sensitive).
//! 3. The name index always mirrors `variables`.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cell::{parse_number, InputKind};
use crate::error::DatasetError;
use crate::value_label::{ValueLabel, ValueLabelSet};

pub const DEFAULT_WIDTH: u16 = 8;
pub const DEFAULT_DECIMALS: u8 = 2;
pub const DEFAULT_COLUMNS: u16 = 8;
pub const MAX_DISCRETE_MISSING: usize = 3;

/// Date display variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    DdMmmYyyy,
    DdMmYyyy,
    MmDdYyyy,
    YyyyMmDd,
    Iso,
    DateTime,
    Time,
}

impl DateFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::DdMmmYyyy => "dd-mmm-yyyy",
            Self::DdMmYyyy => "dd.mm.yyyy",
            Self::MmDdYyyy => "mm/dd/yyyy",
            Self::YyyyMmDd => "yyyy/mm/dd",
            Self::Iso => "yyyy-mm-dd",
            Self::DateTime => "dd-mmm-yyyy hh:mm:ss",
            Self::Time => "hh:mm:ss",
        }
    }

    fn from_pattern(pattern: &str) -> Option<Self> {
        [
            Self::DdMmmYyyy,
            Self::DdMmYyyy,
            Self::MmDdYyyy,
            Self::YyyyMmDd,
            Self::Iso,
            Self::DateTime,
            Self::Time,
        ]
        .into_iter()
        .find(|f| f.pattern() == pattern)
    }
}

/// User-defined currency slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyFormat {
    Cca,
    Ccb,
    Ccc,
    Ccd,
    Cce,
}

impl CurrencyFormat {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cca => "CCA",
            Self::Ccb => "CCB",
            Self::Ccc => "CCC",
            Self::Ccd => "CCD",
            Self::Cce => "CCE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "format", rename_all = "snake_case")]
pub enum VariableType {
    Numeric,
    Comma,
    Dot,
    Scientific,
    Date(DateFormat),
    Dollar,
    CustomCurrency(CurrencyFormat),
    String,
    RestrictedNumeric,
}

impl VariableType {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::String)
    }

    /// Stable text code used by the persisted schema.
    pub fn code(&self) -> String {
        match self {
            Self::Numeric => "NUMERIC".to_string(),
            Self::Comma => "COMMA".to_string(),
            Self::Dot => "DOT".to_string(),
            Self::Scientific => "SCIENTIFIC".to_string(),
            Self::Date(format) => format!("DATE:{}", format.pattern()),
            Self::Dollar => "DOLLAR".to_string(),
            Self::CustomCurrency(c) => format!("CURRENCY:{}", c.code()),
            Self::String => "STRING".to_string(),
            Self::RestrictedNumeric => "RESTRICTED_NUMERIC".to_string(),
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        if let Some(pattern) = code.strip_prefix("DATE:") {
            return DateFormat::from_pattern(pattern).map(Self::Date);
        }
        if let Some(currency) = code.strip_prefix("CURRENCY:") {
            let format = match currency {
                "CCA" => CurrencyFormat::Cca,
                "CCB" => CurrencyFormat::Ccb,
                "CCC" => CurrencyFormat::Ccc,
                "CCD" => CurrencyFormat::Ccd,
                "CCE" => CurrencyFormat::Cce,
                _ => return None,
            };
            return Some(Self::CustomCurrency(format));
        }
        match code {
            "NUMERIC" => Some(Self::Numeric),
            "COMMA" => Some(Self::Comma),
            "DOT" => Some(Self::Dot),
            "SCIENTIFIC" => Some(Self::Scientific),
            "DOLLAR" => Some(Self::Dollar),
            "STRING" => Some(Self::String),
            "RESTRICTED_NUMERIC" => Some(Self::RestrictedNumeric),
            _ => None,
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    #[default]
    Right,
    Center,
}

/// Scale type of a variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    Scale,
    Ordinal,
    Nominal,
    #[default]
    Unknown,
}

/// Modeling role of a variable (used by dialogs to pre-fill target lists).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Input,
    Target,
    Both,
    None,
    Partition,
    Split,
}

macro_rules! text_codes {
    ($ty:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $ty {
            pub fn code(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

text_codes!(Align { Left => "left", Right => "right", Center => "center" });
text_codes!(Measure { Scale => "scale", Ordinal => "ordinal", Nominal => "nominal", Unknown => "unknown" });
text_codes!(Role {
    Input => "input",
    Target => "target",
    Both => "both",
    None => "none",
    Partition => "partition",
    Split => "split",
});

/// User-declared missing values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingValues {
    #[default]
    None,
    /// Up to three literal values.
    Discrete { values: Vec<String> },
    /// Inclusive numeric range plus one optional literal.
    Range {
        low: f64,
        high: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        discrete: Option<String>,
    },
}

impl MissingValues {
    pub fn is_user_missing(&self, value: &str) -> bool {
        match self {
            MissingValues::None => false,
            MissingValues::Discrete { values } => values.iter().any(|m| same_value(m, value)),
            MissingValues::Range { low, high, discrete } => {
                let in_range = parse_number(value).is_some_and(|n| n >= *low && n <= *high);
                in_range || discrete.as_deref().is_some_and(|m| same_value(m, value))
            }
        }
    }

    fn validate(&self) -> Result<(), DatasetError> {
        match self {
            MissingValues::Discrete { values } if values.len() > MAX_DISCRETE_MISSING => {
                Err(DatasetError::InvalidMissing(format!(
                    "at most {MAX_DISCRETE_MISSING} discrete missing values, got {}",
                    values.len()
                )))
            }
            MissingValues::Range { low, high, .. } if low > high => Err(DatasetError::InvalidMissing(
                format!("range low {low} is above high {high}"),
            )),
            _ => Ok(()),
        }
    }
}

fn same_value(declared: &str, value: &str) -> bool {
    match (parse_number(declared), parse_number(value)) {
        (Some(a), Some(b)) => a == b,
        _ => declared.trim() == value.trim(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: u64,
    pub column_index: usize,
    pub name: String,
    pub var_type: VariableType,
    pub width: u16,
    pub decimals: u8,
    pub label: String,
    pub missing: MissingValues,
    /// Display width in grid columns.
    pub columns: u16,
    pub align: Align,
    pub measure: Measure,
    pub role: Role,
}

impl Variable {
    /// A numeric variable with default formatting. `id` and `column_index` are
    /// assigned by the registry on insertion.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            column_index: 0,
            name: name.into(),
            var_type: VariableType::Numeric,
            width: DEFAULT_WIDTH,
            decimals: DEFAULT_DECIMALS,
            label: String::new(),
            missing: MissingValues::None,
            columns: DEFAULT_COLUMNS,
            align: Align::Right,
            measure: Measure::Unknown,
            role: Role::Input,
        }
    }

    /// Variable inferred from the first value written to its column.
    fn inferred(name: String, first_value: &str) -> Self {
        let mut variable = Self::new(name);
        match InputKind::classify(first_value) {
            InputKind::Numeric => {
                variable.var_type = VariableType::Numeric;
                variable.align = Align::Right;
                variable.measure = Measure::Scale;
            }
            InputKind::Text => {
                variable.var_type = VariableType::String;
                variable.align = Align::Left;
                variable.measure = Measure::Unknown;
                variable.decimals = 0;
            }
        }
        variable
    }

    /// Blank cells are system-missing; numeric variables also treat
    /// non-numeric text as system-missing.
    pub fn is_system_missing(&self, value: &str) -> bool {
        if value.trim().is_empty() {
            return true;
        }
        self.var_type.is_numeric() && parse_number(value).is_none()
    }

    pub fn is_missing(&self, value: &str) -> bool {
        self.is_system_missing(value) || self.missing.is_user_missing(value)
    }

    /// Label if set, otherwise the name.
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

/// A single typed field update.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableUpdate {
    Name(String),
    Type(VariableType),
    Width(u16),
    Decimals(u8),
    Label(String),
    Missing(MissingValues),
    Columns(u16),
    Align(Align),
    Measure(Measure),
    Role(Role),
}

/// Ordered set of variables keyed by column position.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: Vec<Variable>,
    by_name: FxHashMap<String, usize>,
    value_labels: ValueLabelSet,
    next_id: u64,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Rebuild a registry from persisted variables. Column indices are
    /// re-derived from order; ids are kept. Names and missing-value
    /// declarations are checked as if each variable were added anew.
    pub fn from_variables(mut variables: Vec<Variable>, labels: Vec<ValueLabel>) -> Result<Self, DatasetError> {
        for variable in &variables {
            validate_name(&variable.name)?;
            variable.missing.validate()?;
        }
        variables.sort_by_key(|v| v.column_index);
        let mut registry = Self::new();
        registry.next_id = variables.iter().map(|v| v.id).max().unwrap_or(0) + 1;
        for (index, variable) in variables.iter_mut().enumerate() {
            variable.column_index = index;
        }
        registry.variables = variables;
        registry.reindex()?;
        registry.value_labels = ValueLabelSet::from(labels);
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable_by_column(&self, index: usize) -> Option<&Variable> {
        self.variables.get(index)
    }

    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.by_name.get(name).and_then(|&i| self.variables.get(i))
    }

    /// Append a variable at the next column index.
    pub fn add_variable(&mut self, variable: Variable) -> Result<&Variable, DatasetError> {
        let at = self.variables.len();
        self.insert_variable(at, variable)
    }

    /// Insert a variable at `at`, shifting later variables right.
    pub fn insert_variable(&mut self, at: usize, mut variable: Variable) -> Result<&Variable, DatasetError> {
        if at > self.variables.len() {
            return Err(DatasetError::ColumnOutOfRange { index: at, len: self.variables.len() });
        }
        if variable.name.trim().is_empty() {
            variable.name = self.default_name(at);
        }
        validate_name(&variable.name)?;
        if self.by_name.contains_key(&variable.name) {
            return Err(DatasetError::DuplicateName(variable.name));
        }
        variable.missing.validate()?;

        variable.id = self.next_id;
        self.next_id += 1;
        self.variables.insert(at, variable);
        self.renumber_from(at);
        self.reindex()?;
        Ok(&self.variables[at])
    }

    /// Remove the variable at `index`, shifting later variables left.
    /// Its value labels are dropped with it.
    pub fn remove_variable(&mut self, index: usize) -> Result<Variable, DatasetError> {
        if index >= self.variables.len() {
            return Err(DatasetError::ColumnOutOfRange { index, len: self.variables.len() });
        }
        let removed = self.variables.remove(index);
        self.renumber_from(index);
        self.reindex()?;
        self.value_labels.remove_variable(&removed.name);
        Ok(removed)
    }

    /// Move the variable at `from` to `to`, renumbering everything in between.
    pub fn move_variable(&mut self, from: usize, to: usize) -> Result<(), DatasetError> {
        let len = self.variables.len();
        for index in [from, to] {
            if index >= len {
                return Err(DatasetError::ColumnOutOfRange { index, len });
            }
        }
        let variable = self.variables.remove(from);
        self.variables.insert(to, variable);
        self.renumber_from(from.min(to));
        self.reindex()
    }

    pub fn update_variable(&mut self, index: usize, update: VariableUpdate) -> Result<(), DatasetError> {
        let len = self.variables.len();
        if index >= len {
            return Err(DatasetError::ColumnOutOfRange { index, len });
        }

        if let VariableUpdate::Name(ref name) = update {
            validate_name(name)?;
            if let Some(&owner) = self.by_name.get(name) {
                if owner != index {
                    return Err(DatasetError::DuplicateName(name.clone()));
                }
            }
        }
        if let VariableUpdate::Missing(ref missing) = update {
            missing.validate()?;
        }

        let variable = &mut self.variables[index];
        match update {
            VariableUpdate::Name(name) => {
                let old = std::mem::replace(&mut variable.name, name.clone());
                self.value_labels.rename_variable(&old, &name);
                self.reindex()?;
            }
            VariableUpdate::Type(var_type) => {
                variable.var_type = var_type;
                if var_type == VariableType::String {
                    variable.decimals = 0;
                }
            }
            VariableUpdate::Width(width) => variable.width = width,
            VariableUpdate::Decimals(decimals) => variable.decimals = decimals,
            VariableUpdate::Label(label) => variable.label = label,
            VariableUpdate::Missing(missing) => variable.missing = missing,
            VariableUpdate::Columns(columns) => variable.columns = columns,
            VariableUpdate::Align(align) => variable.align = align,
            VariableUpdate::Measure(measure) => variable.measure = measure,
            VariableUpdate::Role(role) => variable.role = role,
        }
        Ok(())
    }

    /// Declare default variables for every column below `total_columns` that
    /// has none yet. Returns how many were declared.
    pub fn load_variables(&mut self, total_columns: usize) -> usize {
        let before = self.variables.len();
        while self.variables.len() < total_columns {
            let name = self.default_name(self.variables.len());
            let variable = Variable::new(name);
            // Default names are unique by construction and missing is None.
            if self.add_variable(variable).is_err() {
                break;
            }
        }
        self.variables.len() - before
    }

    /// Declare a variable for `col` from the first value observed there.
    ///
    /// Columns below `col` without a variable get defaults so indices stay
    /// contiguous. Returns `None` if `col` was already declared: the inferred
    /// type is fixed at first sight and never re-evaluated.
    pub fn auto_declare(&mut self, col: usize, first_value: &str) -> Option<&Variable> {
        if col < self.variables.len() {
            return None;
        }
        self.load_variables(col);
        let name = self.default_name(col);
        let variable = Variable::inferred(name, first_value);
        self.add_variable(variable).ok()
    }

    pub fn value_labels(&self) -> &ValueLabelSet {
        &self.value_labels
    }

    /// Replace every value label of `name`.
    pub fn set_value_labels(&mut self, name: &str, labels: Vec<(String, String)>) -> Result<(), DatasetError> {
        if !self.by_name.contains_key(name) {
            return Err(DatasetError::UnknownVariable(name.to_string()));
        }
        self.value_labels.set_for(name, labels);
        Ok(())
    }

    pub fn label_for(&self, name: &str, value: &str) -> Option<&str> {
        self.value_labels.label_for(name, value)
    }

    /// `Var{index+1}`, suffixed when a user already took that name.
    fn default_name(&self, index: usize) -> String {
        let base = format!("Var{}", index + 1);
        if !self.by_name.contains_key(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.by_name.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn renumber_from(&mut self, start: usize) {
        for (index, variable) in self.variables.iter_mut().enumerate().skip(start) {
            variable.column_index = index;
        }
    }

    fn reindex(&mut self) -> Result<(), DatasetError> {
        self.by_name.clear();
        for (index, variable) in self.variables.iter().enumerate() {
            if self.by_name.insert(variable.name.clone(), index).is_some() {
                return Err(DatasetError::DuplicateName(variable.name.clone()));
            }
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), DatasetError> {
    if name.trim().is_empty() {
        return Err(DatasetError::EmptyName);
    }
    if name.chars().any(char::is_whitespace) {
        return Err(DatasetError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(registry: &VariableRegistry) -> Vec<usize> {
        registry.variables().iter().map(|v| v.column_index).collect()
    }

    #[test]
    fn test_add_assigns_index_and_id() {
        let mut registry = VariableRegistry::new();
        registry.add_variable(Variable::new("age")).unwrap();
        let v = registry.add_variable(Variable::new("income")).unwrap();
        assert_eq!(v.column_index, 1);
        assert_eq!(v.id, 2);
        assert_eq!(registry.variable_by_name("age").unwrap().column_index, 0);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = VariableRegistry::new();
        registry.add_variable(Variable::new("x")).unwrap();
        let err = registry.add_variable(Variable::new("x")).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateName(name) if name == "x"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_blank_name_gets_default() {
        let mut registry = VariableRegistry::new();
        registry.add_variable(Variable::new("a")).unwrap();
        let v = registry.add_variable(Variable::new("")).unwrap();
        assert_eq!(v.name, "Var2");
    }

    #[test]
    fn test_default_name_skips_taken() {
        let mut registry = VariableRegistry::new();
        registry.add_variable(Variable::new("Var2")).unwrap();
        registry.load_variables(2);
        assert_eq!(registry.variable_by_column(1).unwrap().name, "Var2_2");
    }

    #[test]
    fn test_insert_remove_move_keep_indices_contiguous() {
        let mut registry = VariableRegistry::new();
        for name in ["a", "b", "c", "d"] {
            registry.add_variable(Variable::new(name)).unwrap();
        }
        registry.insert_variable(1, Variable::new("x")).unwrap();
        assert_eq!(indices(&registry), vec![0, 1, 2, 3, 4]);
        assert_eq!(registry.variable_by_name("b").unwrap().column_index, 2);

        registry.remove_variable(0).unwrap();
        assert_eq!(indices(&registry), vec![0, 1, 2, 3]);
        assert_eq!(registry.variable_by_name("x").unwrap().column_index, 0);

        registry.move_variable(0, 3).unwrap();
        assert_eq!(indices(&registry), vec![0, 1, 2, 3]);
        assert_eq!(registry.variable_by_name("x").unwrap().column_index, 3);
        assert_eq!(registry.variable_by_name("b").unwrap().column_index, 0);
    }

    #[test]
    fn test_update_rename_carries_value_labels() {
        let mut registry = VariableRegistry::new();
        registry.add_variable(Variable::new("sex")).unwrap();
        registry
            .set_value_labels("sex", vec![("1".into(), "Male".into()), ("2".into(), "Female".into())])
            .unwrap();

        registry.update_variable(0, VariableUpdate::Name("gender".into())).unwrap();

        assert!(registry.variable_by_name("sex").is_none());
        assert_eq!(registry.label_for("gender", "2"), Some("Female"));
        assert_eq!(registry.label_for("sex", "2"), None);
    }

    #[test]
    fn test_update_rename_to_taken_name_fails() {
        let mut registry = VariableRegistry::new();
        registry.add_variable(Variable::new("a")).unwrap();
        registry.add_variable(Variable::new("b")).unwrap();
        let err = registry.update_variable(1, VariableUpdate::Name("a".into())).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateName(_)));
        // Renaming to its own name is fine
        registry.update_variable(1, VariableUpdate::Name("b".into())).unwrap();
    }

    #[test]
    fn test_too_many_discrete_missing_rejected() {
        let mut registry = VariableRegistry::new();
        registry.add_variable(Variable::new("a")).unwrap();
        let missing = MissingValues::Discrete {
            values: vec!["1".into(), "2".into(), "3".into(), "4".into()],
        };
        let err = registry.update_variable(0, VariableUpdate::Missing(missing)).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidMissing(_)));
    }

    #[test]
    fn test_from_variables_rejects_inverted_range() {
        let mut bad = Variable::new("score");
        bad.missing = MissingValues::Range { low: 9.0, high: 1.0, discrete: None };
        let err = VariableRegistry::from_variables(vec![Variable::new("id"), bad], vec![]).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidMissing(_)));

        let err = VariableRegistry::from_variables(vec![Variable::new("two words")], vec![]).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidName(_)));
    }

    #[test]
    fn test_auto_declare_classifies_once() {
        let mut registry = VariableRegistry::new();
        let v = registry.auto_declare(0, "3.14").unwrap();
        assert_eq!(v.var_type, VariableType::Numeric);
        assert_eq!(v.align, Align::Right);
        assert_eq!(v.measure, Measure::Scale);
        assert_eq!(v.name, "Var1");
        assert_eq!(v.width, 8);

        // Already declared: no reclassification
        assert!(registry.auto_declare(0, "hello").is_none());
        assert_eq!(registry.variable_by_column(0).unwrap().var_type, VariableType::Numeric);
    }

    #[test]
    fn test_auto_declare_fills_gap_columns() {
        let mut registry = VariableRegistry::new();
        let v = registry.auto_declare(2, "abc").unwrap();
        assert_eq!(v.var_type, VariableType::String);
        assert_eq!(v.align, Align::Left);
        assert_eq!(v.name, "Var3");
        assert_eq!(indices(&registry), vec![0, 1, 2]);
        assert_eq!(registry.variable_by_column(0).unwrap().var_type, VariableType::Numeric);
    }

    #[test]
    fn test_missing_values() {
        let mut v = Variable::new("score");
        v.missing = MissingValues::Range { low: 97.0, high: 99.0, discrete: Some("-1".into()) };
        assert!(v.is_missing("98"));
        assert!(v.is_missing("-1.0"));
        assert!(v.is_missing(""));
        assert!(v.is_missing("n/a"));
        assert!(!v.is_missing("50"));

        let mut s = Variable::new("city");
        s.var_type = VariableType::String;
        s.missing = MissingValues::Discrete { values: vec!["unknown".into()] };
        assert!(s.is_missing("unknown"));
        assert!(!s.is_missing("Oslo"));
    }

    #[test]
    fn test_type_codes_round_trip() {
        for t in [
            VariableType::Numeric,
            VariableType::Date(DateFormat::MmDdYyyy),
            VariableType::CustomCurrency(CurrencyFormat::Ccd),
            VariableType::String,
            VariableType::RestrictedNumeric,
        ] {
            assert_eq!(VariableType::from_code(&t.code()), Some(t));
        }
        assert_eq!(VariableType::from_code("BOGUS"), None);
    }
}
