//! Result Table Model: the pivot-table shape every analysis output takes.
//!
//! A table has at most two levels of column headers. Leaves carry the key
//! that row values are stored under; group headers only carry children.
//! Row headers are paths (`["Valid", "Yes"]`, `["Total", null]`) so nested
//! row grouping needs no extra structure.
//!
//! Numbers are rounded when they enter a table, with the precision chosen by
//! the analysis for that field.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Decimal places per kind of statistic.
pub struct Precision;

impl Precision {
    pub const COUNT: u32 = 0;
    pub const PERCENT: u32 = 2;
    pub const COEFFICIENT: u32 = 3;
    pub const STD_DEV: u32 = 5;
}

/// Round half away from zero to `decimals` places.
pub fn round(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableValue {
    Number(f64),
    Text(String),
}

impl TableValue {
    pub fn number(value: f64, decimals: u32) -> Self {
        Self::Number(round(value, decimals))
    }

    pub fn count(n: usize) -> Self {
        Self::Number(n as f64)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnHeader {
    pub header: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ColumnHeader>,
}

impl ColumnHeader {
    pub fn leaf(header: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            key: Some(key.into()),
            children: Vec::new(),
        }
    }

    pub fn group(header: impl Into<String>, children: Vec<ColumnHeader>) -> Self {
        Self {
            header: header.into(),
            key: None,
            children,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub row_header: Vec<Option<String>>,
    pub values: BTreeMap<String, TableValue>,
}

impl ResultRow {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            row_header: header.into_iter().map(|h| h.map(Into::into)).collect(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: TableValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Set `key` only when `value` is present.
    pub fn with_number(self, key: impl Into<String>, value: Option<f64>, decimals: u32) -> Self {
        match value {
            Some(v) => self.with(key, TableValue::number(v, decimals)),
            None => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultTable {
    pub title: String,
    pub column_headers: Vec<ColumnHeader>,
    pub rows: Vec<ResultRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub footnotes: Vec<String>,
}

impl ResultTable {
    pub fn new(title: impl Into<String>, column_headers: Vec<ColumnHeader>) -> Self {
        Self {
            title: title.into(),
            column_headers,
            rows: Vec::new(),
            footnotes: Vec::new(),
        }
    }

    pub fn push(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    /// Leaf keys, left to right.
    pub fn leaf_keys(&self) -> Vec<&str> {
        fn collect<'a>(headers: &'a [ColumnHeader], out: &mut Vec<&'a str>) {
            for h in headers {
                if h.children.is_empty() {
                    if let Some(key) = &h.key {
                        out.push(key);
                    }
                } else {
                    collect(&h.children, out);
                }
            }
        }
        let mut keys = Vec::new();
        collect(&self.column_headers, &mut keys);
        keys
    }

    /// Check the structural rules: titles present, headers at most two
    /// levels deep, leaves keyed uniquely, groups unkeyed, every row value
    /// under a leaf key, all numbers finite, all row headers the same depth.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("table title is empty".into());
        }

        let mut seen = HashSet::new();
        for top in &self.column_headers {
            check_header(top, 1, &mut seen)?;
        }

        let depth = self.rows.first().map(|r| r.row_header.len());
        for (index, row) in self.rows.iter().enumerate() {
            if Some(row.row_header.len()) != depth {
                return Err(format!("{}: row {index} header depth differs", self.title));
            }
            for (key, value) in &row.values {
                if !seen.contains(key.as_str()) {
                    return Err(format!("{}: row {index} uses unknown column key '{key}'", self.title));
                }
                if let TableValue::Number(n) = value {
                    if !n.is_finite() {
                        return Err(format!("{}: row {index}, '{key}' is not finite", self.title));
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_header<'a>(header: &'a ColumnHeader, level: usize, seen: &mut HashSet<&'a str>) -> Result<(), String> {
    if header.children.is_empty() {
        let key = header
            .key
            .as_deref()
            .ok_or_else(|| format!("leaf header '{}' has no key", header.header))?;
        if !seen.insert(key) {
            return Err(format!("duplicate column key '{key}'"));
        }
        return Ok(());
    }
    if level >= 2 {
        return Err(format!("header '{}' nests deeper than two levels", header.header));
    }
    if header.key.is_some() {
        return Err(format!("group header '{}' must not carry a key", header.header));
    }
    for child in &header.children {
        check_header(child, level + 1, seen)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ResultTable {
        let mut t = ResultTable::new(
            "Case Processing Summary",
            vec![
                ColumnHeader::group("Valid", vec![ColumnHeader::leaf("N", "validN"), ColumnHeader::leaf("Percent", "validPct")]),
                ColumnHeader::leaf("Total", "total"),
            ],
        );
        t.push(
            ResultRow::new([Some("sex * group")])
                .with("validN", TableValue::count(4))
                .with("validPct", TableValue::number(80.0, Precision::PERCENT))
                .with("total", TableValue::count(5)),
        );
        t
    }

    #[test]
    fn test_round_per_precision() {
        assert_eq!(round(33.333333, Precision::PERCENT), 33.33);
        assert_eq!(round(0.1234567, Precision::STD_DEV), 0.12346);
        assert_eq!(round(1.23456, Precision::COEFFICIENT), 1.235);
        assert_eq!(round(7.4, Precision::COUNT), 7.0);
    }

    #[test]
    fn test_leaf_keys_in_order() {
        assert_eq!(table().leaf_keys(), vec!["validN", "validPct", "total"]);
    }

    #[test]
    fn test_valid_table_passes() {
        assert_eq!(table().validate(), Ok(()));
    }

    #[test]
    fn test_unknown_row_key_rejected() {
        let mut t = table();
        t.push(ResultRow::new([Some("x")]).with("bogus", TableValue::count(1)));
        assert!(t.validate().unwrap_err().contains("bogus"));
    }

    #[test]
    fn test_three_levels_rejected() {
        let mut t = table();
        t.column_headers.push(ColumnHeader::group(
            "a",
            vec![ColumnHeader::group("b", vec![ColumnHeader::leaf("c", "c")])],
        ));
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_nan_rejected() {
        let mut t = table();
        t.rows[0].values.insert("total".into(), TableValue::Number(f64::NAN));
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(table()).unwrap();
        assert_eq!(json["columnHeaders"][0]["children"][1]["key"], "validPct");
        assert_eq!(json["rows"][0]["rowHeader"][0], "sex * group");
        assert_eq!(json["rows"][0]["values"]["validPct"], 80.0);
        assert!(json.get("footnotes").is_none());

        let back: ResultTable = serde_json::from_value(json).unwrap();
        assert_eq!(back, table());
    }
}
