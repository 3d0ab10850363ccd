use serde::{Deserialize, Serialize};

/// A single write addressed by (column, row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellChange {
    pub col: usize,
    pub row: usize,
    pub value: String,
}

impl CellChange {
    pub fn new(col: usize, row: usize, value: impl Into<String>) -> Self {
        Self {
            col,
            row,
            value: value.into(),
        }
    }
}

/// What a raw cell value looks like on first sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Numeric,
    Text,
}

impl InputKind {
    /// Classify raw input. Blank input is text: nothing numeric was observed.
    pub fn classify(input: &str) -> Self {
        if parse_number(input).is_some() {
            InputKind::Numeric
        } else {
            InputKind::Text
        }
    }
}

/// Parse a cell value as a finite number, ignoring surrounding whitespace.
pub fn parse_number(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_numbers() {
        assert_eq!(InputKind::classify("42"), InputKind::Numeric);
        assert_eq!(InputKind::classify(" -3.5 "), InputKind::Numeric);
        assert_eq!(InputKind::classify("1e3"), InputKind::Numeric);
    }

    #[test]
    fn test_classify_text_and_blank() {
        assert_eq!(InputKind::classify("abc"), InputKind::Text);
        assert_eq!(InputKind::classify(""), InputKind::Text);
        assert_eq!(InputKind::classify("   "), InputKind::Text);
        assert_eq!(InputKind::classify("NaN"), InputKind::Text);
    }
}
