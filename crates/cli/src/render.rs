// Plain-text rendering of result tables for the terminal

use statgrid_analysis::{ColumnHeader, ResultTable, TableValue};

/// Leaf columns left to right as (display label, value key).
fn leaf_columns(headers: &[ColumnHeader]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for h in headers {
        if h.children.is_empty() {
            if let Some(key) = &h.key {
                out.push((h.header.clone(), key.clone()));
            }
        } else {
            for child in &h.children {
                if let Some(key) = &child.key {
                    out.push((format!("{}/{}", h.header, child.header), key.clone()));
                }
            }
        }
    }
    out
}

fn format_value(value: &TableValue) -> String {
    match value {
        TableValue::Number(n) => n.to_string(),
        TableValue::Text(t) => t.clone(),
    }
}

pub fn render_table(table: &ResultTable) -> String {
    let columns = leaf_columns(&table.column_headers);
    let depth = table.rows.iter().map(|r| r.row_header.len()).max().unwrap_or(0);

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(table.rows.len() + 1);
    let mut header: Vec<String> = vec![String::new(); depth];
    header.extend(columns.iter().map(|(label, _)| label.clone()));
    grid.push(header);

    let mut previous: Vec<Option<String>> = Vec::new();
    for row in &table.rows {
        let mut line = Vec::with_capacity(depth + columns.len());
        // Repeated leading row headers print once
        let mut same_prefix = true;
        for level in 0..depth {
            let current = row.row_header.get(level).cloned().flatten();
            same_prefix = same_prefix && level + 1 < depth && previous.get(level).cloned().flatten() == current;
            line.push(if same_prefix { String::new() } else { current.unwrap_or_default() });
        }
        for (_, key) in &columns {
            line.push(row.values.get(key).map(format_value).unwrap_or_default());
        }
        previous = row.row_header.clone();
        grid.push(line);
    }

    let widths: Vec<usize> = (0..depth + columns.len())
        .map(|c| grid.iter().map(|line| line[c].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    out.push_str(&table.title);
    out.push('\n');
    for line in &grid {
        let cells: Vec<String> = line
            .iter()
            .enumerate()
            .map(|(c, cell)| {
                if c < depth {
                    format!("{:<width$}", cell, width = widths[c])
                } else {
                    format!("{:>width$}", cell, width = widths[c])
                }
            })
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    for note in &table.footnotes {
        out.push_str("  ");
        out.push_str(note);
        out.push('\n');
    }
    out
}
