// CSV/TSV import/export
//
// The first record holds variable names; every following record is a case.

use std::path::Path;

use statgrid_engine::{CellChange, Dataset, VariableUpdate};

use crate::error::IoError;

pub fn import(path: &Path) -> Result<Dataset, IoError> {
    let text = read_file_as_utf8(path)?;
    import_from_string(&text, sniff_delimiter(&text))
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<Dataset, IoError> {
    import_from_string(&read_file_as_utf8(path)?, delimiter)
}

/// Pick the delimiter under which the most of the first ten records agree
/// with the header's field count. Ties go to the wider split; a candidate
/// that leaves the header as a single field never wins.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: String = content.lines().take(10).collect::<Vec<_>>().join("\n");

    let mut choice = (b',', 0usize, 0usize);
    for delimiter in [b'\t', b';', b',', b'|'] {
        let widths: Vec<usize> = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(sample.as_bytes())
            .records()
            .filter_map(Result::ok)
            .map(|record| record.len())
            .collect();

        let Some(&header_width) = widths.first() else {
            break;
        };
        if header_width < 2 {
            continue;
        }
        let agreeing = widths.iter().filter(|&&w| w == header_width).count();
        if (agreeing, header_width) > (choice.1, choice.2) {
            choice = (delimiter, agreeing, header_width);
        }
    }
    choice.0
}

/// File contents as UTF-8. A leading BOM is dropped; bytes that are not
/// valid UTF-8 are read as Windows-1252.
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let bytes = std::fs::read(path)?;
    if let Ok(text) = std::str::from_utf8(&bytes) {
        return Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string());
    }
    log::debug!("{} is not UTF-8; decoding as Windows-1252", path.display());
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(&bytes);
    Ok(text.into_owned())
}

fn import_from_string(content: &str, delimiter: u8) -> Result<Dataset, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut changes = Vec::new();
    let mut row_count = 0usize;
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        for (col, field) in record.iter().enumerate() {
            if !field.is_empty() {
                changes.push(CellChange::new(col, row, field));
            }
        }
        row_count = row + 1;
    }

    // Empty fields are never written, so each column is typed by its first
    // non-empty value, whatever its position in the record
    let mut dataset = Dataset::new();
    dataset.bulk_set(&changes);
    let cols = headers.len().max(dataset.store().column_count());
    dataset.load_variables(cols);
    if dataset.store().row_count() < row_count && cols > 0 {
        // Trailing all-empty records still count as cases
        dataset.set_cell(0, row_count - 1, "");
    }

    for (index, header) in headers.iter().enumerate() {
        let name = variable_name(header);
        if name.is_empty() {
            continue;
        }
        if let Err(e) = dataset.update_variable(index, VariableUpdate::Name(name.clone())) {
            log::warn!("Keeping default name for column {}: {}", index + 1, e);
        }
    }

    log::info!(
        "Imported {} cases, {} variables",
        dataset.store().row_count(),
        dataset.variables().len()
    );
    Ok(dataset)
}

/// Header text as a variable name: trimmed, inner whitespace replaced.
fn variable_name(header: &str) -> String {
    header.split_whitespace().collect::<Vec<_>>().join("_")
}

pub fn export(dataset: &Dataset, path: &Path) -> Result<(), IoError> {
    export_with_delimiter(dataset, path, b',')
}

pub fn export_tsv(dataset: &Dataset, path: &Path) -> Result<(), IoError> {
    export_with_delimiter(dataset, path, b'\t')
}

pub fn export_with_delimiter(dataset: &Dataset, path: &Path, delimiter: u8) -> Result<(), IoError> {
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_path(path)?;

    let names: Vec<&str> = dataset.variables().iter().map(|v| v.name.as_str()).collect();
    writer.write_record(&names)?;
    for row in dataset.rows() {
        writer.write_record(row)?;
    }

    writer.flush()?;
    Ok(())
}
