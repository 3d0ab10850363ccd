// Native .sgrid format using SQLite
//
// Dataset tables and the audit tables share one file. Saving replaces the
// dataset tables only; the audit trail is never touched here.

use std::path::Path;

use rusqlite::{params, Connection};

use statgrid_engine::variable::VariableRegistry;
use statgrid_engine::{
    Align, CellStore, Dataset, Measure, MissingValues, Role, ValueLabel, Variable, VariableType,
};

use crate::error::IoError;
use crate::NATIVE_FORMAT_VERSION;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cells (
    col INTEGER NOT NULL,
    row INTEGER NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (col, row)
);

CREATE TABLE IF NOT EXISTS variables (
    id INTEGER PRIMARY KEY,
    column_index INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL UNIQUE,
    type TEXT NOT NULL,               -- e.g. NUMERIC, STRING, DATE:dd.mm.yyyy
    width INTEGER NOT NULL,
    decimals INTEGER NOT NULL,
    label TEXT NOT NULL DEFAULT '',
    missing TEXT NOT NULL,            -- JSON, see MissingValues
    columns INTEGER NOT NULL,         -- display width
    align TEXT NOT NULL,
    measure TEXT NOT NULL,
    role TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS value_labels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    variable_name TEXT NOT NULL,
    value TEXT NOT NULL,
    label TEXT NOT NULL
);
"#;

pub fn save(dataset: &Dataset, path: &Path) -> Result<(), IoError> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;

    let tx = conn.transaction()?;
    tx.execute_batch("DELETE FROM meta; DELETE FROM cells; DELETE FROM variables; DELETE FROM value_labels;")?;

    let store = dataset.store();
    {
        let mut meta = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;
        meta.execute(params!["format_version", NATIVE_FORMAT_VERSION.to_string()])?;
        meta.execute(params!["rows", store.row_count().to_string()])?;
        meta.execute(params!["cols", store.column_count().to_string()])?;
    }

    {
        let mut stmt = tx.prepare("INSERT INTO cells (col, row, value) VALUES (?1, ?2, ?3)")?;
        for (row, values) in store.rows().iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                // Empty cells are implied by the stored dimensions
                if value.is_empty() {
                    continue;
                }
                stmt.execute(params![col as i64, row as i64, value])?;
            }
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO variables (id, column_index, name, type, width, decimals, label, missing, columns, align, measure, role) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;
        for v in dataset.variables() {
            let missing = serde_json::to_string(&v.missing).map_err(|e| IoError::Corrupt(e.to_string()))?;
            stmt.execute(params![
                v.id as i64,
                v.column_index as i64,
                v.name,
                v.var_type.code(),
                v.width,
                v.decimals,
                v.label,
                missing,
                v.columns,
                v.align.code(),
                v.measure.code(),
                v.role.code(),
            ])?;
        }
    }

    {
        let mut stmt = tx.prepare("INSERT INTO value_labels (variable_name, value, label) VALUES (?1, ?2, ?3)")?;
        for label in dataset.registry().value_labels().all() {
            stmt.execute(params![label.variable_name, label.value, label.label])?;
        }
    }

    tx.commit()?;
    log::info!(
        "Saved dataset to {} ({} rows, {} variables)",
        path.display(),
        store.row_count(),
        dataset.variables().len()
    );
    Ok(())
}

pub fn load(path: &Path) -> Result<Dataset, IoError> {
    if !path.exists() {
        return Err(IoError::Io(format!("{} does not exist", path.display())));
    }
    let conn = Connection::open(path)?;

    let version = read_meta(&conn, "format_version")?.unwrap_or(0);
    if version > NATIVE_FORMAT_VERSION as usize {
        return Err(IoError::Corrupt(format!(
            "format version {version} is newer than supported version {NATIVE_FORMAT_VERSION}"
        )));
    }
    let rows = read_meta(&conn, "rows")?.unwrap_or(0);
    let cols = read_meta(&conn, "cols")?.unwrap_or(0);

    let mut store = CellStore::new();
    store.ensure_size(cols, rows);
    {
        let mut stmt = conn.prepare("SELECT col, row, value FROM cells")?;
        let cells = stmt.query_map([], |row| {
            let col: i64 = row.get(0)?;
            let r: i64 = row.get(1)?;
            let value: String = row.get(2)?;
            Ok((col, r, value))
        })?;
        for cell in cells {
            let (col, row, value) = cell?;
            let (col, row) = cell_position(col, row, cols, rows)?;
            store.set_cell(col, row, &value);
        }
    }

    let variables = load_variables(&conn)?;
    let labels = load_value_labels(&conn)?;

    let dataset = Dataset::from_parts(store, variables, labels)?;
    log::info!(
        "Loaded dataset from {} ({} rows, {} variables)",
        path.display(),
        dataset.store().row_count(),
        dataset.variables().len()
    );
    Ok(dataset)
}

/// Stored coordinates must lie inside the size recorded in `meta`.
fn cell_position(col: i64, row: i64, cols: usize, rows: usize) -> Result<(usize, usize), IoError> {
    let bad = || IoError::Corrupt(format!("cell at column {col}, row {row} is outside the {cols}x{rows} grid"));
    let c = usize::try_from(col).map_err(|_| bad())?;
    let r = usize::try_from(row).map_err(|_| bad())?;
    if c >= cols || r >= rows {
        return Err(bad());
    }
    Ok((c, r))
}

fn read_meta(conn: &Connection, key: &str) -> Result<Option<usize>, IoError> {
    let value: Option<String> = match conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
        row.get(0)
    }) {
        Ok(v) => Some(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };
    value
        .map(|v| v.parse().map_err(|_| IoError::Corrupt(format!("meta '{key}' is not a number: {v}"))))
        .transpose()
}

/// Raw `variables` row before the text codes are decoded.
struct VariableRow {
    id: i64,
    column_index: i64,
    name: String,
    var_type: String,
    width: i64,
    decimals: i64,
    label: String,
    missing: String,
    columns: i64,
    align: String,
    measure: String,
    role: String,
}

fn load_variables(conn: &Connection) -> Result<Vec<Variable>, IoError> {
    let mut stmt = conn.prepare(
        "SELECT id, column_index, name, type, width, decimals, label, missing, columns, align, measure, role FROM variables ORDER BY column_index",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(VariableRow {
            id: row.get(0)?,
            column_index: row.get(1)?,
            name: row.get(2)?,
            var_type: row.get(3)?,
            width: row.get(4)?,
            decimals: row.get(5)?,
            label: row.get(6)?,
            missing: row.get(7)?,
            columns: row.get(8)?,
            align: row.get(9)?,
            measure: row.get(10)?,
            role: row.get(11)?,
        })
    })?;

    let mut variables = Vec::new();
    for row in rows {
        variables.push(decode_variable(row?)?);
    }
    Ok(variables)
}

fn decode_variable(row: VariableRow) -> Result<Variable, IoError> {
    let bad = |field: &str, value: &str| IoError::Corrupt(format!("variable '{}': bad {field} '{value}'", row.name));

    let var_type = VariableType::from_code(&row.var_type).ok_or_else(|| bad("type", &row.var_type))?;
    let align = Align::from_code(&row.align).ok_or_else(|| bad("align", &row.align))?;
    let measure = Measure::from_code(&row.measure).ok_or_else(|| bad("measure", &row.measure))?;
    let role = Role::from_code(&row.role).ok_or_else(|| bad("role", &row.role))?;
    let missing: MissingValues = serde_json::from_str(&row.missing).map_err(|_| bad("missing", &row.missing))?;

    let mut variable = Variable::new(row.name.clone());
    variable.id = u64::try_from(row.id).map_err(|_| bad("id", &row.id.to_string()))?;
    variable.column_index =
        usize::try_from(row.column_index).map_err(|_| bad("column_index", &row.column_index.to_string()))?;
    variable.var_type = var_type;
    variable.width = u16::try_from(row.width).map_err(|_| bad("width", &row.width.to_string()))?;
    variable.decimals = u8::try_from(row.decimals).map_err(|_| bad("decimals", &row.decimals.to_string()))?;
    variable.columns = u16::try_from(row.columns).map_err(|_| bad("columns", &row.columns.to_string()))?;
    variable.label = row.label.clone();
    variable.missing = missing;
    variable.align = align;
    variable.measure = measure;
    variable.role = role;
    Ok(variable)
}

fn load_value_labels(conn: &Connection) -> Result<Vec<ValueLabel>, IoError> {
    let mut stmt = conn.prepare("SELECT variable_name, value, label FROM value_labels ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(ValueLabel {
            variable_name: row.get(0)?,
            value: row.get(1)?,
            label: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

/// Registry-only view of a saved file (variables + labels, no cells).
pub fn load_dictionary(path: &Path) -> Result<VariableRegistry, IoError> {
    if !path.exists() {
        return Err(IoError::Io(format!("{} does not exist", path.display())));
    }
    let conn = Connection::open(path)?;
    let variables = load_variables(&conn)?;
    let labels = load_value_labels(&conn)?;
    Ok(VariableRegistry::from_variables(variables, labels)?)
}
