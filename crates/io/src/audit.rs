//! Append-only audit trail: log → analytic → statistic.
//!
//! Every analysis run leaves one log entry (the command text), one analytic
//! (the procedure that ran) and one statistic per output table. Parents are
//! checked before each insert and enforced again by foreign keys; triggers
//! reject UPDATE and DELETE so persisted rows never change.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::AuditError;

const AUDIT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL          -- RFC 3339, UTC
);

CREATE TABLE IF NOT EXISTS analytics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    log_id INTEGER NOT NULL REFERENCES logs(id),
    title TEXT NOT NULL CHECK (length(title) > 0),
    note TEXT
);

CREATE TABLE IF NOT EXISTS statistics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    analytic_id INTEGER NOT NULL REFERENCES analytics(id),
    title TEXT NOT NULL CHECK (length(title) > 0),
    output_data TEXT NOT NULL,        -- serialized result table (JSON)
    components TEXT
);

CREATE INDEX IF NOT EXISTS idx_analytics_log ON analytics(log_id);
CREATE INDEX IF NOT EXISTS idx_statistics_analytic ON statistics(analytic_id);

CREATE TRIGGER IF NOT EXISTS logs_immutable_update BEFORE UPDATE ON logs
BEGIN SELECT RAISE(ABORT, 'audit rows are immutable'); END;
CREATE TRIGGER IF NOT EXISTS logs_immutable_delete BEFORE DELETE ON logs
BEGIN SELECT RAISE(ABORT, 'audit rows are immutable'); END;
CREATE TRIGGER IF NOT EXISTS analytics_immutable_update BEFORE UPDATE ON analytics
BEGIN SELECT RAISE(ABORT, 'audit rows are immutable'); END;
CREATE TRIGGER IF NOT EXISTS analytics_immutable_delete BEFORE DELETE ON analytics
BEGIN SELECT RAISE(ABORT, 'audit rows are immutable'); END;
CREATE TRIGGER IF NOT EXISTS statistics_immutable_update BEFORE UPDATE ON statistics
BEGIN SELECT RAISE(ABORT, 'audit rows are immutable'); END;
CREATE TRIGGER IF NOT EXISTS statistics_immutable_delete BEFORE DELETE ON statistics
BEGIN SELECT RAISE(ABORT, 'audit rows are immutable'); END;
"#;

macro_rules! row_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(LogId);
row_id!(AnalyticId);
row_id!(StatisticId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub id: LogId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytic {
    pub id: AnalyticId,
    pub log_id: LogId,
    pub title: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistic {
    pub id: StatisticId,
    pub analytic_id: AnalyticId,
    pub title: String,
    pub output_data: String,
    pub components: Option<String>,
}

/// One statistic of a chain, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticDraft {
    pub title: String,
    pub output_data: String,
    pub components: Option<String>,
}

/// Everything one analysis run writes, persisted all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditChain {
    pub log_text: String,
    pub title: String,
    pub note: Option<String>,
    pub statistics: Vec<StatisticDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainIds {
    pub log: LogId,
    pub analytic: AnalyticId,
    pub statistics: Vec<StatisticId>,
}

pub struct AuditStore {
    conn: Connection,
}

impl AuditStore {
    /// Open (or create) the audit tables in the SQLite file at `path`.
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, AuditError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AuditError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(AUDIT_SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn add_log(&mut self, text: &str) -> Result<LogId, AuditError> {
        insert_log(&self.conn, text)
    }

    pub fn add_analytic(&mut self, log_id: LogId, title: &str, note: Option<&str>) -> Result<AnalyticId, AuditError> {
        insert_analytic(&self.conn, log_id, title, note)
    }

    pub fn add_statistic(
        &mut self,
        analytic_id: AnalyticId,
        title: &str,
        output_data: &str,
        components: Option<&str>,
    ) -> Result<StatisticId, AuditError> {
        insert_statistic(&self.conn, analytic_id, title, output_data, components)
    }

    /// Write a whole chain in one transaction. On any error nothing of the
    /// chain is visible afterwards.
    pub fn record_chain(&mut self, chain: &AuditChain) -> Result<ChainIds, AuditError> {
        if chain.statistics.is_empty() {
            return Err(AuditError::Integrity("chain has no statistics".into()));
        }

        let tx = self.conn.transaction()?;
        let log = insert_log(&tx, &chain.log_text)?;
        let analytic = insert_analytic(&tx, log, &chain.title, chain.note.as_deref())?;
        let mut statistics = Vec::with_capacity(chain.statistics.len());
        for stat in &chain.statistics {
            statistics.push(insert_statistic(
                &tx,
                analytic,
                &stat.title,
                &stat.output_data,
                stat.components.as_deref(),
            )?);
        }
        tx.commit()?;

        log::info!(
            "Recorded audit chain: log {}, analytic {} ({}), {} statistic(s)",
            log,
            analytic,
            chain.title,
            statistics.len()
        );
        Ok(ChainIds { log, analytic, statistics })
    }

    /// All logs, oldest first.
    pub fn logs(&self) -> Result<Vec<Log>, AuditError> {
        let mut stmt = self.conn.prepare("SELECT id, text, created_at FROM logs ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let created: String = row.get(2)?;
            let created_at = DateTime::parse_from_rfc3339(&created)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
            Ok(Log {
                id: LogId(row.get(0)?),
                text: row.get(1)?,
                created_at,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn analytics_for(&self, log_id: LogId) -> Result<Vec<Analytic>, AuditError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, log_id, title, note FROM analytics WHERE log_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![log_id.0], |row| {
            Ok(Analytic {
                id: AnalyticId(row.get(0)?),
                log_id: LogId(row.get(1)?),
                title: row.get(2)?,
                note: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn statistics_for(&self, analytic_id: AnalyticId) -> Result<Vec<Statistic>, AuditError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, analytic_id, title, output_data, components FROM statistics WHERE analytic_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![analytic_id.0], statistic_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn statistic(&self, id: StatisticId) -> Result<Option<Statistic>, AuditError> {
        let found = self
            .conn
            .query_row(
                "SELECT id, analytic_id, title, output_data, components FROM statistics WHERE id = ?1",
                params![id.0],
                statistic_from_row,
            )
            .optional()?;
        Ok(found)
    }

    /// Number of analytics across all logs.
    pub fn analytic_count(&self) -> Result<usize, AuditError> {
        let n: i64 = self.conn.query_row("SELECT COUNT(*) FROM analytics", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn statistic_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Statistic> {
    Ok(Statistic {
        id: StatisticId(row.get(0)?),
        analytic_id: AnalyticId(row.get(1)?),
        title: row.get(2)?,
        output_data: row.get(3)?,
        components: row.get(4)?,
    })
}

fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool, AuditError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    Ok(conn.query_row(&sql, params![id], |row| row.get(0))?)
}

fn require_title(kind: &str, title: &str) -> Result<(), AuditError> {
    if title.trim().is_empty() {
        return Err(AuditError::Integrity(format!("{kind} title must not be empty")));
    }
    Ok(())
}

fn insert_log(conn: &Connection, text: &str) -> Result<LogId, AuditError> {
    conn.execute(
        "INSERT INTO logs (text, created_at) VALUES (?1, ?2)",
        params![text, Utc::now().to_rfc3339()],
    )?;
    Ok(LogId(conn.last_insert_rowid()))
}

fn insert_analytic(conn: &Connection, log_id: LogId, title: &str, note: Option<&str>) -> Result<AnalyticId, AuditError> {
    require_title("analytic", title)?;
    if !exists(conn, "logs", log_id.0)? {
        return Err(AuditError::Integrity(format!("log {log_id} does not exist")));
    }
    conn.execute(
        "INSERT INTO analytics (log_id, title, note) VALUES (?1, ?2, ?3)",
        params![log_id.0, title, note],
    )?;
    Ok(AnalyticId(conn.last_insert_rowid()))
}

fn insert_statistic(
    conn: &Connection,
    analytic_id: AnalyticId,
    title: &str,
    output_data: &str,
    components: Option<&str>,
) -> Result<StatisticId, AuditError> {
    require_title("statistic", title)?;
    if !exists(conn, "analytics", analytic_id.0)? {
        return Err(AuditError::Integrity(format!("analytic {analytic_id} does not exist")));
    }
    conn.execute(
        "INSERT INTO statistics (analytic_id, title, output_data, components) VALUES (?1, ?2, ?3, ?4)",
        params![analytic_id.0, title, output_data, components],
    )?;
    Ok(StatisticId(conn.last_insert_rowid()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> StatisticDraft {
        StatisticDraft {
            title: title.into(),
            output_data: r#"{"title":"t"}"#.into(),
            components: None,
        }
    }

    fn chain(statistics: Vec<StatisticDraft>) -> AuditChain {
        AuditChain {
            log_text: "FREQUENCIES VARIABLES=age.".into(),
            title: "Frequencies".into(),
            note: None,
            statistics,
        }
    }

    #[test]
    fn test_step_by_step_chain() {
        let mut store = AuditStore::open_in_memory().unwrap();
        let log = store.add_log("DESCRIPTIVES x.").unwrap();
        let analytic = store.add_analytic(log, "Descriptives", Some("listwise")).unwrap();
        let stat = store.add_statistic(analytic, "Descriptive Statistics", "{}", None).unwrap();

        assert_eq!(store.logs().unwrap()[0].text, "DESCRIPTIVES x.");
        assert_eq!(store.analytics_for(log).unwrap()[0].note.as_deref(), Some("listwise"));
        assert_eq!(store.statistic(stat).unwrap().unwrap().analytic_id, analytic);
        assert_eq!(store.statistic(StatisticId(999)).unwrap(), None);
    }

    #[test]
    fn test_missing_parent_is_integrity_error() {
        let mut store = AuditStore::open_in_memory().unwrap();
        let err = store.add_analytic(LogId(42), "Frequencies", None).unwrap_err();
        assert!(matches!(err, AuditError::Integrity(_)));

        let err = store.add_statistic(AnalyticId(7), "Table", "{}", None).unwrap_err();
        assert!(matches!(err, AuditError::Integrity(_)));
        assert_eq!(store.analytic_count().unwrap(), 0);
    }

    #[test]
    fn test_record_chain_commits_all_rows() {
        let mut store = AuditStore::open_in_memory().unwrap();
        let ids = store.record_chain(&chain(vec![draft("Statistics"), draft("age")])).unwrap();

        assert_eq!(ids.statistics.len(), 2);
        let analytics = store.analytics_for(ids.log).unwrap();
        assert_eq!(analytics.len(), 1);
        assert_eq!(analytics[0].id, ids.analytic);
        let titles: Vec<_> = store
            .statistics_for(ids.analytic)
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["Statistics", "age"]);
    }

    #[test]
    fn test_chain_failing_at_statistic_leaves_nothing() {
        let mut store = AuditStore::open_in_memory().unwrap();
        let err = store.record_chain(&chain(vec![draft("ok"), draft("")])).unwrap_err();
        assert!(matches!(err, AuditError::Integrity(_)));

        assert!(store.logs().unwrap().is_empty());
        assert_eq!(store.analytic_count().unwrap(), 0);
    }

    #[test]
    fn test_chain_without_statistics_rejected() {
        let mut store = AuditStore::open_in_memory().unwrap();
        assert!(store.record_chain(&chain(Vec::new())).is_err());
        assert!(store.logs().unwrap().is_empty());
    }

    #[test]
    fn test_rows_are_immutable() {
        let mut store = AuditStore::open_in_memory().unwrap();
        let ids = store.record_chain(&chain(vec![draft("t")])).unwrap();

        let update = store
            .conn
            .execute("UPDATE logs SET text = 'edited' WHERE id = ?1", params![ids.log.0]);
        assert!(update.is_err());
        let delete = store
            .conn
            .execute("DELETE FROM statistics WHERE id = ?1", params![ids.statistics[0].0]);
        assert!(delete.is_err());
        assert_eq!(store.logs().unwrap()[0].text, "FREQUENCIES VARIABLES=age.");
    }
}
