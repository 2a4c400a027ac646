use crate::domain::model::{DateWindow, HistoryRow, MatchStrategy, WindowRow};
use crate::domain::ports::{SalesSession, SalesSource};
use crate::utils::error::Result;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use std::path::PathBuf;

pub const DEFAULT_TABLE: &str = "ZO";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Sales table stored in a SQLite database file. Read-only.
#[derive(Debug, Clone)]
pub struct SqliteSalesSource {
    db_path: PathBuf,
    table: String,
}

impl SqliteSalesSource {
    /// `table` is interpolated into SQL and must already be validated as a
    /// plain identifier.
    pub fn new(db_path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            table: table.into(),
        }
    }
}

impl SalesSource for SqliteSalesSource {
    type Session = SqliteSession;

    fn open_session(&self) -> Result<SqliteSession> {
        tracing::debug!("Opening sales database {}", self.db_path.display());
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(SqliteSession {
            conn,
            table: self.table.clone(),
        })
    }
}

/// Owns one connection; closed on drop.
pub struct SqliteSession {
    conn: Connection,
    table: String,
}

impl SqliteSession {
    pub fn from_connection(conn: Connection, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: table.into(),
        }
    }
}

/// `(ART = ?n OR instr(ART, ?n) > 0) OR ...`, numbering from `first_param`.
fn match_conditions(count: usize, strategy: MatchStrategy, first_param: usize) -> String {
    (0..count)
        .map(|i| {
            let n = first_param + i;
            match strategy {
                MatchStrategy::Exact => format!("ART = ?{n}"),
                MatchStrategy::Contains => format!("(ART = ?{n} OR instr(ART, ?{n}) > 0)"),
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

impl SalesSession for SqliteSession {
    fn query_in_window(
        &mut self,
        identifiers: &[String],
        strategy: MatchStrategy,
        window: &DateWindow,
    ) -> Result<Vec<WindowRow>> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT
                ART,
                MAX(SZEROKOSC_1),
                MAX(GRUBOSC_11),
                MAX(GRUBOSC_21),
                MAX(GRUBOSC_31),
                MAX(RECEPTURA_1),
                SUM(TECH),
                MAX(JM2),
                MAX(date(TERMIN_ZAK))
            FROM {table}
            WHERE ({conditions})
              AND date(TERMIN_ZAK) >= ?1
              AND date(TERMIN_ZAK) <= ?2
            GROUP BY ART
            ORDER BY ART
            "#,
            table = self.table,
            conditions = match_conditions(identifiers.len(), strategy, 3),
        );

        let mut params = vec![
            window.start.format(DATE_FORMAT).to_string(),
            window.end.format(DATE_FORMAT).to_string(),
        ];
        params.extend(identifiers.iter().cloned());

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok(WindowRow {
                    key: row.get(0)?,
                    width: value_to_i64(row.get(1)?),
                    thickness: [
                        value_to_text(row.get(2)?),
                        value_to_text(row.get(3)?),
                        value_to_text(row.get(4)?),
                    ],
                    recipe: value_to_text(row.get(5)?),
                    quantity: value_to_f64(row.get(6)?),
                    unit: value_to_text(row.get(7)?),
                    last_sale: date_column(row, 8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    fn query_before(
        &mut self,
        identifiers: &[String],
        strategy: MatchStrategy,
        cutoff: NaiveDate,
    ) -> Result<Vec<HistoryRow>> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT ART, MAX(date(TERMIN_ZAK))
            FROM {table}
            WHERE ({conditions})
              AND date(TERMIN_ZAK) < ?1
            GROUP BY ART
            ORDER BY ART
            "#,
            table = self.table,
            conditions = match_conditions(identifiers.len(), strategy, 2),
        );

        let mut params = vec![cutoff.format(DATE_FORMAT).to_string()];
        params.extend(identifiers.iter().cloned());

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok(HistoryRow {
                    key: row.get(0)?,
                    last_sale: date_column(row, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()))
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Null | Value::Blob(_) => None,
    }
}

fn value_to_i64(value: Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(i),
        Value::Real(f) if f.is_finite() => Some(f.round() as i64),
        Value::Text(s) => {
            let s = s.trim().replace(',', ".");
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
        }
        _ => None,
    }
}

fn value_to_f64(value: Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(i as f64),
        Value::Real(f) => Some(f),
        Value::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
}
