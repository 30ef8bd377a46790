//! Screening database access
//!
//! SQLite behind an r2d2 pool. Each statement checks out one connection and
//! returns it when the guard drops, on success and error alike.

pub mod models;
mod migrations;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::catalog::{Catalog, Timeframe};
use crate::config::ScreenerConfig;
use crate::error::Result;
use crate::query::SqlValue;
pub use models::{DataStatistics, ResultRow};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

/// Runs one compiled statement and returns its rows
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<ResultRow>>;
}

/// Pooled SQLite database holding candles, indicators and fundamentals
pub struct ScreenerDb {
    pool: DbPool,
}

impl ScreenerDb {
    /// Open (or create) the database at `path` and bring its schema up to date
    pub fn open(path: &Path, pool_size: u32, timeout: Duration, catalog: &Catalog) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            // WAL lets screens read while the indicator pipeline writes
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
        });

        let pool = r2d2::Pool::builder()
            .max_size(pool_size)
            .connection_timeout(timeout)
            .build(manager)?;

        let db = Self { pool };
        db.run_migrations(catalog)?;

        tracing::info!("ScreenerDb opened at {} (pool size {})", path.display(), pool_size);
        Ok(db)
    }

    pub fn from_config(config: &ScreenerConfig, catalog: &Catalog) -> Result<Self> {
        Self::open(&config.db_path, config.pool_size, config.pool_timeout(), catalog)
    }

    fn run_migrations(&self, catalog: &Catalog) -> Result<()> {
        let conn = self.pool.get()?;
        migrations::run_migrations(&conn, catalog)
    }

    /// Run `f` with a pooled connection
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.pool.get()?;
        f(&conn)
    }

    // ========== Health & Statistics ==========

    pub fn health_check(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    /// Latest candle datetime on `timeframe`, if the table has any rows
    pub fn latest_datetime(&self, timeframe: Timeframe) -> Result<Option<String>> {
        let sql = format!("SELECT MAX(datetime) FROM {}", timeframe.table_name());
        self.with_connection(|conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
    }

    /// Distinct symbols on `timeframe`, sorted
    pub fn available_symbols(&self, timeframe: Timeframe) -> Result<Vec<String>> {
        let sql = format!("SELECT DISTINCT symbol FROM {} ORDER BY symbol", timeframe.table_name());
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let symbols = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(symbols)
        })
    }

    pub fn data_statistics(&self, timeframe: Timeframe) -> Result<DataStatistics> {
        let sql = format!(
            "SELECT COUNT(*), COUNT(DISTINCT symbol), MIN(datetime), MAX(datetime) FROM {}",
            timeframe.table_name()
        );
        self.with_connection(|conn| {
            let stats = conn.query_row(&sql, [], |row| {
                Ok(DataStatistics {
                    timeframe,
                    total_records: row.get(0)?,
                    symbol_count: row.get(1)?,
                    earliest_date: row.get(2)?,
                    latest_date: row.get(3)?,
                })
            })?;
            Ok(stats)
        })
    }
}

impl QueryExecutor for ScreenerDb {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<ResultRow>> {
        let started = std::time::Instant::now();
        let rows = self.with_connection(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    let mut values = Vec::with_capacity(columns.len());
                    for (i, name) in columns.iter().enumerate() {
                        values.push((name.clone(), json_value(row.get_ref(i)?)));
                    }
                    Ok(ResultRow::new(values))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        });

        match &rows {
            Ok(rows) => tracing::debug!(
                "ScreenerDb::execute - {} rows in {}ms",
                rows.len(),
                started.elapsed().as_millis()
            ),
            Err(e) => tracing::error!("ScreenerDb::execute - failed: {}", e),
        }
        rows
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScreenerError;

    #[test]
    fn test_execute_binds_params_in_order() {
        let (_dir, db) = fixtures::seeded_db();
        let rows = db
            .execute(
                "SELECT symbol, close FROM candles_5min WHERE close BETWEEN ? AND ? ORDER BY symbol",
                &[SqlValue::Integer(1000), SqlValue::Integer(4000)],
            )
            .unwrap();

        let symbols: Vec<&str> = rows.iter().filter_map(|r| r.get_str("symbol")).collect();
        assert_eq!(symbols, vec!["INFY", "INFY", "TCS", "TCS"]);
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec!["symbol", "close"]);
    }

    #[test]
    fn test_execute_error_is_execution() {
        let (_dir, db) = fixtures::seeded_db();
        let result = db.execute("SELECT nope FROM candles_5min", &[]);
        assert!(matches!(result, Err(ScreenerError::Execution(_))));
    }

    #[test]
    fn test_statistics() {
        let (_dir, db) = fixtures::seeded_db();
        db.health_check().unwrap();

        assert_eq!(
            db.latest_datetime(Timeframe::FiveMin).unwrap().as_deref(),
            Some(fixtures::LATEST_5MIN)
        );
        assert_eq!(db.latest_datetime(Timeframe::FourHour).unwrap(), None);
        assert_eq!(
            db.available_symbols(Timeframe::FiveMin).unwrap(),
            vec!["INFY", "SBIN", "TCS"]
        );

        let stats = db.data_statistics(Timeframe::FiveMin).unwrap();
        assert_eq!(stats.total_records, 6);
        assert_eq!(stats.symbol_count, 3);
        assert_eq!(stats.latest_date.as_deref(), Some(fixtures::LATEST_5MIN));

        let empty = db.data_statistics(Timeframe::TwoHour).unwrap();
        assert_eq!(empty.total_records, 0);
        assert!(empty.earliest_date.is_none());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let (dir, db) = fixtures::seeded_db();
        drop(db);
        let path = dir.path().join("screener.db");
        let reopened =
            ScreenerDb::open(&path, 2, Duration::from_secs(5), &Catalog::standard()).unwrap();
        assert_eq!(reopened.data_statistics(Timeframe::FiveMin).unwrap().total_records, 6);
    }
}
