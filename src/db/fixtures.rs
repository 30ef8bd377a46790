//! Seeded on-disk databases for tests

use super::ScreenerDb;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::query::SqlValue;
use rusqlite::Connection;
use std::time::Duration;
use tempfile::TempDir;

pub const EARLIER_5MIN: &str = "2024-01-02 09:15:00";
pub const LATEST_5MIN: &str = "2024-01-02 09:20:00";
pub const LATEST_1HR: &str = "2024-01-02 09:15:00";

/// Insert one row given as (column, value) pairs
pub fn insert(conn: &Connection, table: &str, row: &[(&str, SqlValue)]) -> Result<()> {
    let columns: Vec<&str> = row.iter().map(|(c, _)| *c).collect();
    let placeholders = vec!["?"; row.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    );
    conn.execute(&sql, rusqlite::params_from_iter(row.iter().map(|(_, v)| v)))?;
    Ok(())
}

fn candle(conn: &Connection, table: &str, symbol: &str, datetime: &str, close: f64, volume: i64) -> Result<()> {
    insert(
        conn,
        table,
        &[
            ("symbol", symbol.into()),
            ("datetime", datetime.into()),
            ("open", SqlValue::Real(close - 5.0)),
            ("high", SqlValue::Real(close + 5.0)),
            ("low", SqlValue::Real(close - 10.0)),
            ("close", SqlValue::Real(close)),
            ("volume", SqlValue::Integer(volume)),
        ],
    )
}

fn indicators(
    conn: &Connection,
    symbol: &str,
    datetime: &str,
    label: &str,
    rsi: f64,
    sma_50: f64,
    volume_sma: f64,
) -> Result<()> {
    insert(
        conn,
        "indicators",
        &[
            ("symbol", symbol.into()),
            ("datetime", datetime.into()),
            ("timeframe", label.into()),
            ("rsi_14", SqlValue::Real(rsi)),
            ("sma_50", SqlValue::Real(sma_50)),
            ("volume_sma_20", SqlValue::Real(volume_sma)),
        ],
    )
}

fn fundamentals(conn: &Connection, symbol: &str, trailing_pe: f64, market_cap: i64) -> Result<()> {
    insert(
        conn,
        "fundamentals",
        &[
            ("symbol", symbol.into()),
            ("trailing_pe", SqlValue::Real(trailing_pe)),
            ("market_cap", SqlValue::Integer(market_cap)),
            ("updated_at", "2024-01-01".into()),
        ],
    )
}

/// Three symbols on 5min (two bars) and 1hr (one bar); fundamentals for
/// SBIN and INFY only.
///
/// Latest 5min bar:
///
/// | symbol | close | volume | rsi_14 | sma_50 | trailing_pe |
/// |--------|-------|--------|--------|--------|-------------|
/// | SBIN   | 600   | 50000  | 65     | 580    | 10          |
/// | INFY   | 1500  | 20000  | 45     | 1520   | 28          |
/// | TCS    | 3500  | 10000  | 72     | 3400   | -           |
pub fn seed(conn: &Connection) -> Result<()> {
    let bars = [
        ("SBIN", 595.0, 40_000, 600.0, 50_000, 62.0, 65.0, 580.0),
        ("INFY", 1510.0, 25_000, 1500.0, 20_000, 48.0, 45.0, 1520.0),
        ("TCS", 3480.0, 12_000, 3500.0, 10_000, 70.0, 72.0, 3400.0),
    ];
    for (symbol, close0, vol0, close1, vol1, rsi0, rsi1, sma) in bars {
        candle(conn, "candles_5min", symbol, EARLIER_5MIN, close0, vol0)?;
        candle(conn, "candles_5min", symbol, LATEST_5MIN, close1, vol1)?;
        indicators(conn, symbol, EARLIER_5MIN, "5min", rsi0, sma, 30_000.0)?;
        indicators(conn, symbol, LATEST_5MIN, "5min", rsi1, sma, 30_000.0)?;
    }

    for (symbol, close, rsi) in [("SBIN", 605.0, 60.0), ("INFY", 1490.0, 40.0), ("TCS", 3510.0, 70.0)] {
        candle(conn, "candles_1hr", symbol, LATEST_1HR, close, 100_000)?;
        indicators(conn, symbol, LATEST_1HR, "1h", rsi, close - 20.0, 90_000.0)?;
    }

    fundamentals(conn, "SBIN", 10.0, 5_000_000_000_000)?;
    fundamentals(conn, "INFY", 28.0, 6_000_000_000_000)?;
    Ok(())
}

/// Fresh database in a temp dir, migrated and seeded. Keep the `TempDir`
/// alive for as long as the database is used.
pub fn seeded_db() -> (TempDir, ScreenerDb) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("screener.db");
    let db = ScreenerDb::open(&path, 4, Duration::from_secs(5), &Catalog::standard())
        .expect("open screener db");
    db.with_connection(seed).expect("seed screener db");
    (dir, db)
}

/// App state over a seeded database with default configuration
pub fn seeded_state() -> (TempDir, crate::state::AppState) {
    let (dir, db) = seeded_db();
    let state = crate::state::AppState::with_db(
        crate::config::ScreenerConfig::default(),
        std::sync::Arc::new(Catalog::standard()),
        db,
    );
    (dir, state)
}
