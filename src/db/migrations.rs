//! Schema migrations
//!
//! Table layouts are generated from the field catalog so that every
//! screenable column exists in its source table.

use crate::catalog::{Catalog, SemanticType, SourceTable, Timeframe};
use crate::error::Result;
use rusqlite::Connection;

/// Run all migrations
pub fn run_migrations(conn: &Connection, catalog: &Catalog) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT DEFAULT CURRENT_TIMESTAMP
        )",
    )?;

    run_migration(conn, "001_candle_tables", &candle_tables(catalog))?;
    run_migration(conn, "002_indicators", &indicators_table(catalog))?;
    run_migration(conn, "003_fundamentals", &fundamentals_table(catalog))?;

    tracing::info!("Screener migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM migrations WHERE name = ?",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

fn sql_type(semantic_type: SemanticType) -> &'static str {
    match semantic_type {
        SemanticType::Float => "REAL",
        SemanticType::Int => "INTEGER",
        SemanticType::String => "TEXT",
    }
}

fn column_defs(catalog: &Catalog, table: SourceTable) -> String {
    catalog
        .fields_in(table)
        .map(|f| format!("    {} {},\n", f.name, sql_type(f.semantic_type)))
        .collect()
}

fn candle_tables(catalog: &Catalog) -> String {
    let columns = column_defs(catalog, SourceTable::Candles);
    Timeframe::ALL
        .iter()
        .map(|tf| {
            let table = tf.table_name();
            format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n    symbol TEXT NOT NULL,\n    datetime TEXT NOT NULL,\n\
                 {columns}    PRIMARY KEY (symbol, datetime)\n);\n\
                 CREATE INDEX IF NOT EXISTS idx_{table}_datetime ON {table}(datetime);\n",
                table = table,
                columns = columns,
            )
        })
        .collect()
}

fn indicators_table(catalog: &Catalog) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS indicators (\n    symbol TEXT NOT NULL,\n    datetime TEXT NOT NULL,\n\
         \x20   timeframe TEXT NOT NULL,\n{columns}    PRIMARY KEY (symbol, datetime, timeframe)\n);\n\
         CREATE INDEX IF NOT EXISTS idx_indicators_timeframe ON indicators(timeframe, datetime);\n",
        columns = column_defs(catalog, SourceTable::Indicators),
    )
}

fn fundamentals_table(catalog: &Catalog) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS fundamentals (\n    symbol TEXT PRIMARY KEY,\n{columns}\
         \x20   updated_at TEXT\n);\n",
        columns = column_defs(catalog, SourceTable::Fundamentals),
    )
}
