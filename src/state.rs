//! Application state management

use crate::catalog::Catalog;
use crate::config::ScreenerConfig;
use crate::db::ScreenerDb;
use crate::error::Result;
use crate::query::{QueryEngine, TemplateEngine};
use std::sync::Arc;

/// State shared by every request
pub struct AppState {
    pub config: ScreenerConfig,

    /// Catalog, template registry and assembler
    pub engine: Arc<QueryEngine>,

    /// Pooled screening database
    pub db: Arc<ScreenerDb>,

    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Build the standard catalog and templates and open the database
    pub fn new(config: ScreenerConfig) -> Result<Self> {
        let catalog = Arc::new(Catalog::standard());
        let db = ScreenerDb::from_config(&config, &catalog)?;
        Ok(Self::with_db(config, catalog, db))
    }

    pub fn with_db(config: ScreenerConfig, catalog: Arc<Catalog>, db: ScreenerDb) -> Self {
        let engine = QueryEngine::new(
            catalog,
            Arc::new(TemplateEngine::standard()),
            config.query_limits(),
        );

        tracing::info!(
            "AppState initialized: {} catalog fields, {} templates",
            engine.catalog().len(),
            engine.list_templates().len()
        );

        Self {
            config,
            engine: Arc::new(engine),
            db: Arc::new(db),
            started_at: chrono::Utc::now(),
        }
    }
}
