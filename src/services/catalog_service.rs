//! Catalog Service
//!
//! Lists what a client may screen on: fields, timeframes, operators and
//! templates.

use super::models::{AvailableFieldsResponse, AvailableTemplatesResponse, FieldInfo};
use crate::catalog::{Operator, Timeframe};
use crate::state::AppState;
use tracing::debug;

pub struct CatalogService;

impl CatalogService {
    pub fn available_fields(state: &AppState) -> AvailableFieldsResponse {
        let fields: Vec<FieldInfo> = state
            .engine
            .list_catalog_fields()
            .iter()
            .map(FieldInfo::from)
            .collect();
        debug!("CatalogService::available_fields - {} fields", fields.len());

        AvailableFieldsResponse {
            status: "success",
            fields,
            timeframes: Timeframe::ALL.to_vec(),
            operators: Operator::ALL.to_vec(),
        }
    }

    pub fn available_templates(state: &AppState) -> AvailableTemplatesResponse {
        let templates = state.engine.list_templates();
        debug!("CatalogService::available_templates - {} templates", templates.len());

        AvailableTemplatesResponse {
            status: "success",
            templates,
            categories: state.engine.template_categories(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceTable;
    use crate::db::fixtures::seeded_state;

    #[test]
    fn test_available_fields() {
        let (_dir, state) = seeded_state();
        let response = CatalogService::available_fields(&state);

        assert_eq!(response.fields.len(), state.engine.catalog().len());
        assert_eq!(response.timeframes.len(), 8);
        assert_eq!(response.operators.len(), 11);

        let rsi = response.fields.iter().find(|f| f.name == "rsi_14").unwrap();
        assert_eq!(rsi.table, SourceTable::Indicators);
        assert_eq!(rsi.description, "Rsi 14");
    }

    #[test]
    fn test_available_templates() {
        let (_dir, state) = seeded_state();
        let response = CatalogService::available_templates(&state);

        assert!(response.templates.iter().any(|t| t.name == "high_volume"));
        assert!(response.categories.contains(&"volume"));
    }
}
