use serde_json::{json, Value};
use solquote_core::config::{AppConfig, LoadOptions};
use solquote_core::ProductCategory;
use solquote_db::repositories::{
    SqlCompanyDocumentRepository, SqlCompanyRepository, SqlProductRepository,
};
use solquote_db::{load_snapshot, CatalogSnapshot};

use crate::commands::{open_database, runtime, CommandResult, StepError};

/// Reads the whole catalog from the migrated database.
pub(crate) async fn load_catalog(config: &AppConfig) -> Result<CatalogSnapshot, StepError> {
    let pool = open_database(config).await?;

    let snapshot = load_snapshot(
        &SqlProductRepository::new(pool.clone()),
        &SqlCompanyRepository::new(pool.clone()),
        &SqlCompanyDocumentRepository::new(pool.clone()),
    )
    .await
    .map_err(|error| ("persistence", error.to_string(), 4u8));
    pool.close().await;
    snapshot
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "catalog",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match runtime("catalog") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    match runtime.block_on(load_catalog(&config)) {
        Ok(snapshot) => {
            let message = format!(
                "{} products, {} companies, {} company documents",
                snapshot.catalog.len(),
                snapshot.companies.len(),
                snapshot.documents.len()
            );
            CommandResult::success_with_details("catalog", message, Some(describe(&snapshot)))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("catalog", error_class, message, exit_code)
        }
    }
}

fn describe(snapshot: &CatalogSnapshot) -> Value {
    let products: serde_json::Map<String, Value> = ProductCategory::ALL
        .iter()
        .map(|category| {
            (category.to_string(), json!(snapshot.catalog.products_in(*category)))
        })
        .collect();

    json!({
        "products": products,
        "companies": snapshot.companies,
        "documents": snapshot.documents,
    })
}
