use solquote_core::catalog::Catalog;
use solquote_core::domain::company::{Company, CompanyDocument};
use tracing::info;

use crate::repositories::{
    CompanyDocumentRepository, CompanyRepository, ProductRepository, RepositoryError,
};

/// Everything a generation run reads from the database, loaded up front so
/// the offer pipeline itself stays synchronous.
#[derive(Clone, Debug, Default)]
pub struct CatalogSnapshot {
    pub catalog: Catalog,
    pub companies: Vec<Company>,
    pub documents: Vec<CompanyDocument>,
}

pub async fn load_snapshot(
    products: &dyn ProductRepository,
    companies: &dyn CompanyRepository,
    documents: &dyn CompanyDocumentRepository,
) -> Result<CatalogSnapshot, RepositoryError> {
    let product_rows = products.list_all().await?;
    let companies = companies.list_all().await?;
    let documents = documents.list_all().await?;

    info!(
        event_name = "db.snapshot.loaded",
        products = product_rows.len(),
        companies = companies.len(),
        documents = documents.len(),
        "loaded catalog snapshot"
    );

    Ok(CatalogSnapshot { catalog: Catalog::new(product_rows), companies, documents })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use solquote_core::domain::product::{Product, ProductCategory, ProductId};

    use super::load_snapshot;
    use crate::repositories::{
        InMemoryCompanyDocumentRepository, InMemoryCompanyRepository, InMemoryProductRepository,
        ProductRepository,
    };

    #[tokio::test]
    async fn snapshot_groups_products_into_catalog() {
        let products = InMemoryProductRepository::default();
        for (id, category) in [(1, ProductCategory::Module), (2, ProductCategory::Module), (3, ProductCategory::Storage)] {
            products
                .save(Product {
                    id: ProductId(id),
                    category,
                    brand: "B".to_string(),
                    model_name: "M".to_string(),
                    capacity_w: None,
                    storage_capacity_kwh: None,
                    price_eur: Decimal::ONE,
                    datasheet_path: None,
                })
                .await
                .expect("save");
        }

        let snapshot = load_snapshot(
            &products,
            &InMemoryCompanyRepository::default(),
            &InMemoryCompanyDocumentRepository::default(),
        )
        .await
        .expect("snapshot");

        assert_eq!(snapshot.catalog.ids_in(ProductCategory::Module).len(), 2);
        assert_eq!(snapshot.catalog.len(), 3);
        assert!(snapshot.companies.is_empty());
    }
}
