use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Row;

use solquote_core::domain::product::{Product, ProductCategory, ProductId};

use super::{decode, ProductRepository, RepositoryError};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "id, category, brand, model_name, capacity_w, storage_capacity_kwh,
        price_eur, datasheet_path";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    decode(field, Decimal::from_str(value.trim()))
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: i64 = decode("id", row.try_get("id"))?;
    let category: String = decode("category", row.try_get("category"))?;
    let brand: String = decode("brand", row.try_get("brand"))?;
    let model_name: String = decode("model_name", row.try_get("model_name"))?;
    let capacity_w: Option<String> = decode("capacity_w", row.try_get("capacity_w"))?;
    let storage_capacity_kwh: Option<String> =
        decode("storage_capacity_kwh", row.try_get("storage_capacity_kwh"))?;
    let price_eur: String = decode("price_eur", row.try_get("price_eur"))?;
    let datasheet_path: Option<String> = decode("datasheet_path", row.try_get("datasheet_path"))?;

    Ok(Product {
        id: ProductId(id),
        category: decode("category", ProductCategory::from_str(&category))?,
        brand,
        model_name,
        capacity_w: capacity_w.as_deref().map(|v| parse_decimal("capacity_w", v)).transpose()?,
        storage_capacity_kwh: storage_capacity_kwh
            .as_deref()
            .map(|v| parse_decimal("storage_capacity_kwh", v))
            .transpose()?,
        price_eur: parse_decimal("price_eur", &price_eur)?,
        datasheet_path: datasheet_path.filter(|path| !path.trim().is_empty()),
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product
             ORDER BY CASE category WHEN 'module' THEN 0 WHEN 'inverter' THEN 1 ELSE 2 END, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn list_by_category(
        &self,
        category: ProductCategory,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE category = ? ORDER BY id"
        ))
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product (id, category, brand, model_name, capacity_w,
                                  storage_capacity_kwh, price_eur, datasheet_path)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 category = excluded.category,
                 brand = excluded.brand,
                 model_name = excluded.model_name,
                 capacity_w = excluded.capacity_w,
                 storage_capacity_kwh = excluded.storage_capacity_kwh,
                 price_eur = excluded.price_eur,
                 datasheet_path = excluded.datasheet_path,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
        )
        .bind(product.id.0)
        .bind(product.category.as_str())
        .bind(&product.brand)
        .bind(&product.model_name)
        .bind(product.capacity_w.map(|v| v.to_string()))
        .bind(product.storage_capacity_kwh.map(|v| v.to_string()))
        .bind(product.price_eur.to_string())
        .bind(&product.datasheet_path)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use solquote_core::domain::product::{Product, ProductCategory, ProductId};

    use super::SqlProductRepository;
    use crate::repositories::{ProductRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn repo() -> SqlProductRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlProductRepository::new(pool)
    }

    fn module(id: i64, price: &str) -> Product {
        Product {
            id: ProductId(id),
            category: ProductCategory::Module,
            brand: "Aiko".to_string(),
            model_name: format!("Neostar {id}"),
            capacity_w: Some(Decimal::new(450, 0)),
            storage_capacity_kwh: None,
            price_eur: price.parse().expect("price"),
            datasheet_path: Some("modules/aiko.pdf".to_string()),
        }
    }

    #[tokio::test]
    async fn sql_product_repo_round_trip_keeps_decimal_precision() {
        let repo = repo().await;
        let product = module(7, "189.45");

        repo.save(product.clone()).await.expect("save");
        let found = repo.find_by_id(&ProductId(7)).await.expect("find");

        assert_eq!(found, Some(product));
    }

    #[tokio::test]
    async fn list_by_category_is_ordered_by_id() {
        let repo = repo().await;
        repo.save(module(9, "100")).await.expect("save 9");
        repo.save(module(3, "120")).await.expect("save 3");
        let mut inverter = module(5, "1500");
        inverter.category = ProductCategory::Inverter;
        repo.save(inverter).await.expect("save inverter");

        let modules = repo.list_by_category(ProductCategory::Module).await.expect("list");
        let ids: Vec<i64> = modules.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![3, 9]);

        let all = repo.list_all().await.expect("list all");
        assert_eq!(all.last().map(|p| p.category), Some(ProductCategory::Inverter));
    }

    #[tokio::test]
    async fn malformed_price_is_a_decode_error() {
        let repo = repo().await;
        sqlx::query(
            "INSERT INTO product (id, category, brand, model_name, price_eur)
             VALUES (1, 'module', 'X', 'Y', 'not-a-number')",
        )
        .execute(&repo.pool)
        .await
        .expect("insert");

        let error = repo.find_by_id(&ProductId(1)).await.expect_err("decode must fail");
        assert!(matches!(error, RepositoryError::Decode(message) if message.starts_with("price_eur")));
    }
}
