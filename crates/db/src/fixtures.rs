use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_PRODUCT_IDS: &[i64] = &[101, 102, 103, 104, 201, 202, 203, 301, 302];
const SEED_COMPANY_IDS: &[i64] = &[1, 2, 3];
const SEED_DOCUMENT_IDS: &[i64] = &[1, 2, 3];

/// Demo catalog: four modules, three inverters, two storage systems, three
/// installer companies and a few company documents.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    /// Loads the demo rows. Existing rows with the same ids are left alone.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            products: SEED_PRODUCT_IDS.len(),
            companies: SEED_COMPANY_IDS.len(),
            documents: SEED_DOCUMENT_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let products = count_ids(pool, "product", SEED_PRODUCT_IDS).await?;
        checks.push(("seed-products", products == SEED_PRODUCT_IDS.len() as i64));
        let companies = count_ids(pool, "company", SEED_COMPANY_IDS).await?;
        checks.push(("seed-companies", companies == SEED_COMPANY_IDS.len() as i64));
        let documents = count_ids(pool, "company_document", SEED_DOCUMENT_IDS).await?;
        checks.push(("seed-company-documents", documents == SEED_DOCUMENT_IDS.len() as i64));

        let defaults: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM company WHERE is_default = 1")
            .fetch_one(pool)
            .await?;
        checks.push(("single-default-company", defaults == 1));

        for category in ["module", "inverter", "storage"] {
            let rotatable: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM product WHERE category = ?1")
                    .bind(category)
                    .fetch_one(pool)
                    .await?;
            checks.push((rotation_label(category), rotatable > 1));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        sqlx::query(&format!(
            "DELETE FROM company_document WHERE id IN {}",
            sql_array_from_ids(SEED_DOCUMENT_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM company WHERE id IN {}",
            sql_array_from_ids(SEED_COMPANY_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM product WHERE id IN {}",
            sql_array_from_ids(SEED_PRODUCT_IDS)
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn count_ids(pool: &DbPool, table: &str, ids: &[i64]) -> Result<i64, RepositoryError> {
    let count = sqlx::query_scalar(&format!(
        "SELECT COUNT(1) FROM {table} WHERE id IN {}",
        sql_array_from_ids(ids)
    ))
    .fetch_one(pool)
    .await?;
    Ok(count)
}

fn rotation_label(category: &str) -> &'static str {
    match category {
        "module" => "rotatable-modules",
        "inverter" => "rotatable-inverters",
        _ => "rotatable-storage",
    }
}

fn sql_array_from_ids(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub products: usize,
    pub companies: usize,
    pub documents: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
