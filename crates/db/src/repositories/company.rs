use sqlx::Row;

use solquote_core::domain::company::{Company, CompanyId};

use super::{decode, CompanyRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCompanyRepository {
    pool: DbPool,
}

impl SqlCompanyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_company(row: &sqlx::sqlite::SqliteRow) -> Result<Company, RepositoryError> {
    let is_default: i64 = decode("is_default", row.try_get("is_default"))?;

    Ok(Company {
        id: CompanyId(decode("id", row.try_get("id"))?),
        name: decode("name", row.try_get("name"))?,
        street: decode("street", row.try_get("street"))?,
        postal_code: decode("postal_code", row.try_get("postal_code"))?,
        city: decode("city", row.try_get("city"))?,
        phone: decode("phone", row.try_get("phone"))?,
        email: decode("email", row.try_get("email"))?,
        website: decode("website", row.try_get("website"))?,
        is_default: is_default != 0,
    })
}

#[async_trait::async_trait]
impl CompanyRepository for SqlCompanyRepository {
    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, street, postal_code, city, phone, email, website, is_default
             FROM company WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_company).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Company>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, street, postal_code, city, phone, email, website, is_default
             FROM company ORDER BY is_default DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_company).collect()
    }

    async fn save(&self, company: Company) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if company.is_default {
            sqlx::query("UPDATE company SET is_default = 0 WHERE id <> ?")
                .bind(company.id.0)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO company (id, name, street, postal_code, city, phone, email, website, is_default)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 street = excluded.street,
                 postal_code = excluded.postal_code,
                 city = excluded.city,
                 phone = excluded.phone,
                 email = excluded.email,
                 website = excluded.website,
                 is_default = excluded.is_default",
        )
        .bind(company.id.0)
        .bind(&company.name)
        .bind(&company.street)
        .bind(&company.postal_code)
        .bind(&company.city)
        .bind(&company.phone)
        .bind(&company.email)
        .bind(&company.website)
        .bind(i64::from(company.is_default))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
