use sqlx::Row;

use solquote_core::domain::company::{CompanyDocument, CompanyDocumentId, CompanyId};

use super::{decode, CompanyDocumentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCompanyDocumentRepository {
    pool: DbPool,
}

impl SqlCompanyDocumentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<CompanyDocument, RepositoryError> {
    Ok(CompanyDocument {
        id: CompanyDocumentId(decode("id", row.try_get("id"))?),
        company_id: CompanyId(decode("company_id", row.try_get("company_id"))?),
        document_type: decode("document_type", row.try_get("document_type"))?,
        display_name: decode("display_name", row.try_get("display_name"))?,
        relative_path: decode("relative_path", row.try_get("relative_path"))?,
    })
}

#[async_trait::async_trait]
impl CompanyDocumentRepository for SqlCompanyDocumentRepository {
    async fn find_by_id(
        &self,
        id: &CompanyDocumentId,
    ) -> Result<Option<CompanyDocument>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, company_id, document_type, display_name, relative_path
             FROM company_document WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn list_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<CompanyDocument>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, company_id, document_type, display_name, relative_path
             FROM company_document WHERE company_id = ? ORDER BY id",
        )
        .bind(company_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }

    async fn list_all(&self) -> Result<Vec<CompanyDocument>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, company_id, document_type, display_name, relative_path
             FROM company_document ORDER BY company_id, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }

    async fn save(&self, document: CompanyDocument) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO company_document (id, company_id, document_type, display_name, relative_path)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 company_id = excluded.company_id,
                 document_type = excluded.document_type,
                 display_name = excluded.display_name,
                 relative_path = excluded.relative_path",
        )
        .bind(document.id.0)
        .bind(document.company_id.0)
        .bind(&document.document_type)
        .bind(&document.display_name)
        .bind(&document.relative_path)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use solquote_core::domain::company::{Company, CompanyDocument, CompanyDocumentId, CompanyId};

    use super::SqlCompanyDocumentRepository;
    use crate::repositories::{
        CompanyDocumentRepository, CompanyRepository, RepositoryError, SqlCompanyRepository,
    };
    use crate::{connect_with_settings, migrations};

    fn document(id: i64, company_id: i64) -> CompanyDocument {
        CompanyDocument {
            id: CompanyDocumentId(id),
            company_id: CompanyId(company_id),
            document_type: "certificate".to_string(),
            display_name: format!("Zertifikat {id}"),
            relative_path: format!("{company_id}/zertifikat_{id}.pdf"),
        }
    }

    #[tokio::test]
    async fn documents_are_listed_per_company() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let companies = SqlCompanyRepository::new(pool.clone());
        for id in [1, 2] {
            companies
                .save(Company {
                    id: CompanyId(id),
                    name: format!("Firma {id}"),
                    street: String::new(),
                    postal_code: String::new(),
                    city: String::new(),
                    phone: None,
                    email: None,
                    website: None,
                    is_default: false,
                })
                .await
                .expect("save company");
        }
        let repo = SqlCompanyDocumentRepository::new(pool);

        repo.save(document(2, 1)).await.expect("save 2");
        repo.save(document(1, 1)).await.expect("save 1");
        repo.save(document(3, 2)).await.expect("save 3");

        let for_first = repo.list_for_company(&CompanyId(1)).await.expect("list");
        assert_eq!(for_first, vec![document(1, 1), document(2, 1)]);
        assert_eq!(repo.list_all().await.expect("all").len(), 3);
        assert_eq!(repo.find_by_id(&CompanyDocumentId(3)).await.expect("find"), Some(document(3, 2)));
    }

    #[tokio::test]
    async fn document_requires_existing_company() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlCompanyDocumentRepository::new(pool);

        let error = repo.save(document(1, 99)).await.expect_err("foreign key");
        assert!(matches!(error, RepositoryError::Database(_)));
    }
}
