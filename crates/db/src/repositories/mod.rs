use async_trait::async_trait;
use thiserror::Error;

use solquote_core::domain::company::{Company, CompanyDocument, CompanyDocumentId, CompanyId};
use solquote_core::domain::product::{Product, ProductCategory, ProductId};

pub mod company;
pub mod company_document;
pub mod memory;
pub mod product;

pub use company::SqlCompanyRepository;
pub use company_document::SqlCompanyDocumentRepository;
pub use memory::{
    InMemoryCompanyDocumentRepository, InMemoryCompanyRepository, InMemoryProductRepository,
};
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    /// Every product, ordered by category then id.
    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn list_by_category(
        &self,
        category: ProductCategory,
    ) -> Result<Vec<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError>;
    /// Every company, default company first.
    async fn list_all(&self) -> Result<Vec<Company>, RepositoryError>;
    async fn save(&self, company: Company) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CompanyDocumentRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &CompanyDocumentId,
    ) -> Result<Option<CompanyDocument>, RepositoryError>;
    async fn list_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<CompanyDocument>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<CompanyDocument>, RepositoryError>;
    async fn save(&self, document: CompanyDocument) -> Result<(), RepositoryError>;
}

pub(crate) fn decode<T, E: std::fmt::Display>(
    field: &str,
    value: Result<T, E>,
) -> Result<T, RepositoryError> {
    value.map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}
