use std::collections::BTreeMap;

use tokio::sync::RwLock;

use solquote_core::domain::company::{Company, CompanyDocument, CompanyDocumentId, CompanyId};
use solquote_core::domain::product::{Product, ProductCategory, ProductId};

use super::{CompanyDocumentRepository, CompanyRepository, ProductRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<BTreeMap<ProductId, Product>>,
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut all: Vec<Product> = products.values().cloned().collect();
        all.sort_by_key(|product| (product.category, product.id));
        Ok(all)
    }

    async fn list_by_category(
        &self,
        category: ProductCategory,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.values().filter(|product| product.category == category).cloned().collect())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id, product);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCompanyRepository {
    companies: RwLock<BTreeMap<CompanyId, Company>>,
}

#[async_trait::async_trait]
impl CompanyRepository for InMemoryCompanyRepository {
    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError> {
        let companies = self.companies.read().await;
        Ok(companies.get(id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Company>, RepositoryError> {
        let companies = self.companies.read().await;
        let mut all: Vec<Company> = companies.values().cloned().collect();
        all.sort_by_key(|company| (!company.is_default, company.id));
        Ok(all)
    }

    async fn save(&self, company: Company) -> Result<(), RepositoryError> {
        let mut companies = self.companies.write().await;
        if company.is_default {
            for other in companies.values_mut() {
                other.is_default = false;
            }
        }
        companies.insert(company.id, company);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCompanyDocumentRepository {
    documents: RwLock<BTreeMap<CompanyDocumentId, CompanyDocument>>,
}

#[async_trait::async_trait]
impl CompanyDocumentRepository for InMemoryCompanyDocumentRepository {
    async fn find_by_id(
        &self,
        id: &CompanyDocumentId,
    ) -> Result<Option<CompanyDocument>, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents.get(id).cloned())
    }

    async fn list_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<CompanyDocument>, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents.values().filter(|doc| doc.company_id == *company_id).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<CompanyDocument>, RepositoryError> {
        let documents = self.documents.read().await;
        let mut all: Vec<CompanyDocument> = documents.values().cloned().collect();
        all.sort_by_key(|doc| (doc.company_id, doc.id));
        Ok(all)
    }

    async fn save(&self, document: CompanyDocument) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        documents.insert(document.id, document);
        Ok(())
    }
}
