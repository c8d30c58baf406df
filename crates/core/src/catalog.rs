use std::collections::BTreeMap;

use crate::domain::product::{Product, ProductCategory, ProductId};

/// In-memory product catalog, grouped by category and ordered by id so that
/// rotation indices are stable between runs.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    by_category: BTreeMap<ProductCategory, Vec<Product>>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        let mut by_category: BTreeMap<ProductCategory, Vec<Product>> = BTreeMap::new();
        for product in products {
            by_category.entry(product.category).or_default().push(product);
        }
        for products in by_category.values_mut() {
            products.sort_by_key(|product| product.id);
            products.dedup_by_key(|product| product.id);
        }
        Self { by_category }
    }

    pub fn find(&self, product_id: ProductId) -> Option<&Product> {
        self.by_category.values().flatten().find(|product| product.id == product_id)
    }

    pub fn products_in(&self, category: ProductCategory) -> &[Product] {
        self.by_category.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All products, category by category.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.by_category.values().flatten()
    }

    pub fn ids_in(&self, category: ProductCategory) -> Vec<ProductId> {
        self.products_in(category).iter().map(|product| product.id).collect()
    }

    pub fn len(&self) -> usize {
        self.by_category.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
