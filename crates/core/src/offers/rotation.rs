use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::domain::product::{ProductCategory, ProductId};
use crate::domain::settings::{CompanySettings, RotationMode, RotationSettings};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RotationError {
    #[error("rotation index overflow for {category} (company {company_index}, step {step})")]
    IndexOverflow { category: ProductCategory, company_index: usize, step: usize },
}

/// Products already handed out during one generation run. Advisory only:
/// repeats are logged, never prevented.
#[derive(Clone, Debug, Default)]
pub struct RotationState {
    used_ids: BTreeMap<ProductCategory, Vec<ProductId>>,
    used_brands: BTreeMap<ProductCategory, Vec<String>>,
}

impl RotationState {
    /// Records a selection and reports whether the product was already used.
    pub fn record(&mut self, category: ProductCategory, id: ProductId, brand: &str) -> bool {
        let ids = self.used_ids.entry(category).or_default();
        let repeated = ids.contains(&id);
        ids.push(id);
        self.used_brands.entry(category).or_default().push(brand.to_string());
        repeated
    }

    pub fn used_ids(&self, category: ProductCategory) -> &[ProductId] {
        self.used_ids.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn used_brands(&self, category: ProductCategory) -> &[String] {
        self.used_brands.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn reset(&mut self) {
        self.used_ids.clear();
        self.used_brands.clear();
    }
}

/// `(base_index + company_index * step) mod len`, or `None` on overflow.
pub fn rotated_index(base_index: usize, company_index: usize, step: usize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let offset = company_index.checked_mul(step)?;
    let position = base_index.checked_add(offset)?;
    Some(position % len)
}

pub struct ProductRotationEngine<R = StdRng> {
    rng: R,
}

impl ProductRotationEngine<StdRng> {
    pub fn new() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for ProductRotationEngine<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ProductRotationEngine<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Returns a copy of `base` with every category's product rotated for
    /// `company_index`. Never fails: on error the base settings come back
    /// unchanged.
    pub fn rotate(
        &mut self,
        company_index: usize,
        base: &CompanySettings,
        catalog: &Catalog,
        state: &mut RotationState,
    ) -> CompanySettings {
        if !base.rotation.enabled {
            return base.clone();
        }

        match self.try_rotate(company_index, base, catalog) {
            Ok(rotated) => {
                for category in ProductCategory::ALL {
                    let Some(product) = rotated.product_id(category).and_then(|id| catalog.find(id))
                    else {
                        continue;
                    };
                    if state.record(category, product.id, &product.brand) {
                        debug!(
                            event_name = "offer.rotation.repeat",
                            company_index,
                            category = %category,
                            product_id = product.id.0,
                            "product already used by an earlier company"
                        );
                    }
                }
                rotated
            }
            Err(error) => {
                warn!(
                    event_name = "offer.rotation.failed",
                    company_index,
                    error = %error,
                    "product rotation failed, keeping base selection"
                );
                base.clone()
            }
        }
    }

    pub fn try_rotate(
        &mut self,
        company_index: usize,
        base: &CompanySettings,
        catalog: &Catalog,
    ) -> Result<CompanySettings, RotationError> {
        let mut rotated = base.clone();

        for category in ProductCategory::ALL {
            let Some(base_id) = base.product_id(category) else {
                continue;
            };
            let available = catalog.ids_in(category);
            if available.len() <= 1 {
                continue;
            }

            let base_index = match available.iter().position(|id| *id == base_id) {
                Some(index) => index,
                None => {
                    warn!(
                        event_name = "offer.rotation.unknown_base",
                        category = %category,
                        product_id = base_id.0,
                        "base product not in catalog, rotating from first entry"
                    );
                    0
                }
            };

            let step = self.resolve_step(&base.rotation, category, available.len());
            let index = rotated_index(base_index, company_index, step, available.len())
                .ok_or(RotationError::IndexOverflow { category, company_index, step })?;
            let selected = available[index];

            debug!(
                event_name = "offer.rotation.selected",
                company_index,
                category = %category,
                base_index,
                step,
                index,
                product_id = selected.0,
                "rotated product selection"
            );
            rotated.set_product_id(category, Some(selected));
        }

        Ok(rotated)
    }

    /// Step size for one category. Random steps are drawn from `1..len` so a
    /// company never lands on the same product as its predecessor by step 0.
    pub fn resolve_step(
        &mut self,
        settings: &RotationSettings,
        category: ProductCategory,
        available_len: usize,
    ) -> usize {
        match settings.mode {
            RotationMode::Linear => settings.step,
            RotationMode::CategorySpecific => {
                settings.category_steps.get(&category).copied().unwrap_or(settings.step)
            }
            RotationMode::Random => {
                if available_len <= 1 {
                    0
                } else {
                    self.rng.gen_range(1..available_len)
                }
            }
        }
    }
}
