use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::company::Company;
use crate::domain::product::{Product, ProductCategory, ProductId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerData {
    pub salutation: String,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CustomerData {
    pub fn full_name(&self) -> String {
        [self.salutation.as_str(), self.first_name.as_str(), self.last_name.as_str()]
            .iter()
            .filter(|part| !part.trim().is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Technical and economic inputs of the customer project. Product fields are
/// overwritten per company before a calculation runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDetails {
    pub module_quantity: u32,
    pub selected_module_id: Option<ProductId>,
    pub selected_inverter_id: Option<ProductId>,
    pub selected_storage_id: Option<ProductId>,
    pub selected_module_name: Option<String>,
    pub selected_inverter_name: Option<String>,
    pub selected_storage_name: Option<String>,
    pub module_power_w: Option<Decimal>,
    pub storage_capacity_kwh: Option<Decimal>,
    pub annual_consumption_kwh: Decimal,
    pub electricity_price_eur_per_kwh: Decimal,
    pub feed_in_tariff_eur_per_kwh: Decimal,
    pub specific_yield_kwh_per_kwp: Decimal,
    pub roof_orientation: Option<String>,
    pub roof_tilt_degrees: Option<u32>,
    /// Free-form additions carried into the calculation input untouched.
    pub extra: BTreeMap<String, Decimal>,
}

impl Default for ProjectDetails {
    fn default() -> Self {
        Self {
            module_quantity: 0,
            selected_module_id: None,
            selected_inverter_id: None,
            selected_storage_id: None,
            selected_module_name: None,
            selected_inverter_name: None,
            selected_storage_name: None,
            module_power_w: None,
            storage_capacity_kwh: None,
            annual_consumption_kwh: Decimal::new(4_500, 0),
            electricity_price_eur_per_kwh: Decimal::new(32, 2),
            feed_in_tariff_eur_per_kwh: Decimal::new(81, 3),
            specific_yield_kwh_per_kwp: Decimal::new(950, 0),
            roof_orientation: None,
            roof_tilt_degrees: None,
            extra: BTreeMap::new(),
        }
    }
}

impl ProjectDetails {
    pub fn selected_id(&self, category: ProductCategory) -> Option<ProductId> {
        match category {
            ProductCategory::Module => self.selected_module_id,
            ProductCategory::Inverter => self.selected_inverter_id,
            ProductCategory::Storage => self.selected_storage_id,
        }
    }

    /// Installed peak power in kWp, if the module power is known.
    pub fn peak_power_kwp(&self) -> Option<Decimal> {
        self.module_power_w
            .map(|watts| watts * Decimal::from(self.module_quantity) / Decimal::ONE_THOUSAND)
    }
}

/// Base project data shared by every company of a generation run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectData {
    pub customer: CustomerData,
    pub project_details: ProjectDetails,
}

/// Flat mapping of named numeric results produced by a calculation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalculationResults {
    values: BTreeMap<String, Decimal>,
}

impl CalculationResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.values.get(key).copied()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Decimal) {
        self.values.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: Decimal) -> Self {
        self.set(key, value);
        self
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Decimal> {
        self.values.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Decimal)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Decimal)> for CalculationResults {
    fn from_iter<T: IntoIterator<Item = (String, Decimal)>>(iter: T) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

/// Result of one per-company calculation. `Estimated` marks the degraded
/// path where the calculation engine failed and a mock estimate was used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CalculationOutcome {
    Calculated { results: CalculationResults },
    Estimated { results: CalculationResults, reason: String },
}

impl CalculationOutcome {
    pub fn results(&self) -> &CalculationResults {
        match self {
            Self::Calculated { results } | Self::Estimated { results, .. } => results,
        }
    }

    pub fn into_results(self) -> CalculationResults {
        match self {
            Self::Calculated { results } | Self::Estimated { results, .. } => results,
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, Self::Estimated { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationSource {
    Calculated,
    Estimated,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedProducts {
    pub module: Option<Product>,
    pub inverter: Option<Product>,
    pub storage: Option<Product>,
    pub module_quantity: u32,
}

impl SelectedProducts {
    pub fn get(&self, category: ProductCategory) -> Option<&Product> {
        match category {
            ProductCategory::Module => self.module.as_ref(),
            ProductCategory::Inverter => self.inverter.as_ref(),
            ProductCategory::Storage => self.storage.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        [self.module.as_ref(), self.inverter.as_ref(), self.storage.as_ref()].into_iter().flatten()
    }
}

/// Everything the PDF layer needs for one company's offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferData {
    pub offer_number: String,
    pub company_index: usize,
    pub customer: CustomerData,
    pub company: Company,
    pub products: SelectedProducts,
    pub project_details: ProjectDetails,
    pub calculation_results: CalculationResults,
    pub calculation_source: CalculationSource,
    pub price_factor: Decimal,
    pub offer_date: NaiveDate,
    pub valid_until: NaiveDate,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{CalculationOutcome, CalculationResults, CustomerData, ProjectDetails};

    #[test]
    fn full_name_skips_blank_parts() {
        let customer = CustomerData {
            salutation: "Frau".to_string(),
            first_name: String::new(),
            last_name: "Schneider".to_string(),
            ..CustomerData::default()
        };

        assert_eq!(customer.full_name(), "Frau Schneider");
    }

    #[test]
    fn peak_power_uses_module_power_and_quantity() {
        let details = ProjectDetails {
            module_quantity: 20,
            module_power_w: Some(Decimal::new(420, 0)),
            ..ProjectDetails::default()
        };

        assert_eq!(details.peak_power_kwp(), Some(Decimal::new(84, 1)));
    }

    #[test]
    fn calculation_results_deserialize_from_json_numbers() {
        let results: CalculationResults =
            serde_json::from_str(r#"{"total_investment_netto": 20000, "simple_roi_percent": 6.5}"#)
                .expect("results");

        assert_eq!(results.get("total_investment_netto"), Some(Decimal::new(20_000, 0)));
        assert_eq!(results.get("simple_roi_percent"), Some(Decimal::new(65, 1)));
    }

    #[test]
    fn estimated_outcome_is_flagged() {
        let outcome = CalculationOutcome::Estimated {
            results: CalculationResults::new(),
            reason: "engine offline".to_string(),
        };
        assert!(outcome.is_estimated());
        assert!(outcome.results().is_empty());
    }
}
