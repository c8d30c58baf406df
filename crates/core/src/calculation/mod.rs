pub mod standard;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::domain::offer::{
    CalculationOutcome, CalculationResults, ProjectData, ProjectDetails, SelectedProducts,
};
use crate::domain::product::ProductCategory;
use crate::domain::settings::CompanySettings;

pub use standard::StandardCalculationEngine;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CalculationError {
    #[error("missing calculation input: {0}")]
    MissingInput(String),
    #[error("calculation engine failure: {0}")]
    Engine(String),
}

/// Fully materialised input of one company's calculation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationInput {
    pub project: ProjectData,
    pub products: SelectedProducts,
}

pub trait CalculationEngine: Send + Sync {
    fn calculate(&self, input: &CalculationInput) -> Result<CalculationResults, CalculationError>;
}

impl<E: CalculationEngine + ?Sized> CalculationEngine for Box<E> {
    fn calculate(&self, input: &CalculationInput) -> Result<CalculationResults, CalculationError> {
        (**self).calculate(input)
    }
}

/// Runs one fresh calculation per company. The adapter holds no result
/// cache: every call clones the base project, overlays the company's product
/// selection and asks the engine again.
pub struct CalculationAdapter<E> {
    engine: E,
}

impl<E: CalculationEngine> CalculationAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn build_input(
        &self,
        base: &ProjectData,
        settings: &CompanySettings,
        catalog: &Catalog,
    ) -> CalculationInput {
        let mut project = base.clone();
        let details = &mut project.project_details;

        if settings.module_quantity > 0 {
            details.module_quantity = settings.module_quantity;
        }

        let products = SelectedProducts {
            module: settings.module_id.and_then(|id| catalog.find(id)).cloned(),
            inverter: settings.inverter_id.and_then(|id| catalog.find(id)).cloned(),
            storage: settings.storage_id.and_then(|id| catalog.find(id)).cloned(),
            module_quantity: details.module_quantity,
        };

        details.selected_module_id = settings.module_id;
        details.selected_inverter_id = settings.inverter_id;
        details.selected_storage_id = settings.storage_id;
        details.selected_module_name = products.module.as_ref().map(|p| p.display_name());
        details.selected_inverter_name = products.inverter.as_ref().map(|p| p.display_name());
        details.selected_storage_name = products.storage.as_ref().map(|p| p.display_name());
        if let Some(power) = products.module.as_ref().and_then(|p| p.capacity_w) {
            details.module_power_w = Some(power);
        }
        details.storage_capacity_kwh =
            products.get(ProductCategory::Storage).and_then(|p| p.storage_capacity_kwh);

        CalculationInput { project, products }
    }

    pub fn calculate_for_company(
        &self,
        company_index: usize,
        base: &ProjectData,
        settings: &CompanySettings,
        catalog: &Catalog,
    ) -> (CalculationInput, CalculationOutcome) {
        let input = self.build_input(base, settings, catalog);

        let outcome = match self.engine.calculate(&input) {
            Ok(results) => {
                debug!(
                    event_name = "offer.calculation.completed",
                    company_index,
                    fields = results.len(),
                    "calculated company results"
                );
                CalculationOutcome::Calculated { results }
            }
            Err(error) => {
                warn!(
                    event_name = "offer.calculation.estimated",
                    company_index,
                    error = %error,
                    "calculation failed, using estimate from module quantity"
                );
                CalculationOutcome::Estimated {
                    results: estimate_from_module_quantity(&input.project.project_details),
                    reason: error.to_string(),
                }
            }
        };

        (input, outcome)
    }
}

const ESTIMATE_PRICE_PER_MODULE: Decimal = Decimal::from_parts(500, 0, 0, false, 0);
const ESTIMATE_INSTALLATION_FLAT: Decimal = Decimal::from_parts(2_000, 0, 0, false, 0);
const ESTIMATE_MODULE_POWER_W: Decimal = Decimal::from_parts(400, 0, 0, false, 0);
const ESTIMATE_YIELD_KWH_PER_KWP: Decimal = Decimal::from_parts(950, 0, 0, false, 0);
const ESTIMATE_PRICE_EUR_PER_KWH: Decimal = Decimal::from_parts(32, 0, 0, false, 2);

/// Deterministic rough numbers so an offer can still be rendered when the
/// calculation engine is unavailable.
pub fn estimate_from_module_quantity(details: &ProjectDetails) -> CalculationResults {
    let quantity = Decimal::from(details.module_quantity);
    let module_power = details.module_power_w.unwrap_or(ESTIMATE_MODULE_POWER_W);
    let kwp = (quantity * module_power / Decimal::ONE_THOUSAND).round_dp(2);
    let investment = quantity * ESTIMATE_PRICE_PER_MODULE + ESTIMATE_INSTALLATION_FLAT;
    let production = (kwp * ESTIMATE_YIELD_KWH_PER_KWP).round_dp(0);
    let savings = (production * ESTIMATE_PRICE_EUR_PER_KWH).round_dp(2);

    let mut results = CalculationResults::new()
        .with("anlage_kwp", kwp)
        .with("cost_modules_netto", quantity * ESTIMATE_PRICE_PER_MODULE)
        .with("cost_installation_netto", ESTIMATE_INSTALLATION_FLAT)
        .with("subtotal_netto", investment)
        .with("total_investment_netto", investment)
        .with("total_investment_brutto", investment)
        .with("final_price_netto", investment)
        .with("final_price_brutto", investment)
        .with("annual_pv_production_kwh", production)
        .with("annual_savings_eur", savings)
        .with("annual_financial_benefit_year1", savings);

    if savings > Decimal::ZERO {
        results.set("amortization_time_years", (investment / savings).round_dp(1));
        results.set("simple_roi_percent", (savings / investment * Decimal::ONE_HUNDRED).round_dp(2));
    }

    results
}
