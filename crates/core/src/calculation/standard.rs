use rust_decimal::Decimal;

use crate::calculation::{CalculationEngine, CalculationError, CalculationInput};
use crate::domain::offer::CalculationResults;

/// Built-in PV economics: component costs from catalog prices, a yield
/// estimate from peak power, and a self-consumption split that improves
/// with a storage system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandardCalculationEngine {
    pub installation_cost_per_kwp: Decimal,
    pub additional_costs_netto: Decimal,
    pub vat_percent: Decimal,
    pub self_consumption_percent: Decimal,
    pub self_consumption_with_storage_percent: Decimal,
}

impl Default for StandardCalculationEngine {
    fn default() -> Self {
        Self {
            installation_cost_per_kwp: Decimal::new(350, 0),
            additional_costs_netto: Decimal::new(1_500, 0),
            // Residential PV below 30 kWp is zero-rated in Germany.
            vat_percent: Decimal::ZERO,
            self_consumption_percent: Decimal::new(30, 0),
            self_consumption_with_storage_percent: Decimal::new(60, 0),
        }
    }
}

fn overflow(what: &str) -> CalculationError {
    CalculationError::Engine(format!("{what} overflowed"))
}

fn mul(left: Decimal, right: Decimal, what: &str) -> Result<Decimal, CalculationError> {
    left.checked_mul(right).ok_or_else(|| overflow(what))
}

fn div(left: Decimal, right: Decimal, what: &str) -> Result<Decimal, CalculationError> {
    left.checked_div(right).ok_or_else(|| overflow(what))
}

fn sum(values: &[Decimal], what: &str) -> Result<Decimal, CalculationError> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(*value).ok_or_else(|| overflow(what)))
}

impl CalculationEngine for StandardCalculationEngine {
    fn calculate(&self, input: &CalculationInput) -> Result<CalculationResults, CalculationError> {
        let details = &input.project.project_details;
        let module = input
            .products
            .module
            .as_ref()
            .ok_or_else(|| CalculationError::MissingInput("module product".to_string()))?;
        if input.products.module_quantity == 0 {
            return Err(CalculationError::MissingInput("module quantity".to_string()));
        }
        let module_power = module
            .capacity_w
            .or(details.module_power_w)
            .ok_or_else(|| CalculationError::MissingInput("module power".to_string()))?;

        let quantity = Decimal::from(input.products.module_quantity);
        let kwp = div(mul(quantity, module_power, "peak power")?, Decimal::ONE_THOUSAND, "peak power")?;

        let cost_modules = mul(module.price_eur, quantity, "module cost")?;
        let cost_inverter = input.products.inverter.as_ref().map(|p| p.price_eur).unwrap_or_default();
        let cost_storage = input.products.storage.as_ref().map(|p| p.price_eur).unwrap_or_default();
        let cost_installation = mul(kwp, self.installation_cost_per_kwp, "installation cost")?.round_dp(2);
        let components = sum(&[cost_modules, cost_inverter, cost_storage], "component cost")?;
        let subtotal = sum(&[components, cost_installation, self.additional_costs_netto], "subtotal")?;
        let vat = div(mul(subtotal, self.vat_percent, "vat")?, Decimal::ONE_HUNDRED, "vat")?.round_dp(2);
        let brutto = sum(&[subtotal, vat], "gross price")?;

        let production = mul(kwp, details.specific_yield_kwh_per_kwp, "production")?.round_dp(0);
        let share = if input.products.storage.is_some() {
            self.self_consumption_with_storage_percent
        } else {
            self.self_consumption_percent
        };
        let self_consumption =
            div(mul(production, share, "self consumption")?, Decimal::ONE_HUNDRED, "self consumption")?
                .min(details.annual_consumption_kwh)
                .round_dp(0);
        let feed_in =
            production.checked_sub(self_consumption).ok_or_else(|| overflow("feed-in"))?;
        let savings = mul(self_consumption, details.electricity_price_eur_per_kwh, "savings")?.round_dp(2);
        let feed_in_revenue = mul(feed_in, details.feed_in_tariff_eur_per_kwh, "feed-in revenue")?.round_dp(2);
        let benefit = sum(&[savings, feed_in_revenue], "annual benefit")?;

        let mut results = CalculationResults::new()
            .with("anlage_kwp", kwp.round_dp(2))
            .with("base_matrix_price_netto", components)
            .with("cost_modules_netto", cost_modules)
            .with("cost_inverter_netto", cost_inverter)
            .with("cost_storage_netto", cost_storage)
            .with("cost_installation_netto", cost_installation)
            .with("total_additional_costs_netto", self.additional_costs_netto)
            .with("subtotal_netto", subtotal)
            .with("vat_amount", vat)
            .with("total_investment_netto", subtotal)
            .with("total_investment_brutto", brutto)
            .with("final_price_netto", subtotal)
            .with("final_price_brutto", brutto)
            .with("final_offer_price_net", subtotal)
            .with("final_offer_price_gross", brutto)
            .with("annual_pv_production_kwh", production)
            .with("self_consumption_kwh", self_consumption)
            .with("feed_in_kwh", feed_in)
            .with("annual_savings_eur", savings)
            .with("annual_feed_in_revenue_eur", feed_in_revenue)
            .with("annual_financial_benefit_year1", benefit);

        if details.annual_consumption_kwh > Decimal::ZERO {
            let autarky = div(self_consumption, details.annual_consumption_kwh, "autarky")?;
            results.set("autarky_percent", mul(autarky, Decimal::ONE_HUNDRED, "autarky")?.round_dp(1));
        }
        if benefit > Decimal::ZERO && brutto > Decimal::ZERO {
            results.set("amortization_time_years", div(brutto, benefit, "amortization")?.round_dp(1));
            let roi = mul(div(benefit, brutto, "roi")?, Decimal::ONE_HUNDRED, "roi")?.round_dp(2);
            results.set("simple_roi_percent", roi);
            results.set("annual_return_percent", roi);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::StandardCalculationEngine;
    use crate::calculation::{CalculationEngine, CalculationError, CalculationInput};
    use crate::domain::offer::{ProjectData, SelectedProducts};
    use crate::domain::product::{Product, ProductCategory, ProductId};

    fn product(id: i64, category: ProductCategory, price: i64) -> Product {
        Product {
            id: ProductId(id),
            category,
            brand: "Brand".to_string(),
            model_name: format!("P{id}"),
            capacity_w: (category == ProductCategory::Module).then(|| Decimal::new(400, 0)),
            storage_capacity_kwh: (category == ProductCategory::Storage).then(|| Decimal::new(10, 0)),
            price_eur: Decimal::new(price, 0),
            datasheet_path: None,
        }
    }

    fn input(with_storage: bool) -> CalculationInput {
        CalculationInput {
            project: ProjectData::default(),
            products: SelectedProducts {
                module: Some(product(1, ProductCategory::Module, 200)),
                inverter: Some(product(2, ProductCategory::Inverter, 1_800)),
                storage: with_storage.then(|| product(3, ProductCategory::Storage, 6_000)),
                module_quantity: 20,
            },
        }
    }

    #[test]
    fn costs_add_up_to_investment() {
        let results = StandardCalculationEngine::default().calculate(&input(false)).expect("results");

        // 20 x 400 W = 8 kWp; 4000 modules + 1800 inverter + 2800 installation + 1500 extras
        assert_eq!(results.get("anlage_kwp"), Some(Decimal::new(8, 0)));
        assert_eq!(results.get("total_investment_netto"), Some(Decimal::new(10_100, 0)));
        assert_eq!(results.get("annual_pv_production_kwh"), Some(Decimal::new(7_600, 0)));
        assert_eq!(results.get("self_consumption_kwh"), Some(Decimal::new(2_280, 0)));
    }

    #[test]
    fn storage_raises_self_consumption() {
        let engine = StandardCalculationEngine::default();
        let without = engine.calculate(&input(false)).expect("without storage");
        let with = engine.calculate(&input(true)).expect("with storage");

        assert!(with.get("self_consumption_kwh") > without.get("self_consumption_kwh"));
        assert_eq!(with.get("cost_storage_netto"), Some(Decimal::new(6_000, 0)));
    }

    #[test]
    fn overflowing_prices_are_an_engine_error() {
        let mut input = input(false);
        if let Some(module) = input.products.module.as_mut() {
            module.price_eur = Decimal::MAX;
        }

        assert!(matches!(
            StandardCalculationEngine::default().calculate(&input),
            Err(CalculationError::Engine(_))
        ));
    }

    #[test]
    fn missing_module_is_rejected() {
        let mut input = input(false);
        input.products.module = None;

        assert!(matches!(
            StandardCalculationEngine::default().calculate(&input),
            Err(CalculationError::MissingInput(_))
        ));
    }
}
