use rust_decimal::{Decimal, MathematicalOps};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::offer::CalculationResults;
use crate::domain::settings::{PriceCalculationMode, PriceScalingSettings};

/// Price fields multiplied by the company factor.
pub const PRICE_FIELDS: &[&str] = &[
    "base_matrix_price_netto",
    "cost_modules_netto",
    "cost_inverter_netto",
    "cost_storage_netto",
    "cost_installation_netto",
    "total_additional_costs_netto",
    "subtotal_netto",
    "vat_amount",
    "total_investment_netto",
    "total_investment_brutto",
    "final_price_netto",
    "final_price_brutto",
    "final_offer_price_net",
    "final_offer_price_gross",
];

pub const AMORTIZATION_FIELDS: &[&str] = &["amortization_time_years"];

/// Return-on-investment percentages, divided by the factor.
pub const ROI_FIELDS: &[&str] = &["simple_roi_percent", "annual_return_percent"];

/// Same physical system for every company, so savings never scale.
pub const SAVINGS_FIELDS: &[&str] = &[
    "annual_savings_eur",
    "annual_feed_in_revenue_eur",
    "annual_financial_benefit_year1",
];

const MAX_AMORTIZATION_EXTENSION: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScalingError {
    #[error("price factor overflow for company {company_index}")]
    FactorOverflow { company_index: usize },
    #[error("price factor {factor} is not positive")]
    NonPositiveFactor { factor: Decimal },
    #[error("scaling `{field}` overflowed")]
    FieldOverflow { field: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScaledResults {
    pub results: CalculationResults,
    pub factor: Decimal,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PriceScalingEngine;

impl PriceScalingEngine {
    /// Scales the price fields of `results` for `company_index`. Company 0 is
    /// the reference and always comes back unchanged, as does any input that
    /// fails to scale.
    pub fn scale(
        &self,
        company_index: usize,
        results: &CalculationResults,
        settings: &PriceScalingSettings,
    ) -> ScaledResults {
        match self.try_scale(company_index, results, settings) {
            Ok(scaled) => scaled,
            Err(error) => {
                warn!(
                    event_name = "offer.pricing.scaling_failed",
                    company_index,
                    error = %error,
                    "price scaling failed, using unscaled prices"
                );
                ScaledResults { results: results.clone(), factor: Decimal::ONE }
            }
        }
    }

    pub fn try_scale(
        &self,
        company_index: usize,
        results: &CalculationResults,
        settings: &PriceScalingSettings,
    ) -> Result<ScaledResults, ScalingError> {
        if company_index == 0 {
            return Ok(ScaledResults { results: results.clone(), factor: Decimal::ONE });
        }

        let factor = price_factor(company_index, settings)?;
        if factor <= Decimal::ZERO {
            return Err(ScalingError::NonPositiveFactor { factor });
        }

        let mut scaled = results.clone();
        for field in PRICE_FIELDS {
            if let Some(value) = scaled.get_mut(field) {
                *value = value
                    .checked_mul(factor)
                    .ok_or_else(|| ScalingError::FieldOverflow { field: field.to_string() })?;
            }
        }

        let amortization_factor = factor.min(MAX_AMORTIZATION_EXTENSION);
        for field in AMORTIZATION_FIELDS {
            if let Some(value) = scaled.get_mut(field) {
                *value = value
                    .checked_mul(amortization_factor)
                    .ok_or_else(|| ScalingError::FieldOverflow { field: field.to_string() })?;
            }
        }

        for field in ROI_FIELDS {
            if let Some(value) = scaled.get_mut(field) {
                *value = value
                    .checked_div(factor)
                    .ok_or_else(|| ScalingError::FieldOverflow { field: field.to_string() })?;
            }
        }

        debug!(
            event_name = "offer.pricing.scaled",
            company_index,
            factor = %factor,
            mode = ?settings.mode,
            "applied company price factor"
        );

        Ok(ScaledResults { results: scaled, factor })
    }
}

/// Multiplicative price factor of a company. Index 0 is always 1.
pub fn price_factor(
    company_index: usize,
    settings: &PriceScalingSettings,
) -> Result<Decimal, ScalingError> {
    if company_index == 0 {
        return Ok(Decimal::ONE);
    }

    match settings.mode {
        PriceCalculationMode::Linear => linear_factor(company_index, settings.increment_percent),
        PriceCalculationMode::Exponential => {
            let exponent = i64::try_from(company_index)
                .map_err(|_| ScalingError::FactorOverflow { company_index })?;
            settings
                .exponent
                .checked_powi(exponent)
                .ok_or(ScalingError::FactorOverflow { company_index })
        }
        PriceCalculationMode::Custom => match parse_custom_factors(&settings.custom_factors_json) {
            Some(factors) => {
                let index = company_index.min(factors.len() - 1);
                Ok(factors[index])
            }
            None => {
                warn!(
                    event_name = "offer.pricing.custom_factors_invalid",
                    company_index,
                    "custom price factors are not a non-empty JSON array, using linear increments"
                );
                linear_factor(company_index, settings.increment_percent)
            }
        },
    }
}

fn linear_factor(company_index: usize, increment_percent: Decimal) -> Result<Decimal, ScalingError> {
    let index = Decimal::from(company_index as u64);
    index
        .checked_mul(increment_percent)
        .and_then(|increment| increment.checked_div(Decimal::ONE_HUNDRED))
        .and_then(|increment| Decimal::ONE.checked_add(increment))
        .ok_or(ScalingError::FactorOverflow { company_index })
}

fn parse_custom_factors(raw: &str) -> Option<Vec<Decimal>> {
    serde_json::from_str::<Vec<Decimal>>(raw).ok().filter(|factors| !factors.is_empty())
}
