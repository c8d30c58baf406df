use chrono::{Duration, NaiveDate};

use crate::calculation::CalculationInput;
use crate::domain::company::Company;
use crate::domain::offer::{CalculationOutcome, CalculationSource, CustomerData, OfferData};
use crate::offers::scaling::ScaledResults;

pub const DEFAULT_VALIDITY_DAYS: i64 = 30;

/// Builds the per-company [`OfferData`] handed to the PDF layer.
#[derive(Clone, Debug)]
pub struct OfferDataAssembler {
    offer_date: NaiveDate,
    validity_days: i64,
    run_prefix: String,
}

impl OfferDataAssembler {
    pub fn new(offer_date: NaiveDate, run_prefix: impl Into<String>) -> Self {
        Self { offer_date, validity_days: DEFAULT_VALIDITY_DAYS, run_prefix: run_prefix.into() }
    }

    pub fn with_validity_days(mut self, days: i64) -> Self {
        self.validity_days = days.max(0);
        self
    }

    /// `AN-<yyyymmdd>-<run prefix>-<company number>`, company numbers start at 1.
    pub fn offer_number(&self, company_index: usize) -> String {
        format!(
            "AN-{}-{}-{}",
            self.offer_date.format("%Y%m%d"),
            self.run_prefix,
            company_index + 1
        )
    }

    pub fn assemble(
        &self,
        company_index: usize,
        company: &Company,
        customer: &CustomerData,
        input: CalculationInput,
        outcome: &CalculationOutcome,
        scaled: ScaledResults,
    ) -> OfferData {
        let calculation_source = if outcome.is_estimated() {
            CalculationSource::Estimated
        } else {
            CalculationSource::Calculated
        };

        OfferData {
            offer_number: self.offer_number(company_index),
            company_index,
            customer: customer.clone(),
            company: company.clone(),
            products: input.products,
            project_details: input.project.project_details,
            calculation_results: scaled.results,
            calculation_source,
            price_factor: scaled.factor,
            offer_date: self.offer_date,
            valid_until: self.offer_date + Duration::days(self.validity_days),
        }
    }
}
