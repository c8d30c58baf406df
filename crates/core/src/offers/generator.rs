use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{CalculationAdapter, CalculationEngine};
use crate::catalog::Catalog;
use crate::domain::company::{Company, CompanyId};
use crate::domain::offer::{CalculationSource, OfferData, ProjectData};
use crate::domain::settings::{CompanySettings, ExtendedPdfOptions};
use crate::errors::ApplicationError;
use crate::offers::assembler::OfferDataAssembler;
use crate::offers::rotation::{ProductRotationEngine, RotationState};
use crate::offers::scaling::PriceScalingEngine;

/// Turns one assembled offer into PDF bytes.
pub trait OfferRenderer {
    fn render(
        &mut self,
        offer: &OfferData,
        options: &ExtendedPdfOptions,
    ) -> Result<Vec<u8>, ApplicationError>;
}

/// Input of one multi-company generation run, usually read from a JSON job file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationJob {
    pub project: ProjectData,
    pub settings: CompanySettings,
    /// Companies in offer order. Empty means every known company.
    pub company_ids: Vec<CompanyId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratedOffer {
    pub company_index: usize,
    pub company_id: CompanyId,
    pub company_name: String,
    pub customer_last_name: String,
    pub offer_number: String,
    pub calculation_source: CalculationSource,
    pub price_factor: Decimal,
    #[serde(skip)]
    pub pdf: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerationFailure {
    pub company_index: usize,
    pub company_id: CompanyId,
    pub company_name: String,
    pub error_class: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub run_id: Uuid,
    pub offers: Vec<GeneratedOffer>,
    pub failures: Vec<GenerationFailure>,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sequential offer generation for several companies: rotate, calculate,
/// scale, assemble, render. A failing company is recorded and skipped.
pub struct MultiOfferGenerator<E, R = StdRng> {
    rotation: ProductRotationEngine<R>,
    adapter: CalculationAdapter<E>,
    scaling: PriceScalingEngine,
    assembler: OfferDataAssembler,
    run_id: Uuid,
}

impl<E: CalculationEngine> MultiOfferGenerator<E, StdRng> {
    pub fn new(engine: E, offer_date: NaiveDate) -> Self {
        Self::with_rotation(engine, offer_date, ProductRotationEngine::new())
    }
}

impl<E: CalculationEngine, R: Rng> MultiOfferGenerator<E, R> {
    pub fn with_rotation(engine: E, offer_date: NaiveDate, rotation: ProductRotationEngine<R>) -> Self {
        let run_id = Uuid::new_v4();
        let run_prefix: String = run_id.simple().to_string().chars().take(8).collect();
        Self {
            rotation,
            adapter: CalculationAdapter::new(engine),
            scaling: PriceScalingEngine,
            assembler: OfferDataAssembler::new(offer_date, run_prefix),
            run_id,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Builds the offer data of one company without rendering it.
    pub fn prepare_offer(
        &mut self,
        company_index: usize,
        company: &Company,
        project: &ProjectData,
        base_settings: &CompanySettings,
        catalog: &Catalog,
        state: &mut RotationState,
    ) -> OfferData {
        let settings = self.rotation.rotate(company_index, base_settings, catalog, state);
        let (input, outcome) =
            self.adapter.calculate_for_company(company_index, project, &settings, catalog);
        let scaled = self.scaling.scale(company_index, outcome.results(), &settings.pricing);
        self.assembler.assemble(company_index, company, &project.customer, input, &outcome, scaled)
    }

    pub fn generate<Rd: OfferRenderer>(
        &mut self,
        project: &ProjectData,
        base_settings: &CompanySettings,
        companies: &[Company],
        catalog: &Catalog,
        renderer: &mut Rd,
    ) -> GenerationReport {
        let mut state = RotationState::default();
        let mut offers = Vec::with_capacity(companies.len());
        let mut failures = Vec::new();

        info!(
            event_name = "offer.generation.started",
            run_id = %self.run_id,
            companies = companies.len(),
            catalog_products = catalog.len(),
            "starting multi-company offer generation"
        );
        if companies.is_empty() {
            warn!(
                event_name = "offer.generation.no_companies",
                run_id = %self.run_id,
                "no companies selected, nothing to generate"
            );
        }

        for (company_index, company) in companies.iter().enumerate() {
            let offer =
                self.prepare_offer(company_index, company, project, base_settings, catalog, &mut state);

            match renderer.render(&offer, &base_settings.pdf) {
                Ok(pdf) => {
                    info!(
                        event_name = "offer.generation.company_completed",
                        run_id = %self.run_id,
                        company_index,
                        company_id = company.id.0,
                        offer_number = %offer.offer_number,
                        price_factor = %offer.price_factor,
                        bytes = pdf.len(),
                        "generated company offer"
                    );
                    offers.push(GeneratedOffer {
                        company_index,
                        company_id: company.id,
                        company_name: company.name.clone(),
                        customer_last_name: offer.customer.last_name.clone(),
                        offer_number: offer.offer_number,
                        calculation_source: offer.calculation_source,
                        price_factor: offer.price_factor,
                        pdf,
                    });
                }
                Err(error) => {
                    warn!(
                        event_name = "offer.generation.company_failed",
                        run_id = %self.run_id,
                        company_index,
                        company_id = company.id.0,
                        error_class = error.error_class(),
                        error = %error,
                        "company offer failed, continuing with next company"
                    );
                    failures.push(GenerationFailure {
                        company_index,
                        company_id: company.id,
                        company_name: company.name.clone(),
                        error_class: error.error_class().to_string(),
                        message: error.to_string(),
                    });
                }
            }
        }

        info!(
            event_name = "offer.generation.completed",
            run_id = %self.run_id,
            generated = offers.len(),
            failed = failures.len(),
            "multi-company offer generation finished"
        );

        GenerationReport { run_id: self.run_id, offers, failures }
    }
}
