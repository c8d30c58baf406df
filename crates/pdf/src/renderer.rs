use std::collections::BTreeMap;

use serde::Serialize;
use solquote_core::{ApplicationError, ExtendedPdfOptions, OfferData, OfferRenderer};
use tracing::debug;

use crate::error::PdfError;
use crate::extended::ExtendedPdfGenerator;
use crate::merge::merge_pdfs;
use crate::offer::OfferPdfBuilder;

/// Outcome of the extended pages for one company, for run summaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExtendedPdfSummary {
    pub offer_number: String,
    pub company_name: String,
    pub has_errors: bool,
    pub summary: String,
}

/// Base offer pages followed by the extended pages, as one document.
pub struct PdfOfferRenderer {
    base: OfferPdfBuilder,
    extended: ExtendedPdfGenerator,
    analysis: BTreeMap<String, Vec<u8>>,
    summaries: Vec<ExtendedPdfSummary>,
}

impl PdfOfferRenderer {
    pub fn new(extended: ExtendedPdfGenerator) -> Result<Self, PdfError> {
        Ok(Self {
            base: OfferPdfBuilder::with_embedded_templates()?,
            extended,
            analysis: BTreeMap::new(),
            summaries: Vec::new(),
        })
    }

    /// Chart images by key, shared by every offer of the run.
    pub fn with_analysis(mut self, analysis: BTreeMap<String, Vec<u8>>) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn summaries(&self) -> &[ExtendedPdfSummary] {
        &self.summaries
    }

    fn render_pdf(&mut self, offer: &OfferData, options: &ExtendedPdfOptions) -> Result<Vec<u8>, PdfError> {
        let base = self.base.build(offer)?;
        if options.is_empty() {
            return Ok(base);
        }

        let extended = self.extended.generate(offer, &self.analysis, options);
        let logger = self.extended.logger();
        self.summaries.push(ExtendedPdfSummary {
            offer_number: offer.offer_number.clone(),
            company_name: offer.company.name.clone(),
            has_errors: logger.has_errors(),
            summary: logger.get_user_friendly_summary(),
        });
        if extended.is_empty() {
            debug!(
                event_name = "pdf.offer.no_extended_pages",
                offer_number = %offer.offer_number,
                "extended sections produced no pages"
            );
            return Ok(base);
        }
        merge_pdfs(&[base, extended])
    }
}

impl OfferRenderer for PdfOfferRenderer {
    fn render(
        &mut self,
        offer: &OfferData,
        options: &ExtendedPdfOptions,
    ) -> Result<Vec<u8>, ApplicationError> {
        self.render_pdf(offer, options)
            .map_err(|error| ApplicationError::Rendering(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use lopdf::Document;
    use rust_decimal::Decimal;
    use solquote_core::config::FinancingConfig;
    use solquote_core::{CalculationResults, ChartLayout, ExtendedPdfOptions, OfferRenderer};

    use super::PdfOfferRenderer;
    use crate::attachments::DirectoryAttachmentResolver;
    use crate::extended::ExtendedPdfGenerator;
    use crate::financing_pages::tests::offer_with;
    use crate::images::sample_png;

    fn renderer() -> PdfOfferRenderer {
        let extended =
            ExtendedPdfGenerator::new(DirectoryAttachmentResolver::default(), FinancingConfig::default());
        PdfOfferRenderer::new(extended)
            .expect("renderer")
            .with_analysis(BTreeMap::from([("yield".to_string(), sample_png(32, 20))]))
    }

    fn offer() -> solquote_core::OfferData {
        offer_with(
            CalculationResults::new()
                .with("total_investment_brutto", Decimal::new(16_000, 0))
                .with("annual_savings_eur", Decimal::new(1_400, 0)),
        )
    }

    fn pages(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).expect("load").get_pages().len()
    }

    #[test]
    fn extended_pages_follow_the_base_offer() {
        let mut renderer = renderer();
        let base_only = renderer.render(&offer(), &ExtendedPdfOptions::default()).expect("base");
        let options = ExtendedPdfOptions {
            selected_charts: vec!["yield".to_string()],
            chart_layout: ChartLayout::OnePerPage,
            ..ExtendedPdfOptions::default()
        };

        let combined = renderer.render(&offer(), &options).expect("combined");

        assert_eq!(pages(&combined), pages(&base_only) + 1);
        assert_eq!(renderer.summaries().len(), 1);
        assert!(!renderer.summaries()[0].has_errors);
    }

    #[test]
    fn extended_failures_still_return_the_base_offer() {
        let mut renderer = renderer();
        let options = ExtendedPdfOptions {
            selected_charts: vec!["unknown".to_string()],
            ..ExtendedPdfOptions::default()
        };

        let bytes = renderer.render(&offer(), &options).expect("render");

        assert!(pages(&bytes) >= 1);
        assert!(renderer.summaries()[0].summary.contains("unknown"));
    }
}
