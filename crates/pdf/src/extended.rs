//! Extra pages appended after the standard offer: financing, datasheets,
//! company documents and charts. Each section fails on its own.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use solquote_core::config::FinancingConfig;
use solquote_core::{CompanyDocumentId, ExtendedPdfOptions, OfferData, ProductId};

use crate::attachments::{load_attachment, AttachmentResolver};
use crate::chart_cache::ChartCache;
use crate::charts::charts_section;
use crate::error::PdfError;
use crate::financing_pages::financing_section;
use crate::logger::ExtendedPdfLogger;
use crate::merge::PdfMerger;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Financing,
    Datasheets,
    Documents,
    Charts,
}

impl Section {
    const ORDER: [Section; 4] = [Self::Financing, Self::Datasheets, Self::Documents, Self::Charts];

    fn component(&self) -> &'static str {
        match self {
            Self::Financing => "financing",
            Self::Datasheets => "datasheets",
            Self::Documents => "company_documents",
            Self::Charts => "charts",
        }
    }
}

pub struct ExtendedPdfGenerator {
    resolver: Box<dyn AttachmentResolver + Send + Sync>,
    financing: FinancingConfig,
    chart_cache: Option<&'static Mutex<ChartCache>>,
    logger: ExtendedPdfLogger,
}

impl ExtendedPdfGenerator {
    pub fn new(resolver: impl AttachmentResolver + Send + Sync + 'static, financing: FinancingConfig) -> Self {
        Self {
            resolver: Box::new(resolver),
            financing,
            chart_cache: None,
            logger: ExtendedPdfLogger::new(),
        }
    }

    /// Enables the chart cache for calls whose options ask for it.
    pub fn with_chart_cache(mut self, cache: &'static Mutex<ChartCache>) -> Self {
        self.chart_cache = Some(cache);
        self
    }

    /// Entries of the most recent [`generate`](Self::generate) call.
    pub fn logger(&self) -> &ExtendedPdfLogger {
        &self.logger
    }

    /// Builds the extra pages for `offer`. Sections that fail are logged and
    /// left out; when nothing could be produced the result is empty.
    pub fn generate(
        &mut self,
        offer: &OfferData,
        analysis: &BTreeMap<String, Vec<u8>>,
        options: &ExtendedPdfOptions,
    ) -> Vec<u8> {
        self.logger.clear();
        match self.assemble(offer, analysis, options) {
            Ok(bytes) => bytes,
            Err(error) => {
                self.logger.error("extended_pdf", format!("Erweiterte PDF-Seiten fehlgeschlagen: {error}"));
                Vec::new()
            }
        }
    }

    fn assemble(
        &mut self,
        offer: &OfferData,
        analysis: &BTreeMap<String, Vec<u8>>,
        options: &ExtendedPdfOptions,
    ) -> Result<Vec<u8>, PdfError> {
        let mut merger = PdfMerger::new();

        for section in Section::ORDER {
            let component = section.component();
            let produced = match section {
                Section::Financing if options.financing_details => {
                    financing_section(offer, &self.financing)
                }
                Section::Datasheets => self.datasheets_section(offer, options),
                Section::Documents => self.documents_section(&options.company_documents),
                Section::Charts if !options.selected_charts.is_empty() => {
                    let cache = if options.use_chart_cache { self.chart_cache } else { None };
                    charts_section(
                        analysis,
                        &options.selected_charts,
                        options.chart_layout,
                        cache,
                        &mut self.logger,
                    )
                }
                _ => continue,
            };

            match produced {
                Ok(bytes) if bytes.is_empty() => {}
                Ok(bytes) => match merger.append_bytes(&bytes) {
                    Ok(pages) => self.logger.info(component, format!("{pages} Seiten hinzugefügt")),
                    Err(error) => self.logger.error(component, format!("Seiten nicht übernommen: {error}")),
                },
                Err(error) => self.logger.error(component, format!("Abschnitt übersprungen: {error}")),
            }
        }

        merger.finish()
    }

    fn datasheet_ids(offer: &OfferData, options: &ExtendedPdfOptions) -> Vec<ProductId> {
        let mut ids = options.product_datasheets.clone();
        if options.include_selected_product_datasheets {
            ids.extend(offer.products.iter().map(|product| product.id));
        }
        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(*id));
        ids
    }

    fn datasheets_section(&mut self, offer: &OfferData, options: &ExtendedPdfOptions) -> Result<Vec<u8>, PdfError> {
        let sources: Vec<(String, Option<PathBuf>)> = Self::datasheet_ids(offer, options)
            .into_iter()
            .map(|id| (format!("Datenblatt {id}"), self.resolver.datasheet(id)))
            .collect();
        self.attachments_section(Section::Datasheets, sources)
    }

    fn documents_section(&mut self, ids: &[CompanyDocumentId]) -> Result<Vec<u8>, PdfError> {
        let sources: Vec<(String, Option<PathBuf>)> = ids
            .iter()
            .map(|id| {
                let label =
                    self.resolver.label_for_document(*id).unwrap_or_else(|| format!("Dokument {}", id.0));
                (label, self.resolver.company_document(*id))
            })
            .collect();
        self.attachments_section(Section::Documents, sources)
    }

    /// Loads every resolvable source into one merger. Unknown ids and
    /// unreadable files are skipped with a warning.
    fn attachments_section(
        &mut self,
        section: Section,
        sources: Vec<(String, Option<PathBuf>)>,
    ) -> Result<Vec<u8>, PdfError> {
        let component = section.component();
        let mut merger = PdfMerger::new();

        for (label, path) in sources {
            let Some(path) = path else {
                self.logger.warning(component, format!("{label}: keine Datei hinterlegt"));
                continue;
            };
            let caption = if section == Section::Documents { label.as_str() } else { "" };
            let appended =
                load_attachment(&path, caption).and_then(|document| merger.append_document(document));
            if let Err(error) = appended {
                self.logger.warning(component, format!("{label} ({}) übersprungen: {error}", path.display()));
            }
        }

        merger.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::path::PathBuf;

    use lopdf::Document;
    use rust_decimal::Decimal;
    use solquote_core::config::FinancingConfig;
    use solquote_core::{CalculationResults, ChartLayout, CompanyDocumentId, ExtendedPdfOptions, ProductId};

    use super::ExtendedPdfGenerator;
    use crate::attachments::AttachmentResolver;
    use crate::canvas::{Font, PageCanvas, PdfWriter};
    use crate::financing_pages::tests::offer_with;
    use crate::images::sample_png;

    #[derive(Default)]
    struct MapResolver {
        datasheets: HashMap<ProductId, PathBuf>,
        documents: HashMap<CompanyDocumentId, PathBuf>,
    }

    impl AttachmentResolver for MapResolver {
        fn datasheet(&self, product_id: ProductId) -> Option<PathBuf> {
            self.datasheets.get(&product_id).cloned()
        }

        fn company_document(&self, document_id: CompanyDocumentId) -> Option<PathBuf> {
            self.documents.get(&document_id).cloned()
        }
    }

    fn pdf_with_pages(pages: usize) -> Vec<u8> {
        let mut writer = PdfWriter::new();
        for page in 0..pages {
            let mut canvas = PageCanvas::default();
            canvas.text(72.0, 700.0, 12.0, Font::Regular, &format!("Datenblatt Seite {page}"));
            writer.add_page(canvas).expect("page");
        }
        writer.finish().expect("finish")
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).expect("load").get_pages().len()
    }

    fn financed_offer() -> solquote_core::OfferData {
        offer_with(
            CalculationResults::new()
                .with("total_investment_brutto", Decimal::new(18_500, 0))
                .with("annual_savings_eur", Decimal::new(1_650, 0)),
        )
    }

    #[test]
    fn no_requested_section_gives_empty_bytes() {
        let mut generator = ExtendedPdfGenerator::new(MapResolver::default(), FinancingConfig::default());
        let bytes = generator.generate(&financed_offer(), &BTreeMap::new(), &ExtendedPdfOptions::default());

        assert!(bytes.is_empty());
        assert!(!generator.logger().has_errors());
    }

    #[test]
    fn mixed_valid_and_missing_datasheets_keep_only_valid_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sheet = dir.path().join("module.pdf");
        std::fs::write(&sheet, pdf_with_pages(2)).expect("write");
        let resolver = MapResolver {
            datasheets: HashMap::from([
                (ProductId(101), sheet),
                (ProductId(102), dir.path().join("vanished.pdf")),
            ]),
            ..MapResolver::default()
        };
        let options = ExtendedPdfOptions {
            product_datasheets: vec![ProductId(101), ProductId(999), ProductId(102)],
            ..ExtendedPdfOptions::default()
        };

        let mut generator = ExtendedPdfGenerator::new(resolver, FinancingConfig::default());
        let bytes = generator.generate(&financed_offer(), &BTreeMap::new(), &options);

        assert_eq!(page_count(&bytes), 2);
        assert!(generator.logger().has_warnings());
        assert!(!generator.logger().has_errors());
    }

    #[test]
    fn failing_section_is_skipped_and_the_rest_survives() {
        let dir = tempfile::tempdir().expect("tempdir");
        let certificate = dir.path().join("meisterbrief.png");
        std::fs::write(&certificate, sample_png(300, 200)).expect("write");
        let resolver = MapResolver {
            documents: HashMap::from([(CompanyDocumentId(1), certificate)]),
            ..MapResolver::default()
        };
        let analysis = BTreeMap::from([
            ("yield".to_string(), sample_png(40, 30)),
            ("savings".to_string(), sample_png(40, 30)),
            ("autarky".to_string(), sample_png(40, 30)),
        ]);
        let options = ExtendedPdfOptions {
            financing_details: true,
            company_documents: vec![CompanyDocumentId(1)],
            selected_charts: vec!["yield".to_string(), "savings".to_string(), "autarky".to_string()],
            chart_layout: ChartLayout::TwoPerPage,
            ..ExtendedPdfOptions::default()
        };
        // no investment amount, so the financing section cannot be built
        let offer = offer_with(CalculationResults::new());

        let mut generator = ExtendedPdfGenerator::new(resolver, FinancingConfig::default());
        let bytes = generator.generate(&offer, &analysis, &options);

        assert_eq!(page_count(&bytes), 1 + 2);
        assert!(generator.logger().has_errors());
        assert!(generator.logger().get_user_friendly_summary().contains("[financing]"));
    }

    #[test]
    fn selected_product_datasheets_are_deduplicated() {
        let mut offer = financed_offer();
        offer.products.module = Some(solquote_core::Product {
            id: ProductId(101),
            category: solquote_core::ProductCategory::Module,
            brand: "Sonnenwerk".to_string(),
            model_name: "SW-420".to_string(),
            capacity_w: Some(Decimal::new(420, 0)),
            storage_capacity_kwh: None,
            price_eur: Decimal::new(189, 0),
            datasheet_path: Some("sw420.pdf".to_string()),
        });
        let options = ExtendedPdfOptions {
            product_datasheets: vec![ProductId(101), ProductId(7)],
            include_selected_product_datasheets: true,
            ..ExtendedPdfOptions::default()
        };

        assert_eq!(
            ExtendedPdfGenerator::datasheet_ids(&offer, &options),
            vec![ProductId(101), ProductId(7)]
        );
    }

    #[test]
    fn financing_only_produces_pages() {
        let options = ExtendedPdfOptions { financing_details: true, ..ExtendedPdfOptions::default() };
        let mut generator = ExtendedPdfGenerator::new(MapResolver::default(), FinancingConfig::default());

        let bytes = generator.generate(&financed_offer(), &BTreeMap::new(), &options);

        assert!(page_count(&bytes) >= 1);
        assert!(!generator.logger().has_errors());
    }
}
