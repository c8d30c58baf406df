use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::company::CompanyDocumentId;
use crate::domain::product::{ProductCategory, ProductId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    #[default]
    Linear,
    CategorySpecific,
    Random,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSettings {
    pub enabled: bool,
    pub mode: RotationMode,
    pub step: usize,
    pub category_steps: BTreeMap<ProductCategory, usize>,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: RotationMode::Linear,
            step: 1,
            category_steps: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceCalculationMode {
    #[default]
    Linear,
    Exponential,
    Custom,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceScalingSettings {
    pub increment_percent: Decimal,
    pub mode: PriceCalculationMode,
    pub exponent: Decimal,
    /// JSON array of per-company factors, e.g. `[1.0, 1.05, 1.12]`.
    pub custom_factors_json: String,
}

impl Default for PriceScalingSettings {
    fn default() -> Self {
        Self {
            increment_percent: Decimal::new(5, 0),
            mode: PriceCalculationMode::Linear,
            exponent: Decimal::new(105, 2),
            custom_factors_json: "[]".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartLayout {
    #[default]
    OnePerPage,
    TwoPerPage,
    FourPerPage,
}

impl ChartLayout {
    pub fn charts_per_page(&self) -> usize {
        match self {
            Self::OnePerPage => 1,
            Self::TwoPerPage => 2,
            Self::FourPerPage => 4,
        }
    }

    pub fn page_count(&self, chart_count: usize) -> usize {
        chart_count.div_ceil(self.charts_per_page())
    }
}

impl std::str::FromStr for ChartLayout {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "one_per_page" => Ok(Self::OnePerPage),
            "two_per_page" => Ok(Self::TwoPerPage),
            "four_per_page" => Ok(Self::FourPerPage),
            other => Err(format!(
                "unsupported chart layout `{other}` (expected one_per_page|two_per_page|four_per_page)"
            )),
        }
    }
}

/// Which extra pages get appended after the standard offer pages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtendedPdfOptions {
    pub financing_details: bool,
    pub product_datasheets: Vec<ProductId>,
    pub company_documents: Vec<CompanyDocumentId>,
    pub selected_charts: Vec<String>,
    pub chart_layout: ChartLayout,
    /// Attach the datasheets of whatever products rotation picked for the company.
    pub include_selected_product_datasheets: bool,
    pub use_chart_cache: bool,
}

impl ExtendedPdfOptions {
    pub fn is_empty(&self) -> bool {
        !self.financing_details
            && self.product_datasheets.is_empty()
            && self.company_documents.is_empty()
            && self.selected_charts.is_empty()
            && !self.include_selected_product_datasheets
    }
}

/// Per-run offer configuration. The product ids are the base selection that
/// company 0 receives; the other companies get rotated copies.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanySettings {
    pub module_id: Option<ProductId>,
    pub inverter_id: Option<ProductId>,
    pub storage_id: Option<ProductId>,
    pub module_quantity: u32,
    pub rotation: RotationSettings,
    pub pricing: PriceScalingSettings,
    pub pdf: ExtendedPdfOptions,
}

impl CompanySettings {
    pub fn product_id(&self, category: ProductCategory) -> Option<ProductId> {
        match category {
            ProductCategory::Module => self.module_id,
            ProductCategory::Inverter => self.inverter_id,
            ProductCategory::Storage => self.storage_id,
        }
    }

    pub fn set_product_id(&mut self, category: ProductCategory, id: Option<ProductId>) {
        match category {
            ProductCategory::Module => self.module_id = id,
            ProductCategory::Inverter => self.inverter_id = id,
            ProductCategory::Storage => self.storage_id = id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChartLayout, CompanySettings, ExtendedPdfOptions};
    use crate::domain::product::{ProductCategory, ProductId};

    #[test]
    fn chart_page_count_matches_ceiling_law() {
        for layout in [ChartLayout::OnePerPage, ChartLayout::TwoPerPage, ChartLayout::FourPerPage] {
            let per_page = layout.charts_per_page();
            for charts in 1..=20usize {
                let expected = (charts + per_page - 1) / per_page;
                assert_eq!(layout.page_count(charts), expected, "{layout:?} with {charts} charts");
            }
        }
        assert_eq!(ChartLayout::FourPerPage.page_count(9), 3);
    }

    #[test]
    fn settings_product_ids_are_addressable_by_category() {
        let mut settings = CompanySettings::default();
        settings.set_product_id(ProductCategory::Inverter, Some(ProductId(7)));

        assert_eq!(settings.product_id(ProductCategory::Inverter), Some(ProductId(7)));
        assert_eq!(settings.product_id(ProductCategory::Module), None);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ExtendedPdfOptions =
            serde_json::from_str(r#"{"selected_charts":["yield"],"chart_layout":"four_per_page"}"#)
                .expect("options");

        assert_eq!(options.chart_layout, ChartLayout::FourPerPage);
        assert!(!options.financing_details);
        assert!(!options.is_empty());
    }
}
