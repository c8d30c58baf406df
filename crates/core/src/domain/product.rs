use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Module,
    Inverter,
    Storage,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 3] = [Self::Module, Self::Inverter, Self::Storage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Inverter => "inverter",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "module" | "modul" | "pv module" => Ok(Self::Module),
            "inverter" | "wechselrichter" => Ok(Self::Inverter),
            "storage" | "batteriespeicher" | "speicher" => Ok(Self::Storage),
            other => Err(format!("unknown product category `{other}`")),
        }
    }
}

/// Catalog row for a module, inverter or storage product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category: ProductCategory,
    pub brand: String,
    pub model_name: String,
    /// Nominal power in watts (module peak power, inverter AC power).
    pub capacity_w: Option<Decimal>,
    pub storage_capacity_kwh: Option<Decimal>,
    pub price_eur: Decimal,
    /// Path relative to the datasheet directory.
    pub datasheet_path: Option<String>,
}

impl Product {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::ProductCategory;

    #[test]
    fn category_parses_english_and_german_labels() {
        assert_eq!("Modul".parse::<ProductCategory>(), Ok(ProductCategory::Module));
        assert_eq!("wechselrichter".parse::<ProductCategory>(), Ok(ProductCategory::Inverter));
        assert_eq!(" storage ".parse::<ProductCategory>(), Ok(ProductCategory::Storage));
        assert!("wallbox".parse::<ProductCategory>().is_err());
    }
}
