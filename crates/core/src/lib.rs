pub mod calculation;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod financing;
pub mod offers;

pub use calculation::{
    CalculationAdapter, CalculationEngine, CalculationError, CalculationInput,
    StandardCalculationEngine,
};
pub use catalog::Catalog;
pub use domain::company::{Company, CompanyDocument, CompanyDocumentId, CompanyId};
pub use domain::offer::{
    CalculationOutcome, CalculationResults, CalculationSource, CustomerData, OfferData,
    ProjectData, ProjectDetails, SelectedProducts,
};
pub use domain::product::{Product, ProductCategory, ProductId};
pub use domain::settings::{
    ChartLayout, CompanySettings, ExtendedPdfOptions, PriceCalculationMode, PriceScalingSettings,
    RotationMode, RotationSettings,
};
pub use errors::{ApplicationError, DomainError};
pub use offers::assembler::OfferDataAssembler;
pub use offers::generator::{
    GeneratedOffer, GenerationFailure, GenerationJob, GenerationReport, MultiOfferGenerator,
    OfferRenderer,
};
pub use offers::rotation::{ProductRotationEngine, RotationError, RotationState};
pub use offers::scaling::{PriceScalingEngine, ScaledResults, ScalingError};
