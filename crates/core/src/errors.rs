use thiserror::Error;

use crate::domain::company::CompanyId;
use crate::domain::product::ProductId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown product {0}")]
    UnknownProduct(ProductId),
    #[error("unknown company {0:?}")]
    UnknownCompany(CompanyId),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("rendering failure: {0}")]
    Rendering(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable class label used in command output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain_validation",
            Self::Persistence(_) => "persistence",
            Self::Rendering(_) => "rendering",
            Self::Configuration(_) => "configuration",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(_) => "The offer input could not be processed. Check inputs and try again.",
            Self::Persistence(_) => "The product database is temporarily unavailable.",
            Self::Rendering(_) => "The offer document could not be rendered.",
            Self::Configuration(_) => "The application is misconfigured.",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::product::ProductId;
    use crate::errors::{ApplicationError, DomainError};

    #[test]
    fn domain_error_maps_to_domain_validation_class() {
        let error = ApplicationError::from(DomainError::UnknownProduct(ProductId(42)));

        assert_eq!(error.error_class(), "domain_validation");
        assert_eq!(error.to_string(), "unknown product 42");
    }

    #[test]
    fn persistence_error_has_user_safe_message() {
        let error = ApplicationError::Persistence("database lock timeout".to_owned());

        assert_eq!(error.user_message(), "The product database is temporarily unavailable.");
    }
}
