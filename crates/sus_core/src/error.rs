//! Error types

use thiserror::Error;

/// A widget was given a child structure it cannot wrap
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error("{component} expects exactly one child element, got {found}")]
    ExpectedSingleChild {
        component: &'static str,
        found: usize,
    },
}

/// Media query parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaQueryError {
    #[error("invalid media query `{query}`: expected {expected} near `{rest}`")]
    Syntax {
        query: String,
        rest: String,
        expected: String,
    },

    #[error("unknown media feature `{0}`")]
    UnknownFeature(String),

    #[error("invalid value `{value}` for media feature `{feature}`")]
    InvalidValue { feature: String, value: String },
}

/// Root margin parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid root margin `{0}`: expected 1 to 4 lengths in px or %")]
pub struct RootMarginError(pub String);

pub type Result<T, E = CompositionError> = std::result::Result<T, E>;
