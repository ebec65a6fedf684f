//! Local validation errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdnError {
    #[error("unrecognized match variable: {0}")]
    UnrecognizedConditionVariable(String),

    #[error("unrecognized action name: {0}")]
    UnrecognizedActionName(String),

    #[error("--rule-name is required for Microsoft SKU")]
    RuleNameRequired,

    #[error("Either --rule-name or --order must be specified")]
    RuleSelectorRequired,

    #[error("Order should be non-negative.")]
    NegativeOrder,

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("range \"{0}\" is invalid")]
    InvalidRange(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{kind} not found. Please verify the resource(s) exist: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl CdnError {
    /// Stable code used in error events
    pub fn code(&self) -> &'static str {
        match self {
            CdnError::UnrecognizedConditionVariable(_) => "UNKNOWN_MATCH_VARIABLE",
            CdnError::UnrecognizedActionName(_) => "UNKNOWN_ACTION",
            CdnError::RuleNameRequired => "RULE_NAME_REQUIRED",
            CdnError::RuleSelectorRequired => "RULE_SELECTOR_REQUIRED",
            CdnError::NegativeOrder => "NEGATIVE_ORDER",
            CdnError::OutOfRange { .. } => "OUT_OF_RANGE",
            CdnError::InvalidRange(_) => "INVALID_RANGE",
            CdnError::InvalidArgument(_) => "INVALID_ARGUMENT",
            CdnError::NotFound { .. } => "NOT_FOUND",
        }
    }
}

/// Reject values outside `[min, max]`
pub fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), CdnError> {
    if value < min || value > max {
        return Err(CdnError::OutOfRange { field, value, min, max });
    }
    Ok(())
}
