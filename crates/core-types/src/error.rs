use thiserror::Error;

/// Raised when an account or account value fails structural or semantic checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no account {0} provided")]
    MissingField(&'static str),

    #[error("unknown or invalid account {field}: {value}")]
    InvalidEnum { field: &'static str, value: String },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("account name in body '{found}' does not match '{expected}'")]
    NameMismatch { expected: String, found: String },
}
