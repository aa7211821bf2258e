use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The target backend has no translation for this operator.
    UnsupportedOperator {
        field: String,
        operator: &'static str,
        backend: &'static str,
    },
    /// An accessor table is inconsistent with the criteria type it describes.
    InvalidField {
        criteria: &'static str,
        field: String,
        reason: String,
    },
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },
    /// Raised by `Criteria::validate` hooks.
    Validation(String),
}

impl Error {
    /// Name of the field the error refers to, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::UnsupportedOperator { field, .. }
            | Error::InvalidField { field, .. }
            | Error::InvalidPattern { field, .. } => Some(field),
            Error::Validation(_) => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnsupportedOperator {
                field,
                operator,
                backend,
            } => write!(
                f,
                "Unsupported operator `{}` on field `{}` for backend {}",
                operator, field, backend
            ),
            Error::InvalidField {
                criteria,
                field,
                reason,
            } => write!(f, "Invalid field `{}` on {}: {}", field, criteria, reason),
            Error::InvalidPattern {
                field,
                pattern,
                reason,
            } => write!(
                f,
                "Invalid pattern `{}` on field `{}`: {}",
                pattern, field, reason
            ),
            Error::Validation(err) => write!(f, "Validation error: {}", err),
        }
    }
}

impl std::error::Error for Error {}
