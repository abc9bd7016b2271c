use crate::prelude::{AgeGroup, Real, Time};
use serde::Serialize;

/// Malformed or out-of-range input. Raised when value objects are built,
/// never while a simulation is stepping.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: negative value {value}")]
    Negative { field: String, value: Real },

    #[error("{field}: value is not finite")]
    NotFinite { field: String },

    #[error("{field}: value {value} must be strictly positive")]
    NonPositive { field: String, value: Real },

    #[error("{field}: expected {expected} entries, got {got}")]
    WrongLength {
        field: String,
        expected: usize,
        got: usize,
    },

    #[error("{field}: time offsets must be strictly increasing ({previous} followed by {next})")]
    NonIncreasing {
        field: String,
        previous: Time,
        next: Time,
    },

    #[error("{field}: value {value} outside [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: Real,
        min: Real,
        max: Real,
    },

    #[error("{field}: must not be empty")]
    Empty { field: String },

    #[error("{field}: {reason}")]
    Inconsistent { field: String, reason: String },
}

impl ValidationError {
    /// Name of the offending input field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Negative { field, .. }
            | ValidationError::NotFinite { field }
            | ValidationError::NonPositive { field, .. }
            | ValidationError::WrongLength { field, .. }
            | ValidationError::NonIncreasing { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Empty { field }
            | ValidationError::Inconsistent { field, .. } => field,
        }
    }
}

/// Conservation drift above tolerance in one age bucket after a step.
///
/// The bucket is rescaled to its population when this is emitted, so the
/// warning records the observed values before correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericDriftWarning {
    pub time: Time,
    pub age: AgeGroup,
    pub expected: Real,
    pub observed: Real,
    pub relative: Real,
}

/// Errors raised at I/O boundaries (loading scenarios, writing results).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

pub(crate) type Result<T, E = ValidationError> = std::result::Result<T, E>;

/// Checks shared by every constructor in the crate.
pub(crate) mod check {
    use super::{Result, ValidationError};
    use crate::prelude::Real;

    pub fn finite(field: &str, value: Real) -> Result<Real> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ValidationError::NotFinite {
                field: field.to_string(),
            })
        }
    }

    pub fn non_negative(field: &str, value: Real) -> Result<Real> {
        finite(field, value)?;
        if value < 0.0 {
            return Err(ValidationError::Negative {
                field: field.to_string(),
                value,
            });
        }
        Ok(value)
    }

    pub fn positive(field: &str, value: Real) -> Result<Real> {
        finite(field, value)?;
        if value <= 0.0 {
            return Err(ValidationError::NonPositive {
                field: field.to_string(),
                value,
            });
        }
        Ok(value)
    }

    pub fn in_range(field: &str, value: Real, min: Real, max: Real) -> Result<Real> {
        finite(field, value)?;
        if value < min || value > max {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                value,
                min,
                max,
            });
        }
        Ok(value)
    }

    pub fn length(field: &str, got: usize, expected: usize) -> Result<()> {
        if got == 0 {
            return Err(ValidationError::Empty {
                field: field.to_string(),
            });
        }
        if got != expected {
            return Err(ValidationError::WrongLength {
                field: field.to_string(),
                expected,
                got,
            });
        }
        Ok(())
    }
}
