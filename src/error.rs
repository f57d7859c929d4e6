use crate::domain::Month;

/// Application-level failure carrying the process exit code.
///
/// Exit codes:
/// - `2`: invalid input (missing columns, bad flags, unreadable files)
/// - `3`: no usable data
/// - `4`: fitting / model-state failures
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failures raised by the sample store, fitter, classifier and registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// The month's input is missing required columns. Raised before any
    /// state is mutated.
    #[error("schema error for month {month}: {detail}")]
    Schema { month: Month, detail: String },

    /// The optimizer did not reach an optimal solution. Any earlier model for
    /// the month is discarded.
    #[error("fit failed for month {month}: {reason}")]
    FitFailure { month: Month, reason: String },

    /// Nothing was aggregated for the month, so there is nothing to fit.
    #[error("month {0} has no aggregated rows to fit")]
    EmptySummary(Month),

    /// No fitted model exists for the requested month.
    #[error("no fitted model for month {0}")]
    ModelNotFound(Month),

    /// A model without any fitted curve was asked to classify or evaluate.
    #[error("model for month {0} has no fitted coefficients")]
    CoefficientsUnset(Month),

    /// A classification input was NaN or infinite.
    #[error("cannot classify non-finite observation (duration={duration}, rnpd={value})")]
    NonFiniteObservation { duration: f64, value: f64 },

    /// Fitter or store settings were rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ModelError {
    /// Whether a batch loop can move on to the next month after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Schema { .. } | Self::FitFailure { .. } | Self::EmptySummary(_) | Self::ModelNotFound(_)
        )
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        let exit_code = match &err {
            ModelError::Schema { .. }
            | ModelError::NonFiniteObservation { .. }
            | ModelError::InvalidConfig(_) => 2,
            ModelError::EmptySummary(_) => 3,
            ModelError::FitFailure { .. }
            | ModelError::ModelNotFound(_)
            | ModelError::CoefficientsUnset(_) => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}
