use thiserror::Error;

#[derive(Error, Debug)]
pub enum BayesError {
    #[error("Domain error in {function}: argument must be positive and finite, got {value}")]
    Domain { function: &'static str, value: f64 },

    #[error("Invalid observation for variant {variant}: converted {converted} exceeds participated {participated}")]
    InvalidObservation {
        variant: String,
        converted: u64,
        participated: u64,
    },

    #[error("Invalid total value for variant {variant}: {value}")]
    InvalidValue { variant: String, value: f64 },

    #[error("Unsupported variant count: {0} (closed forms exist for 1, 2 or 3 variants)")]
    UnsupportedVariantCount(usize),

    #[error("Duplicate variant: {0}")]
    DuplicateVariant(String),

    #[error("Unknown variant: {0}")]
    UnknownVariant(String),

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BayesError>;

impl BayesError {
    pub(crate) fn domain(function: &'static str, value: f64) -> Self {
        BayesError::Domain { function, value }
    }

    /// True for errors that indicate a caller bug rather than bad input data.
    pub fn is_logic_error(&self) -> bool {
        matches!(self, BayesError::Domain { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_message_names_function_and_value() {
        let err = BayesError::domain("ln_gamma", -1.0);
        assert_eq!(
            err.to_string(),
            "Domain error in ln_gamma: argument must be positive and finite, got -1"
        );
        assert!(err.is_logic_error());
    }

    #[test]
    fn data_errors_are_not_logic_errors() {
        let err = BayesError::InvalidObservation {
            variant: "control".to_string(),
            converted: 11,
            participated: 10,
        };
        assert!(!err.is_logic_error());
        assert!(err.to_string().contains("control"));
    }
}
