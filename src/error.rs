//! Screener error types

use serde::Serialize;
use thiserror::Error;

/// Screener-wide error type
#[derive(Error, Debug)]
pub enum ScreenerError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown timeframe: {0}")]
    UnknownTimeframe(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Malformed value for operator '{operator}': {reason}")]
    MalformedOperatorValue { operator: String, reason: String },

    #[error("Expression cannot be empty")]
    EmptyExpression,

    #[error("Unsafe expression: {0}")]
    UnsafeExpression(String),

    #[error("Template '{0}' not found")]
    UnknownTemplate(String),

    #[error("Parameter '{param}' must be {expected}")]
    InvalidParameterType { param: String, expected: &'static str },

    #[error("Parameter '{param}' must be {bound}")]
    ParameterOutOfRange { param: String, bound: String },

    #[error("Parameter '{param}' {reason}")]
    InvalidParameterValue { param: String, reason: String },

    #[error("Template '{template}' has no value for placeholder '{{{placeholder}}}'")]
    TemplatePlaceholder { template: String, placeholder: String },

    #[error("Field '{field}' not allowed here: {reason}")]
    FieldNotAllowed { field: String, reason: String },

    #[error("Timeframe override not supported: {0}")]
    TimeframeOverride(String),

    #[error("Limit {requested} exceeds the maximum of {max}")]
    LimitExceeded { requested: u32, max: u32 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for ScreenerError {
    fn from(err: rusqlite::Error) -> Self {
        ScreenerError::Execution(err.to_string())
    }
}

impl From<r2d2::Error> for ScreenerError {
    fn from(err: r2d2::Error) -> Self {
        ScreenerError::Execution(format!("connection pool: {}", err))
    }
}

impl ScreenerError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            ScreenerError::UnknownField(_) => "UNKNOWN_FIELD",
            ScreenerError::UnknownTimeframe(_) => "UNKNOWN_TIMEFRAME",
            ScreenerError::UnsupportedOperator(_) => "UNSUPPORTED_OPERATOR",
            ScreenerError::MalformedOperatorValue { .. } => "MALFORMED_OPERATOR_VALUE",
            ScreenerError::EmptyExpression => "EMPTY_EXPRESSION",
            ScreenerError::UnsafeExpression(_) => "UNSAFE_EXPRESSION",
            ScreenerError::UnknownTemplate(_) => "UNKNOWN_TEMPLATE",
            ScreenerError::InvalidParameterType { .. } => "INVALID_PARAMETER_TYPE",
            ScreenerError::ParameterOutOfRange { .. } => "PARAMETER_OUT_OF_RANGE",
            ScreenerError::InvalidParameterValue { .. } => "INVALID_PARAMETER_VALUE",
            ScreenerError::TemplatePlaceholder { .. } => "TEMPLATE_PLACEHOLDER",
            ScreenerError::FieldNotAllowed { .. } => "FIELD_NOT_ALLOWED",
            ScreenerError::TimeframeOverride(_) => "TIMEFRAME_OVERRIDE",
            ScreenerError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            ScreenerError::InvalidRequest(_) => "INVALID_REQUEST",
            ScreenerError::Execution(_) => "EXECUTION_ERROR",
            ScreenerError::Config(_) => "CONFIG_ERROR",
            ScreenerError::Serialization(_) => "SERIALIZATION_ERROR",
            ScreenerError::Io(_) => "IO_ERROR",
            ScreenerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for errors raised while validating or compiling a request,
    /// i.e. before any statement reaches the database.
    pub fn is_compile_error(&self) -> bool {
        !matches!(
            self,
            ScreenerError::Execution(_)
                | ScreenerError::Config(_)
                | ScreenerError::Io(_)
                | ScreenerError::Internal(_)
        )
    }
}

/// Serializable error response for API clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub code: String,
    pub message: String,
}

impl From<&ScreenerError> for ErrorResponse {
    fn from(err: &ScreenerError) -> Self {
        ErrorResponse {
            status: "error",
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<ScreenerError> for ErrorResponse {
    fn from(err: ScreenerError) -> Self {
        ErrorResponse::from(&err)
    }
}

pub type Result<T> = std::result::Result<T, ScreenerError>;
