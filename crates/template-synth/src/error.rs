//! Error types raised while synthesizing templates.

use serde::Serialize;
use std::fmt;

/// Stable identifier for every failure class.
///
/// Published codes never change meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A node kind has no lowering in the active dialect.
    UnsupportedConstruct,
    /// An integration call appears where the dialect forbids it.
    IllegalIntegrationPosition,
    /// A binding pattern element has no derivable property accessor.
    AmbiguousBindingTarget,
    /// Raised at template execution time by the `reduce` empty-input guard.
    EmptyReduceNoInitial,
    /// The IR broke a construction-time contract.
    InternalInvariantViolation,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnsupportedConstruct => "SYN001",
            ErrorCode::IllegalIntegrationPosition => "SYN002",
            ErrorCode::AmbiguousBindingTarget => "SYN003",
            ErrorCode::EmptyReduceNoInitial => "SYN004",
            ErrorCode::InternalInvariantViolation => "SYN999",
        }
    }

    /// Symbolic name, as it appears in runtime guard payloads.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::UnsupportedConstruct => "UnsupportedConstruct",
            ErrorCode::IllegalIntegrationPosition => "IllegalIntegrationPosition",
            ErrorCode::AmbiguousBindingTarget => "AmbiguousBindingTarget",
            ErrorCode::EmptyReduceNoInitial => "EmptyReduceNoInitial",
            ErrorCode::InternalInvariantViolation => "InternalInvariantViolation",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that aborts a compilation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthError {
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("illegal integration position: {0}")]
    IllegalIntegration(String),

    #[error("ambiguous binding target: {0}")]
    AmbiguousBinding(String),

    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl SynthError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        SynthError::Unsupported(message.into())
    }

    pub fn illegal_integration(message: impl Into<String>) -> Self {
        SynthError::IllegalIntegration(message.into())
    }

    pub fn ambiguous_binding(message: impl Into<String>) -> Self {
        SynthError::AmbiguousBinding(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SynthError::Internal(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SynthError::Unsupported(_) => ErrorCode::UnsupportedConstruct,
            SynthError::IllegalIntegration(_) => ErrorCode::IllegalIntegrationPosition,
            SynthError::AmbiguousBinding(_) => ErrorCode::AmbiguousBindingTarget,
            SynthError::Internal(_) => ErrorCode::InternalInvariantViolation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::UnsupportedConstruct.as_str(), "SYN001");
        assert_eq!(ErrorCode::EmptyReduceNoInitial.name(), "EmptyReduceNoInitial");
        assert_eq!(
            SynthError::unsupported("typeof").code(),
            ErrorCode::UnsupportedConstruct
        );
    }

    #[test]
    fn test_display_carries_message() {
        let err = SynthError::illegal_integration("response templates cannot call integrations");
        assert_eq!(
            err.to_string(),
            "illegal integration position: response templates cannot call integrations"
        );
        assert_eq!(err.code().to_string(), "SYN002");
    }
}
