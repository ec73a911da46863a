//! Error types for numeric-system operations.

use crate::value::ValueKind;
use calcnum_binding::BindingError;

/// Errors surfaced by contexts, values and the registry.
#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    /// A literal, host number or argument the operation cannot accept.
    #[error("invalid numeric input: {0}")]
    InvalidNumericInput(String),

    /// Division, modulo or inversion by a zero-valued operand.
    #[error("division by zero")]
    DivisionByZero,

    /// The value's context has run its bulk release since the value was
    /// created.
    #[error("{kind} value used after its context was destroyed")]
    UseAfterRelease { kind: ValueKind },

    /// The binding could not allocate native storage. Never retried.
    #[error("native allocation failed: {0}")]
    AllocationFailure(#[source] BindingError),

    #[error(
        "precision must be between 1 and {max} bits, got {0}",
        max = crate::config::MAX_PRECISION_BITS
    )]
    InvalidPrecision(u32),

    /// A sibling context needed for a cross-kind conversion is missing.
    #[error("{kind} context is not available")]
    ContextUnavailable { kind: ValueKind },

    /// The operand lives in a numeric system backed by another binding.
    #[error("operand belongs to a different binding")]
    ForeignValue,

    /// A read across the memory boundary failed.
    #[error("native text error: {0}")]
    Native(#[source] BindingError),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type CalcResult<T> = Result<T, CalcError>;

impl CalcError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidNumericInput(message.into())
    }

    /// Map a binding failure raised while allocating.
    pub(crate) fn allocation(err: BindingError) -> Self {
        match err {
            BindingError::OutOfMemory { .. } => Self::AllocationFailure(err),
            other => Self::Native(other),
        }
    }
}
