//! Errors raised at the primitive boundary.

use crate::binding::Ptr;

/// Failures the primitive layer can report.
///
/// Arithmetic primitives themselves are infallible; only allocation and
/// the text boundary can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// The linear memory could not grow to satisfy an allocation.
    #[error("out of memory: failed to allocate {requested} bytes")]
    OutOfMemory { requested: usize },

    /// No NUL terminator was found before the end of linear memory.
    #[error("unterminated string at {ptr:#x}")]
    UnterminatedString { ptr: Ptr },

    /// A fixed-size read ran past the end of linear memory.
    #[error("read of {len} bytes at {ptr:#x} is out of bounds")]
    OutOfBounds { ptr: Ptr, len: usize },

    /// The bytes at `ptr` are not valid UTF-8.
    #[error("invalid utf-8 at {ptr:#x}")]
    InvalidUtf8 { ptr: Ptr },
}

pub type BindingResult<T> = Result<T, BindingError>;
