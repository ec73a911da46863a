//! # calcnum binding
//!
//! The primitive layer consumed by `calcnum-core`. A binding owns a
//! byte-addressable linear memory and the native big-number structures
//! that live in it. Everything is addressed by [`Ptr`]: integers (`mpz`),
//! rationals (`mpq`), floats (`mpfr`), and the NUL-terminated strings that
//! move text across the memory boundary.
//!
//! ```text
//! Binding               ← malloc/free, memory view, per-kind primitives
//!     │
//! text                  ← UTF-8 encode/decode across the boundary
//!     │
//! Rnd                   ← native rounding mode numbering
//! ```
//!
//! This crate defines the contract only. Implementations live elsewhere
//! (`calcnum-soft` is the in-tree reference implementation).

pub mod binding;
pub mod error;
pub mod rnd;
pub mod text;

pub use binding::{Binding, Ptr};
pub use error::{BindingError, BindingResult};
pub use rnd::Rnd;
pub use text::{read_cstr, read_i32, write_cstr};
