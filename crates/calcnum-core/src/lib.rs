//! # calcnum core
//!
//! Arbitrary-precision integers, rationals and binary floats over a
//! [`Binding`](calcnum_binding::Binding): a linear memory plus native
//! big-number primitives. Values are handles into per-context pools; the
//! native structures behind them live until their context is destroyed.
//!
//! ## Architecture
//!
//! ```text
//! Calculate             ← façade: factories, parse, constants
//!     │
//! SharedRecord          ← weak sibling links for cross-kind conversion
//!     │
//! IntegerContext ─ RationalContext ─ FloatContext
//!     │
//! ContextCore           ← allocate → fill → register, bulk release
//!     │
//! HandlePool            ← (index, generation) handles
//!     │
//! Binding               ← mpz / mpq / mpfr primitives, malloc/free
//! ```
//!
//! Everything is single-threaded: contexts share the binding through
//! `Rc<RefCell<_>>`.

pub mod config;
mod context;
pub mod error;
pub mod float;
pub mod integer;
mod literal;
pub mod operand;
pub mod pool;
pub mod rational;
pub mod registry;
pub mod value;

pub use config::{
    CalculateOptions, FloatOptions, MAX_PRECISION_BITS, RoundingMode, UnknownRoundingMode,
    precision_to_bits,
};
pub use error::{CalcError, CalcResult};
pub use float::{Float, FloatContext, FloatInput, layout_digits};
pub use integer::{DivMode, Integer, IntegerContext, IntegerInput};
pub use operand::{HostNumber, Operand};
pub use pool::Handle;
pub use rational::{RatioPart, Rational, RationalContext, RationalInput};
pub use registry::{Calculate, init};
pub use value::{NumericValue, ValueKind};

#[cfg(test)]
pub(crate) mod testing {
    use crate::{Calculate, CalculateOptions, init};
    use calcnum_soft::SoftBinding;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A default numeric system over a fresh reference binding.
    pub fn system() -> (Calculate, Rc<RefCell<SoftBinding>>) {
        let binding = Rc::new(RefCell::new(SoftBinding::new()));
        let calc = init(Rc::clone(&binding), CalculateOptions::default())
            .expect("default options are valid");
        (calc, binding)
    }
}
