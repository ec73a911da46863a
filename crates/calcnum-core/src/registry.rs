//! Wiring of the three contexts into one numeric system.
//!
//! [`init`] builds an empty [`SharedRecord`], then creates the integer,
//! rational and float contexts in that order, installing each into the
//! record as soon as it exists. Cross-kind conversions look their target
//! context up in the record, so a context only ever reaches siblings that
//! were installed before the conversion runs.

use crate::config::{CalculateOptions, FloatOptions};
use crate::context::{ContextCore, SharedBinding};
use crate::error::{CalcError, CalcResult};
use crate::float::{Float, FloatContext, FloatInput, FloatState};
use crate::integer::{Integer, IntegerContext, IntegerInput};
use crate::literal;
use crate::rational::{RatioPart, Rational, RationalContext, RationalInput};
use crate::value::{NumericValue, ValueKind};
use calcnum_binding::Binding;
use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Late-bound references from every context to its siblings.
///
/// Entries are weak: the record never keeps a context alive.
#[derive(Default)]
pub(crate) struct SharedRecord {
    integers: OnceCell<Weak<ContextCore>>,
    rationals: OnceCell<Weak<ContextCore>>,
    floats: OnceCell<Weak<FloatState>>,
}

fn install<T>(slot: &OnceCell<Weak<T>>, value: &Rc<T>, kind: ValueKind) {
    if slot.set(Rc::downgrade(value)).is_ok() {
        tracing::debug!(%kind, "context installed in shared record");
    } else {
        tracing::warn!(%kind, "shared record already holds this context");
    }
}

fn lookup<T>(slot: &OnceCell<Weak<T>>, kind: ValueKind) -> CalcResult<Rc<T>> {
    slot.get()
        .and_then(Weak::upgrade)
        .ok_or(CalcError::ContextUnavailable { kind })
}

impl SharedRecord {
    pub fn install_integers(&self, core: &Rc<ContextCore>) {
        install(&self.integers, core, ValueKind::Integer);
    }

    pub fn install_rationals(&self, core: &Rc<ContextCore>) {
        install(&self.rationals, core, ValueKind::Rational);
    }

    pub fn install_floats(&self, state: &Rc<FloatState>) {
        install(&self.floats, state, ValueKind::Float);
    }

    pub fn integers(&self) -> CalcResult<Rc<ContextCore>> {
        lookup(&self.integers, ValueKind::Integer)
    }

    pub fn rationals(&self) -> CalcResult<Rc<ContextCore>> {
        lookup(&self.rationals, ValueKind::Rational)
    }

    pub fn floats(&self) -> CalcResult<Rc<FloatState>> {
        lookup(&self.floats, ValueKind::Float)
    }
}

/// Build a numeric system on `binding`.
///
/// Fails only when `options` resolve to an invalid float precision.
pub fn init<B: Binding + 'static>(
    binding: Rc<RefCell<B>>,
    options: CalculateOptions,
) -> CalcResult<Calculate> {
    let defaults = options.float_options()?;
    let binding: SharedBinding = binding;
    let record = Rc::new(SharedRecord::default());

    let integers = Rc::new(ContextCore::new(
        ValueKind::Integer,
        Rc::clone(&binding),
        Rc::clone(&record),
    ));
    record.install_integers(&integers);

    let rationals = Rc::new(ContextCore::new(
        ValueKind::Rational,
        Rc::clone(&binding),
        Rc::clone(&record),
    ));
    record.install_rationals(&rationals);

    let floats = Rc::new(FloatState::new(binding, Rc::clone(&record), defaults));
    record.install_floats(&floats);

    tracing::debug!(
        precision_bits = defaults.precision_bits,
        rounding_mode = %defaults.rounding_mode,
        "numeric system initialized"
    );
    Ok(Calculate {
        integers: IntegerContext::new(integers),
        rationals: RationalContext::new(rationals),
        floats: FloatContext::new(floats),
    })
}

/// The façade over one numeric system: every factory plus the constants.
///
/// Dropping it drops the contexts, which releases whatever they still hold.
/// Values outlive it only as far as their own context does.
#[derive(Clone)]
pub struct Calculate {
    integers: IntegerContext,
    rationals: RationalContext,
    floats: FloatContext,
}

impl Calculate {
    pub fn integers(&self) -> &IntegerContext {
        &self.integers
    }

    pub fn rationals(&self) -> &RationalContext {
        &self.rationals
    }

    pub fn floats(&self) -> &FloatContext {
        &self.floats
    }

    pub fn integer<'a>(&self, input: impl Into<IntegerInput<'a>>) -> CalcResult<Integer> {
        self.integers.integer(input)
    }

    pub fn integer_radix(&self, text: &str, radix: u32) -> CalcResult<Integer> {
        self.integers.integer_radix(text, radix)
    }

    pub fn rational<'a>(&self, input: impl Into<RationalInput<'a>>) -> CalcResult<Rational> {
        self.rationals.rational(input)
    }

    pub fn ratio<'a>(
        &self,
        num: impl Into<RatioPart<'a>>,
        den: impl Into<RatioPart<'a>>,
    ) -> CalcResult<Rational> {
        self.rationals.ratio(num, den)
    }

    pub fn float<'a>(&self, input: impl Into<FloatInput<'a>>) -> CalcResult<Float> {
        self.floats.float(input)
    }

    pub fn float_with<'a>(
        &self,
        input: impl Into<FloatInput<'a>>,
        options: FloatOptions,
    ) -> CalcResult<Float> {
        self.floats.float_with(input, options)
    }

    /// Parse a literal into the kind it denotes: `a/b` is a rational,
    /// decimal points, exponents and NaN/infinity words make a float, and
    /// plain digits an integer.
    pub fn parse(&self, text: &str) -> CalcResult<NumericValue> {
        if text.contains('/') {
            self.rational(text).map(NumericValue::from)
        } else if literal::check_integer(text, 10).is_ok() {
            self.integer(text).map(NumericValue::from)
        } else {
            self.float(text).map(NumericValue::from)
        }
    }

    pub fn pi(&self, options: Option<FloatOptions>) -> CalcResult<Float> {
        self.floats.pi(options)
    }

    pub fn euler_constant(&self, options: Option<FloatOptions>) -> CalcResult<Float> {
        self.floats.euler_constant(options)
    }

    pub fn euler_number(&self, options: Option<FloatOptions>) -> CalcResult<Float> {
        self.floats.euler_number(options)
    }

    pub fn log2(&self, options: Option<FloatOptions>) -> CalcResult<Float> {
        self.floats.log2(options)
    }

    pub fn catalan(&self, options: Option<FloatOptions>) -> CalcResult<Float> {
        self.floats.catalan(options)
    }
}

impl fmt::Debug for Calculate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculate")
            .field("integers", &self.integers)
            .field("rationals", &self.rationals)
            .field("floats", &self.floats)
            .finish()
    }
}
