//! Arbitrary-precision binary floats.
//!
//! Every float carries the [`FloatOptions`] it was created with. Results
//! of an operation take the receiver's options; host-number operands are
//! promoted at the receiver's precision.

use crate::config::{FloatOptions, RoundingMode};
use crate::context::{ContextCore, SharedBinding, take_cstr, with_cstr};
use crate::error::{CalcError, CalcResult};
use crate::integer::{self, Integer};
use crate::literal;
use crate::operand::{HostNumber, Operand};
use crate::pool::Handle;
use crate::rational::{self, Rational};
use crate::registry::SharedRecord;
use crate::value::ValueKind;
use calcnum_binding::{Binding, Ptr, Rnd, read_i32};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// What [`FloatContext::float`] accepts.
#[derive(Debug, Clone, Copy)]
pub enum FloatInput<'a> {
    Number(HostNumber),
    /// Decimal text, `NaN` or `Infinity`.
    Text(&'a str),
    Integer(&'a Integer),
    Rational(&'a Rational),
    /// Re-rounded to the requested options.
    Float(&'a Float),
}

impl<'a> From<&'a str> for FloatInput<'a> {
    fn from(text: &'a str) -> Self {
        FloatInput::Text(text)
    }
}

impl<'a> From<&'a String> for FloatInput<'a> {
    fn from(text: &'a String) -> Self {
        FloatInput::Text(text)
    }
}

impl<'a> From<&'a Integer> for FloatInput<'a> {
    fn from(value: &'a Integer) -> Self {
        FloatInput::Integer(value)
    }
}

impl<'a> From<&'a Rational> for FloatInput<'a> {
    fn from(value: &'a Rational) -> Self {
        FloatInput::Rational(value)
    }
}

impl<'a> From<&'a Float> for FloatInput<'a> {
    fn from(value: &'a Float) -> Self {
        FloatInput::Float(value)
    }
}

impl From<HostNumber> for FloatInput<'_> {
    fn from(number: HostNumber) -> Self {
        FloatInput::Number(number)
    }
}

macro_rules! host_input {
    ($($ty:ty),*) => {$(
        impl From<$ty> for FloatInput<'_> {
            fn from(value: $ty) -> Self {
                FloatInput::Number(value.into())
            }
        }
    )*};
}

host_input!(i32, i64, u32, f64);

/// Digits `prec` bits guarantee in `radix`, at least one.
fn guaranteed_digits(prec: u32, radix: u32) -> usize {
    let ratio = std::f64::consts::LN_2 / f64::from(radix).ln();
    ((f64::from(prec) * ratio).floor() as usize).max(1)
}

/// Digits needed to render `prec` bits in `radix` without loss.
fn round_trip_digits(prec: u32, radix: u32) -> usize {
    let ratio = std::f64::consts::LN_2 / f64::from(radix).ln();
    1 + (f64::from(prec) * ratio).ceil() as usize
}

/// Lay out `0.DIGITS × radix^exp` for display.
///
/// Trailing zeros are dropped. Exponents within `budget` digits of the
/// radix point are written positionally, anything else as `d.ddd`
/// followed by `e<n>` (radix up to 10) or `@<n>`.
pub fn layout_digits(digits: &str, exp: i64, radix: u32, budget: usize) -> String {
    let (sign, body) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let body = body.trim_end_matches('0');
    if body.is_empty() {
        return "0".to_string();
    }
    let budget = budget as i64;
    if exp > 0 && exp <= budget {
        let point = exp as usize;
        if body.len() <= point {
            format!("{sign}{body}{}", "0".repeat(point - body.len()))
        } else {
            format!("{sign}{}.{}", &body[..point], &body[point..])
        }
    } else if exp <= 0 && exp > -budget {
        format!("{sign}0.{}{body}", "0".repeat(exp.unsigned_abs() as usize))
    } else {
        let marker = if radix <= 10 { 'e' } else { '@' };
        let (head, tail) = body.split_at(1);
        if tail.is_empty() {
            format!("{sign}{head}{marker}{}", exp - 1)
        } else {
            format!("{sign}{head}.{tail}{marker}{}", exp - 1)
        }
    }
}

pub(crate) struct FloatState {
    core: ContextCore,
    defaults: FloatOptions,
}

impl FloatState {
    pub fn new(binding: SharedBinding, record: Rc<SharedRecord>, defaults: FloatOptions) -> Self {
        Self {
            core: ContextCore::new(ValueKind::Float, binding, record),
            defaults,
        }
    }
}

/// Factory for floats sharing one handle pool and default options.
#[derive(Clone)]
pub struct FloatContext {
    state: Rc<FloatState>,
}

impl FloatContext {
    pub(crate) fn new(state: Rc<FloatState>) -> Self {
        Self { state }
    }

    /// Options applied when none are given.
    pub fn defaults(&self) -> FloatOptions {
        self.state.defaults
    }

    pub fn float<'a>(&self, input: impl Into<FloatInput<'a>>) -> CalcResult<Float> {
        build(&self.state, input.into(), self.state.defaults)
    }

    pub fn float_with<'a>(
        &self,
        input: impl Into<FloatInput<'a>>,
        options: FloatOptions,
    ) -> CalcResult<Float> {
        build(&self.state, input.into(), options)
    }

    fn constant(
        &self,
        options: Option<FloatOptions>,
        fill: impl FnOnce(&mut dyn Binding, Ptr, Rnd),
    ) -> CalcResult<Float> {
        let options = options.unwrap_or(self.state.defaults);
        options.validate()?;
        produce(&self.state, options, |b, rop| {
            fill(b, rop, options.rnd());
            Ok(())
        })
    }

    /// π.
    pub fn pi(&self, options: Option<FloatOptions>) -> CalcResult<Float> {
        self.constant(options, |b, r, rnd| {
            b.mpfr_const_pi(r, rnd);
        })
    }

    /// The Euler–Mascheroni constant γ.
    pub fn euler_constant(&self, options: Option<FloatOptions>) -> CalcResult<Float> {
        self.constant(options, |b, r, rnd| {
            b.mpfr_const_euler(r, rnd);
        })
    }

    /// e, computed as `exp(1)`.
    pub fn euler_number(&self, options: Option<FloatOptions>) -> CalcResult<Float> {
        self.constant(options, |b, r, rnd| {
            b.mpfr_set_si(r, 1, rnd);
            b.mpfr_exp(r, r, rnd);
        })
    }

    /// ln 2.
    pub fn log2(&self, options: Option<FloatOptions>) -> CalcResult<Float> {
        self.constant(options, |b, r, rnd| {
            b.mpfr_const_log2(r, rnd);
        })
    }

    /// Catalan's constant.
    pub fn catalan(&self, options: Option<FloatOptions>) -> CalcResult<Float> {
        self.constant(options, |b, r, rnd| {
            b.mpfr_const_catalan(r, rnd);
        })
    }

    pub fn live_values(&self) -> usize {
        self.state.core.live()
    }

    /// Release every float this context created. See
    /// [`IntegerContext::destroy`](crate::IntegerContext::destroy).
    pub fn destroy(&self) -> usize {
        self.state.core.destroy()
    }
}

impl fmt::Debug for FloatContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FloatContext")
            .field("defaults", &self.state.defaults)
            .field("live", &self.state.core.live())
            .finish()
    }
}

pub(crate) fn build(
    state: &Rc<FloatState>,
    input: FloatInput<'_>,
    options: FloatOptions,
) -> CalcResult<Float> {
    options.validate()?;
    let rnd = options.rnd();
    match input {
        FloatInput::Number(HostNumber::Int(value)) => match i32::try_from(value) {
            Ok(small) => produce(state, options, |b, rop| {
                b.mpfr_set_si(rop, small, rnd);
                Ok(())
            }),
            Err(_) => from_text(state, &value.to_string(), options),
        },
        FloatInput::Number(HostNumber::Float(value)) => produce(state, options, |b, rop| {
            b.mpfr_set_d(rop, value, rnd);
            Ok(())
        }),
        FloatInput::Text(text) => from_text(state, text, options),
        FloatInput::Integer(source) => {
            state.core.check_binding(source.core())?;
            let op = source.ptr()?;
            produce(state, options, |b, rop| {
                b.mpfr_set_z(rop, op, rnd);
                Ok(())
            })
        }
        FloatInput::Rational(source) => {
            state.core.check_binding(source.core())?;
            let op = source.ptr()?;
            produce(state, options, |b, rop| {
                b.mpfr_set_q(rop, op, rnd);
                Ok(())
            })
        }
        FloatInput::Float(source) => {
            state.core.check_binding(&source.state.core)?;
            let op = source.ptr()?;
            produce(state, options, |b, rop| {
                b.mpfr_set(rop, op, rnd);
                Ok(())
            })
        }
    }
}

fn from_text(state: &Rc<FloatState>, text: &str, options: FloatOptions) -> CalcResult<Float> {
    literal::check_float(text)?;
    produce(state, options, |b, rop| {
        if with_cstr(b, text, |b, s| b.mpfr_set_str(rop, s, 10, options.rnd()))? != 0 {
            return Err(CalcError::invalid(format!("`{text}` is not a float literal")));
        }
        Ok(())
    })
}

fn produce(
    state: &Rc<FloatState>,
    options: FloatOptions,
    fill: impl FnOnce(&mut dyn Binding, Ptr) -> CalcResult<()>,
) -> CalcResult<Float> {
    let handle = state.core.produce_float(options.precision_bits, fill)?;
    Ok(Float {
        state: Rc::clone(state),
        handle,
        options,
    })
}

/// An immutable float with its own precision and rounding mode.
#[derive(Clone)]
pub struct Float {
    state: Rc<FloatState>,
    handle: Handle,
    options: FloatOptions,
}

impl fmt::Debug for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Float")
            .field("handle", &self.handle)
            .field("options", &self.options)
            .finish()
    }
}

impl Float {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    fn ptr(&self) -> CalcResult<Ptr> {
        self.state.core.resolve(self.handle)
    }

    /// Address of the native `mpfr` structure.
    pub fn raw(&self) -> CalcResult<Ptr> {
        self.ptr()
    }

    pub fn options(&self) -> FloatOptions {
        self.options
    }

    pub fn precision_bits(&self) -> u32 {
        self.options.precision_bits
    }

    pub fn rounding_mode(&self) -> RoundingMode {
        self.options.rounding_mode
    }

    fn core(&self) -> &ContextCore {
        &self.state.core
    }

    pub(crate) fn from_integer(
        value: &Integer,
        options: Option<FloatOptions>,
    ) -> CalcResult<Float> {
        let state = value.core().record().floats()?;
        let options = options.unwrap_or(state.defaults);
        build(&state, FloatInput::Integer(value), options)
    }

    pub(crate) fn from_rational(
        value: &Rational,
        options: Option<FloatOptions>,
    ) -> CalcResult<Float> {
        let state = value.core().record().floats()?;
        let options = options.unwrap_or(state.defaults);
        build(&state, FloatInput::Rational(value), options)
    }

    fn normalize<'a>(&self, operand: Operand<'a, Float>) -> CalcResult<Cow<'a, Float>> {
        match operand {
            Operand::Value(value) => {
                self.core().check_binding(value.core())?;
                Ok(Cow::Borrowed(value))
            }
            Operand::Number(number) => {
                tracing::trace!(?number, "promoting host number to float");
                build(&self.state, FloatInput::Number(number), self.options).map(Cow::Owned)
            }
        }
    }

    fn binary<'a>(
        &self,
        rhs: impl Into<Operand<'a, Float>>,
        op: impl FnOnce(&mut dyn Binding, Ptr, Ptr, Ptr, Rnd),
    ) -> CalcResult<Float> {
        let a = self.ptr()?;
        let rnd = self.options.rnd();
        self.core().atomically(|| {
            let rhs = self.normalize(rhs.into())?;
            let b = rhs.ptr()?;
            produce(&self.state, self.options, |binding, rop| {
                op(binding, rop, a, b, rnd);
                Ok(())
            })
        })
    }

    fn unary(&self, op: impl FnOnce(&mut dyn Binding, Ptr, Ptr, Rnd)) -> CalcResult<Float> {
        let a = self.ptr()?;
        let rnd = self.options.rnd();
        produce(&self.state, self.options, |binding, rop| {
            op(binding, rop, a, rnd);
            Ok(())
        })
    }

    pub fn add<'a>(&self, rhs: impl Into<Operand<'a, Float>>) -> CalcResult<Float> {
        self.binary(rhs, |b, r, x, y, rnd| {
            b.mpfr_add(r, x, y, rnd);
        })
    }

    pub fn sub<'a>(&self, rhs: impl Into<Operand<'a, Float>>) -> CalcResult<Float> {
        self.binary(rhs, |b, r, x, y, rnd| {
            b.mpfr_sub(r, x, y, rnd);
        })
    }

    pub fn mul<'a>(&self, rhs: impl Into<Operand<'a, Float>>) -> CalcResult<Float> {
        self.binary(rhs, |b, r, x, y, rnd| {
            b.mpfr_mul(r, x, y, rnd);
        })
    }

    /// Fails with [`CalcError::DivisionByZero`] instead of producing an
    /// infinity or NaN.
    pub fn div<'a>(&self, rhs: impl Into<Operand<'a, Float>>) -> CalcResult<Float> {
        let a = self.ptr()?;
        let rhs = rhs.into();
        if rhs.is_zero_number() {
            return Err(CalcError::DivisionByZero);
        }
        let rnd = self.options.rnd();
        self.core().atomically(|| {
            let rhs = self.normalize(rhs)?;
            let b = rhs.ptr()?;
            if self.core().binding().mpfr_zero_p(b) != 0 {
                return Err(CalcError::DivisionByZero);
            }
            produce(&self.state, self.options, |binding, rop| {
                binding.mpfr_div(rop, a, b, rnd);
                Ok(())
            })
        })
    }

    pub fn neg(&self) -> CalcResult<Float> {
        self.unary(|b, r, x, rnd| {
            b.mpfr_neg(r, x, rnd);
        })
    }

    pub fn abs(&self) -> CalcResult<Float> {
        self.unary(|b, r, x, rnd| {
            b.mpfr_abs(r, x, rnd);
        })
    }

    /// The next representable value toward +∞ at this precision.
    pub fn next_above(&self) -> CalcResult<Float> {
        self.unary(|b, r, x, rnd| {
            b.mpfr_set(r, x, rnd);
            b.mpfr_nextabove(r);
        })
    }

    /// The next representable value toward −∞ at this precision.
    pub fn next_below(&self) -> CalcResult<Float> {
        self.unary(|b, r, x, rnd| {
            b.mpfr_set(r, x, rnd);
            b.mpfr_nextbelow(r);
        })
    }

    /// `None` when either side is NaN.
    pub fn cmp<'a>(&self, rhs: impl Into<Operand<'a, Float>>) -> CalcResult<Option<Ordering>> {
        let a = self.ptr()?;
        let rhs = self.normalize(rhs.into())?;
        let b = rhs.ptr()?;
        let binding = self.core().binding();
        if binding.mpfr_nan_p(a) != 0 || binding.mpfr_nan_p(b) != 0 {
            return Ok(None);
        }
        Ok(Some(binding.mpfr_cmp(a, b).cmp(&0)))
    }

    pub fn is_equal<'a>(&self, rhs: impl Into<Operand<'a, Float>>) -> CalcResult<bool> {
        let a = self.ptr()?;
        let rhs = self.normalize(rhs.into())?;
        let b = rhs.ptr()?;
        Ok(self.core().binding().mpfr_equal_p(a, b) != 0)
    }

    pub fn less_than<'a>(&self, rhs: impl Into<Operand<'a, Float>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)? == Some(Ordering::Less))
    }

    pub fn less_or_equal<'a>(&self, rhs: impl Into<Operand<'a, Float>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)?.is_some_and(Ordering::is_le))
    }

    pub fn greater_than<'a>(&self, rhs: impl Into<Operand<'a, Float>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)? == Some(Ordering::Greater))
    }

    pub fn greater_or_equal<'a>(&self, rhs: impl Into<Operand<'a, Float>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)?.is_some_and(Ordering::is_ge))
    }

    /// `-1`, `0` or `1`; NaN reports `0`.
    pub fn sign(&self) -> CalcResult<i32> {
        let a = self.ptr()?;
        Ok(self.core().binding().mpfr_sgn(a).signum())
    }

    pub fn is_nan(&self) -> CalcResult<bool> {
        let a = self.ptr()?;
        Ok(self.core().binding().mpfr_nan_p(a) != 0)
    }

    pub fn is_infinite(&self) -> CalcResult<bool> {
        let a = self.ptr()?;
        Ok(self.core().binding().mpfr_inf_p(a) != 0)
    }

    pub fn is_zero(&self) -> CalcResult<bool> {
        let a = self.ptr()?;
        Ok(self.core().binding().mpfr_zero_p(a) != 0)
    }

    /// Nearest `f64` in this value's rounding mode.
    pub fn to_number(&self) -> CalcResult<f64> {
        let a = self.ptr()?;
        Ok(self.core().binding().mpfr_get_d(a, self.options.rnd()))
    }

    pub fn to_str_radix(&self, radix: u32) -> CalcResult<String> {
        self.to_string_with(radix, false)
    }

    /// Render in `radix`. With `truncate`, only the digits the precision
    /// guarantees are produced.
    pub fn to_string_with(&self, radix: u32, truncate: bool) -> CalcResult<String> {
        literal::check_radix(radix)?;
        let x = self.ptr()?;
        let mut binding = self.core().binding_mut();
        if binding.mpfr_nan_p(x) != 0 {
            return Ok("NaN".to_string());
        }
        if binding.mpfr_inf_p(x) != 0 {
            let text = if binding.mpfr_sgn(x) < 0 { "-Infinity" } else { "Infinity" };
            return Ok(text.to_string());
        }
        if binding.mpfr_zero_p(x) != 0 {
            return Ok("0".to_string());
        }

        let prec = self.options.precision_bits;
        let (n_digits, budget) = if truncate {
            let n = guaranteed_digits(prec, radix);
            (n, n)
        } else {
            (0, round_trip_digits(prec, radix))
        };
        let exp_ptr = binding.malloc(4).map_err(CalcError::allocation)?;
        let digits = binding
            .mpfr_get_str(exp_ptr, radix, n_digits, x, self.options.rnd())
            .map_err(CalcError::allocation)
            .and_then(|s| take_cstr(&mut *binding, s));
        let exp = read_i32(&*binding, exp_ptr).map_err(CalcError::Native);
        binding.free(exp_ptr);
        Ok(layout_digits(&digits?, i64::from(exp?), radix, budget))
    }

    /// Round to an integer in this value's rounding mode.
    pub fn to_integer(&self) -> CalcResult<Integer> {
        let integers = self.core().record().integers()?;
        let x = self.ptr()?;
        self.require_finite(x)?;
        let rnd = self.options.rnd();
        integer::produce(&integers, |b, rop| {
            b.mpfr_get_z(rop, x, rnd);
            Ok(())
        })
    }

    /// The exact value as a fraction.
    pub fn to_rational(&self) -> CalcResult<Rational> {
        let rationals = self.core().record().rationals()?;
        let x = self.ptr()?;
        self.require_finite(x)?;
        rational::produce(&rationals, |b, rop| {
            b.mpfr_get_q(rop, x);
            Ok(())
        })
    }

    fn require_finite(&self, x: Ptr) -> CalcResult<()> {
        let binding = self.core().binding();
        if binding.mpfr_nan_p(x) != 0 || binding.mpfr_inf_p(x) != 0 {
            return Err(CalcError::invalid("non-finite float has no exact value"));
        }
        Ok(())
    }

    pub fn kind(&self) -> ValueKind {
        ValueKind::Float
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_str_radix(10) {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str("<released>"),
        }
    }
}
