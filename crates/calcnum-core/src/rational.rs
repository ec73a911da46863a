//! Arbitrary-precision fractions, always held in lowest terms with a
//! positive denominator.

use crate::config::FloatOptions;
use crate::context::{ContextCore, take_cstr, with_cstr};
use crate::error::{CalcError, CalcResult};
use crate::float::Float;
use crate::integer::{self, Integer};
use crate::literal;
use crate::operand::{HostNumber, Operand};
use crate::pool::Handle;
use crate::value::ValueKind;
use calcnum_binding::{Binding, Ptr};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// What [`RationalContext::rational`] accepts.
#[derive(Debug, Clone, Copy)]
pub enum RationalInput<'a> {
    Number(HostNumber),
    /// `"n"` or `"n/d"` in decimal.
    Text(&'a str),
    Integer(&'a Integer),
    Rational(&'a Rational),
}

/// One side of [`RationalContext::ratio`].
#[derive(Debug, Clone, Copy)]
pub enum RatioPart<'a> {
    Number(HostNumber),
    Text(&'a str),
    Integer(&'a Integer),
}

macro_rules! text_and_host_inputs {
    ($target:ident: $($ty:ty),*) => {
        impl<'a> From<&'a str> for $target<'a> {
            fn from(text: &'a str) -> Self {
                $target::Text(text)
            }
        }

        impl<'a> From<&'a String> for $target<'a> {
            fn from(text: &'a String) -> Self {
                $target::Text(text)
            }
        }

        impl<'a> From<&'a Integer> for $target<'a> {
            fn from(value: &'a Integer) -> Self {
                $target::Integer(value)
            }
        }

        impl From<HostNumber> for $target<'_> {
            fn from(number: HostNumber) -> Self {
                $target::Number(number)
            }
        }

        $(
            impl From<$ty> for $target<'_> {
                fn from(value: $ty) -> Self {
                    $target::Number(value.into())
                }
            }
        )*
    };
}

text_and_host_inputs!(RationalInput: i32, i64, u32, f64);
text_and_host_inputs!(RatioPart: i32, i64, u32, f64);

impl<'a> From<&'a Rational> for RationalInput<'a> {
    fn from(value: &'a Rational) -> Self {
        RationalInput::Rational(value)
    }
}

impl RatioPart<'_> {
    fn to_literal(self) -> CalcResult<String> {
        match self {
            RatioPart::Number(number) => number.to_integer_literal(),
            RatioPart::Text(text) => Ok(text.to_string()),
            RatioPart::Integer(value) => value.to_str_radix(10),
        }
    }
}

/// A ratio side ready to be written into an embedded `mpz`.
enum Component {
    Small(i32),
    Native(Ptr),
}

impl Component {
    fn resolve(part: RatioPart<'_>, core: &ContextCore) -> CalcResult<Self> {
        match part {
            RatioPart::Number(number) => number.to_i32().map(Component::Small),
            RatioPart::Integer(value) => {
                core.check_binding(value.core())?;
                value.ptr().map(Component::Native)
            }
            RatioPart::Text(_) => Err(CalcError::invalid("text ratio sides are parsed as a whole")),
        }
    }

    fn write(&self, binding: &mut dyn Binding, rop: Ptr) {
        match *self {
            Component::Small(value) => binding.mpz_set_si(rop, value),
            Component::Native(op) => binding.mpz_set(rop, op),
        }
    }
}

/// Factory for rationals sharing one handle pool.
#[derive(Clone)]
pub struct RationalContext {
    core: Rc<ContextCore>,
}

impl RationalContext {
    pub(crate) fn new(core: Rc<ContextCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Rc<ContextCore> {
        &self.core
    }

    pub fn rational<'a>(&self, input: impl Into<RationalInput<'a>>) -> CalcResult<Rational> {
        build(&self.core, input.into())
    }

    /// `num / den`. Text on either side joins both sides into one
    /// `"num/den"` literal; otherwise each side must be an integer.
    pub fn ratio<'a>(
        &self,
        num: impl Into<RatioPart<'a>>,
        den: impl Into<RatioPart<'a>>,
    ) -> CalcResult<Rational> {
        from_parts(&self.core, num.into(), den.into())
    }

    pub fn live_values(&self) -> usize {
        self.core.live()
    }

    /// Release every rational this context created. See
    /// [`IntegerContext::destroy`](crate::IntegerContext::destroy).
    pub fn destroy(&self) -> usize {
        self.core.destroy()
    }
}

impl fmt::Debug for RationalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RationalContext")
            .field("live", &self.core.live())
            .finish()
    }
}

pub(crate) fn build(core: &Rc<ContextCore>, input: RationalInput<'_>) -> CalcResult<Rational> {
    match input {
        RationalInput::Number(number) => {
            let value = number.to_i32()?;
            produce(core, |b, rop| {
                b.mpq_set_si(rop, value, 1);
                Ok(())
            })
        }
        RationalInput::Text(text) => from_text(core, text),
        RationalInput::Integer(source) => {
            core.check_binding(source.core())?;
            let op = source.ptr()?;
            produce(core, |b, rop| {
                b.mpq_set_z(rop, op);
                Ok(())
            })
        }
        RationalInput::Rational(source) => {
            core.check_binding(&source.core)?;
            let op = source.ptr()?;
            produce(core, |b, rop| {
                b.mpq_set(rop, op);
                Ok(())
            })
        }
    }
}

fn from_text(core: &Rc<ContextCore>, text: &str) -> CalcResult<Rational> {
    literal::check_rational(text, 10)?;
    produce(core, |b, rop| {
        if with_cstr(b, text, |b, s| b.mpq_set_str(rop, s, 10))? != 0 {
            return Err(CalcError::invalid(format!("`{text}` is not a rational")));
        }
        Ok(())
    })
}

fn from_parts(
    core: &Rc<ContextCore>,
    num: RatioPart<'_>,
    den: RatioPart<'_>,
) -> CalcResult<Rational> {
    if matches!(num, RatioPart::Text(_)) || matches!(den, RatioPart::Text(_)) {
        let text = format!("{}/{}", num.to_literal()?, den.to_literal()?);
        return from_text(core, &text);
    }
    if let RatioPart::Number(number) = den {
        if number.is_zero() {
            return Err(CalcError::DivisionByZero);
        }
    }
    let num = Component::resolve(num, core)?;
    let den = Component::resolve(den, core)?;
    produce(core, |b, rop| {
        let (n, d) = (b.mpq_numref(rop), b.mpq_denref(rop));
        num.write(b, n);
        den.write(b, d);
        Ok(())
    })
}

/// Register a rational after `fill` sets it. The value is rejected when
/// its denominator is zero and canonicalized otherwise.
pub(crate) fn produce(
    core: &Rc<ContextCore>,
    fill: impl FnOnce(&mut dyn Binding, Ptr) -> CalcResult<()>,
) -> CalcResult<Rational> {
    let handle = core.produce(|b, rop| {
        fill(b, rop)?;
        if b.mpz_sgn(b.mpq_denref(rop)) == 0 {
            return Err(CalcError::DivisionByZero);
        }
        b.mpq_canonicalize(rop);
        Ok(())
    })?;
    Ok(Rational {
        core: Rc::clone(core),
        handle,
    })
}

/// An immutable fraction. Every operation returns a new value.
#[derive(Clone)]
pub struct Rational {
    core: Rc<ContextCore>,
    handle: Handle,
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rational").field("handle", &self.handle).finish()
    }
}

impl Rational {
    pub(crate) fn core(&self) -> &Rc<ContextCore> {
        &self.core
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub(crate) fn ptr(&self) -> CalcResult<Ptr> {
        self.core.resolve(self.handle)
    }

    /// Address of the native `mpq` structure.
    pub fn raw(&self) -> CalcResult<Ptr> {
        self.ptr()
    }

    /// `value` in the rational context installed next to its integer
    /// context.
    pub(crate) fn from_integer(value: &Integer) -> CalcResult<Rational> {
        let core = value.core().record().rationals()?;
        build(&core, RationalInput::Integer(value))
    }

    fn normalize<'a>(&self, operand: Operand<'a, Rational>) -> CalcResult<Cow<'a, Rational>> {
        match operand {
            Operand::Value(value) => {
                self.core.check_binding(&value.core)?;
                Ok(Cow::Borrowed(value))
            }
            Operand::Number(number) => {
                tracing::trace!(?number, "promoting host number to rational");
                build(&self.core, RationalInput::Number(number)).map(Cow::Owned)
            }
        }
    }

    fn binary<'a>(
        &self,
        rhs: impl Into<Operand<'a, Rational>>,
        op: impl FnOnce(&mut dyn Binding, Ptr, Ptr, Ptr),
    ) -> CalcResult<Rational> {
        let a = self.ptr()?;
        self.core.atomically(|| {
            let rhs = self.normalize(rhs.into())?;
            let b = rhs.ptr()?;
            produce(&self.core, |binding, rop| {
                op(binding, rop, a, b);
                Ok(())
            })
        })
    }

    fn unary(&self, op: impl FnOnce(&mut dyn Binding, Ptr, Ptr)) -> CalcResult<Rational> {
        let a = self.ptr()?;
        produce(&self.core, |binding, rop| {
            op(binding, rop, a);
            Ok(())
        })
    }

    pub fn add<'a>(&self, rhs: impl Into<Operand<'a, Rational>>) -> CalcResult<Rational> {
        self.binary(rhs, |b, r, x, y| b.mpq_add(r, x, y))
    }

    pub fn sub<'a>(&self, rhs: impl Into<Operand<'a, Rational>>) -> CalcResult<Rational> {
        self.binary(rhs, |b, r, x, y| b.mpq_sub(r, x, y))
    }

    pub fn mul<'a>(&self, rhs: impl Into<Operand<'a, Rational>>) -> CalcResult<Rational> {
        self.binary(rhs, |b, r, x, y| b.mpq_mul(r, x, y))
    }

    pub fn div<'a>(&self, rhs: impl Into<Operand<'a, Rational>>) -> CalcResult<Rational> {
        let a = self.ptr()?;
        let rhs = rhs.into();
        if rhs.is_zero_number() {
            return Err(CalcError::DivisionByZero);
        }
        self.core.atomically(|| {
            let rhs = self.normalize(rhs)?;
            let b = rhs.ptr()?;
            if self.core.binding().mpq_sgn(b) == 0 {
                return Err(CalcError::DivisionByZero);
            }
            produce(&self.core, |binding, rop| {
                binding.mpq_div(rop, a, b);
                Ok(())
            })
        })
    }

    pub fn neg(&self) -> CalcResult<Rational> {
        self.unary(|b, r, x| b.mpq_neg(r, x))
    }

    /// `1 / self`.
    pub fn invert(&self) -> CalcResult<Rational> {
        if self.sign()? == 0 {
            return Err(CalcError::DivisionByZero);
        }
        self.unary(|b, r, x| b.mpq_inv(r, x))
    }

    pub fn abs(&self) -> CalcResult<Rational> {
        self.unary(|b, r, x| b.mpq_abs(r, x))
    }

    pub fn cmp<'a>(&self, rhs: impl Into<Operand<'a, Rational>>) -> CalcResult<Ordering> {
        let a = self.ptr()?;
        let rhs = self.normalize(rhs.into())?;
        let b = rhs.ptr()?;
        Ok(self.core.binding().mpq_cmp(a, b).cmp(&0))
    }

    pub fn is_equal<'a>(&self, rhs: impl Into<Operand<'a, Rational>>) -> CalcResult<bool> {
        let a = self.ptr()?;
        let rhs = self.normalize(rhs.into())?;
        let b = rhs.ptr()?;
        Ok(self.core.binding().mpq_equal(a, b) != 0)
    }

    pub fn less_than<'a>(&self, rhs: impl Into<Operand<'a, Rational>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)?.is_lt())
    }

    pub fn less_or_equal<'a>(&self, rhs: impl Into<Operand<'a, Rational>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)?.is_le())
    }

    pub fn greater_than<'a>(&self, rhs: impl Into<Operand<'a, Rational>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)?.is_gt())
    }

    pub fn greater_or_equal<'a>(&self, rhs: impl Into<Operand<'a, Rational>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)?.is_ge())
    }

    pub fn sign(&self) -> CalcResult<i32> {
        let a = self.ptr()?;
        Ok(self.core.binding().mpq_sgn(a).signum())
    }

    /// Lossy `f64` approximation.
    pub fn to_number(&self) -> CalcResult<f64> {
        let a = self.ptr()?;
        Ok(self.core.binding().mpq_get_d(a))
    }

    /// `"n"` or `"n/d"` in `radix`.
    pub fn to_str_radix(&self, radix: u32) -> CalcResult<String> {
        literal::check_radix(radix)?;
        let a = self.ptr()?;
        let mut binding = self.core.binding_mut();
        let s = binding.mpq_get_str(radix, a).map_err(CalcError::allocation)?;
        take_cstr(&mut *binding, s)
    }

    pub fn numerator(&self) -> CalcResult<Integer> {
        self.component(|b, q| b.mpq_numref(q))
    }

    /// Always positive.
    pub fn denominator(&self) -> CalcResult<Integer> {
        self.component(|b, q| b.mpq_denref(q))
    }

    fn component(&self, field: impl FnOnce(&dyn Binding, Ptr) -> Ptr) -> CalcResult<Integer> {
        let integers = self.core.record().integers()?;
        let q = self.ptr()?;
        integer::produce(&integers, |b, rop| {
            let op = field(&*b, q);
            b.mpz_set(rop, op);
            Ok(())
        })
    }

    pub fn to_float(&self) -> CalcResult<Float> {
        Float::from_rational(self, None)
    }

    pub fn to_float_with(&self, options: FloatOptions) -> CalcResult<Float> {
        Float::from_rational(self, Some(options))
    }

    pub fn kind(&self) -> ValueKind {
        ValueKind::Rational
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_str_radix(10) {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str("<released>"),
        }
    }
}
