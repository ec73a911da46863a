//! Arbitrary-precision integers.

use crate::config::FloatOptions;
use crate::context::{ContextCore, take_cstr, with_cstr};
use crate::error::{CalcError, CalcResult};
use crate::float::Float;
use crate::literal;
use crate::operand::{HostNumber, Operand};
use crate::pool::Handle;
use crate::rational::Rational;
use crate::value::ValueKind;
use calcnum_binding::{Binding, Ptr};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Rounding applied to the quotient of an integer division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DivMode {
    /// Toward zero.
    #[default]
    Truncate,
    /// Toward negative infinity.
    Floor,
    /// Toward positive infinity.
    Ceil,
}

/// What [`IntegerContext::integer`] accepts.
#[derive(Debug, Clone, Copy)]
pub enum IntegerInput<'a> {
    Number(HostNumber),
    /// Decimal text.
    Text(&'a str),
    Integer(&'a Integer),
}

impl<'a> From<&'a str> for IntegerInput<'a> {
    fn from(text: &'a str) -> Self {
        IntegerInput::Text(text)
    }
}

impl<'a> From<&'a String> for IntegerInput<'a> {
    fn from(text: &'a String) -> Self {
        IntegerInput::Text(text)
    }
}

impl<'a> From<&'a Integer> for IntegerInput<'a> {
    fn from(value: &'a Integer) -> Self {
        IntegerInput::Integer(value)
    }
}

impl From<HostNumber> for IntegerInput<'_> {
    fn from(number: HostNumber) -> Self {
        IntegerInput::Number(number)
    }
}

macro_rules! host_input {
    ($($ty:ty),*) => {$(
        impl From<$ty> for IntegerInput<'_> {
            fn from(value: $ty) -> Self {
                IntegerInput::Number(value.into())
            }
        }
    )*};
}

host_input!(i32, i64, u32, f64);

/// Factory for integers sharing one handle pool.
#[derive(Clone)]
pub struct IntegerContext {
    core: Rc<ContextCore>,
}

impl IntegerContext {
    pub(crate) fn new(core: Rc<ContextCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Rc<ContextCore> {
        &self.core
    }

    /// Host numbers must be integral and fit in 32 bits; larger values go
    /// through text.
    pub fn integer<'a>(&self, input: impl Into<IntegerInput<'a>>) -> CalcResult<Integer> {
        build(&self.core, input.into())
    }

    /// Parse `text` in `radix` (2 to 36).
    pub fn integer_radix(&self, text: &str, radix: u32) -> CalcResult<Integer> {
        from_text(&self.core, text, radix)
    }

    /// Values registered since the last [`destroy`](Self::destroy).
    pub fn live_values(&self) -> usize {
        self.core.live()
    }

    /// Release every integer this context created, temporaries included.
    /// Outstanding values fail with [`CalcError::UseAfterRelease`]
    /// afterwards; the context itself stays usable.
    pub fn destroy(&self) -> usize {
        self.core.destroy()
    }
}

impl fmt::Debug for IntegerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegerContext")
            .field("live", &self.core.live())
            .finish()
    }
}

pub(crate) fn build(core: &Rc<ContextCore>, input: IntegerInput<'_>) -> CalcResult<Integer> {
    match input {
        IntegerInput::Number(number) => {
            let value = number.to_i32()?;
            produce(core, |b, rop| {
                b.mpz_set_si(rop, value);
                Ok(())
            })
        }
        IntegerInput::Text(text) => from_text(core, text, 10),
        IntegerInput::Integer(source) => {
            core.check_binding(&source.core)?;
            let op = source.ptr()?;
            produce(core, |b, rop| {
                b.mpz_set(rop, op);
                Ok(())
            })
        }
    }
}

fn from_text(core: &Rc<ContextCore>, text: &str, radix: u32) -> CalcResult<Integer> {
    literal::check_integer(text, radix)?;
    produce(core, |b, rop| {
        if with_cstr(b, text, |b, s| b.mpz_set_str(rop, s, radix))? != 0 {
            return Err(CalcError::invalid(format!("`{text}` is not a base-{radix} integer")));
        }
        Ok(())
    })
}

pub(crate) fn produce(
    core: &Rc<ContextCore>,
    fill: impl FnOnce(&mut dyn Binding, Ptr) -> CalcResult<()>,
) -> CalcResult<Integer> {
    let handle = core.produce(fill)?;
    Ok(Integer {
        core: Rc::clone(core),
        handle,
    })
}

/// An immutable integer. Every operation returns a new value.
#[derive(Clone)]
pub struct Integer {
    core: Rc<ContextCore>,
    handle: Handle,
}

impl fmt::Debug for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Integer").field("handle", &self.handle).finish()
    }
}

impl Integer {
    pub(crate) fn core(&self) -> &Rc<ContextCore> {
        &self.core
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub(crate) fn ptr(&self) -> CalcResult<Ptr> {
        self.core.resolve(self.handle)
    }

    /// Address of the native `mpz` structure.
    pub fn raw(&self) -> CalcResult<Ptr> {
        self.ptr()
    }

    fn normalize<'a>(&self, operand: Operand<'a, Integer>) -> CalcResult<Cow<'a, Integer>> {
        match operand {
            Operand::Value(value) => {
                self.core.check_binding(&value.core)?;
                Ok(Cow::Borrowed(value))
            }
            Operand::Number(number) => {
                tracing::trace!(?number, "promoting host number to integer");
                build(&self.core, IntegerInput::Number(number)).map(Cow::Owned)
            }
        }
    }

    fn binary<'a>(
        &self,
        rhs: impl Into<Operand<'a, Integer>>,
        op: impl FnOnce(&mut dyn Binding, Ptr, Ptr, Ptr),
    ) -> CalcResult<Integer> {
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

    fn unary(&self, op: impl FnOnce(&mut dyn Binding, Ptr, Ptr)) -> CalcResult<Integer> {
        let a = self.ptr()?;
        produce(&self.core, |binding, rop| {
            op(binding, rop, a);
            Ok(())
        })
    }

    /// Binary operation whose right-hand side must be non-zero.
    fn divide<'a>(
        &self,
        rhs: impl Into<Operand<'a, Integer>>,
        op: impl FnOnce(&mut dyn Binding, Ptr, Ptr, Ptr),
    ) -> CalcResult<Integer> {
        let a = self.ptr()?;
        let rhs = rhs.into();
        if rhs.is_zero_number() {
            return Err(CalcError::DivisionByZero);
        }
        self.core.atomically(|| {
            let rhs = self.normalize(rhs)?;
            let b = rhs.ptr()?;
            if self.core.binding().mpz_sgn(b) == 0 {
                return Err(CalcError::DivisionByZero);
            }
            produce(&self.core, |binding, rop| {
                op(binding, rop, a, b);
                Ok(())
            })
        })
    }

    pub fn add<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<Integer> {
        self.binary(rhs, |b, r, x, y| b.mpz_add(r, x, y))
    }

    pub fn sub<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<Integer> {
        self.binary(rhs, |b, r, x, y| b.mpz_sub(r, x, y))
    }

    pub fn mul<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<Integer> {
        self.binary(rhs, |b, r, x, y| b.mpz_mul(r, x, y))
    }

    pub fn div<'a>(
        &self,
        rhs: impl Into<Operand<'a, Integer>>,
        mode: DivMode,
    ) -> CalcResult<Integer> {
        self.divide(rhs, |b, r, n, d| match mode {
            DivMode::Truncate => b.mpz_tdiv_q(r, n, d),
            DivMode::Floor => b.mpz_fdiv_q(r, n, d),
            DivMode::Ceil => b.mpz_cdiv_q(r, n, d),
        })
    }

    /// Remainder in `[0, |rhs|)`.
    pub fn modulo<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<Integer> {
        self.divide(rhs, |b, r, n, d| b.mpz_mod(r, n, d))
    }

    /// Raise to a non-negative exponent that fits in 32 bits.
    pub fn pow<'a>(&self, exp: impl Into<Operand<'a, Integer>>) -> CalcResult<Integer> {
        let base = self.ptr()?;
        let exp = match exp.into() {
            Operand::Number(number) => u32::try_from(number.to_i32()?)
                .map_err(|_| CalcError::invalid("negative exponent"))?,
            Operand::Value(value) => {
                self.core.check_binding(&value.core)?;
                value.to_exponent()?
            }
        };
        produce(&self.core, |b, rop| {
            b.mpz_pow_ui(rop, base, exp);
            Ok(())
        })
    }

    /// This value as a `pow` exponent.
    fn to_exponent(&self) -> CalcResult<u32> {
        let e = self.ptr()?;
        let binding = self.core.binding();
        if binding.mpz_sgn(e) < 0 {
            return Err(CalcError::invalid("negative exponent"));
        }
        // mpz_get_d truncates, so every value of 2^32 or more reads back as
        // at least 2^32; mpz_get_si keeps only the low bits.
        if binding.mpz_get_d(e) > f64::from(u32::MAX) {
            return Err(CalcError::invalid("exponent exceeds 32 bits"));
        }
        u32::try_from(binding.mpz_get_si(e))
            .map_err(|_| CalcError::invalid("exponent exceeds 32 bits"))
    }

    pub fn neg(&self) -> CalcResult<Integer> {
        self.unary(|b, r, x| b.mpz_neg(r, x))
    }

    pub fn abs(&self) -> CalcResult<Integer> {
        self.unary(|b, r, x| b.mpz_abs(r, x))
    }

    pub fn gcd<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<Integer> {
        self.binary(rhs, |b, r, x, y| b.mpz_gcd(r, x, y))
    }

    pub fn lcm<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<Integer> {
        self.binary(rhs, |b, r, x, y| b.mpz_lcm(r, x, y))
    }

    /// Floor of the square root.
    pub fn sqrt(&self) -> CalcResult<Integer> {
        let a = self.ptr()?;
        if self.core.binding().mpz_sgn(a) < 0 {
            return Err(CalcError::invalid("square root of a negative integer"));
        }
        self.unary(|b, r, x| b.mpz_sqrt(r, x))
    }

    /// Multiply by `2^bits`.
    pub fn shift_left(&self, bits: u32) -> CalcResult<Integer> {
        self.unary(|b, r, x| b.mpz_mul_2exp(r, x, bits))
    }

    /// Divide by `2^bits`, rounding toward negative infinity.
    pub fn shift_right(&self, bits: u32) -> CalcResult<Integer> {
        self.unary(|b, r, x| b.mpz_fdiv_q_2exp(r, x, bits))
    }

    pub fn cmp<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<Ordering> {
        let a = self.ptr()?;
        let rhs = self.normalize(rhs.into())?;
        let b = rhs.ptr()?;
        Ok(self.core.binding().mpz_cmp(a, b).cmp(&0))
    }

    pub fn is_equal<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)?.is_eq())
    }

    pub fn less_than<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)?.is_lt())
    }

    pub fn less_or_equal<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)?.is_le())
    }

    pub fn greater_than<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)?.is_gt())
    }

    pub fn greater_or_equal<'a>(&self, rhs: impl Into<Operand<'a, Integer>>) -> CalcResult<bool> {
        Ok(self.cmp(rhs)?.is_ge())
    }

    /// `-1`, `0` or `1`.
    pub fn sign(&self) -> CalcResult<i32> {
        let a = self.ptr()?;
        Ok(self.core.binding().mpz_sgn(a).signum())
    }

    /// The value as an `f64`, truncated toward zero when inexact.
    pub fn to_number(&self) -> CalcResult<f64> {
        let a = self.ptr()?;
        Ok(self.core.binding().mpz_get_d(a))
    }

    pub fn to_str_radix(&self, radix: u32) -> CalcResult<String> {
        literal::check_radix(radix)?;
        let a = self.ptr()?;
        let mut binding = self.core.binding_mut();
        let s = binding.mpz_get_str(radix, a).map_err(CalcError::allocation)?;
        take_cstr(&mut *binding, s)
    }

    /// The same value in the sibling rational context.
    pub fn to_rational(&self) -> CalcResult<Rational> {
        Rational::from_integer(self)
    }

    /// Round into a float with the float context's default options.
    pub fn to_float(&self) -> CalcResult<Float> {
        Float::from_integer(self, None)
    }

    pub fn to_float_with(&self, options: FloatOptions) -> CalcResult<Float> {
        Float::from_integer(self, Some(options))
    }

    pub fn kind(&self) -> ValueKind {
        ValueKind::Integer
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_str_radix(10) {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str("<released>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DivMode;
    use crate::testing::system;
    use crate::{CalcError, ValueKind};
    use calcnum_soft::SoftBinding;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn text_and_number_construction_agree() {
        let (calc, _) = system();
        let forty = calc.integer("40").unwrap();
        let thirty = calc.integer(30).unwrap();
        assert_eq!(forty.add(&thirty).unwrap().to_number().unwrap(), 70.0);
        assert_eq!(forty.add(2).unwrap().to_str_radix(10).unwrap(), "42");
    }

    #[test]
    fn division_modes_round_the_quotient() {
        let (calc, _) = system();
        let n = calc.integer(-7).unwrap();
        let q = |mode| n.div(2, mode).unwrap().to_number().unwrap();
        assert_eq!(q(DivMode::Truncate), -3.0);
        assert_eq!(q(DivMode::Floor), -4.0);
        assert_eq!(q(DivMode::Ceil), -3.0);
        assert_eq!(n.modulo(3).unwrap().to_number().unwrap(), 2.0);
    }

    #[test]
    fn number_theory_helpers() {
        let (calc, _) = system();
        let a = calc.integer(12).unwrap();
        assert_eq!(a.gcd(18).unwrap().to_number().unwrap(), 6.0);
        assert_eq!(a.lcm(18).unwrap().to_number().unwrap(), 36.0);
        assert_eq!(a.pow(3).unwrap().to_number().unwrap(), 1728.0);
        assert_eq!(a.sqrt().unwrap().to_number().unwrap(), 3.0);
        assert_eq!(a.shift_left(4).unwrap().to_number().unwrap(), 192.0);
        assert_eq!(a.neg().unwrap().shift_right(3).unwrap().to_number().unwrap(), -2.0);
        assert_eq!(a.neg().unwrap().abs().unwrap().to_number().unwrap(), 12.0);
    }

    #[test]
    fn big_values_go_through_text() {
        let (calc, _) = system();
        let big = calc.integer("123456789012345678901234567890").unwrap();
        assert_eq!(
            big.mul(&big).unwrap().to_str_radix(10).unwrap(),
            "15241578753238836750495351562536198787501905199875019052100"
        );
        assert_eq!(calc.integer_radix("-ff", 16).unwrap().to_number().unwrap(), -255.0);
        assert_eq!(calc.integer(255).unwrap().to_str_radix(2).unwrap(), "11111111");
    }

    #[test]
    fn comparisons() {
        let (calc, _) = system();
        let five = calc.integer(5).unwrap();
        assert!(five.is_equal(5).unwrap());
        assert!(five.less_than(6).unwrap());
        assert!(five.less_or_equal(5).unwrap());
        assert!(five.greater_than(-5).unwrap());
        assert!(!five.greater_or_equal(6).unwrap());
        assert_eq!(five.sign().unwrap(), 1);
        assert_eq!(five.sub(5).unwrap().sign().unwrap(), 0);
    }

    #[test]
    fn rejects_out_of_range_and_fractional_numbers() {
        let (calc, _) = system();
        assert!(calc.integer(1i64 << 40).is_err());
        assert!(calc.integer(2.5).is_err());
        assert!(calc.integer("12x").is_err());
        assert!(calc.integer(7).unwrap().add(0.5).is_err());
        assert!(calc.integer(7).unwrap().pow(-1).is_err());
        assert!(calc.integer(-4).unwrap().sqrt().is_err());
        assert!(calc.integer_radix("10", 40).is_err());
    }

    #[test]
    fn to_number_truncates_toward_zero() {
        let (calc, _) = system();
        // 2^54 + 3 lies between 2^54 and 2^54 + 4; nearest would round up.
        let n = calc.integer("18014398509481987").unwrap();
        assert_eq!(n.to_number().unwrap(), 18014398509481984.0);
        assert_eq!(n.neg().unwrap().to_number().unwrap(), -18014398509481984.0);
    }

    #[test]
    fn exponents_beyond_32_bits_are_rejected() {
        let (calc, _) = system();
        let three = calc.integer(3).unwrap();
        let wrapped = calc.integer("18446744073709551618").unwrap();
        assert!(matches!(three.pow(&wrapped), Err(CalcError::InvalidNumericInput(_))));
        let just_over = calc.integer("4294967296").unwrap();
        assert!(matches!(three.pow(&just_over), Err(CalcError::InvalidNumericInput(_))));
        let negative = calc.integer("-18446744073709551614").unwrap();
        assert!(matches!(three.pow(&negative), Err(CalcError::InvalidNumericInput(_))));
        let small = calc.integer(4).unwrap();
        assert_eq!(three.pow(&small).unwrap().to_number().unwrap(), 81.0);
    }

    #[test]
    fn failed_operations_register_nothing() {
        let (calc, _) = system();
        let two = calc.integer(2).unwrap();
        let live = calc.integers().live_values();
        assert!(two.pow(-1).is_err());
        assert!(two.pow(1i64 << 40).is_err());
        assert!(two.div(0, DivMode::Floor).is_err());
        assert!(two.add(0.5).is_err());
        assert_eq!(calc.integers().live_values(), live);

        calc.integers().destroy();
        assert!(matches!(
            two.add(5),
            Err(CalcError::UseAfterRelease { kind: ValueKind::Integer })
        ));
        assert!(two.cmp(5).is_err());
        assert_eq!(calc.integers().live_values(), 0);
    }

    #[test]
    fn allocation_failure_rolls_back_promoted_operands() {
        let binding = Rc::new(RefCell::new(SoftBinding::with_heap_limit(64)));
        let calc = crate::init(Rc::clone(&binding), Default::default()).unwrap();
        let a = calc.integer(1).unwrap();
        let _b = calc.integer(2).unwrap();
        let before = binding.borrow().live_allocations();
        assert!(matches!(a.add(5), Err(CalcError::AllocationFailure(_))));
        assert_eq!(calc.integers().live_values(), 2);
        assert_eq!(binding.borrow().live_allocations(), before);
        assert_eq!(binding.borrow().live_integers(), 2);
    }

    #[test]
    fn display_renders_decimal() {
        let (calc, _) = system();
        assert_eq!(calc.integer(-42).unwrap().to_string(), "-42");
    }
}
