//! Binary floating point with per-value precision and directed rounding.
//!
//! A finite non-zero value is `±mant × 2^exp` where `mant` has exactly
//! `prec` significant bits. Every operation computes an exact (or exact
//! plus sticky) intermediate and rounds it once, so results are correctly
//! rounded in the requested mode.

use calcnum_binding::Rnd;
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;

/// Smallest exponent used when stepping away from zero.
pub const EMIN: i64 = 1 - (1 << 30);

/// Parsed exponents beyond this magnitude saturate to infinity or zero.
const MAX_TEXT_EXPONENT: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Class {
    Nan,
    Inf,
    Zero,
    Normal,
}

#[derive(Debug, Clone)]
pub(crate) struct SoftFloat {
    pub prec: u32,
    pub neg: bool,
    pub class: Class,
    pub mant: BigUint,
    pub exp: i64,
}

/// Whether a truncated magnitude must be bumped by one unit.
///
/// `cmp_half` compares the discarded part against half a unit, `inexact`
/// is set when anything at all was discarded.
pub(crate) fn rounds_away(
    rnd: Rnd,
    neg: bool,
    cmp_half: Ordering,
    inexact: bool,
    kept_is_odd: bool,
) -> bool {
    match rnd {
        Rnd::Nearest => {
            cmp_half == Ordering::Greater || (cmp_half == Ordering::Equal && kept_is_odd)
        }
        Rnd::TowardZero => false,
        Rnd::Up => inexact && !neg,
        Rnd::Down => inexact && neg,
        Rnd::AwayFromZero => inexact,
    }
}

/// Digits needed to render `prec` bits in `base` without loss.
pub fn default_digits(prec: u32, base: u32) -> usize {
    let ratio = std::f64::consts::LN_2 / f64::from(base).ln();
    1 + (f64::from(prec) * ratio).ceil() as usize
}

fn ldexp(mut value: f64, mut exp: i64) -> f64 {
    let step = 2f64.powi(1000);
    while exp > 1000 && value.is_finite() {
        value *= step;
        exp -= 1000;
    }
    while exp < -1000 && value != 0.0 {
        value /= step;
        exp += 1000;
    }
    value * 2f64.powi(exp as i32)
}

impl SoftFloat {
    fn special(prec: u32, class: Class, neg: bool) -> Self {
        Self {
            prec,
            neg,
            class,
            mant: BigUint::zero(),
            exp: 0,
        }
    }

    pub fn nan(prec: u32) -> Self {
        Self::special(prec, Class::Nan, false)
    }

    pub fn inf(prec: u32, neg: bool) -> Self {
        Self::special(prec, Class::Inf, neg)
    }

    pub fn zero(prec: u32, neg: bool) -> Self {
        Self::special(prec, Class::Zero, neg)
    }

    pub(crate) fn normal(prec: u32, neg: bool, mant: BigUint, exp: i64) -> Self {
        Self {
            prec,
            neg,
            class: Class::Normal,
            mant,
            exp,
        }
    }

    /// The magnitude lies in `[2^(top-1), 2^top)`.
    fn top(&self) -> i64 {
        self.exp + i64::from(self.prec)
    }

    fn signed_mant(&self) -> BigInt {
        let sign = if self.neg { Sign::Minus } else { Sign::Plus };
        BigInt::from_biguint(sign, self.mant.clone())
    }

    /// Round `±(mant + sticky) × 2^exp` to `prec` bits.
    ///
    /// `sticky` marks a non-zero remainder strictly below the lowest bit
    /// of `mant`; callers that set it supply at least `prec + 1` bits.
    pub fn round(
        prec: u32,
        neg: bool,
        mant: BigUint,
        exp: i64,
        sticky: bool,
        rnd: Rnd,
    ) -> (Self, i32) {
        if mant.is_zero() {
            return (Self::zero(prec, neg), 0);
        }
        let bits = mant.bits();
        let prec_bits = u64::from(prec);

        let (mut kept, mut exp, cmp_half, inexact) = if bits <= prec_bits {
            debug_assert!(!sticky, "sticky rounding needs guard bits");
            let shift = prec_bits - bits;
            (mant << shift, exp - shift as i64, Ordering::Less, sticky)
        } else {
            let shift = bits - prec_bits;
            let kept = &mant >> shift;
            let rem = mant - (&kept << shift);
            let half = BigUint::one() << (shift - 1);
            let cmp_half = match rem.cmp(&half) {
                Ordering::Equal if sticky => Ordering::Greater,
                other => other,
            };
            let inexact = sticky || !rem.is_zero();
            (kept, exp + shift as i64, cmp_half, inexact)
        };

        let away = rounds_away(rnd, neg, cmp_half, inexact, kept.is_odd());
        if away {
            kept += 1u32;
            if kept.bits() > prec_bits {
                kept >>= 1u32;
                exp += 1;
            }
        }
        let ternary = if !inexact {
            0
        } else if away != neg {
            1
        } else {
            -1
        };
        (Self::normal(prec, neg, kept, exp), ternary)
    }

    /// Round `±(num / den) × 2^exp` to `prec` bits. `num` must be non-zero.
    pub fn from_ratio(
        prec: u32,
        neg: bool,
        num: BigUint,
        den: &BigUint,
        exp: i64,
        rnd: Rnd,
    ) -> (Self, i32) {
        let target = u64::from(prec) + 2 + den.bits();
        let shift = target.saturating_sub(num.bits());
        let (q, r) = (num << shift).div_rem(den);
        Self::round(prec, neg, q, exp - shift as i64, !r.is_zero(), rnd)
    }

    pub fn from_bigint(prec: u32, value: &BigInt, rnd: Rnd) -> (Self, i32) {
        if value.is_zero() {
            return (Self::zero(prec, false), 0);
        }
        Self::round(prec, value.is_negative(), value.magnitude().clone(), 0, false, rnd)
    }

    pub fn from_rational(prec: u32, num: &BigInt, den: &BigInt, rnd: Rnd) -> (Self, i32) {
        if num.is_zero() {
            return (Self::zero(prec, false), 0);
        }
        let neg = num.is_negative() != den.is_negative();
        Self::from_ratio(prec, neg, num.magnitude().clone(), den.magnitude(), 0, rnd)
    }

    pub fn from_f64(prec: u32, value: f64, rnd: Rnd) -> (Self, i32) {
        if value.is_nan() {
            return (Self::nan(prec), 0);
        }
        if value.is_infinite() {
            return (Self::inf(prec, value < 0.0), 0);
        }
        if value == 0.0 {
            return (Self::zero(prec, value.is_sign_negative()), 0);
        }
        let bits = value.to_bits();
        let neg = bits >> 63 == 1;
        let biased = ((bits >> 52) & 0x7ff) as i64;
        let fraction = bits & ((1u64 << 52) - 1);
        let (mant, exp) = if biased == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1u64 << 52), biased - 1075)
        };
        Self::round(prec, neg, BigUint::from(mant), exp, false, rnd)
    }

    pub fn to_f64(&self, rnd: Rnd) -> f64 {
        match self.class {
            Class::Nan => f64::NAN,
            Class::Inf if self.neg => f64::NEG_INFINITY,
            Class::Inf => f64::INFINITY,
            Class::Zero if self.neg => -0.0,
            Class::Zero => 0.0,
            Class::Normal => {
                let (rounded, _) =
                    Self::round(53, self.neg, self.mant.clone(), self.exp, false, rnd);
                let mant = rounded.mant.to_u64().unwrap_or(0) as f64;
                let magnitude = ldexp(mant, rounded.exp);
                if self.neg { -magnitude } else { magnitude }
            }
        }
    }

    /// Copy of `self` rounded to `prec` bits.
    pub fn round_to(&self, prec: u32, rnd: Rnd) -> (Self, i32) {
        match self.class {
            Class::Normal => Self::round(prec, self.neg, self.mant.clone(), self.exp, false, rnd),
            class => (Self::special(prec, class, self.neg), 0),
        }
    }

    pub fn negated(&self) -> Self {
        let mut out = self.clone();
        if out.class != Class::Nan {
            out.neg = !out.neg;
        }
        out
    }

    pub fn sign(&self) -> i32 {
        match self.class {
            Class::Nan | Class::Zero => 0,
            _ if self.neg => -1,
            _ => 1,
        }
    }

    pub fn add(&self, other: &Self, prec: u32, rnd: Rnd) -> (Self, i32) {
        use Class::*;
        match (self.class, other.class) {
            (Nan, _) | (_, Nan) => (Self::nan(prec), 0),
            (Inf, Inf) if self.neg != other.neg => (Self::nan(prec), 0),
            (Inf, _) => (Self::inf(prec, self.neg), 0),
            (_, Inf) => (Self::inf(prec, other.neg), 0),
            (Zero, Zero) => {
                let neg = if self.neg == other.neg {
                    self.neg
                } else {
                    rnd == Rnd::Down
                };
                (Self::zero(prec, neg), 0)
            }
            (Zero, Normal) => other.round_to(prec, rnd),
            (Normal, Zero) => self.round_to(prec, rnd),
            (Normal, Normal) => Self::add_normal(self, other, prec, rnd),
        }
    }

    fn add_normal(a: &Self, b: &Self, prec: u32, rnd: Rnd) -> (Self, i32) {
        let (big, small) = if a.top() >= b.top() { (a, b) } else { (b, a) };

        // The smaller operand sits entirely below the rounding position:
        // stand it in with a sticky bit instead of shifting it into place.
        let guard = (i64::from(prec) - i64::from(big.prec)).max(0) + 2;
        if small.top() <= big.exp - guard {
            let mut mant = &big.mant << guard as u64;
            if big.neg != small.neg {
                mant -= 1u32;
            }
            return Self::round(prec, big.neg, mant, big.exp - guard, true, rnd);
        }

        let exp = a.exp.min(b.exp);
        let lhs = a.signed_mant() << (a.exp - exp) as u64;
        let rhs = b.signed_mant() << (b.exp - exp) as u64;
        let sum = lhs + rhs;
        if sum.is_zero() {
            return (Self::zero(prec, rnd == Rnd::Down), 0);
        }
        Self::round(prec, sum.is_negative(), sum.magnitude().clone(), exp, false, rnd)
    }

    pub fn sub(&self, other: &Self, prec: u32, rnd: Rnd) -> (Self, i32) {
        self.add(&other.negated(), prec, rnd)
    }

    pub fn mul(&self, other: &Self, prec: u32, rnd: Rnd) -> (Self, i32) {
        use Class::*;
        let neg = self.neg != other.neg;
        match (self.class, other.class) {
            (Nan, _) | (_, Nan) | (Inf, Zero) | (Zero, Inf) => (Self::nan(prec), 0),
            (Inf, _) | (_, Inf) => (Self::inf(prec, neg), 0),
            (Zero, _) | (_, Zero) => (Self::zero(prec, neg), 0),
            (Normal, Normal) => Self::round(
                prec,
                neg,
                &self.mant * &other.mant,
                self.exp + other.exp,
                false,
                rnd,
            ),
        }
    }

    pub fn div(&self, other: &Self, prec: u32, rnd: Rnd) -> (Self, i32) {
        use Class::*;
        let neg = self.neg != other.neg;
        match (self.class, other.class) {
            (Nan, _) | (_, Nan) | (Inf, Inf) | (Zero, Zero) => (Self::nan(prec), 0),
            (Inf, _) | (_, Zero) => (Self::inf(prec, neg), 0),
            (_, Inf) | (Zero, _) => (Self::zero(prec, neg), 0),
            (Normal, Normal) => Self::from_ratio(
                prec,
                neg,
                self.mant.clone(),
                &other.mant,
                self.exp - other.exp,
                rnd,
            ),
        }
    }

    fn cmp_abs(&self, other: &Self) -> Ordering {
        use Class::*;
        match (self.class, other.class) {
            (Inf, Inf) | (Zero, Zero) => Ordering::Equal,
            (Inf, _) | (_, Zero) => Ordering::Greater,
            (_, Inf) | (Zero, _) => Ordering::Less,
            _ => match self.top().cmp(&other.top()) {
                Ordering::Equal => {
                    let exp = self.exp.min(other.exp);
                    let lhs = &self.mant << (self.exp - exp) as u64;
                    let rhs = &other.mant << (other.exp - exp) as u64;
                    lhs.cmp(&rhs)
                }
                unequal => unequal,
            },
        }
    }

    /// Three-way comparison; `None` when either side is NaN.
    pub fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.class == Class::Nan || other.class == Class::Nan {
            return None;
        }
        let (lhs, rhs) = (self.sign(), other.sign());
        if lhs != rhs {
            return Some(lhs.cmp(&rhs));
        }
        if lhs == 0 {
            return Some(Ordering::Equal);
        }
        let magnitude = self.cmp_abs(other);
        Some(if lhs > 0 { magnitude } else { magnitude.reverse() })
    }

    /// Round to an integer in the given mode. Non-finite values give zero.
    pub fn to_integer(&self, rnd: Rnd) -> BigInt {
        if self.class != Class::Normal {
            return BigInt::zero();
        }
        if self.exp >= 0 {
            return self.signed_mant() << self.exp as u64;
        }
        let shift = self.exp.unsigned_abs();
        let (kept, cmp_half, inexact) = if shift > self.mant.bits() {
            (BigUint::zero(), Ordering::Less, true)
        } else {
            let kept = &self.mant >> shift;
            let rem = &self.mant - (&kept << shift);
            let half = BigUint::one() << (shift - 1);
            let inexact = !rem.is_zero();
            (kept, rem.cmp(&half), inexact)
        };
        let away = rounds_away(rnd, self.neg, cmp_half, inexact, kept.is_odd());
        let magnitude = if away { kept + 1u32 } else { kept };
        let sign = if self.neg { Sign::Minus } else { Sign::Plus };
        BigInt::from_biguint(sign, magnitude)
    }

    /// Exact value as a reduced fraction. Non-finite values give `0/1`.
    pub fn to_ratio(&self) -> (BigInt, BigInt) {
        if self.class != Class::Normal {
            return (BigInt::zero(), BigInt::one());
        }
        if self.exp >= 0 {
            return (self.signed_mant() << self.exp as u64, BigInt::one());
        }
        let scale = self.exp.unsigned_abs();
        let zeros = self.mant.trailing_zeros().unwrap_or(0).min(scale);
        let sign = if self.neg { Sign::Minus } else { Sign::Plus };
        let num = BigInt::from_biguint(sign, &self.mant >> zeros);
        let den = BigInt::one() << (scale - zeros);
        (num, den)
    }

    /// Step one unit in the last place toward +∞ (`up`) or −∞.
    ///
    /// Infinities and NaN are left unchanged; zero steps to the smallest
    /// magnitude at `EMIN`.
    pub fn step(&mut self, up: bool) {
        match self.class {
            Class::Nan | Class::Inf => {}
            Class::Zero => {
                let mant = BigUint::one() << (self.prec - 1);
                *self = Self::normal(self.prec, !up, mant, EMIN - i64::from(self.prec));
            }
            Class::Normal => {
                let prec_bits = u64::from(self.prec);
                if up != self.neg {
                    self.mant += 1u32;
                    if self.mant.bits() > prec_bits {
                        self.mant >>= 1u32;
                        self.exp += 1;
                    }
                } else if self.mant == BigUint::one() << (self.prec - 1) {
                    self.mant = (BigUint::one() << self.prec) - 1u32;
                    self.exp -= 1;
                } else {
                    self.mant -= 1u32;
                }
            }
        }
    }

    /// Significant digits of a finite non-zero value.
    ///
    /// Returns the digit string (with a leading `-` when negative) and the
    /// exponent `e` such that the value is `0.DIGITS × base^e`.
    pub fn digits(&self, base: u32, n_digits: usize, rnd: Rnd) -> (String, i64) {
        let n = if n_digits == 0 {
            default_digits(self.prec, base)
        } else {
            n_digits
        };
        let radix = BigUint::from(base);
        let lower = radix.pow((n - 1) as u32);
        let upper = &lower * &radix;

        let ratio = std::f64::consts::LN_2 / f64::from(base).ln();
        let mut exp = ((self.top() - 1) as f64 * ratio).floor() as i64 + 1;
        loop {
            let (num, den) = self.scaled(&radix, n as i64 - exp);
            if num < &lower * &den {
                exp -= 1;
                continue;
            }
            if num >= &upper * &den {
                exp += 1;
                continue;
            }
            let (q, r) = num.div_rem(&den);
            let cmp_half = (&r << 1u32).cmp(&den);
            let away = rounds_away(rnd, self.neg, cmp_half, !r.is_zero(), q.is_odd());
            let mut q = if away { q + 1u32 } else { q };
            if q == upper {
                q = lower;
                exp += 1;
            }
            let mut text = q.to_str_radix(base);
            if self.neg {
                text.insert(0, '-');
            }
            return (text, exp);
        }
    }

    /// `|self| × radix^power` as an exact fraction.
    fn scaled(&self, radix: &BigUint, power: i64) -> (BigUint, BigUint) {
        let mut num = self.mant.clone();
        let mut den = BigUint::one();
        if self.exp >= 0 {
            num <<= self.exp as u64;
        } else {
            den <<= self.exp.unsigned_abs();
        }
        if power >= 0 {
            num *= radix.pow(power as u32);
        } else {
            den *= radix.pow(power.unsigned_abs() as u32);
        }
        (num, den)
    }

    /// Parse `[-+]digits[.digits][(e|@)[-+]exp]` or a NaN/infinity word.
    pub fn parse(text: &str, base: u32, prec: u32, rnd: Rnd) -> Option<(Self, i32)> {
        if !(2..=36).contains(&base) {
            return None;
        }
        let (neg, body) = match text.as_bytes().first()? {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };
        match body.to_ascii_lowercase().as_str() {
            "nan" | "@nan@" => return Some((Self::nan(prec), 0)),
            "inf" | "infinity" | "@inf@" => return Some((Self::inf(prec, neg), 0)),
            _ => {}
        }

        let marker = body.find(|c: char| c == '@' || (base <= 10 && (c == 'e' || c == 'E')));
        let (mantissa, exponent) = match marker {
            Some(at) => (&body[..at], body[at + 1..].parse::<i64>().ok()?),
            None => (body, 0),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits = format!("{int_part}{frac_part}");
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(base)) {
            return None;
        }
        let value = BigUint::parse_bytes(digits.as_bytes(), base)?;
        let power = exponent.checked_sub(frac_part.len() as i64)?;

        if value.is_zero() {
            return Some((Self::zero(prec, neg), 0));
        }
        if power.unsigned_abs() > MAX_TEXT_EXPONENT {
            let ternary = if neg { -1 } else { 1 };
            return Some(if power > 0 {
                (Self::inf(prec, neg), ternary)
            } else {
                (Self::zero(prec, neg), -ternary)
            });
        }
        let radix = BigUint::from(base);
        Some(if power >= 0 {
            Self::round(prec, neg, value * radix.pow(power as u32), 0, false, rnd)
        } else {
            Self::from_ratio(prec, neg, value, &radix.pow(power.unsigned_abs() as u32), 0, rnd)
        })
    }
}
