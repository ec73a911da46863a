//! # calcnum soft
//!
//! Reference [`Binding`] implemented in Rust. Native structures are fixed
//! size blocks in a [`LinearMemory`](heap) addressed exactly like the real
//! libraries lay them out; the numeric payload behind each address lives
//! in side tables keyed by that address.
//!
//! | structure | size | layout                                   |
//! |-----------|------|------------------------------------------|
//! | `mpz_t`   | 16   | opaque                                   |
//! | `mpq_t`   | 32   | numerator `mpz` at +0, denominator at +16 |
//! | `mpfr_t`  | 16   | opaque                                   |
//!
//! Touching a structure that was never initialized (or was already
//! cleared) panics, the way the native library would abort.

mod constants;
mod float;
mod heap;

use calcnum_binding::{Binding, BindingResult, Ptr, Rnd};
use float::{Class, SoftFloat};
use heap::LinearMemory;
use num_bigint::BigInt;
use num_integer::{Integer, Roots};
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::collections::HashMap;

pub use float::default_digits;
pub use heap::PAGE_SIZE;

const MPZ_SIZE: usize = 16;
const MPQ_SIZE: usize = 32;
const MPQ_DEN_OFFSET: Ptr = 16;
const MPFR_SIZE: usize = 16;

/// Default linear-memory ceiling: 1024 pages (64 MiB).
pub const DEFAULT_HEAP_LIMIT: usize = 1024 * PAGE_SIZE;

fn ordering_code(ordering: Ordering) -> i32 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

fn sign_code(value: &BigInt) -> i32 {
    if value.is_zero() {
        0
    } else if value.is_negative() {
        -1
    } else {
        1
    }
}

/// Parse an optionally signed integer, accepting nothing but digits of
/// `base` after the sign.
fn parse_integer(text: &str, base: u32) -> Option<BigInt> {
    if !(2..=36).contains(&base) {
        return None;
    }
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(base)) {
        return None;
    }
    BigInt::parse_bytes(text.as_bytes(), base)
}

#[derive(Debug)]
pub struct SoftBinding {
    heap: LinearMemory,
    integers: HashMap<Ptr, BigInt>,
    floats: HashMap<Ptr, SoftFloat>,
}

impl Default for SoftBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftBinding {
    pub fn new() -> Self {
        Self::with_heap_limit(DEFAULT_HEAP_LIMIT)
    }

    /// A binding whose linear memory never grows beyond `limit` bytes.
    pub fn with_heap_limit(limit: usize) -> Self {
        Self {
            heap: LinearMemory::new(limit),
            integers: HashMap::new(),
            floats: HashMap::new(),
        }
    }

    /// Blocks currently allocated in linear memory, structures and
    /// strings alike.
    pub fn live_allocations(&self) -> usize {
        self.heap.live_allocations()
    }

    pub fn live_bytes(&self) -> usize {
        self.heap.live_bytes()
    }

    /// Initialized `mpz` structures, counting the two inside every
    /// initialized `mpq`.
    pub fn live_integers(&self) -> usize {
        self.integers.len()
    }

    pub fn live_floats(&self) -> usize {
        self.floats.len()
    }

    // ── side-table access ────────────────────────────────────────────

    fn int(&self, x: Ptr) -> &BigInt {
        match self.integers.get(&x) {
            Some(value) => value,
            None => panic!("mpz at {x:#x} is not initialized"),
        }
    }

    fn set_int(&mut self, x: Ptr, value: BigInt) {
        match self.integers.get_mut(&x) {
            Some(slot) => *slot = value,
            None => panic!("mpz at {x:#x} is not initialized"),
        }
    }

    fn float(&self, x: Ptr) -> &SoftFloat {
        match self.floats.get(&x) {
            Some(value) => value,
            None => panic!("mpfr at {x:#x} is not initialized"),
        }
    }

    fn prec(&self, x: Ptr) -> u32 {
        self.float(x).prec
    }

    fn store_float(&mut self, x: Ptr, (value, ternary): (SoftFloat, i32)) -> i32 {
        match self.floats.get_mut(&x) {
            Some(slot) => *slot = value,
            None => panic!("mpfr at {x:#x} is not initialized"),
        }
        ternary
    }

    fn ratio(&self, x: Ptr) -> BigRational {
        let num = self.int(self.mpq_numref(x)).clone();
        let den = self.int(self.mpq_denref(x)).clone();
        BigRational::new_raw(num, den)
    }

    fn set_ratio(&mut self, x: Ptr, value: BigRational) {
        let (num, den) = value.into_raw();
        self.set_int(self.mpq_numref(x), num);
        self.set_int(self.mpq_denref(x), den);
    }

    fn int_op(&mut self, rop: Ptr, a: Ptr, b: Ptr, op: impl FnOnce(&BigInt, &BigInt) -> BigInt) {
        let value = op(self.int(a), self.int(b));
        self.set_int(rop, value);
    }

    fn int_unary(&mut self, rop: Ptr, x: Ptr, op: impl FnOnce(&BigInt) -> BigInt) {
        let value = op(self.int(x));
        self.set_int(rop, value);
    }

    fn nonzero_divisor(&self, d: Ptr) -> &BigInt {
        let divisor = self.int(d);
        if divisor.is_zero() {
            panic!("mpz division by zero");
        }
        divisor
    }

    fn ratio_op(
        &mut self,
        rop: Ptr,
        a: Ptr,
        b: Ptr,
        op: impl FnOnce(BigRational, BigRational) -> BigRational,
    ) {
        let value = op(self.ratio(a), self.ratio(b));
        self.set_ratio(rop, value);
    }

    fn float_op(
        &mut self,
        rop: Ptr,
        a: Ptr,
        b: Ptr,
        op: impl FnOnce(&SoftFloat, &SoftFloat, u32) -> (SoftFloat, i32),
    ) -> i32 {
        let result = op(self.float(a), self.float(b), self.prec(rop));
        self.store_float(rop, result)
    }

    /// Allocate a NUL-terminated copy of `text`.
    fn alloc_cstr(&mut self, text: &str) -> BindingResult<Ptr> {
        calcnum_binding::write_cstr(self, text)
    }
}

impl Binding for SoftBinding {
    fn malloc(&mut self, size: usize) -> BindingResult<Ptr> {
        self.heap.malloc(size)
    }

    fn free(&mut self, ptr: Ptr) {
        self.heap.free(ptr);
    }

    fn mem(&self) -> &[u8] {
        self.heap.bytes()
    }

    fn mem_mut(&mut self) -> &mut [u8] {
        self.heap.bytes_mut()
    }

    // ── Integers ─────────────────────────────────────────────────────

    fn mpz_t(&mut self) -> BindingResult<Ptr> {
        self.heap.malloc(MPZ_SIZE)
    }

    fn mpz_init(&mut self, x: Ptr) {
        self.integers.insert(x, BigInt::zero());
    }

    fn mpz_clear(&mut self, x: Ptr) {
        if self.integers.remove(&x).is_none() {
            panic!("mpz at {x:#x} cleared twice");
        }
    }

    fn mpz_t_free(&mut self, x: Ptr) {
        self.heap.free(x);
    }

    fn mpz_set(&mut self, rop: Ptr, op: Ptr) {
        self.int_unary(rop, op, Clone::clone);
    }

    fn mpz_set_si(&mut self, rop: Ptr, op: i32) {
        self.set_int(rop, BigInt::from(op));
    }

    fn mpz_set_str(&mut self, rop: Ptr, s: Ptr, base: u32) -> i32 {
        let parsed = calcnum_binding::read_cstr(self, s)
            .ok()
            .and_then(|text| parse_integer(&text, base));
        match parsed {
            Some(value) => {
                self.set_int(rop, value);
                0
            }
            None => -1,
        }
    }

    fn mpz_add(&mut self, rop: Ptr, a: Ptr, b: Ptr) {
        self.int_op(rop, a, b, |a, b| a + b);
    }

    fn mpz_sub(&mut self, rop: Ptr, a: Ptr, b: Ptr) {
        self.int_op(rop, a, b, |a, b| a - b);
    }

    fn mpz_mul(&mut self, rop: Ptr, a: Ptr, b: Ptr) {
        self.int_op(rop, a, b, |a, b| a * b);
    }

    fn mpz_tdiv_q(&mut self, q: Ptr, n: Ptr, d: Ptr) {
        self.nonzero_divisor(d);
        self.int_op(q, n, d, |n, d| n / d);
    }

    fn mpz_fdiv_q(&mut self, q: Ptr, n: Ptr, d: Ptr) {
        self.nonzero_divisor(d);
        self.int_op(q, n, d, Integer::div_floor);
    }

    fn mpz_cdiv_q(&mut self, q: Ptr, n: Ptr, d: Ptr) {
        self.nonzero_divisor(d);
        self.int_op(q, n, d, |n, d| -(-n).div_floor(d));
    }

    fn mpz_mod(&mut self, r: Ptr, n: Ptr, d: Ptr) {
        self.nonzero_divisor(d);
        self.int_op(r, n, d, |n, d| n.mod_floor(&d.abs()));
    }

    fn mpz_pow_ui(&mut self, rop: Ptr, base: Ptr, exp: u32) {
        self.int_unary(rop, base, |base| base.pow(exp));
    }

    fn mpz_neg(&mut self, rop: Ptr, op: Ptr) {
        self.int_unary(rop, op, |x| -x);
    }

    fn mpz_abs(&mut self, rop: Ptr, op: Ptr) {
        self.int_unary(rop, op, Signed::abs);
    }

    fn mpz_gcd(&mut self, rop: Ptr, a: Ptr, b: Ptr) {
        self.int_op(rop, a, b, Integer::gcd);
    }

    fn mpz_lcm(&mut self, rop: Ptr, a: Ptr, b: Ptr) {
        self.int_op(rop, a, b, Integer::lcm);
    }

    fn mpz_sqrt(&mut self, rop: Ptr, op: Ptr) {
        if self.int(op).is_negative() {
            panic!("mpz_sqrt of a negative number");
        }
        self.int_unary(rop, op, Roots::sqrt);
    }

    fn mpz_mul_2exp(&mut self, rop: Ptr, op: Ptr, bits: u32) {
        self.int_unary(rop, op, |x| x << bits);
    }

    fn mpz_fdiv_q_2exp(&mut self, rop: Ptr, op: Ptr, bits: u32) {
        // Shifting a negative BigInt right rounds toward negative infinity.
        self.int_unary(rop, op, |x| x >> bits);
    }

    fn mpz_cmp(&self, a: Ptr, b: Ptr) -> i32 {
        ordering_code(self.int(a).cmp(self.int(b)))
    }

    fn mpz_sgn(&self, op: Ptr) -> i32 {
        sign_code(self.int(op))
    }

    fn mpz_get_si(&self, op: Ptr) -> i64 {
        let value = self.int(op);
        value.to_i64().unwrap_or_else(|| {
            let low = value.magnitude().iter_u64_digits().next().unwrap_or(0) & i64::MAX as u64;
            let low = low as i64;
            if value.is_negative() { -low } else { low }
        })
    }

    fn mpz_get_d(&self, op: Ptr) -> f64 {
        SoftFloat::from_bigint(53, self.int(op), Rnd::TowardZero)
            .0
            .to_f64(Rnd::TowardZero)
    }

    fn mpz_get_str(&mut self, base: u32, op: Ptr) -> BindingResult<Ptr> {
        let text = self.int(op).to_str_radix(base);
        self.alloc_cstr(&text)
    }

    // ── Rationals ────────────────────────────────────────────────────

    fn mpq_t(&mut self) -> BindingResult<Ptr> {
        self.heap.malloc(MPQ_SIZE)
    }

    fn mpq_init(&mut self, x: Ptr) {
        let (num, den) = (self.mpq_numref(x), self.mpq_denref(x));
        self.integers.insert(num, BigInt::zero());
        self.integers.insert(den, BigInt::one());
    }

    fn mpq_clear(&mut self, x: Ptr) {
        self.mpz_clear(self.mpq_numref(x));
        self.mpz_clear(self.mpq_denref(x));
    }

    fn mpq_t_free(&mut self, x: Ptr) {
        self.heap.free(x);
    }

    fn mpq_numref(&self, x: Ptr) -> Ptr {
        x
    }

    fn mpq_denref(&self, x: Ptr) -> Ptr {
        x + MPQ_DEN_OFFSET
    }

    fn mpq_set(&mut self, rop: Ptr, op: Ptr) {
        let value = self.ratio(op);
        self.set_ratio(rop, value);
    }

    fn mpq_set_si(&mut self, rop: Ptr, num: i32, den: u32) {
        self.set_ratio(rop, BigRational::new_raw(num.into(), den.into()));
    }

    fn mpq_set_z(&mut self, rop: Ptr, op: Ptr) {
        let num = self.int(op).clone();
        self.set_ratio(rop, BigRational::from_integer(num));
    }

    fn mpq_set_str(&mut self, rop: Ptr, s: Ptr, base: u32) -> i32 {
        let Ok(text) = calcnum_binding::read_cstr(self, s) else {
            return -1;
        };
        let (num, den) = match text.split_once('/') {
            Some((num, den)) => (parse_integer(num, base), parse_integer(den, base)),
            None => (parse_integer(&text, base), Some(BigInt::one())),
        };
        match (num, den) {
            (Some(num), Some(den)) => {
                self.set_ratio(rop, BigRational::new_raw(num, den));
                0
            }
            _ => -1,
        }
    }

    fn mpq_canonicalize(&mut self, x: Ptr) {
        let raw = self.ratio(x);
        if raw.denom().is_zero() {
            panic!("mpq_canonicalize with a zero denominator");
        }
        let (num, den) = raw.into_raw();
        self.set_ratio(x, BigRational::new(num, den));
    }

    fn mpq_add(&mut self, rop: Ptr, a: Ptr, b: Ptr) {
        self.ratio_op(rop, a, b, |a, b| a + b);
    }

    fn mpq_sub(&mut self, rop: Ptr, a: Ptr, b: Ptr) {
        self.ratio_op(rop, a, b, |a, b| a - b);
    }

    fn mpq_mul(&mut self, rop: Ptr, a: Ptr, b: Ptr) {
        self.ratio_op(rop, a, b, |a, b| a * b);
    }

    fn mpq_div(&mut self, rop: Ptr, a: Ptr, b: Ptr) {
        if self.ratio(b).is_zero() {
            panic!("mpq division by zero");
        }
        self.ratio_op(rop, a, b, |a, b| a / b);
    }

    fn mpq_neg(&mut self, rop: Ptr, op: Ptr) {
        let value = -self.ratio(op);
        self.set_ratio(rop, value);
    }

    fn mpq_inv(&mut self, rop: Ptr, op: Ptr) {
        let value = self.ratio(op);
        if value.is_zero() {
            panic!("mpq_inv of zero");
        }
        self.set_ratio(rop, value.recip());
    }

    fn mpq_abs(&mut self, rop: Ptr, op: Ptr) {
        let value = self.ratio(op).abs();
        self.set_ratio(rop, value);
    }

    fn mpq_equal(&self, a: Ptr, b: Ptr) -> i32 {
        i32::from(self.ratio(a) == self.ratio(b))
    }

    fn mpq_cmp(&self, a: Ptr, b: Ptr) -> i32 {
        ordering_code(self.ratio(a).cmp(&self.ratio(b)))
    }

    fn mpq_sgn(&self, op: Ptr) -> i32 {
        sign_code(self.int(self.mpq_numref(op)))
    }

    fn mpq_get_d(&self, op: Ptr) -> f64 {
        let value = self.ratio(op);
        SoftFloat::from_rational(53, value.numer(), value.denom(), Rnd::TowardZero)
            .0
            .to_f64(Rnd::TowardZero)
    }

    fn mpq_get_str(&mut self, base: u32, op: Ptr) -> BindingResult<Ptr> {
        let value = self.ratio(op);
        let text = if value.denom().is_one() {
            value.numer().to_str_radix(base)
        } else {
            format!(
                "{}/{}",
                value.numer().to_str_radix(base),
                value.denom().to_str_radix(base)
            )
        };
        self.alloc_cstr(&text)
    }

    // ── Floats ───────────────────────────────────────────────────────

    fn mpfr_t(&mut self) -> BindingResult<Ptr> {
        self.heap.malloc(MPFR_SIZE)
    }

    fn mpfr_init2(&mut self, x: Ptr, prec: u32) {
        if prec == 0 {
            panic!("mpfr precision must be at least one bit");
        }
        self.floats.insert(x, SoftFloat::nan(prec));
    }

    fn mpfr_clear(&mut self, x: Ptr) {
        if self.floats.remove(&x).is_none() {
            panic!("mpfr at {x:#x} cleared twice");
        }
    }

    fn mpfr_t_free(&mut self, x: Ptr) {
        self.heap.free(x);
    }

    fn mpfr_get_prec(&self, x: Ptr) -> u32 {
        self.prec(x)
    }

    fn mpfr_set(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32 {
        let result = self.float(op).round_to(self.prec(rop), rnd);
        self.store_float(rop, result)
    }

    fn mpfr_set_si(&mut self, rop: Ptr, op: i32, rnd: Rnd) -> i32 {
        let result = SoftFloat::from_bigint(self.prec(rop), &BigInt::from(op), rnd);
        self.store_float(rop, result)
    }

    fn mpfr_set_d(&mut self, rop: Ptr, op: f64, rnd: Rnd) -> i32 {
        let result = SoftFloat::from_f64(self.prec(rop), op, rnd);
        self.store_float(rop, result)
    }

    fn mpfr_set_z(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32 {
        let result = SoftFloat::from_bigint(self.prec(rop), self.int(op), rnd);
        self.store_float(rop, result)
    }

    fn mpfr_set_q(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32 {
        let value = self.ratio(op);
        let result = SoftFloat::from_rational(self.prec(rop), value.numer(), value.denom(), rnd);
        self.store_float(rop, result)
    }

    fn mpfr_set_str(&mut self, rop: Ptr, s: Ptr, base: u32, rnd: Rnd) -> i32 {
        let prec = self.prec(rop);
        let parsed = calcnum_binding::read_cstr(self, s)
            .ok()
            .and_then(|text| SoftFloat::parse(&text, base, prec, rnd));
        match parsed {
            Some(result) => {
                self.store_float(rop, result);
                0
            }
            None => -1,
        }
    }

    fn mpfr_add(&mut self, rop: Ptr, a: Ptr, b: Ptr, rnd: Rnd) -> i32 {
        self.float_op(rop, a, b, |a, b, prec| a.add(b, prec, rnd))
    }

    fn mpfr_sub(&mut self, rop: Ptr, a: Ptr, b: Ptr, rnd: Rnd) -> i32 {
        self.float_op(rop, a, b, |a, b, prec| a.sub(b, prec, rnd))
    }

    fn mpfr_mul(&mut self, rop: Ptr, a: Ptr, b: Ptr, rnd: Rnd) -> i32 {
        self.float_op(rop, a, b, |a, b, prec| a.mul(b, prec, rnd))
    }

    fn mpfr_div(&mut self, rop: Ptr, a: Ptr, b: Ptr, rnd: Rnd) -> i32 {
        self.float_op(rop, a, b, |a, b, prec| a.div(b, prec, rnd))
    }

    fn mpfr_neg(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32 {
        let result = self.float(op).negated().round_to(self.prec(rop), rnd);
        self.store_float(rop, result)
    }

    fn mpfr_abs(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32 {
        let value = self.float(op);
        let magnitude = if value.neg && value.class != Class::Nan {
            value.negated()
        } else {
            value.clone()
        };
        let result = magnitude.round_to(self.prec(rop), rnd);
        self.store_float(rop, result)
    }

    fn mpfr_exp(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32 {
        let result = constants::exp(self.float(op), self.prec(rop), rnd);
        self.store_float(rop, result)
    }

    fn mpfr_nextabove(&mut self, x: Ptr) {
        let mut value = self.float(x).clone();
        value.step(true);
        self.store_float(x, (value, 0));
    }

    fn mpfr_nextbelow(&mut self, x: Ptr) {
        let mut value = self.float(x).clone();
        value.step(false);
        self.store_float(x, (value, 0));
    }

    fn mpfr_const_pi(&mut self, rop: Ptr, rnd: Rnd) -> i32 {
        let result = constants::pi(self.prec(rop), rnd);
        self.store_float(rop, result)
    }

    fn mpfr_const_euler(&mut self, rop: Ptr, rnd: Rnd) -> i32 {
        let result = constants::euler(self.prec(rop), rnd);
        self.store_float(rop, result)
    }

    fn mpfr_const_log2(&mut self, rop: Ptr, rnd: Rnd) -> i32 {
        let result = constants::log2(self.prec(rop), rnd);
        self.store_float(rop, result)
    }

    fn mpfr_const_catalan(&mut self, rop: Ptr, rnd: Rnd) -> i32 {
        let result = constants::catalan(self.prec(rop), rnd);
        self.store_float(rop, result)
    }

    fn mpfr_equal_p(&self, a: Ptr, b: Ptr) -> i32 {
        i32::from(self.float(a).partial_cmp(self.float(b)) == Some(Ordering::Equal))
    }

    fn mpfr_cmp(&self, a: Ptr, b: Ptr) -> i32 {
        self.float(a)
            .partial_cmp(self.float(b))
            .map_or(0, ordering_code)
    }

    fn mpfr_sgn(&self, op: Ptr) -> i32 {
        self.float(op).sign()
    }

    fn mpfr_nan_p(&self, op: Ptr) -> i32 {
        i32::from(self.float(op).class == Class::Nan)
    }

    fn mpfr_inf_p(&self, op: Ptr) -> i32 {
        i32::from(self.float(op).class == Class::Inf)
    }

    fn mpfr_zero_p(&self, op: Ptr) -> i32 {
        i32::from(self.float(op).class == Class::Zero)
    }

    fn mpfr_get_d(&self, op: Ptr, rnd: Rnd) -> f64 {
        self.float(op).to_f64(rnd)
    }

    fn mpfr_get_z(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32 {
        let value = self.float(op);
        let rounded = value.to_integer(rnd);
        let (num, den) = value.to_ratio();
        let ternary = ordering_code((&rounded * den).cmp(&num));
        self.set_int(rop, rounded);
        ternary
    }

    fn mpfr_get_q(&mut self, rop: Ptr, op: Ptr) {
        let (num, den) = self.float(op).to_ratio();
        self.set_ratio(rop, BigRational::new_raw(num, den));
    }

    fn mpfr_get_str(
        &mut self,
        exp_ptr: Ptr,
        base: u32,
        n_digits: usize,
        op: Ptr,
        rnd: Rnd,
    ) -> BindingResult<Ptr> {
        let value = self.float(op);
        let (text, exp) = match value.class {
            Class::Nan => ("@NaN@".to_string(), 0),
            Class::Inf if value.neg => ("-@Inf@".to_string(), 0),
            Class::Inf => ("@Inf@".to_string(), 0),
            Class::Zero => {
                let n = if n_digits == 0 {
                    default_digits(value.prec, base)
                } else {
                    n_digits
                };
                let sign = if value.neg { "-" } else { "" };
                (format!("{sign}{}", "0".repeat(n)), 0)
            }
            Class::Normal => value.digits(base, n_digits, rnd),
        };
        let exp = i32::try_from(exp).unwrap_or(if exp < 0 { i32::MIN } else { i32::MAX });
        let start = exp_ptr as usize;
        self.mem_mut()[start..start + 4].copy_from_slice(&exp.to_le_bytes());
        self.alloc_cstr(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcnum_binding::{read_cstr, read_i32, write_cstr};

    fn mpz(binding: &mut SoftBinding, value: i32) -> Ptr {
        let x = binding.mpz_t().unwrap();
        binding.mpz_init(x);
        binding.mpz_set_si(x, value);
        x
    }

    fn text_of_mpz(binding: &mut SoftBinding, x: Ptr) -> String {
        let s = binding.mpz_get_str(10, x).unwrap();
        let text = read_cstr(binding, s).unwrap();
        binding.free(s);
        text
    }

    #[test]
    fn integer_division_modes() {
        let mut b = SoftBinding::new();
        let n = mpz(&mut b, -7);
        let d = mpz(&mut b, 2);
        let q = mpz(&mut b, 0);
        b.mpz_tdiv_q(q, n, d);
        assert_eq!(b.mpz_get_si(q), -3);
        b.mpz_fdiv_q(q, n, d);
        assert_eq!(b.mpz_get_si(q), -4);
        b.mpz_cdiv_q(q, n, d);
        assert_eq!(b.mpz_get_si(q), -3);
        b.mpz_mod(q, n, d);
        assert_eq!(b.mpz_get_si(q), 1);
        b.mpz_fdiv_q_2exp(q, n, 1);
        assert_eq!(b.mpz_get_si(q), -4);
    }

    #[test]
    fn set_str_rejects_foreign_digits() {
        let mut b = SoftBinding::new();
        let x = mpz(&mut b, 0);
        for (text, base, ok) in [
            ("ff", 16, true),
            ("-1010", 2, true),
            ("12", 2, false),
            ("1_0", 10, false),
            ("", 10, false),
        ] {
            let s = write_cstr(&mut b, text).unwrap();
            assert_eq!(b.mpz_set_str(x, s, base) == 0, ok, "{text} in base {base}");
            b.free(s);
        }
        assert_eq!(text_of_mpz(&mut b, x), "-10");
    }

    #[test]
    fn rationals_expose_embedded_integers() {
        let mut b = SoftBinding::new();
        let q = b.mpq_t().unwrap();
        b.mpq_init(q);
        b.mpq_set_si(q, 6, 8);
        b.mpq_canonicalize(q);
        assert_eq!(b.mpz_get_si(b.mpq_numref(q)), 3);
        assert_eq!(b.mpz_get_si(b.mpq_denref(q)), 4);

        let s = write_cstr(&mut b, "-10/4").unwrap();
        assert_eq!(b.mpq_set_str(q, s, 10), 0);
        b.free(s);
        b.mpq_canonicalize(q);
        let s = b.mpq_get_str(10, q).unwrap();
        assert_eq!(read_cstr(&b, s).unwrap(), "-5/2");
        b.free(s);
        assert_eq!(b.mpq_sgn(q), -1);
    }

    #[test]
    fn float_string_reports_the_exponent() {
        let mut b = SoftBinding::new();
        let x = b.mpfr_t().unwrap();
        b.mpfr_init2(x, 53);
        b.mpfr_set_d(x, 1234.5, Rnd::Nearest);
        let exp_ptr = b.malloc(4).unwrap();
        let s = b.mpfr_get_str(exp_ptr, 10, 6, x, Rnd::Nearest).unwrap();
        assert_eq!(read_cstr(&b, s).unwrap(), "123450");
        assert_eq!(read_i32(&b, exp_ptr), Ok(4));
        b.free(s);
        b.free(exp_ptr);
    }

    #[test]
    fn float_to_integer_reports_direction() {
        let mut b = SoftBinding::new();
        let x = b.mpfr_t().unwrap();
        b.mpfr_init2(x, 53);
        b.mpfr_set_d(x, 2.75, Rnd::Nearest);
        let z = mpz(&mut b, 0);
        assert_eq!(b.mpfr_get_z(z, x, Rnd::Down), -1);
        assert_eq!(b.mpz_get_si(z), 2);
        assert_eq!(b.mpfr_get_z(z, x, Rnd::Up), 1);
        assert_eq!(b.mpz_get_si(z), 3);
    }

    #[test]
    fn clearing_releases_side_tables_and_memory() {
        let mut b = SoftBinding::new();
        let x = mpz(&mut b, 5);
        let q = b.mpq_t().unwrap();
        b.mpq_init(q);
        assert_eq!(b.live_integers(), 3);
        assert_eq!(b.live_allocations(), 2);
        b.mpz_clear(x);
        b.mpz_t_free(x);
        b.mpq_clear(q);
        b.mpq_t_free(q);
        assert_eq!(b.live_integers(), 0);
        assert_eq!(b.live_allocations(), 0);
    }

    #[test]
    #[should_panic(expected = "not initialized")]
    fn uninitialized_access_aborts() {
        let mut b = SoftBinding::new();
        let x = b.mpz_t().unwrap();
        b.mpz_sgn(x);
    }
}
