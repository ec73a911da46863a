//! The primitive interface.
//!
//! Naming follows the native libraries the interface mirrors (`mpz_*`,
//! `mpq_*`, `mpfr_*`) so a binding over a real GMP/MPFR build is a thin
//! forwarding layer. Output operands come first (`rop`), inputs after, as
//! in the native calling convention. Output and input may alias.
//!
//! Handles are addresses of native structures inside the binding's
//! linear memory. A handle goes through `*_t` (storage), `*_init`
//! (construction), any number of operations, `*_clear` (destruction) and
//! `*_t_free` (storage release). Using a handle outside that window is
//! undefined at this layer.

use crate::error::BindingResult;
use crate::rnd::Rnd;

/// Address in a binding's linear memory. `0` is the null address.
pub type Ptr = u32;

/// Primitive big-number layer over a linear memory.
///
/// Implementations are single-threaded; callers share one binding as
/// `Rc<RefCell<dyn Binding>>`.
pub trait Binding {
    // ── Linear memory ────────────────────────────────────────────────

    /// Allocate `size` bytes of linear memory.
    fn malloc(&mut self, size: usize) -> BindingResult<Ptr>;

    /// Release memory obtained from [`Binding::malloc`] or returned by a
    /// `*_get_str` primitive. Freeing `0` is a no-op.
    fn free(&mut self, ptr: Ptr);

    /// Read view of the whole linear memory.
    fn mem(&self) -> &[u8];

    /// Write view of the whole linear memory.
    fn mem_mut(&mut self) -> &mut [u8];

    // ── Integers ─────────────────────────────────────────────────────

    fn mpz_t(&mut self) -> BindingResult<Ptr>;
    fn mpz_init(&mut self, x: Ptr);
    fn mpz_clear(&mut self, x: Ptr);
    fn mpz_t_free(&mut self, x: Ptr);

    fn mpz_set(&mut self, rop: Ptr, op: Ptr);
    fn mpz_set_si(&mut self, rop: Ptr, op: i32);
    /// Parse the NUL-terminated string at `s`. Returns `0` on success and
    /// `-1` when the text is not a valid integer in `base`.
    fn mpz_set_str(&mut self, rop: Ptr, s: Ptr, base: u32) -> i32;

    fn mpz_add(&mut self, rop: Ptr, a: Ptr, b: Ptr);
    fn mpz_sub(&mut self, rop: Ptr, a: Ptr, b: Ptr);
    fn mpz_mul(&mut self, rop: Ptr, a: Ptr, b: Ptr);
    /// Quotient truncated toward zero. `d` must be non-zero.
    fn mpz_tdiv_q(&mut self, q: Ptr, n: Ptr, d: Ptr);
    /// Quotient rounded toward negative infinity. `d` must be non-zero.
    fn mpz_fdiv_q(&mut self, q: Ptr, n: Ptr, d: Ptr);
    /// Quotient rounded toward positive infinity. `d` must be non-zero.
    fn mpz_cdiv_q(&mut self, q: Ptr, n: Ptr, d: Ptr);
    /// Non-negative remainder of `n` modulo `|d|`. `d` must be non-zero.
    fn mpz_mod(&mut self, r: Ptr, n: Ptr, d: Ptr);
    fn mpz_pow_ui(&mut self, rop: Ptr, base: Ptr, exp: u32);
    fn mpz_neg(&mut self, rop: Ptr, op: Ptr);
    fn mpz_abs(&mut self, rop: Ptr, op: Ptr);
    fn mpz_gcd(&mut self, rop: Ptr, a: Ptr, b: Ptr);
    fn mpz_lcm(&mut self, rop: Ptr, a: Ptr, b: Ptr);
    /// Truncated square root. `op` must be non-negative.
    fn mpz_sqrt(&mut self, rop: Ptr, op: Ptr);
    fn mpz_mul_2exp(&mut self, rop: Ptr, op: Ptr, bits: u32);
    fn mpz_fdiv_q_2exp(&mut self, rop: Ptr, op: Ptr, bits: u32);

    fn mpz_cmp(&self, a: Ptr, b: Ptr) -> i32;
    fn mpz_sgn(&self, op: Ptr) -> i32;
    fn mpz_get_si(&self, op: Ptr) -> i64;
    fn mpz_get_d(&self, op: Ptr) -> f64;
    /// Render `op` in `base` into freshly allocated memory. The caller owns
    /// the returned buffer and must [`Binding::free`] it.
    fn mpz_get_str(&mut self, base: u32, op: Ptr) -> BindingResult<Ptr>;

    // ── Rationals ────────────────────────────────────────────────────

    fn mpq_t(&mut self) -> BindingResult<Ptr>;
    fn mpq_init(&mut self, x: Ptr);
    fn mpq_clear(&mut self, x: Ptr);
    fn mpq_t_free(&mut self, x: Ptr);

    /// Address of the numerator integer embedded in `x`.
    fn mpq_numref(&self, x: Ptr) -> Ptr;
    /// Address of the denominator integer embedded in `x`.
    fn mpq_denref(&self, x: Ptr) -> Ptr;

    fn mpq_set(&mut self, rop: Ptr, op: Ptr);
    /// Set `rop` to `num/den` without canonicalizing.
    fn mpq_set_si(&mut self, rop: Ptr, num: i32, den: u32);
    fn mpq_set_z(&mut self, rop: Ptr, op: Ptr);
    /// Parse `"n"` or `"n/d"` without canonicalizing. Returns `0` on
    /// success, `-1` on malformed text.
    fn mpq_set_str(&mut self, rop: Ptr, s: Ptr, base: u32) -> i32;
    /// Reduce to lowest terms with a positive denominator. The denominator
    /// must be non-zero.
    fn mpq_canonicalize(&mut self, x: Ptr);

    fn mpq_add(&mut self, rop: Ptr, a: Ptr, b: Ptr);
    fn mpq_sub(&mut self, rop: Ptr, a: Ptr, b: Ptr);
    fn mpq_mul(&mut self, rop: Ptr, a: Ptr, b: Ptr);
    /// `b` must be non-zero.
    fn mpq_div(&mut self, rop: Ptr, a: Ptr, b: Ptr);
    fn mpq_neg(&mut self, rop: Ptr, op: Ptr);
    /// `op` must be non-zero.
    fn mpq_inv(&mut self, rop: Ptr, op: Ptr);
    fn mpq_abs(&mut self, rop: Ptr, op: Ptr);

    fn mpq_equal(&self, a: Ptr, b: Ptr) -> i32;
    fn mpq_cmp(&self, a: Ptr, b: Ptr) -> i32;
    fn mpq_sgn(&self, op: Ptr) -> i32;
    fn mpq_get_d(&self, op: Ptr) -> f64;
    /// Render `op` as `"n"` or `"n/d"`. The caller frees the buffer.
    fn mpq_get_str(&mut self, base: u32, op: Ptr) -> BindingResult<Ptr>;

    // ── Floats ───────────────────────────────────────────────────────

    fn mpfr_t(&mut self) -> BindingResult<Ptr>;
    /// Initialize `x` with `prec` bits of precision; the value is NaN.
    fn mpfr_init2(&mut self, x: Ptr, prec: u32);
    fn mpfr_clear(&mut self, x: Ptr);
    fn mpfr_t_free(&mut self, x: Ptr);
    fn mpfr_get_prec(&self, x: Ptr) -> u32;

    // Setters and arithmetic return the ternary value: the sign of
    // (stored result - exact result).
    fn mpfr_set(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32;
    fn mpfr_set_si(&mut self, rop: Ptr, op: i32, rnd: Rnd) -> i32;
    fn mpfr_set_d(&mut self, rop: Ptr, op: f64, rnd: Rnd) -> i32;
    fn mpfr_set_z(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32;
    fn mpfr_set_q(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32;
    /// Parse the whole NUL-terminated string at `s`. Returns `0` on
    /// success, `-1` on malformed text.
    fn mpfr_set_str(&mut self, rop: Ptr, s: Ptr, base: u32, rnd: Rnd) -> i32;

    fn mpfr_add(&mut self, rop: Ptr, a: Ptr, b: Ptr, rnd: Rnd) -> i32;
    fn mpfr_sub(&mut self, rop: Ptr, a: Ptr, b: Ptr, rnd: Rnd) -> i32;
    fn mpfr_mul(&mut self, rop: Ptr, a: Ptr, b: Ptr, rnd: Rnd) -> i32;
    /// Division by zero yields an infinity (or NaN for `0/0`).
    fn mpfr_div(&mut self, rop: Ptr, a: Ptr, b: Ptr, rnd: Rnd) -> i32;
    fn mpfr_neg(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32;
    fn mpfr_abs(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32;
    fn mpfr_exp(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32;

    /// Replace `x` by the next representable value toward +∞, in place.
    fn mpfr_nextabove(&mut self, x: Ptr);
    /// Replace `x` by the next representable value toward −∞, in place.
    fn mpfr_nextbelow(&mut self, x: Ptr);

    fn mpfr_const_pi(&mut self, rop: Ptr, rnd: Rnd) -> i32;
    fn mpfr_const_euler(&mut self, rop: Ptr, rnd: Rnd) -> i32;
    fn mpfr_const_log2(&mut self, rop: Ptr, rnd: Rnd) -> i32;
    fn mpfr_const_catalan(&mut self, rop: Ptr, rnd: Rnd) -> i32;

    fn mpfr_equal_p(&self, a: Ptr, b: Ptr) -> i32;
    /// Three-way compare; returns `0` when either operand is NaN.
    fn mpfr_cmp(&self, a: Ptr, b: Ptr) -> i32;
    fn mpfr_sgn(&self, op: Ptr) -> i32;
    fn mpfr_nan_p(&self, op: Ptr) -> i32;
    fn mpfr_inf_p(&self, op: Ptr) -> i32;
    fn mpfr_zero_p(&self, op: Ptr) -> i32;
    fn mpfr_get_d(&self, op: Ptr, rnd: Rnd) -> f64;
    /// Round `op` to an integer stored in the `mpz` at `rop`.
    fn mpfr_get_z(&mut self, rop: Ptr, op: Ptr, rnd: Rnd) -> i32;
    /// Store the exact value of `op` in the `mpq` at `rop`.
    fn mpfr_get_q(&mut self, rop: Ptr, op: Ptr);
    /// Render `n_digits` significant digits of `op` in `base` (`0` picks
    /// enough digits to round-trip). The value is `0.DIGITS × base^exp`;
    /// `exp` is written as a little-endian `i32` at `exp_ptr`. The caller
    /// frees the returned buffer.
    fn mpfr_get_str(
        &mut self,
        exp_ptr: Ptr,
        base: u32,
        n_digits: usize,
        op: Ptr,
        rnd: Rnd,
    ) -> BindingResult<Ptr>;
}
