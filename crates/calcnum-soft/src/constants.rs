//! Mathematical constants and `exp` by fixed-point series.
//!
//! Each series is evaluated as an integer `F ≈ C × 2^w` with `w` carrying
//! guard bits well past the requested precision, then rounded once with a
//! sticky bit (the constants are irrational, so the result is never
//! exact).

use crate::float::{Class, SoftFloat};
use calcnum_binding::Rnd;
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Inputs to `exp` at or beyond `2^EXP_LIMIT_BITS` saturate.
const EXP_LIMIT_BITS: i64 = 40;

fn guard_bits(prec: u32) -> u32 {
    32 + (32 - prec.leading_zeros())
}

fn finish(prec: u32, fixed: BigUint, w: u32, rnd: Rnd) -> (SoftFloat, i32) {
    SoftFloat::round(prec, false, fixed, -i64::from(w), true, rnd)
}

/// `atan(1/x) × 2^w` by the alternating Gregory series.
fn atan_inv(x: u32, w: u32) -> BigInt {
    let x2 = BigInt::from(x) * x;
    let mut term = (BigInt::one() << w) / x;
    let mut sum = BigInt::zero();
    let mut k = 0u64;
    loop {
        let part = &term / (2 * k + 1);
        if part.is_zero() {
            break;
        }
        if k % 2 == 0 {
            sum += part;
        } else {
            sum -= part;
        }
        term /= &x2;
        k += 1;
    }
    sum
}

/// `π × 2^w` via Machin's formula.
pub(crate) fn pi_fixed(w: u32) -> BigUint {
    let pi = atan_inv(5, w) * 16u32 - atan_inv(239, w) * 4u32;
    pi.to_biguint().unwrap_or_default()
}

/// `ln 2 × 2^w` from `Σ 1/(k·2^k)`.
pub(crate) fn log2_fixed(w: u32) -> BigUint {
    let one = BigUint::one() << w;
    let mut sum = BigUint::zero();
    for k in 1..=u64::from(w) {
        let term = (&one >> k) / k;
        if term.is_zero() {
            break;
        }
        sum += term;
    }
    sum
}

/// Catalan's constant `× 2^w`:
/// `G = π/8 · ln(2+√3) + 3/8 · Σ (k!)² / ((2k)! (2k+1)²)`.
pub(crate) fn catalan_fixed(w: u32) -> BigUint {
    let one = BigUint::one() << w;

    let mut t = one.clone();
    let mut series = one.clone();
    let mut k = 1u64;
    loop {
        t = t * k / (2 * (2 * k - 1));
        if t.is_zero() {
            break;
        }
        let odd = 2 * k + 1;
        series += &t / (odd * odd);
        k += 1;
    }

    // ln(2+√3) = 2·atanh(1/√3) = (2/√3) Σ 3^-k / (2k+1)
    let inv_sqrt3 = ((BigUint::one() << (2 * w)) / 3u32).sqrt();
    let mut u = inv_sqrt3.clone();
    let mut log = inv_sqrt3;
    let mut k = 1u64;
    loop {
        u /= 3u32;
        if u.is_zero() {
            break;
        }
        log += &u / (2 * k + 1);
        k += 1;
    }
    log <<= 1u32;

    let pi_log = (pi_fixed(w) * log) >> w;
    (pi_log + series * 3u32) >> 3u32
}

/// Euler–Mascheroni constant `× 2^w` by Brent–McMillan:
/// `γ ≈ U/V`, `V = Σ (N^k/k!)²`, `U = Σ (N^k/k!)² (H_k − ln N)`.
pub(crate) fn euler_fixed(w: u32) -> BigUint {
    let n = (u64::from(w) / 4 + 1).next_power_of_two();
    let log_n = BigInt::from(log2_fixed(w)) * n.trailing_zeros();
    let n2 = BigInt::from(n) * n;

    let mut b = BigInt::one() << w;
    let mut a = -log_n;
    let mut u = a.clone();
    let mut v = b.clone();
    let mut k = 1u64;
    loop {
        b = b * &n2 / (k * k);
        a = (a * &n2 / k + &b) / k;
        if a.is_zero() && b.is_zero() {
            break;
        }
        u += &a;
        v += &b;
        k += 1;
    }
    ((u << w) / v).to_biguint().unwrap_or_default()
}

pub(crate) fn pi(prec: u32, rnd: Rnd) -> (SoftFloat, i32) {
    let w = prec + guard_bits(prec);
    finish(prec, pi_fixed(w), w, rnd)
}

pub(crate) fn log2(prec: u32, rnd: Rnd) -> (SoftFloat, i32) {
    let w = prec + guard_bits(prec);
    finish(prec, log2_fixed(w), w, rnd)
}

pub(crate) fn catalan(prec: u32, rnd: Rnd) -> (SoftFloat, i32) {
    let w = prec + guard_bits(prec);
    finish(prec, catalan_fixed(w), w, rnd)
}

pub(crate) fn euler(prec: u32, rnd: Rnd) -> (SoftFloat, i32) {
    let w = prec + guard_bits(prec);
    finish(prec, euler_fixed(w), w, rnd)
}

/// `e^x` by reduction `x = n·ln2 + r` and a Taylor series in `r`.
pub(crate) fn exp(x: &SoftFloat, prec: u32, rnd: Rnd) -> (SoftFloat, i32) {
    match x.class {
        Class::Nan => return (SoftFloat::nan(prec), 0),
        Class::Inf if x.neg => return (SoftFloat::zero(prec, false), 0),
        Class::Inf => return (SoftFloat::inf(prec, false), 0),
        Class::Zero => return SoftFloat::from_bigint(prec, &BigInt::one(), rnd),
        Class::Normal => {}
    }
    let top = x.exp + i64::from(x.prec);
    if top > EXP_LIMIT_BITS {
        return if x.neg {
            (SoftFloat::zero(prec, false), -1)
        } else {
            (SoftFloat::inf(prec, false), 1)
        };
    }

    let w = prec + guard_bits(prec) + top.max(0) as u32 + 1;
    let shift = x.exp + i64::from(w);
    let magnitude = if shift >= 0 {
        BigInt::from(x.mant.clone()) << shift as u64
    } else {
        BigInt::from(x.mant.clone()) >> shift.unsigned_abs()
    };
    let fixed_x = if x.neg { -magnitude } else { magnitude };

    let ln2 = BigInt::from(log2_fixed(w));
    let half = &ln2 >> 1u32;
    let n = if fixed_x.is_negative() {
        -((-&fixed_x + &half) / &ln2)
    } else {
        (&fixed_x + &half) / &ln2
    };
    let r = fixed_x - &n * &ln2;

    let one = BigInt::one() << w;
    let mut term = one.clone();
    let mut sum = one;
    let mut k = 1u64;
    loop {
        term = ((term * &r) >> w) / k;
        if term.is_zero() {
            break;
        }
        sum += &term;
        k += 1;
    }

    let n = n.to_i64().unwrap_or(0);
    let mant = sum.to_biguint().unwrap_or_default();
    SoftFloat::round(prec, false, mant, n - i64::from(w), true, rnd)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PI: &str = "31415926535897932384626433832795028841971693993751";
    const E: &str = "27182818284590452353602874713526624977572470936999";
    const LOG2: &str = "69314718055994530941723212145817656807550013436025";
    const EULER: &str = "57721566490153286060651209008240243104215933593992";
    const CATALAN: &str = "91596559417721901505460351493238411077414937428167";

    fn leading_digits(value: &SoftFloat) -> String {
        value.digits(10, 48, Rnd::TowardZero).0
    }

    #[test]
    fn pi_matches_reference_digits() {
        assert_eq!(leading_digits(&pi(200, Rnd::Nearest).0), PI[..48]);
    }

    #[test]
    fn log2_matches_reference_digits() {
        assert_eq!(leading_digits(&log2(200, Rnd::Nearest).0), LOG2[..48]);
    }

    #[test]
    fn catalan_matches_reference_digits() {
        assert_eq!(leading_digits(&catalan(200, Rnd::Nearest).0), CATALAN[..48]);
    }

    #[test]
    fn euler_matches_reference_digits() {
        assert_eq!(leading_digits(&euler(200, Rnd::Nearest).0), EULER[..48]);
    }

    #[test]
    fn exp_of_one_is_e() {
        let one = SoftFloat::from_f64(200, 1.0, Rnd::Nearest).0;
        assert_eq!(leading_digits(&exp(&one, 200, Rnd::Nearest).0), E[..48]);
    }

    #[test]
    fn exp_handles_negative_and_zero_arguments() {
        let minus_two = SoftFloat::from_f64(53, -2.0, Rnd::Nearest).0;
        let value = exp(&minus_two, 53, Rnd::Nearest).0.to_f64(Rnd::Nearest);
        assert!((value - (-2.0f64).exp()).abs() < 1e-16);
        let zero = SoftFloat::zero(53, false);
        assert_eq!(exp(&zero, 53, Rnd::Nearest).0.to_f64(Rnd::Nearest), 1.0);
    }

    #[test]
    fn directed_rounding_brackets_pi() {
        let below = pi(64, Rnd::Down).0;
        let above = pi(64, Rnd::Up).0;
        let mut stepped = below.clone();
        stepped.step(true);
        assert_eq!(stepped.partial_cmp(&above), Some(std::cmp::Ordering::Equal));
    }
}
