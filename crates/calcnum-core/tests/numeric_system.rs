//! End-to-end behavior of a numeric system over the reference binding.

use calcnum_binding::Binding;
use calcnum_core::{
    CalcError, Calculate, CalculateOptions, DivMode, FloatOptions, RoundingMode, ValueKind, init,
};
use calcnum_soft::SoftBinding;
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn system() -> (Calculate, Rc<RefCell<SoftBinding>>) {
    let binding = Rc::new(RefCell::new(SoftBinding::new()));
    let calc = init(Rc::clone(&binding), CalculateOptions::default()).unwrap();
    (calc, binding)
}

#[test]
fn text_and_number_integers_add() {
    let (calc, _) = system();
    let forty = calc.integer("40").unwrap();
    let thirty = calc.integer(30).unwrap();
    assert_eq!(thirty.add(&forty).unwrap().to_number().unwrap(), 70.0);
}

#[test]
fn rational_parts_are_visible_through_the_binding() {
    let (calc, binding) = system();
    let q = calc.ratio(3, 4).unwrap();
    let ptr = q.raw().unwrap();
    let b = binding.borrow();
    assert_eq!(b.mpz_get_si(b.mpq_numref(ptr)), 3);
    assert_eq!(b.mpz_get_si(b.mpq_denref(ptr)), 4);
}

#[test]
fn halves_sum_to_one_and_signs_normalize() {
    let (calc, _) = system();
    let half = calc.ratio(1, 2).unwrap();
    assert!(half.add(&half).unwrap().is_equal(&calc.ratio(1, 1).unwrap()).unwrap());
    let a = calc.ratio(-1, 2).unwrap();
    let b = calc.ratio(1, -2).unwrap();
    assert!(a.is_equal(&b).unwrap());
}

#[test]
fn every_division_by_zero_raises() {
    let (calc, _) = system();
    let int = calc.integer(10).unwrap();
    let zero_int = calc.integer(0).unwrap();
    for mode in [DivMode::Truncate, DivMode::Floor, DivMode::Ceil] {
        assert!(matches!(int.div(&zero_int, mode), Err(CalcError::DivisionByZero)));
    }
    assert!(matches!(int.modulo(0), Err(CalcError::DivisionByZero)));

    let q = calc.ratio(1, 3).unwrap();
    let zero_q = calc.rational(0).unwrap();
    assert!(matches!(q.div(&zero_q), Err(CalcError::DivisionByZero)));
    assert!(matches!(zero_q.invert(), Err(CalcError::DivisionByZero)));

    let x = calc.float(2.5).unwrap();
    let zero_x = calc.float(0).unwrap();
    assert!(matches!(x.div(&zero_x), Err(CalcError::DivisionByZero)));
    assert!(matches!(x.div(0.0), Err(CalcError::DivisionByZero)));
}

#[test]
fn destroyed_values_are_rejected() {
    let (calc, binding) = system();
    let a = calc.integer(5).unwrap();
    let q = calc.ratio(1, 7).unwrap();
    let x = calc.float(1.25).unwrap();
    let before = binding.borrow().live_allocations();

    assert_eq!(calc.integers().destroy(), 1);
    assert_eq!(calc.rationals().destroy(), 1);
    assert_eq!(calc.floats().destroy(), 1);
    assert_eq!(binding.borrow().live_allocations(), before - 3);

    assert!(matches!(
        a.add(1),
        Err(CalcError::UseAfterRelease { kind: ValueKind::Integer })
    ));
    assert!(matches!(
        q.to_number(),
        Err(CalcError::UseAfterRelease { kind: ValueKind::Rational })
    ));
    assert!(matches!(
        x.sign(),
        Err(CalcError::UseAfterRelease { kind: ValueKind::Float })
    ));
    assert_eq!(a.to_string(), "<released>");

    assert_eq!(calc.integers().destroy(), 0);
    let fresh = calc.integer(6).unwrap();
    assert_eq!(fresh.mul(7).unwrap().to_number().unwrap(), 42.0);
    assert!(matches!(
        fresh.add(&a),
        Err(CalcError::UseAfterRelease { kind: ValueKind::Integer })
    ));
}

#[test]
fn rendering_frees_its_string_buffers() {
    let (calc, binding) = system();
    let a = calc.integer("123456789012345678901234567890").unwrap();
    let q = calc.ratio(-22, 7).unwrap();
    let x = calc.pi(None).unwrap();
    let before = binding.borrow().live_allocations();
    assert_eq!(a.to_string(), "123456789012345678901234567890");
    assert_eq!(q.to_string(), "-22/7");
    assert_eq!(x.to_string_with(10, true).unwrap(), "3.14159265358979");
    assert_eq!(x.to_str_radix(16).unwrap().len(), "3.243f6a8885a3".len());
    assert_eq!(binding.borrow().live_allocations(), before);
}

#[test]
fn pi_digits_are_prefix_consistent() {
    let (calc, _) = system();
    let options = |bits| FloatOptions::new(bits, RoundingMode::TowardZero);
    let reference = calc.pi(Some(options(400))).unwrap().to_string_with(10, true).unwrap();
    let mut previous_len = 0;
    for bits in 10..=100 {
        let text = calc.pi(Some(options(bits))).unwrap().to_string_with(10, true).unwrap();
        let stable = &text[..text.len() - 1];
        assert!(reference.starts_with(stable), "{bits} bits: {text} vs {reference}");
        assert!(text.len() + 1 >= previous_len, "{bits} bits shortened the output");
        previous_len = text.len();
    }
}

#[test]
fn allocation_failure_registers_nothing() {
    let binding = Rc::new(RefCell::new(SoftBinding::with_heap_limit(64)));
    let calc = init(Rc::clone(&binding), CalculateOptions::default()).unwrap();
    let mut values = Vec::new();
    let err = loop {
        match calc.integer(values.len() as i32) {
            Ok(value) => values.push(value),
            Err(err) => break err,
        }
    };
    assert!(matches!(err, CalcError::AllocationFailure(_)));
    assert!(!values.is_empty());
    assert_eq!(calc.integers().live_values(), values.len());
    assert_eq!(binding.borrow().live_integers(), values.len());
}

#[test]
fn toml_options_configure_float_defaults() {
    let options = CalculateOptions::from_toml_str(
        r#"
        precision_bits = 128
        rounding_mode = "toward_zero"
        "#,
    )
    .unwrap();
    let binding = Rc::new(RefCell::new(SoftBinding::new()));
    let calc = init(binding, options).unwrap();
    let third = calc.ratio(1, 3).unwrap().to_float().unwrap();
    assert_eq!(third.precision_bits(), 128);
    assert_eq!(third.rounding_mode(), RoundingMode::TowardZero);
    assert!(third.less_than(&calc.ratio(1, 3).unwrap().to_float_with(
        FloatOptions::new(128, RoundingMode::Up)
    ).unwrap()).unwrap());

    let err = CalculateOptions::from_toml_str("rounding_mode = \"sideways\"").unwrap_err();
    assert!(matches!(err, CalcError::Config(_)));
}

#[test]
fn conversions_need_a_live_sibling_context() {
    let (calc, binding) = system();
    let n = calc.integer(12).unwrap();
    drop(calc);
    assert_eq!(n.add(1).unwrap().to_number().unwrap(), 13.0);
    assert!(matches!(
        n.to_float(),
        Err(CalcError::ContextUnavailable { kind: ValueKind::Float })
    ));
    assert!(matches!(
        n.to_rational(),
        Err(CalcError::ContextUnavailable { kind: ValueKind::Rational })
    ));
    drop(n);
    assert_eq!(binding.borrow().live_allocations(), 0);
}

#[test]
fn values_from_different_bindings_do_not_mix() {
    let (left, _) = system();
    let (right, _) = system();
    let a = left.integer(1).unwrap();
    let b = right.integer(2).unwrap();
    assert!(matches!(a.add(&b), Err(CalcError::ForeignValue)));
    let x = left.float(1).unwrap();
    assert!(matches!(right.float(&x), Err(CalcError::ForeignValue)));
}

#[test]
fn dropping_the_system_releases_everything() {
    let (calc, binding) = system();
    {
        let a = calc.integer(3).unwrap();
        let q = a.to_rational().unwrap().invert().unwrap();
        let x = q.to_float().unwrap().next_above().unwrap();
        assert!(x.greater_than(&q.to_float().unwrap()).unwrap());
    }
    assert!(binding.borrow().live_allocations() > 0);
    drop(calc);
    let b = binding.borrow();
    assert_eq!(b.live_allocations(), 0);
    assert_eq!(b.live_integers(), 0);
    assert_eq!(b.live_floats(), 0);
}

proptest! {
    #[test]
    fn integer_addition_matches_host(a in -1_000_000i32..1_000_000, b in -1_000_000i32..1_000_000) {
        let (calc, _) = system();
        let sum = calc.integer(a).unwrap().add(&calc.integer(b).unwrap()).unwrap();
        prop_assert_eq!(sum.to_number().unwrap(), f64::from(a) + f64::from(b));
    }

    #[test]
    fn rationals_are_canonical(n in -10_000i32..10_000, d in -10_000i32..10_000) {
        prop_assume!(d != 0);
        let (calc, _) = system();
        let q = calc.ratio(n, d).unwrap();
        let num = q.numerator().unwrap();
        let den = q.denominator().unwrap();
        prop_assert_eq!(den.sign().unwrap(), 1);
        prop_assert!(num.gcd(&den).unwrap().is_equal(1).unwrap());
        let expected = f64::from(n) / f64::from(d);
        prop_assert!((q.to_number().unwrap() - expected).abs() <= expected.abs() * 1e-15);
    }

    #[test]
    fn rational_text_round_trips(n in -10_000i32..10_000, d in 1i32..10_000) {
        let (calc, _) = system();
        let q = calc.ratio(n, d).unwrap();
        let text = q.to_string();
        let parsed = calc.rational(&text).unwrap();
        prop_assert!(parsed.is_equal(&q).unwrap(), "{} did not round-trip", text);
    }
}
