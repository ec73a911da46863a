//! The reference binding driven only through the `Binding` trait, the way
//! a consumer sees a native build.

use calcnum_binding::{Binding, BindingError, Rnd, read_cstr, read_i32, write_cstr};
use calcnum_soft::SoftBinding;

fn take(binding: &mut dyn Binding, ptr: u32) -> String {
    let text = read_cstr(binding, ptr).unwrap();
    binding.free(ptr);
    text
}

#[test]
fn text_crosses_the_boundary_intact() {
    let mut binding = SoftBinding::new();
    let ptr = write_cstr(&mut binding, "π ≈ 3.14").unwrap();
    assert_eq!(read_cstr(&binding, ptr).unwrap(), "π ≈ 3.14");
    binding.free(ptr);
    assert_eq!(binding.live_allocations(), 0);
}

#[test]
fn integer_lifecycle_balances_the_heap() {
    let mut binding = SoftBinding::new();
    let a = binding.mpz_t().unwrap();
    binding.mpz_init(a);
    let s = write_cstr(&mut binding, "-123456789012345678901234567890").unwrap();
    assert_eq!(binding.mpz_set_str(a, s, 10), 0);
    binding.free(s);

    let sq = binding.mpz_t().unwrap();
    binding.mpz_init(sq);
    binding.mpz_mul(sq, a, a);
    let out = binding.mpz_get_str(10, sq).unwrap();
    assert_eq!(
        take(&mut binding, out),
        "15241578753238836750495351562536198787501905199875019052100"
    );

    for x in [a, sq] {
        binding.mpz_clear(x);
        binding.mpz_t_free(x);
    }
    assert_eq!(binding.live_allocations(), 0);
    assert_eq!(binding.live_integers(), 0);
}

#[test]
fn rational_strings_are_canonical_after_canonicalize() {
    let mut binding = SoftBinding::new();
    let q = binding.mpq_t().unwrap();
    binding.mpq_init(q);
    let s = write_cstr(&mut binding, "-18/12").unwrap();
    assert_eq!(binding.mpq_set_str(q, s, 10), 0);
    binding.free(s);
    binding.mpq_canonicalize(q);
    let out = binding.mpq_get_str(10, q).unwrap();
    assert_eq!(take(&mut binding, out), "-3/2");
    assert_eq!(binding.mpz_get_si(binding.mpq_denref(q)), 2);
    binding.mpq_clear(q);
    binding.mpq_t_free(q);
    assert_eq!(binding.live_allocations(), 0);
}

#[test]
fn float_digits_and_exponent() {
    let mut binding = SoftBinding::new();
    let x = binding.mpfr_t().unwrap();
    binding.mpfr_init2(x, 53);
    binding.mpfr_set_d(x, -1234.5, Rnd::Nearest);

    let exp = binding.malloc(4).unwrap();
    let out = binding.mpfr_get_str(exp, 10, 6, x, Rnd::Nearest).unwrap();
    assert_eq!(take(&mut binding, out), "-123450");
    assert_eq!(read_i32(&binding, exp), Ok(4));
    binding.free(exp);

    binding.mpfr_clear(x);
    binding.mpfr_t_free(x);
    assert_eq!(binding.live_allocations(), 0);
    assert_eq!(binding.live_floats(), 0);
}

#[test]
fn reads_past_the_heap_are_errors() {
    let binding = SoftBinding::new();
    let end = binding.mem().len() as u32;
    assert_eq!(
        read_i32(&binding, end - 2),
        Err(BindingError::OutOfBounds { ptr: end - 2, len: 4 })
    );
    assert_eq!(read_i32(&binding, end - 4), Ok(0));
}

#[test]
fn exhausted_heap_reports_out_of_memory() {
    let mut binding = SoftBinding::with_heap_limit(32);
    let first = binding.mpz_t().unwrap();
    let err = binding.mpq_t().unwrap_err();
    assert_eq!(err, BindingError::OutOfMemory { requested: 32 });
    binding.free(first);
    assert!(binding.mpz_t().is_ok());
}
