//! Shape checks for numeric literals before they cross into native memory.

use crate::error::{CalcError, CalcResult};
use regex::Regex;
use std::sync::OnceLock;

fn integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?[0-9a-zA-Z]+$").expect("integer regex must compile"))
}

fn rational_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?[0-9a-zA-Z]+(?:/[+-]?[0-9a-zA-Z]+)?$")
            .expect("rational regex must compile")
    })
}

fn float_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE@][+-]?[0-9]+)?$")
            .expect("float regex must compile")
    })
}

fn float_special_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[+-]?(?:nan|inf|infinity|@nan@|@inf@)$")
            .expect("float special regex must compile")
    })
}

pub(crate) fn check_radix(radix: u32) -> CalcResult<()> {
    if (2..=36).contains(&radix) {
        Ok(())
    } else {
        Err(CalcError::invalid(format!("radix {radix} is outside 2..=36")))
    }
}

fn digits_fit(text: &str, radix: u32) -> bool {
    text.chars()
        .filter(|c| !matches!(c, '+' | '-' | '/'))
        .all(|c| c.is_digit(radix))
}

pub(crate) fn check_integer(text: &str, radix: u32) -> CalcResult<()> {
    check_radix(radix)?;
    if integer_re().is_match(text) && digits_fit(text, radix) {
        Ok(())
    } else {
        Err(CalcError::invalid(format!(
            "`{text}` is not a base-{radix} integer"
        )))
    }
}

pub(crate) fn check_rational(text: &str, radix: u32) -> CalcResult<()> {
    check_radix(radix)?;
    if rational_re().is_match(text) && digits_fit(text, radix) {
        Ok(())
    } else {
        Err(CalcError::invalid(format!(
            "`{text}` is not a base-{radix} rational"
        )))
    }
}

/// Decimal float literal, or a NaN/infinity word.
pub(crate) fn check_float(text: &str) -> CalcResult<()> {
    if is_float(text) {
        Ok(())
    } else {
        Err(CalcError::invalid(format!("`{text}` is not a float literal")))
    }
}

pub(crate) fn is_float(text: &str) -> bool {
    float_re().is_match(text) || float_special_re().is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_respect_the_radix() {
        assert!(check_integer("-123", 10).is_ok());
        assert!(check_integer("+ff", 16).is_ok());
        assert!(check_integer("ff", 10).is_err());
        assert!(check_integer("1 2", 10).is_err());
        assert!(check_integer("", 10).is_err());
        assert!(check_integer("12", 37).is_err());
        assert!(check_integer(" 12", 10).is_err());
    }

    #[test]
    fn rationals_allow_one_slash() {
        assert!(check_rational("3/4", 10).is_ok());
        assert!(check_rational("-3/-4", 10).is_ok());
        assert!(check_rational("7", 10).is_ok());
        assert!(check_rational("1/2/3", 10).is_err());
        assert!(check_rational("/2", 10).is_err());
        assert!(check_rational("1.5/2", 10).is_err());
    }

    #[test]
    fn floats_take_decimal_and_special_forms() {
        for ok in ["1", "-1.5", ".5", "5.", "1e10", "2.5E-3", "7@2", "NaN", "-Infinity", "@inf@"] {
            assert!(is_float(ok), "{ok}");
        }
        for bad in ["", ".", "1e", "e5", "1.2.3", "0x10", "infinite"] {
            assert!(check_float(bad).is_err(), "{bad}");
        }
    }
}
