//! Kind-erased numeric values.

use crate::error::CalcResult;
use crate::float::Float;
use crate::integer::Integer;
use crate::rational::Rational;
use std::fmt;

/// The three numeric kinds a system hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Rational,
    Float,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Rational => "rational",
            ValueKind::Float => "float",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value of any kind, as returned by
/// [`Calculate::parse`](crate::Calculate::parse).
#[derive(Debug, Clone)]
pub enum NumericValue {
    Integer(Integer),
    Rational(Rational),
    Float(Float),
}

impl NumericValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            NumericValue::Integer(_) => ValueKind::Integer,
            NumericValue::Rational(_) => ValueKind::Rational,
            NumericValue::Float(_) => ValueKind::Float,
        }
    }

    pub fn sign(&self) -> CalcResult<i32> {
        match self {
            NumericValue::Integer(value) => value.sign(),
            NumericValue::Rational(value) => value.sign(),
            NumericValue::Float(value) => value.sign(),
        }
    }

    pub fn to_number(&self) -> CalcResult<f64> {
        match self {
            NumericValue::Integer(value) => value.to_number(),
            NumericValue::Rational(value) => value.to_number(),
            NumericValue::Float(value) => value.to_number(),
        }
    }

    pub fn to_str_radix(&self, radix: u32) -> CalcResult<String> {
        match self {
            NumericValue::Integer(value) => value.to_str_radix(radix),
            NumericValue::Rational(value) => value.to_str_radix(radix),
            NumericValue::Float(value) => value.to_str_radix(radix),
        }
    }

    pub fn as_integer(&self) -> Option<&Integer> {
        match self {
            NumericValue::Integer(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_rational(&self) -> Option<&Rational> {
        match self {
            NumericValue::Rational(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<&Float> {
        match self {
            NumericValue::Float(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Integer> for NumericValue {
    fn from(value: Integer) -> Self {
        NumericValue::Integer(value)
    }
}

impl From<Rational> for NumericValue {
    fn from(value: Rational) -> Self {
        NumericValue::Rational(value)
    }
}

impl From<Float> for NumericValue {
    fn from(value: Float) -> Self {
        NumericValue::Float(value)
    }
}

impl fmt::Display for NumericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericValue::Integer(value) => fmt::Display::fmt(value, f),
            NumericValue::Rational(value) => fmt::Display::fmt(value, f),
            NumericValue::Float(value) => fmt::Display::fmt(value, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::system;

    #[test]
    fn kinds_render_lowercase() {
        assert_eq!(ValueKind::Integer.to_string(), "integer");
        assert_eq!(ValueKind::Rational.to_string(), "rational");
        assert_eq!(ValueKind::Float.to_string(), "float");
    }

    #[test]
    fn dispatches_to_the_wrapped_value() {
        let (calc, _) = system();
        let values: Vec<NumericValue> = vec![
            calc.integer(-3).unwrap().into(),
            calc.ratio(-3, 4).unwrap().into(),
            calc.float(-0.75).unwrap().into(),
        ];
        let kinds: Vec<_> = values.iter().map(NumericValue::kind).collect();
        assert_eq!(kinds, [ValueKind::Integer, ValueKind::Rational, ValueKind::Float]);
        for value in &values {
            assert_eq!(value.sign().unwrap(), -1);
        }
        assert_eq!(values[1].to_number().unwrap(), -0.75);
        assert_eq!(values[2].to_string(), "-0.75");
        assert!(values[0].as_integer().is_some());
        assert!(values[0].as_float().is_none());
    }
}
