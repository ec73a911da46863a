//! Host numbers and the operands binary operations accept.

use crate::error::{CalcError, CalcResult};

/// A plain number from the caller's side of the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostNumber {
    Int(i64),
    Float(f64),
}

impl HostNumber {
    pub fn is_zero(&self) -> bool {
        match *self {
            HostNumber::Int(value) => value == 0,
            HostNumber::Float(value) => value == 0.0,
        }
    }

    /// The value as an `i32`, failing unless it is integral and in range.
    pub fn to_i32(&self) -> CalcResult<i32> {
        match *self {
            HostNumber::Int(value) => i32::try_from(value)
                .map_err(|_| CalcError::invalid(format!("{value} is outside the 32-bit range"))),
            HostNumber::Float(value) => {
                if value.fract() == 0.0
                    && value >= f64::from(i32::MIN)
                    && value <= f64::from(i32::MAX)
                {
                    Ok(value as i32)
                } else {
                    Err(CalcError::invalid(format!(
                        "{value} is not an integer in the 32-bit range"
                    )))
                }
            }
        }
    }

    /// Decimal text of an integral value.
    pub(crate) fn to_integer_literal(&self) -> CalcResult<String> {
        match *self {
            HostNumber::Int(value) => Ok(value.to_string()),
            HostNumber::Float(value) => self.to_i32().map(|_| format!("{value:.0}")),
        }
    }
}

impl From<i32> for HostNumber {
    fn from(value: i32) -> Self {
        HostNumber::Int(value.into())
    }
}

impl From<i64> for HostNumber {
    fn from(value: i64) -> Self {
        HostNumber::Int(value)
    }
}

impl From<u32> for HostNumber {
    fn from(value: u32) -> Self {
        HostNumber::Int(value.into())
    }
}

impl From<f64> for HostNumber {
    fn from(value: f64) -> Self {
        HostNumber::Float(value)
    }
}

/// Right-hand side of a binary operation: a value of the receiver's kind
/// or a host number promoted to one.
#[derive(Debug)]
pub enum Operand<'a, T> {
    Value(&'a T),
    Number(HostNumber),
}

impl<'a, T> From<&'a T> for Operand<'a, T> {
    fn from(value: &'a T) -> Self {
        Operand::Value(value)
    }
}

impl<T> From<HostNumber> for Operand<'_, T> {
    fn from(number: HostNumber) -> Self {
        Operand::Number(number)
    }
}

macro_rules! host_operand {
    ($($ty:ty),*) => {$(
        impl<T> From<$ty> for Operand<'_, T> {
            fn from(value: $ty) -> Self {
                Operand::Number(value.into())
            }
        }
    )*};
}

host_operand!(i32, i64, u32, f64);

impl<T> Operand<'_, T> {
    /// A host number that is zero. Values are checked against the native
    /// layer by the caller.
    pub(crate) fn is_zero_number(&self) -> bool {
        matches!(self, Operand::Number(number) if number.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int32_range_is_enforced() {
        assert_eq!(HostNumber::from(-7).to_i32().unwrap(), -7);
        assert_eq!(HostNumber::from(4.0).to_i32().unwrap(), 4);
        assert!(HostNumber::from(1i64 << 40).to_i32().is_err());
        assert!(HostNumber::from(2.5).to_i32().is_err());
        assert!(HostNumber::from(f64::NAN).to_i32().is_err());
        assert!(HostNumber::from(3e9).to_i32().is_err());
    }

    #[test]
    fn integer_literals() {
        assert_eq!(HostNumber::from(-12.0).to_integer_literal().unwrap(), "-12");
        assert_eq!(
            HostNumber::from(1i64 << 40).to_integer_literal().unwrap(),
            "1099511627776"
        );
        assert!(HostNumber::from(0.5).to_integer_literal().is_err());
    }

    #[test]
    fn zero_detection_covers_both_representations() {
        let int: Operand<'_, ()> = 0.into();
        let float: Operand<'_, ()> = (-0.0).into();
        let one: Operand<'_, ()> = 1u32.into();
        assert!(int.is_zero_number());
        assert!(float.is_zero_number());
        assert!(!one.is_zero_number());
    }
}
