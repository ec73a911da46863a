//! Native rounding modes.

use serde::{Deserialize, Serialize};

/// Rounding mode as the native float primitives number it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Rnd {
    /// Round to nearest, ties to even.
    Nearest = 0,
    /// Round toward zero.
    TowardZero = 1,
    /// Round toward positive infinity.
    Up = 2,
    /// Round toward negative infinity.
    Down = 3,
    /// Round away from zero.
    AwayFromZero = 4,
}

impl Rnd {
    /// Native integer code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Decode a native integer code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Nearest),
            1 => Some(Self::TowardZero),
            2 => Some(Self::Up),
            3 => Some(Self::Down),
            4 => Some(Self::AwayFromZero),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for rnd in [
            Rnd::Nearest,
            Rnd::TowardZero,
            Rnd::Up,
            Rnd::Down,
            Rnd::AwayFromZero,
        ] {
            assert_eq!(Rnd::from_code(rnd.code()), Some(rnd));
        }
        assert_eq!(Rnd::from_code(5), None);
    }
}
