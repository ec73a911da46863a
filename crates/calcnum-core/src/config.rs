//! Float configuration and numeric-system options.
//!
//! Options deserialize from TOML the same way they serialize:
//!
//! ```toml
//! precision_bits = 128
//! rounding_mode = "toward_zero"
//! ```

use crate::error::{CalcError, CalcResult};
use calcnum_binding::Rnd;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest precision a float may be configured with.
pub const MAX_PRECISION_BITS: u32 = 1 << 24;

/// Bits needed to carry `digits` decimal digits: `ceil(digits * log2(10))`.
pub fn precision_to_bits(digits: u32) -> u32 {
    (f64::from(digits) * std::f64::consts::LOG2_10).ceil() as u32
}

/// How an inexact result picks its representable neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// To nearest, ties to even.
    #[default]
    Nearest,
    TowardZero,
    /// Toward positive infinity.
    Up,
    /// Toward negative infinity.
    Down,
    AwayFromZero,
}

impl RoundingMode {
    pub const ALL: [RoundingMode; 5] = [
        RoundingMode::Nearest,
        RoundingMode::TowardZero,
        RoundingMode::Up,
        RoundingMode::Down,
        RoundingMode::AwayFromZero,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoundingMode::Nearest => "nearest",
            RoundingMode::TowardZero => "toward_zero",
            RoundingMode::Up => "up",
            RoundingMode::Down => "down",
            RoundingMode::AwayFromZero => "away_from_zero",
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rounding mode `{0}`")]
pub struct UnknownRoundingMode(pub String);

impl FromStr for RoundingMode {
    type Err = UnknownRoundingMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoundingMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownRoundingMode(s.to_string()))
    }
}

impl From<RoundingMode> for Rnd {
    fn from(mode: RoundingMode) -> Self {
        match mode {
            RoundingMode::Nearest => Rnd::Nearest,
            RoundingMode::TowardZero => Rnd::TowardZero,
            RoundingMode::Up => Rnd::Up,
            RoundingMode::Down => Rnd::Down,
            RoundingMode::AwayFromZero => Rnd::AwayFromZero,
        }
    }
}

/// Precision and rounding carried by every float value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct FloatOptions {
    pub precision_bits: u32,
    pub rounding_mode: RoundingMode,
}

impl Default for FloatOptions {
    fn default() -> Self {
        Self {
            precision_bits: 53,
            rounding_mode: RoundingMode::Nearest,
        }
    }
}

impl FloatOptions {
    pub fn new(precision_bits: u32, rounding_mode: RoundingMode) -> Self {
        Self {
            precision_bits,
            rounding_mode,
        }
    }

    /// Enough bits for `digits` significant decimal digits, rounding to
    /// nearest.
    pub fn with_decimal_digits(digits: u32) -> Self {
        Self::default().precision(precision_to_bits(digits))
    }

    pub fn precision(mut self, bits: u32) -> Self {
        self.precision_bits = bits;
        self
    }

    pub fn rounding(mut self, mode: RoundingMode) -> Self {
        self.rounding_mode = mode;
        self
    }

    pub fn validate(&self) -> CalcResult<()> {
        if (1..=MAX_PRECISION_BITS).contains(&self.precision_bits) {
            Ok(())
        } else {
            Err(CalcError::InvalidPrecision(self.precision_bits))
        }
    }

    pub(crate) fn rnd(&self) -> Rnd {
        self.rounding_mode.into()
    }
}

/// Options of a whole numeric system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculateOptions {
    /// Default configuration of floats created without explicit options.
    #[serde(flatten)]
    pub float: FloatOptions,
    /// Decimal digits of precision; overrides `precision_bits` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision_digits: Option<u32>,
}

impl CalculateOptions {
    pub fn from_toml_str(text: &str) -> CalcResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The float defaults these options resolve to, validated.
    pub fn float_options(&self) -> CalcResult<FloatOptions> {
        let options = match self.precision_digits {
            Some(digits) => self.float.precision(precision_to_bits(digits)),
            None => self.float,
        };
        options.validate()?;
        Ok(options)
    }
}

impl From<FloatOptions> for CalculateOptions {
    fn from(float: FloatOptions) -> Self {
        Self {
            float,
            precision_digits: None,
        }
    }
}
