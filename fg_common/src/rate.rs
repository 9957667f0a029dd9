use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::Kobo;

pub const BASIS_POINTS_PER_UNIT: u32 = 10_000;

/// A fee or commission rate, stored in basis points. `Rate::from_bps(300)` is 3%.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Rate(u32);

#[derive(Debug, Clone, Error)]
#[error("Invalid rate: {0}")]
pub struct RateParseError(String);

impl Rate {
    pub const fn from_bps(bps: u32) -> Self {
        Self(bps)
    }

    /// Converts a fractional rate (e.g. `0.05`) into basis points. The rate must lie in `[0, 1]`.
    pub fn from_fraction(fraction: f64) -> Result<Self, RateParseError> {
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(RateParseError(format!("{fraction} is not between 0 and 1")));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bps = (fraction * f64::from(BASIS_POINTS_PER_UNIT)).round() as u32;
        Ok(Self(bps))
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    pub fn as_fraction(&self) -> f64 {
        f64::from(self.0) / f64::from(BASIS_POINTS_PER_UNIT)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Applies the rate to `amount`, rounding half away from zero to the nearest kobo.
    pub fn apply(&self, amount: Kobo) -> Kobo {
        let numerator = i128::from(amount.value()) * i128::from(self.0);
        let denominator = i128::from(BASIS_POINTS_PER_UNIT);
        let half = denominator / 2;
        let rounded = if numerator >= 0 { (numerator + half) / denominator } else { (numerator - half) / denominator };
        #[allow(clippy::cast_possible_truncation)]
        Kobo::from(rounded as i64)
    }
}

impl FromStr for Rate {
    type Err = RateParseError;

    /// Accepts a fraction (`"0.03"`) or a percentage (`"3%"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (number, scale) = match s.strip_suffix('%') {
            Some(pct) => (pct.trim(), 100.0),
            None => (s, 1.0),
        };
        let value = number.parse::<f64>().map_err(|e| RateParseError(format!("{s}: {e}")))?;
        Self::from_fraction(value / scale)
    }
}

impl Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!("0.03".parse::<Rate>().unwrap(), Rate::from_bps(300));
        assert_eq!("0.05".parse::<Rate>().unwrap(), Rate::from_bps(500));
        assert_eq!("2.5%".parse::<Rate>().unwrap(), Rate::from_bps(250));
        assert_eq!(" 1 ".parse::<Rate>().unwrap(), Rate::from_bps(10_000));
        assert!("1.5".parse::<Rate>().is_err());
        assert!("-0.1".parse::<Rate>().is_err());
        assert!("five".parse::<Rate>().is_err());
    }

    #[test]
    fn apply_rounds_half_up() {
        let rate = Rate::from_bps(300);
        assert_eq!(rate.apply(Kobo::from(100_000)), Kobo::from(3_000));
        // 3% of 50 kobo is 1.5 kobo
        assert_eq!(rate.apply(Kobo::from(50)), Kobo::from(2));
        // 3% of 49 kobo is 1.47 kobo
        assert_eq!(rate.apply(Kobo::from(49)), Kobo::from(1));
        assert_eq!(Rate::default().apply(Kobo::from(12_345)), Kobo::from(0));
    }

    #[test]
    fn display() {
        assert_eq!(Rate::from_bps(300).to_string(), "3.00%");
        assert_eq!(Rate::from_bps(1_250).to_string(), "12.50%");
        assert!((Rate::from_bps(500).as_fraction() - 0.05).abs() < f64::EPSILON);
    }
}
