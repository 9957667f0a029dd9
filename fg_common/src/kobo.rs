use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const NAIRA_CURRENCY_CODE: &str = "NGN";

//--------------------------------------        Kobo         ---------------------------------------------------------
/// An amount of money in the smallest currency unit. 100 kobo = 1 naira.
///
/// All settlement arithmetic is done on integer kobo so that fee splits add up exactly.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Kobo(i64);

op!(binary Kobo, Add, add);
op!(binary Kobo, Sub, sub);
op!(inplace Kobo, AddAssign, add_assign);
op!(inplace Kobo, SubAssign, sub_assign);
op!(unary Kobo, Neg, neg);

impl Mul<i64> for Kobo {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Kobo {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in kobo: {0}")]
pub struct KoboConversionError(String);

impl From<i64> for Kobo {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Kobo {
    type Error = KoboConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(KoboConversionError(format!("Value {value} is too large to convert to Kobo")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl TryFrom<f64> for Kobo {
    type Error = KoboConversionError;

    /// Converts a naira amount with a fractional part (as reported by some providers) into kobo, rounding to the
    /// nearest kobo.
    fn try_from(naira: f64) -> Result<Self, Self::Error> {
        if !naira.is_finite() {
            return Err(KoboConversionError(format!("{naira} is not a finite amount")));
        }
        let kobo = (naira * 100.0).round();
        if kobo.abs() > i64::MAX as f64 {
            return Err(KoboConversionError(format!("{naira} is too large to convert to Kobo")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(kobo as i64))
    }
}

impl Display for Kobo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}₦{}.{:02}", abs / 100, abs % 100)
    }
}

impl Kobo {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_naira(naira: i64) -> Self {
        Self(naira * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Kobo::from(0).to_string(), "₦0.00");
        assert_eq!(Kobo::from(5).to_string(), "₦0.05");
        assert_eq!(Kobo::from_naira(1_000).to_string(), "₦1000.00");
        assert_eq!(Kobo::from(-250).to_string(), "-₦2.50");
    }

    #[test]
    fn from_naira_float() {
        assert_eq!(Kobo::try_from(1000.0).unwrap(), Kobo::from(100_000));
        assert_eq!(Kobo::try_from(19.99).unwrap(), Kobo::from(1_999));
        assert_eq!(Kobo::try_from(0.01).unwrap(), Kobo::from(1));
        assert!(Kobo::try_from(f64::NAN).is_err());
        assert!(Kobo::try_from(f64::INFINITY).is_err());
    }

    #[test]
    fn arithmetic() {
        let mut a = Kobo::from(1_000);
        a += Kobo::from(500);
        a -= Kobo::from(200);
        assert_eq!(a, Kobo::from(1_300));
        assert_eq!(Kobo::from(250) * 4, Kobo::from(1_000));
        let total: Kobo = vec![Kobo::from(1), Kobo::from(2), Kobo::from(3)].into_iter().sum();
        assert_eq!(total, Kobo::from(6));
        assert!(Kobo::try_from(u64::MAX).is_err());
    }

    #[test]
    fn serializes_as_integer() {
        let json = serde_json::to_string(&Kobo::from(4_250)).unwrap();
        assert_eq!(json, "4250");
    }
}
