use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

/// The payment providers that can confirm a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Paystack,
    Flutterwave,
}

#[derive(Debug, Clone, Error)]
#[error("Unknown payment provider: {0}")]
pub struct ProviderParseError(String);

impl FromStr for Provider {
    type Err = ProviderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paystack" => Ok(Self::Paystack),
            "flutterwave" => Ok(Self::Flutterwave),
            other => Err(ProviderParseError(other.to_string())),
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Paystack => write!(f, "paystack"),
            Provider::Flutterwave => write!(f, "flutterwave"),
        }
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::Paystack
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_display() {
        assert_eq!("Paystack".parse::<Provider>().unwrap(), Provider::Paystack);
        assert_eq!(" flutterwave".parse::<Provider>().unwrap(), Provider::Flutterwave);
        assert!("stripe".parse::<Provider>().is_err());
        assert_eq!(Provider::Flutterwave.to_string(), "flutterwave");
        assert_eq!(serde_json::to_string(&Provider::Paystack).unwrap(), "\"paystack\"");
    }
}
