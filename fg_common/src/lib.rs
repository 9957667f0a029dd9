mod kobo;

pub mod helpers;
pub mod op;
mod provider;
mod rate;
mod secret;

pub use kobo::{Kobo, KoboConversionError, NAIRA_CURRENCY_CODE};
pub use provider::{Provider, ProviderParseError};
pub use rate::{Rate, RateParseError, BASIS_POINTS_PER_UNIT};
pub use secret::Secret;
