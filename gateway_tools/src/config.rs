use std::time::Duration;

use fg_common::{helpers::env_or_default, Secret};
use log::*;

pub const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";
pub const DEFAULT_FLUTTERWAVE_BASE_URL: &str = "https://api.flutterwave.com/v3";
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
    pub timeout: Duration,
}

impl PaystackConfig {
    pub fn new(base_url: &str, secret_key: &str, timeout: Duration) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), secret_key: Secret::new(secret_key.into()), timeout }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = env_or_default("FG_PAYSTACK_BASE_URL", DEFAULT_PAYSTACK_BASE_URL.to_string());
        let secret_key = std::env::var("FG_PAYSTACK_SECRET_KEY").unwrap_or_else(|_| {
            warn!("FG_PAYSTACK_SECRET_KEY not set. Paystack payments cannot be verified.");
            String::default()
        });
        Self::new(&base_url, &secret_key, gateway_timeout_from_env())
    }
}

#[derive(Debug, Clone)]
pub struct FlutterwaveConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
    /// The value Flutterwave echoes back in the `verif-hash` header of its webhooks.
    pub secret_hash: Secret<String>,
    pub timeout: Duration,
}

impl FlutterwaveConfig {
    pub fn new(base_url: &str, secret_key: &str, secret_hash: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: Secret::new(secret_key.into()),
            secret_hash: Secret::new(secret_hash.into()),
            timeout,
        }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = env_or_default("FG_FLUTTERWAVE_BASE_URL", DEFAULT_FLUTTERWAVE_BASE_URL.to_string());
        let secret_key = std::env::var("FG_FLUTTERWAVE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("FG_FLUTTERWAVE_SECRET_KEY not set. Flutterwave payments cannot be verified.");
            String::default()
        });
        let secret_hash = std::env::var("FG_FLUTTERWAVE_SECRET_HASH").unwrap_or_else(|_| {
            warn!("FG_FLUTTERWAVE_SECRET_HASH not set. Flutterwave webhooks cannot be authenticated.");
            String::default()
        });
        Self::new(&base_url, &secret_key, &secret_hash, gateway_timeout_from_env())
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub paystack: PaystackConfig,
    pub flutterwave: FlutterwaveConfig,
}

impl Default for GatewayConfig {
    /// Public base URLs with no credentials. Neither provider can be called until keys are supplied.
    fn default() -> Self {
        let timeout = Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS);
        Self {
            paystack: PaystackConfig::new(DEFAULT_PAYSTACK_BASE_URL, "", timeout),
            flutterwave: FlutterwaveConfig::new(DEFAULT_FLUTTERWAVE_BASE_URL, "", "", timeout),
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        Self {
            paystack: PaystackConfig::new_from_env_or_default(),
            flutterwave: FlutterwaveConfig::new_from_env_or_default(),
        }
    }
}

fn gateway_timeout_from_env() -> Duration {
    Duration::from_secs(env_or_default("FG_GATEWAY_TIMEOUT_SECS", DEFAULT_GATEWAY_TIMEOUT_SECS))
}
