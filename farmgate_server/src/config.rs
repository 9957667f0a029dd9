use std::{env, time::Duration as StdDuration};

use chrono::Duration;
use farmgate_engine::{SettlementConfig, DEFAULT_COMMISSION_RATE, DEFAULT_PLATFORM_FEE_RATE};
use fg_common::{
    helpers::{env_or_default, parse_boolean_flag},
    Rate,
};
use gateway_tools::GatewayConfig;
use log::*;

const DEFAULT_FG_HOST: &str = "127.0.0.1";
const DEFAULT_FG_PORT: u16 = 8370;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
const DEFAULT_SWEEP_AGE_MINS: i64 = 15;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// When false, webhooks are accepted without checking the provider's signature. **DANGER**
    pub webhook_signature_checks: bool,
    pub gateway: GatewayConfig,
    pub platform_fee_rate: Rate,
    pub default_commission_rate: Rate,
    /// Every pending payment is treated as paid in full, and no provider is ever called.
    pub test_mode: bool,
    /// How often the background worker re-checks stale pending payments.
    pub sweep_interval: StdDuration,
    /// Pending payments younger than this are left alone by the sweep.
    pub sweep_age: Duration,
}

/// The settings handlers need to work out who is calling them.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProxyConfig {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ProxyConfig {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FG_HOST.to_string(),
            port: DEFAULT_FG_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            webhook_signature_checks: true,
            gateway: GatewayConfig::default(),
            platform_fee_rate: DEFAULT_PLATFORM_FEE_RATE,
            default_commission_rate: DEFAULT_COMMISSION_RATE,
            test_mode: false,
            sweep_interval: StdDuration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            sweep_age: Duration::minutes(DEFAULT_SWEEP_AGE_MINS),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("FG_HOST").ok().unwrap_or_else(|| DEFAULT_FG_HOST.into());
        let port = env::var("FG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for FG_PORT. {e} Using the default, {DEFAULT_FG_PORT}, instead.");
                    DEFAULT_FG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_FG_PORT);
        let database_url = env::var("FG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ FG_DATABASE_URL is not set. Please set it to the URL for the Farmgate database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("FG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("FG_USE_FORWARDED").ok(), false);
        let webhook_signature_checks = parse_boolean_flag(env::var("FG_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        if !webhook_signature_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Anyone can trigger payment verification.");
        }
        let gateway = GatewayConfig::new_from_env_or_default();
        let platform_fee_rate = env_or_default("FG_PLATFORM_FEE_RATE", DEFAULT_PLATFORM_FEE_RATE);
        let default_commission_rate = env_or_default("FG_DEFAULT_COMMISSION_RATE", DEFAULT_COMMISSION_RATE);
        let test_mode = configure_test_mode(&gateway);
        let sweep_interval = StdDuration::from_secs(env_or_default(
            "FG_PENDING_SWEEP_INTERVAL_SECS",
            DEFAULT_SWEEP_INTERVAL_SECS,
        ));
        let sweep_age = Duration::minutes(env_or_default("FG_PENDING_SWEEP_AGE_MINS", DEFAULT_SWEEP_AGE_MINS));
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            webhook_signature_checks,
            gateway,
            platform_fee_rate,
            default_commission_rate,
            test_mode,
            sweep_interval,
            sweep_age,
        }
    }

    pub fn settlement_config(&self) -> SettlementConfig {
        SettlementConfig {
            platform_fee_rate: self.platform_fee_rate,
            default_commission_rate: self.default_commission_rate,
            test_mode: self.test_mode,
            gateway_timeout: self.gateway.paystack.timeout,
        }
    }
}

/// An explicit `FG_TEST_MODE` wins. Otherwise test mode is on exactly when no provider has a secret key.
fn configure_test_mode(gateway: &GatewayConfig) -> bool {
    let has_credentials = gateway.paystack.secret_key.is_set() || gateway.flutterwave.secret_key.is_set();
    let test_mode = parse_boolean_flag(env::var("FG_TEST_MODE").ok(), !has_credentials);
    if test_mode {
        warn!("🚨️ Test mode is ON. Payments will be marked as paid without asking a payment provider.");
    } else {
        info!("🪛️ Test mode is off. Payments are verified with the payment providers.");
    }
    test_mode
}

#[cfg(test)]
mod test {
    use gateway_tools::{FlutterwaveConfig, PaystackConfig};

    use super::*;

    fn gateway(paystack_key: &str, flutterwave_key: &str) -> GatewayConfig {
        let timeout = StdDuration::from_secs(10);
        GatewayConfig {
            paystack: PaystackConfig::new("https://api.paystack.co", paystack_key, timeout),
            flutterwave: FlutterwaveConfig::new("https://api.flutterwave.com/v3", flutterwave_key, "", timeout),
        }
    }

    #[test]
    fn test_mode_follows_credentials_unless_overridden() {
        env::remove_var("FG_TEST_MODE");
        assert!(configure_test_mode(&gateway("", "")));
        assert!(!configure_test_mode(&gateway("sk_test_123", "")));
        assert!(!configure_test_mode(&gateway("", "FLWSECK_TEST-123")));
        env::set_var("FG_TEST_MODE", "true");
        assert!(configure_test_mode(&gateway("sk_test_123", "")));
        env::remove_var("FG_TEST_MODE");
    }

    #[test]
    fn settlement_config_carries_rates() {
        let config = ServerConfig {
            platform_fee_rate: Rate::from_bps(250),
            test_mode: true,
            ..ServerConfig::new("0.0.0.0", 9000)
        };
        let settlement = config.settlement_config();
        assert_eq!(settlement.platform_fee_rate, Rate::from_bps(250));
        assert_eq!(settlement.default_commission_rate, DEFAULT_COMMISSION_RATE);
        assert!(settlement.test_mode);
        assert_eq!(config.port, 9000);
    }
}
