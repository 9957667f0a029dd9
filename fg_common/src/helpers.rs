use std::{env, fmt::Display, str::FromStr};

use log::*;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads the environment variable `name` and parses it as `T`. Missing or unparseable values fall back to `default`,
/// with a log entry explaining why.
pub fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {name}. {e}. Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("TRUE".into()), false));
        assert!(parse_boolean_flag(Some(" on ".into()), false));
        assert!(!parse_boolean_flag(Some("0".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
    }

    #[test]
    fn env_values() {
        env::set_var("FG_COMMON_TEST_PORT", "9001");
        env::set_var("FG_COMMON_TEST_BAD_PORT", "ninety");
        assert_eq!(env_or_default::<u16>("FG_COMMON_TEST_PORT", 80), 9001);
        assert_eq!(env_or_default::<u16>("FG_COMMON_TEST_BAD_PORT", 80), 80);
        assert_eq!(env_or_default::<u16>("FG_COMMON_TEST_MISSING_PORT", 80), 80);
    }
}
