use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use log::{debug, trace};
use regex::Regex;
use sha2::Sha512;
use subtle::ConstantTimeEq;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        let re = Regex::new(r#"for=(?P<ip>[^;,]+)"#).ok();
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| re.as_ref().and_then(|re| re.captures(v)))
            .and_then(|caps| caps.name("ip"))
            .map(|m| m.as_str().trim_matches('"'))
            .and_then(|s| IpAddr::from_str(s).ok());
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

/// Hex-encoded HMAC-SHA512 of `data`, the way Paystack signs its webhook bodies.
pub fn calculate_hmac_sha512(secret: &str, data: &[u8]) -> Option<String> {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(data);
    Some(hex::encode(mac.finalize().into_bytes()))
}

pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Checks the `x-paystack-signature` header value against the raw request body.
pub fn verify_paystack_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    match calculate_hmac_sha512(secret, body) {
        Some(expected) => constant_time_eq(&expected, &signature.trim().to_ascii_lowercase()),
        None => false,
    }
}

/// Flutterwave does not sign the body. It echoes a shared secret hash in the `verif-hash` header instead.
pub fn verify_flutterwave_hash(secret_hash: &str, received: &str) -> bool {
    !secret_hash.is_empty() && constant_time_eq(secret_hash, received.trim())
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn paystack_signatures() {
        let body = br#"{"event":"charge.success","data":{"reference":"FG-1-abc"}}"#;
        let signature = calculate_hmac_sha512("sk_test_secret", body).unwrap();
        assert_eq!(signature.len(), 128);
        assert!(verify_paystack_signature("sk_test_secret", body, &signature));
        assert!(verify_paystack_signature("sk_test_secret", body, &signature.to_ascii_uppercase()));
        assert!(!verify_paystack_signature("sk_test_other", body, &signature));
        assert!(!verify_paystack_signature("sk_test_secret", b"{}", &signature));
        assert!(!verify_paystack_signature("", body, &signature));
    }

    #[test]
    fn hmac_matches_known_vector() {
        // RFC 4231, test case 2
        let mac = calculate_hmac_sha512("Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            mac,
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea2505549758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn flutterwave_hashes() {
        assert!(verify_flutterwave_hash("my-hash", "my-hash"));
        assert!(verify_flutterwave_hash("my-hash", " my-hash "));
        assert!(!verify_flutterwave_hash("my-hash", "my-hash2"));
        assert!(!verify_flutterwave_hash("", ""));
    }

    #[test]
    fn remote_ip_sources() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .insert_header(("Forwarded", "for=198.51.100.2;proto=https"))
            .peer_addr("192.0.2.1:4000".parse().unwrap())
            .to_http_request();
        assert_eq!(get_remote_ip(&req, true, true), Some("203.0.113.7".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, true), Some("198.51.100.2".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, false), Some("192.0.2.1".parse().unwrap()));
    }
}
