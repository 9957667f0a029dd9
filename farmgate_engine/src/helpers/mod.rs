use std::sync::OnceLock;

use regex::Regex;

pub const REFERENCE_PREFIX: &str = "FG";

/// Creates a new payment reference for the order, of the form `FG-{order_id}-{16 hex digits}`.
pub fn new_payment_reference(order_id: i64) -> String {
    format!("{REFERENCE_PREFIX}-{order_id}-{:016x}", rand::random::<u64>())
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Providers allow alphanumerics plus `-`, `.` and `=` in a reference.
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9\-.=_]{1,100}$").expect("reference pattern is a valid regex"))
}

/// True if `reference` is something a payment provider could have issued. This rejects empty values, path-like
/// values and anything too long to be stored.
pub fn is_valid_reference(reference: &str) -> bool {
    reference_pattern().is_match(reference)
}

/// Extracts the order id from a reference created by [`new_payment_reference`].
pub fn order_id_from_reference(reference: &str) -> Option<i64> {
    let mut parts = reference.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(REFERENCE_PREFIX), Some(id), Some(_), None) => id.parse().ok(),
        _ => None,
    }
}
