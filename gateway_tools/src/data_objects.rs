use chrono::{DateTime, Utc};
use fg_common::{Kobo, Provider, NAIRA_CURRENCY_CODE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a charge stands according to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Paid,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub email: Option<String>,
    pub name: Option<String>,
    pub customer_code: Option<String>,
}

/// A provider's answer to "has this reference been paid?", normalised across providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub provider: Provider,
    pub reference: String,
    /// `true` when the provider's API accepted the verification call.
    pub success: bool,
    pub paid: bool,
    pub status: ChargeStatus,
    /// The status string exactly as the provider reported it.
    pub gateway_status: String,
    pub amount: Kobo,
    pub currency: String,
    pub channel: Option<String>,
    pub customer: Option<CustomerInfo>,
    pub provider_transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub raw: Value,
}

impl VerificationResult {
    /// A successful charge that did not come from a provider at all. Used when payments are auto-verified in test mode.
    pub fn synthesized_paid(provider: Provider, reference: &str, amount: Kobo) -> Self {
        Self {
            provider,
            reference: reference.to_string(),
            success: true,
            paid: true,
            status: ChargeStatus::Paid,
            gateway_status: "success".to_string(),
            amount,
            currency: NAIRA_CURRENCY_CODE.to_string(),
            channel: Some("test_mode".to_string()),
            customer: None,
            provider_transaction_id: None,
            paid_at: Some(Utc::now()),
            raw: Value::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub reference: String,
    pub email: String,
    pub amount: Kobo,
    pub currency: String,
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub provider: Provider,
    pub reference: String,
    pub authorization_url: String,
    pub access_code: Option<String>,
}
