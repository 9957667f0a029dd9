use std::fmt::Display;

use farmgate_engine::{
    db_types::{Order, Transaction},
    SettlementResult,
    TransactionSnapshot,
};
use fg_common::{Provider, NAIRA_CURRENCY_CODE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The envelope shared by Paystack and Flutterwave webhook bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl WebhookEvent {
    /// The provider and payment reference for events that report a successful charge. Every other event is
    /// acknowledged and ignored.
    pub fn charge_reference(&self) -> Option<(Provider, String)> {
        let (provider, field) = match self.event.as_str() {
            "charge.success" => (Provider::Paystack, "reference"),
            "charge.completed" => (Provider::Flutterwave, "tx_ref"),
            _ => return None,
        };
        self.data.get(field).and_then(Value::as_str).map(|r| (provider, r.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollQuery {
    #[serde(rename = "paymentProvider")]
    pub payment_provider: Option<Provider>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializePaymentRequest {
    pub order_id: i64,
    #[serde(default)]
    pub provider: Provider,
    pub email: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub callback_url: Option<String>,
}

fn default_currency() -> String {
    NAIRA_CURRENCY_CODE.to_string()
}

pub const RETRY_LATER: &str = "retry_later";

/// What a webhook or a poll learns about a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub outcome: String,
    pub transaction: Transaction,
    pub order: Option<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PaymentStatusResponse {
    /// The provider could not be reached. The client should ask again later.
    pub fn retry_later<S: Display>(snapshot: TransactionSnapshot, message: S) -> Self {
        Self {
            outcome: RETRY_LATER.to_string(),
            transaction: snapshot.transaction,
            order: snapshot.order,
            message: Some(message.to_string()),
        }
    }
}

impl From<&SettlementResult> for PaymentStatusResponse {
    fn from(result: &SettlementResult) -> Self {
        let TransactionSnapshot { transaction, order } = result.snapshot();
        Self { outcome: result.outcome().to_string(), transaction, order, message: None }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn charge_references() {
        let paystack: WebhookEvent =
            serde_json::from_value(json!({"event": "charge.success", "data": {"reference": "FG-4-a1"}})).unwrap();
        assert_eq!(paystack.charge_reference(), Some((Provider::Paystack, "FG-4-a1".to_string())));
        let flutterwave: WebhookEvent = serde_json::from_value(
            json!({"event": "charge.completed", "data": {"id": 285959875, "tx_ref": "FG-5-b2", "status": "successful"}}),
        )
        .unwrap();
        assert_eq!(flutterwave.charge_reference(), Some((Provider::Flutterwave, "FG-5-b2".to_string())));
        let transfer: WebhookEvent =
            serde_json::from_value(json!({"event": "transfer.success", "data": {"reference": "T-1"}})).unwrap();
        assert_eq!(transfer.charge_reference(), None);
        let no_data: WebhookEvent = serde_json::from_value(json!({"event": "charge.success"})).unwrap();
        assert_eq!(no_data.charge_reference(), None);
    }

    #[test]
    fn initialize_request_defaults() {
        let req: InitializePaymentRequest =
            serde_json::from_value(json!({"order_id": 7, "email": "buyer@example.com"})).unwrap();
        assert_eq!(req.provider, Provider::Paystack);
        assert_eq!(req.currency, "NGN");
        assert!(req.callback_url.is_none());
    }
}
