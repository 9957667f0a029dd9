use std::sync::Arc;

use fg_common::{Kobo, Provider, NAIRA_CURRENCY_CODE};
use log::*;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    config::FlutterwaveConfig,
    helpers::{build_client, id_to_string, parse_timestamp, rest_query},
    ChargeStatus,
    CustomerInfo,
    GatewayError,
    InitializeRequest,
    InitializeResponse,
    VerificationResult,
};

#[derive(Clone)]
pub struct FlutterwaveApi {
    config: FlutterwaveConfig,
    client: Arc<Client>,
}

impl FlutterwaveApi {
    pub fn new(config: FlutterwaveConfig) -> Result<Self, GatewayError> {
        if !config.secret_key.is_set() {
            return Err(GatewayError::MissingCredentials(Provider::Flutterwave));
        }
        let client = build_client(config.secret_key.reveal(), config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Verifies a charge. Flutterwave's own numeric transaction ids are verified directly; anything else is treated
    /// as our `tx_ref`.
    pub async fn verify(&self, reference: &str) -> Result<VerificationResult, GatewayError> {
        let timeout = self.config.timeout;
        debug!("Verifying Flutterwave reference {reference}");
        let body = if !reference.is_empty() && reference.chars().all(|c| c.is_ascii_digit()) {
            let path = format!("/transactions/{reference}/verify");
            rest_query::<Value, ()>(&self.client, timeout, Method::GET, self.url(&path), &[], None).await?
        } else {
            let url = self.url("/transactions/verify_by_reference");
            rest_query::<Value, ()>(&self.client, timeout, Method::GET, url, &[("tx_ref", reference)], None).await?
        };
        let result = normalize_flutterwave_verification(reference, body)?;
        info!("Flutterwave reports {reference} as {} ({})", result.gateway_status, result.amount);
        Ok(result)
    }

    pub async fn initialize(&self, request: &InitializeRequest) -> Result<InitializeResponse, GatewayError> {
        #[derive(Deserialize)]
        struct InitData {
            link: String,
        }
        #[derive(Deserialize)]
        struct InitEnvelope {
            status: String,
            message: Option<String>,
            data: Option<InitData>,
        }
        let mut body = json!({
            "tx_ref": request.reference,
            "amount": request.amount.value() as f64 / 100.0,
            "currency": request.currency,
            "customer": { "email": request.email },
        });
        if let Some(url) = &request.callback_url {
            body["redirect_url"] = json!(url);
        }
        debug!("Initializing Flutterwave payment {}", request.reference);
        let url = self.url("/payments");
        let result =
            rest_query::<InitEnvelope, Value>(&self.client, self.config.timeout, Method::POST, url, &[], Some(body))
                .await?;
        match (result.status.as_str(), result.data) {
            ("success", Some(data)) => Ok(InitializeResponse {
                provider: Provider::Flutterwave,
                reference: request.reference.clone(),
                authorization_url: data.link,
                access_code: None,
            }),
            _ => Err(GatewayError::ProviderError {
                status: 200,
                message: result.message.unwrap_or_else(|| "Flutterwave did not initialize the payment".into()),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FlutterwaveEnvelope {
    status: String,
    message: Option<String>,
    data: Option<FlutterwaveCharge>,
}

#[derive(Debug, Deserialize)]
struct FlutterwaveCharge {
    #[serde(default)]
    id: Value,
    tx_ref: Option<String>,
    status: String,
    amount: f64,
    currency: Option<String>,
    payment_type: Option<String>,
    created_at: Option<String>,
    customer: Option<FlutterwaveCustomer>,
}

#[derive(Debug, Deserialize)]
struct FlutterwaveCustomer {
    email: Option<String>,
    name: Option<String>,
}

pub fn flutterwave_charge_status(status: &str) -> ChargeStatus {
    match status {
        "successful" => ChargeStatus::Paid,
        "failed" => ChargeStatus::Failed,
        _ => ChargeStatus::Pending,
    }
}

/// Converts a Flutterwave verification body into a [`VerificationResult`]. Flutterwave reports amounts in naira, so
/// they are converted to kobo here.
pub fn normalize_flutterwave_verification(reference: &str, body: Value) -> Result<VerificationResult, GatewayError> {
    let envelope = serde_json::from_value::<FlutterwaveEnvelope>(body.clone())
        .map_err(|e| GatewayError::MalformedResponse(format!("Flutterwave verification: {e}")))?;
    let charge = match (envelope.status.as_str(), envelope.data) {
        ("success", Some(charge)) => charge,
        (_, _) => {
            let message = envelope.message.unwrap_or_default();
            warn!("Flutterwave could not verify {reference}. {message}");
            return Ok(VerificationResult {
                provider: Provider::Flutterwave,
                reference: reference.to_string(),
                success: false,
                paid: false,
                status: ChargeStatus::Pending,
                gateway_status: message,
                amount: Kobo::default(),
                currency: NAIRA_CURRENCY_CODE.to_string(),
                channel: None,
                customer: None,
                provider_transaction_id: None,
                paid_at: None,
                raw: body,
            });
        },
    };
    let amount = Kobo::try_from(charge.amount).map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
    let status = flutterwave_charge_status(&charge.status);
    let customer = charge.customer.map(|c| CustomerInfo { email: c.email, name: c.name, customer_code: None });
    Ok(VerificationResult {
        provider: Provider::Flutterwave,
        reference: charge.tx_ref.unwrap_or_else(|| reference.to_string()),
        success: true,
        paid: status == ChargeStatus::Paid,
        status,
        gateway_status: charge.status,
        amount,
        currency: charge.currency.unwrap_or_else(|| NAIRA_CURRENCY_CODE.to_string()),
        channel: charge.payment_type,
        customer,
        provider_transaction_id: id_to_string(&charge.id),
        paid_at: parse_timestamp(charge.created_at.as_deref()),
        raw: body,
    })
}
