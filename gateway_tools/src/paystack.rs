use std::sync::Arc;

use fg_common::{Kobo, Provider, NAIRA_CURRENCY_CODE};
use log::*;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    config::PaystackConfig,
    helpers::{build_client, id_to_string, parse_timestamp, rest_query},
    ChargeStatus,
    CustomerInfo,
    GatewayError,
    InitializeRequest,
    InitializeResponse,
    VerificationResult,
};

#[derive(Clone)]
pub struct PaystackApi {
    config: PaystackConfig,
    client: Arc<Client>,
}

impl PaystackApi {
    pub fn new(config: PaystackConfig) -> Result<Self, GatewayError> {
        if !config.secret_key.is_set() {
            return Err(GatewayError::MissingCredentials(Provider::Paystack));
        }
        let client = build_client(config.secret_key.reveal(), config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    pub async fn verify(&self, reference: &str) -> Result<VerificationResult, GatewayError> {
        let path = format!("/transaction/verify/{reference}");
        debug!("Verifying Paystack reference {reference}");
        let body = rest_query::<Value, ()>(&self.client, self.config.timeout, Method::GET, self.url(&path), &[], None)
            .await?;
        let result = normalize_paystack_verification(reference, body)?;
        info!("Paystack reports {reference} as {} ({})", result.gateway_status, result.amount);
        Ok(result)
    }

    pub async fn initialize(&self, request: &InitializeRequest) -> Result<InitializeResponse, GatewayError> {
        #[derive(Deserialize)]
        struct InitData {
            authorization_url: String,
            access_code: Option<String>,
            reference: Option<String>,
        }
        #[derive(Deserialize)]
        struct InitEnvelope {
            status: bool,
            message: Option<String>,
            data: Option<InitData>,
        }
        let mut body = json!({
            "email": request.email,
            "amount": request.amount.value(),
            "reference": request.reference,
            "currency": request.currency,
        });
        if let Some(url) = &request.callback_url {
            body["callback_url"] = json!(url);
        }
        debug!("Initializing Paystack transaction {}", request.reference);
        let url = self.url("/transaction/initialize");
        let result =
            rest_query::<InitEnvelope, Value>(&self.client, self.config.timeout, Method::POST, url, &[], Some(body))
                .await?;
        match (result.status, result.data) {
            (true, Some(data)) => Ok(InitializeResponse {
                provider: Provider::Paystack,
                reference: data.reference.unwrap_or_else(|| request.reference.clone()),
                authorization_url: data.authorization_url,
                access_code: data.access_code,
            }),
            _ => Err(GatewayError::ProviderError {
                status: 200,
                message: result.message.unwrap_or_else(|| "Paystack did not initialize the transaction".into()),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaystackEnvelope {
    status: bool,
    message: Option<String>,
    data: Option<PaystackCharge>,
}

#[derive(Debug, Deserialize)]
struct PaystackCharge {
    #[serde(default)]
    id: Value,
    status: String,
    reference: Option<String>,
    amount: i64,
    currency: Option<String>,
    channel: Option<String>,
    paid_at: Option<String>,
    customer: Option<PaystackCustomer>,
}

#[derive(Debug, Deserialize)]
struct PaystackCustomer {
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    customer_code: Option<String>,
}

/// Maps Paystack's charge status onto [`ChargeStatus`]. Only `success` counts as paid.
pub fn paystack_charge_status(status: &str) -> ChargeStatus {
    match status {
        "success" => ChargeStatus::Paid,
        "failed" | "reversed" | "abandoned" => ChargeStatus::Failed,
        _ => ChargeStatus::Pending,
    }
}

/// Converts the body of `GET /transaction/verify/:reference` into a [`VerificationResult`].
///
/// Paystack amounts are already in kobo. A response with `status: false` (e.g. an unknown reference) is reported as a
/// pending, unpaid charge so that the caller can try again later.
pub fn normalize_paystack_verification(reference: &str, body: Value) -> Result<VerificationResult, GatewayError> {
    let envelope = serde_json::from_value::<PaystackEnvelope>(body.clone())
        .map_err(|e| GatewayError::MalformedResponse(format!("Paystack verification: {e}")))?;
    let charge = match (envelope.status, envelope.data) {
        (true, Some(charge)) => charge,
        (_, _) => {
            let message = envelope.message.unwrap_or_default();
            warn!("Paystack could not verify {reference}. {message}");
            return Ok(VerificationResult {
                provider: Provider::Paystack,
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
    let status = paystack_charge_status(&charge.status);
    let customer = charge.customer.map(|c| {
        let name = match (c.first_name, c.last_name) {
            (Some(f), Some(l)) => Some(format!("{f} {l}")),
            (Some(n), None) | (None, Some(n)) => Some(n),
            (None, None) => None,
        };
        CustomerInfo { email: c.email, name, customer_code: c.customer_code }
    });
    Ok(VerificationResult {
        provider: Provider::Paystack,
        reference: charge.reference.unwrap_or_else(|| reference.to_string()),
        success: true,
        paid: status == ChargeStatus::Paid,
        status,
        gateway_status: charge.status,
        amount: Kobo::from(charge.amount),
        currency: charge.currency.unwrap_or_else(|| NAIRA_CURRENCY_CODE.to_string()),
        channel: charge.channel,
        customer,
        provider_transaction_id: id_to_string(&charge.id),
        paid_at: parse_timestamp(charge.paid_at.as_deref()),
        raw: body,
    })
}
