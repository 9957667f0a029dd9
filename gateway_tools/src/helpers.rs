use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::GatewayError;

/// Builds a client that authenticates with a bearer token and gives up after `timeout`.
pub fn build_client(secret_key: &str, timeout: Duration) -> Result<Arc<Client>, GatewayError> {
    let mut headers = HeaderMap::with_capacity(2);
    let val = HeaderValue::from_str(&format!("Bearer {secret_key}"))
        .map_err(|e| GatewayError::Initialization(e.to_string()))?;
    headers.insert(AUTHORIZATION, val);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let client = Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| GatewayError::Initialization(e.to_string()))?;
    Ok(Arc::new(client))
}

/// Sends a REST request and deserializes the JSON body of a successful response.
///
/// Non-2xx responses are returned as [`GatewayError::ProviderError`] with the body as the message.
pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
    client: &Client,
    timeout: Duration,
    method: Method,
    url: String,
    params: &[(&str, &str)],
    body: Option<B>,
) -> Result<T, GatewayError> {
    trace!("Sending REST query: {method} {url}");
    let mut req = client.request(method, url);
    if !params.is_empty() {
        req = req.query(params);
    }
    if let Some(body) = body {
        req = req.json(&body);
    }
    let response = req.send().await.map_err(|e| map_transport_error(e, timeout))?;
    if response.status().is_success() {
        trace!("REST query successful. {}", response.status());
        response.json::<T>().await.map_err(|e| match e.is_timeout() {
            true => GatewayError::Timeout(timeout.as_secs()),
            false => GatewayError::MalformedResponse(e.to_string()),
        })
    } else {
        let status = response.status().as_u16();
        let message = response.text().await.map_err(|e| map_transport_error(e, timeout))?;
        Err(GatewayError::ProviderError { status, message })
    }
}

fn map_transport_error(e: reqwest::Error, timeout: Duration) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout(timeout.as_secs())
    } else {
        GatewayError::Transport(e.to_string())
    }
}

/// Providers report timestamps as RFC 3339 strings. Anything else is treated as absent.
pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value.and_then(|s| DateTime::parse_from_rfc3339(s).ok()).map(|d| d.with_timezone(&Utc))
}

/// Reads an identifier that a provider may send either as a number or as a string.
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
