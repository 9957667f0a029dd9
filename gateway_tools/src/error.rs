use fg_common::Provider;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("No credentials are configured for {0}")]
    MissingCredentials(Provider),
    #[error("The payment provider did not respond within {0} seconds")]
    Timeout(u64),
    #[error("Could not reach the payment provider: {0}")]
    Transport(String),
    #[error("Provider request failed. Error {status}. {message}")]
    ProviderError { status: u16, message: String },
    #[error("Could not understand the provider response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Timeouts, transport failures and bad responses can be retried later. Configuration problems cannot.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GatewayError::Initialization(_) | GatewayError::MissingCredentials(_))
    }
}
