use fg_common::Provider;
use log::*;

use crate::{
    FlutterwaveApi,
    GatewayConfig,
    GatewayError,
    InitializeRequest,
    InitializeResponse,
    PaystackApi,
    VerificationResult,
};

/// The set of provider clients that have credentials configured.
#[derive(Clone, Default)]
pub struct GatewayClients {
    paystack: Option<PaystackApi>,
    flutterwave: Option<FlutterwaveApi>,
}

impl GatewayClients {
    /// Builds a client for every provider with a secret key. Providers without credentials are skipped with a warning,
    /// and any request routed to them fails with [`GatewayError::MissingCredentials`].
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let paystack = match PaystackApi::new(config.paystack) {
            Ok(api) => Some(api),
            Err(GatewayError::MissingCredentials(p)) => {
                warn!("No credentials for {p}. Payments through {p} cannot be verified.");
                None
            },
            Err(e) => return Err(e),
        };
        let flutterwave = match FlutterwaveApi::new(config.flutterwave) {
            Ok(api) => Some(api),
            Err(GatewayError::MissingCredentials(p)) => {
                warn!("No credentials for {p}. Payments through {p} cannot be verified.");
                None
            },
            Err(e) => return Err(e),
        };
        Ok(Self { paystack, flutterwave })
    }

    pub fn with_paystack(mut self, api: PaystackApi) -> Self {
        self.paystack = Some(api);
        self
    }

    pub fn with_flutterwave(mut self, api: FlutterwaveApi) -> Self {
        self.flutterwave = Some(api);
        self
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        match provider {
            Provider::Paystack => self.paystack.is_some(),
            Provider::Flutterwave => self.flutterwave.is_some(),
        }
    }

    pub async fn verify(&self, provider: Provider, reference: &str) -> Result<VerificationResult, GatewayError> {
        match provider {
            Provider::Paystack => self.paystack()?.verify(reference).await,
            Provider::Flutterwave => self.flutterwave()?.verify(reference).await,
        }
    }

    pub async fn initialize(
        &self,
        provider: Provider,
        request: &InitializeRequest,
    ) -> Result<InitializeResponse, GatewayError> {
        match provider {
            Provider::Paystack => self.paystack()?.initialize(request).await,
            Provider::Flutterwave => self.flutterwave()?.initialize(request).await,
        }
    }

    fn paystack(&self) -> Result<&PaystackApi, GatewayError> {
        self.paystack.as_ref().ok_or(GatewayError::MissingCredentials(Provider::Paystack))
    }

    fn flutterwave(&self) -> Result<&FlutterwaveApi, GatewayError> {
        self.flutterwave.as_ref().ok_or(GatewayError::MissingCredentials(Provider::Flutterwave))
    }
}
