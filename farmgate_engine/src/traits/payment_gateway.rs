use gateway_tools::{GatewayClients, GatewayError, InitializeRequest, InitializeResponse, Provider, VerificationResult};

/// Asks a payment provider about a charge.
///
/// "Not paid yet" is a normal [`VerificationResult`] with `paid == false`. Errors mean the provider could not give an
/// answer, and the question can be asked again later.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn verify(&self, provider: Provider, reference: &str) -> Result<VerificationResult, GatewayError>;

    async fn initialize(
        &self,
        provider: Provider,
        request: &InitializeRequest,
    ) -> Result<InitializeResponse, GatewayError>;
}

impl PaymentGateway for GatewayClients {
    async fn verify(&self, provider: Provider, reference: &str) -> Result<VerificationResult, GatewayError> {
        GatewayClients::verify(self, provider, reference).await
    }

    async fn initialize(
        &self,
        provider: Provider,
        request: &InitializeRequest,
    ) -> Result<InitializeResponse, GatewayError> {
        GatewayClients::initialize(self, provider, request).await
    }
}
