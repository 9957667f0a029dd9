use farmgate_engine::traits::PaymentGateway;
use fg_common::Kobo;
use gateway_tools::{ChargeStatus, GatewayError, InitializeRequest, InitializeResponse, Provider, VerificationResult};
use mockall::mock;

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn verify(&self, provider: Provider, reference: &str) -> Result<VerificationResult, GatewayError>;
        async fn initialize(&self, provider: Provider, request: &InitializeRequest) -> Result<InitializeResponse, GatewayError>;
    }
}

pub fn paid(provider: Provider, reference: &str, amount: Kobo) -> VerificationResult {
    let mut result = VerificationResult::synthesized_paid(provider, reference, amount);
    result.channel = Some("card".to_string());
    result
}

pub fn pending(provider: Provider, reference: &str) -> VerificationResult {
    let mut result = VerificationResult::synthesized_paid(provider, reference, Kobo::default());
    result.paid = false;
    result.status = ChargeStatus::Pending;
    result.gateway_status = "ongoing".to_string();
    result.paid_at = None;
    result
}
