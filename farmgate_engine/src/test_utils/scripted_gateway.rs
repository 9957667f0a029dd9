use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use fg_common::{Kobo, Provider};
use gateway_tools::{ChargeStatus, GatewayError, InitializeRequest, InitializeResponse, VerificationResult};
use serde_json::json;

use crate::traits::PaymentGateway;

#[derive(Debug, Clone)]
enum Script {
    Charge { status: ChargeStatus, amount: Kobo },
    Error(GatewayError),
}

/// A payment gateway that answers from a script instead of calling a provider.
///
/// References without a script are reported as pending. Every `verify` call is counted, so tests can check how
/// often the provider would have been contacted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    delay: Option<Duration>,
    verify_calls: Arc<AtomicUsize>,
    initialize_calls: Arc<AtomicUsize>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `verify` call waits this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The provider reports the charge as paid, for `amount`.
    pub fn paid(&self, reference: &str, amount: Kobo) {
        self.script(reference, Script::Charge { status: ChargeStatus::Paid, amount });
    }

    pub fn failed(&self, reference: &str) {
        self.script(reference, Script::Charge { status: ChargeStatus::Failed, amount: Kobo::default() });
    }

    pub fn pending(&self, reference: &str) {
        self.script(reference, Script::Charge { status: ChargeStatus::Pending, amount: Kobo::default() });
    }

    pub fn error(&self, reference: &str, error: GatewayError) {
        self.script(reference, Script::Error(error));
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    fn script(&self, reference: &str, script: Script) {
        let mut scripts = self.scripts.lock().expect("scripts lock poisoned");
        scripts.insert(reference.to_string(), script);
    }

    fn lookup(&self, reference: &str) -> Option<Script> {
        let scripts = self.scripts.lock().expect("scripts lock poisoned");
        scripts.get(reference).cloned()
    }
}

impl PaymentGateway for ScriptedGateway {
    async fn verify(&self, provider: Provider, reference: &str) -> Result<VerificationResult, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let (status, amount) = match self.lookup(reference) {
            Some(Script::Error(e)) => return Err(e),
            Some(Script::Charge { status, amount }) => (status, amount),
            None => (ChargeStatus::Pending, Kobo::default()),
        };
        let mut result = VerificationResult::synthesized_paid(provider, reference, amount);
        result.status = status;
        result.paid = status == ChargeStatus::Paid;
        result.gateway_status = match status {
            ChargeStatus::Paid => "success",
            ChargeStatus::Failed => "failed",
            ChargeStatus::Pending => "ongoing",
        }
        .to_string();
        result.channel = Some("card".to_string());
        result.raw = json!({ "scripted": true, "reference": reference });
        Ok(result)
    }

    async fn initialize(
        &self,
        provider: Provider,
        request: &InitializeRequest,
    ) -> Result<InitializeResponse, GatewayError> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(Script::Error(e)) = self.lookup("initialize") {
            return Err(e);
        }
        Ok(InitializeResponse {
            provider,
            reference: request.reference.clone(),
            authorization_url: format!("https://checkout.example.com/{}", request.reference),
            access_code: Some(format!("ac_{}", request.reference)),
        })
    }
}
