mod webhook_signature;

pub use webhook_signature::{
    WebhookSecrets,
    WebhookSignatureFactory,
    WebhookSignatureService,
    FLUTTERWAVE_HASH_HEADER,
    PAYSTACK_SIGNATURE_HEADER,
};
