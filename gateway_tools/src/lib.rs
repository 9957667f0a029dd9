//! # Gateway tools
//!
//! Thin REST clients for the payment providers that Farmgate accepts payments through, and the normalisation of
//! their verification responses into a single [`VerificationResult`] shape.
//!
//! * [`PaystackApi`] talks to `GET /transaction/verify/:reference` (amounts in kobo).
//! * [`FlutterwaveApi`] talks to `GET /transactions/:id/verify` (amounts in naira).
//! * [`GatewayClients`] routes a request to the right client for a [`Provider`].
//!
//! A charge that has not succeeded (yet) is a normal result with `paid == false`, never an error. Errors are reserved
//! for timeouts, transport failures and responses that cannot be understood; all of them are safe to retry.
mod clients;
mod config;
mod data_objects;
mod error;
mod flutterwave;
pub mod helpers;
mod paystack;

pub use clients::GatewayClients;
pub use config::{FlutterwaveConfig, GatewayConfig, PaystackConfig};
pub use data_objects::{ChargeStatus, CustomerInfo, InitializeRequest, InitializeResponse, VerificationResult};
pub use error::GatewayError;
pub use fg_common::Provider;
pub use flutterwave::{normalize_flutterwave_verification, FlutterwaveApi};
pub use paystack::{normalize_paystack_verification, PaystackApi};
