//! # Farmgate Payment Server
//!
//! The HTTP front end of the Farmgate settlement engine. It accepts payment webhooks from Paystack and Flutterwave,
//! answers the storefront's payment status polls, creates new payments, and offers an out-of-band reconciliation
//! endpoint for operators. A background worker re-checks payments that have been pending for too long.
//!
//! Every route that can settle a payment goes through [`farmgate_engine::SettlementApi::settle`], so a payment is
//! settled once however many webhooks, polls and sweeps arrive for it.
//!
//! Configuration is read from environment variables. Run the binary with any argument to see the list.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod server;
pub mod sweep_worker;

#[cfg(test)]
mod endpoint_tests;
