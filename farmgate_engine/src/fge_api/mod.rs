//! # Farmgate settlement API
//!
//! The `fge_api` module exposes the programmatic API of the settlement engine.
//!
//! * [`settlement_api`] holds [`SettlementApi`](settlement_api::SettlementApi), the coordinator that every payment
//!   confirmation goes through, whatever triggered it.
//! * [`inventory_reconciler`] applies settled order lines to listing stock.
//! * [`commission_calculator`] splits each line into platform fee, partner commission and farmer net, and records the
//!   commission.
//!
//! The other submodules hold the result types and errors shared by these.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the storage traits, and a payment
//! gateway:
//!
//! ```rust,ignore
//! use farmgate_engine::{SettlementApi, SettlementConfig, SqliteDatabase};
//! use gateway_tools::{GatewayClients, GatewayConfig};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let gateway = GatewayClients::new(GatewayConfig::new_from_env_or_default());
//! let api = SettlementApi::new(db, gateway, SettlementConfig::default(), EventProducers::default());
//! let result = api.settle("FG-12-00ab43cd98ef0011", Provider::Paystack, SettlementSource::Poll).await?;
//! ```

pub mod commission_calculator;
pub mod errors;
pub mod inventory_reconciler;
pub mod settlement_api;
pub mod settlement_objects;
