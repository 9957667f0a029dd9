//! # Storage and provider seams
//!
//! The settlement engine never talks to a database or a payment provider directly. It works through the traits in
//! this module, and a backend (currently [`crate::SqliteDatabase`]) implements them.
//!
//! * [`SettlementDatabase`] is the payment ledger and order store. It owns the conditional `pending → completed`
//!   transition that makes settlement exactly-once.
//! * [`InventoryManagement`] adjusts listing stock with a single conditional decrement, fenced per payment reference.
//! * [`CommissionManagement`] resolves partner attribution and keeps the commission ledger.
//! * [`PaymentGateway`] asks a payment provider whether a charge succeeded.
//!
//! [`SettlementBackend`] bundles the three storage traits so that callers can ask for "a backend" with one bound.
mod commission_management;
mod data_objects;
mod inventory_management;
mod payment_gateway;
mod settlement_database;

pub use commission_management::{CommissionError, CommissionManagement};
pub use data_objects::InventoryOutcome;
pub use inventory_management::{InventoryError, InventoryManagement};
pub use payment_gateway::PaymentGateway;
pub use settlement_database::{SettlementDatabase, SettlementDatabaseError};

/// Everything the settlement coordinator needs from storage.
pub trait SettlementBackend: SettlementDatabase + InventoryManagement + CommissionManagement {}

impl<T> SettlementBackend for T where T: SettlementDatabase + InventoryManagement + CommissionManagement {}
