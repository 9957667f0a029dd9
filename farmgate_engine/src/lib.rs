//! Farmgate Settlement Engine
//!
//! The Farmgate marketplace lets buyers pay for farm produce through third-party payment providers. A payment can be
//! confirmed through several channels: the provider's webhook, the buyer's client polling for the result, a background
//! sweep of stale payments, and (in test mode) automatic verification at initialization. This library makes sure that
//! however many of these arrive, and in whatever order, each payment is settled exactly once:
//!
//! * the payment transaction moves from `pending` to a terminal state,
//! * the order is confirmed and marked paid,
//! * stock is taken from each listing without ever going negative,
//! * the platform fee and partner commission are recorded for each line,
//! * the buyer, the farmers and the admins are notified.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@traits`], [`mod@sqlite`]). The settlement logic only talks to storage through the traits. SQLite
//!    is the supported backend. The data types are defined in [`mod@db_types`] and are public.
//! 2. The public API ([`mod@fge_api`]). [`SettlementApi`] is the single entry point for settling payments.
//! 3. Events ([`mod@events`]). Settlement emits events for settled payments, earned commissions and user
//!    notifications. A simple actor framework lets you hook into these and perform custom actions, such as sending
//!    emails.
pub mod db_types;
pub mod events;
pub mod fge_api;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use fge_api::{
    commission_calculator::{CommissionCalculator, CommissionOutcome, CommissionSource, FeeSplit},
    errors::SettlementError,
    inventory_reconciler::InventoryReconciler,
    settlement_api::SettlementApi,
    settlement_objects::{
        CommissionSkipReason,
        ItemSettlement,
        PaymentInitialization,
        SettlementConfig,
        SettlementReport,
        SettlementResult,
        Shortfall,
        SweepResult,
        TransactionSnapshot,
        DEFAULT_COMMISSION_RATE,
        DEFAULT_GATEWAY_TIMEOUT,
        DEFAULT_PLATFORM_FEE_RATE,
    },
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    CommissionError,
    CommissionManagement,
    InventoryError,
    InventoryManagement,
    InventoryOutcome,
    PaymentGateway,
    SettlementBackend,
    SettlementDatabase,
    SettlementDatabaseError,
};
