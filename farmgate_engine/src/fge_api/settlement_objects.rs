use std::time::Duration;

use fg_common::{Kobo, Rate};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, Transaction},
    fge_api::commission_calculator::CommissionOutcome,
    traits::InventoryOutcome,
};

pub const DEFAULT_PLATFORM_FEE_RATE: Rate = Rate::from_bps(300);
pub const DEFAULT_COMMISSION_RATE: Rate = Rate::from_bps(500);
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Deducted from every settled item, whether or not a partner is involved.
    pub platform_fee_rate: Rate,
    /// Used for partners and referrals that do not carry their own rate.
    pub default_commission_rate: Rate,
    /// When set, the payment provider is never consulted and every pending payment is treated as paid in full.
    pub test_mode: bool,
    pub gateway_timeout: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            platform_fee_rate: DEFAULT_PLATFORM_FEE_RATE,
            default_commission_rate: DEFAULT_COMMISSION_RATE,
            test_mode: false,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

/// The current state of a payment and the order it pays for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    pub transaction: Transaction,
    pub order: Option<Order>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub listing_id: i64,
    pub ordered: i64,
    pub available: i64,
}

/// Why an order line was left out of commission accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionSkipReason {
    /// The listing did not have enough stock for the line.
    Shortfall,
    ListingNotFound,
}

/// What happened to one order line during settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSettlement {
    pub order_item_id: i64,
    pub listing_id: i64,
    pub farmer_id: Option<i64>,
    pub quantity: i64,
    pub item_amount: Kobo,
    pub inventory: Option<InventoryOutcome>,
    pub commission: Option<CommissionOutcome>,
    /// Set when no commission was computed because the stock adjustment did not go through.
    #[serde(default)]
    pub commission_skipped: Option<CommissionSkipReason>,
    /// Enrichment failures for this line. They do not affect the payment itself.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub transaction: Transaction,
    pub order: Option<Order>,
    pub items: Vec<ItemSettlement>,
    pub shortfalls: Vec<Shortfall>,
    /// Failures that stopped the side effects before they reached the order lines, e.g. the order could not be
    /// loaded. The payment stays completed; `reconcile` applies whatever is missing.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl SettlementReport {
    /// A report with no order details, for a completed payment.
    pub fn for_payment(transaction: Transaction) -> Self {
        Self { transaction, order: None, items: vec![], shortfalls: vec![], errors: vec![] }
    }

    pub fn snapshot(&self) -> TransactionSnapshot {
        TransactionSnapshot { transaction: self.transaction.clone(), order: self.order.clone() }
    }

    pub fn recorded_commissions(&self) -> usize {
        self.items.iter().filter(|i| matches!(i.commission, Some(CommissionOutcome::Recorded { .. }))).count()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.items.iter().any(|i| !i.errors.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "details", rename_all = "snake_case")]
pub enum SettlementResult {
    /// This call moved the payment to `completed` and ran the settlement side effects.
    Settled(SettlementReport),
    /// The payment was already completed. Nothing was changed.
    AlreadySettled(TransactionSnapshot),
    /// The provider has not confirmed the charge yet. Nothing was changed.
    NotYetPaid(TransactionSnapshot),
    /// The provider reports that the charge failed. The payment is `failed` and the order is untouched.
    PaymentFailed(TransactionSnapshot),
    Refunded(TransactionSnapshot),
}

impl SettlementResult {
    pub fn snapshot(&self) -> TransactionSnapshot {
        match self {
            SettlementResult::Settled(report) => report.snapshot(),
            SettlementResult::AlreadySettled(s)
            | SettlementResult::NotYetPaid(s)
            | SettlementResult::PaymentFailed(s)
            | SettlementResult::Refunded(s) => s.clone(),
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            SettlementResult::Settled(_) => "settled",
            SettlementResult::AlreadySettled(_) => "already_settled",
            SettlementResult::NotYetPaid(_) => "not_yet_paid",
            SettlementResult::PaymentFailed(_) => "payment_failed",
            SettlementResult::Refunded(_) => "refunded",
        }
    }

    /// True if the payment is completed, whether by this call or an earlier one.
    pub fn is_paid(&self) -> bool {
        matches!(self, SettlementResult::Settled(_) | SettlementResult::AlreadySettled(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInitialization {
    pub transaction: Transaction,
    pub authorization_url: Option<String>,
    pub access_code: Option<String>,
    /// Only present in test mode, where the payment is settled straight away.
    pub settlement: Option<SettlementResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResult {
    pub checked: usize,
    pub settled: Vec<String>,
    pub failed: Vec<String>,
    pub still_pending: Vec<String>,
    pub errors: Vec<(String, String)>,
}
