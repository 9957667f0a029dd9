use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{Commission, Order, Role, SettlementSource, Transaction};

/// Fired exactly once per payment, by the caller that moved the transaction from `pending` to `completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub transaction: Transaction,
    pub order: Option<Order>,
    pub source: SettlementSource,
}

/// A request to tell a user something. How (and whether) it is delivered is up to the hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub user_id: i64,
    pub role: Role,
    pub category: String,
    pub subtype: String,
    pub context: Value,
}

impl NotificationEvent {
    pub fn new(user_id: i64, role: Role, category: &str, subtype: &str, context: Value) -> Self {
        Self { user_id, role, category: category.to_string(), subtype: subtype.to_string(), context }
    }

    /// `category/subtype`, e.g. `payment/completed`
    pub fn kind(&self) -> String {
        format!("{}/{}", self.category, self.subtype)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionEarnedEvent {
    pub commission: Commission,
    pub partner_user_id: i64,
}
