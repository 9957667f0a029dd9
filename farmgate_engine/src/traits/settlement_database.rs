use chrono::Duration;
use fg_common::{Kobo, Provider};
use thiserror::Error;

use crate::db_types::{NewOrder, NewTransaction, NewUser, Order, OrderItem, Transaction, TransactionMetadata, User};

/// The payment ledger and the order store.
///
/// Every state change on a transaction is a single conditional write that only succeeds from `pending`. The return
/// value of those writes tells the caller whether *it* made the change, which is what lets concurrent settlement
/// attempts agree on a single winner without any locking.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    async fn fetch_transaction(&self, reference: &str) -> Result<Option<Transaction>, SettlementDatabaseError>;

    /// Stores a new `pending` transaction. This call is idempotent on `reference`: if the reference already exists,
    /// the existing record is returned along with `false`.
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<(Transaction, bool), SettlementDatabaseError>;

    /// Creates a `pending` placeholder for a reference that arrived by webhook before (or without) initialization.
    /// The placeholder has no order and a zero amount. If the reference appears concurrently, the existing record wins.
    async fn insert_shell_transaction(
        &self,
        reference: &str,
        provider: Provider,
    ) -> Result<Transaction, SettlementDatabaseError>;

    /// Moves the transaction from `pending` to `completed`, storing `metadata` and the processing time.
    ///
    /// If the ledger amount is zero (a shell transaction), it is replaced with `verified_amount`.
    ///
    /// Returns `true` only for the caller whose write changed the record.
    async fn try_complete_transaction(
        &self,
        reference: &str,
        metadata: &TransactionMetadata,
        verified_amount: Kobo,
    ) -> Result<bool, SettlementDatabaseError>;

    /// Moves the transaction from `pending` to `failed`. Returns `true` only if this call made the change.
    async fn try_fail_transaction(
        &self,
        reference: &str,
        metadata: &TransactionMetadata,
    ) -> Result<bool, SettlementDatabaseError>;

    /// Marks the order `confirmed/paid` against `reference`. Only a `pending` payment status is changed, so this is
    /// safe to call repeatedly. Returns `true` if the order was changed by this call.
    async fn confirm_order_payment(&self, order_id: i64, reference: &str) -> Result<bool, SettlementDatabaseError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, SettlementDatabaseError>;

    /// The order lines, with the seller of each line taken from its listing.
    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementDatabaseError>;

    /// Checkout: stores a `pending/pending` order and its lines. Stock is not reserved.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), SettlementDatabaseError>;

    /// All `pending` transactions created at least `older_than` ago, oldest first.
    async fn fetch_pending_transactions(
        &self,
        older_than: Duration,
    ) -> Result<Vec<Transaction>, SettlementDatabaseError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, SettlementDatabaseError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, SettlementDatabaseError>;

    /// The ids of every admin user. Admins receive a copy of every settlement notification.
    async fn fetch_admin_ids(&self) -> Result<Vec<i64>, SettlementDatabaseError>;
}

#[derive(Debug, Clone, Error)]
pub enum SettlementDatabaseError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("Cannot insert order. {0}")]
    InvalidOrder(String),
    #[error("Cannot insert user, since {0} is already registered")]
    UserAlreadyExists(String),
}

impl From<sqlx::Error> for SettlementDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        SettlementDatabaseError::DatabaseError(e.to_string())
    }
}
