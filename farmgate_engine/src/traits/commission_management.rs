use chrono::{DateTime, Utc};
use fg_common::{Kobo, Rate};
use thiserror::Error;

use crate::db_types::{Commission, CommissionKey, NewCommission, NewReferral, Partner, Referral};

#[allow(async_fn_in_trait)]
pub trait CommissionManagement: Clone {
    /// The most recent `active` referral for the farmer that has not expired at `now`.
    async fn fetch_active_referral(&self, farmer_id: i64, now: DateTime<Utc>)
        -> Result<Option<Referral>, CommissionError>;

    /// The partner the farmer is directly assigned to, if any.
    async fn fetch_direct_partner(&self, farmer_id: i64) -> Result<Option<Partner>, CommissionError>;

    async fn fetch_partner(&self, partner_id: i64) -> Result<Option<Partner>, CommissionError>;

    async fn insert_partner(&self, user_id: i64, commission_rate: Option<Rate>) -> Result<Partner, CommissionError>;

    async fn insert_referral(&self, referral: NewReferral) -> Result<Referral, CommissionError>;

    async fn commission_exists(&self, key: &CommissionKey) -> Result<bool, CommissionError>;

    /// Inserts a `pending` commission. Fails with [`CommissionError::AlreadyExists`] if a row with the same key is
    /// already present.
    async fn insert_commission(&self, commission: NewCommission) -> Result<Commission, CommissionError>;

    /// Atomically adds `amount` to the partner's running total and returns the new total.
    async fn increment_partner_commissions(&self, partner_id: i64, amount: Kobo) -> Result<Kobo, CommissionError>;

    /// Overwrites the partner's running total.
    async fn set_partner_total_commissions(&self, partner_id: i64, total: Kobo) -> Result<(), CommissionError>;

    async fn fetch_commissions_for_order(&self, order_id: i64) -> Result<Vec<Commission>, CommissionError>;
}

#[derive(Debug, Clone, Error)]
pub enum CommissionError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A commission already exists for partner {} on order {} listing {}", .0.partner_id, .0.order_id, .0.listing_id)]
    AlreadyExists(CommissionKey),
    #[error("The requested partner {0} does not exist")]
    PartnerNotFound(i64),
}

impl From<sqlx::Error> for CommissionError {
    fn from(e: sqlx::Error) -> Self {
        CommissionError::DatabaseError(e.to_string())
    }
}
