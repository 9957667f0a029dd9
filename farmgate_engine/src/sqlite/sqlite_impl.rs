//! `SqliteDatabase` is a concrete implementation of a Farmgate settlement engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use fg_common::{Kobo, Provider, Rate};
use log::*;
use sqlx::SqlitePool;

use super::db::{commissions, db_url, listings, new_pool, orders, partners, transactions, users};
use crate::{
    db_types::{
        Commission,
        CommissionKey,
        Listing,
        NewCommission,
        NewListing,
        NewOrder,
        NewReferral,
        NewTransaction,
        NewUser,
        Order,
        OrderItem,
        Partner,
        Referral,
        Transaction,
        TransactionMetadata,
        User,
    },
    traits::{
        CommissionError,
        CommissionManagement,
        InventoryError,
        InventoryManagement,
        InventoryOutcome,
        SettlementDatabase,
        SettlementDatabaseError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the `FG_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Created new SQLite pool for {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }

    /// Runs the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Assigns the farmer to `partner_id` as a direct partner.
    pub async fn assign_partner(&self, farmer_id: i64, partner_id: i64) -> Result<(), SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        users::assign_partner(farmer_id, partner_id, &mut conn).await?;
        Ok(())
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_transaction(&self, reference: &str) -> Result<Option<Transaction>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::fetch_transaction(reference, &mut conn).await?;
        Ok(tx)
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<(Transaction, bool), SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        transactions::idempotent_insert(tx, &mut conn).await
    }

    async fn insert_shell_transaction(
        &self,
        reference: &str,
        provider: Provider,
    ) -> Result<Transaction, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::insert_shell(reference, provider, &mut conn).await?;
        warn!("🗃️ Shell transaction [{reference}] created for an unknown {provider} reference");
        Ok(tx)
    }

    async fn try_complete_transaction(
        &self,
        reference: &str,
        metadata: &TransactionMetadata,
        verified_amount: Kobo,
    ) -> Result<bool, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let won = transactions::try_complete(reference, metadata, verified_amount, &mut conn).await?;
        trace!("🗃️ Completion of [{reference}]: {}", if won { "won" } else { "lost" });
        Ok(won)
    }

    async fn try_fail_transaction(
        &self,
        reference: &str,
        metadata: &TransactionMetadata,
    ) -> Result<bool, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let won = transactions::try_fail(reference, metadata, &mut conn).await?;
        Ok(won)
    }

    async fn confirm_order_payment(&self, order_id: i64, reference: &str) -> Result<bool, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let changed = orders::confirm_payment(order_id, reference, &mut conn).await?;
        Ok(changed)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), SettlementDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        let items = orders::fetch_order_items(order.id, &mut tx).await?;
        tx.commit().await?;
        Ok((order, items))
    }

    async fn fetch_pending_transactions(
        &self,
        older_than: Duration,
    ) -> Result<Vec<Transaction>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let txs = transactions::fetch_pending_older_than(older_than, &mut conn).await?;
        Ok(txs)
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_user(user, &mut conn).await
    }

    async fn fetch_admin_ids(&self) -> Result<Vec<i64>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let ids = users::fetch_admin_ids(&mut conn).await?;
        Ok(ids)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn fetch_listing(&self, listing_id: i64) -> Result<Option<Listing>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let listing = listings::fetch_listing(listing_id, &mut conn).await?;
        Ok(listing)
    }

    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let listing = listings::insert_listing(listing, &mut conn).await?;
        Ok(listing)
    }

    /// The fence row and the decrement share one database transaction. Anything other than a successful decrement is
    /// rolled back, which releases the fence so that a later retry can still apply the adjustment.
    async fn apply_inventory_adjustment(
        &self,
        reference: &str,
        listing_id: i64,
        quantity: i64,
    ) -> Result<InventoryOutcome, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        let mut tx = self.pool.begin().await?;
        let outcome = listings::fenced_decrement(reference, listing_id, quantity, &mut tx).await?;
        match outcome {
            InventoryOutcome::Adjusted { .. } => tx.commit().await?,
            _ => tx.rollback().await?,
        }
        Ok(outcome)
    }
}

impl CommissionManagement for SqliteDatabase {
    async fn fetch_active_referral(
        &self,
        farmer_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Referral>, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let referral = partners::fetch_active_referral(farmer_id, now, &mut conn).await?;
        Ok(referral)
    }

    async fn fetch_direct_partner(&self, farmer_id: i64) -> Result<Option<Partner>, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let partner = partners::fetch_direct_partner(farmer_id, &mut conn).await?;
        Ok(partner)
    }

    async fn fetch_partner(&self, partner_id: i64) -> Result<Option<Partner>, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let partner = partners::fetch_partner(partner_id, &mut conn).await?;
        Ok(partner)
    }

    async fn insert_partner(&self, user_id: i64, commission_rate: Option<Rate>) -> Result<Partner, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let partner = partners::insert_partner(user_id, commission_rate, &mut conn).await?;
        Ok(partner)
    }

    async fn insert_referral(&self, referral: NewReferral) -> Result<Referral, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let referral = partners::insert_referral(referral, &mut conn).await?;
        Ok(referral)
    }

    async fn commission_exists(&self, key: &CommissionKey) -> Result<bool, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let exists = commissions::commission_exists(key, &mut conn).await?;
        Ok(exists)
    }

    async fn insert_commission(&self, commission: NewCommission) -> Result<Commission, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        commissions::insert_commission(commission, &mut conn).await
    }

    async fn increment_partner_commissions(&self, partner_id: i64, amount: Kobo) -> Result<Kobo, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        partners::increment_total_commissions(partner_id, amount, &mut conn)
            .await?
            .ok_or(CommissionError::PartnerNotFound(partner_id))
    }

    async fn set_partner_total_commissions(&self, partner_id: i64, total: Kobo) -> Result<(), CommissionError> {
        let mut conn = self.pool.acquire().await?;
        match partners::set_total_commissions(partner_id, total, &mut conn).await? {
            0 => Err(CommissionError::PartnerNotFound(partner_id)),
            _ => Ok(()),
        }
    }

    async fn fetch_commissions_for_order(&self, order_id: i64) -> Result<Vec<Commission>, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let commissions = commissions::fetch_commissions_for_order(order_id, &mut conn).await?;
        Ok(commissions)
    }
}
