use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};
use fg_common::{Kobo, Provider, Rate};
use log::*;

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
    SqliteDatabase,
};

/// Storage calls that a [`FaultyDatabase`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    ConfirmOrder,
    FetchOrder,
    FetchOrderItems,
    FetchTransaction,
}

/// A [`SqliteDatabase`] that fails selected calls on demand, for exercising the error paths of the settlement flow.
#[derive(Debug, Clone)]
pub struct FaultyDatabase {
    db: SqliteDatabase,
    faults: Arc<Mutex<HashSet<Fault>>>,
}

impl FaultyDatabase {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db, faults: Arc::default() }
    }

    pub fn inner(&self) -> &SqliteDatabase {
        &self.db
    }

    pub fn inject(&self, fault: Fault) {
        self.faults.lock().expect("fault set poisoned").insert(fault);
    }

    pub fn clear(&self) {
        self.faults.lock().expect("fault set poisoned").clear();
    }

    fn check(&self, fault: Fault) -> Result<(), SettlementDatabaseError> {
        if self.faults.lock().expect("fault set poisoned").contains(&fault) {
            debug!("💥️ Injected failure: {fault:?}");
            return Err(SettlementDatabaseError::DatabaseError(format!("injected failure in {fault:?}")));
        }
        Ok(())
    }
}

impl SettlementDatabase for FaultyDatabase {
    fn url(&self) -> &str {
        self.db.url()
    }

    async fn fetch_transaction(&self, reference: &str) -> Result<Option<Transaction>, SettlementDatabaseError> {
        self.check(Fault::FetchTransaction)?;
        self.db.fetch_transaction(reference).await
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<(Transaction, bool), SettlementDatabaseError> {
        self.db.insert_transaction(tx).await
    }

    async fn insert_shell_transaction(
        &self,
        reference: &str,
        provider: Provider,
    ) -> Result<Transaction, SettlementDatabaseError> {
        self.db.insert_shell_transaction(reference, provider).await
    }

    async fn try_complete_transaction(
        &self,
        reference: &str,
        metadata: &TransactionMetadata,
        verified_amount: Kobo,
    ) -> Result<bool, SettlementDatabaseError> {
        self.db.try_complete_transaction(reference, metadata, verified_amount).await
    }

    async fn try_fail_transaction(
        &self,
        reference: &str,
        metadata: &TransactionMetadata,
    ) -> Result<bool, SettlementDatabaseError> {
        self.db.try_fail_transaction(reference, metadata).await
    }

    async fn confirm_order_payment(&self, order_id: i64, reference: &str) -> Result<bool, SettlementDatabaseError> {
        self.check(Fault::ConfirmOrder)?;
        self.db.confirm_order_payment(order_id, reference).await
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, SettlementDatabaseError> {
        self.check(Fault::FetchOrder)?;
        self.db.fetch_order(order_id).await
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementDatabaseError> {
        self.check(Fault::FetchOrderItems)?;
        self.db.fetch_order_items(order_id).await
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), SettlementDatabaseError> {
        self.db.insert_order(order).await
    }

    async fn fetch_pending_transactions(
        &self,
        older_than: Duration,
    ) -> Result<Vec<Transaction>, SettlementDatabaseError> {
        self.db.fetch_pending_transactions(older_than).await
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, SettlementDatabaseError> {
        self.db.fetch_user(user_id).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, SettlementDatabaseError> {
        self.db.insert_user(user).await
    }

    async fn fetch_admin_ids(&self) -> Result<Vec<i64>, SettlementDatabaseError> {
        self.db.fetch_admin_ids().await
    }
}

impl InventoryManagement for FaultyDatabase {
    async fn fetch_listing(&self, listing_id: i64) -> Result<Option<Listing>, InventoryError> {
        self.db.fetch_listing(listing_id).await
    }

    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, InventoryError> {
        self.db.insert_listing(listing).await
    }

    async fn apply_inventory_adjustment(
        &self,
        reference: &str,
        listing_id: i64,
        quantity: i64,
    ) -> Result<InventoryOutcome, InventoryError> {
        self.db.apply_inventory_adjustment(reference, listing_id, quantity).await
    }
}

impl CommissionManagement for FaultyDatabase {
    async fn fetch_active_referral(
        &self,
        farmer_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Referral>, CommissionError> {
        self.db.fetch_active_referral(farmer_id, now).await
    }

    async fn fetch_direct_partner(&self, farmer_id: i64) -> Result<Option<Partner>, CommissionError> {
        self.db.fetch_direct_partner(farmer_id).await
    }

    async fn fetch_partner(&self, partner_id: i64) -> Result<Option<Partner>, CommissionError> {
        self.db.fetch_partner(partner_id).await
    }

    async fn insert_partner(&self, user_id: i64, commission_rate: Option<Rate>) -> Result<Partner, CommissionError> {
        self.db.insert_partner(user_id, commission_rate).await
    }

    async fn insert_referral(&self, referral: NewReferral) -> Result<Referral, CommissionError> {
        self.db.insert_referral(referral).await
    }

    async fn commission_exists(&self, key: &CommissionKey) -> Result<bool, CommissionError> {
        self.db.commission_exists(key).await
    }

    async fn insert_commission(&self, commission: NewCommission) -> Result<Commission, CommissionError> {
        self.db.insert_commission(commission).await
    }

    async fn increment_partner_commissions(&self, partner_id: i64, amount: Kobo) -> Result<Kobo, CommissionError> {
        self.db.increment_partner_commissions(partner_id, amount).await
    }

    async fn set_partner_total_commissions(&self, partner_id: i64, total: Kobo) -> Result<(), CommissionError> {
        self.db.set_partner_total_commissions(partner_id, total).await
    }

    async fn fetch_commissions_for_order(&self, order_id: i64) -> Result<Vec<Commission>, CommissionError> {
        self.db.fetch_commissions_for_order(order_id).await
    }
}
