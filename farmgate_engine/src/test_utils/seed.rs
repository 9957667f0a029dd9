use chrono::{DateTime, Utc};
use fg_common::{Kobo, Provider, Rate, NAIRA_CURRENCY_CODE};

use crate::{
    db_types::{
        Listing,
        NewListing,
        NewOrder,
        NewReferral,
        NewTransaction,
        NewUser,
        Order,
        OrderItem,
        Partner,
        Referral,
        ReferralStatus,
        Role,
        Transaction,
        TransactionMetadata,
        User,
    },
    helpers::new_payment_reference,
    traits::{CommissionManagement, InventoryManagement, SettlementDatabase},
    SqliteDatabase,
};

/// Seeds a test database with the people and stock that a settlement needs: one admin, one buyer and whatever farmers,
/// partners and listings a test adds.
#[derive(Debug, Clone)]
pub struct Marketplace {
    pub db: SqliteDatabase,
    pub admin: User,
    pub buyer: User,
    counter: u64,
}

#[derive(Debug, Clone)]
pub struct SeededOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub transaction: Transaction,
}

impl SeededOrder {
    pub fn reference(&self) -> &str {
        self.transaction.reference.as_str()
    }
}

impl Marketplace {
    pub async fn new(db: SqliteDatabase) -> Self {
        let tag = rand::random::<u32>();
        let admin = db
            .insert_user(NewUser::new(format!("Admin {tag}"), format!("admin{tag}@farmgate.ng"), Role::Admin))
            .await
            .expect("Error creating admin");
        let buyer = db
            .insert_user(NewUser::new(format!("Buyer {tag}"), format!("buyer{tag}@farmgate.ng"), Role::Buyer))
            .await
            .expect("Error creating buyer");
        Self { db, admin, buyer, counter: u64::from(tag) << 16 }
    }

    fn next_tag(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    pub async fn add_user(&mut self, role: Role) -> User {
        let tag = self.next_tag();
        let user = NewUser::new(format!("{role} {tag}"), format!("{role}{tag}@farmgate.ng"), role);
        self.db.insert_user(user).await.expect("Error creating user")
    }

    pub async fn add_farmer(&mut self) -> User {
        self.add_user(Role::Farmer).await
    }

    pub async fn add_partner(&mut self, commission_rate: Option<Rate>) -> Partner {
        let user = self.add_user(Role::Partner).await;
        self.db.insert_partner(user.id, commission_rate).await.expect("Error creating partner")
    }

    pub async fn assign_partner(&self, farmer: &User, partner: &Partner) {
        self.db.assign_partner(farmer.id, partner.id).await.expect("Error assigning partner");
    }

    pub async fn add_referral(
        &self,
        partner: &Partner,
        farmer: &User,
        commission_rate: Option<Rate>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Referral {
        let referral = NewReferral {
            partner_id: partner.id,
            farmer_id: farmer.id,
            commission_rate,
            status: ReferralStatus::Active,
            expires_at,
        };
        self.db.insert_referral(referral).await.expect("Error creating referral")
    }

    pub async fn add_listing(&self, farmer: &User, quantity: i64, price: Kobo) -> Listing {
        let listing = NewListing::new(farmer.id, format!("Produce from farmer {}", farmer.id), quantity, price);
        self.db.insert_listing(listing).await.expect("Error creating listing")
    }

    /// Places an order from the buyer for `(listing, quantity)` lines at the listing price, and creates the pending
    /// payment for it.
    pub async fn place_order(&self, lines: &[(&Listing, i64)]) -> SeededOrder {
        let order = lines
            .iter()
            .fold(NewOrder::new(self.buyer.id), |order, (listing, qty)| order.with_item(listing.id, *qty, listing.price));
        let (order, items) = self.db.insert_order(order).await.expect("Error creating order");
        let transaction = self.create_payment(&order).await;
        SeededOrder { order, items, transaction }
    }

    pub async fn create_payment(&self, order: &Order) -> Transaction {
        let tx = NewTransaction {
            reference: new_payment_reference(order.id),
            provider: Provider::Paystack,
            order_id: Some(order.id),
            amount: order.total,
            currency: NAIRA_CURRENCY_CODE.to_string(),
            metadata: TransactionMetadata::default(),
        };
        let (tx, _) = self.db.insert_transaction(tx).await.expect("Error creating transaction");
        tx
    }

    pub async fn listing(&self, listing_id: i64) -> Listing {
        self.db.fetch_listing(listing_id).await.expect("Error fetching listing").expect("Listing does not exist")
    }

    pub async fn partner(&self, partner_id: i64) -> Partner {
        self.db.fetch_partner(partner_id).await.expect("Error fetching partner").expect("Partner does not exist")
    }

    pub async fn order(&self, order_id: i64) -> Order {
        self.db.fetch_order(order_id).await.expect("Error fetching order").expect("Order does not exist")
    }

    pub async fn transaction(&self, reference: &str) -> Transaction {
        self.db.fetch_transaction(reference).await.expect("Error fetching transaction").expect("No transaction")
    }
}
