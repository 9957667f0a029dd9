use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use fg_common::{Kobo, Provider, Rate};
use gateway_tools::VerificationResult;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

/// Implements `Display` and `FromStr` for a fieldless enum using the same snake_case names that are stored in the
/// database.
macro_rules! string_enum {
    ($t:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($t::$variant => write!(f, $name),)+
                }
            }
        }

        impl FromStr for $t {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($t::$variant),)+
                    _ => Err(ConversionError { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Farmer,
    Partner,
    Admin,
}

string_enum!(Role, "role", { Buyer => "buyer", Farmer => "farmer", Partner => "partner", Admin => "admin" });

//--------------------------------------   TransactionStatus  --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Created at payment initialization. The only state a settlement can start from.
    Pending,
    Completed,
    Failed,
    Refunded,
}

string_enum!(TransactionStatus, "transaction status", {
    Pending => "pending", Completed => "completed", Failed => "failed", Refunded => "refunded"
});

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Payment,
    Refund,
}

string_enum!(TransactionType, "transaction type", { Payment => "payment", Refund => "refund" });

//--------------------------------------     OrderStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

string_enum!(PaymentStatus, "payment status", { Pending => "pending", Paid => "paid", Refunded => "refunded" });

//--------------------------------------    ListingStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
    Active,
    SoldOut,
    Expired,
    Inactive,
}

string_enum!(ListingStatus, "listing status", {
    Draft => "draft", Active => "active", SoldOut => "sold_out", Expired => "expired", Inactive => "inactive"
});

//--------------------------------------   Commission enums   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Paid,
}

string_enum!(CommissionStatus, "commission status", { Pending => "pending", Paid => "paid" });

/// How a commission was attributed to its partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionType {
    Referral,
    Direct,
    None,
}

string_enum!(CommissionType, "commission type", { Referral => "referral", Direct => "direct", None => "none" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Active,
    Revoked,
}

string_enum!(ReferralStatus, "referral status", { Active => "active", Revoked => "revoked" });

//--------------------------------------  SettlementSource   ---------------------------------------------------------
/// The channel through which a "payment confirmed" signal arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementSource {
    Webhook,
    Poll,
    AutoVerify,
    Sweep,
    Reconcile,
}

string_enum!(SettlementSource, "settlement source", {
    Webhook => "webhook", Poll => "poll", AutoVerify => "auto_verify", Sweep => "sweep", Reconcile => "reconcile"
});

//--------------------------------------        Users        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// The farmer's standing partner assignment, if any.
    pub partner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub partner_id: Option<i64>,
}

impl NewUser {
    pub fn new<S: Into<String>>(name: S, email: S, role: Role) -> Self {
        Self { name: name.into(), email: email.into(), role, partner_id: None }
    }

    pub fn with_partner(mut self, partner_id: i64) -> Self {
        self.partner_id = Some(partner_id);
        self
    }
}

//--------------------------------------      Partners       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Partner {
    pub id: i64,
    pub user_id: i64,
    /// `None` means the platform default commission rate applies.
    #[sqlx(rename = "commission_rate_bps")]
    pub commission_rate: Option<Rate>,
    pub total_commissions: Kobo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Referral {
    pub id: i64,
    pub partner_id: i64,
    pub farmer_id: i64,
    #[sqlx(rename = "commission_rate_bps")]
    pub commission_rate: Option<Rate>,
    pub status: ReferralStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReferral {
    pub partner_id: i64,
    pub farmer_id: i64,
    pub commission_rate: Option<Rate>,
    pub status: ReferralStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

//--------------------------------------      Listings       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub farmer_id: i64,
    pub title: String,
    pub quantity: i64,
    pub available_quantity: i64,
    pub price: Kobo,
    pub status: ListingStatus,
    pub sold_out_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListing {
    pub farmer_id: i64,
    pub title: String,
    pub quantity: i64,
    pub price: Kobo,
}

impl NewListing {
    pub fn new<S: Into<String>>(farmer_id: i64, title: S, quantity: i64, price: Kobo) -> Self {
        Self { farmer_id, title: title.into(), quantity, price }
    }
}

//--------------------------------------       Orders        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub buyer_id: i64,
    pub subtotal: Kobo,
    pub shipping: Kobo,
    pub tax: Kobo,
    pub total: Kobo,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_settled(&self) -> bool {
        self.status == OrderStatus::Confirmed && self.payment_status == PaymentStatus::Paid
    }
}

/// An order line. `farmer_id` is the seller, taken from the listing, and is `None` if the listing no longer exists.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub listing_id: i64,
    pub farmer_id: Option<i64>,
    pub quantity: i64,
    pub price: Kobo,
    pub total: Kobo,
}

impl OrderItem {
    /// `price × quantity`. This is the amount that fees and commissions are computed on.
    pub fn item_amount(&self) -> Kobo {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub listing_id: i64,
    pub quantity: i64,
    pub price: Kobo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub buyer_id: i64,
    pub items: Vec<NewOrderItem>,
    pub shipping: Kobo,
    pub tax: Kobo,
}

impl NewOrder {
    pub fn new(buyer_id: i64) -> Self {
        Self { buyer_id, items: vec![], shipping: Kobo::default(), tax: Kobo::default() }
    }

    pub fn with_item(mut self, listing_id: i64, quantity: i64, price: Kobo) -> Self {
        self.items.push(NewOrderItem { listing_id, quantity, price });
        self
    }

    pub fn subtotal(&self) -> Kobo {
        self.items.iter().map(|i| i.price * i.quantity).sum()
    }

    pub fn total(&self) -> Kobo {
        self.subtotal() + self.shipping + self.tax
    }
}

//--------------------------------------    Transactions     ---------------------------------------------------------
/// Audit data kept alongside a payment transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_by: Option<SettlementSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_mismatch: Option<AmountMismatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Set when the record was created from a webhook for a reference we had never seen.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub shell: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountMismatch {
    pub expected: Kobo,
    pub reported: Kobo,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Kobo,
    pub currency: String,
    pub reference: String,
    pub provider: Provider,
    pub order_id: Option<i64>,
    pub metadata: Json<TransactionMetadata>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub reference: String,
    pub provider: Provider,
    pub order_id: Option<i64>,
    pub amount: Kobo,
    pub currency: String,
    pub metadata: TransactionMetadata,
}

//--------------------------------------     Commissions     ---------------------------------------------------------
/// A commission is recorded at most once for each of these keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommissionKey {
    pub partner_id: i64,
    pub farmer_id: i64,
    pub order_id: i64,
    pub listing_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionMetadata {
    pub commission_type: CommissionType,
    pub platform_fee: Kobo,
    pub platform_fee_rate: Rate,
    pub farmer_net: Kobo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_id: Option<i64>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Commission {
    pub id: i64,
    pub partner_id: i64,
    pub farmer_id: i64,
    pub order_id: i64,
    pub listing_id: i64,
    pub amount: Kobo,
    #[sqlx(rename = "rate_bps")]
    pub rate: Rate,
    pub order_amount: Kobo,
    pub status: CommissionStatus,
    pub metadata: Json<CommissionMetadata>,
    pub created_at: DateTime<Utc>,
}

impl Commission {
    pub fn key(&self) -> CommissionKey {
        CommissionKey {
            partner_id: self.partner_id,
            farmer_id: self.farmer_id,
            order_id: self.order_id,
            listing_id: self.listing_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommission {
    pub key: CommissionKey,
    pub amount: Kobo,
    pub rate: Rate,
    pub order_amount: Kobo,
    pub metadata: CommissionMetadata,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn enum_names_match_the_database() {
        assert_eq!(ListingStatus::SoldOut.to_string(), "sold_out");
        assert_eq!("sold_out".parse::<ListingStatus>().unwrap(), ListingStatus::SoldOut);
        assert_eq!(SettlementSource::AutoVerify.to_string(), "auto_verify");
        assert_eq!(serde_json::to_string(&SettlementSource::AutoVerify).unwrap(), "\"auto_verify\"");
        assert!("done".parse::<TransactionStatus>().is_err());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
    }

    #[test]
    fn new_order_totals() {
        let order = NewOrder::new(1).with_item(1, 10, Kobo::from(100)).with_item(2, 3, Kobo::from(250));
        let order = NewOrder { shipping: Kobo::from(500), ..order };
        assert_eq!(order.subtotal(), Kobo::from(1_750));
        assert_eq!(order.total(), Kobo::from(2_250));
    }

    #[test]
    fn metadata_omits_empty_fields() {
        let json = serde_json::to_string(&TransactionMetadata::default()).unwrap();
        assert_eq!(json, "{}");
        let meta = TransactionMetadata { shell: true, ..Default::default() };
        assert_eq!(serde_json::to_string(&meta).unwrap(), r#"{"shell":true}"#);
    }
}
