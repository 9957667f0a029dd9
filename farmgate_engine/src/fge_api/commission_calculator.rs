//! Partner attribution and fee splits for settled order lines.
//!
//! Attribution is resolved in a fixed order. An active, unexpired referral for the farmer wins. Otherwise the
//! farmer's direct partner is used. Otherwise no partner commission is due. The platform fee is charged in every case.
use chrono::Utc;
use fg_common::{Kobo, Rate};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    db_types::{
        Commission,
        CommissionKey,
        CommissionMetadata,
        CommissionType,
        NewCommission,
        Order,
        OrderItem,
        Partner,
        Role,
    },
    events::{CommissionEarnedEvent, EventProducers, NotificationEvent},
    traits::{CommissionError, CommissionManagement},
};

/// Who, if anyone, earns a commission on a farmer's sales.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommissionSource {
    Referral { partner: Partner, rate: Rate, referral_id: i64 },
    DirectPartner { partner: Partner, rate: Rate },
    None,
}

impl CommissionSource {
    pub fn partner(&self) -> Option<&Partner> {
        match self {
            CommissionSource::Referral { partner, .. } | CommissionSource::DirectPartner { partner, .. } => Some(partner),
            CommissionSource::None => None,
        }
    }

    pub fn rate(&self) -> Rate {
        match self {
            CommissionSource::Referral { rate, .. } | CommissionSource::DirectPartner { rate, .. } => *rate,
            CommissionSource::None => Rate::default(),
        }
    }

    pub fn commission_type(&self) -> CommissionType {
        match self {
            CommissionSource::Referral { .. } => CommissionType::Referral,
            CommissionSource::DirectPartner { .. } => CommissionType::Direct,
            CommissionSource::None => CommissionType::None,
        }
    }

    pub fn referral_id(&self) -> Option<i64> {
        match self {
            CommissionSource::Referral { referral_id, .. } => Some(*referral_id),
            _ => None,
        }
    }
}

/// How one item's amount is divided. `platform_fee + partner_commission + farmer_net == item_amount`, exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub item_amount: Kobo,
    pub platform_fee: Kobo,
    pub platform_fee_rate: Rate,
    pub partner_commission: Kobo,
    pub commission_rate: Rate,
    pub farmer_net: Kobo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommissionOutcome {
    Recorded { commission: Commission, split: FeeSplit },
    /// A commission with this key already exists. Nothing was written.
    Duplicate { key: CommissionKey, split: FeeSplit },
    NoPartner { split: FeeSplit },
}

impl CommissionOutcome {
    pub fn split(&self) -> &FeeSplit {
        match self {
            CommissionOutcome::Recorded { split, .. }
            | CommissionOutcome::Duplicate { split, .. }
            | CommissionOutcome::NoPartner { split } => split,
        }
    }
}

#[derive(Clone)]
pub struct CommissionCalculator<B> {
    db: B,
    platform_fee_rate: Rate,
    default_commission_rate: Rate,
    producers: EventProducers,
}

impl<B> CommissionCalculator<B> {
    pub fn new(db: B, platform_fee_rate: Rate, default_commission_rate: Rate, producers: EventProducers) -> Self {
        Self { db, platform_fee_rate, default_commission_rate, producers }
    }

    /// Divides `item_amount` between the platform, the partner (if any) and the farmer. Fees are rounded to the
    /// nearest kobo and the farmer receives the remainder.
    pub fn split(&self, item_amount: Kobo, source: &CommissionSource) -> FeeSplit {
        let platform_fee = self.platform_fee_rate.apply(item_amount);
        let commission_rate = source.rate();
        let partner_commission = commission_rate.apply(item_amount);
        FeeSplit {
            item_amount,
            platform_fee,
            platform_fee_rate: self.platform_fee_rate,
            partner_commission,
            commission_rate,
            farmer_net: item_amount - platform_fee - partner_commission,
        }
    }
}

impl<B> CommissionCalculator<B>
where B: CommissionManagement
{
    /// A copy of this calculator that records commissions without notifying anyone.
    pub fn silent(&self) -> Self {
        Self { producers: EventProducers::default(), ..self.clone() }
    }

    pub async fn resolve_source(&self, farmer_id: i64) -> Result<CommissionSource, CommissionError> {
        if let Some(referral) = self.db.fetch_active_referral(farmer_id, Utc::now()).await? {
            match self.db.fetch_partner(referral.partner_id).await? {
                Some(partner) => {
                    let rate = referral.commission_rate.unwrap_or(self.default_commission_rate);
                    trace!("💸️ Farmer #{farmer_id} was referred by partner #{} at {rate}", partner.id);
                    return Ok(CommissionSource::Referral { partner, rate, referral_id: referral.id });
                },
                None => warn!(
                    "💸️ Referral #{} points at partner #{}, which does not exist. Ignoring the referral.",
                    referral.id, referral.partner_id
                ),
            }
        }
        if let Some(partner) = self.db.fetch_direct_partner(farmer_id).await? {
            let rate = partner.commission_rate.unwrap_or(self.default_commission_rate);
            trace!("💸️ Farmer #{farmer_id} is managed by partner #{} at {rate}", partner.id);
            return Ok(CommissionSource::DirectPartner { partner, rate });
        }
        Ok(CommissionSource::None)
    }

    /// Works out the fee split for one order line and, if a partner is due a commission, records it.
    ///
    /// A commission is written at most once per (partner, farmer, order, listing). The partner's running total is
    /// only increased by the call that wrote the row.
    pub async fn compute_and_record(&self, order: &Order, item: &OrderItem) -> Result<CommissionOutcome, CommissionError> {
        let source = match item.farmer_id {
            Some(farmer_id) => self.resolve_source(farmer_id).await?,
            None => CommissionSource::None,
        };
        let split = self.split(item.item_amount(), &source);
        let (partner, farmer_id) = match (source.partner(), item.farmer_id) {
            (Some(p), Some(f)) => (p, f),
            _ => {
                trace!("💸️ No partner commission on order #{} listing #{}", order.id, item.listing_id);
                return Ok(CommissionOutcome::NoPartner { split });
            },
        };
        let key = CommissionKey { partner_id: partner.id, farmer_id, order_id: order.id, listing_id: item.listing_id };
        if self.db.commission_exists(&key).await? {
            debug!("💸️ Commission for order #{} listing #{} already recorded. Skipping.", order.id, item.listing_id);
            return Ok(CommissionOutcome::Duplicate { key, split });
        }
        let new_commission = NewCommission {
            key,
            amount: split.partner_commission,
            rate: split.commission_rate,
            order_amount: split.item_amount,
            metadata: CommissionMetadata {
                commission_type: source.commission_type(),
                platform_fee: split.platform_fee,
                platform_fee_rate: split.platform_fee_rate,
                farmer_net: split.farmer_net,
                referral_id: source.referral_id(),
            },
        };
        let commission = match self.db.insert_commission(new_commission).await {
            Ok(c) => c,
            Err(CommissionError::AlreadyExists(key)) => {
                debug!("💸️ Commission for order #{} listing #{} was recorded concurrently", order.id, item.listing_id);
                return Ok(CommissionOutcome::Duplicate { key, split });
            },
            Err(e) => return Err(e),
        };
        self.add_to_partner_total(partner.id, commission.amount).await;
        info!(
            "💸️ {} commission of {} recorded for partner #{} on order #{}",
            source.commission_type(),
            commission.amount,
            partner.id,
            order.id
        );
        self.notify_partner(partner, &commission).await;
        Ok(CommissionOutcome::Recorded { commission, split })
    }

    /// Adds the commission to the partner's running total. The atomic increment is tried first; if that fails, the
    /// total is read and written back, which can lose a concurrent update.
    async fn add_to_partner_total(&self, partner_id: i64, amount: Kobo) {
        let e = match self.db.increment_partner_commissions(partner_id, amount).await {
            Ok(total) => {
                trace!("💸️ Partner #{partner_id} has now earned {total}");
                return;
            },
            Err(e) => e,
        };
        warn!("💸️ Could not increment the commission total for partner #{partner_id}: {e}. Retrying as read-then-write.");
        let fallback = async {
            let partner = self.db.fetch_partner(partner_id).await?.ok_or(CommissionError::PartnerNotFound(partner_id))?;
            self.db.set_partner_total_commissions(partner_id, partner.total_commissions + amount).await
        };
        if let Err(e) = fallback.await {
            error!("💸️ The commission total for partner #{partner_id} is missing {amount}: {e}");
        }
    }

    async fn notify_partner(&self, partner: &Partner, commission: &Commission) {
        for producer in &self.producers.commission_earned_producer {
            let event = CommissionEarnedEvent { commission: commission.clone(), partner_user_id: partner.user_id };
            producer.publish_event(event).await;
        }
        let context = json!({
            "commission_id": commission.id,
            "order_id": commission.order_id,
            "listing_id": commission.listing_id,
            "amount": commission.amount,
            "rate": commission.rate.to_string(),
        });
        for producer in &self.producers.notification_producer {
            let event = NotificationEvent::new(partner.user_id, Role::Partner, "commission", "earned", context.clone());
            producer.publish_event(event).await;
        }
    }
}
