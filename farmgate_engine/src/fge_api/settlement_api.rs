use std::{collections::BTreeSet, fmt::Debug};

use fg_common::{Provider, NAIRA_CURRENCY_CODE};
use gateway_tools::{ChargeStatus, GatewayError, InitializeRequest, VerificationResult};
use log::*;
use serde_json::json;
use sqlx::types::Json;

use crate::{
    db_types::{
        AmountMismatch,
        Commission,
        NewTransaction,
        Role,
        SettlementSource,
        Transaction,
        TransactionMetadata,
        TransactionStatus,
    },
    events::{EventProducers, NotificationEvent, PaymentSettledEvent},
    fge_api::{
        commission_calculator::CommissionCalculator,
        errors::SettlementError,
        inventory_reconciler::InventoryReconciler,
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
        },
    },
    helpers::{is_valid_reference, new_payment_reference},
    traits::{InventoryOutcome, PaymentGateway, SettlementBackend},
};

/// `SettlementApi` is the single entry point for confirming payments.
///
/// Webhooks, client polls, the pending-payment sweeper and test-mode auto-verification all call [`Self::settle`].
/// However many of them arrive, and in whatever order, the side effects of a payment (order confirmation, stock
/// decrements, commissions and notifications) happen once. The guarantee comes from a single conditional write that
/// moves the payment from `pending` to `completed`; only the caller that makes that write carries on to the side
/// effects. Everyone else sees a completed payment and returns without doing anything.
pub struct SettlementApi<B, G> {
    db: B,
    gateway: G,
    config: SettlementConfig,
    producers: EventProducers,
    inventory: InventoryReconciler<B>,
    commissions: CommissionCalculator<B>,
}

impl<B, G> Debug for SettlementApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi (test mode: {})", self.config.test_mode)
    }
}

impl<B, G> SettlementApi<B, G>
where
    B: SettlementBackend,
    G: PaymentGateway,
{
    pub fn new(db: B, gateway: G, config: SettlementConfig, producers: EventProducers) -> Self {
        let inventory = InventoryReconciler::new(db.clone());
        let commissions = CommissionCalculator::new(
            db.clone(),
            config.platform_fee_rate,
            config.default_commission_rate,
            producers.clone(),
        );
        Self { db, gateway, config, producers, inventory, commissions }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Drives the payment identified by `reference` to a terminal state.
    ///
    /// 1. The transaction is looked up. A webhook for an unknown reference creates a `pending` placeholder.
    /// 2. A completed transaction returns [`SettlementResult::AlreadySettled`] straight away.
    /// 3. A pending transaction is checked with the payment provider (or treated as paid in test mode).
    /// 4. A paid charge is recorded with a conditional `pending → completed` write. The caller that wins this write
    ///    confirms the order, takes the stock, records commissions and sends the notifications. A losing caller
    ///    returns [`SettlementResult::AlreadySettled`].
    /// 5. A charge for less than the payment amount does not pay for the order. The payment moves to `failed`.
    ///
    /// A provider that cannot be reached yields [`SettlementError::ProviderVerificationFailed`]. Nothing is changed,
    /// and the call can simply be repeated.
    pub async fn settle(
        &self,
        reference: &str,
        provider: Provider,
        source: SettlementSource,
    ) -> Result<SettlementResult, SettlementError> {
        trace!("⚖️ Settlement of [{reference}] requested via {source}");
        if !is_valid_reference(reference) {
            return Err(SettlementError::InvalidReference(reference.to_string()));
        }
        let tx = match self.db.fetch_transaction(reference).await? {
            Some(tx) => tx,
            None if source == SettlementSource::Webhook => self.db.insert_shell_transaction(reference, provider).await?,
            None => return Err(SettlementError::TransactionNotFound(reference.to_string())),
        };
        match tx.status {
            TransactionStatus::Pending => {},
            _ => return self.existing_outcome(tx).await,
        }
        let verification = self.verify_charge(&tx).await?;
        match verification.status {
            ChargeStatus::Paid if verification.paid && is_underpaid(&tx, &verification) => {
                self.reject_underpayment(tx, verification, source).await
            },
            ChargeStatus::Paid if verification.paid => self.complete(tx, verification, source).await,
            ChargeStatus::Failed => {
                let reason = verification.gateway_status.clone();
                self.fail(tx, verification, source, reason, None).await
            },
            _ => {
                debug!("⚖️ [{reference}] is not paid yet ({}).", verification.gateway_status);
                Ok(SettlementResult::NotYetPaid(self.snapshot_of(tx).await?))
            },
        }
    }

    /// Creates a `pending` payment for the order and asks the provider for a checkout URL.
    ///
    /// In test mode no provider is contacted. The payment is settled immediately instead, through the same path as
    /// every other settlement.
    pub async fn initialize_payment(
        &self,
        order_id: i64,
        provider: Provider,
        email: &str,
        currency: &str,
        callback_url: Option<String>,
    ) -> Result<PaymentInitialization, SettlementError> {
        if currency != NAIRA_CURRENCY_CODE {
            return Err(SettlementError::UnsupportedAction(format!("Payments in {currency}")));
        }
        let order = self.db.fetch_order(order_id).await?.ok_or(SettlementError::OrderNotFound(order_id))?;
        if order.is_settled() {
            return Err(SettlementError::OrderAlreadyPaid(order_id));
        }
        let new_tx = NewTransaction {
            reference: new_payment_reference(order_id),
            provider,
            order_id: Some(order_id),
            amount: order.total,
            currency: currency.to_string(),
            metadata: TransactionMetadata::default(),
        };
        let (tx, _) = self.db.insert_transaction(new_tx).await?;
        info!("⚖️ Payment [{}] of {} initialized for order #{order_id} via {provider}", tx.reference, tx.amount);
        if self.config.test_mode {
            let settlement = self.settle(&tx.reference, provider, SettlementSource::AutoVerify).await?;
            let transaction = settlement.snapshot().transaction;
            return Ok(PaymentInitialization {
                transaction,
                authorization_url: None,
                access_code: None,
                settlement: Some(settlement),
            });
        }
        let request = InitializeRequest {
            reference: tx.reference.clone(),
            email: email.to_string(),
            amount: tx.amount,
            currency: tx.currency.clone(),
            callback_url,
        };
        let response =
            match tokio::time::timeout(self.config.gateway_timeout, self.gateway.initialize(provider, &request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(self.abandon(&tx, e).await),
                Err(_) => return Err(self.abandon(&tx, self.timeout_error()).await),
            };
        Ok(PaymentInitialization {
            transaction: tx,
            authorization_url: Some(response.authorization_url),
            access_code: response.access_code,
            settlement: None,
        })
    }

    /// Re-applies the side effects of a completed payment: order confirmation, stock and commissions. Every step is
    /// idempotent, so only what is missing gets written. No notifications are sent.
    pub async fn reconcile(&self, reference: &str) -> Result<SettlementReport, SettlementError> {
        let tx = self
            .db
            .fetch_transaction(reference)
            .await?
            .ok_or_else(|| SettlementError::TransactionNotFound(reference.to_string()))?;
        if tx.status != TransactionStatus::Completed {
            return Err(SettlementError::NotSettled { reference: reference.to_string(), status: tx.status });
        }
        info!("⚖️ Reconciling side effects of [{reference}]");
        let report = self.apply_side_effects(tx, &self.commissions.silent()).await;
        info!(
            "⚖️ Reconciliation of [{reference}] complete. {} new commissions, {} shortfalls",
            report.recorded_commissions(),
            report.shortfalls.len()
        );
        Ok(report)
    }

    /// Settles every payment that has been pending for at least `older_than`. This catches payments whose webhook
    /// never arrived and whose buyer never came back to poll.
    pub async fn sweep_pending(&self, older_than: chrono::Duration) -> Result<SweepResult, SettlementError> {
        let pending = self.db.fetch_pending_transactions(older_than).await?;
        let mut result = SweepResult { checked: pending.len(), ..Default::default() };
        for tx in pending {
            match self.settle(&tx.reference, tx.provider, SettlementSource::Sweep).await {
                Ok(SettlementResult::Settled(_)) | Ok(SettlementResult::AlreadySettled(_)) => {
                    result.settled.push(tx.reference)
                },
                Ok(SettlementResult::PaymentFailed(_)) | Ok(SettlementResult::Refunded(_)) => {
                    result.failed.push(tx.reference)
                },
                Ok(SettlementResult::NotYetPaid(_)) => result.still_pending.push(tx.reference),
                Err(e) => {
                    warn!("⚖️ Could not settle [{}] during the sweep: {e}", tx.reference);
                    result.errors.push((tx.reference, e.to_string()));
                },
            }
        }
        Ok(result)
    }

    pub async fn refund_payment(&self, reference: &str) -> Result<TransactionSnapshot, SettlementError> {
        warn!("⚖️ A refund was requested for [{reference}], but refunds are not supported");
        Err(SettlementError::UnsupportedAction("Refunds".into()))
    }

    /// The current state of the payment and its order.
    pub async fn snapshot(&self, reference: &str) -> Result<Option<TransactionSnapshot>, SettlementError> {
        match self.db.fetch_transaction(reference).await? {
            Some(tx) => Ok(Some(self.snapshot_of(tx).await?)),
            None => Ok(None),
        }
    }

    pub async fn commissions_for_order(&self, order_id: i64) -> Result<Vec<Commission>, SettlementError> {
        if self.db.fetch_order(order_id).await?.is_none() {
            return Err(SettlementError::OrderNotFound(order_id));
        }
        let commissions = self.db.fetch_commissions_for_order(order_id).await?;
        Ok(commissions)
    }

    async fn verify_charge(&self, tx: &Transaction) -> Result<VerificationResult, SettlementError> {
        if self.config.test_mode {
            debug!("⚖️ Test mode: treating [{}] as paid", tx.reference);
            return Ok(VerificationResult::synthesized_paid(tx.provider, &tx.reference, tx.amount));
        }
        let verify = self.gateway.verify(tx.provider, &tx.reference);
        let result = match tokio::time::timeout(self.config.gateway_timeout, verify).await {
            Ok(result) => result,
            Err(_) => Err(self.timeout_error()),
        };
        result.map_err(|e| {
            warn!("⚖️ Could not verify [{}] with {}: {e}", tx.reference, tx.provider);
            SettlementError::ProviderVerificationFailed(e)
        })
    }

    async fn complete(
        &self,
        tx: Transaction,
        verification: VerificationResult,
        source: SettlementSource,
    ) -> Result<SettlementResult, SettlementError> {
        let reference = tx.reference.clone();
        let amount_mismatch = (tx.amount.is_positive() && verification.amount > tx.amount)
            .then_some(AmountMismatch { expected: tx.amount, reported: verification.amount });
        if let Some(m) = &amount_mismatch {
            warn!("⚖️ [{reference}] is overpaid. Expected {} but {} reports {}", m.expected, tx.provider, m.reported);
        }
        if verification.currency != tx.currency {
            warn!("⚖️ [{reference}] was paid in {} rather than {}", verification.currency, tx.currency);
        }
        let verified_amount = verification.amount;
        let metadata = TransactionMetadata {
            verification: Some(verification),
            settled_by: Some(source),
            amount_mismatch,
            failure_reason: None,
            shell: tx.metadata.shell,
        };
        if !self.db.try_complete_transaction(&reference, &metadata, verified_amount).await? {
            debug!("⚖️ [{reference}] was settled by another caller");
            return self.current_outcome(&reference).await;
        }
        info!("⚖️ [{reference}] is paid. Settling via {source}.");
        // From here on the payment is completed, whatever else fails. Errors go into the report.
        let mut lookup_error = None;
        let tx = match self.fetch_existing(&reference).await {
            Ok(tx) => tx,
            Err(e) => {
                error!("⚖️ [{reference}] is completed, but could not be reloaded: {e}");
                lookup_error = Some(format!("Payment could not be reloaded: {e}"));
                let amount = if tx.amount.value() == 0 { verified_amount } else { tx.amount };
                Transaction { status: TransactionStatus::Completed, amount, metadata: Json(metadata), ..tx }
            },
        };
        let mut report = self.apply_side_effects(tx, &self.commissions).await;
        report.errors.extend(lookup_error);
        self.notify_settlement(&report, source).await;
        if report.has_errors() {
            warn!("⚖️ [{reference}] settled with errors. Run a reconciliation to repair it.");
        }
        info!(
            "⚖️ [{reference}] settled. {} items, {} commissions, {} shortfalls",
            report.items.len(),
            report.recorded_commissions(),
            report.shortfalls.len()
        );
        Ok(SettlementResult::Settled(report))
    }

    async fn fail(
        &self,
        tx: Transaction,
        verification: VerificationResult,
        source: SettlementSource,
        reason: String,
        amount_mismatch: Option<AmountMismatch>,
    ) -> Result<SettlementResult, SettlementError> {
        let reference = tx.reference.clone();
        let metadata = TransactionMetadata {
            failure_reason: Some(reason),
            verification: Some(verification),
            settled_by: Some(source),
            amount_mismatch,
            shell: tx.metadata.shell,
        };
        if self.db.try_fail_transaction(&reference, &metadata).await? {
            info!("⚖️ [{reference}] failed via {source}. The order remains unpaid.");
        }
        self.current_outcome(&reference).await
    }

    /// The provider confirmed a charge, but for less than the payment amount. The payment fails with the difference
    /// on record, and the buyer can start a new payment for the order.
    async fn reject_underpayment(
        &self,
        tx: Transaction,
        verification: VerificationResult,
        source: SettlementSource,
    ) -> Result<SettlementResult, SettlementError> {
        let mismatch = AmountMismatch { expected: tx.amount, reported: verification.amount };
        warn!(
            "⚖️ [{}] is underpaid. Expected {} but {} reports {}.",
            tx.reference, mismatch.expected, tx.provider, mismatch.reported
        );
        let reason = format!("underpaid: expected {}, received {}", mismatch.expected, mismatch.reported);
        self.fail(tx, verification, source, reason, Some(mismatch)).await
    }

    /// Marks a payment that could not be initialized with the provider as failed.
    async fn abandon(&self, tx: &Transaction, e: GatewayError) -> SettlementError {
        warn!("⚖️ Could not initialize [{}] with {}: {e}", tx.reference, tx.provider);
        let metadata = TransactionMetadata { failure_reason: Some(e.to_string()), ..Default::default() };
        if let Err(db_err) = self.db.try_fail_transaction(&tx.reference, &metadata).await {
            error!("⚖️ Could not mark [{}] as failed: {db_err}", tx.reference);
        }
        SettlementError::PaymentInitializationFailed(e)
    }

    fn timeout_error(&self) -> GatewayError {
        GatewayError::Timeout(self.config.gateway_timeout.as_secs())
    }

    async fn fetch_existing(&self, reference: &str) -> Result<Transaction, SettlementError> {
        self.db.fetch_transaction(reference).await?.ok_or_else(|| SettlementError::TransactionNotFound(reference.into()))
    }

    async fn current_outcome(&self, reference: &str) -> Result<SettlementResult, SettlementError> {
        let tx = self.fetch_existing(reference).await?;
        self.existing_outcome(tx).await
    }

    /// The result for a payment whose fate has already been decided. Never has side effects.
    async fn existing_outcome(&self, tx: Transaction) -> Result<SettlementResult, SettlementError> {
        let status = tx.status;
        let snapshot = self.snapshot_of(tx).await?;
        let result = match status {
            TransactionStatus::Completed => {
                check_consistency(&snapshot);
                SettlementResult::AlreadySettled(snapshot)
            },
            TransactionStatus::Failed => SettlementResult::PaymentFailed(snapshot),
            TransactionStatus::Refunded => SettlementResult::Refunded(snapshot),
            TransactionStatus::Pending => SettlementResult::NotYetPaid(snapshot),
        };
        trace!("⚖️ [{}] is already {status}", result.snapshot().transaction.reference);
        Ok(result)
    }

    async fn snapshot_of(&self, transaction: Transaction) -> Result<TransactionSnapshot, SettlementError> {
        let order = match transaction.order_id {
            Some(id) => self.db.fetch_order(id).await?,
            None => None,
        };
        Ok(TransactionSnapshot { transaction, order })
    }

    /// Confirms the order, then applies each line to stock and commissions. Failures are logged and recorded in the
    /// report; they never undo the payment or stop the remaining lines.
    async fn apply_side_effects(&self, tx: Transaction, commissions: &CommissionCalculator<B>) -> SettlementReport {
        let reference = tx.reference.clone();
        let mut report = SettlementReport::for_payment(tx);
        let Some(order_id) = report.transaction.order_id else {
            warn!("⚖️ [{reference}] is not linked to an order. Only the payment has been recorded.");
            return report;
        };
        match self.db.confirm_order_payment(order_id, &reference).await {
            Ok(true) => debug!("⚖️ Order #{order_id} confirmed and paid by [{reference}]"),
            Ok(false) => trace!("⚖️ Order #{order_id} was already confirmed"),
            Err(e) => {
                error!("⚖️ [{reference}] is paid, but order #{order_id} could not be confirmed: {e}");
                report.errors.push(format!("Order #{order_id} was not confirmed: {e}"));
            },
        }
        let order = match self.db.fetch_order(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                error!("⚖️ [{reference}] is paid, but order #{order_id} does not exist");
                report.errors.push(format!("Order #{order_id} does not exist"));
                return report;
            },
            Err(e) => {
                error!("⚖️ [{reference}] is paid, but order #{order_id} could not be loaded: {e}");
                report.errors.push(format!("Order #{order_id} could not be loaded: {e}"));
                return report;
            },
        };
        let order_items = match self.db.fetch_order_items(order_id).await {
            Ok(items) => items,
            Err(e) => {
                error!("⚖️ [{reference}] is paid, but the lines of order #{order_id} could not be loaded: {e}");
                report.errors.push(format!("Lines of order #{order_id} could not be loaded: {e}"));
                report.order = Some(order);
                return report;
            },
        };
        for item in order_items {
            let mut settlement = ItemSettlement {
                order_item_id: item.id,
                listing_id: item.listing_id,
                farmer_id: item.farmer_id,
                quantity: item.quantity,
                item_amount: item.item_amount(),
                inventory: None,
                commission: None,
                commission_skipped: None,
                errors: vec![],
            };
            match self.inventory.reconcile(&reference, item.listing_id, item.quantity).await {
                Ok(outcome @ InventoryOutcome::Shortfall { available }) => {
                    let shortfall = Shortfall { listing_id: item.listing_id, ordered: item.quantity, available };
                    report.shortfalls.push(shortfall);
                    settlement.inventory = Some(outcome);
                    settlement.commission_skipped = Some(CommissionSkipReason::Shortfall);
                    report.items.push(settlement);
                    continue;
                },
                Ok(outcome @ InventoryOutcome::ListingNotFound) => {
                    settlement.inventory = Some(outcome);
                    settlement.commission_skipped = Some(CommissionSkipReason::ListingNotFound);
                    report.items.push(settlement);
                    continue;
                },
                Ok(outcome) => settlement.inventory = Some(outcome),
                Err(e) => {
                    error!("⚖️ Stock for listing #{} was not adjusted for [{reference}]: {e}", item.listing_id);
                    settlement.errors.push(e.to_string());
                },
            }
            match commissions.compute_and_record(&order, &item).await {
                Ok(outcome) => settlement.commission = Some(outcome),
                Err(e) => {
                    error!("⚖️ Commission for listing #{} on [{reference}] was not recorded: {e}", item.listing_id);
                    settlement.errors.push(e.to_string());
                },
            }
            report.items.push(settlement);
        }
        report.order = Some(order);
        report
    }

    async fn notify_settlement(&self, report: &SettlementReport, source: SettlementSource) {
        let tx = &report.transaction;
        for producer in &self.producers.payment_settled_producer {
            let event =
                PaymentSettledEvent { transaction: tx.clone(), order: report.order.clone(), source };
            producer.publish_event(event).await;
        }
        let admins = self.db.fetch_admin_ids().await.unwrap_or_else(|e| {
            warn!("⚖️ Admins will not be notified about [{}]: {e}", tx.reference);
            vec![]
        });
        let context = json!({
            "reference": tx.reference,
            "amount": tx.amount,
            "currency": tx.currency,
            "provider": tx.provider,
            "order_id": tx.order_id,
        });
        let mut notifications = vec![];
        match &report.order {
            Some(order) => {
                notifications.push(NotificationEvent::new(
                    order.buyer_id,
                    Role::Buyer,
                    "payment",
                    "completed",
                    context.clone(),
                ));
                let farmers = report.items.iter().filter_map(|i| i.farmer_id).collect::<BTreeSet<i64>>();
                for farmer_id in farmers {
                    let lines = report.items.iter().filter(|i| i.farmer_id == Some(farmer_id)).count();
                    let ctx = json!({ "order_id": order.id, "reference": tx.reference, "items": lines });
                    notifications.push(NotificationEvent::new(farmer_id, Role::Farmer, "order", "new_paid_order", ctx));
                }
                for &admin in &admins {
                    notifications.push(NotificationEvent::new(admin, Role::Admin, "payment", "received", context.clone()));
                }
            },
            None => {
                for &admin in &admins {
                    notifications.push(NotificationEvent::new(admin, Role::Admin, "payment", "unlinked", context.clone()));
                }
            },
        }
        for shortfall in &report.shortfalls {
            let ctx = json!({
                "reference": tx.reference,
                "order_id": tx.order_id,
                "listing_id": shortfall.listing_id,
                "ordered": shortfall.ordered,
                "available": shortfall.available,
            });
            for &admin in &admins {
                notifications.push(NotificationEvent::new(admin, Role::Admin, "inventory", "shortfall", ctx.clone()));
            }
        }
        debug!("⚖️ Sending {} notifications for [{}]", notifications.len(), tx.reference);
        for producer in &self.producers.notification_producer {
            for event in &notifications {
                producer.publish_event(event.clone()).await;
            }
        }
    }
}

fn is_underpaid(tx: &Transaction, verification: &VerificationResult) -> bool {
    tx.amount.is_positive() && verification.amount < tx.amount
}

/// A completed payment should always have a confirmed, paid order. This only reports a mismatch; `reconcile`
/// repairs it.
fn check_consistency(snapshot: &TransactionSnapshot) {
    let reference = &snapshot.transaction.reference;
    match (&snapshot.transaction.order_id, &snapshot.order) {
        (Some(_), Some(order)) if !order.is_settled() => error!(
            "⚖️ [{reference}] is completed but order #{} is {}/{}. Reconcile this payment.",
            order.id, order.status, order.payment_status
        ),
        (Some(id), None) => error!("⚖️ [{reference}] is completed but order #{id} does not exist"),
        _ => {},
    }
}
