use farmgate_engine::events::{CommissionEarnedEvent, EventHandlers, EventHooks, NotificationEvent, PaymentSettledEvent};
use log::*;

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 50;

/// Hooks that record settlement events in the server log.
///
/// Delivery of notifications to users (email, push, in-app) happens outside this server. The hooks here give operators
/// a trail of every notification that was raised, and of every payment and commission that was settled.
pub fn create_notification_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    // --- On PaymentSettled Handler ---
    hooks.on_payment_settled(|ev: PaymentSettledEvent| {
        Box::pin(async move {
            let tx = ev.transaction;
            match ev.order {
                Some(order) => info!(
                    "📬️ Payment [{}] of {} settled via {}. Order #{} is now {}.",
                    tx.reference, tx.amount, ev.source, order.id, order.status
                ),
                None => warn!(
                    "📬️ Payment [{}] of {} settled via {}, but it is not linked to an order.",
                    tx.reference, tx.amount, ev.source
                ),
            }
        })
    });
    // --- On Notification Handler ---
    hooks.on_notification(|ev: NotificationEvent| {
        Box::pin(async move {
            info!("📬️ Notify {} #{}: {}", ev.role, ev.user_id, ev.kind());
            debug!("📬️ Notification context: {}", ev.context);
        })
    });
    // --- On CommissionEarned Handler ---
    hooks.on_commission_earned(|ev: CommissionEarnedEvent| {
        Box::pin(async move {
            let c = ev.commission;
            info!(
                "📬️ Partner #{} earned {} ({}) on order #{}, listing #{}",
                c.partner_id, c.amount, c.rate, c.order_id, c.listing_id
            );
        })
    });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn all_hooks_are_registered() {
        let handlers = create_notification_event_handlers();
        let producers = handlers.producers();
        assert_eq!(producers.payment_settled_producer.len(), 1);
        assert_eq!(producers.notification_producer.len(), 1);
        assert_eq!(producers.commission_earned_producer.len(), 1);
        drop(producers);
        for handle in handlers.start_handlers() {
            handle.await.unwrap();
        }
    }
}
