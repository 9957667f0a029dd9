use std::{future::Future, pin::Pin, sync::Arc};

use tokio::task::JoinHandle;

use crate::events::{CommissionEarnedEvent, EventHandler, EventProducer, Handler, NotificationEvent, PaymentSettledEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub payment_settled_producer: Vec<EventProducer<PaymentSettledEvent>>,
    pub notification_producer: Vec<EventProducer<NotificationEvent>>,
    pub commission_earned_producer: Vec<EventProducer<CommissionEarnedEvent>>,
}

impl EventProducers {
    pub fn is_empty(&self) -> bool {
        self.payment_settled_producer.is_empty()
            && self.notification_producer.is_empty()
            && self.commission_earned_producer.is_empty()
    }
}

pub struct EventHandlers {
    pub on_payment_settled: Option<EventHandler<PaymentSettledEvent>>,
    pub on_notification: Option<EventHandler<NotificationEvent>>,
    pub on_commission_earned: Option<EventHandler<CommissionEarnedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_payment_settled = hooks.on_payment_settled.map(|f| EventHandler::new(buffer_size, f));
        let on_notification = hooks.on_notification.map(|f| EventHandler::new(buffer_size, f));
        let on_commission_earned = hooks.on_commission_earned.map(|f| EventHandler::new(buffer_size, f));
        Self { on_payment_settled, on_notification, on_commission_earned }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_payment_settled {
            result.payment_settled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_notification {
            result.notification_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_commission_earned {
            result.commission_earned_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task for each configured handler. Each task ends once every producer for its event has been dropped
    /// and the remaining events have been handled.
    pub fn start_handlers(self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(3);
        if let Some(handler) = self.on_payment_settled {
            handles.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_notification {
            handles.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_commission_earned {
            handles.push(tokio::spawn(handler.start_handler()));
        }
        handles
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_settled: Option<Handler<PaymentSettledEvent>>,
    pub on_notification: Option<Handler<NotificationEvent>>,
    pub on_commission_earned: Option<Handler<CommissionEarnedEvent>>,
}

impl EventHooks {
    pub fn on_payment_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentSettledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_settled = Some(Arc::new(f));
        self
    }

    pub fn on_notification<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(NotificationEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_notification = Some(Arc::new(f));
        self
    }

    pub fn on_commission_earned<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CommissionEarnedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_commission_earned = Some(Arc::new(f));
        self
    }
}
