//! Stateless pub-sub for settlement events.
//!
//! Components of the system subscribe to engine events through hooks and react to them. A hook only ever sees the
//! event itself, never the engine's internal state. Hooks are async, and each event is handled on its own task so
//! that a slow notification channel cannot hold up settlement.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Handles events until every producer has been dropped, then waits for the in-flight handlers to finish.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // Only the producers may keep the channel open
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move {
                (handler)(ev).await;
            });
            // Reap finished jobs so the set does not grow without bound
            while let Some(res) = jobs.try_join_next() {
                log_job_result(res);
            }
        }
        debug!("📬️ All producers have gone away. Waiting for {} jobs to complete", jobs.len());
        while let Some(res) = jobs.join_next().await {
            log_job_result(res);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_job_result(res: Result<(), tokio::task::JoinError>) {
    match res {
        Ok(()) => trace!("📬️ Event handled"),
        Err(e) => warn!("📬️ An event hook did not complete: {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues the event for the handler. A closed channel is logged and otherwise ignored; publishing never fails the
    /// caller.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[tokio::test]
    async fn every_event_is_handled_before_shutdown() {
        let _ = env_logger::try_init();
        let count = Arc::new(AtomicU64::new(0));
        let c2 = count.clone();
        let handler = Arc::new(move |v: u64| {
            let count = count.clone();
            Box::pin(async move {
                tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
                count.fetch_add(v, Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(1, handler);
        let producer_1 = event_handler.subscribe();
        let producer_2 = event_handler.subscribe();
        tokio::spawn(async move {
            for i in 0..5 {
                producer_1.publish_event(i * 2 + 1).await;
            }
        });
        tokio::spawn(async move {
            for i in 0..5 {
                producer_2.publish_event(i * 2).await;
            }
        });

        event_handler.start_handler().await;
        assert_eq!(c2.load(Ordering::SeqCst), 45);
    }

    #[tokio::test]
    async fn publishing_to_a_closed_channel_is_harmless() {
        let handler: Handler<u64> = Arc::new(|_| Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>);
        let event_handler = EventHandler::new(1, handler);
        let producer = event_handler.subscribe();
        drop(event_handler);
        producer.publish_event(1).await;
    }
}
