//! The Outbox Dispatcher: a long-running worker that drains outbox events
//! into registered handlers.
//!
//! `claim` moves a batch of rows from `NEW` to `DISPATCHING` and is
//! committed immediately so the lock is visible to other workers; a row in
//! `DISPATCHING` is excluded from every worker's `claim`, including the one
//! that holds it, so a still-running handler is never handed out twice.
//! Each claimed event is then handled independently, with its own
//! `markDone`/`markFailed` commit guarded on the claiming worker's id. A
//! handler failure never poisons the rest of the batch, and an event type
//! with no registered handler is logged and left `NEW` rather than
//! silently dropped.

use rental_core::outbox::OutboxEvent;
use rental_core::ports::{UnitOfWork, UnitOfWorkError, UnitOfWorkFactory};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default poll interval between `claim` calls when the previous batch was
/// empty.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default batch size per `claim` call.
pub const DEFAULT_BATCH_SIZE: u32 = 10;

/// Handles one outbox event type. Implementations must be idempotent: a
/// crash between a handler's own side effect and `markDone` means the same
/// event may be delivered again.
pub trait OutboxEventHandler: Send + Sync {
    /// Handle one claimed event. An `Err` marks the row failed and
    /// schedules a backoff retry; `Ok` marks it done.
    fn handle<'a>(&'a self, event: &'a OutboxEvent) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;
}

/// Error surfaced by a single dispatcher tick.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The unit of work backing `claim` failed.
    #[error("outbox dispatcher transaction error: {0}")]
    UnitOfWork(#[from] UnitOfWorkError),
}

/// Drains the outbox into per-event-type handlers on a fixed poll interval.
pub struct OutboxDispatcher {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    handlers: HashMap<String, Arc<dyn OutboxEventHandler>>,
    worker_id: String,
    batch_size: u32,
    poll_interval: Duration,
}

impl OutboxDispatcher {
    /// Construct a dispatcher identified by `worker_id` (used for the
    /// claim lock and in logs).
    #[must_use]
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>, worker_id: impl Into<String>) -> Self {
        Self {
            uow_factory,
            handlers: HashMap::new(),
            worker_id: worker_id.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the default batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Override the default poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Register the handler invoked for `event_type`. Replaces any
    /// previous registration for the same type.
    pub fn register_handler(&mut self, event_type: impl Into<String>, handler: Arc<dyn OutboxEventHandler>) {
        self.handlers.insert(event_type.into(), handler);
    }

    /// Run the poll loop until `shutdown` is signaled.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        tracing::info!(worker_id = %self.worker_id, poll_interval_secs = self.poll_interval.as_secs(), "outbox dispatcher starting");
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!(worker_id = %self.worker_id, "outbox dispatcher shutting down");
                        return;
                    }
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    if let Err(err) = self.tick().await {
                        tracing::error!(worker_id = %self.worker_id, error = %err, "outbox dispatcher tick failed");
                    }
                }
            }
        }
    }

    /// Claim one batch and dispatch every row in it. Returns the number of
    /// rows claimed.
    pub async fn tick(&self) -> Result<usize, DispatchError> {
        let mut uow = self.uow_factory.begin().await?;
        let claimed = uow.outbox().claim(self.batch_size, &self.worker_id).await?;
        uow.commit().await?;

        let claimed_count = claimed.len();
        for event in claimed {
            self.process_one(event).await;
        }
        Ok(claimed_count)
    }

    async fn process_one(&self, event: OutboxEvent) {
        let Some(handler) = self.handlers.get(event.event_type.as_str()) else {
            tracing::warn!(event_id = event.id, event_type = %event.event_type, "no handler registered for outbox event type, leaving it NEW");
            metrics::counter!("outbox.unhandled_event_type").increment(1);
            return;
        };

        let outcome = handler.handle(&event).await;

        let mut uow = match self.uow_factory.begin().await {
            Ok(uow) => uow,
            Err(err) => {
                tracing::error!(event_id = event.id, error = %err, "failed to open unit of work to record dispatch outcome");
                return;
            }
        };

        let mark_result = match &outcome {
            Ok(()) => uow.outbox().mark_done(event.id, &self.worker_id).await,
            Err(detail) => uow.outbox().mark_failed(event.id, &self.worker_id, detail).await,
        };

        if let Err(err) = mark_result {
            tracing::error!(event_id = event.id, error = %err, "failed to record outbox dispatch outcome");
            let _ = uow.rollback().await;
            return;
        }

        if let Err(err) = uow.commit().await {
            tracing::error!(event_id = event.id, error = %err, "failed to commit outbox dispatch outcome");
            return;
        }

        match outcome {
            Ok(()) => {
                tracing::info!(event_id = event.id, event_type = %event.event_type, "outbox event dispatched");
                metrics::counter!("outbox.dispatched", "event_type" => event.event_type.clone()).increment(1);
            }
            Err(detail) => {
                tracing::error!(event_id = event.id, event_type = %event.event_type, error = detail, "outbox event handler failed");
                metrics::counter!("outbox.dispatch_failed", "event_type" => event.event_type.clone()).increment(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysSucceeds;

    impl OutboxEventHandler for AlwaysSucceeds {
        fn handle<'a>(&'a self, _event: &'a OutboxEvent) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn registering_a_handler_replaces_any_previous_one() {
        let uow_factory: Arc<dyn UnitOfWorkFactory> = Arc::new(rental_testing::InMemoryUnitOfWorkFactory::new());
        let mut dispatcher = OutboxDispatcher::new(uow_factory, "worker-1");
        dispatcher.register_handler("ReservationCreated", Arc::new(AlwaysSucceeds));
        assert!(dispatcher.handlers.contains_key("ReservationCreated"));
        dispatcher.register_handler("ReservationCreated", Arc::new(AlwaysSucceeds));
        assert_eq!(dispatcher.handlers.len(), 1);
    }
}
