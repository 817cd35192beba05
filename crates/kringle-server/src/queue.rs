//! The notification queue: a bounded channel drained by a delivery worker.
//!
//! Enqueueing is synchronous and never blocks the request that triggered the
//! notification. The worker delivers at-least-once with bounded retries; a
//! notification that keeps failing, or that arrives while the queue is full,
//! is dropped with a warning. Nothing here ever surfaces an error to the
//! caller.

use std::{future::Future, sync::Arc, time::Duration};

use kringle_core::{
  Result,
  notify::{Notification, Notifier},
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Delivery backend the worker drains into.
pub trait DeliverNotification: Send + Sync {
  fn deliver<'a>(
    &'a self,
    notification: &'a Notification,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}

/// Worker tuning, from [`crate::ServerConfig`].
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
  pub capacity:     usize,
  pub max_attempts: u32,
  pub retry_delay:  Duration,
}

/// [`Notifier`] backed by a bounded channel.
#[derive(Clone)]
pub struct QueueNotifier {
  tx: mpsc::Sender<Notification>,
}

impl Notifier for QueueNotifier {
  fn enqueue(&self, notification: Notification) {
    match self.tx.try_send(notification) {
      Ok(()) => {}
      Err(mpsc::error::TrySendError::Full(n)) => {
        warn!(user = n.user_id, "notification queue full, dropping");
      }
      Err(mpsc::error::TrySendError::Closed(n)) => {
        warn!(user = n.user_id, "notification worker gone, dropping");
      }
    }
  }
}

/// Create the queue and start its delivery worker.
///
/// The worker runs until every [`QueueNotifier`] clone is dropped and the
/// queue has drained.
pub fn spawn<D>(
  sink: Arc<D>,
  config: QueueConfig,
) -> (QueueNotifier, tokio::task::JoinHandle<()>)
where
  D: DeliverNotification + 'static,
{
  let (tx, rx) = mpsc::channel(config.capacity);
  let handle = tokio::spawn(worker(sink, rx, config));
  (QueueNotifier { tx }, handle)
}

async fn worker<D>(
  sink: Arc<D>,
  mut rx: mpsc::Receiver<Notification>,
  config: QueueConfig,
) where
  D: DeliverNotification,
{
  while let Some(notification) = rx.recv().await {
    deliver_with_retries(sink.as_ref(), &notification, config).await;
  }
}

async fn deliver_with_retries<D>(
  sink: &D,
  notification: &Notification,
  config: QueueConfig,
) where
  D: DeliverNotification,
{
  for attempt in 1..=config.max_attempts {
    match sink.deliver(notification).await {
      Ok(()) => {
        debug!(user = notification.user_id, attempt, "notification delivered");
        return;
      }
      Err(error) if attempt < config.max_attempts => {
        warn!(
          user = notification.user_id,
          attempt,
          %error,
          "notification delivery failed, retrying"
        );
        tokio::time::sleep(config.retry_delay).await;
      }
      Err(error) => {
        warn!(
          user = notification.user_id,
          %error,
          "notification delivery failed, giving up"
        );
      }
    }
  }
}
