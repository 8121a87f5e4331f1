// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Ingestion consumer task
//!
//! Reads one subscription sequentially and hands each message to a
//! [`MessageHandler`]. Handler failures are logged and counted; only the end
//! of the feed or `shutdown` stops the task.

use parking_lot::Mutex;
use pulsebind_services::ServiceError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::feed::{FeedMessage, FeedSubscription};
use crate::handler::{HandleOutcome, MessageHandler};
use crate::IngestError;

#[derive(Default, Debug)]
pub struct IngestionStats {
    received: AtomicU64,
    stored: AtomicU64,
    duplicates: AtomicU64,
    dropped_malformed: AtomicU64,
    dropped_not_found: AtomicU64,
    dropped_rejected: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`IngestionStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestionStatsSnapshot {
    pub received: u64,
    pub stored: u64,
    pub duplicates: u64,
    pub dropped_malformed: u64,
    pub dropped_not_found: u64,
    pub dropped_rejected: u64,
    pub failed: u64,
}

impl IngestionStats {
    pub fn snapshot(&self) -> IngestionStatsSnapshot {
        IngestionStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            dropped_not_found: self.dropped_not_found.load(Ordering::Relaxed),
            dropped_rejected: self.dropped_rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    fn record_outcome(&self, outcome: HandleOutcome) {
        let counter = match outcome {
            HandleOutcome::Stored => &self.stored,
            HandleOutcome::Duplicate => &self.duplicates,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self, err: &IngestError) {
        let counter = match err {
            IngestError::Decode(_) => &self.dropped_malformed,
            IngestError::Service(ServiceError::NotFound { .. }) => &self.dropped_not_found,
            IngestError::Service(ServiceError::Storage(_))
            | IngestError::Encode(_)
            | IngestError::Timeout(_)
            | IngestError::Feed(_) => &self.failed,
            IngestError::Service(_) => &self.dropped_rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct IngestionConsumer {
    topic: String,
    stats: Arc<IngestionStats>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IngestionConsumer {
    /// Start consuming `subscription` on the current tokio runtime
    ///
    /// Each handler call is bounded by `handler_timeout`; a call that runs
    /// over is abandoned and counted as failed.
    pub fn spawn(
        subscription: FeedSubscription,
        handler: Arc<dyn MessageHandler>,
        handler_timeout: Duration,
    ) -> Self {
        let topic = subscription.topic().to_string();
        let stats = Arc::new(IngestionStats::default());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(
            subscription,
            handler,
            handler_timeout,
            Arc::clone(&stats),
            shutdown_rx,
        ));

        info!(topic = %topic, "ingestion consumer started");
        Self {
            topic,
            stats,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn stats(&self) -> IngestionStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn stats_handle(&self) -> Arc<IngestionStats> {
        Arc::clone(&self.stats)
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Stop the consumer and wait for it to finish the message in hand
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(topic = %self.topic, "ingestion consumer panicked: {}", e);
                }
            }
        }
    }
}

impl Drop for IngestionConsumer {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

async fn run(
    mut subscription: FeedSubscription,
    handler: Arc<dyn MessageHandler>,
    handler_timeout: Duration,
    stats: Arc<IngestionStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.changed() => {
                debug!(topic = %subscription.topic(), "ingestion consumer shutting down");
                break;
            }
            message = subscription.next() => match message {
                Some(message) => message,
                None => {
                    info!(topic = %subscription.topic(), "feed closed; ingestion consumer exiting");
                    break;
                }
            },
        };

        stats.record_received();
        dispatch(handler.as_ref(), &message, handler_timeout, &stats).await;
    }
}

async fn dispatch(
    handler: &dyn MessageHandler,
    message: &FeedMessage,
    handler_timeout: Duration,
    stats: &IngestionStats,
) {
    let result = match timeout(handler_timeout, handler.handle(message)).await {
        Ok(result) => result,
        Err(_) => Err(IngestError::Timeout(handler_timeout)),
    };

    match result {
        Ok(outcome) => stats.record_outcome(outcome),
        Err(err) => {
            stats.record_error(&err);
            match &err {
                IngestError::Service(ServiceError::NotFound { .. }) => {
                    warn!(topic = %message.topic, "dropping feed message for unknown sample: {}", err)
                }
                IngestError::Decode(_) => {
                    warn!(topic = %message.topic, bytes = message.payload.len(), "dropping malformed feed message: {}", err)
                }
                _ => warn!(topic = %message.topic, "feed message not applied: {}", err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{ChannelFeed, FeedSource};
    use async_trait::async_trait;

    struct ScriptedHandler;

    #[async_trait]
    impl MessageHandler for ScriptedHandler {
        async fn handle(&self, message: &FeedMessage) -> crate::Result<HandleOutcome> {
            match message.payload.as_slice() {
                b"ok" => Ok(HandleOutcome::Stored),
                b"dup" => Ok(HandleOutcome::Duplicate),
                b"bad" => Err(IngestError::Decode("bad".into())),
                b"missing" => Err(IngestError::Service(ServiceError::NotFound {
                    resource: "Sample".into(),
                    id: "x".into(),
                })),
                b"forbidden" => Err(IngestError::Service(ServiceError::Forbidden("no".into()))),
                b"unencodable" => Err(IngestError::Encode("no".into())),
                b"slow" => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(HandleOutcome::Stored)
                }
                _ => Err(IngestError::Service(ServiceError::Storage("down".into()))),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_counted_and_consumer_keeps_running() {
        let feed = ChannelFeed::new(16);
        let subscription = feed.subscribe("t").await.unwrap();
        let consumer =
            IngestionConsumer::spawn(subscription, Arc::new(ScriptedHandler), Duration::from_secs(1));

        for payload in [
            "bad",
            "missing",
            "forbidden",
            "slow",
            "storage",
            "unencodable",
            "ok",
            "dup",
        ] {
            feed.publish("t", payload.as_bytes().to_vec()).await.unwrap();
        }
        feed.close();

        // Feed closed: the task drains the buffer and exits
        let task = consumer.task.lock().take().unwrap();
        task.await.unwrap();

        assert_eq!(
            consumer.stats(),
            IngestionStatsSnapshot {
                received: 8,
                stored: 1,
                duplicates: 1,
                dropped_malformed: 1,
                dropped_not_found: 1,
                dropped_rejected: 1,
                failed: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_consumer() {
        let feed = ChannelFeed::new(4);
        let subscription = feed.subscribe("t").await.unwrap();
        let consumer =
            IngestionConsumer::spawn(subscription, Arc::new(ScriptedHandler), Duration::from_secs(1));
        assert!(consumer.is_running());

        consumer.shutdown().await;
        assert!(!consumer.is_running());
        assert_eq!(consumer.topic(), "t");
    }
}
