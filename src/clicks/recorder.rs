//! Affiliate click recorder
//!
//! Fire-and-forget click persistence. `track()` only enqueues; a background
//! worker drains the queue, throttles writes with governor, retries failed
//! writes, and logs whatever still fails. Nothing here can fail a request.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use nonzero_ext::nonzero;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    store::{ClickEvent, MeterStore},
};

type WriteLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Configuration for the click recorder
#[derive(Debug, Clone)]
pub struct ClickRecorderConfig {
    /// Queue capacity; clicks beyond it are dropped
    pub channel_buffer: usize,
    /// Maximum clicks written per worker wake-up
    pub max_batch_size: usize,
    /// Maximum store writes per second
    pub write_rate_per_second: u32,
    /// Attempts per click before it is given up
    pub max_attempts: u32,
    /// Backoff step between attempts (multiplied by the attempt number)
    pub retry_backoff: Duration,
}

impl Default for ClickRecorderConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 10_000,
            max_batch_size: 100,
            write_rate_per_second: 200,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl ClickRecorderConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            channel_buffer: config.click_channel_buffer.max(1),
            write_rate_per_second: config.click_write_rate_per_second,
            max_attempts: config.click_max_attempts.max(1),
            ..Self::default()
        }
    }
}

/// Click recorder handle shared by request handlers
pub struct ClickRecorder {
    sender: mpsc::Sender<ClickEvent>,
    shutdown: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ClickRecorder {
    /// Create a recorder and spawn its background worker
    pub fn new(store: Arc<dyn MeterStore>, config: ClickRecorderConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.channel_buffer);
        let shutdown = Arc::new(Notify::new());

        let worker = tokio::spawn(Self::background_worker(
            store,
            receiver,
            shutdown.clone(),
            config,
        ));

        Self {
            sender,
            shutdown,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue a click for persistence - fire-and-forget
    ///
    /// Never blocks and never fails. If the queue is full or closed the
    /// click is dropped and logged.
    pub fn track(&self, event: ClickEvent) {
        match self.sender.try_send(event) {
            Ok(()) => metrics::record_click("accepted"),
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    retailer = %event.retailer_slug,
                    product_id = event.product_id,
                    "Click queue full, dropping click"
                );
                metrics::record_click("dropped");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                error!(
                    retailer = %event.retailer_slug,
                    product_id = event.product_id,
                    "Click queue closed, dropping click"
                );
                metrics::record_click("dropped");
            }
        }
    }

    /// Clicks waiting to be written
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Stop the worker after it has written everything already queued
    pub async fn shutdown(&self) {
        self.shutdown.notify_one();
        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(e) = worker.await {
                error!(error = %e, "Click recorder worker panicked");
            }
        }
    }

    async fn background_worker(
        store: Arc<dyn MeterStore>,
        mut receiver: mpsc::Receiver<ClickEvent>,
        shutdown: Arc<Notify>,
        config: ClickRecorderConfig,
    ) {
        info!(
            batch_size = config.max_batch_size,
            rate_limit = config.write_rate_per_second,
            max_attempts = config.max_attempts,
            "Starting click recorder worker"
        );

        let rate = NonZeroU32::new(config.write_rate_per_second).unwrap_or(nonzero!(1u32));
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));
        let mut batch = Vec::with_capacity(config.max_batch_size);

        loop {
            tokio::select! {
                received = receiver.recv_many(&mut batch, config.max_batch_size) => {
                    if received == 0 {
                        break;
                    }
                    Self::write_batch(&store, &rate_limiter, &config, &mut batch).await;
                }
                _ = shutdown.notified() => break,
            }
        }

        // Stop accepting clicks and write what is already queued
        receiver.close();
        while receiver.recv_many(&mut batch, config.max_batch_size).await > 0 {
            Self::write_batch(&store, &rate_limiter, &config, &mut batch).await;
        }

        info!("Click recorder shutting down");
    }

    /// Write a batch, starting each write as the limiter admits it
    ///
    /// Writes already started keep running (and retrying) while the next
    /// permit is awaited.
    async fn write_batch(
        store: &Arc<dyn MeterStore>,
        rate_limiter: &WriteLimiter,
        config: &ClickRecorderConfig,
        batch: &mut Vec<ClickEvent>,
    ) {
        let total = batch.len();
        let mut in_flight = FuturesUnordered::new();
        let mut persisted = 0;

        for event in batch.drain(..) {
            loop {
                tokio::select! {
                    _ = rate_limiter.until_ready() => break,
                    Some(ok) = in_flight.next(), if !in_flight.is_empty() => {
                        persisted += usize::from(ok);
                    }
                }
            }
            in_flight.push(Self::write_with_retry(store, config, event));
        }

        while let Some(ok) = in_flight.next().await {
            persisted += usize::from(ok);
        }

        if persisted < total {
            warn!(total = total, persisted = persisted, "Click batch written with failures");
        } else {
            debug!(total = total, "Click batch written");
        }
    }

    async fn write_with_retry(
        store: &Arc<dyn MeterStore>,
        config: &ClickRecorderConfig,
        event: ClickEvent,
    ) -> bool {
        let max_attempts = config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match store.insert_click_event(&event).await {
                Ok(()) => {
                    metrics::record_click("persisted");
                    return true;
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        click_id = %event.id,
                        attempt = attempt,
                        error = %e,
                        "Click write failed, retrying"
                    );
                    tokio::time::sleep(config.retry_backoff * attempt).await;
                }
                Err(e) => {
                    // Failure sink: the click is lost, only the log line remains
                    error!(
                        click_id = %event.id,
                        retailer = %event.retailer_slug,
                        product_id = event.product_id,
                        user_id = ?event.user_id,
                        session_id = ?event.session_id,
                        attempts = attempt,
                        error = %e,
                        "Failed to persist affiliate click"
                    );
                    metrics::record_click("failed");
                }
            }
        }

        false
    }
}

/// Metrics for the click recorder
pub mod metrics {
    use metrics::counter;

    /// Record a click outcome (`accepted`, `dropped`, `persisted`, `failed`)
    pub fn record_click(outcome: &'static str) {
        counter!("meter_clicks_total", "outcome" => outcome).increment(1);
    }
}
