//! Periodic emission cycle: replay backlog, generate, deliver, persist on failure.

use crate::backlog::BacklogStore;
use crate::client::{DeliveryOutcome, DeviceApiClient};
use crate::dead_letter::DeadLetterSink;
use crate::errors::Error;
use crate::generator::{Clock, MeasurementGenerator};
use crate::model::{Batch, Device};
use chrono::Utc;
use rand::Rng;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub batch_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            batch_size: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Ticking,
    Delivering,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Delivered,
    /// Kept for the next tick. `persisted` is false when the backlog file
    /// could not be written and the batch only survives in memory.
    Backlogged { reason: String, persisted: bool },
    Dropped { status: StatusCode },
}

#[derive(Debug, Clone)]
pub struct TickReport {
    /// Measurements carried over from earlier ticks.
    pub replayed: usize,
    pub generated: usize,
    /// False when the tick never reached the submission call, e.g. because
    /// no token could be obtained.
    pub delivery_attempted: bool,
    pub outcome: TickOutcome,
}

impl TickReport {
    pub fn total(&self) -> usize {
        self.replayed + self.generated
    }
}

pub struct Scheduler<R, C> {
    client: DeviceApiClient,
    device: Device,
    generator: MeasurementGenerator<R, C>,
    backlog: BacklogStore,
    dead_letter: Option<DeadLetterSink>,
    config: SchedulerConfig,
    state: SchedulerState,
    unsaved: Batch,
}

impl<R: Rng, C: Clock> Scheduler<R, C> {
    pub fn new(
        client: DeviceApiClient,
        device: Device,
        generator: MeasurementGenerator<R, C>,
        backlog: BacklogStore,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            client,
            device,
            generator,
            backlog,
            dead_letter: None,
            config,
            state: SchedulerState::Idle,
            unsaved: Vec::new(),
        }
    }

    pub fn with_dead_letter(mut self, sink: DeadLetterSink) -> Self {
        self.dead_letter = Some(sink);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn backlog(&self) -> &BacklogStore {
        &self.backlog
    }

    /// Tick immediately, then every `interval`, until `shutdown` resolves.
    ///
    /// Ticks run inline, so a slow delivery pushes the next tick back instead
    /// of overlapping it. Shutdown is only observed between ticks.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting emission for device {} with batch_size={}, interval={:?}",
            self.device.serial_number, self.config.batch_size, self.config.interval
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested, no further ticks will be scheduled");
                    break;
                }

                _ = ticker.tick() => {
                    self.tick().await;
                    ticks += 1;
                }
            }
        }

        info!("Scheduler stopped after {} ticks", ticks);
    }

    /// One full cycle. Never fails: every error is recovered or logged here.
    pub async fn tick(&mut self) -> TickReport {
        self.state = SchedulerState::Ticking;

        let mut pending = std::mem::take(&mut self.unsaved);
        let mut backlog_left_unread = false;
        match self.backlog.load() {
            Ok(backlog) => pending.extend(backlog),
            Err(e) => {
                backlog_left_unread = matches!(e, Error::Persistence { .. });
                error!("Skipping unreadable backlog: {}", e);
            }
        }
        let replayed = pending.len();

        let fresh = self
            .generator
            .generate(&self.device.serial_number, self.config.batch_size);
        let generated = fresh.len();
        pending.extend(fresh);

        let mut delivery_attempted = false;
        let token = self.client.authenticate(&self.device).await;
        let outcome = match token {
            Ok(token) => {
                self.state = SchedulerState::Delivering;
                delivery_attempted = true;
                let delivery = self
                    .client
                    .deliver(&self.device.serial_number, &pending, &token)
                    .await;
                self.settle(delivery, pending, backlog_left_unread)
            }
            Err(e) => self.keep_for_retry(pending, format!("authentication failed: {}", e)),
        };
        self.state = SchedulerState::Idle;

        let report = TickReport {
            replayed,
            generated,
            delivery_attempted,
            outcome,
        };
        log_report(&report);
        report
    }

    fn settle(
        &mut self,
        delivery: DeliveryOutcome,
        pending: Batch,
        backlog_left_unread: bool,
    ) -> TickOutcome {
        match delivery {
            DeliveryOutcome::Delivered => {
                // A backlog that failed to load was not part of this delivery.
                if backlog_left_unread {
                    warn!(
                        "Keeping unread backlog {} for the next tick",
                        self.backlog.path().display()
                    );
                } else if let Err(e) = self.backlog.clear() {
                    warn!("Delivered, but failed to clear backlog: {}", e);
                }
                TickOutcome::Delivered
            }
            DeliveryOutcome::ServiceUnavailable(status) => {
                self.keep_for_retry(pending, format!("service unavailable ({})", status))
            }
            DeliveryOutcome::TransportFailure(reason) => self.keep_for_retry(pending, reason),
            DeliveryOutcome::RejectedByServer { status, body } => {
                error!(
                    "Server rejected {} measurements ({}): {}",
                    pending.len(),
                    status,
                    body
                );
                if let Some(sink) = &self.dead_letter {
                    if let Err(e) = sink.record(status, &pending, Utc::now()) {
                        error!("Failed to dead-letter rejected batch: {}", e);
                    }
                }
                TickOutcome::Dropped { status }
            }
        }
    }

    fn keep_for_retry(&mut self, pending: Batch, reason: String) -> TickOutcome {
        let persisted = match self.backlog.save(&pending) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Failed to back up {} measurements, holding them in memory: {}",
                    pending.len(),
                    e
                );
                self.unsaved = pending;
                false
            }
        };
        TickOutcome::Backlogged { reason, persisted }
    }
}

fn log_report(report: &TickReport) {
    match &report.outcome {
        TickOutcome::Delivered => info!(
            "Delivered {} measurements ({} replayed from backlog)",
            report.total(),
            report.replayed
        ),
        TickOutcome::Backlogged { reason, persisted } => warn!(
            "Delivery failed ({}); {} measurements kept for next tick (on disk: {})",
            reason,
            report.total(),
            persisted
        ),
        TickOutcome::Dropped { status } => warn!(
            "Dropped {} measurements rejected with {}",
            report.total(),
            status
        ),
    }
    debug!(
        "Tick done: replayed={}, generated={}",
        report.replayed, report.generated
    );
}
