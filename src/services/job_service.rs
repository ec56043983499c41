//! Durable side effects queued by checkout.
//!
//! Jobs are rows written in the checkout transaction. The worker claims one
//! due job at a time, runs it, and either marks it done, schedules a retry
//! with exponential backoff, or marks it failed once `max_attempts` is used.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use tokio::sync::watch;

use crate::{
    config::JobConfig,
    error::Result,
    models::{Job, QueuedJob},
    services::{
        email_service::Mailer,
        invoice_service::{self, InvoiceService, ORDER_CONFIRMATION_SUBJECT},
    },
};

const MAX_BACKOFF: Duration = Duration::from_secs(60 * 60);

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Marks the oldest due pending job as running, counts the attempt and
    /// returns it.
    async fn claim_next(&self) -> Result<Option<QueuedJob>>;

    async fn complete(&self, id: i32) -> Result<()>;

    async fn retry(&self, id: i32, run_at: DateTime<Utc>, error: &str) -> Result<()>;

    async fn fail(&self, id: i32, error: &str) -> Result<()>;
}

/// Delay before retry number `attempts`: `base`, `2 * base`, `4 * base`, ...
pub fn backoff(base: Duration, attempts: i32) -> Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 16) as u32;
    base.saturating_mul(1u32 << exponent).min(MAX_BACKOFF)
}

pub struct JobHandler {
    mailer: Arc<dyn Mailer>,
    invoices: InvoiceService,
}

impl JobHandler {
    pub fn new(mailer: Arc<dyn Mailer>, invoices: InvoiceService) -> Self {
        Self { mailer, invoices }
    }

    pub async fn handle(&self, job: &Job) -> Result<()> {
        match job {
            Job::OrderConfirmationEmail { recipient, summary } => {
                let html = invoice_service::render_order_summary(
                    summary,
                    Local::now(),
                    self.invoices.delivery_days(),
                )?;
                self.mailer
                    .send_html(recipient, ORDER_CONFIRMATION_SUBJECT, &html)
                    .await?;
                tracing::info!("Order confirmation for {} sent to {}", summary.txn_id, recipient);
                Ok(())
            }
            Job::InvoicePdf { summary } => self.invoices.publish(summary).await.map(|_| ()),
        }
    }
}

pub struct JobWorker {
    store: Arc<dyn JobStore>,
    handler: JobHandler,
    poll_interval: Duration,
    base_backoff: Duration,
}

impl JobWorker {
    pub fn new(store: Arc<dyn JobStore>, handler: JobHandler, config: &JobConfig) -> Self {
        Self {
            store,
            handler,
            poll_interval: config.poll_interval,
            base_backoff: config.base_backoff,
        }
    }

    /// Processes jobs until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Job worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let processed = match self.run_once().await {
                Ok(processed) => processed,
                Err(e) => {
                    tracing::error!("Job worker error: {}", e);
                    false
                }
            };

            if processed {
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Job worker stopped");
    }

    /// Runs at most one due job. Returns whether one was found.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(queued) = self.store.claim_next().await? else {
            return Ok(false);
        };

        let result = match Job::from_parts(&queued.kind, queued.payload.clone()) {
            Ok(job) => self.handler.handle(&job).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.store.complete(queued.id).await?;
                tracing::info!("Job {} ({}) done", queued.id, queued.kind);
            }
            Err(e) if queued.attempts >= queued.max_attempts => {
                self.store.fail(queued.id, &e.to_string()).await?;
                tracing::error!(
                    "Job {} ({}) failed after {} attempts: {}",
                    queued.id,
                    queued.kind,
                    queued.attempts,
                    e
                );
            }
            Err(e) => {
                let delay = backoff(self.base_backoff, queued.attempts);
                let run_at = Utc::now()
                    + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::hours(1));
                self.store.retry(queued.id, run_at, &e.to_string()).await?;
                tracing::warn!(
                    "Job {} ({}) attempt {} failed, retrying in {:?}: {}",
                    queued.id,
                    queued.kind,
                    queued.attempts,
                    delay,
                    e
                );
            }
        }

        Ok(true)
    }
}
