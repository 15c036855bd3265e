use crate::error::DomainError;
use crate::service::DomainService;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tally of one sweep over the domains due for a recheck.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub verified: usize,
    /// Saved by a concurrent pass first; picked up again next sweep
    pub conflicts: usize,
    pub failed: usize,
}

/// Periodically re-verifies every domain with a record past the freshness
/// window.
pub struct VerificationWorker {
    service: Arc<DomainService>,
    interval: Duration,
}

impl VerificationWorker {
    pub fn new(service: Arc<DomainService>) -> Self {
        let interval = service.settings().sweep_interval;
        Self { service, interval }
    }

    /// Sweeps on every tick until `cancel` fires.
    pub async fn start(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "verification worker started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.run_once(&cancel).await {
                        Ok(report) => debug!(?report, "sweep finished"),
                        Err(e) => error!(code = e.code(), error = %e, "sweep could not list domains"),
                    }
                }
            }
        }

        info!("verification worker stopped");
    }

    /// Runs one verification pass over each domain due for a recheck.
    ///
    /// Failures of individual domains are counted, not returned; only a
    /// failure to list the due domains is an error.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<SweepReport, DomainError> {
        let due = self.service.list_due().await?;
        let mut report = SweepReport::default();

        for domain in due {
            if cancel.is_cancelled() {
                break;
            }

            let id = domain.id.clone();
            report.checked += 1;

            match self.service.verify(domain, cancel).await {
                Ok(domain) if domain.verified => report.verified += 1,
                Ok(_) => {}
                Err(DomainError::Conflict(_)) => {
                    debug!(%id, "domain saved concurrently, skipping");
                    report.conflicts += 1;
                }
                Err(DomainError::Cancelled) => break,
                Err(e) => {
                    warn!(%id, code = e.code(), retryable = e.is_retryable(), "recheck failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
