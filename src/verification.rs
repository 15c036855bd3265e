//! Verification passes over a registered domain.
//!
//! A pass re-checks every record that is not fresh, aggregates the result and
//! persists it through the registry's optimistic save. Passes triggered on
//! demand and by the background sweep run through the same code; concurrent
//! passes over one domain are arbitrated by the update token alone.

use crate::error::DomainError;
use crate::models::SmtpDomain;
use crate::registry::DomainRegistry;
use crate::validation::dnstxt::{DnsVerifier, TxtCheck, TxtResolver};
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct VerificationOrchestrator {
    registry: Arc<DomainRegistry>,
    dns: DnsVerifier,
    freshness: chrono::Duration,
    timeout: Duration,
}

impl VerificationOrchestrator {
    pub fn new(registry: Arc<DomainRegistry>, resolver: Arc<dyn TxtResolver>) -> Self {
        let settings = registry.settings();
        let dns = DnsVerifier::new(resolver, settings.accept_existing_dmarc);
        let freshness = registry.freshness();
        let timeout = settings.verification_timeout;

        Self {
            registry,
            dns,
            freshness,
            timeout,
        }
    }

    /// Runs one verification pass over `domain`.
    ///
    /// Records verified within the freshness window are not queried again. If
    /// every record is fresh the domain is returned as is, without a write.
    ///
    /// The DNS phase is bounded by the configured deadline and by `cancel`.
    /// Any lookup error, a cancellation or a timeout aborts the pass and
    /// nothing is written.
    ///
    /// # Arguments
    /// * `domain` - Domain as read from the store, carrying its update token
    /// * `cancel` - Aborts the pass before anything is persisted
    ///
    /// # Returns
    /// * `Ok(SmtpDomain)` with the persisted state after the pass
    /// * `Err(DomainError::Conflict)` if the domain was saved by someone else
    ///   since it was read
    /// * `Err(DomainError)` for DNS, deadline or storage failures
    pub async fn verify(
        &self,
        domain: SmtpDomain,
        cancel: &CancellationToken,
    ) -> Result<SmtpDomain, DomainError> {
        let now = Utc::now();
        let stale: Vec<usize> = domain
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.is_fresh(now, self.freshness))
            .map(|(i, _)| i)
            .collect();

        if stale.is_empty() {
            debug!(id = %domain.id, "all records fresh, skipping DNS");
            return Ok(domain);
        }

        let outcome = self.check_records(&domain, &stale, cancel).await;
        self.finalize(domain, stale, outcome).await
    }

    async fn check_records(
        &self,
        domain: &SmtpDomain,
        stale: &[usize],
        cancel: &CancellationToken,
    ) -> Result<Vec<TxtCheck>, DomainError> {
        debug!(id = %domain.id, records = stale.len(), "checking records");

        let lookups = try_join_all(stale.iter().map(|&i| self.dns.verify(&domain.records[i])));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DomainError::Cancelled),
            result = tokio::time::timeout(self.timeout, lookups) => {
                result.map_err(|_| DomainError::Timeout)?
            }
        }
    }

    /// Applies a completed DNS phase and persists it, or reports why not.
    async fn finalize(
        &self,
        mut domain: SmtpDomain,
        stale: Vec<usize>,
        outcome: Result<Vec<TxtCheck>, DomainError>,
    ) -> Result<SmtpDomain, DomainError> {
        let checks = match outcome {
            Ok(checks) => checks,
            Err(e) => {
                warn!(
                    id = %domain.id,
                    code = e.code(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "verification pass aborted"
                );
                return Err(e);
            }
        };

        let checked_at = Utc::now();
        for (i, check) in stale.into_iter().zip(checks) {
            let record = &mut domain.records[i];
            record.verified = check.satisfied;
            record.alt_value = check.alt_value;
            record.verified_at = Some(checked_at);
        }

        domain.verified = domain.all_records_verified();
        domain.verified_at = Some(checked_at);

        if let Err(e) = self.registry.save(&mut domain).await {
            warn!(id = %domain.id, code = e.code(), error = %e, "verification result not saved");
            return Err(e);
        }

        info!(
            id = %domain.id,
            host = %domain.host,
            verified = domain.verified,
            records_verified = domain.verified_count(),
            records = domain.records.len(),
            "verification pass complete"
        );
        Ok(domain)
    }
}
