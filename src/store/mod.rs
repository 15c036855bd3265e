//! Persistence of [`SmtpDomain`] documents.
//!
//! Writes follow an optimistic concurrency discipline: every save swaps the
//! `update_token` it read for a fresh one, and an update only lands when the
//! stored token still matches the one read. A lost race surfaces as
//! [`StoreError::Conflict`] instead of overwriting someone else's write.

use crate::error::StoreError;
use crate::models::SmtpDomain;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[async_trait]
pub trait DomainStore: Send + Sync {
    /// Inserts a new document; an existing id yields [`StoreError::Duplicate`].
    async fn create(&self, domain: &SmtpDomain) -> Result<(), StoreError>;

    async fn find(&self, id: &str) -> Result<Option<SmtpDomain>, StoreError>;

    /// Replaces the stored document only if its token equals `expected_token`.
    async fn update_if_token_matches(
        &self,
        domain: &SmtpDomain,
        expected_token: &str,
    ) -> Result<(), StoreError>;

    async fn list_by_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<SmtpDomain>, StoreError>;

    /// Domains with at least one record outside the freshness window.
    async fn list_due(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<SmtpDomain>, StoreError>;

    /// Persists `domain`, creating it when it has never been saved.
    ///
    /// On success `domain` carries the new token and `updated_at`; on failure
    /// it is left untouched.
    async fn save(&self, domain: &mut SmtpDomain) -> Result<(), StoreError> {
        let mut next = domain.clone();
        next.update_token = Uuid::new_v4().to_string();
        next.updated_at = Utc::now();

        if domain.update_token.is_empty() {
            self.create(&next).await?;
        } else {
            self.update_if_token_matches(&next, &domain.update_token)
                .await?;
        }

        *domain = next;
        Ok(())
    }
}
