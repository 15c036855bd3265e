use super::DomainStore;
use crate::error::StoreError;
use crate::models::SmtpDomain;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local store with the same token semantics as [`super::MongoStore`].
#[derive(Default)]
pub struct MemoryStore {
    domains: RwLock<HashMap<String, SmtpDomain>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.domains.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.domains.read().await.is_empty()
    }
}

#[async_trait]
impl DomainStore for MemoryStore {
    async fn create(&self, domain: &SmtpDomain) -> Result<(), StoreError> {
        let mut domains = self.domains.write().await;
        if domains.contains_key(&domain.id) {
            return Err(StoreError::Duplicate(domain.id.clone()));
        }
        domains.insert(domain.id.clone(), domain.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<SmtpDomain>, StoreError> {
        Ok(self.domains.read().await.get(id).cloned())
    }

    async fn update_if_token_matches(
        &self,
        domain: &SmtpDomain,
        expected_token: &str,
    ) -> Result<(), StoreError> {
        let mut domains = self.domains.write().await;
        match domains.get_mut(&domain.id) {
            Some(stored) if stored.update_token == expected_token => {
                *stored = domain.clone();
                Ok(())
            }
            _ => Err(StoreError::Conflict(domain.id.clone())),
        }
    }

    async fn list_by_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<SmtpDomain>, StoreError> {
        let mut domains: Vec<SmtpDomain> = self
            .domains
            .read()
            .await
            .values()
            .filter(|d| d.organization_id == organization_id)
            .cloned()
            .collect();
        domains.sort_by(|a, b| a.host.cmp(&b.host));
        Ok(domains)
    }

    async fn list_due(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<SmtpDomain>, StoreError> {
        Ok(self
            .domains
            .read()
            .await
            .values()
            .filter(|d| d.needs_recheck(now, window))
            .cloned()
            .collect())
    }
}
