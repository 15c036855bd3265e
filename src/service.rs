use crate::config::DomainSettings;
use crate::error::DomainError;
use crate::models::SmtpDomain;
use crate::registry::{DomainRegistry, Registration};
use crate::store::DomainStore;
use crate::validation::dnstxt::TxtResolver;
use crate::verification::VerificationOrchestrator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Operations exposed to callers, scoped to an already-resolved organization.
///
/// Shared by the GraphQL resolvers and the background worker. Cancelling
/// [`DomainService::shutdown_token`] aborts every in-flight verification pass.
pub struct DomainService {
    registry: Arc<DomainRegistry>,
    orchestrator: VerificationOrchestrator,
    shutdown: CancellationToken,
}

impl DomainService {
    pub fn new(
        settings: DomainSettings,
        store: Arc<dyn DomainStore>,
        resolver: Arc<dyn TxtResolver>,
    ) -> Result<Self, DomainError> {
        let registry = Arc::new(DomainRegistry::new(Arc::new(settings), store)?);
        let orchestrator = VerificationOrchestrator::new(registry.clone(), resolver);

        Ok(Self {
            registry,
            orchestrator,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn settings(&self) -> &DomainSettings {
        self.registry.settings()
    }

    /// Registers `host` and runs a first verification pass.
    ///
    /// # Arguments
    /// * `organization_id` - Owning organization
    /// * `host` - Sending domain
    /// * `region` - Optional region from the configured allow-list
    ///
    /// # Returns
    /// * `Ok(SmtpDomain)` - the verified state of a new domain, the created
    ///   domain if its first pass failed for a retryable reason, or the
    ///   domain already registered
    /// * `Err(DomainError)` - invalid input, key generation or storage
    ///   failure, or a first pass that cannot succeed on retry. The domain
    ///   stays registered in that case.
    pub async fn add_domain(
        &self,
        organization_id: &str,
        host: &str,
        region: Option<&str>,
    ) -> Result<SmtpDomain, DomainError> {
        let domain = match self.registry.register(organization_id, host, region).await? {
            Registration::Created(domain) => domain,
            Registration::Existing(domain) => return Ok(domain),
        };

        match self
            .orchestrator
            .verify(domain.clone(), &self.shutdown.child_token())
            .await
        {
            Ok(verified) => Ok(verified),
            Err(e) if e.is_retryable() => {
                warn!(
                    id = %domain.id,
                    code = e.code(),
                    "first verification failed, returning unverified domain"
                );
                Ok(domain)
            }
            Err(e) => Err(e),
        }
    }

    /// Loads `host` and runs a verification pass over it.
    ///
    /// A [`DomainError::Conflict`] means another pass saved the domain first;
    /// calling again verifies from the fresh state.
    pub async fn verify_domain(
        &self,
        organization_id: &str,
        host: &str,
    ) -> Result<SmtpDomain, DomainError> {
        let domain = self.registry.find(organization_id, host).await?;
        self.verify(domain, &self.shutdown.child_token()).await
    }

    /// Runs a verification pass over an already loaded domain.
    pub async fn verify(
        &self,
        domain: SmtpDomain,
        cancel: &CancellationToken,
    ) -> Result<SmtpDomain, DomainError> {
        self.orchestrator.verify(domain, cancel).await
    }

    pub async fn get_domain(
        &self,
        organization_id: &str,
        host: &str,
    ) -> Result<SmtpDomain, DomainError> {
        self.registry.find(organization_id, host).await
    }

    pub async fn list_domains(&self, organization_id: &str) -> Result<Vec<SmtpDomain>, DomainError> {
        self.registry.list(organization_id).await
    }

    pub async fn list_due(&self) -> Result<Vec<SmtpDomain>, DomainError> {
        self.registry.list_due().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainSettings;
    use crate::error::DnsError;
    use crate::store::MemoryStore;
    use crate::test_support::{MockResolver, harness};

    fn service_with(resolver: MockResolver) -> (DomainService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service =
            DomainService::new(DomainSettings::default(), store.clone(), Arc::new(resolver))
                .unwrap();
        (service, store)
    }

    #[tokio::test]
    async fn test_add_domain_tolerates_retryable_first_pass_failure() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_lookup_txt()
            .returning(|_| Err(DnsError::Resolver("SERVFAIL".to_string())));
        let (service, store) = service_with(resolver);

        let added = service
            .add_domain("org_1", "example.com", None)
            .await
            .unwrap();
        assert!(!added.verified);
        assert!(added.verified_at.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_add_domain_reports_non_retryable_first_pass_failure() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_lookup_txt()
            .returning(|_| Err(DnsError::UnsupportedRecordType("MX".to_string())));
        let (service, store) = service_with(resolver);

        let err = service
            .add_domain("org_1", "example.com", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_record_type");
        assert!(!err.is_retryable());

        // the domain stays registered and a second call returns it as is
        assert_eq!(store.len().await, 1);
        let existing = service
            .add_domain("org_1", "example.com", None)
            .await
            .unwrap();
        assert!(!existing.verified);
    }

    #[tokio::test]
    async fn test_add_then_verify_after_partial_publication() {
        let h = harness();

        let added = h
            .service
            .add_domain("org_1", "example.com", Some("eu"))
            .await
            .unwrap();
        assert!(!added.verified);
        assert_eq!(added.records.len(), 3);
        assert!(added.records.iter().all(|r| !r.verified));
        assert!(added.verified_at.is_some());
        assert_eq!(h.resolver.lookups(), 3);

        for record in &added.records[..2] {
            h.resolver.publish(&record.host, &record.value);
        }

        let verified = h
            .service
            .verify_domain("org_1", "example.com")
            .await
            .unwrap();
        assert!(!verified.verified);
        assert_eq!(verified.verified_count(), 2);
        assert!(!verified.records[2].verified);
        assert_eq!(verified.records[2].host, "example.com");

        let stored = h.store.find(&verified.id).await.unwrap().unwrap();
        assert_eq!(stored, verified);
    }

    #[tokio::test]
    async fn test_fully_published_domain_becomes_verified() {
        let h = harness();
        let added = h
            .service
            .add_domain("org_1", "example.com", None)
            .await
            .unwrap();

        for record in &added.records {
            h.resolver.publish(&record.host, &record.value);
        }

        let verified = h
            .service
            .verify_domain("org_1", "example.com")
            .await
            .unwrap();
        assert!(verified.verified);
        assert_eq!(h.resolver.lookups(), 6);

        // a second pass inside the freshness window does not touch DNS
        let again = h
            .service
            .verify_domain("org_1", "example.com")
            .await
            .unwrap();
        assert_eq!(again, verified);
        assert_eq!(h.resolver.lookups(), 6);
    }

    #[tokio::test]
    async fn test_add_domain_is_idempotent() {
        let h = harness();

        let first = h
            .service
            .add_domain("org_1", "example.com", Some("us"))
            .await
            .unwrap();
        let second = h
            .service
            .add_domain("org_1", "example.com", Some("us"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(h.store.len().await, 1);
        assert_eq!(h.service.list_domains("org_1").await.unwrap().len(), 1);
        assert!(h.service.list_domains("org_2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_host_makes_no_dns_call() {
        let h = harness();

        let err = h
            .service
            .add_domain("org_1", "exa_mple..com", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_host");
        assert_eq!(h.resolver.lookups(), 0);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_verify_unknown_domain() {
        let h = harness();
        let err = h
            .service
            .verify_domain("org_1", "example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_verification() {
        let h = harness();
        let added = h
            .service
            .add_domain("org_1", "example.com", None)
            .await
            .unwrap();

        h.service.shutdown_token().cancel();

        let err = h
            .service
            .verify_domain("org_1", "example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Cancelled));
        assert_eq!(h.store.find(&added.id).await.unwrap().unwrap(), added);
    }
}
