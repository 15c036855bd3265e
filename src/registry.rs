use crate::config::DomainSettings;
use crate::dkim::{DkimKeySource, KeyGenerator};
use crate::error::{DomainError, KeyError, StoreError};
use crate::models::{SmtpDomain, SmtpDomainRecord};
use crate::store::DomainStore;
use crate::validation::hostname::{is_valid_hostname, normalize_host};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

const DOMAIN_ID_PREFIX: &str = "dom_";

/// Derives the storage id of the domain `host` owned by `organization_id`.
///
/// The id only depends on its two inputs, so registering the same host twice
/// collides on the primary key instead of creating a second document.
///
/// # Arguments
/// * `organization_id` - Owning organization
/// * `host` - Normalized host name
///
/// # Returns
/// `dom_` followed by the alphanumeric characters of the base64 SHA-256 digest
pub fn domain_id(organization_id: &str, host: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(organization_id.as_bytes());
    hasher.update(host.as_bytes());
    let digest = BASE64.encode(hasher.finalize());

    let mut id = String::with_capacity(DOMAIN_ID_PREFIX.len() + digest.len());
    id.push_str(DOMAIN_ID_PREFIX);
    id.extend(digest.chars().filter(char::is_ascii_alphanumeric));
    id
}

/// Result of [`DomainRegistry::register`].
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    /// A new document was persisted
    Created(SmtpDomain),
    /// The host was already registered by the organization
    Existing(SmtpDomain),
}

impl Registration {
    pub fn is_created(&self) -> bool {
        matches!(self, Registration::Created(_))
    }

    pub fn domain(&self) -> &SmtpDomain {
        match self {
            Registration::Created(d) | Registration::Existing(d) => d,
        }
    }

    pub fn into_domain(self) -> SmtpDomain {
        match self {
            Registration::Created(d) | Registration::Existing(d) => d,
        }
    }
}

/// Creates domains and mediates every write to them.
pub struct DomainRegistry {
    settings: Arc<DomainSettings>,
    freshness: Duration,
    store: Arc<dyn DomainStore>,
    keys: Arc<dyn DkimKeySource>,
}

impl DomainRegistry {
    /// Validates `settings` and builds a registry generating RSA keys of
    /// `settings.dkim_key_bits`.
    pub fn new(
        settings: Arc<DomainSettings>,
        store: Arc<dyn DomainStore>,
    ) -> Result<Self, DomainError> {
        settings.validate()?;
        let keys = KeyGenerator::new(settings.dkim_key_bits)?;
        Self::with_keys(settings, store, Arc::new(keys))
    }

    pub fn with_keys(
        settings: Arc<DomainSettings>,
        store: Arc<dyn DomainStore>,
        keys: Arc<dyn DkimKeySource>,
    ) -> Result<Self, DomainError> {
        settings.validate()?;
        let freshness = settings.freshness()?;

        Ok(Self {
            settings,
            freshness,
            store,
            keys,
        })
    }

    pub fn settings(&self) -> &DomainSettings {
        &self.settings
    }

    /// How long a verified record is trusted.
    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Registers `host` for `organization_id`.
    ///
    /// Input is validated before any key material is generated. A host the
    /// organization already registered resolves to the stored document.
    ///
    /// # Arguments
    /// * `organization_id` - Owning organization, trusted as given
    /// * `host` - Sending domain, case-insensitive
    /// * `region` - Optional region, case-insensitive
    ///
    /// # Returns
    /// * `Ok(Registration::Created)` with the persisted, unverified domain
    /// * `Ok(Registration::Existing)` with the previously stored domain
    /// * `Err(DomainError)` on invalid input, key generation or storage failure
    pub async fn register(
        &self,
        organization_id: &str,
        host: &str,
        region: Option<&str>,
    ) -> Result<Registration, DomainError> {
        let host = normalize_host(host);
        if !is_valid_hostname(&host) {
            return Err(DomainError::InvalidHost(host));
        }

        let region = match region {
            Some(r) => {
                let r = r.trim().to_lowercase();
                if !self.settings.is_known_region(&r) {
                    return Err(DomainError::InvalidRegion(r));
                }
                Some(r)
            }
            None => None,
        };

        let id = domain_id(organization_id, &host);

        let keys = self.keys.clone();
        let key_pair = tokio::task::spawn_blocking(move || keys.generate())
            .await
            .map_err(|e| KeyError::Task(e.to_string()))??;

        let now = Utc::now();
        let mut domain = SmtpDomain {
            id,
            organization_id: organization_id.to_string(),
            records: self.expected_records(&host, key_pair.record_value),
            host,
            region,
            verified: false,
            mails_sent: 0,
            dkim_private_key: key_pair.private_key_pem,
            created_at: now,
            updated_at: now,
            verified_at: None,
            update_token: String::new(),
        };

        match self.store.save(&mut domain).await {
            Ok(()) => {
                info!(id = %domain.id, host = %domain.host, "registered domain");
                Ok(Registration::Created(domain))
            }
            Err(StoreError::Duplicate(id)) => {
                debug!(%id, "domain already registered, loading stored copy");
                let existing = self
                    .store
                    .find(&id)
                    .await?
                    .ok_or(DomainError::NotFound(id))?;
                Ok(Registration::Existing(existing))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Records in publication order: DMARC, DKIM, SPF.
    fn expected_records(&self, host: &str, dkim_value: String) -> Vec<SmtpDomainRecord> {
        vec![
            SmtpDomainRecord::txt(
                format!("_dmarc.{host}"),
                format!("v=DMARC1; p=none; fo=1; rua=mailto:admin@{host}"),
            ),
            SmtpDomainRecord::txt(
                format!("{}._domainkey.{host}", self.settings.dkim_selector),
                dkim_value,
            ),
            SmtpDomainRecord::txt(host, self.settings.spf_record()),
        ]
    }

    /// Loads the domain `host` of `organization_id`.
    pub async fn find(&self, organization_id: &str, host: &str) -> Result<SmtpDomain, DomainError> {
        let host = normalize_host(host);
        let id = domain_id(organization_id, &host);
        self.store
            .find(&id)
            .await?
            .ok_or(DomainError::NotFound(host))
    }

    pub async fn list(&self, organization_id: &str) -> Result<Vec<SmtpDomain>, DomainError> {
        Ok(self.store.list_by_organization(organization_id).await?)
    }

    /// Domains with at least one record outside the freshness window.
    pub async fn list_due(&self) -> Result<Vec<SmtpDomain>, DomainError> {
        Ok(self
            .store
            .list_due(Utc::now(), self.freshness)
            .await?)
    }

    /// Optimistic save; a stale token yields [`DomainError::Conflict`].
    pub async fn save(&self, domain: &mut SmtpDomain) -> Result<(), DomainError> {
        Ok(self.store.save(domain).await?)
    }
}
