use super::DomainStore;
use crate::config::MongoSettings;
use crate::error::StoreError;
use crate::models::SmtpDomain;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::{Client, Collection};
use tracing::debug;

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store, one document per domain keyed by its derived id.
#[derive(Clone)]
pub struct MongoStore {
    collection: Collection<SmtpDomain>,
}

impl MongoStore {
    pub fn new(collection: Collection<SmtpDomain>) -> Self {
        Self { collection }
    }

    /// Connects to MongoDB and selects the domains collection.
    ///
    /// # Arguments
    /// * `settings` - URI, database and collection names
    ///
    /// # Returns
    /// * `Ok(MongoStore)` once the client is configured
    /// * `Err(StoreError::Backend)` if the URI cannot be parsed or resolved
    pub async fn connect(settings: &MongoSettings) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&settings.uri).await?;
        let collection = client
            .database(&settings.database)
            .collection(&settings.collection);

        debug!(
            database = %settings.database,
            collection = %settings.collection,
            "connected domain store"
        );
        Ok(Self::new(collection))
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

/// Selects domains that may hold a record due for a recheck.
///
/// Timestamps are stored as RFC 3339 strings with a varying fraction width,
/// so the cutoff is rounded up to the next whole second before comparing.
/// The selection may include a few fresh domains but never misses a due one.
fn due_filter(now: DateTime<Utc>, window: Duration) -> Document {
    let mut due = vec![
        doc! { "records.verified": false },
        doc! { "records.verified_at": null },
    ];

    if let Some(cutoff) = now
        .checked_sub_signed(window)
        .and_then(|c| c.checked_add_signed(Duration::seconds(1)))
    {
        let cutoff = cutoff.to_rfc3339_opts(SecondsFormat::Secs, true);
        due.push(doc! { "records.verified_at": { "$lt": cutoff } });
    }

    doc! { "$or": due }
}

#[async_trait]
impl DomainStore for MongoStore {
    async fn create(&self, domain: &SmtpDomain) -> Result<(), StoreError> {
        match self.collection.insert_one(domain).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate(domain.id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn find(&self, id: &str) -> Result<Option<SmtpDomain>, StoreError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn update_if_token_matches(
        &self,
        domain: &SmtpDomain,
        expected_token: &str,
    ) -> Result<(), StoreError> {
        let filter = doc! { "_id": domain.id.as_str(), "update_token": expected_token };
        let result = self.collection.replace_one(filter, domain).await?;

        if result.matched_count == 0 {
            return Err(StoreError::Conflict(domain.id.clone()));
        }
        Ok(())
    }

    async fn list_by_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<SmtpDomain>, StoreError> {
        let cursor = self
            .collection
            .find(doc! { "organization_id": organization_id })
            .sort(doc! { "host": 1 })
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn list_due(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<SmtpDomain>, StoreError> {
        let cursor = self.collection.find(due_filter(now, window)).await?;
        let domains: Vec<SmtpDomain> = cursor.try_collect().await?;

        // the server-side cutoff is coarse, freshness is decided here
        Ok(domains
            .into_iter()
            .filter(|d| d.needs_recheck(now, window))
            .collect())
    }
}
