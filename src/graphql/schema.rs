use super::domain::{DomainMutation, DomainQuery};
use super::health::HealthQuery;
use crate::service::DomainService;
use async_graphql::{EmptySubscription, MergedObject, Schema};
use std::sync::Arc;

/// Root query type, the union of the health and domain queries.
#[derive(MergedObject, Default)]
pub struct QueryRoot(HealthQuery, DomainQuery);

/// Main GraphQL Schema Definition
///
/// # Type Parameters
/// - `QueryRoot`: health check plus domain lookups
/// - `DomainMutation`: domain registration and verification
/// - `EmptySubscription`: no subscriptions are offered
pub type AppSchema = Schema<QueryRoot, DomainMutation, EmptySubscription>;

/// Creates the GraphQL schema with the domain service attached as context data.
///
/// # Example
///
/// ```rust,no_run
/// use smtp_domain_verifier::config::DomainSettings;
/// use smtp_domain_verifier::graphql::schema::create_schema;
/// use smtp_domain_verifier::service::DomainService;
/// use smtp_domain_verifier::store::MemoryStore;
/// use smtp_domain_verifier::validation::dnstxt::SystemTxtResolver;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let service = DomainService::new(
///     DomainSettings::default(),
///     Arc::new(MemoryStore::new()),
///     Arc::new(SystemTxtResolver::new(Duration::from_secs(5))),
/// )
/// .unwrap();
/// let schema = create_schema(Arc::new(service));
/// ```
pub fn create_schema(service: Arc<DomainService>) -> AppSchema {
    Schema::build(
        QueryRoot::default(),
        DomainMutation::default(),
        EmptySubscription::default(),
    )
    .data(service)
    .finish()
}
