//! Shared doubles for the DNS, key generation and storage seams.

use crate::config::DomainSettings;
use crate::dkim::{DkimKeyPair, DkimKeySource};
use crate::error::{DnsError, KeyError};
use crate::service::DomainService;
use crate::store::MemoryStore;
use crate::validation::dnstxt::TxtResolver;
use async_trait::async_trait;
use mockall::mock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

mock! {
    pub Resolver {}

    #[async_trait]
    impl TxtResolver for Resolver {
        async fn lookup_txt(&self, host: &str) -> Result<Vec<String>, DnsError>;
    }
}

mock! {
    pub KeySource {}

    impl DkimKeySource for KeySource {
        fn generate(&self) -> Result<DkimKeyPair, KeyError>;
    }
}

/// In-memory zone that records are published to during a test.
#[derive(Default)]
pub struct StaticResolver {
    zone: Mutex<HashMap<String, Vec<String>>>,
    lookups: AtomicUsize,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, host: &str, value: &str) {
        self.zone
            .lock()
            .unwrap()
            .entry(host.to_string())
            .or_default()
            .push(value.to_string());
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TxtResolver for StaticResolver {
    async fn lookup_txt(&self, host: &str) -> Result<Vec<String>, DnsError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.zone
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .ok_or_else(|| DnsError::NotFound(host.to_string()))
    }
}

pub struct TestHarness {
    pub service: Arc<DomainService>,
    pub store: Arc<MemoryStore>,
    pub resolver: Arc<StaticResolver>,
}

pub fn harness() -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let resolver = Arc::new(StaticResolver::new());
    let service = DomainService::new(
        DomainSettings::default(),
        store.clone(),
        resolver.clone(),
    )
    .expect("default settings are valid");

    TestHarness {
        service: Arc::new(service),
        store,
        resolver,
    }
}
