use crate::error::{DnsError, DomainError};
use crate::models::{SmtpDomainRecord, TXT_RECORD};
use crate::validation::spf;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{ResolverConfig, ResolverOpts},
    error::{ResolveError, ResolveErrorKind},
};

/// TXT lookup primitive used by [`DnsVerifier`].
///
/// Implementations must report a missing name (or a name without TXT data)
/// as [`DnsError::NotFound`] so it can be told apart from resolver failures.
#[async_trait]
pub trait TxtResolver: Send + Sync {
    async fn lookup_txt(&self, host: &str) -> Result<Vec<String>, DnsError>;
}

/// Resolver backed by `trust-dns-resolver`.
///
/// Caching is disabled so that a record published a moment ago is seen by
/// the next verification pass.
pub struct SystemTxtResolver {
    resolver: TokioAsyncResolver,
}

impl SystemTxtResolver {
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 2;
        opts.cache_size = 0;

        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
        }
    }
}

#[async_trait]
impl TxtResolver for SystemTxtResolver {
    async fn lookup_txt(&self, host: &str) -> Result<Vec<String>, DnsError> {
        let fqdn = if host.ends_with('.') {
            host.to_string()
        } else {
            format!("{host}.")
        };

        let lookup = self
            .resolver
            .txt_lookup(fqdn.as_str())
            .await
            .map_err(|e| classify(host, &e))?;

        // long values are split into 255-byte character strings
        Ok(lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|part| String::from_utf8_lossy(part))
                    .collect::<String>()
            })
            .collect())
    }
}

fn classify(host: &str, err: &ResolveError) -> DnsError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => DnsError::NotFound(host.to_string()),
        ResolveErrorKind::Timeout => DnsError::Timeout(host.to_string()),
        _ => DnsError::Resolver(err.to_string()),
    }
}

/// Outcome of checking one record against DNS.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxtCheck {
    pub satisfied: bool,
    pub live_values: Vec<String>,
    /// Value to publish instead of the declared one, when the host already
    /// carries a record of the same kind
    pub alt_value: Option<String>,
}

/// Answers whether the TXT records published at a host satisfy a record.
#[derive(Clone)]
pub struct DnsVerifier {
    resolver: Arc<dyn TxtResolver>,
    accept_existing_dmarc: bool,
}

impl DnsVerifier {
    pub fn new(resolver: Arc<dyn TxtResolver>, accept_existing_dmarc: bool) -> Self {
        Self {
            resolver,
            accept_existing_dmarc,
        }
    }

    /// Checks `record` against the live TXT values of `record.host`.
    ///
    /// A name that does not exist yields an unsatisfied check, not an error.
    /// SPF records are reconciled with whatever SPF record the host already
    /// publishes, see [`spf::merge`].
    pub async fn verify(&self, record: &SmtpDomainRecord) -> Result<TxtCheck, DomainError> {
        if record.record_type != TXT_RECORD {
            return Err(DnsError::UnsupportedRecordType(record.record_type.clone()).into());
        }

        let live_values = match self.resolver.lookup_txt(&record.host).await {
            Ok(values) => values,
            Err(DnsError::NotFound(_)) => {
                debug!(host = %record.host, "no TXT records published yet");
                return Ok(TxtCheck::default());
            }
            Err(e) => return Err(e.into()),
        };

        debug!(host = %record.host, count = live_values.len(), "resolved TXT records");

        if live_values.iter().any(|v| v == &record.value) {
            return Ok(TxtCheck {
                satisfied: true,
                live_values,
                alt_value: None,
            });
        }

        if record.is_spf() {
            if let Some(live) = live_values.iter().find(|v| spf::is_spf_record(v)) {
                let merged = spf::merge(&record.value, live)?;
                let alt_value = (merged.record != record.value).then_some(merged.record);
                return Ok(TxtCheck {
                    satisfied: merged.already_published,
                    alt_value,
                    live_values,
                });
            }
        } else if record.is_dmarc() && self.accept_existing_dmarc {
            if let Some(live) = live_values.iter().find(|v| v.starts_with("v=DMARC1;")) {
                let alt_value = Some(live.clone());
                return Ok(TxtCheck {
                    satisfied: true,
                    alt_value,
                    live_values,
                });
            }
        }

        Ok(TxtCheck {
            satisfied: false,
            live_values,
            alt_value: None,
        })
    }
}
