use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("RSA key of {0} bits is too short")]
    TooShort(usize),

    #[error("RSA key generation failed: {0}")]
    Generation(#[from] rsa::Error),

    #[error("key encoding failed: {0}")]
    Encoding(String),

    #[error("key generation task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    /// The name does not exist or carries no TXT data.
    #[error("no TXT records for {0}")]
    NotFound(String),

    #[error("DNS lookup for {0} timed out")]
    Timeout(String),

    #[error("DNS resolver error: {0}")]
    Resolver(String),

    #[error("unsupported record type {0}")]
    UnsupportedRecordType(String),
}

impl DnsError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DnsError::Timeout(_) | DnsError::Resolver(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpfError {
    #[error("desired SPF term {0:?} carries a qualifier other than '+'")]
    UnsupportedQualifier(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("domain {0} already exists")]
    Duplicate(String),

    #[error("domain {0} was modified concurrently")]
    Conflict(String),

    #[error("storage error: {0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Errors surfaced by the domain registration and verification operations.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid host {0:?}")]
    InvalidHost(String),

    #[error("invalid region {0:?}")]
    InvalidRegion(String),

    #[error(transparent)]
    KeyGeneration(#[from] KeyError),

    #[error("domain {0} not found")]
    NotFound(String),

    #[error("domain {0} changed during verification, retry")]
    Conflict(String),

    #[error(transparent)]
    Dns(#[from] DnsError),

    #[error(transparent)]
    Spf(#[from] SpfError),

    #[error(transparent)]
    Store(StoreError),

    #[error("verification cancelled")]
    Cancelled,

    #[error("verification exceeded its deadline")]
    Timeout,
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(id) => DomainError::Conflict(id),
            other => DomainError::Store(other),
        }
    }
}

impl DomainError {
    /// Stable machine-readable code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Config(_) => "invalid_configuration",
            DomainError::InvalidHost(_) => "invalid_host",
            DomainError::InvalidRegion(_) => "invalid_region",
            DomainError::KeyGeneration(_) => "key_generation_failed",
            DomainError::NotFound(_) => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::Dns(DnsError::UnsupportedRecordType(_)) => "invalid_record_type",
            DomainError::Dns(_) => "dns_error",
            DomainError::Spf(_) => "invalid_spf_record",
            DomainError::Store(_) => "storage_error",
            DomainError::Cancelled => "cancelled",
            DomainError::Timeout => "timeout",
        }
    }

    /// Whether running the same operation again later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            DomainError::Dns(e) => e.is_retryable(),
            DomainError::Conflict(_) | DomainError::Timeout | DomainError::Cancelled => true,
            DomainError::Store(StoreError::Backend(_)) => true,
            _ => false,
        }
    }
}
