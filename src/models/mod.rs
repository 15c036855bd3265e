/// # Health Status Response
///
/// Represents the operational status of the service with a timestamp.
/// Used as the response format for health check endpoints.
///
/// ## Example JSON
/// ```json
/// {
///   "status": "UP",
///   "timestamp": "2024-03-10T15:30:45.123456789Z"
/// }
/// ```
pub mod health;

/// Persisted sending domains and the DNS records they must publish.
pub mod domain;

pub use domain::{SmtpDomain, SmtpDomainRecord, TXT_RECORD};
pub use health::HealthResponse;
