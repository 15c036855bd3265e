/// Checks a sending host against the label-based hostname grammar.
///
/// # Examples
/// ```
/// use smtp_domain_verifier::validation::hostname::is_valid_hostname;
///
/// assert!(is_valid_hostname("example.com"));
/// assert!(!is_valid_hostname("exa_mple..com"));
/// ```
pub mod hostname;

/// Resolves TXT records for a host and decides whether they satisfy an
/// expected record.
///
/// Lookups go through the [`dnstxt::TxtResolver`] trait so verification can
/// run against `trust-dns-resolver` in production and a fixed zone in tests.
pub mod dnstxt;

/// Merges the includes a registration requires into an SPF record that is
/// already published at the host.
pub mod spf;
