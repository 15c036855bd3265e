/// Longest name representable in DNS, without the trailing dot.
const MAX_HOST_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

/// Checks a sending host against the label-based hostname grammar.
///
/// Every dot-separated label must be non-empty and made of ASCII letters,
/// digits and hyphens, with no hyphen at either edge of the label.
///
/// # Examples
/// ```
/// use smtp_domain_verifier::validation::hostname::is_valid_hostname;
///
/// assert!(is_valid_hostname("mail.example.com"));
/// assert!(is_valid_hostname("localhost"));
/// assert!(!is_valid_hostname("exa_mple..com"));
/// assert!(!is_valid_hostname("-example.com"));
/// ```
pub fn is_valid_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > MAX_HOST_LENGTH {
        return false;
    }

    host.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LENGTH
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Lower-cases and trims a host as entered by a caller.
pub fn normalize_host(host: &str) -> String {
    host.trim().to_lowercase()
}
