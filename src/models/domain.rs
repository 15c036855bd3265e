use async_graphql::SimpleObject;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The only record type verification can resolve.
pub const TXT_RECORD: &str = "TXT";

/// A DNS record an organization must publish for its sending domain.
///
/// `value` is the declared intent and never changes once created. Verification
/// only touches `alt_value`, `verified` and `verified_at`.
#[derive(SimpleObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpDomainRecord {
    #[serde(rename = "type")]
    #[graphql(name = "type")]
    pub record_type: String,
    /// Fully-qualified lookup name, e.g. `_dmarc.example.com`
    pub host: String,
    pub value: String,
    /// Value to publish instead of `value` when the host already carries a
    /// record of the same kind worth preserving
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_value: Option<String>,
    pub verified: bool,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
}

impl SmtpDomainRecord {
    pub fn txt(host: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            record_type: TXT_RECORD.to_string(),
            host: host.into(),
            value: value.into(),
            alt_value: None,
            verified: false,
            verified_at: None,
        }
    }

    pub fn is_spf(&self) -> bool {
        self.value.starts_with("v=spf1")
    }

    pub fn is_dmarc(&self) -> bool {
        self.value.starts_with("v=DMARC1;")
    }

    /// Verified recently enough that DNS need not be queried again.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let Some(at) = self.verified_at.filter(|_| self.verified) else {
            return false;
        };
        now.checked_sub_signed(window).is_none_or(|cutoff| at > cutoff)
    }
}

/// An outbound-mail domain registered by an organization.
#[derive(SimpleObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpDomain {
    /// Derived from `(organization_id, host)`, see [`crate::registry::domain_id`]
    #[serde(rename = "_id")]
    #[graphql(skip)]
    pub id: String,
    pub organization_id: String,
    pub host: String,
    pub region: Option<String>,
    pub verified: bool,
    /// Owned by the mail-sending subsystem
    #[serde(default)]
    pub mails_sent: i64,
    pub records: Vec<SmtpDomainRecord>,
    /// PKCS#1 PEM, write-only from the caller's perspective
    #[graphql(skip)]
    pub dkim_private_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[graphql(skip)]
    pub update_token: String,
}

impl SmtpDomain {
    pub fn all_records_verified(&self) -> bool {
        self.records.iter().all(|r| r.verified)
    }

    /// At least one record is unverified or past the freshness window.
    pub fn needs_recheck(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.records.iter().any(|r| !r.is_fresh(now, window))
    }

    pub fn verified_count(&self) -> usize {
        self.records.iter().filter(|r| r.verified).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain_with(records: Vec<SmtpDomainRecord>) -> SmtpDomain {
        let now = Utc::now();
        SmtpDomain {
            id: "dom_test".to_string(),
            organization_id: "org_1".to_string(),
            host: "example.com".to_string(),
            region: None,
            verified: false,
            mails_sent: 0,
            records,
            dkim_private_key: "secret".to_string(),
            created_at: now,
            updated_at: now,
            verified_at: None,
            update_token: String::new(),
        }
    }

    #[test]
    fn test_record_kind_detection() {
        let spf = SmtpDomainRecord::txt("example.com", "v=spf1 include:neodeliver.com ~all");
        let dmarc = SmtpDomainRecord::txt("_dmarc.example.com", "v=DMARC1; p=none");
        let dkim = SmtpDomainRecord::txt("neo._domainkey.example.com", "v=DKIM1; k=rsa; p=AAA");

        assert!(spf.is_spf() && !spf.is_dmarc());
        assert!(dmarc.is_dmarc() && !dmarc.is_spf());
        assert!(!dkim.is_spf() && !dkim.is_dmarc());
        assert_eq!(dkim.record_type, "TXT");
    }

    #[test]
    fn test_record_freshness() {
        let now = Utc::now();
        let window = Duration::minutes(15);
        let mut record = SmtpDomainRecord::txt("example.com", "v=spf1 ~all");

        assert!(!record.is_fresh(now, window));

        record.verified = true;
        record.verified_at = Some(now - Duration::minutes(14));
        assert!(record.is_fresh(now, window));

        record.verified_at = Some(now - Duration::minutes(16));
        assert!(!record.is_fresh(now, window));

        // a window reaching past the representable range never expires
        assert!(record.is_fresh(now, Duration::MAX));

        record.verified = false;
        record.verified_at = Some(now);
        assert!(!record.is_fresh(now, window));
        assert!(!record.is_fresh(now, Duration::MAX));
    }

    #[test]
    fn test_domain_aggregates() {
        let now = Utc::now();
        let mut fresh = SmtpDomainRecord::txt("a.example.com", "x");
        fresh.verified = true;
        fresh.verified_at = Some(now);
        let stale = SmtpDomainRecord::txt("b.example.com", "y");

        let domain = domain_with(vec![fresh.clone(), stale]);
        assert!(!domain.all_records_verified());
        assert_eq!(domain.verified_count(), 1);
        assert!(domain.needs_recheck(now, Duration::minutes(15)));

        let domain = domain_with(vec![fresh]);
        assert!(domain.all_records_verified());
        assert!(!domain.needs_recheck(now, Duration::minutes(15)));
    }

    #[test]
    fn test_serialized_shape_uses_storage_names() {
        let domain = domain_with(vec![SmtpDomainRecord::txt("example.com", "v=spf1 ~all")]);
        let json = serde_json::to_value(&domain).unwrap();

        assert_eq!(json["_id"], "dom_test");
        assert_eq!(json["records"][0]["type"], "TXT");
        assert!(json["records"][0].get("alt_value").is_none());
    }
}
