use crate::error::ConfigError;
use std::collections::BTreeSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Smallest RSA modulus accepted for DKIM keys.
pub const MIN_DKIM_KEY_BITS: usize = 2048;

/// Longest accepted freshness window.
pub const MAX_FRESHNESS_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Settings that shape how domains are registered and verified.
///
/// Built once at start-up and shared read-only between the registry, the
/// verification orchestrator and the background worker.
#[derive(Debug, Clone)]
pub struct DomainSettings {
    /// Domain added as `include:` to the SPF record of every registered host
    pub provider_domain: String,
    /// Selector label of the DKIM record (`<selector>._domainkey.<host>`)
    pub dkim_selector: String,
    pub dkim_key_bits: usize,
    /// Lower-cased region allow-list
    pub regions: BTreeSet<String>,
    /// How long a verified record is trusted before DNS is queried again
    pub freshness_window: Duration,
    pub dns_timeout: Duration,
    /// Deadline for the DNS phase of a single verification pass
    pub verification_timeout: Duration,
    pub sweep_interval: Duration,
    /// Accept any `v=DMARC1` policy already published at `_dmarc.<host>`
    pub accept_existing_dmarc: bool,
}

impl Default for DomainSettings {
    fn default() -> Self {
        Self {
            provider_domain: "neodeliver.com".to_string(),
            dkim_selector: "neo".to_string(),
            dkim_key_bits: MIN_DKIM_KEY_BITS,
            regions: ["eu", "us"].iter().map(|r| r.to_string()).collect(),
            freshness_window: Duration::from_secs(15 * 60),
            dns_timeout: Duration::from_secs(5),
            verification_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(5 * 60),
            accept_existing_dmarc: false,
        }
    }
}

impl DomainSettings {
    pub fn spf_record(&self) -> String {
        format!("v=spf1 include:{} ~all", self.provider_domain)
    }

    pub fn is_known_region(&self, region: &str) -> bool {
        self.regions.contains(region)
    }

    pub fn freshness(&self) -> Result<chrono::Duration, ConfigError> {
        chrono::Duration::from_std(self.freshness_window)
            .map_err(|_| invalid_secs("VERIFICATION_FRESHNESS_SECS", self.freshness_window))
    }

    /// Rejects values the verification runtime cannot work with.
    ///
    /// Timeouts and the sweep interval must be non-zero, the freshness window
    /// at most [`MAX_FRESHNESS_WINDOW`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dkim_key_bits < MIN_DKIM_KEY_BITS {
            return Err(ConfigError::Invalid {
                key: "DKIM_KEY_BITS",
                value: self.dkim_key_bits.to_string(),
            });
        }

        for (key, value) in [
            ("DNS_TIMEOUT_SECS", self.dns_timeout),
            ("VERIFICATION_TIMEOUT_SECS", self.verification_timeout),
            ("VERIFICATION_SWEEP_SECS", self.sweep_interval),
        ] {
            if value.is_zero() {
                return Err(invalid_secs(key, value));
            }
        }

        if self.freshness_window > MAX_FRESHNESS_WINDOW {
            return Err(invalid_secs(
                "VERIFICATION_FRESHNESS_SECS",
                self.freshness_window,
            ));
        }
        self.freshness()?;

        Ok(())
    }
}

fn invalid_secs(key: &'static str, value: Duration) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.as_secs().to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct MongoSettings {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// `None` runs the service on the in-memory store
    pub mongo: Option<MongoSettings>,
    pub domains: DomainSettings,
}

impl Settings {
    /// Reads the settings from the process environment.
    ///
    /// A `.env` file is loaded first when present. Every variable is optional;
    /// malformed or out-of-range values are rejected instead of silently
    /// falling back.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let defaults = DomainSettings::default();
        let regions = match env::var("SMTP_REGIONS") {
            Ok(raw) => parse_regions(&raw)?,
            Err(_) => defaults.regions.clone(),
        };

        let domains = DomainSettings {
            provider_domain: env::var("SPF_PROVIDER_DOMAIN").unwrap_or(defaults.provider_domain),
            dkim_selector: env::var("DKIM_SELECTOR").unwrap_or(defaults.dkim_selector),
            dkim_key_bits: parse_var("DKIM_KEY_BITS", defaults.dkim_key_bits)?,
            regions,
            freshness_window: parse_secs(
                "VERIFICATION_FRESHNESS_SECS",
                defaults.freshness_window,
            )?,
            dns_timeout: parse_secs("DNS_TIMEOUT_SECS", defaults.dns_timeout)?,
            verification_timeout: parse_secs(
                "VERIFICATION_TIMEOUT_SECS",
                defaults.verification_timeout,
            )?,
            sweep_interval: parse_secs("VERIFICATION_SWEEP_SECS", defaults.sweep_interval)?,
            accept_existing_dmarc: parse_var(
                "DMARC_ACCEPT_EXISTING",
                defaults.accept_existing_dmarc,
            )?,
        };
        domains.validate()?;

        let mongo = env::var("MONGODB_URI").ok().map(|uri| MongoSettings {
            uri,
            database: env::var("DB_NAME").unwrap_or_else(|_| "smtp_domains".to_string()),
            collection: env::var("DB_DOMAINS_COLLECTION")
                .unwrap_or_else(|_| "smtp_domains".to_string()),
        });

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 8080)?,
            mongo,
            domains,
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

fn parse_secs(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_var(key, default.as_secs()).map(Duration::from_secs)
}

fn parse_regions(raw: &str) -> Result<BTreeSet<String>, ConfigError> {
    let regions: BTreeSet<String> = raw
        .split(',')
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty())
        .collect();

    if regions.is_empty() {
        return Err(ConfigError::Invalid {
            key: "SMTP_REGIONS",
            value: raw.to_string(),
        });
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_domain_settings() {
        let settings = DomainSettings::default();

        assert_eq!(settings.spf_record(), "v=spf1 include:neodeliver.com ~all");
        assert_eq!(settings.dkim_key_bits, 2048);
        assert_eq!(settings.freshness_window, Duration::from_secs(900));
        assert_eq!(settings.freshness().unwrap(), chrono::Duration::minutes(15));
        assert!(settings.validate().is_ok());
        assert!(settings.is_known_region("eu"));
        assert!(settings.is_known_region("us"));
        assert!(!settings.is_known_region("ap"));
    }

    #[test]
    fn test_parse_regions_normalises_case_and_whitespace() {
        let regions = parse_regions(" EU, us ,,ap").unwrap();
        let expected: BTreeSet<String> =
            ["ap", "eu", "us"].iter().map(|r| r.to_string()).collect();
        assert_eq!(regions, expected);
    }

    #[test]
    fn test_parse_regions_rejects_empty_list() {
        assert!(parse_regions(" , ").is_err());
    }

    fn rejected_key(settings: DomainSettings) -> &'static str {
        match settings.validate() {
            Err(ConfigError::Invalid { key, .. }) => key,
            Ok(()) => panic!("settings should be rejected"),
        }
    }

    #[test]
    fn test_validate_rejects_zero_durations() {
        let zero = Duration::from_secs(0);

        let settings = DomainSettings {
            sweep_interval: zero,
            ..DomainSettings::default()
        };
        assert_eq!(rejected_key(settings), "VERIFICATION_SWEEP_SECS");

        let settings = DomainSettings {
            dns_timeout: zero,
            ..DomainSettings::default()
        };
        assert_eq!(rejected_key(settings), "DNS_TIMEOUT_SECS");

        let settings = DomainSettings {
            verification_timeout: zero,
            ..DomainSettings::default()
        };
        assert_eq!(rejected_key(settings), "VERIFICATION_TIMEOUT_SECS");
    }

    #[test]
    fn test_validate_bounds_freshness_window() {
        let settings = DomainSettings {
            freshness_window: Duration::from_secs(u64::MAX),
            ..DomainSettings::default()
        };
        assert!(settings.freshness().is_err());
        assert_eq!(rejected_key(settings), "VERIFICATION_FRESHNESS_SECS");

        let settings = DomainSettings {
            freshness_window: MAX_FRESHNESS_WINDOW + Duration::from_secs(1),
            ..DomainSettings::default()
        };
        assert_eq!(rejected_key(settings), "VERIFICATION_FRESHNESS_SECS");

        let settings = DomainSettings {
            freshness_window: MAX_FRESHNESS_WINDOW,
            ..DomainSettings::default()
        };
        assert!(settings.validate().is_ok());
        assert_eq!(settings.freshness().unwrap(), chrono::Duration::days(30));

        // zero disables the cache, every pass queries DNS
        let settings = DomainSettings {
            freshness_window: Duration::from_secs(0),
            ..DomainSettings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_keys() {
        let settings = DomainSettings {
            dkim_key_bits: 1024,
            ..DomainSettings::default()
        };
        assert_eq!(rejected_key(settings), "DKIM_KEY_BITS");
    }
}
