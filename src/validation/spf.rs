//! Reconciliation of SPF records.
//!
//! SPF allows a single record per host, so every sender a domain uses has to
//! share it. Instead of overwriting what the host already publishes, the
//! desired `include:` mechanisms are merged into the live record: unrelated
//! terms keep their position and qualifier, missing includes are inserted
//! right before the terminal `all`.

use crate::error::SpfError;
use std::collections::BTreeSet;

const VERSION: &str = "v=spf1";

/// Qualifier applied to the `all` guard appended to records that lack one.
const DEFAULT_ALL: &str = "~all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpfMerge {
    /// Reconciled record carrying both the live terms and the required includes
    pub record: String,
    /// The reconciled record contains every required include.
    ///
    /// Missing includes are always inserted, so this holds for every
    /// successful merge. Whether DNS is already in order is answered by
    /// `already_published`.
    pub fully_satisfied: bool,
    /// The live record already authorized every required include, so nothing
    /// has to be republished. Verification decides on this flag.
    pub already_published: bool,
}

/// Returns true when `value` is an SPF record (`v=spf1` version tag).
pub fn is_spf_record(value: &str) -> bool {
    value
        .split_whitespace()
        .next()
        .is_some_and(|tag| tag.eq_ignore_ascii_case(VERSION))
}

/// Merges the `include:` requirements of `desired` into the `live` record.
///
/// Includes in `desired` may carry the `+` qualifier; any other qualifier is
/// rejected because downgrading it silently would change its meaning. Only
/// the live side ever receives a default `~all` guard.
///
/// # Examples
/// ```
/// use smtp_domain_verifier::validation::spf::merge;
///
/// let merged = merge(
///     "v=spf1 include:neodeliver.com ~all",
///     "v=spf1 include:other.com ~all",
/// )
/// .unwrap();
///
/// assert_eq!(merged.record, "v=spf1 include:other.com include:neodeliver.com ~all");
/// assert!(merged.fully_satisfied);
/// assert!(!merged.already_published);
/// ```
pub fn merge(desired: &str, live: &str) -> Result<SpfMerge, SpfError> {
    let required = required_includes(desired)?;
    let live_terms: Vec<&str> = terms(live).collect();

    if live_terms.is_empty() {
        return Ok(SpfMerge {
            record: desired.split_whitespace().collect::<Vec<_>>().join(" "),
            fully_satisfied: true,
            already_published: required.is_empty(),
        });
    }

    let mut needed = required.clone();
    let mut downgraded = false;
    let mut has_all = false;
    let mut merged: Vec<String> = vec![VERSION.to_string()];

    for term in live_terms {
        let (qualifier, mechanism) = split_qualifier(term);

        if needed.remove(mechanism) {
            // keep permissive qualifiers, anything else would block the provider
            match qualifier {
                Some(q @ ('+' | '?')) => merged.push(format!("{q}{mechanism}")),
                Some(_) => {
                    downgraded = true;
                    merged.push(mechanism.to_string());
                }
                None => merged.push(mechanism.to_string()),
            }
        } else if mechanism.eq_ignore_ascii_case("all") {
            has_all = true;
            merged.extend(needed.iter().cloned());
            merged.push(term.to_string());
            break;
        } else {
            merged.push(term.to_string());
        }
    }

    if !has_all && !needed.is_empty() {
        merged.extend(needed.iter().cloned());
        merged.push(DEFAULT_ALL.to_string());
    }

    let fully_satisfied = required
        .iter()
        .all(|include| merged.iter().any(|t| split_qualifier(t).1 == include.as_str()));

    Ok(SpfMerge {
        record: merged.join(" "),
        fully_satisfied,
        already_published: needed.is_empty() && !downgraded,
    })
}

/// Mechanisms of a record, without the version tag.
fn terms(record: &str) -> impl Iterator<Item = &str> {
    let mut tokens = record.split_whitespace().peekable();
    if tokens
        .peek()
        .is_some_and(|tag| tag.eq_ignore_ascii_case(VERSION))
    {
        tokens.next();
    }
    tokens
}

fn split_qualifier(term: &str) -> (Option<char>, &str) {
    match term.chars().next() {
        Some(q @ ('+' | '-' | '~' | '?')) => (Some(q), &term[1..]),
        _ => (None, term),
    }
}

/// `include:` mechanisms the desired record requires, ordered for output.
fn required_includes(desired: &str) -> Result<BTreeSet<String>, SpfError> {
    let mut required = BTreeSet::new();

    for term in terms(desired) {
        let (qualifier, mechanism) = split_qualifier(term);
        if !mechanism.starts_with("include:") {
            continue;
        }
        match qualifier {
            None | Some('+') => {
                required.insert(mechanism.to_string());
            }
            Some(_) => return Err(SpfError::UnsupportedQualifier(term.to_string())),
        }
    }

    Ok(required)
}
